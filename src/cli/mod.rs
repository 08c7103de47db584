mod def;
use clap::Parser;
use yamlcfg::yaml::{
    parse_document, serialize_raw, DocumentBackend, FyamlBackend, NodeKind, Settings, Value,
    YamlCombiner, YamlManager, YamlNode,
};

pub mod log;

/// Combiner over the `--file` list, in command-line order.
fn load_combiner(cli: &def::Args) -> Result<YamlCombiner, String> {
    if cli.files.is_empty() {
        return Err("No configuration file given (use --file)".to_string());
    }
    let settings = Settings::default()
        .with_separator(cli.separator.as_str())
        .with_case_sensitive(cli.case_sensitive)
        .with_indent(cli.indent);
    let mut combiner = YamlCombiner::new(settings)?;
    for file in &cli.files {
        if !combiner.load_file(file) {
            return Err(format!("Cannot load configuration file {:?}", file));
        }
    }
    Ok(combiner)
}

/// Node at `path`, or the default root when no path is given.
fn lookup(combiner: &YamlCombiner, path: Option<&str>) -> Option<YamlNode> {
    match path {
        Some(path) => combiner.get_node(path),
        None => Some(combiner.root_node()),
    }
}

fn missing(cli: &def::Args, path: &str) -> Result<bool, String> {
    if cli.quiet {
        return Ok(false);
    }
    Err(format!("invalid path '{}', missing key.", path))
}

/// Save the manager at `index` after an edit of `path`.
fn save_owner(combiner: &YamlCombiner, index: usize, path: &str) -> Result<(), String> {
    let manager = combiner
        .manager(index)
        .ok_or_else(|| format!("No configuration file holds '{}'", path))?;
    if !manager.save() {
        return Err(format!("Failed to save change of '{}'", path));
    }
    Ok(())
}

pub fn run() -> Result<bool, String> {
    let cli = def::Args::parse();

    // Split log strings upon comma, trim them and flatten all in
    // `logs`, remove empty values
    let logs = cli.log.clone().unwrap_or_default();
    let logs = logs
        .iter()
        .flat_map(|log| log.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<&str>>();

    // Upon failure, display error message and usage string
    log::setup(cli.verbose, logs, cli.log_time)?;

    if cli.color && cli.no_color {
        return Err("Cannot use both --color and --no-color".to_string());
    }
    if cli.color {
        colored::control::set_override(true);
    }
    if cli.no_color {
        colored::control::set_override(false);
    }

    if cli.version {
        println!("version: {}", env!("CARGO_PKG_VERSION"));
        println!(
            "libfyaml used: True\nlibfyaml available: {}",
            fyaml::get_c_version().map_err(|e| e.to_string())?
        );
        return Ok(true);
    }

    let backend = FyamlBackend::new(cli.indent);

    match &cli.action {
        Some(def::Actions::GetValue {
            path,
            default,
            yaml,
        }) => {
            let yaml = cli.yaml || *yaml;
            let combiner = load_combiner(&cli)?;
            let node = match combiner.get_node(path) {
                Some(node) => node,
                None => {
                    if let Some(default) = default {
                        print!("{}", default);
                        return Ok(true);
                    }
                    return missing(&cli, path);
                }
            };
            if !yaml && node.kind() == NodeKind::Scalar {
                print!("{}", node.value().as_ref().map(serialize_raw).unwrap_or_default());
            } else {
                print!("{}", backend.emit(&node.dump())?);
            }
        }
        Some(def::Actions::Exist { path }) => {
            let combiner = load_combiner(&cli)?;
            return Ok(combiner.exist(path));
        }
        Some(def::Actions::SetValue { key, value, yaml }) => {
            let value = if *yaml {
                parse_document(value)?
            } else {
                Value::String(value.clone())
            };
            let mut combiner = load_combiner(&cli)?;
            combiner.set_node(key, value)?;
            let index = combiner
                .locate(key)
                .ok_or_else(|| format!("Value of '{}' was not stored", key))?;
            ::log::debug!("'{}' stored in {:?}", key, cli.files.get(index));
            save_owner(&combiner, index, key)?;
        }
        Some(def::Actions::Del { key }) => {
            let combiner = load_combiner(&cli)?;
            let Some(index) = combiner.locate(key) else {
                return missing(&cli, key);
            };
            let node = combiner
                .manager(index)
                .and_then(|m| m.get_node(key))
                .ok_or_else(|| format!("invalid path '{}', missing key.", key))?;
            let parent = node
                .parent()
                .ok_or_else(|| "Cannot delete the document root".to_string())?;
            parent.remove_child_node(&node);
            save_owner(&combiner, index, key)?;
        }
        Some(def::Actions::Keys { path }) => {
            let combiner = load_combiner(&cli)?;
            let path = path.as_deref();
            let Some(node) = lookup(&combiner, path) else {
                return missing(&cli, path.unwrap_or_default());
            };
            if node.is_null() {
                return Ok(true);
            }
            for key in node.children_map()?.keys() {
                println!("{}", key);
            }
        }
        Some(def::Actions::Dump { path }) => {
            let combiner = load_combiner(&cli)?;
            let path = path.as_deref();
            let Some(node) = lookup(&combiner, path) else {
                return missing(&cli, path.unwrap_or_default());
            };
            print!("{}", backend.emit(&node.dump())?);
        }
        Some(def::Actions::Count { path }) => {
            let combiner = load_combiner(&cli)?;
            let count = match path {
                Some(path) => match combiner.get_node(path) {
                    Some(node) => node.final_node_count(),
                    None => return missing(&cli, path),
                },
                None => combiner.final_node_count(),
            };
            println!("{}", count);
        }
        None => {
            return Err("Missing action".to_string());
        }
    }
    Ok(true)
}
