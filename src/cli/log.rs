use colored::*;
use log::{Level, LevelFilter};
use regex::Regex;
use time::macros::format_description;
use time::OffsetDateTime;

/// Install the stderr logger.
///
/// `logs` holds `component[=level]` entries; a bare component logs at
/// every level.
pub fn setup(verbose: u8, logs: Vec<&str>, log_time: bool) -> Result<(), String> {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let spec = Regex::new(r"^(?P<component>[A-Za-z0-9_:.-]+)(?:=(?P<level>[A-Za-z]+))?$")
        .map_err(|e| e.to_string())?;

    let mut dispatch = fern::Dispatch::new().level(level);
    for log in logs {
        let caps = spec
            .captures(log)
            .ok_or_else(|| format!("Invalid log specification: {:?}", log))?;
        let component = caps["component"].to_string();
        let component_level = match caps.name("level") {
            Some(l) => l
                .as_str()
                .parse::<LevelFilter>()
                .map_err(|_| format!("Invalid log level {:?} in {:?}", l.as_str(), log))?,
            None => LevelFilter::Trace,
        };
        dispatch = dispatch.level_for(component, component_level);
    }

    let time_format = format_description!("[hour]:[minute]:[second].[subsecond digits:3]");
    dispatch
        .format(move |out, message, record| {
            let level = match record.level() {
                Level::Error => "ERROR".bright_red(),
                Level::Warn => "WARN".yellow(),
                Level::Info => "INFO".green(),
                Level::Debug => "DEBUG".blue(),
                Level::Trace => "TRACE".dimmed(),
            };
            if log_time {
                let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
                let stamp = now.format(time_format).unwrap_or_default();
                out.finish(format_args!(
                    "{} {} [{}] {}",
                    stamp.as_str().dimmed(),
                    level,
                    record.target(),
                    message
                ))
            } else {
                out.finish(format_args!("{} [{}] {}", level, record.target(), message))
            }
        })
        .chain(std::io::stderr())
        .apply()
        .map_err(|e| format!("Failed to set up logging: {}", e))
}
