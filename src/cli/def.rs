use clap::{Parser, Subcommand};

/// Query and edit layered YAML configuration files
#[derive(Parser)]
#[command(author, about, long_about=None, disable_version_flag(true))]
pub struct Args {
    /// force color mode (defaults to check tty)
    #[arg(long)]
    pub color: bool,

    /// force no-color mode (defaults to check tty)
    #[arg(long)]
    pub no_color: bool,

    /// display version and quit
    #[arg(short = 'V', long = "version")]
    pub version: bool,

    /// prepend time to each log line
    #[arg(long)]
    pub log_time: bool,

    /// Turn general verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Configure component wise logging
    #[arg(long, short, action = clap::ArgAction::Append)]
    pub log: Option<Vec<String>>,

    /// quiet path errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Output raw YAML
    #[arg(short = 'y', long)]
    pub yaml: bool,

    /// Configuration file, repeat to layer them (first one wins)
    #[arg(short = 'f', long = "file", action = clap::ArgAction::Append)]
    pub files: Vec<String>,

    /// Path segment separator
    #[arg(long, default_value = ".")]
    pub separator: String,

    /// Compare names case-sensitively
    #[arg(long)]
    pub case_sensitive: bool,

    /// Indent width used when saving
    #[arg(long, default_value_t = 2)]
    pub indent: usize,

    #[command(subcommand)]
    pub action: Option<Actions>,
}

#[derive(Subcommand)]
pub enum Actions {
    GetValue {
        /// Get node value from given path

        /// The path to get value of
        #[clap(name = "PATH")]
        path: String,

        /// Default
        #[clap(name = "DEFAULT")]
        default: Option<String>,

        /// Output raw YAML
        #[arg(short = 'y', long)]
        yaml: bool,
    },
    Exist {
        /// Succeed when the path exists in any file

        /// The path to look up
        #[clap(name = "PATH")]
        path: String,
    },
    SetValue {
        /// Set a value at a given path and save the file holding it

        /// The path where to set the value
        #[clap(name = "KEY")]
        key: String,

        /// The value to set
        #[clap(name = "VALUE")]
        value: String,

        /// Interpret value as YAML instead of literal string
        #[arg(short = 'y', long)]
        yaml: bool,
    },
    Del {
        /// Remove the node at a given path and save the file holding it

        /// The path to remove
        #[clap(name = "KEY")]
        key: String,
    },
    Keys {
        /// Get keys of mapping from given path

        /// The path to get keys from
        #[clap(name = "PATH")]
        path: Option<String>,
    },
    Dump {
        /// Output the YAML of the node at given path

        /// The path to dump
        #[clap(name = "PATH")]
        path: Option<String>,
    },
    Count {
        /// Count scalar leaves below given path

        /// The path to count from
        #[clap(name = "PATH")]
        path: Option<String>,
    },
}
