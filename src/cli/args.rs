use clap::Parser;
use std::env;
use std::path::PathBuf;

use crate::cli::command::Command;
use crate::configuration::{parse_override, ConfigError};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Import or export a content repository subtree as XML",
    long_about = "Replaces the repository content below repository-base-xpath with the content of an XML file (import), or writes that content to a new file (export, exportdocument).\n\nSettings come from the built-in jcr.properties, an optional --properties file, and KEY=VALUE arguments, later ones winning."
)]
pub struct Cli {
    #[arg(value_enum, value_name = "COMMAND")]
    pub command: Command,

    #[arg(value_name = "FILE", help = "XML file to import from or export to")]
    pub file: PathBuf,

    #[arg(
        value_name = "KEY=VALUE",
        value_parser = parse_key_value,
        help = "Override a configuration key, e.g. workspace=staging"
    )]
    pub overrides: Vec<(String, String)>,

    #[arg(
        long = "properties",
        env = "JACK_PROPERTIES",
        value_name = "PATH",
        help = "Properties file layered over the built-in defaults"
    )]
    pub properties: Option<PathBuf>,

    #[arg(
        long = "log-file",
        env = "JACK_LOG_FILE",
        value_name = "PATH",
        help = "Write logs to PATH (in addition to stderr)"
    )]
    pub log_file: Option<PathBuf>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), ConfigError> {
    parse_override(raw)
}

pub fn parse() -> Cli {
    let dotenv_path = env::var("DOTENV_PATH").unwrap_or(".env".into());
    dotenvy::from_filename(&dotenv_path).ok();
    Cli::parse()
}
