use std::path::{Path, PathBuf};

use crate::cli::{Cli, Command};
use crate::configuration::{ConfigError, Configuration, Properties};

pub struct Context {
    pub config: Configuration,
    pub command: Command,
    pub file: PathBuf,
    pub log_file: Option<PathBuf>,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let props = layered_properties(cli.properties.as_deref(), &cli.overrides)?;
        Ok(Self {
            config: Configuration::from_properties(&props)?,
            command: cli.command,
            file: cli.file.clone(),
            log_file: cli.log_file.clone(),
        })
    }
}

/// Packaged defaults, then the optional properties file, then command-line
/// overrides.
pub fn layered_properties(
    file: Option<&Path>,
    overrides: &[(String, String)],
) -> Result<Properties, ConfigError> {
    let mut props = Properties::packaged_defaults();
    if let Some(path) = file {
        props = props.merge(Properties::load(path)?);
    }
    Ok(props.merge(overrides.iter().cloned().collect()))
}
