use std::path::Path;

use crate::cli::Command;
use crate::configuration::Configuration;
use crate::error::JackError;
use crate::repository::Session;

pub mod export;
pub mod import;

impl Command {
    /// File checks that must pass before the repository is touched.
    pub fn check(&self, file: &Path) -> Result<(), JackError> {
        match self {
            Command::Import => import::check_source(file),
            Command::Export | Command::ExportDocument => export::check_target(file),
        }
    }

    pub fn run(
        &self,
        session: &mut dyn Session,
        config: &Configuration,
        file: &Path,
    ) -> Result<(), JackError> {
        match self.view() {
            Some(view) => export::export(session, view, config, file),
            None => import::import(session, config, file),
        }
    }
}
