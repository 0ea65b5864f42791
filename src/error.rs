use std::path::PathBuf;

use thiserror::Error;

use crate::configuration::ConfigError;
use crate::repository::RepositoryError;

/// Where in a run a failure happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Config,
    Precondition,
    Login,
    Purge,
    PurgeCommit,
    Import,
    ImportCommit,
    Export,
}

#[derive(Debug, Error)]
pub enum JackError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to set up the repository client")]
    Connect(#[source] RepositoryError),
    #[error("export file {} already exists, can not export", .0.display())]
    ExportTargetExists(PathBuf),
    #[error("file {} does not exist or is not a regular file, can not import", .0.display())]
    ImportSourceMissing(PathBuf),
    #[error("failed to open {}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to log in to workspace {workspace}")]
    Login {
        workspace: String,
        #[source]
        source: RepositoryError,
    },
    #[error("failed to purge {path} before import")]
    Purge {
        path: String,
        #[source]
        source: RepositoryError,
    },
    #[error("failed to commit the purge of {path}, nothing was imported")]
    PurgeCommit {
        path: String,
        #[source]
        source: RepositoryError,
    },
    #[error("failed to import repository to {path} from file {}", .file.display())]
    Import {
        path: String,
        file: PathBuf,
        #[source]
        source: RepositoryError,
    },
    #[error("failed to save the imported repository at {path}: data was applied but is not durable")]
    ImportCommit {
        path: String,
        #[source]
        source: RepositoryError,
    },
    #[error("failed to export repository at {path} to file {}", .file.display())]
    Export {
        path: String,
        file: PathBuf,
        #[source]
        source: RepositoryError,
    },
}

impl JackError {
    pub fn stage(&self) -> Stage {
        match self {
            JackError::Config(_) | JackError::Connect(_) => Stage::Config,
            JackError::ExportTargetExists(_)
            | JackError::ImportSourceMissing(_)
            | JackError::File { .. } => Stage::Precondition,
            JackError::Login { .. } => Stage::Login,
            JackError::Purge { .. } => Stage::Purge,
            JackError::PurgeCommit { .. } => Stage::PurgeCommit,
            JackError::Import { .. } => Stage::Import,
            JackError::ImportCommit { .. } => Stage::ImportCommit,
            JackError::Export { .. } => Stage::Export,
        }
    }
}
