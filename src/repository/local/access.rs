use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::Deserialize;

use crate::repository::{Credentials, RepositoryError};

/// Who may log in to the embedded store, read from the TOML file named by
/// `jackrabbit-config`. Without a file every login is accepted.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct AccessConfig {
    #[serde(default)]
    pub workspaces: Vec<String>,
    #[serde(default)]
    pub users: BTreeMap<String, String>,
}

impl AccessConfig {
    pub fn load(path: &Path) -> Result<Self, RepositoryError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("no repository config at {}, accepting any login", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&text).map_err(|e| RepositoryError::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn check(&self, credentials: &Credentials, workspace: &str) -> Result<(), RepositoryError> {
        if !is_valid_workspace_name(workspace)
            || (!self.workspaces.is_empty() && !self.workspaces.iter().any(|w| w == workspace))
        {
            return Err(RepositoryError::NoSuchWorkspace(workspace.to_string()));
        }
        if self.users.is_empty() {
            return Ok(());
        }
        match self.users.get(&credentials.username) {
            Some(password) if password == credentials.password() => Ok(()),
            _ => Err(RepositoryError::Login {
                user: credentials.username.clone(),
                workspace: workspace.to_string(),
                reason: "invalid credentials".into(),
            }),
        }
    }
}

fn is_valid_workspace_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
