use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use url::Url;

use crate::repository::{Credentials, ExportOptions, NamePattern, UuidBehavior};

const PACKAGED_DEFAULTS: &str = include_str!("../resources/jcr.properties");

pub const USERNAME: &str = "username";
pub const PASSWORD: &str = "password";
pub const WORKSPACE: &str = "workspace";
pub const TRANSPORT: &str = "transport";
pub const STORAGE: &str = "storage";
pub const JACKRABBIT_CONFIG: &str = "jackrabbit-config";
pub const JACKRABBIT_HOME: &str = "jackrabbit-home";
pub const BASE_PATH: &str = "repository-base-xpath";
pub const PURGE_PATH: &str = "purge-path";
pub const UUID_BEHAVIOR: &str = "uuid-behavior";
pub const SKIP_BINARY: &str = "skip-binary";
pub const NO_RECURSE: &str = "no-recurse";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required property {0}")]
    MissingProperty(&'static str),
    #[error("unknown transport {0}, expected local or davex")]
    UnknownTransport(String),
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("invalid override {0:?}, expected key=value")]
    InvalidOverride(String),
    #[error("failed to read properties file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Flat key/value configuration. Later assignments overwrite earlier ones.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    pub fn packaged_defaults() -> Self {
        Self::parse(PACKAGED_DEFAULTS)
    }

    /// Parses the `key=value` / `key: value` subset of the Java properties
    /// format. `#` and `!` start comment lines.
    pub fn parse(text: &str) -> Self {
        let mut props = Self::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            match line.find(['=', ':']) {
                Some(idx) => props.set(line[..idx].trim(), line[idx + 1..].trim()),
                None => props.set(line, ""),
            }
        }
        props
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&text))
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn merge(mut self, other: Properties) -> Self {
        self.entries.extend(other.entries);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn require(&self, key: &'static str) -> Result<&str, ConfigError> {
        self.get(key).ok_or(ConfigError::MissingProperty(key))
    }

    fn parse_or<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            None | Some("") => Ok(default),
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                key,
                value: raw.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

impl FromIterator<(String, String)> for Properties {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Splits a command-line `key=value` override.
pub fn parse_override(raw: &str) -> Result<(String, String), ConfigError> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(ConfigError::InvalidOverride(raw.to_string())),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transport {
    Local { config: PathBuf, home: PathBuf },
    Davex { storage: Url },
}

impl Transport {
    fn from_properties(props: &Properties) -> Result<Self, ConfigError> {
        match props.require(TRANSPORT)? {
            "local" => Ok(Transport::Local {
                config: PathBuf::from(props.require(JACKRABBIT_CONFIG)?),
                home: PathBuf::from(props.require(JACKRABBIT_HOME)?),
            }),
            "davex" => {
                let raw = props.require(STORAGE)?;
                let storage = Url::parse(raw).map_err(|e| ConfigError::InvalidValue {
                    key: STORAGE,
                    value: raw.to_string(),
                    reason: e.to_string(),
                })?;
                Ok(Transport::Davex { storage })
            }
            other => Err(ConfigError::UnknownTransport(other.to_string())),
        }
    }
}

/// Immutable run configuration, derived once from the merged properties.
#[derive(Clone, Debug)]
pub struct Configuration {
    pub credentials: Credentials,
    pub workspace: String,
    pub transport: Transport,
    pub base_path: String,
    pub purge_filter: NamePattern,
    pub uuid_behavior: UuidBehavior,
    pub export: ExportOptions,
}

impl Configuration {
    pub fn from_properties(props: &Properties) -> Result<Self, ConfigError> {
        let credentials = Credentials::new(props.require(USERNAME)?, props.require(PASSWORD)?);
        let workspace = match props.get(WORKSPACE) {
            None | Some("") => "default".to_string(),
            Some(ws) => ws.to_string(),
        };

        let base_path = match props.get(BASE_PATH) {
            None | Some("") => "/".to_string(),
            Some(path) => normalize_base_path(path)?,
        };

        Ok(Self {
            credentials,
            workspace,
            transport: Transport::from_properties(props)?,
            base_path,
            purge_filter: NamePattern::parse(props.get(PURGE_PATH).unwrap_or("*")),
            uuid_behavior: props.parse_or(UUID_BEHAVIOR, UuidBehavior::default())?,
            export: ExportOptions {
                skip_binary: props.parse_or(SKIP_BINARY, false)?,
                no_recurse: props.parse_or(NO_RECURSE, false)?,
            },
        })
    }
}

fn normalize_base_path(raw: &str) -> Result<String, ConfigError> {
    let raw = raw.trim();
    if !raw.starts_with('/') {
        return Err(ConfigError::InvalidValue {
            key: BASE_PATH,
            value: raw.to_string(),
            reason: "must be an absolute path".into(),
        });
    }
    let trimmed = raw.trim_end_matches('/');
    if trimmed.is_empty() {
        Ok("/".to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packaged_defaults_are_complete() {
        let props = Properties::packaged_defaults();
        let cfg = Configuration::from_properties(&props).unwrap();
        assert_eq!(cfg.base_path, "/");
        assert_eq!(cfg.workspace, "default");
        assert_eq!(cfg.purge_filter, NamePattern::any());
        assert_eq!(cfg.uuid_behavior, UuidBehavior::ReplaceExisting);
        assert!(matches!(cfg.transport, Transport::Local { .. }));
    }

    #[test]
    fn parse_skips_comments_and_accepts_colon() {
        let props = Properties::parse("# c\n! c\n\nuser name = x\nstorage: http://h/server\n");
        assert_eq!(props.get("user name"), Some("x"));
        assert_eq!(props.get("storage"), Some("http://h/server"));
        assert_eq!(props.iter().count(), 2);
    }

    #[test]
    fn later_layer_wins() {
        let base = Properties::parse("workspace=default\nusername=admin");
        let over: Properties = [("workspace".to_string(), "staging".to_string())]
            .into_iter()
            .collect();
        let merged = base.merge(over);
        assert_eq!(merged.get("workspace"), Some("staging"));
        assert_eq!(merged.get("username"), Some("admin"));
    }

    #[test]
    fn override_splits_on_first_equals() {
        assert_eq!(
            parse_override("storage=http://h/?a=b").unwrap(),
            ("storage".to_string(), "http://h/?a=b".to_string())
        );
        assert!(parse_override("novalue").is_err());
        assert!(parse_override("=x").is_err());
    }

    #[test]
    fn unknown_transport_is_rejected() {
        let props = Properties::packaged_defaults().merge(Properties::parse("transport=rmi"));
        let err = Configuration::from_properties(&props).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTransport(t) if t == "rmi"));
    }

    #[test]
    fn davex_requires_valid_url() {
        let props = Properties::packaged_defaults()
            .merge(Properties::parse("transport=davex\nstorage=not a url"));
        let err = Configuration::from_properties(&props).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: STORAGE, .. }));
    }

    #[test]
    fn missing_username_is_reported() {
        let props = Properties::parse("password=x\ntransport=local");
        let err = Configuration::from_properties(&props).unwrap_err();
        assert!(matches!(err, ConfigError::MissingProperty(USERNAME)));
    }

    #[test]
    fn base_path_is_normalized() {
        let props =
            Properties::packaged_defaults().merge(Properties::parse("repository-base-xpath=/content/"));
        let cfg = Configuration::from_properties(&props).unwrap();
        assert_eq!(cfg.base_path, "/content");

        let props =
            Properties::packaged_defaults().merge(Properties::parse("repository-base-xpath=content"));
        assert!(Configuration::from_properties(&props).is_err());
    }

    #[test]
    fn export_flags_and_uuid_behavior_parse() {
        let props = Properties::packaged_defaults().merge(Properties::parse(
            "skip-binary=true\nno-recurse=true\nuuid-behavior=throw",
        ));
        let cfg = Configuration::from_properties(&props).unwrap();
        assert!(cfg.export.skip_binary);
        assert!(cfg.export.no_recurse);
        assert_eq!(cfg.uuid_behavior, UuidBehavior::Throw);

        let props = Properties::packaged_defaults().merge(Properties::parse("skip-binary=maybe"));
        assert!(Configuration::from_properties(&props).is_err());
    }
}
