use std::fs;
use std::path::Path;

use crate::configuration::Configuration;
use crate::error::JackError;
use crate::repository::{NamePattern, RepositoryError, Session};

/// Children of the base path that survive a purge.
pub const RESERVED_CHILDREN: &[&str] = &["jcr:system", "rep:policy"];

/// Properties of the base path with these prefixes survive a purge.
pub const RESERVED_PROPERTY_PREFIXES: &[&str] = &["jcr:", "rep:", "sling:"];

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub nodes: Vec<String>,
    pub properties: Vec<String>,
}

pub fn check_source(file: &Path) -> Result<(), JackError> {
    if !file.is_file() {
        return Err(JackError::ImportSourceMissing(file.to_path_buf()));
    }
    Ok(())
}

pub fn is_reserved_property(name: &str) -> bool {
    RESERVED_PROPERTY_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

/// Removes the purgeable children and properties of `base`. Nothing is
/// committed here.
pub fn purge(
    session: &mut dyn Session,
    base: &str,
    filter: &NamePattern,
) -> Result<PurgeReport, RepositoryError> {
    let node = session.read_node(base)?;
    let mut report = PurgeReport::default();

    for child in node.children(filter) {
        if RESERVED_CHILDREN.contains(&child) {
            log::debug!("keeping reserved node {}", node.child_path(child));
            continue;
        }
        let path = node.child_path(child);
        session.remove_item(&path)?;
        report.nodes.push(path);
    }

    for property in node.properties() {
        if is_reserved_property(&property.name) {
            continue;
        }
        let path = node.child_path(&property.name);
        session.remove_item(&path)?;
        report.properties.push(path);
    }

    Ok(report)
}

/// Purges the base path, commits, imports the file there and commits again.
/// The file is read completely before anything is removed.
pub fn import(
    session: &mut dyn Session,
    config: &Configuration,
    file: &Path,
) -> Result<(), JackError> {
    let base = config.base_path.as_str();
    let content = fs::read(file).map_err(|source| JackError::File {
        path: file.to_path_buf(),
        source,
    })?;

    let report = purge(session, base, &config.purge_filter).map_err(|source| JackError::Purge {
        path: base.to_string(),
        source,
    })?;
    log::info!(
        "🧹 Purging {} nodes and {} properties below {} (filter {})",
        report.nodes.len(),
        report.properties.len(),
        base,
        config.purge_filter
    );
    session.commit().map_err(|source| JackError::PurgeCommit {
        path: base.to_string(),
        source,
    })?;

    log::info!(
        "📥 Importing {} into {} (uuid behavior {:?})",
        file.display(),
        base,
        config.uuid_behavior
    );
    session
        .import_xml(base, &mut content.as_slice(), config.uuid_behavior)
        .map_err(|source| JackError::Import {
            path: base.to_string(),
            file: file.to_path_buf(),
            source,
        })?;

    session.commit().map_err(|source| JackError::ImportCommit {
        path: base.to_string(),
        source,
    })?;

    log::info!("✅ Imported the repository from {}", file.display());
    Ok(())
}
