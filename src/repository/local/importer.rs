//! Applies a parsed serialization to the workspace store.

use rusqlite::Connection;
use uuid::Uuid;

use super::store;
use crate::repository::traits::{join_path, parent_path};
use crate::repository::{RepositoryError, UuidBehavior};
use crate::xml::{XmlDocument, XmlNode};

/// Children that exist in every workspace and are never replaced by an
/// import.
const PROTECTED_CHILDREN: &[&str] = &["jcr:system", "rep:policy"];

/// Root properties owned by the store itself.
const PROTECTED_ROOT_PROPERTIES: &[&str] = &["jcr:primaryType", "jcr:mixinTypes", "jcr:uuid"];

pub struct Importer<'a> {
    conn: &'a Connection,
    behavior: UuidBehavior,
    imported: usize,
}

impl<'a> Importer<'a> {
    pub fn new(conn: &'a Connection, behavior: UuidBehavior) -> Self {
        Self {
            conn,
            behavior,
            imported: 0,
        }
    }

    /// Imports `doc` below `target` and returns the number of nodes written.
    pub fn run(mut self, target: &str, doc: XmlDocument) -> Result<usize, RepositoryError> {
        if !store::node_exists(self.conn, target)? {
            return Err(RepositoryError::PathNotFound(target.to_string()));
        }
        for (prefix, uri) in &doc.namespaces {
            store::register_namespace(self.conn, prefix, uri)?;
        }

        if target == "/" && doc.root.name == "jcr:root" {
            self.merge_into_root(doc.root)?;
        } else {
            self.import_node(target, doc.root)?;
        }
        Ok(self.imported)
    }

    fn merge_into_root(&mut self, root: XmlNode) -> Result<(), RepositoryError> {
        for property in &root.properties {
            if PROTECTED_ROOT_PROPERTIES.contains(&property.name.as_str()) {
                continue;
            }
            store::set_property(self.conn, "/", property)?;
        }
        for child in root.children {
            self.import_node("/", child)?;
        }
        Ok(())
    }

    fn import_node(&mut self, parent: &str, mut node: XmlNode) -> Result<(), RepositoryError> {
        let mut parent = parent.to_string();
        let mut position = None;

        if let Some(existing) = self.colliding_node(&node)? {
            match self.behavior {
                UuidBehavior::Throw => {
                    return Err(RepositoryError::ItemExists(format!(
                        "a node with identifier {} already exists at {existing}",
                        node.uuid().unwrap_or_default()
                    )))
                }
                UuidBehavior::CreateNew => {
                    let fresh = Uuid::new_v4().to_string();
                    if let Some(p) = node.properties.iter_mut().find(|p| p.name == "jcr:uuid") {
                        p.values = vec![fresh];
                    }
                }
                UuidBehavior::RemoveExisting => {
                    ensure_not_ancestor(&existing, &parent)?;
                    log::debug!("removing {existing} to make room for imported identifier");
                    store::remove_subtree(self.conn, &existing)?;
                }
                UuidBehavior::ReplaceExisting => {
                    ensure_not_ancestor(&existing, &parent)?;
                    let (existing_parent, _) = parent_path(&existing).ok_or_else(|| {
                        RepositoryError::Constraint("the root node can not be replaced".into())
                    })?;
                    log::debug!("replacing {existing} with imported node {}", node.name);
                    position = store::position_of(self.conn, &existing)?;
                    parent = existing_parent.to_string();
                    store::remove_subtree(self.conn, &existing)?;
                }
            }
        }

        let path = join_path(&parent, &node.name);
        if store::node_exists(self.conn, &path)? {
            if PROTECTED_CHILDREN.contains(&node.name.as_str()) {
                log::debug!("keeping existing protected node {path}");
                return Ok(());
            }
            return Err(RepositoryError::ItemExists(path));
        }

        store::insert_node(self.conn, &parent, &node.name, position)?;
        for property in &node.properties {
            store::set_property(self.conn, &path, property)?;
        }
        self.imported += 1;

        for child in std::mem::take(&mut node.children) {
            self.import_node(&path, child)?;
        }
        Ok(())
    }

    fn colliding_node(&self, node: &XmlNode) -> Result<Option<String>, RepositoryError> {
        match node.uuid() {
            Some(uuid) => Ok(store::find_by_uuid(self.conn, uuid)?),
            None => Ok(None),
        }
    }
}

fn ensure_not_ancestor(existing: &str, target: &str) -> Result<(), RepositoryError> {
    let is_ancestor = existing == "/"
        || existing == target
        || target.starts_with(&join_path(existing, ""));
    if is_ancestor {
        return Err(RepositoryError::Constraint(format!(
            "identifier collision with {existing}, which contains the import target {target}"
        )));
    }
    Ok(())
}
