//! Embedded store: one SQLite database per workspace below the repository
//! home directory. Each session runs inside one open transaction that
//! `commit` closes and reopens.

mod access;
mod importer;
mod store;

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use rusqlite::Connection;

use super::traits::{parent_path, Result};
use super::{
    Credentials, ExportOptions, Node, Repository, RepositoryError, Session, UuidBehavior, View,
};
use crate::xml;

pub use access::AccessConfig;
use importer::Importer;

pub struct LocalRepository {
    config: PathBuf,
    home: PathBuf,
}

impl LocalRepository {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(config: P, home: Q) -> Self {
        Self {
            config: config.as_ref().to_path_buf(),
            home: home.as_ref().to_path_buf(),
        }
    }

    pub fn store_path(&self, workspace: &str) -> PathBuf {
        self.home
            .join("workspaces")
            .join(workspace)
            .join("store.sqlite")
    }
}

impl Repository for LocalRepository {
    fn login(&self, credentials: &Credentials, workspace: &str) -> Result<Box<dyn Session>> {
        AccessConfig::load(&self.config)?.check(credentials, workspace)?;

        let path = self.store_path(workspace);
        log::debug!("opening workspace store {}", path.display());
        let conn = store::open(&path)?;
        conn.execute("BEGIN IMMEDIATE", [])?;

        Ok(Box::new(LocalSession {
            conn: Some(conn),
            workspace: workspace.to_string(),
        }))
    }
}

pub struct LocalSession {
    conn: Option<Connection>,
    workspace: String,
}

impl LocalSession {
    fn conn(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(RepositoryError::Closed)
    }

    fn export(
        &self,
        view: View,
        path: &str,
        options: ExportOptions,
        sink: &mut dyn Write,
    ) -> Result<()> {
        let conn = self.conn()?;
        if !store::node_exists(conn, path)? {
            return Err(RepositoryError::PathNotFound(path.to_string()));
        }
        let name = match parent_path(path) {
            Some((_, name)) => name,
            None => "jcr:root",
        };
        let tree = store::load_tree(conn, path, name, !options.no_recurse)?;
        let namespaces = store::namespaces(conn)?;
        match view {
            View::System => xml::system_view::write(sink, &namespaces, &tree, options),
            View::Document => xml::document_view::write(sink, &namespaces, &tree, options),
        }
    }
}

impl Session for LocalSession {
    fn workspace(&self) -> &str {
        &self.workspace
    }

    fn read_node(&self, path: &str) -> Result<Node> {
        store::load_node(self.conn()?, path)
    }

    fn remove_item(&mut self, path: &str) -> Result<()> {
        let conn = self.conn()?;
        if store::node_exists(conn, path)? {
            store::remove_subtree(conn, path)?;
            return Ok(());
        }
        let removed = match parent_path(path) {
            Some((node, name)) => store::remove_property(conn, node, name)?,
            None => false,
        };
        if !removed {
            return Err(RepositoryError::PathNotFound(path.to_string()));
        }
        Ok(())
    }

    fn export_system_view(
        &self,
        path: &str,
        options: ExportOptions,
        sink: &mut dyn Write,
    ) -> Result<()> {
        self.export(View::System, path, options, sink)
    }

    fn export_document_view(
        &self,
        path: &str,
        options: ExportOptions,
        sink: &mut dyn Write,
    ) -> Result<()> {
        self.export(View::Document, path, options, sink)
    }

    fn import_xml(
        &mut self,
        path: &str,
        source: &mut dyn Read,
        behavior: UuidBehavior,
    ) -> Result<()> {
        let doc = xml::parse(source)?;
        let count = Importer::new(self.conn()?, behavior).run(path, doc)?;
        log::debug!("imported {count} nodes below {path}");
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("COMMIT", [])?;
        conn.execute("BEGIN IMMEDIATE", [])?;
        Ok(())
    }

    fn logout(&mut self) {
        if let Some(conn) = self.conn.take() {
            if !conn.is_autocommit() {
                if let Err(e) = conn.execute("ROLLBACK", []) {
                    log::warn!("discarding pending changes failed: {e}");
                }
            }
            if let Err((_, e)) = conn.close() {
                log::warn!("closing workspace store failed: {e}");
            }
        }
    }
}

impl Drop for LocalSession {
    fn drop(&mut self) {
        self.logout();
    }
}
