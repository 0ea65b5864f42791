//! SQLite layout of one workspace of the embedded store.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::repository::traits::{join_path, parent_path};
use crate::repository::{Node, Property, PropertyType, RepositoryError};
use crate::xml::{XmlNode, BUILTIN_NAMESPACES};

const DB_SCHEMA_VERSION: i64 = 1;

pub fn open(path: &Path) -> Result<Connection, RepositoryError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(std::time::Duration::from_millis(500))?;
    migrate(&conn)?;
    Ok(conn)
}

fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version == DB_SCHEMA_VERSION {
        return Ok(());
    }

    if version == 0 {
        log::info!("initializing workspace store schema v{}", DB_SCHEMA_VERSION);
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE nodes (
                path TEXT PRIMARY KEY,
                parent TEXT,
                name TEXT NOT NULL,
                position INTEGER NOT NULL,
                uuid TEXT UNIQUE
            );
            CREATE INDEX nodes_parent_idx ON nodes(parent, position);
            CREATE TABLE properties (
                node TEXT NOT NULL REFERENCES nodes(path) ON DELETE CASCADE,
                name TEXT NOT NULL,
                kind TEXT NOT NULL,
                multiple INTEGER NOT NULL,
                vals TEXT NOT NULL,
                PRIMARY KEY (node, name)
            );
            CREATE TABLE namespaces (
                prefix TEXT PRIMARY KEY,
                uri TEXT NOT NULL
            );
            INSERT INTO nodes (path, parent, name, position) VALUES ('/', NULL, '', 0);
            INSERT INTO nodes (path, parent, name, position) VALUES ('/jcr:system', '/', 'jcr:system', 0);
            INSERT INTO properties (node, name, kind, multiple, vals)
                VALUES ('/', 'jcr:primaryType', 'Name', 0, '["rep:root"]');
            INSERT INTO properties (node, name, kind, multiple, vals)
                VALUES ('/jcr:system', 'jcr:primaryType', 'Name', 0, '["rep:system"]');
            COMMIT;
            "#,
        )?;
        for (prefix, uri) in BUILTIN_NAMESPACES {
            register_namespace(conn, prefix, uri)?;
        }
        conn.pragma_update(None, "user_version", DB_SCHEMA_VERSION)?;
        return Ok(());
    }

    Err(rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::ErrorCode::SchemaChanged as i32),
        Some(format!(
            "workspace store schema v{version} is not supported (expected v{DB_SCHEMA_VERSION})"
        )),
    ))
}

pub fn node_exists(conn: &Connection, path: &str) -> rusqlite::Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM nodes WHERE path = ?1", params![path], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(found.is_some())
}

pub fn position_of(conn: &Connection, path: &str) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        "SELECT position FROM nodes WHERE path = ?1",
        params![path],
        |row| row.get(0),
    )
    .optional()
}

pub fn children(conn: &Connection, path: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM nodes WHERE parent = ?1 ORDER BY position")?;
    let names = stmt
        .query_map(params![path], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

pub fn properties(conn: &Connection, path: &str) -> Result<Vec<Property>, RepositoryError> {
    let mut stmt = conn.prepare(
        "SELECT name, kind, multiple, vals FROM properties WHERE node = ?1 ORDER BY rowid",
    )?;
    let rows = stmt
        .query_map(params![path], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter()
        .map(|(name, kind, multiple, vals)| {
            Ok(Property {
                name,
                kind: kind.parse::<PropertyType>()?,
                multiple: multiple != 0,
                values: serde_json::from_str(&vals)?,
            })
        })
        .collect()
}

pub fn load_node(conn: &Connection, path: &str) -> Result<Node, RepositoryError> {
    if !node_exists(conn, path)? {
        return Err(RepositoryError::PathNotFound(path.to_string()));
    }
    Ok(Node {
        path: path.to_string(),
        properties: properties(conn, path)?,
        children: children(conn, path)?,
    })
}

/// Reads the subtree at `path` in document order.
pub fn load_tree(
    conn: &Connection,
    path: &str,
    name: &str,
    recurse: bool,
) -> Result<XmlNode, RepositoryError> {
    let mut node = XmlNode::new(name);
    node.properties = properties(conn, path)?;
    if recurse {
        for child in children(conn, path)? {
            let child_path = join_path(path, &child);
            node.children
                .push(load_tree(conn, &child_path, &child, recurse)?);
        }
    }
    Ok(node)
}

/// Inserts a node below `parent`, at `position` or after the last sibling.
pub fn insert_node(
    conn: &Connection,
    parent: &str,
    name: &str,
    position: Option<i64>,
) -> rusqlite::Result<String> {
    let path = join_path(parent, name);
    let position = match position {
        Some(p) => p,
        None => conn.query_row(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM nodes WHERE parent = ?1",
            params![parent],
            |row| row.get(0),
        )?,
    };
    conn.execute(
        "INSERT INTO nodes (path, parent, name, position) VALUES (?1, ?2, ?3, ?4)",
        params![path, parent, name, position],
    )?;
    Ok(path)
}

pub fn set_property(
    conn: &Connection,
    node: &str,
    property: &Property,
) -> Result<(), RepositoryError> {
    let vals = serde_json::to_string(&property.values)?;
    conn.execute(
        "INSERT INTO properties (node, name, kind, multiple, vals) VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(node, name) DO UPDATE SET kind=excluded.kind, multiple=excluded.multiple, vals=excluded.vals",
        params![
            node,
            property.name,
            property.kind.as_str(),
            property.multiple as i64,
            vals
        ],
    )?;
    if property.name == "jcr:uuid" {
        conn.execute(
            "UPDATE nodes SET uuid = ?2 WHERE path = ?1",
            params![node, property.values.first()],
        )?;
    }
    Ok(())
}

pub fn remove_property(conn: &Connection, node: &str, name: &str) -> rusqlite::Result<bool> {
    let removed = conn.execute(
        "DELETE FROM properties WHERE node = ?1 AND name = ?2",
        params![node, name],
    )?;
    if removed > 0 && name == "jcr:uuid" {
        conn.execute("UPDATE nodes SET uuid = NULL WHERE path = ?1", params![node])?;
    }
    Ok(removed > 0)
}

/// Deletes the node at `path` with all descendants and their properties.
pub fn remove_subtree(conn: &Connection, path: &str) -> Result<usize, RepositoryError> {
    if parent_path(path).is_none() {
        return Err(RepositoryError::Constraint("the root node can not be removed".into()));
    }
    let prefix = join_path(path, "");
    let removed = conn.execute(
        "DELETE FROM nodes WHERE path = ?1 OR substr(path, 1, ?2) = ?3",
        params![path, prefix.chars().count() as i64, prefix],
    )?;
    Ok(removed)
}

pub fn find_by_uuid(conn: &Connection, uuid: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT path FROM nodes WHERE uuid = ?1",
        params![uuid],
        |row| row.get(0),
    )
    .optional()
}

pub fn namespaces(conn: &Connection) -> rusqlite::Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare("SELECT prefix, uri FROM namespaces ORDER BY prefix")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn register_namespace(conn: &Connection, prefix: &str, uri: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO namespaces (prefix, uri) VALUES (?1, ?2)
                 ON CONFLICT(prefix) DO UPDATE SET uri=excluded.uri",
        params![prefix, uri],
    )?;
    Ok(())
}
