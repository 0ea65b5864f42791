use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use super::{NamePattern, RepositoryError};

pub type Result<T> = std::result::Result<T, RepositoryError>;

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***REDACTED***")
            .finish()
    }
}

/// Property types as named in the system view `sv:type` attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyType {
    String,
    Binary,
    Long,
    Double,
    Decimal,
    Date,
    Boolean,
    Name,
    Path,
    Reference,
    WeakReference,
    Uri,
    Undefined,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::String => "String",
            PropertyType::Binary => "Binary",
            PropertyType::Long => "Long",
            PropertyType::Double => "Double",
            PropertyType::Decimal => "Decimal",
            PropertyType::Date => "Date",
            PropertyType::Boolean => "Boolean",
            PropertyType::Name => "Name",
            PropertyType::Path => "Path",
            PropertyType::Reference => "Reference",
            PropertyType::WeakReference => "WeakReference",
            PropertyType::Uri => "URI",
            PropertyType::Undefined => "undefined",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self> {
        let kind = match s {
            "String" => PropertyType::String,
            "Binary" => PropertyType::Binary,
            "Long" => PropertyType::Long,
            "Double" => PropertyType::Double,
            "Decimal" => PropertyType::Decimal,
            "Date" => PropertyType::Date,
            "Boolean" => PropertyType::Boolean,
            "Name" => PropertyType::Name,
            "Path" => PropertyType::Path,
            "Reference" => PropertyType::Reference,
            "WeakReference" => PropertyType::WeakReference,
            "URI" => PropertyType::Uri,
            "undefined" | "Undefined" => PropertyType::Undefined,
            other => {
                return Err(RepositoryError::InvalidContent(format!(
                    "unknown property type {other}"
                )))
            }
        };
        Ok(kind)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub kind: PropertyType,
    pub multiple: bool,
    pub values: Vec<String>,
}

impl Property {
    pub fn single(name: impl Into<String>, kind: PropertyType, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            multiple: false,
            values: vec![value.into()],
        }
    }

    pub fn multi(name: impl Into<String>, kind: PropertyType, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            multiple: true,
            values,
        }
    }
}

/// One level of the tree as read through a session: the node's own
/// properties plus the names of its direct children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub path: String,
    pub properties: Vec<Property>,
    pub children: Vec<String>,
}

impl Node {
    pub fn name(&self) -> &str {
        match self.path.rfind('/') {
            Some(idx) => &self.path[idx + 1..],
            None => &self.path,
        }
    }

    pub fn children<'a>(&'a self, filter: &'a NamePattern) -> impl Iterator<Item = &'a str> + 'a {
        self.children
            .iter()
            .map(String::as_str)
            .filter(move |name| filter.matches(name))
    }

    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter()
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn child_path(&self, name: &str) -> String {
        join_path(&self.path, name)
    }
}

pub fn join_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

pub fn parent_path(path: &str) -> Option<(&str, &str)> {
    if path == "/" {
        return None;
    }
    let idx = path.rfind('/')?;
    let parent = if idx == 0 { "/" } else { &path[..idx] };
    Some((parent, &path[idx + 1..]))
}

/// What to do when an imported node carries an identifier that already
/// exists in the workspace. Discriminants match the JCR constants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum UuidBehavior {
    CreateNew = 0,
    RemoveExisting = 1,
    #[default]
    ReplaceExisting = 2,
    Throw = 3,
}

impl UuidBehavior {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl FromStr for UuidBehavior {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "create-new" | "0" => Ok(UuidBehavior::CreateNew),
            "remove-existing" | "1" => Ok(UuidBehavior::RemoveExisting),
            "replace" | "replace-existing" | "2" => Ok(UuidBehavior::ReplaceExisting),
            "throw" | "3" => Ok(UuidBehavior::Throw),
            other => Err(format!(
                "expected create-new, remove-existing, replace or throw, got {other}"
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExportOptions {
    pub skip_binary: bool,
    pub no_recurse: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum View {
    System,
    Document,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::System => f.write_str("system view"),
            View::Document => f.write_str("document view"),
        }
    }
}

pub trait Repository {
    fn login(&self, credentials: &Credentials, workspace: &str) -> Result<Box<dyn Session>>;
}

/// A live connection to one workspace. Mutations stay pending until
/// `commit`; `logout` discards anything not committed.
pub trait Session {
    fn workspace(&self) -> &str;

    fn read_node(&self, path: &str) -> Result<Node>;

    /// Removes the node or property at `path`.
    fn remove_item(&mut self, path: &str) -> Result<()>;

    fn export_system_view(
        &self,
        path: &str,
        options: ExportOptions,
        sink: &mut dyn Write,
    ) -> Result<()>;

    fn export_document_view(
        &self,
        path: &str,
        options: ExportOptions,
        sink: &mut dyn Write,
    ) -> Result<()>;

    fn import_xml(
        &mut self,
        path: &str,
        source: &mut dyn Read,
        behavior: UuidBehavior,
    ) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn logout(&mut self);

    fn export_view(
        &self,
        view: View,
        path: &str,
        options: ExportOptions,
        sink: &mut dyn Write,
    ) -> Result<()> {
        match view {
            View::System => self.export_system_view(path, options, sink),
            View::Document => self.export_document_view(path, options, sink),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_path_splits_last_segment() {
        assert_eq!(parent_path("/"), None);
        assert_eq!(parent_path("/content"), Some(("/", "content")));
        assert_eq!(parent_path("/content/site"), Some(("/content", "site")));
    }

    #[test]
    fn join_path_handles_root() {
        assert_eq!(join_path("/", "a"), "/a");
        assert_eq!(join_path("/a", "b"), "/a/b");
    }

    #[test]
    fn node_children_apply_filter() {
        let node = Node {
            path: "/content".into(),
            properties: vec![],
            children: vec!["en".into(), "de".into(), "assets".into()],
        };
        let filter = NamePattern::parse("e*|de");
        let names: Vec<&str> = node.children(&filter).collect();
        assert_eq!(names, vec!["en", "de"]);
        assert_eq!(node.name(), "content");
    }

    #[test]
    fn uuid_behavior_parses_names_and_codes() {
        assert_eq!("replace".parse::<UuidBehavior>(), Ok(UuidBehavior::ReplaceExisting));
        assert_eq!("3".parse::<UuidBehavior>(), Ok(UuidBehavior::Throw));
        assert_eq!(UuidBehavior::RemoveExisting.code(), 1);
        assert!("sometimes".parse::<UuidBehavior>().is_err());
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials::new("admin", "s3cret");
        let shown = format!("{creds:?}");
        assert!(shown.contains("admin"));
        assert!(!shown.contains("s3cret"));
    }
}
