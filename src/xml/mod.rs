//! Reading and writing the two XML serializations of a subtree.

pub mod document_view;
pub mod iso9075;
pub mod system_view;

use std::io::Read;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::repository::{Property, RepositoryError};

pub const SV_URI: &str = "http://www.jcp.org/jcr/sv/1.0";

/// Namespaces every workspace knows about.
pub const BUILTIN_NAMESPACES: &[(&str, &str)] = &[
    ("jcr", "http://www.jcp.org/jcr/1.0"),
    ("nt", "http://www.jcp.org/jcr/nt/1.0"),
    ("mix", "http://www.jcp.org/jcr/mix/1.0"),
    ("sv", SV_URI),
    ("rep", "internal"),
    ("sling", "http://sling.apache.org/jcr/sling/1.0"),
];

pub const XMLTEXT: &str = "jcr:xmltext";
pub const XMLCHARACTERS: &str = "jcr:xmlcharacters";

/// A subtree as it appears in a serialization.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct XmlNode {
    pub name: String,
    pub properties: Vec<Property>,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn uuid(&self) -> Option<&str> {
        self.property("jcr:uuid")
            .and_then(|p| p.values.first())
            .map(String::as_str)
    }

    /// Properties in serialization order: primary type, mixins and
    /// identifier first, the rest as stored.
    pub fn ordered_properties(&self) -> Vec<&Property> {
        let rank = |p: &Property| match p.name.as_str() {
            "jcr:primaryType" => 0,
            "jcr:mixinTypes" => 1,
            "jcr:uuid" => 2,
            _ => 3,
        };
        let mut props: Vec<&Property> = self.properties.iter().collect();
        props.sort_by_key(|p| rank(p));
        props
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct XmlDocument {
    pub namespaces: Vec<(String, String)>,
    pub root: XmlNode,
}

/// Parses either view, telling them apart by the root element.
pub fn parse(source: &mut dyn Read) -> Result<XmlDocument, RepositoryError> {
    let mut bytes = Vec::new();
    source.read_to_end(&mut bytes)?;

    if root_element(&bytes)?.as_deref() == Some("sv:node") {
        system_view::read(&bytes)
    } else {
        document_view::read(&bytes)
    }
}

fn root_element(bytes: &[u8]) -> Result<Option<String>, RepositoryError> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => {
                return Ok(Some(String::from_utf8_lossy(e.name().as_ref()).into_owned()))
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

pub(crate) fn namespace_declaration(key: &[u8], value: &str) -> Option<(String, String)> {
    let prefix = key.strip_prefix(b"xmlns:")?;
    Some((String::from_utf8_lossy(prefix).into_owned(), value.to_string()))
}

pub(crate) fn missing_root() -> RepositoryError {
    RepositoryError::InvalidContent("document has no root node".into())
}
