use std::io::Write;

use quick_xml::events::{BytesDecl, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::{iso9075, missing_root, namespace_declaration, XmlDocument, XmlNode};
use super::{XMLCHARACTERS, XMLTEXT};
use crate::repository::{ExportOptions, Property, PropertyType, RepositoryError};

pub fn read(bytes: &[u8]) -> Result<XmlDocument, RepositoryError> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();

    let mut namespaces = Vec::new();
    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        let event = reader.read_event_into(&mut buf)?;
        match &event {
            Event::Start(e) | Event::Empty(e) => {
                let qname = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let mut node = XmlNode::new(iso9075::decode(&qname));
                for attr in e.attributes() {
                    let attr = attr?;
                    let text = attr.unescape_value()?;
                    let key = attr.key.as_ref();
                    if key == b"xmlns" {
                        continue;
                    }
                    if let Some(ns) = namespace_declaration(key, &text) {
                        namespaces.push(ns);
                        continue;
                    }
                    let name = iso9075::decode(&String::from_utf8_lossy(key));
                    node.properties.push(attribute_property(name, &text));
                }
                stack.push(node);
            }
            Event::Text(t) => {
                let text = t.unescape()?;
                if !text.trim().is_empty() {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(xml_text(&text));
                    }
                }
            }
            Event::CData(c) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(xml_text(&String::from_utf8_lossy(c.as_ref())));
                }
            }
            Event::Eof => break,
            _ => {}
        }

        if matches!(event, Event::End(_) | Event::Empty(_)) {
            let node = stack.pop().ok_or_else(missing_root)?;
            match stack.last_mut() {
                Some(parent) => parent.children.push(node),
                None => root = Some(node),
            }
        }

        buf.clear();
    }

    let root = root.ok_or_else(missing_root)?;
    Ok(XmlDocument { namespaces, root })
}

fn attribute_property(name: String, value: &str) -> Property {
    match name.as_str() {
        "jcr:primaryType" => Property::single(name, PropertyType::Name, value),
        "jcr:mixinTypes" => Property::multi(
            name,
            PropertyType::Name,
            value.split_whitespace().map(iso9075::decode).collect(),
        ),
        _ => Property::single(name, PropertyType::String, value),
    }
}

fn xml_text(text: &str) -> XmlNode {
    let mut node = XmlNode::new(XMLTEXT);
    node.properties
        .push(Property::single(XMLCHARACTERS, PropertyType::String, text));
    node
}

pub fn write(
    sink: &mut dyn Write,
    namespaces: &[(String, String)],
    root: &XmlNode,
    options: ExportOptions,
) -> Result<(), RepositoryError> {
    let mut writer = Writer::new_with_indent(sink, b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_node(&mut writer, root, Some(namespaces), options)?;
    writer.get_mut().write_all(b"\n")?;
    writer.get_mut().flush()?;
    Ok(())
}

fn write_node<W: Write>(
    writer: &mut Writer<W>,
    node: &XmlNode,
    namespaces: Option<&[(String, String)]>,
    options: ExportOptions,
) -> Result<(), RepositoryError> {
    let name = iso9075::encode(&node.name);
    let mut start = BytesStart::new(name.as_str());
    for (prefix, uri) in namespaces.unwrap_or_default() {
        start.push_attribute((format!("xmlns:{prefix}").as_str(), uri.as_str()));
    }
    for property in node.ordered_properties() {
        let value = attribute_value(property, options);
        start.push_attribute((iso9075::encode(&property.name).as_str(), value.as_str()));
    }

    if options.no_recurse || node.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start.borrow()))?;
    for child in &node.children {
        match text_of(child) {
            Some(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
            None => write_node(writer, child, None, options)?,
        }
    }
    writer.write_event(Event::End(start.to_end()))?;
    Ok(())
}

fn text_of(node: &XmlNode) -> Option<&str> {
    if node.name != XMLTEXT {
        return None;
    }
    node.property(XMLCHARACTERS)
        .and_then(|p| p.values.first())
        .map(String::as_str)
}

fn attribute_value(property: &Property, options: ExportOptions) -> String {
    if options.skip_binary && property.kind == PropertyType::Binary {
        return String::new();
    }
    if property.multiple {
        property
            .values
            .iter()
            .map(|v| v.replace(' ', "_x0020_"))
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        property.values.first().cloned().unwrap_or_default()
    }
}
