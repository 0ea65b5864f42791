use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::{missing_root, namespace_declaration, XmlDocument, XmlNode};
use crate::repository::{ExportOptions, Property, PropertyType, RepositoryError};

struct PendingProperty {
    property: Property,
    declared_multiple: bool,
}

pub fn read(bytes: &[u8]) -> Result<XmlDocument, RepositoryError> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();

    let mut namespaces = Vec::new();
    let mut stack: Vec<XmlNode> = Vec::new();
    let mut property: Option<PendingProperty> = None;
    let mut value: Option<String> = None;
    let mut root: Option<XmlNode> = None;

    loop {
        let event = reader.read_event_into(&mut buf)?;
        let start = match &event {
            Event::Start(e) | Event::Empty(e) => Some(e),
            _ => None,
        };

        if let Some(e) = start {
            match e.name().as_ref() {
                b"sv:node" => {
                    let mut node = XmlNode::default();
                    for attr in e.attributes() {
                        let attr = attr?;
                        let text = attr.unescape_value()?;
                        if attr.key.as_ref() == b"sv:name" {
                            node.name = text.into_owned();
                        } else if let Some(ns) = namespace_declaration(attr.key.as_ref(), &text) {
                            namespaces.push(ns);
                        }
                    }
                    stack.push(node);
                }
                b"sv:property" => {
                    let mut pending = PendingProperty {
                        property: Property {
                            name: String::new(),
                            kind: PropertyType::String,
                            multiple: false,
                            values: Vec::new(),
                        },
                        declared_multiple: false,
                    };
                    for attr in e.attributes() {
                        let attr = attr?;
                        let text = attr.unescape_value()?;
                        match attr.key.as_ref() {
                            b"sv:name" => pending.property.name = text.into_owned(),
                            b"sv:type" => pending.property.kind = text.parse()?,
                            b"sv:multiple" => pending.declared_multiple = text == "true",
                            _ => {}
                        }
                    }
                    property = Some(pending);
                }
                b"sv:value" => value = Some(String::new()),
                other => {
                    return Err(RepositoryError::InvalidContent(format!(
                        "unexpected element {} in system view",
                        String::from_utf8_lossy(other)
                    )))
                }
            }
        }

        let end = match &event {
            Event::End(e) => Some(e.name().as_ref().to_vec()),
            Event::Empty(e) => Some(e.name().as_ref().to_vec()),
            _ => None,
        };

        match &event {
            Event::Text(t) => {
                if let Some(v) = value.as_mut() {
                    v.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some(v) = value.as_mut() {
                    v.push_str(&String::from_utf8_lossy(c.as_ref()));
                }
            }
            Event::Eof => break,
            _ => {}
        }

        if let Some(name) = end {
            match name.as_slice() {
                b"sv:value" => {
                    if let (Some(p), Some(v)) = (property.as_mut(), value.take()) {
                        p.property.values.push(v);
                    }
                }
                b"sv:property" => {
                    if let Some(mut p) = property.take() {
                        p.property.multiple =
                            p.declared_multiple || p.property.values.len() != 1;
                        let node = stack.last_mut().ok_or_else(missing_root)?;
                        node.properties.push(p.property);
                    }
                }
                b"sv:node" => {
                    let node = stack.pop().ok_or_else(missing_root)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => root = Some(node),
                    }
                }
                _ => {}
            }
        }

        buf.clear();
    }

    let root = root.ok_or_else(missing_root)?;
    Ok(XmlDocument { namespaces, root })
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
    let mut start = BytesStart::new("sv:node");
    for (prefix, uri) in namespaces.unwrap_or_default() {
        start.push_attribute((format!("xmlns:{prefix}").as_str(), uri.as_str()));
    }
    start.push_attribute(("sv:name", node.name.as_str()));
    writer.write_event(Event::Start(start))?;

    for property in node.ordered_properties() {
        let mut elem = BytesStart::new("sv:property");
        elem.push_attribute(("sv:name", property.name.as_str()));
        elem.push_attribute(("sv:type", property.kind.as_str()));
        if property.multiple {
            elem.push_attribute(("sv:multiple", "true"));
        }
        writer.write_event(Event::Start(elem))?;
        for value in &property.values {
            let value = if options.skip_binary && property.kind == PropertyType::Binary {
                ""
            } else {
                value.as_str()
            };
            writer.write_event(Event::Start(BytesStart::new("sv:value")))?;
            writer.write_event(Event::Text(BytesText::new(value)))?;
            writer.write_event(Event::End(BytesEnd::new("sv:value")))?;
        }
        writer.write_event(Event::End(BytesEnd::new("sv:property")))?;
    }

    if !options.no_recurse {
        for child in &node.children {
            write_node(writer, child, None, options)?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new("sv:node")))?;
    Ok(())
}
