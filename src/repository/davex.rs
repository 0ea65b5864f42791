//! Remote repository reached through the JCR remoting ("davex") endpoint,
//! e.g. `http://localhost:8080/server/`.

use std::io::{Read, Write};

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode};
use serde_json::{Map, Value};
use url::Url;

use super::traits::Result;
use super::{
    Credentials, ExportOptions, Node, Property, PropertyType, Repository, RepositoryError,
    Session, UuidBehavior, View,
};

const IMPORT_UUID_BEHAVIOR_HEADER: &str = "ImportUUIDBehavior";
const DCR_NAMESPACE: &str = "http://www.day.com/jcr/webdav/1.0";

pub struct DavexRepository {
    storage: Url,
    client: Client,
}

impl DavexRepository {
    pub fn new(storage: Url) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("jack/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { storage, client })
    }
}

impl Repository for DavexRepository {
    fn login(&self, credentials: &Credentials, workspace: &str) -> Result<Box<dyn Session>> {
        let session = DavexSession {
            client: self.client.clone(),
            storage: self.storage.clone(),
            workspace: workspace.to_string(),
            credentials: credentials.clone(),
            pending: String::new(),
        };

        let url = item_url(&self.storage, workspace, "/", ".0.json")?;
        log::debug!("checking access to {url}");
        let response = session.request(Method::GET, url.clone()).send()?;
        match response.status() {
            s if s.is_success() => Ok(Box::new(session)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RepositoryError::Login {
                user: credentials.username.clone(),
                workspace: workspace.to_string(),
                reason: format!("server answered {}", response.status()),
            }),
            StatusCode::NOT_FOUND | StatusCode::CONFLICT => {
                Err(RepositoryError::NoSuchWorkspace(workspace.to_string()))
            }
            _ => Err(status_error(response, &url)),
        }
    }
}

pub struct DavexSession {
    client: Client,
    storage: Url,
    workspace: String,
    credentials: Credentials,
    /// Removals not yet sent, in the remoting diff format.
    pending: String,
}

impl DavexSession {
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.credentials.username, Some(self.credentials.password()))
    }

    fn export(
        &self,
        view: View,
        path: &str,
        options: ExportOptions,
        sink: &mut dyn Write,
    ) -> Result<()> {
        let url = item_url(&self.storage, &self.workspace, path, "")?;
        let method = Method::from_bytes(b"REPORT")
            .map_err(|e| RepositoryError::InvalidContent(e.to_string()))?;
        let response = self
            .request(method, url.clone())
            .header("Depth", "0")
            .header("Content-Type", "text/xml; charset=UTF-8")
            .body(export_report_body(view, options))
            .send()?;
        let mut response = expect_found(response, &url, path)?;
        response.copy_to(sink)?;
        Ok(())
    }
}

impl Session for DavexSession {
    fn workspace(&self) -> &str {
        &self.workspace
    }

    fn read_node(&self, path: &str) -> Result<Node> {
        let url = item_url(&self.storage, &self.workspace, path, ".1.json")?;
        let response = self.request(Method::GET, url.clone()).send()?;
        let json: Value = expect_found(response, &url, path)?.json()?;
        node_from_json(path, json)
    }

    fn remove_item(&mut self, path: &str) -> Result<()> {
        self.pending.push_str(&format!("-{path} : \n"));
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
        if !self.pending.is_empty() {
            return Err(RepositoryError::Constraint(
                "pending removals must be committed before importing".into(),
            ));
        }
        let mut body = Vec::new();
        source.read_to_end(&mut body)?;

        let url = item_url(&self.storage, &self.workspace, path, "")?;
        log::debug!("uploading {} bytes to {url}", body.len());
        let response = self
            .request(Method::PUT, url.clone())
            .header("Content-Type", "text/xml")
            .header(IMPORT_UUID_BEHAVIOR_HEADER, behavior.code().to_string())
            .body(body)
            .send()?;
        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::CONFLICT => Err(RepositoryError::ItemExists(
                response.text().unwrap_or_default(),
            )),
            _ => Err(status_error(response, &url)),
        }
    }

    fn commit(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let url = item_url(&self.storage, &self.workspace, "/", "")?;
        log::debug!("sending {} pending removals", self.pending.lines().count());
        let response = self
            .request(Method::POST, url.clone())
            .form(&[(":diff", self.pending.as_str())])
            .send()?;
        if !response.status().is_success() {
            return Err(status_error(response, &url));
        }
        self.pending.clear();
        Ok(())
    }

    fn logout(&mut self) {
        if !self.pending.is_empty() {
            log::warn!(
                "discarding {} uncommitted removals",
                self.pending.lines().count()
            );
            self.pending.clear();
        }
    }
}

/// `<storage>/<workspace>/jcr:root<path><suffix>`
fn item_url(storage: &Url, workspace: &str, path: &str, suffix: &str) -> Result<Url> {
    let mut url = storage.clone();
    {
        let mut segments = url.path_segments_mut().map_err(|_| RepositoryError::Config {
            path: storage.to_string(),
            reason: "storage URL can not carry a path".into(),
        })?;
        segments.pop_if_empty();
        segments.push(workspace);

        let names: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match names.split_last() {
            None => {
                segments.push(&format!("jcr:root{suffix}"));
            }
            Some((last, ancestors)) => {
                segments.push("jcr:root");
                segments.extend(ancestors);
                segments.push(&format!("{last}{suffix}"));
            }
        }
    }
    Ok(url)
}

fn export_report_body(view: View, options: ExportOptions) -> String {
    let mut body = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><dcr:exportview xmlns:dcr="{DCR_NAMESPACE}">"#
    );
    if view == View::System {
        body.push_str("<dcr:sysview/>");
    }
    if options.skip_binary {
        body.push_str("<dcr:skipbinary/>");
    }
    if options.no_recurse {
        body.push_str("<dcr:norecurse/>");
    }
    body.push_str("</dcr:exportview>");
    body
}

/// Maps the remoting JSON rendering of a node. Keys starting with `:` carry
/// type hints, or the length of a binary property.
fn node_from_json(path: &str, json: Value) -> Result<Node> {
    let Value::Object(map) = json else {
        return Err(RepositoryError::InvalidContent(format!(
            "expected a JSON object for {path}"
        )));
    };

    let mut node = Node {
        path: path.to_string(),
        properties: Vec::new(),
        children: Vec::new(),
    };

    for (key, value) in &map {
        if let Some(hinted) = key.strip_prefix(':') {
            if !hinted.starts_with(':') && value.is_number() && !map.contains_key(hinted) {
                node.properties.push(Property {
                    name: hinted.to_string(),
                    kind: PropertyType::Binary,
                    multiple: false,
                    values: Vec::new(),
                });
            }
            continue;
        }
        match value {
            Value::Object(_) => node.children.push(key.clone()),
            other => node.properties.push(json_property(key, other, &map)?),
        }
    }
    Ok(node)
}

fn json_property(name: &str, value: &Value, map: &Map<String, Value>) -> Result<Property> {
    let hint = map
        .get(&format!(":{name}"))
        .and_then(Value::as_str)
        .map(str::parse::<PropertyType>)
        .transpose()?;

    let (multiple, items): (bool, Vec<&Value>) = match value {
        Value::Array(items) => (true, items.iter().collect()),
        single => (false, vec![single]),
    };
    let kind = hint.unwrap_or_else(|| match items.first() {
        Some(Value::Bool(_)) => PropertyType::Boolean,
        Some(Value::Number(n)) if n.is_f64() => PropertyType::Double,
        Some(Value::Number(_)) => PropertyType::Long,
        _ => PropertyType::String,
    });
    let values = items
        .into_iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();

    Ok(Property {
        name: name.to_string(),
        kind,
        multiple,
        values,
    })
}

fn expect_found(response: Response, url: &Url, path: &str) -> Result<Response> {
    match response.status() {
        s if s.is_success() => Ok(response),
        StatusCode::NOT_FOUND => Err(RepositoryError::PathNotFound(path.to_string())),
        _ => Err(status_error(response, url)),
    }
}

fn status_error(response: Response, url: &Url) -> RepositoryError {
    let status = response.status().as_u16();
    RepositoryError::Status {
        status,
        url: url.to_string(),
        body: response.text().unwrap_or_default(),
    }
}
