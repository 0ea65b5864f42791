//! In-memory repository double that records every call made through it.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::rc::Rc;

use super::traits::{join_path, parent_path, Result};
use super::{
    Credentials, ExportOptions, Node, Property, PropertyType, Repository, RepositoryError,
    Session, UuidBehavior, View,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Login(String),
    ReadNode(String),
    Remove(String),
    Export(View, String),
    Import(String, UuidBehavior),
    Commit,
    Logout,
}

#[derive(Default)]
struct State {
    nodes: BTreeMap<String, (Vec<Property>, Vec<String>)>,
    calls: Vec<Call>,
    imported: Vec<u8>,
    commits: usize,
    fail_commit: Option<usize>,
    fail_import: bool,
    fail_login: bool,
}

#[derive(Clone, Default)]
pub struct MemoryRepository {
    state: Rc<RefCell<State>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        let repo = Self::default();
        repo.state
            .borrow_mut()
            .nodes
            .insert("/".to_string(), (Vec::new(), Vec::new()));
        repo
    }

    pub fn with_node(self, path: &str) -> Self {
        let mut state = self.state.borrow_mut();
        if let Some((parent, name)) = parent_path(path) {
            if let Some((_, children)) = state.nodes.get_mut(parent) {
                children.push(name.to_string());
            }
        }
        state
            .nodes
            .insert(path.to_string(), (Vec::new(), Vec::new()));
        drop(state);
        self
    }

    pub fn with_property(self, path: &str, name: &str, value: &str) -> Self {
        if let Some((props, _)) = self.state.borrow_mut().nodes.get_mut(path) {
            props.push(Property::single(name, PropertyType::String, value));
        }
        self
    }

    /// Fails the `n`-th commit (1-based).
    pub fn failing_commit(self, n: usize) -> Self {
        self.state.borrow_mut().fail_commit = Some(n);
        self
    }

    pub fn failing_import(self) -> Self {
        self.state.borrow_mut().fail_import = true;
        self
    }

    pub fn failing_login(self) -> Self {
        self.state.borrow_mut().fail_login = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn logins(&self) -> usize {
        self.count(|c| matches!(c, Call::Login(_)))
    }

    pub fn logouts(&self) -> usize {
        self.count(|c| matches!(c, Call::Logout))
    }

    pub fn imported(&self) -> Vec<u8> {
        self.state.borrow().imported.clone()
    }

    pub fn children_of(&self, path: &str) -> Vec<String> {
        self.state
            .borrow()
            .nodes
            .get(path)
            .map(|(_, children)| children.clone())
            .unwrap_or_default()
    }

    pub fn property_names_of(&self, path: &str) -> Vec<String> {
        self.state
            .borrow()
            .nodes
            .get(path)
            .map(|(props, _)| props.iter().map(|p| p.name.clone()).collect())
            .unwrap_or_default()
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state.borrow().calls.iter().filter(|c| pred(c)).count()
    }
}

impl Repository for MemoryRepository {
    fn login(&self, credentials: &Credentials, workspace: &str) -> Result<Box<dyn Session>> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::Login(workspace.to_string()));
        if state.fail_login {
            return Err(RepositoryError::Login {
                user: credentials.username.clone(),
                workspace: workspace.to_string(),
                reason: "rejected by test double".into(),
            });
        }
        Ok(Box::new(MemorySession {
            state: self.state.clone(),
            workspace: workspace.to_string(),
        }))
    }
}

struct MemorySession {
    state: Rc<RefCell<State>>,
    workspace: String,
}

impl MemorySession {
    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl Session for MemorySession {
    fn workspace(&self) -> &str {
        &self.workspace
    }

    fn read_node(&self, path: &str) -> Result<Node> {
        self.record(Call::ReadNode(path.to_string()));
        let state = self.state.borrow();
        let (properties, children) = state
            .nodes
            .get(path)
            .ok_or_else(|| RepositoryError::PathNotFound(path.to_string()))?;
        Ok(Node {
            path: path.to_string(),
            properties: properties.clone(),
            children: children.clone(),
        })
    }

    fn remove_item(&mut self, path: &str) -> Result<()> {
        self.record(Call::Remove(path.to_string()));
        let mut state = self.state.borrow_mut();
        let (parent, name) =
            parent_path(path).ok_or_else(|| RepositoryError::Constraint("root".into()))?;
        if state.nodes.contains_key(path) {
            let prefix = join_path(path, "");
            state
                .nodes
                .retain(|p, _| p != path && !p.starts_with(&prefix));
            if let Some((_, children)) = state.nodes.get_mut(parent) {
                children.retain(|c| c != name);
            }
            return Ok(());
        }
        match state.nodes.get_mut(parent) {
            Some((props, _)) if props.iter().any(|p| p.name == name) => {
                props.retain(|p| p.name != name);
                Ok(())
            }
            _ => Err(RepositoryError::PathNotFound(path.to_string())),
        }
    }

    fn export_system_view(
        &self,
        path: &str,
        _options: ExportOptions,
        sink: &mut dyn Write,
    ) -> Result<()> {
        self.record(Call::Export(View::System, path.to_string()));
        write!(sink, "system:{path}")?;
        Ok(())
    }

    fn export_document_view(
        &self,
        path: &str,
        _options: ExportOptions,
        sink: &mut dyn Write,
    ) -> Result<()> {
        self.record(Call::Export(View::Document, path.to_string()));
        write!(sink, "document:{path}")?;
        Ok(())
    }

    fn import_xml(
        &mut self,
        path: &str,
        source: &mut dyn Read,
        behavior: UuidBehavior,
    ) -> Result<()> {
        self.record(Call::Import(path.to_string(), behavior));
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes)?;
        let mut state = self.state.borrow_mut();
        if state.fail_import {
            return Err(RepositoryError::InvalidContent("rejected by test double".into()));
        }
        state.imported = bytes;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.record(Call::Commit);
        let mut state = self.state.borrow_mut();
        state.commits += 1;
        if state.fail_commit == Some(state.commits) {
            return Err(RepositoryError::Constraint("commit rejected by test double".into()));
        }
        Ok(())
    }

    fn logout(&mut self) {
        self.record(Call::Logout);
    }
}
