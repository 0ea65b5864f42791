use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("login failed for user {user} on workspace {workspace}: {reason}")]
    Login {
        user: String,
        workspace: String,
        reason: String,
    },
    #[error("invalid repository configuration {path}: {reason}")]
    Config { path: String, reason: String },
    #[error("no workspace named {0}")]
    NoSuchWorkspace(String),
    #[error("path not found: {0}")]
    PathNotFound(String),
    #[error("item exists: {0}")]
    ItemExists(String),
    #[error("constraint violation: {0}")]
    Constraint(String),
    #[error("invalid serialized content: {0}")]
    InvalidContent(String),
    #[error("repository responded with {status} for {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },
    #[error("session already closed")]
    Closed,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<quick_xml::events::attributes::AttrError> for RepositoryError {
    fn from(value: quick_xml::events::attributes::AttrError) -> Self {
        RepositoryError::Xml(value.into())
    }
}
