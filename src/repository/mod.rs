//! The narrow interface the commands use to reach a content repository,
//! plus one implementation per transport.

pub mod davex;
mod error;
pub mod local;
mod name_pattern;
mod session;
#[cfg(test)]
pub mod testing;
pub mod traits;

pub use error::RepositoryError;
pub use name_pattern::NamePattern;
pub use session::ScopedSession;
pub use traits::{
    Credentials, ExportOptions, Node, Property, PropertyType, Repository, Session, UuidBehavior,
    View,
};

use crate::configuration::Transport;

/// Builds the repository client for the configured transport.
pub fn connect(transport: &Transport) -> Result<Box<dyn Repository>, RepositoryError> {
    match transport {
        Transport::Local { config, home } => {
            log::info!("📂 Local repository home: {}", home.display());
            Ok(Box::new(local::LocalRepository::new(config, home)))
        }
        Transport::Davex { storage } => {
            log::info!("🔗 Remote repository: {}", storage);
            Ok(Box::new(davex::DavexRepository::new(storage.clone())?))
        }
    }
}
