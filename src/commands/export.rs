use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::configuration::Configuration;
use crate::error::JackError;
use crate::repository::{RepositoryError, Session, View};

pub fn check_target(file: &Path) -> Result<(), JackError> {
    if file.exists() {
        return Err(JackError::ExportTargetExists(file.to_path_buf()));
    }
    Ok(())
}

/// Writes the subtree at the configured base path to a new file. A partial
/// file is removed again when the export fails.
pub fn export(
    session: &dyn Session,
    view: View,
    config: &Configuration,
    file: &Path,
) -> Result<(), JackError> {
    let base = config.base_path.as_str();
    let handle = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(file)
        .map_err(|source| match source.kind() {
            io::ErrorKind::AlreadyExists => JackError::ExportTargetExists(file.to_path_buf()),
            _ => JackError::File {
                path: file.to_path_buf(),
                source,
            },
        })?;

    log::info!("📤 Exporting {} of {} to {}", view, base, file.display());
    let mut sink = BufWriter::new(handle);
    let written = session
        .export_view(view, base, config.export, &mut sink)
        .and_then(|()| sink.flush().map_err(RepositoryError::from));

    if let Err(source) = written {
        drop(sink);
        if let Err(e) = fs::remove_file(file) {
            log::warn!("could not remove partial export {}: {}", file.display(), e);
        }
        return Err(JackError::Export {
            path: base.to_string(),
            file: file.to_path_buf(),
            source,
        });
    }

    log::info!("✅ Exported the repository to {}", file.display());
    Ok(())
}
