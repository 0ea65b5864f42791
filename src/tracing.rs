//! Logging setup: `log` records are bridged into a `tracing` fmt subscriber
//! that writes to stderr, and to the log file as well when one is given.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

/// Hands out writers that copy every line to stderr and the optional file.
#[derive(Clone, Default)]
struct Tee {
    file: Option<Arc<Mutex<File>>>,
}

struct TeeWriter<'a> {
    file: Option<&'a Mutex<File>>,
}

impl<'a> MakeWriter<'a> for Tee {
    type Writer = TeeWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        TeeWriter {
            file: self.file.as_deref(),
        }
    }
}

impl Write for TeeWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = io::stderr().write(buf)?;
        if let Some(Ok(mut file)) = self.file.map(Mutex::lock) {
            let _ = file.write_all(&buf[..written]);
        }
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        if let Some(Ok(mut file)) = self.file.map(Mutex::lock) {
            file.flush()?;
        }
        Ok(())
    }
}

/// Installs the subscriber. `RUST_LOG` picks the filter, `info` otherwise.
///
/// Logging to stderr is set up even when `log_file` can not be opened; the
/// open error is returned so the caller can report it.
pub fn init(log_file: Option<&Path>) -> io::Result<()> {
    let (tee, opened) = match log_file.map(open_log_file).transpose() {
        Ok(file) => (
            Tee {
                file: file.map(|f| Arc::new(Mutex::new(f))),
            },
            Ok(()),
        ),
        Err(e) => (Tee::default(), Err(e)),
    };
    let ansi = tee.file.is_none();

    let _ = tracing_log::LogTracer::init();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(tee)
        .with_ansi(ansi)
        .with_target(false)
        .try_init();

    opened
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
