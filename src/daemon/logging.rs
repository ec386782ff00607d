use env_logger::{Builder, Env, Target};
use log::{info, warn};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Writes everything to the console and a copy to a second sink.
///
/// Errors from the copy are dropped so a full disk never silences stderr.
pub struct TeeWriter<C, F> {
    console: C,
    copy: F,
}

impl<C: Write, F: Write> TeeWriter<C, F> {
    pub fn new(console: C, copy: F) -> Self {
        Self { console, copy }
    }
}

impl<C: Write, F: Write> Write for TeeWriter<C, F> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.console.write_all(buf)?;
        let _ = self.copy.write_all(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = self.copy.flush();
        self.console.flush()
    }
}

/// Open `path` for appending, creating it and its directory when missing.
pub fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global logger: stderr always, plus `log_file` when it can be
/// opened. `RUST_LOG` overrides the default `info` filter.
pub fn init(log_file: Option<&Path>) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));

    let mut unavailable = None;
    if let Some(path) = log_file {
        match open_log_file(path) {
            Ok(file) => {
                builder.target(Target::Pipe(Box::new(TeeWriter::new(io::stderr(), file))));
            }
            Err(error) => unavailable = Some(error),
        }
    }
    builder.init();

    match (log_file, unavailable) {
        (Some(path), Some(error)) => {
            warn!("Could not open log file {}: {error}. Logging to stderr only.", path.display())
        }
        (Some(path), None) => info!("Logging to {}", path.display()),
        (None, _) => {}
    }
}
