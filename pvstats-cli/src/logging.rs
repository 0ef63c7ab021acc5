//! Logger set-up for the pvstats binary.
//!
//! Records go to stderr through `env_logger`; when a log file is configured
//! every record is appended to it as well.

use std::fs::File;
use std::io::{self, Write};

use camino::Utf8Path;
use env_logger::{Builder, Target};
use log::LevelFilter;

use crate::CliError;

/// Writer duplicating log output to stderr and a file.
#[derive(Debug)]
pub(crate) struct Tee<W> {
    stderr: io::Stderr,
    file: W,
}

impl<W: Write> Tee<W> {
    pub(crate) fn new(file: W) -> Self {
        Self {
            stderr: io::stderr(),
            file,
        }
    }
}

impl<W: Write> Write for Tee<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stderr.write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stderr.flush()?;
        self.file.flush()
    }
}

fn open_log_file(path: &Utf8Path) -> Result<File, CliError> {
    pvstats_fs::append_file(path).map_err(|source| CliError::OpenLogFile {
        path: path.to_owned(),
        source,
    })
}

/// Install the global logger at `level`, optionally mirroring to `log_file`.
pub(crate) fn init(level: LevelFilter, log_file: Option<&Utf8Path>) -> Result<(), CliError> {
    let mut builder = Builder::new();
    builder.filter_level(level);
    if let Some(path) = log_file {
        let file = open_log_file(path)?;
        builder.target(Target::Pipe(Box::new(Tee::new(file))));
    }
    builder.try_init().map_err(CliError::InitLogging)?;
    log::debug!("logging at {level}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    fn tee_copies_every_record_to_the_file() {
        let mut tee = Tee::new(Vec::new());
        tee.write_all(b"first\n").expect("write");
        tee.write_all(b"second\n").expect("write");
        tee.flush().expect("flush");
        assert_eq!(tee.file, b"first\nsecond\n");
    }

    #[rstest]
    fn log_files_open_below_missing_folders() {
        let dir = TempDir::new().expect("tempdir");
        let root = camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .expect("utf-8 tempdir");
        let path = root.join("logs/pvstats.log");
        let mut file = open_log_file(&path).expect("log file");
        file.write_all(b"record\n").expect("write");
        assert!(pvstats_fs::file_is_file(&path).expect("inspect"));
    }
}
