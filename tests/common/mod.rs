#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use camino::Utf8PathBuf;
use flate2::Compression;
use flate2::write::GzEncoder;

use blastdb_manager::app::{ProgressEvent, ProgressSink};
use blastdb_manager::domain::DatabaseSpec;
use blastdb_manager::error::BlastDbError;
use blastdb_manager::fetch::SourceClient;
use blastdb_manager::formatter::{DatabaseFormatter, FormatInput};

pub fn gzip(content: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content).unwrap();
    encoder.finish().unwrap()
}

pub fn utf8_tempdir() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, path)
}

pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect::<Vec<_>>();
    names.sort();
    names
}

/// Serves canned payloads by URL; anything else fails like a refused connection.
#[derive(Default)]
pub struct MockSource {
    payloads: HashMap<String, Vec<u8>>,
    pub calls: Mutex<Vec<String>>,
}

impl MockSource {
    pub fn with(mut self, url: &str, payload: Vec<u8>) -> Self {
        self.payloads.insert(url.to_string(), payload);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl SourceClient for MockSource {
    fn download(&self, url: &str, destination: &Path) -> Result<(), BlastDbError> {
        self.calls.lock().unwrap().push(url.to_string());
        let payload = self.payloads.get(url).ok_or_else(|| BlastDbError::FetchHttp {
            url: url.to_string(),
            message: "connection refused".to_string(),
        })?;
        std::fs::write(destination, payload).map_err(|err| BlastDbError::Filesystem(err.to_string()))
    }
}

/// Touches every expected database file instead of running makeblastdb.
#[derive(Default)]
pub struct MockFormatter {
    pub fail: bool,
    pub calls: Mutex<usize>,
}

impl MockFormatter {
    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl DatabaseFormatter for MockFormatter {
    fn format(&self, spec: &DatabaseSpec, _input: FormatInput) -> Result<(), BlastDbError> {
        *self.calls.lock().unwrap() += 1;
        if self.fail {
            return Err(BlastDbError::Build {
                name: spec.name().to_string(),
                message: "exit status: 1".to_string(),
            });
        }
        for path in spec.expected_files() {
            std::fs::write(path.as_std_path(), b"").unwrap();
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<String>>,
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event.message);
    }
}
