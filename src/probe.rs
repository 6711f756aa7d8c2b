use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use camino::Utf8Path;
use tracing::debug;

/// Index and alias files `blastdbcmd` resolves a database name through.
const INDEX_EXTENSIONS: &[&str] = &["nin", "pin", "nal", "pal"];

pub trait DatabaseProbe: Send + Sync {
    fn exists_compiled_database(&self, path: &Utf8Path) -> bool;
}

/// Asks `blastdbcmd` whether it can open the database at `path`.
#[derive(Debug, Clone)]
pub struct BlastdbcmdProbe {
    program: PathBuf,
}

impl BlastdbcmdProbe {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn from_path() -> Option<Self> {
        find_in_path("blastdbcmd").map(Self::new)
    }
}

impl DatabaseProbe for BlastdbcmdProbe {
    fn exists_compiled_database(&self, path: &Utf8Path) -> bool {
        let status = Command::new(&self.program)
            .args(["-db", path.as_str(), "-info"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match status {
            Ok(status) => status.success(),
            Err(err) => {
                debug!(program = %self.program.display(), "blastdbcmd failed to start: {err}");
                false
            }
        }
    }
}

/// Looks for a BLAST index or alias file next to `path`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexFileProbe;

impl DatabaseProbe for IndexFileProbe {
    fn exists_compiled_database(&self, path: &Utf8Path) -> bool {
        INDEX_EXTENSIONS
            .iter()
            .any(|ext| Path::new(&format!("{path}.{ext}")).exists())
    }
}

/// `blastdbcmd` when it is installed, the index-file check otherwise.
pub fn system_probe() -> Box<dyn DatabaseProbe> {
    match BlastdbcmdProbe::from_path() {
        Some(probe) => Box::new(probe),
        None => {
            debug!("blastdbcmd not on PATH; probing for index files instead");
            Box::new(IndexFileProbe)
        }
    }
}

impl<P: DatabaseProbe + ?Sized> DatabaseProbe for Box<P> {
    fn exists_compiled_database(&self, path: &Utf8Path) -> bool {
        (**self).exists_compiled_database(path)
    }
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.exists() {
            return Some(plain);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use super::*;

    #[test]
    fn index_probe_finds_alias_file() {
        let temp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let db = dir.join("nt");

        assert!(!IndexFileProbe.exists_compiled_database(&db));
        std::fs::write(dir.join("nt.nal"), b"DBLIST nt.00 nt.01\n").unwrap();
        assert!(IndexFileProbe.exists_compiled_database(&db));
    }

    #[test]
    fn missing_blastdbcmd_reports_absent() {
        let probe = BlastdbcmdProbe::new("/nonexistent/blastdbcmd");
        assert!(!probe.exists_compiled_database(Utf8Path::new("db/nt")));
    }
}
