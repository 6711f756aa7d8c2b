use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::error::BlastDbError;

pub const DEFAULT_FORMATTER: &str = "makeblastdb";

const NUCLEOTIDE_EXTENSIONS: &[&str] = &["nhd", "nhi", "nhr", "nin", "nog", "nsd", "nsi", "nsq"];
const PROTEIN_EXTENSIONS: &[&str] = &["phd", "phi", "phr", "pin", "pog", "psd", "psi", "psq"];
const RPS_EXTENSIONS: &[&str] = &[
    "aux", "freq", "loo", "phr", "pin", "psd", "psi", "psq", "rps",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatabaseType {
    Nucleotide,
    Protein,
    ReversePositionSpecific,
}

impl DatabaseType {
    /// Value passed to the formatter's `-dbtype` flag.
    pub fn dbtype_arg(&self) -> &'static str {
        match self {
            DatabaseType::Nucleotide => "nucl",
            DatabaseType::Protein => "prot",
            DatabaseType::ReversePositionSpecific => "rps",
        }
    }

    /// Files that must all exist for a formatted database to count as complete.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            DatabaseType::Nucleotide => NUCLEOTIDE_EXTENSIONS,
            DatabaseType::Protein => PROTEIN_EXTENSIONS,
            DatabaseType::ReversePositionSpecific => RPS_EXTENSIONS,
        }
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseType::Nucleotide => write!(f, "nucleotide"),
            DatabaseType::Protein => write!(f, "protein"),
            DatabaseType::ReversePositionSpecific => write!(f, "reverse-position-specific"),
        }
    }
}

impl FromStr for DatabaseType {
    type Err = BlastDbError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "nucl" | "nucleotide" => Ok(DatabaseType::Nucleotide),
            "prot" | "protein" => Ok(DatabaseType::Protein),
            "rps" | "reverse-position-specific" => Ok(DatabaseType::ReversePositionSpecific),
            _ => Err(BlastDbError::UnknownDatabaseType(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSpec {
    name: String,
    directory: Utf8PathBuf,
    db_type: DatabaseType,
    formatter: String,
}

impl DatabaseSpec {
    pub fn new(
        name: impl Into<String>,
        directory: impl Into<Utf8PathBuf>,
        db_type: DatabaseType,
    ) -> Result<Self, BlastDbError> {
        Ok(Self {
            name: validate_database_name(&name.into())?,
            directory: directory.into(),
            db_type,
            formatter: DEFAULT_FORMATTER.to_string(),
        })
    }

    /// Builds a spec from an untyped database type, as it arrives from a config file or CLI.
    pub fn parse(
        name: impl Into<String>,
        directory: impl Into<Utf8PathBuf>,
        db_type: &str,
    ) -> Result<Self, BlastDbError> {
        Self::new(name, directory, db_type.parse()?)
    }

    pub fn with_formatter(mut self, formatter: impl Into<String>) -> Self {
        self.formatter = formatter.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directory(&self) -> &Utf8Path {
        &self.directory
    }

    pub fn db_type(&self) -> DatabaseType {
        self.db_type
    }

    pub fn formatter(&self) -> &str {
        &self.formatter
    }

    /// `{directory}/{name}`: the formatter's `-out` prefix, and also where raw input lives.
    pub fn database_path(&self) -> Utf8PathBuf {
        self.directory.join(&self.name)
    }

    pub fn raw_data_path(&self) -> Utf8PathBuf {
        self.database_path()
    }

    pub fn file_path(&self, extension: &str) -> Utf8PathBuf {
        self.directory.join(format!("{}.{extension}", self.name))
    }

    pub fn expected_files(&self) -> Vec<Utf8PathBuf> {
        self.db_type
            .extensions()
            .iter()
            .map(|ext| self.file_path(ext))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SourceSpecifier {
    /// Raw data is seeded ahead of time; nothing to download.
    #[default]
    NoFetch,
    Urls(Vec<String>),
}

impl SourceSpecifier {
    pub fn from_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let urls = urls.into_iter().map(Into::into).collect::<Vec<_>>();
        if urls.is_empty() {
            SourceSpecifier::NoFetch
        } else {
            SourceSpecifier::Urls(urls)
        }
    }
}

/// A database name is a single path component: the base filename under its directory.
pub fn validate_database_name(name: &str) -> Result<String, BlastDbError> {
    let trimmed = name.trim();
    let is_valid = !trimmed.is_empty()
        && trimmed != "."
        && trimmed != ".."
        && !trimmed.contains('/')
        && !trimmed.contains('\\');
    if !is_valid {
        return Err(BlastDbError::InvalidDatabaseName(name.to_string()));
    }
    Ok(trimmed.to_string())
}

pub fn is_fetchable_url(value: &str) -> bool {
    value.starts_with("http") || value.starts_with("ftp")
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_database_type_aliases() {
        assert_eq!("nucl".parse::<DatabaseType>().unwrap(), DatabaseType::Nucleotide);
        assert_eq!("Protein".parse::<DatabaseType>().unwrap(), DatabaseType::Protein);
        assert_eq!(
            "reverse-position-specific".parse::<DatabaseType>().unwrap(),
            DatabaseType::ReversePositionSpecific
        );
    }

    #[test]
    fn parse_database_type_unknown() {
        let err = "dna".parse::<DatabaseType>().unwrap_err();
        assert_matches!(err, BlastDbError::UnknownDatabaseType(value) if value == "dna");
    }

    #[test]
    fn spec_paths() {
        let spec = DatabaseSpec::new("mydb", "testdb", DatabaseType::Nucleotide).unwrap();
        assert_eq!(spec.database_path(), Utf8PathBuf::from("testdb/mydb"));
        assert_eq!(spec.file_path("nhr"), Utf8PathBuf::from("testdb/mydb.nhr"));
        assert_eq!(spec.expected_files().len(), 8);
        assert_eq!(spec.formatter(), DEFAULT_FORMATTER);
    }

    #[test]
    fn rejects_path_like_names() {
        for name in ["a/b", "../x", "..", ".", "  ", "db\\x"] {
            let err = DatabaseSpec::new(name, "testdb", DatabaseType::Protein).unwrap_err();
            assert_matches!(err, BlastDbError::InvalidDatabaseName(_), "{name:?} accepted");
        }
        assert_eq!(validate_database_name(" nt ").unwrap(), "nt");
    }

    #[test]
    fn empty_url_list_is_no_fetch() {
        assert_eq!(
            SourceSpecifier::from_urls(Vec::<String>::new()),
            SourceSpecifier::NoFetch
        );
    }

    #[test]
    fn url_scheme_prefixes() {
        assert!(is_fetchable_url("https://ftp.ncbi.nlm.nih.gov/x.gz"));
        assert!(is_fetchable_url("ftp://ftp.ebi.ac.uk/x.gz"));
        assert!(!is_fetchable_url("/local/file.gz"));
    }
}
