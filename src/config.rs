use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::{DEFAULT_FORMATTER, DatabaseSpec, SourceSpecifier};
use crate::error::BlastDbError;

pub const DEFAULT_CONFIG_FILE: &str = "blastdb.json";

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub formatter: Option<String>,
    #[serde(default)]
    pub databases: Vec<DatabaseEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DatabaseEntry {
    pub name: String,
    pub directory: String,
    #[serde(rename = "type")]
    pub db_type: String,
    #[serde(default)]
    pub formatter: Option<String>,
    #[serde(default)]
    pub sources: Option<SourceEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SourceEntry {
    Shorthand(String),
    List(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct DatabaseRequest {
    pub spec: DatabaseSpec,
    pub source: SourceSpecifier,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub databases: Vec<DatabaseRequest>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, BlastDbError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Err(BlastDbError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| BlastDbError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| BlastDbError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, BlastDbError> {
        let schema_version = config.schema_version.unwrap_or(1);
        let default_formatter = config
            .formatter
            .unwrap_or_else(|| DEFAULT_FORMATTER.to_string());

        let databases = config
            .databases
            .into_iter()
            .map(|entry| {
                let formatter = entry
                    .formatter
                    .unwrap_or_else(|| default_formatter.clone());
                let spec = DatabaseSpec::parse(entry.name, entry.directory, &entry.db_type)?
                    .with_formatter(formatter);
                let source = match entry.sources {
                    None => SourceSpecifier::NoFetch,
                    Some(SourceEntry::Shorthand(url)) => SourceSpecifier::Urls(vec![url]),
                    Some(SourceEntry::List(urls)) => SourceSpecifier::from_urls(urls),
                };
                Ok(DatabaseRequest { spec, source })
            })
            .collect::<Result<Vec<_>, BlastDbError>>()?;

        Ok(ResolvedConfig {
            schema_version,
            databases,
        })
    }
}
