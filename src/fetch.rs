use std::fs::{self, File};
use std::io::{self, BufReader, ErrorKind};
use std::path::Path;
use std::time::Duration;

use camino::Utf8Path;
use flate2::read::MultiGzDecoder;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use tempfile::Builder;
use tracing::{debug, info, warn};

use crate::domain::{SourceSpecifier, is_fetchable_url};
use crate::error::BlastDbError;

pub trait SourceClient: Send + Sync {
    /// Writes the raw (still compressed) response body for `url` to `destination`.
    fn download(&self, url: &str, destination: &Path) -> Result<(), BlastDbError>;
}

#[derive(Clone)]
pub struct HttpSourceClient {
    client: Client,
}

impl HttpSourceClient {
    pub fn new() -> Result<Self, BlastDbError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("blastdb-manager/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| BlastDbError::HttpClient(err.to_string()))?,
        );
        // Sequence dumps run to gigabytes, so only the connect phase is bounded.
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(30))
            .timeout(None::<Duration>)
            .build()
            .map_err(|err| BlastDbError::HttpClient(err.to_string()))?;
        Ok(Self { client })
    }

    /// NCBI and EBI serve their FTP trees over HTTPS at the same path.
    pub fn normalize_url(url: &str) -> String {
        if let Some(rest) = url.strip_prefix("ftp://") {
            return format!("https://{rest}");
        }
        url.to_string()
    }
}

impl SourceClient for HttpSourceClient {
    fn download(&self, url: &str, destination: &Path) -> Result<(), BlastDbError> {
        let request_url = Self::normalize_url(url);
        let mut response =
            self.client
                .get(&request_url)
                .send()
                .map_err(|err| BlastDbError::FetchHttp {
                    url: url.to_string(),
                    message: err.to_string(),
                })?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "request failed".to_string());
            return Err(BlastDbError::FetchStatus {
                url: url.to_string(),
                status,
                message,
            });
        }
        let mut file = File::create(destination).map_err(|err| fetch_io(url, err))?;
        io::copy(&mut response, &mut file).map_err(|err| BlastDbError::FetchHttp {
            url: url.to_string(),
            message: err.to_string(),
        })?;
        Ok(())
    }
}

fn fetch_io(url: &str, err: io::Error) -> BlastDbError {
    BlastDbError::FetchIo {
        url: url.to_string(),
        message: err.to_string(),
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct FetchReport {
    pub fetched: Vec<String>,
    pub skipped: Vec<String>,
}

/// Fills `target` with the decompressed concatenation of every valid source URL.
///
/// Entries that are not `http`/`ftp` URLs are skipped with a warning. Any
/// download or decompression failure aborts the whole fetch and leaves `target`
/// as it was: output is assembled in a sibling temp file and only renamed into
/// place once every URL has been appended.
pub fn fetch_sources<C: SourceClient + ?Sized>(
    client: &C,
    source: &SourceSpecifier,
    target: &Utf8Path,
) -> Result<FetchReport, BlastDbError> {
    let urls = match source {
        SourceSpecifier::NoFetch => {
            debug!(path = %target, "no sources configured; skipping fetch");
            return Ok(FetchReport::default());
        }
        SourceSpecifier::Urls(urls) => urls,
    };

    info!(path = %target, sources = urls.len(), "fetching database sources");

    let parent = match target.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| BlastDbError::Filesystem(err.to_string()))?;

    let mut builder = Builder::new();
    builder.prefix(".blastdb-fetch");
    // Temp files default to 0600; the persisted raw file gets the usual umask-derived mode.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    let mut output = builder
        .tempfile_in(parent.as_std_path())
        .map_err(|err| BlastDbError::Filesystem(err.to_string()))?;
    let mut report = FetchReport::default();

    for url in urls {
        if !is_fetchable_url(url) {
            warn!("{url} does not appear to be a URL from which to fetch the file");
            report.skipped.push(url.clone());
            continue;
        }

        info!(url = %url, "downloading");
        let download = Builder::new()
            .prefix(".blastdb-download")
            .suffix(".gz")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| fetch_io(url, err))?;
        client.download(url, download.path())?;

        let compressed = download.reopen().map_err(|err| fetch_io(url, err))?;
        let mut decoder = MultiGzDecoder::new(BufReader::new(compressed));
        io::copy(&mut decoder, output.as_file_mut()).map_err(|err| match err.kind() {
            ErrorKind::InvalidData | ErrorKind::InvalidInput | ErrorKind::UnexpectedEof => {
                BlastDbError::Decompress {
                    url: url.clone(),
                    message: err.to_string(),
                }
            }
            _ => fetch_io(url, err),
        })?;
        report.fetched.push(url.clone());
    }

    if target.as_std_path().exists() {
        fs::remove_file(target.as_std_path())
            .map_err(|err| BlastDbError::Filesystem(err.to_string()))?;
    }
    output
        .persist(target.as_std_path())
        .map_err(|err| BlastDbError::Filesystem(err.to_string()))?;
    Ok(report)
}
