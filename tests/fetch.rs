mod common;

use std::path::Path;

use assert_matches::assert_matches;

use blastdb_manager::domain::SourceSpecifier;
use blastdb_manager::error::BlastDbError;
use blastdb_manager::fetch::{SourceClient, fetch_sources};

use common::{MockSource, dir_entries, gzip, utf8_tempdir};

const SWISSPROT: &str = "https://ftp.ncbi.nlm.nih.gov/blast/db/FASTA/swissprot.gz";
const PDBAA: &str = "ftp://ftp.ncbi.nlm.nih.gov/blast/db/FASTA/pdbaa.gz";

#[test]
fn skips_invalid_scheme_and_writes_valid_source() {
    let (_temp, dir) = utf8_tempdir();
    let target = dir.join("swissprot");
    let client = MockSource::default().with(SWISSPROT, gzip(b">sp|P69905\nMVLSPADKTN\n"));
    let source = SourceSpecifier::Urls(vec![
        SWISSPROT.to_string(),
        "/mnt/data/swissprot.gz".to_string(),
    ]);

    let report = fetch_sources(&client, &source, &target).unwrap();

    assert_eq!(report.fetched, vec![SWISSPROT.to_string()]);
    assert_eq!(report.skipped, vec!["/mnt/data/swissprot.gz".to_string()]);
    assert_eq!(client.call_count(), 1);
    assert_eq!(
        std::fs::read_to_string(target.as_std_path()).unwrap(),
        ">sp|P69905\nMVLSPADKTN\n"
    );
    assert_eq!(dir_entries(dir.as_std_path()), vec!["swissprot"]);
}

#[test]
fn no_fetch_writes_nothing() {
    let (_temp, dir) = utf8_tempdir();
    let target = dir.join("Cdd");
    let client = MockSource::default();

    let report = fetch_sources(&client, &SourceSpecifier::NoFetch, &target).unwrap();

    assert!(report.fetched.is_empty());
    assert_eq!(client.call_count(), 0);
    assert!(dir_entries(dir.as_std_path()).is_empty());
}

#[test]
fn concatenates_sources_in_order() {
    let (_temp, dir) = utf8_tempdir();
    let target = dir.join("combined");
    let client = MockSource::default()
        .with(SWISSPROT, gzip(b">a\nMK\n"))
        .with(PDBAA, gzip(b">b\nGG\n"));
    let source = SourceSpecifier::from_urls([SWISSPROT, PDBAA]);

    fetch_sources(&client, &source, &target).unwrap();

    assert_eq!(
        std::fs::read_to_string(target.as_std_path()).unwrap(),
        ">a\nMK\n>b\nGG\n"
    );
}

#[test]
fn failed_download_aborts_and_keeps_previous_target() {
    let (_temp, dir) = utf8_tempdir();
    let target = dir.join("swissprot");
    std::fs::write(target.as_std_path(), ">old\nM\n").unwrap();
    let client = MockSource::default().with(SWISSPROT, gzip(b">new\nM\n"));
    let source = SourceSpecifier::from_urls([SWISSPROT, PDBAA]);

    let err = fetch_sources(&client, &source, &target).unwrap_err();

    assert!(err.is_fetch_failure());
    assert_matches!(err, BlastDbError::FetchHttp { url, .. } if url == PDBAA);
    assert_eq!(
        std::fs::read_to_string(target.as_std_path()).unwrap(),
        ">old\nM\n"
    );
    assert_eq!(dir_entries(dir.as_std_path()), vec!["swissprot"]);
}

#[test]
fn corrupt_gzip_is_a_decompress_error_and_cleans_up() {
    let (_temp, dir) = utf8_tempdir();
    let target = dir.join("broken");
    let client = MockSource::default().with(SWISSPROT, b"this is not gzip".to_vec());

    let err = fetch_sources(&client, &SourceSpecifier::from_urls([SWISSPROT]), &target)
        .unwrap_err();

    assert_matches!(err, BlastDbError::Decompress { url, .. } if url == SWISSPROT);
    assert!(dir_entries(dir.as_std_path()).is_empty());
}

#[test]
fn creates_missing_parent_directory() {
    let (_temp, dir) = utf8_tempdir();
    let target = dir.join("nested").join("swissprot");
    let client = MockSource::default().with(SWISSPROT, gzip(b">a\nM\n"));

    fetch_sources(&client, &SourceSpecifier::from_urls([SWISSPROT]), &target).unwrap();

    assert!(target.as_std_path().exists());
}

/// Reports success but leaves nothing behind at the destination.
struct VanishingSource;

impl SourceClient for VanishingSource {
    fn download(&self, _url: &str, destination: &Path) -> Result<(), BlastDbError> {
        std::fs::write(destination, gzip(b">a\nM\n")).unwrap();
        std::fs::remove_file(destination).unwrap();
        Ok(())
    }
}

#[test]
fn io_failure_after_download_names_the_url() {
    let (_temp, dir) = utf8_tempdir();
    let target = dir.join("swissprot");
    std::fs::write(target.as_std_path(), ">old\nM\n").unwrap();

    let err = fetch_sources(
        &VanishingSource,
        &SourceSpecifier::from_urls([SWISSPROT]),
        &target,
    )
    .unwrap_err();

    assert!(err.is_fetch_failure());
    assert_matches!(err, BlastDbError::FetchIo { url, .. } if url == SWISSPROT);
    assert_eq!(dir_entries(dir.as_std_path()), vec!["swissprot"]);
}

#[cfg(unix)]
#[test]
fn fetched_file_has_regular_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let (_temp, dir) = utf8_tempdir();
    let target = dir.join("swissprot");
    let reference = dir.join("reference");
    std::fs::write(reference.as_std_path(), b"").unwrap();
    let client = MockSource::default().with(SWISSPROT, gzip(b">a\nM\n"));

    fetch_sources(&client, &SourceSpecifier::from_urls([SWISSPROT]), &target).unwrap();

    let mode = |path: &Path| std::fs::metadata(path).unwrap().permissions().mode() & 0o777;
    assert_eq!(
        mode(target.as_std_path()),
        mode(reference.as_std_path()),
        "fetched file should get the same mode as any newly created file"
    );
}
