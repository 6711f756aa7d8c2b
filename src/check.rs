use camino::Utf8PathBuf;

use crate::domain::DatabaseSpec;

pub fn is_complete(spec: &DatabaseSpec) -> bool {
    spec.expected_files()
        .iter()
        .all(|path| path.as_std_path().exists())
}

pub fn missing_files(spec: &DatabaseSpec) -> Vec<Utf8PathBuf> {
    spec.expected_files()
        .into_iter()
        .filter(|path| !path.as_std_path().exists())
        .collect()
}
