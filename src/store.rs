use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::{Accession, FetchOutcome, Query, StructureFormat};
use crate::error::AfError;

pub const MANIFEST_FILE: &str = "manifest.tsv";

/// Output directory owner: deterministic structure paths, atomic writes and
/// the per-run manifest. Path uniqueness per (accession, format) is what
/// makes concurrent writers safe without a lock.
#[derive(Debug, Clone)]
pub struct Store {
    out_dir: Utf8PathBuf,
}

impl Store {
    pub fn new(out_dir: Utf8PathBuf) -> Self {
        Self { out_dir }
    }

    pub fn out_dir(&self) -> &Utf8Path {
        &self.out_dir
    }

    pub fn ensure_out_dir(&self) -> Result<(), AfError> {
        fs::create_dir_all(self.out_dir.as_std_path())
            .map_err(|err| AfError::Filesystem(err.to_string()))
    }

    pub fn structure_path(&self, accession: &Accession, format: StructureFormat) -> Utf8PathBuf {
        self.out_dir.join(format!("{accession}.{}", format.ext()))
    }

    pub fn manifest_path(&self) -> Utf8PathBuf {
        self.out_dir.join(MANIFEST_FILE)
    }

    /// A file satisfies a fetch if it exists and is non-empty; a zero-length
    /// leftover must never short-circuit a re-run.
    pub fn is_satisfied(path: &Utf8Path) -> bool {
        fs::metadata(path.as_std_path())
            .map(|meta| meta.is_file() && meta.len() > 0)
            .unwrap_or(false)
    }

    pub fn file_size(path: &Utf8Path) -> Result<u64, AfError> {
        fs::metadata(path.as_std_path())
            .map(|meta| meta.len())
            .map_err(|err| AfError::Filesystem(err.to_string()))
    }

    pub fn remove(path: &Utf8Path) -> Result<(), AfError> {
        match fs::remove_file(path.as_std_path()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AfError::Filesystem(err.to_string())),
        }
    }

    pub fn write_structure(&self, path: &Utf8Path, content: &[u8]) -> Result<(), AfError> {
        Self::write_bytes_atomic(path, content)
    }

    /// One row per query, losslessly derivable from the outcome mapping.
    /// Absent accessions and paths are written as `-`.
    pub fn write_manifest(
        &self,
        outcomes: &BTreeMap<Query, FetchOutcome>,
    ) -> Result<Utf8PathBuf, AfError> {
        let mut buf = String::from("query\taccession\tstatus\tpath\n");
        for (query, outcome) in outcomes {
            let accession = outcome
                .accession()
                .map(|acc| acc.as_str().to_string())
                .unwrap_or_else(|| "-".to_string());
            let path = outcome
                .path()
                .map(|path| path.to_string())
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(buf, "{query}\t{accession}\t{}\t{path}", outcome.status());
        }
        let manifest_path = self.manifest_path();
        Self::write_bytes_atomic(&manifest_path, buf.as_bytes())?;
        Ok(manifest_path)
    }

    fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), AfError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| AfError::Filesystem(err.to_string()))?;
        }
        let tmp_path = Utf8PathBuf::from(format!("{path}.tmp"));
        fs::write(tmp_path.as_std_path(), content)
            .map_err(|err| AfError::Filesystem(err.to_string()))?;
        fs::rename(tmp_path.as_std_path(), path.as_std_path())
            .map_err(|err| AfError::Filesystem(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use super::*;
    use crate::domain::StructureFormat;

    fn temp_store() -> (tempfile::TempDir, Store) {
        let temp = tempfile::tempdir().unwrap();
        let out_dir = Utf8PathBuf::from_path_buf(temp.path().join("models")).unwrap();
        (temp, Store::new(out_dir))
    }

    #[test]
    fn structure_paths_are_deterministic() {
        let (_temp, store) = temp_store();
        let acc: Accession = "P12345".parse().unwrap();
        let path = store.structure_path(&acc, StructureFormat::Cif);
        assert!(path.ends_with("models/P12345.cif"));
        assert_eq!(
            path,
            store.structure_path(&"P12345".parse().unwrap(), StructureFormat::Cif)
        );
    }

    #[test]
    fn satisfied_requires_nonzero_length() {
        let (_temp, store) = temp_store();
        store.ensure_out_dir().unwrap();
        let acc: Accession = "P12345".parse().unwrap();
        let path = store.structure_path(&acc, StructureFormat::Pdb);

        assert!(!Store::is_satisfied(&path));

        std::fs::write(path.as_std_path(), b"").unwrap();
        assert!(!Store::is_satisfied(&path));

        std::fs::write(path.as_std_path(), b"ATOM").unwrap();
        assert!(Store::is_satisfied(&path));
        assert_eq!(Store::file_size(&path).unwrap(), 4);
    }

    #[test]
    fn remove_tolerates_missing_file() {
        let (_temp, store) = temp_store();
        store.ensure_out_dir().unwrap();
        let path = store.out_dir().join("absent.pdb");
        Store::remove(&path).unwrap();
    }

    #[test]
    fn write_structure_creates_parent_dirs() {
        let (_temp, store) = temp_store();
        let acc: Accession = "P12345".parse().unwrap();
        let path = store.structure_path(&acc, StructureFormat::Cif);
        store.write_structure(&path, b"data_P12345").unwrap();
        assert!(Store::is_satisfied(&path));
        assert!(!Utf8PathBuf::from(format!("{path}.tmp")).as_std_path().exists());
    }

    #[test]
    fn manifest_rows_cover_every_outcome() {
        let (_temp, store) = temp_store();
        store.ensure_out_dir().unwrap();

        let acc: Accession = "P12345".parse().unwrap();
        let mut outcomes = BTreeMap::new();
        outcomes.insert(
            "geneA".parse::<Query>().unwrap(),
            FetchOutcome::ResolvedAndSaved {
                accession: acc.clone(),
                path: store.structure_path(&acc, StructureFormat::Cif),
                format: StructureFormat::Cif,
            },
        );
        outcomes.insert(
            "geneB".parse::<Query>().unwrap(),
            FetchOutcome::Unresolved,
        );
        outcomes.insert(
            "geneC".parse::<Query>().unwrap(),
            FetchOutcome::ResolvedButUnavailable {
                accession: "Q99999".parse().unwrap(),
            },
        );

        let manifest_path = store.write_manifest(&outcomes).unwrap();
        let content = std::fs::read_to_string(manifest_path.as_std_path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines[0], "query\taccession\tstatus\tpath");
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("geneA\tP12345\tsaved\t"));
        assert!(lines[1].ends_with("P12345.cif"));
        assert_eq!(lines[2], "geneB\t-\tunresolved\t-");
        assert_eq!(lines[3], "geneC\tQ99999\tunavailable\t-");
    }
}
