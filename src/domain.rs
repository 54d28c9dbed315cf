use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AfError;

/// Free-text identifier as supplied by the caller. Compared byte-for-byte;
/// no case folding or trimming is applied, so `geneA` and `GENEA` are two
/// distinct queries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Query(String);

impl Query {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Query {
    type Err = AfError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        // Control characters would corrupt manifest rows, which are
        // tab-separated with one query per line.
        if value.trim().is_empty() || value.chars().any(char::is_control) {
            return Err(AfError::InvalidQuery(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }
}

/// Canonical UniProt accession returned by the resolution service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Accession(String);

impl Accession {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Accession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Accession {
    type Err = AfError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let is_valid =
            !trimmed.is_empty() && trimmed.chars().all(|ch| ch.is_ascii_alphanumeric());
        if !is_valid {
            return Err(AfError::InvalidAccession(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StructureFormat {
    Pdb,
    Cif,
}

impl StructureFormat {
    pub fn ext(self) -> &'static str {
        match self {
            StructureFormat::Pdb => "pdb",
            StructureFormat::Cif => "cif",
        }
    }

    /// Candidate formats in the order they are tried; the first verified
    /// download wins.
    pub fn default_priority() -> Vec<StructureFormat> {
        vec![StructureFormat::Pdb, StructureFormat::Cif]
    }
}

impl fmt::Display for StructureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ext())
    }
}

impl FromStr for StructureFormat {
    type Err = AfError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "pdb" => Ok(StructureFormat::Pdb),
            "cif" => Ok(StructureFormat::Cif),
            _ => Err(AfError::InvalidFormat(value.to_string())),
        }
    }
}

/// Descriptor of a structure file persisted to the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    pub accession: Accession,
    pub format: StructureFormat,
    pub path: Utf8PathBuf,
    pub size_bytes: u64,
}

/// Final per-query classification. Exactly one outcome exists per unique
/// query once a run completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FetchOutcome {
    #[serde(rename = "saved")]
    ResolvedAndSaved {
        accession: Accession,
        path: Utf8PathBuf,
        format: StructureFormat,
    },
    #[serde(rename = "unavailable")]
    ResolvedButUnavailable { accession: Accession },
    #[serde(rename = "unresolved")]
    Unresolved,
}

impl FetchOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            FetchOutcome::ResolvedAndSaved { .. } => "saved",
            FetchOutcome::ResolvedButUnavailable { .. } => "unavailable",
            FetchOutcome::Unresolved => "unresolved",
        }
    }

    pub fn accession(&self) -> Option<&Accession> {
        match self {
            FetchOutcome::ResolvedAndSaved { accession, .. }
            | FetchOutcome::ResolvedButUnavailable { accession } => Some(accession),
            FetchOutcome::Unresolved => None,
        }
    }

    pub fn path(&self) -> Option<&Utf8Path> {
        match self {
            FetchOutcome::ResolvedAndSaved { path, .. } => Some(path),
            _ => None,
        }
    }
}
