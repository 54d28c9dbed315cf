use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum AfError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("invalid accession: {0}")]
    InvalidAccession(String),

    #[error("invalid structure format: {0}")]
    InvalidFormat(String),

    #[error("invalid config value: {0}")]
    InvalidConfig(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("no queries given; pass identifiers as arguments or list them in alphafetch.json")]
    NoQueries,

    #[error("transport failed: {0}")]
    Transport(String),

    #[error("{url} still returned status {status} after the retry budget")]
    TransportStatus { status: u16, url: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
