use serde::Deserialize;

use crate::domain::{Accession, Query};
use crate::transport::HttpGet;

pub const SEARCH_URL: &str = "https://rest.uniprot.org/uniprotkb/search";

/// Only the fields the resolver actually reads; the service ranks by
/// relevance and the first hit is trusted, so one record is enough.
const SEARCH_FIELDS: &str = "accession,protein_name";
const SEARCH_SIZE: &str = "1";

/// What a resolution attempt produced. `NoMatch` (a well-formed response
/// with zero results) and `Failed` (transport error, bad status, or a body
/// that does not parse) both leave the query without an accession, but they
/// are different conditions to diagnose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Matched(Accession),
    NoMatch,
    Failed(String),
}

impl Resolution {
    pub fn into_accession(self) -> Option<Accession> {
        match self {
            Resolution::Matched(accession) => Some(accession),
            Resolution::NoMatch | Resolution::Failed(_) => None,
        }
    }
}

pub trait Resolver: Send + Sync {
    fn resolve(&self, query: &Query) -> Resolution;
}

impl<T: Resolver + ?Sized> Resolver for &T {
    fn resolve(&self, query: &Query) -> Resolution {
        (**self).resolve(query)
    }
}

#[derive(Clone)]
pub struct UniprotResolver<T: HttpGet> {
    transport: T,
    search_url: String,
}

impl<T: HttpGet> UniprotResolver<T> {
    pub fn new(transport: T) -> Self {
        Self::with_search_url(transport, SEARCH_URL)
    }

    pub fn with_search_url(transport: T, search_url: impl Into<String>) -> Self {
        Self {
            transport,
            search_url: search_url.into(),
        }
    }
}

impl<T: HttpGet> Resolver for UniprotResolver<T> {
    fn resolve(&self, query: &Query) -> Resolution {
        let params = [
            ("query", query.as_str()),
            ("fields", SEARCH_FIELDS),
            ("format", "json"),
            ("size", SEARCH_SIZE),
        ];
        let response = match self.transport.get(&self.search_url, &params) {
            Ok(response) => response,
            Err(err) => return Resolution::Failed(err.to_string()),
        };
        if !response.is_success() {
            return Resolution::Failed(format!("search returned status {}", response.status));
        }
        parse_search_response(&response.body)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchHit {
    primary_accession: String,
}

pub fn parse_search_response(body: &[u8]) -> Resolution {
    let parsed: SearchResponse = match serde_json::from_slice(body) {
        Ok(parsed) => parsed,
        Err(err) => return Resolution::Failed(format!("malformed search response: {err}")),
    };
    let Some(hit) = parsed.results.into_iter().next() else {
        return Resolution::NoMatch;
    };
    match hit.primary_accession.parse::<Accession>() {
        Ok(accession) => Resolution::Matched(accession),
        Err(err) => Resolution::Failed(err.to_string()),
    }
}
