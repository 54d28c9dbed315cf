use std::fs;
use std::sync::Mutex;

use assert_matches::assert_matches;

use alphafetch::domain::Query;
use alphafetch::error::AfError;
use alphafetch::transport::{HttpGet, HttpResponse};
use alphafetch::uniprot::{Resolution, Resolver, UniprotResolver, parse_search_response};

struct CannedSearch {
    status: u16,
    body: Vec<u8>,
    requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl CannedSearch {
    fn new(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            body,
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl HttpGet for CannedSearch {
    fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<HttpResponse, AfError> {
        let params = params
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), params));
        Ok(HttpResponse {
            status: self.status,
            body: self.body.clone(),
        })
    }
}

struct BrokenTransport;

impl HttpGet for BrokenTransport {
    fn get(&self, url: &str, _params: &[(&str, &str)]) -> Result<HttpResponse, AfError> {
        Err(AfError::Transport(format!("{url}: connection refused")))
    }
}

#[test]
fn resolves_first_accession_from_fixture() {
    let body = fs::read("tests/fixtures/uniprot_search_P69905.json").unwrap();
    let resolver = UniprotResolver::new(CannedSearch::new(200, body));
    let query: Query = "hemoglobin alpha".parse().unwrap();

    let resolution = resolver.resolve(&query);
    assert_matches!(resolution, Resolution::Matched(acc) if acc.as_str() == "P69905");
}

#[test]
fn issues_one_minimal_search_request() {
    let body = fs::read("tests/fixtures/uniprot_search_P69905.json").unwrap();
    let transport = CannedSearch::new(200, body);
    let resolver = UniprotResolver::new(&transport);
    let query: Query = "hemoglobin alpha".parse().unwrap();

    resolver.resolve(&query).into_accession().unwrap();

    let requests = transport.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let (url, params) = &requests[0];
    assert_eq!(url, alphafetch::uniprot::SEARCH_URL);
    let param = |key: &str| {
        params
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    };
    assert_eq!(param("query"), Some("hemoglobin alpha"));
    assert_eq!(param("fields"), Some("accession,protein_name"));
    assert_eq!(param("format"), Some("json"));
    assert_eq!(param("size"), Some("1"));
}

#[test]
fn zero_results_is_no_match() {
    let body = fs::read("tests/fixtures/uniprot_search_empty.json").unwrap();
    let resolver = UniprotResolver::new(CannedSearch::new(200, body));
    let query: Query = "no such protein".parse().unwrap();

    assert_eq!(resolver.resolve(&query), Resolution::NoMatch);
}

#[test]
fn transport_failure_is_failed_not_no_match() {
    let resolver = UniprotResolver::new(BrokenTransport);
    let query: Query = "geneA".parse().unwrap();

    let resolution = resolver.resolve(&query);
    assert_matches!(resolution, Resolution::Failed(_));
    assert!(resolution.into_accession().is_none());
}

#[test]
fn server_error_status_is_failed() {
    let resolver = UniprotResolver::new(CannedSearch::new(500, Vec::new()));
    let query: Query = "geneA".parse().unwrap();

    assert_matches!(resolver.resolve(&query), Resolution::Failed(_));
}

#[test]
fn malformed_body_is_failed() {
    let resolver = UniprotResolver::new(CannedSearch::new(200, b"not json at all".to_vec()));
    let query: Query = "geneA".parse().unwrap();

    assert_matches!(resolver.resolve(&query), Resolution::Failed(_));
}

#[test]
fn parse_distinguishes_empty_from_malformed() {
    let empty = fs::read("tests/fixtures/uniprot_search_empty.json").unwrap();
    assert_eq!(parse_search_response(&empty), Resolution::NoMatch);
    assert_matches!(parse_search_response(b"{"), Resolution::Failed(_));
}
