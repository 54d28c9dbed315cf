use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use camino::Utf8PathBuf;
use serde::Serialize;

use crate::alphafold::StructureClient;
use crate::domain::{FetchOutcome, Query, StructureFormat};
use crate::error::AfError;
use crate::store::Store;
use crate::uniprot::{Resolution, Resolver};

pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Candidate formats in priority order; within one query they are tried
    /// sequentially, never concurrently.
    pub formats: Vec<StructureFormat>,
    /// Worker pool size across queries. Bounded to respect the remote
    /// services' implicit rate limits.
    pub concurrency: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            formats: StructureFormat::default_priority(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunResult {
    pub generated_at: String,
    pub outcomes: BTreeMap<Query, FetchOutcome>,
    pub manifest_path: Utf8PathBuf,
}

/// Drives resolve-then-fetch over the deduplicated input set. The only
/// component that touches the manifest; per-query failures are converted to
/// outcomes and never abort the run, filesystem faults do.
pub struct App<R: Resolver, S: StructureClient> {
    resolver: R,
    structures: S,
    store: Store,
    options: RunOptions,
}

impl<R: Resolver, S: StructureClient> App<R, S> {
    pub fn new(resolver: R, structures: S, store: Store, options: RunOptions) -> Self {
        Self {
            resolver,
            structures,
            store,
            options,
        }
    }

    pub fn run(&self, queries: &[Query]) -> Result<RunResult, AfError> {
        let queries = dedup_queries(queries);
        self.store.ensure_out_dir()?;

        let workers = self.options.concurrency.clamp(1, queries.len().max(1));
        let cursor = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel::<Result<(Query, FetchOutcome), AfError>>();

        thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let cursor = &cursor;
                let queries = &queries;
                scope.spawn(move || loop {
                    let index = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(query) = queries.get(index) else {
                        break;
                    };
                    let result = self
                        .process(query)
                        .map(|outcome| (query.clone(), outcome));
                    if tx.send(result).is_err() {
                        break;
                    }
                });
            }
        });
        drop(tx);

        let mut outcomes = BTreeMap::new();
        for result in rx {
            let (query, outcome) = result?;
            outcomes.insert(query, outcome);
        }

        let manifest_path = self.store.write_manifest(&outcomes)?;
        Ok(RunResult {
            generated_at: chrono::Utc::now().to_rfc3339(),
            outcomes,
            manifest_path,
        })
    }

    fn process(&self, query: &Query) -> Result<FetchOutcome, AfError> {
        let accession = match self.resolver.resolve(query) {
            Resolution::Matched(accession) => accession,
            Resolution::NoMatch => {
                tracing::info!(%query, "no accession found");
                return Ok(FetchOutcome::Unresolved);
            }
            Resolution::Failed(reason) => {
                tracing::warn!(%query, %reason, "resolution failed");
                return Ok(FetchOutcome::Unresolved);
            }
        };

        match self
            .structures
            .fetch(&accession, &self.options.formats, &self.store)?
        {
            Some(stored) => Ok(FetchOutcome::ResolvedAndSaved {
                accession: stored.accession,
                path: stored.path,
                format: stored.format,
            }),
            None => {
                tracing::info!(%query, %accession, "model not available");
                Ok(FetchOutcome::ResolvedButUnavailable { accession })
            }
        }
    }
}

/// Exact-string dedup, first occurrence wins. No normalization.
pub fn dedup_queries(queries: &[Query]) -> Vec<Query> {
    let mut seen = HashSet::new();
    queries
        .iter()
        .filter(|query| seen.insert((*query).clone()))
        .cloned()
        .collect()
}
