use crate::domain::{Accession, StoredFile, StructureFormat};
use crate::error::AfError;
use crate::store::Store;
use crate::transport::HttpGet;

pub const FILE_SERVICE_BASE: &str = "https://alphafold.ebi.ac.uk";

/// The file service answers some missing models with an HTML "not found"
/// page behind a 200. Prefix sniffing is best-effort placeholder rejection,
/// not a full classifier.
const HTML_PREAMBLE: &[u8] = b"<!DOCTYPE";

pub fn is_html_preamble(body: &[u8]) -> bool {
    body.starts_with(HTML_PREAMBLE)
}

pub trait StructureClient: Send + Sync {
    /// Tries `formats` strictly in order and returns the first verified
    /// download, `None` when no format yields a usable model. `Err` is
    /// reserved for filesystem faults; remote misbehavior is absorbed here.
    fn fetch(
        &self,
        accession: &Accession,
        formats: &[StructureFormat],
        store: &Store,
    ) -> Result<Option<StoredFile>, AfError>;
}

impl<T: StructureClient + ?Sized> StructureClient for &T {
    fn fetch(
        &self,
        accession: &Accession,
        formats: &[StructureFormat],
        store: &Store,
    ) -> Result<Option<StoredFile>, AfError> {
        (**self).fetch(accession, formats, store)
    }
}

#[derive(Clone)]
pub struct AlphafoldClient<T: HttpGet> {
    transport: T,
    base_url: String,
}

impl<T: HttpGet> AlphafoldClient<T> {
    pub fn new(transport: T) -> Self {
        Self::with_base_url(transport, FILE_SERVICE_BASE)
    }

    pub fn with_base_url(transport: T, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            transport,
            base_url,
        }
    }

    pub fn model_url(&self, accession: &Accession, format: StructureFormat) -> String {
        format!(
            "{}/files/AF-{}-F1-model_v4.{}",
            self.base_url,
            accession,
            format.ext()
        )
    }
}

impl<T: HttpGet> StructureClient for AlphafoldClient<T> {
    fn fetch(
        &self,
        accession: &Accession,
        formats: &[StructureFormat],
        store: &Store,
    ) -> Result<Option<StoredFile>, AfError> {
        // Re-runs must not re-download already satisfied accessions: any
        // requested format already on disk settles the accession before the
        // network loop starts, even if a higher-priority format is missing.
        for &format in formats {
            let path = store.structure_path(accession, format);
            if Store::is_satisfied(&path) {
                tracing::debug!(%accession, %format, %path, "existing file accepted");
                let size_bytes = Store::file_size(&path)?;
                return Ok(Some(StoredFile {
                    accession: accession.clone(),
                    format,
                    path,
                    size_bytes,
                }));
            }
        }

        for &format in formats {
            let path = store.structure_path(accession, format);
            let url = self.model_url(accession, format);
            let response = match self.transport.get(&url, &[]) {
                Ok(response) => response,
                Err(err) => {
                    tracing::warn!(%accession, %format, error = %err, "download attempt failed");
                    continue;
                }
            };
            if !response.is_success() {
                tracing::debug!(%accession, %format, status = response.status, "format not available");
                continue;
            }
            if response.body.is_empty() {
                tracing::warn!(%accession, %format, "empty body rejected");
                continue;
            }
            if is_html_preamble(&response.body) {
                tracing::warn!(%accession, %format, "placeholder page rejected");
                continue;
            }

            store.write_structure(&path, &response.body)?;
            let size_bytes = Store::file_size(&path)?;
            if size_bytes == 0 {
                Store::remove(&path)?;
                tracing::warn!(%accession, %format, "zero-length file deleted");
                continue;
            }

            tracing::info!(%accession, %format, %path, size_bytes, "model saved");
            return Ok(Some(StoredFile {
                accession: accession.clone(),
                format,
                path,
                size_bytes,
            }));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{HttpGet, HttpResponse};

    struct NoNetwork;

    impl HttpGet for NoNetwork {
        fn get(&self, url: &str, _params: &[(&str, &str)]) -> Result<HttpResponse, AfError> {
            panic!("unexpected network call to {url}");
        }
    }

    #[test]
    fn model_url_layout() {
        let client = AlphafoldClient::with_base_url(NoNetwork, "https://alphafold.ebi.ac.uk/");
        let acc: Accession = "A0A1U7UAC1".parse().unwrap();
        assert_eq!(
            client.model_url(&acc, StructureFormat::Pdb),
            "https://alphafold.ebi.ac.uk/files/AF-A0A1U7UAC1-F1-model_v4.pdb"
        );
        assert_eq!(
            client.model_url(&acc, StructureFormat::Cif),
            "https://alphafold.ebi.ac.uk/files/AF-A0A1U7UAC1-F1-model_v4.cif"
        );
    }

    #[test]
    fn html_preamble_guard() {
        assert!(is_html_preamble(b"<!DOCTYPE html><html>not found</html>"));
        assert!(!is_html_preamble(b"ATOM      1  N   MET A   1"));
        assert!(!is_html_preamble(b""));
        // Exact prefix check: leading whitespace is not stripped.
        assert!(!is_html_preamble(b" <!DOCTYPE html>"));
    }
}
