//! Per-turn document fetching and caching.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};
use url::Url;

use scholarbot_shared::{Result, ScholarbotError};

use crate::arxiv;

/// User-Agent string for document downloads.
const USER_AGENT: &str = concat!("scholarbot/", env!("CARGO_PKG_VERSION"));

/// Maximum document size we are willing to download (64 MB).
const MAX_DOCUMENT_SIZE: u64 = 64 * 1024 * 1024;

// ---------------------------------------------------------------------------
// DocumentId
// ---------------------------------------------------------------------------

/// Identity of a paper: a remote URL or a local file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentId {
    Url(Url),
    Path(PathBuf),
}

impl DocumentId {
    /// Interpret `raw` as an `http(s)` URL, falling back to a filesystem path.
    ///
    /// A leading `~/` is expanded to the user's home directory.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ScholarbotError::validation("empty document identifier"));
        }

        if let Ok(url) = Url::parse(raw) {
            match url.scheme() {
                "http" | "https" => return Ok(Self::Url(url)),
                "file" => {
                    let path = url.to_file_path().map_err(|_| {
                        ScholarbotError::validation(format!("invalid file URL: {raw}"))
                    })?;
                    return Ok(Self::Path(path));
                }
                _ => {}
            }
        }

        let path = match raw.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .ok_or_else(|| ScholarbotError::validation("could not determine home directory"))?
                .join(rest),
            None => PathBuf::from(raw),
        };
        Ok(Self::Path(path))
    }

    /// The URL actually requested for remote documents.
    ///
    /// arXiv abstract pages are swapped for their PDF.
    pub fn download_url(&self) -> Option<Url> {
        match self {
            Self::Url(url) => Some(arxiv::pdf_url(url).unwrap_or_else(|| url.clone())),
            Self::Path(_) => None,
        }
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Raw bytes of a fetched paper.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: DocumentId,
    pub bytes: Vec<u8>,
    /// SHA-256 of `bytes`, hex encoded.
    pub sha256: String,
}

impl Document {
    pub fn new(id: DocumentId, bytes: Vec<u8>) -> Self {
        let sha256 = {
            let mut hasher = Sha256::new();
            hasher.update(&bytes);
            format!("{:x}", hasher.finalize())
        };
        Self { id, bytes, sha256 }
    }
}

// ---------------------------------------------------------------------------
// DocumentStore
// ---------------------------------------------------------------------------

/// Options for the document store's HTTP client.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout_secs: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self { timeout_secs: 60 }
    }
}

/// Fetches papers and keeps them for the rest of the turn.
///
/// One store belongs to one turn; it is not shared across turns or tasks.
pub struct DocumentStore {
    client: Client,
    cache: HashMap<DocumentId, Arc<Document>>,
}

impl DocumentStore {
    /// Create an empty store.
    pub fn new(opts: &FetchOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| {
                ScholarbotError::external("download", format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            cache: HashMap::new(),
        })
    }

    /// Return the document, downloading or reading it on first use.
    #[instrument(skip_all, fields(document = %id))]
    pub async fn fetch(&mut self, id: &DocumentId) -> Result<Arc<Document>> {
        if let Some(doc) = self.cache.get(id) {
            debug!("document cache hit");
            return Ok(Arc::clone(doc));
        }

        let bytes = match id {
            DocumentId::Url(_) => {
                let url = id
                    .download_url()
                    .ok_or_else(|| ScholarbotError::validation("URL document without URL"))?;
                download(&self.client, &url).await?
            }
            DocumentId::Path(path) => tokio::fs::read(path)
                .await
                .map_err(|e| ScholarbotError::io(path, e))?,
        };

        let doc = Arc::new(Document::new(id.clone(), bytes));
        info!(bytes = doc.bytes.len(), sha256 = %doc.sha256, "document fetched");

        self.cache.insert(id.clone(), Arc::clone(&doc));
        Ok(doc)
    }

    /// Number of distinct documents held.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Download a URL's body.
async fn download(client: &Client, url: &Url) -> Result<Vec<u8>> {
    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| ScholarbotError::external("download", format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ScholarbotError::external(
            "download",
            format!("{url}: HTTP {status}"),
        ));
    }

    if let Some(len) = response.content_length() {
        if len > MAX_DOCUMENT_SIZE {
            return Err(ScholarbotError::validation(format!(
                "{url}: document too large ({len} bytes, max {MAX_DOCUMENT_SIZE})"
            )));
        }
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| ScholarbotError::external("download", format!("{url}: failed to read body: {e}")))?;

    Ok(body.to_vec())
}
