//! arXiv URL helpers and the export API lookup used for paper notes.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use scholarbot_shared::{Result, ScholarbotError};

/// Whether `url` points at an arXiv paper (abstract or PDF page).
pub fn is_paper_url(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let on_arxiv = host == "arxiv.org" || host.ends_with(".arxiv.org");
    on_arxiv && (url.path().starts_with("/abs/") || url.path().starts_with("/pdf/"))
}

/// The paper identifier (`2307.09288v2`, `cs/0112017`) from an arXiv URL.
pub fn paper_id(url: &Url) -> Option<String> {
    if !is_paper_url(url) {
        return None;
    }
    let rest = url
        .path()
        .trim_start_matches("/abs/")
        .trim_start_matches("/pdf/")
        .trim_end_matches('/');
    let id = rest.strip_suffix(".pdf").unwrap_or(rest);
    (!id.is_empty()).then(|| id.to_string())
}

/// Rewrite an arXiv abstract URL to the matching PDF URL.
///
/// PDF URLs come back without their `.pdf` suffix; non-arXiv URLs yield `None`.
pub fn pdf_url(url: &Url) -> Option<Url> {
    let id = paper_id(url)?;
    let mut pdf = url.clone();
    pdf.set_path(&format!("/pdf/{id}"));
    pdf.set_query(None);
    pdf.set_fragment(None);
    Some(pdf)
}

// ---------------------------------------------------------------------------
// Export API
// ---------------------------------------------------------------------------

/// Title and abstract of an arXiv paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArxivEntry {
    pub id: String,
    pub title: String,
    pub summary: String,
}

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<FeedEntry>,
}

#[derive(Debug, Deserialize)]
struct FeedEntry {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
}

/// Client for the arXiv export API (`?id_list=` queries, Atom responses).
pub struct ArxivApi {
    client: Client,
    endpoint: Url,
}

impl ArxivApi {
    /// Create a client for `endpoint`, e.g. `https://export.arxiv.org/api/query`.
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            ScholarbotError::config(format!("invalid arXiv API URL '{endpoint}': {e}"))
        })?;
        let client = Client::builder()
            .user_agent(concat!("scholarbot/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| {
                ScholarbotError::external("arxiv", format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self { client, endpoint })
    }

    /// Look up one paper by identifier (`2307.09288`, `cs/0112017`, ...).
    #[instrument(skip(self))]
    pub async fn lookup(&self, id: &str) -> Result<ArxivEntry> {
        let response = self
            .client
            .get(self.endpoint.as_str())
            .query(&[("id_list", id), ("max_results", "1")])
            .send()
            .await
            .map_err(|e| ScholarbotError::external("arxiv", format!("{id}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScholarbotError::external(
                "arxiv",
                format!("{id}: HTTP {status}"),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ScholarbotError::external("arxiv", format!("{id}: failed to read body: {e}")))?;

        let entry = parse_feed(&body, id)?;
        debug!(title = %entry.title, "arXiv entry found");
        Ok(entry)
    }
}

/// Pull the single entry out of an Atom feed.
///
/// The API reports bad identifiers as an entry whose id points at its
/// error documentation.
fn parse_feed(body: &str, id: &str) -> Result<ArxivEntry> {
    let feed: Feed = quick_xml::de::from_str(body).map_err(|e| {
        ScholarbotError::external("arxiv", format!("{id}: unreadable feed: {e}"))
    })?;

    let entry = feed
        .entries
        .into_iter()
        .next()
        .ok_or_else(|| ScholarbotError::external("arxiv", format!("{id}: no such paper")))?;

    if entry.id.contains("/api/errors") {
        return Err(ScholarbotError::external(
            "arxiv",
            format!("{id}: {}", collapse_whitespace(&entry.summary)),
        ));
    }

    Ok(ArxivEntry {
        id: entry.id.trim().to_string(),
        title: collapse_whitespace(&entry.title),
        summary: collapse_whitespace(&entry.summary),
    })
}

/// Atom titles and abstracts arrive hard-wrapped.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn recognises_abs_and_pdf_links() {
        assert!(is_paper_url(&url("https://arxiv.org/abs/2307.09288")));
        assert!(is_paper_url(&url("https://export.arxiv.org/pdf/2307.09288.pdf")));
        assert!(!is_paper_url(&url("https://arxiv.org/list/cs.AI/recent")));
        assert!(!is_paper_url(&url("https://example.com/abs/1234")));
    }

    #[test]
    fn extracts_ids() {
        assert_eq!(
            paper_id(&url("https://arxiv.org/abs/2307.09288v2")).as_deref(),
            Some("2307.09288v2")
        );
        assert_eq!(
            paper_id(&url("https://arxiv.org/pdf/2307.09288.pdf")).as_deref(),
            Some("2307.09288")
        );
        assert_eq!(
            paper_id(&url("https://arxiv.org/abs/cs/0112017")).as_deref(),
            Some("cs/0112017")
        );
    }

    #[test]
    fn abstract_rewrites_to_pdf() {
        let pdf = pdf_url(&url("https://arxiv.org/abs/2307.09288?context=cs")).unwrap();
        assert_eq!(pdf.as_str(), "https://arxiv.org/pdf/2307.09288");
        assert!(pdf_url(&url("https://example.com/paper.pdf")).is_none());
    }

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <link href="http://arxiv.org/api/query?id_list=1706.03762" rel="self" type="application/atom+xml"/>
  <title type="html">ArXiv Query: id_list=1706.03762</title>
  <id>http://arxiv.org/api/cHxbiOdZaP56ODnBPIenZhzg5f8</id>
  <updated>2024-01-01T00:00:00-05:00</updated>
  <opensearch:totalResults xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">1</opensearch:totalResults>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <updated>2023-08-02T00:41:18Z</updated>
    <published>2017-06-12T17:57:34Z</published>
    <title>Attention Is All You
  Need</title>
    <summary>  The dominant sequence transduction models are based on complex recurrent or
convolutional neural networks.
</summary>
    <author><name>Ashish Vaswani</name></author>
    <author><name>Noam Shazeer</name></author>
    <link href="http://arxiv.org/abs/1706.03762v7" rel="alternate" type="text/html"/>
    <arxiv:primary_category xmlns:arxiv="http://arxiv.org/schemas/atom" term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
</feed>"#;

    const ERROR_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query: id_list=nope</title>
  <entry>
    <id>http://arxiv.org/api/errors#incorrect_id_format_for_nope</id>
    <title>Error</title>
    <summary>incorrect id format for nope</summary>
  </entry>
</feed>"#;

    #[test]
    fn feed_entry_is_unwrapped() {
        let entry = parse_feed(FEED, "1706.03762").unwrap();
        assert_eq!(entry.title, "Attention Is All You Need");
        assert_eq!(
            entry.summary,
            "The dominant sequence transduction models are based on complex recurrent or \
             convolutional neural networks."
        );
        assert_eq!(entry.id, "http://arxiv.org/abs/1706.03762v7");
    }

    #[test]
    fn error_entries_and_empty_feeds_fail() {
        let err = parse_feed(ERROR_FEED, "nope").unwrap_err();
        assert_eq!(err.category(), "external-call");
        assert!(err.to_string().contains("incorrect id format"));

        let empty = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>ArXiv Query</title></feed>"#;
        assert!(parse_feed(empty, "0000.00000").unwrap_err().to_string().contains("no such paper"));
    }

    #[tokio::test]
    async fn lookup_queries_the_export_api() {
        use wiremock::matchers::{method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/query"))
            .and(query_param("id_list", "1706.03762"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .expect(1)
            .mount(&server)
            .await;

        let api = ArxivApi::new(&format!("{}/api/query", server.uri()), 5).unwrap();
        let entry = api.lookup("1706.03762").await.unwrap();
        assert_eq!(entry.title, "Attention Is All You Need");
    }

    #[tokio::test]
    async fn lookup_reports_http_failures() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let api = ArxivApi::new(&server.uri(), 5).unwrap();
        let err = api.lookup("1706.03762").await.unwrap_err();
        assert_eq!(err.category(), "external-call");
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn bad_endpoint_is_a_config_error() {
        assert_eq!(ArxivApi::new("not a url", 5).err().map(|e| e.category()), Some("config"));
    }
}
