//! arXiv metadata provider.
//!
//! Paper lookup and abstract text come from the arXiv Atom export API
//! (export.arxiv.org/api/query), parsed with the same event-based quick-xml
//! approach used for the other XML literature feeds in this codebase.
//! Citation edges are not published by arXiv itself, so citations and
//! references are sourced from Semantic Scholar's graph API, which is keyed
//! by the same arXiv identifiers.

use std::sync::Arc;

use async_trait::async_trait;
use litgraph_common::config::ProviderConfig;
use litgraph_common::PaperId;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::client::ProviderClient;
use crate::error::ProviderError;
use crate::model::{CitationPage, CitationRef, Cursor, PaperRecord};
use crate::retry::{NoopRetryObserver, RetryObserver};
use crate::traits::MetadataProvider;

const QUERY_URL: &str = "https://export.arxiv.org/api/query";
const S2_BASE: &str = "https://api.semanticscholar.org/graph/v1/paper";

pub struct ArxivProvider {
    client: ProviderClient,
}

impl ArxivProvider {
    pub fn new(cfg: ProviderConfig) -> Result<Self, ProviderError> {
        Self::with_observer(cfg, Arc::new(NoopRetryObserver))
    }

    /// Same as [`Self::new`], but retries are reported to `observer` (spec
    /// §4.1's observability counter) instead of discarded.
    pub fn with_observer(cfg: ProviderConfig, observer: Arc<dyn RetryObserver>) -> Result<Self, ProviderError> {
        let client = ProviderClient::with_observer("arxiv", cfg, &["api.semanticscholar.org"], observer)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MetadataProvider for ArxivProvider {
    fn name(&self) -> &'static str {
        "arxiv"
    }

    #[instrument(skip(self, cancel))]
    async fn get_paper(&self, id: &PaperId, cancel: &CancellationToken) -> Result<PaperRecord, ProviderError> {
        let url = format!("{QUERY_URL}?id_list={}", id.as_str());
        let xml = self.client.get_text(&url, cancel, |req| req).await?;

        let papers = parse_arxiv_feed(&xml)?;
        papers.into_iter().next().ok_or(ProviderError::NotFound)
    }

    #[instrument(skip(self, cancel))]
    async fn get_citations(&self, id: &PaperId, cursor: Cursor, cancel: &CancellationToken) -> Result<CitationPage, ProviderError> {
        fetch_s2_edges(&self.client, id, "citations", cursor, cancel).await
    }

    #[instrument(skip(self, cancel))]
    async fn get_references(&self, id: &PaperId, cursor: Cursor, cancel: &CancellationToken) -> Result<CitationPage, ProviderError> {
        fetch_s2_edges(&self.client, id, "references", cursor, cancel).await
    }
}

#[derive(Debug, Deserialize)]
struct S2EdgeResponse {
    data: Vec<S2Edge>,
    #[serde(default)]
    next: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct S2Edge {
    #[serde(alias = "citingPaper", alias = "citedPaper")]
    paper: S2Paper,
    #[serde(default)]
    contexts: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct S2Paper {
    #[serde(rename = "externalIds", default)]
    external_ids: Option<S2ExternalIds>,
    #[serde(rename = "paperId")]
    paper_id: String,
}

#[derive(Debug, Deserialize, Default)]
struct S2ExternalIds {
    #[serde(rename = "ArXiv")]
    arxiv: Option<String>,
}

async fn fetch_s2_edges(
    client: &ProviderClient,
    id: &PaperId,
    edge_kind: &str,
    cursor: Cursor,
    cancel: &CancellationToken,
) -> Result<CitationPage, ProviderError> {
    let offset = cursor.0.as_deref().unwrap_or("0");
    let url = format!(
        "{S2_BASE}/arXiv:{}/{edge_kind}?fields=contexts,externalIds,paperId&offset={offset}&limit=50",
        id.as_str()
    );
    let resp: S2EdgeResponse = client.get_json(&url, cancel, |req| req).await?;

    let items = resp
        .data
        .into_iter()
        .map(|edge| {
            let other = edge
                .paper
                .external_ids
                .and_then(|e| e.arxiv)
                .unwrap_or(edge.paper.paper_id);
            CitationRef {
                other_id: PaperId::new(other),
                context: edge.contexts.into_iter().next(),
            }
        })
        .collect();

    let next = Cursor(resp.next.map(|n| n.to_string()));
    Ok(CitationPage { items, next })
}

fn parse_arxiv_feed(xml: &str) -> Result<Vec<PaperRecord>, ProviderError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut papers = Vec::new();
    let mut buf = Vec::new();

    let mut in_entry = false;
    let mut in_title = false;
    let mut in_summary = false;
    let mut in_id = false;
    let mut in_author_name = false;
    let mut in_published = false;

    let mut id = String::new();
    let mut title = String::new();
    let mut summary = String::new();
    let mut authors: Vec<String> = Vec::new();
    let mut categories: Vec<String> = Vec::new();
    let mut published: Option<chrono::NaiveDate> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"entry" => {
                    in_entry = true;
                    id.clear();
                    title.clear();
                    summary.clear();
                    authors.clear();
                    categories.clear();
                    published = None;
                }
                b"title" if in_entry => in_title = true,
                b"summary" if in_entry => in_summary = true,
                b"id" if in_entry => in_id = true,
                b"name" if in_entry => in_author_name = true,
                b"published" if in_entry => in_published = true,
                b"category" if in_entry => {
                    if let Some(term) = e.attributes().flatten().find(|a| a.key.as_ref() == b"term") {
                        categories.push(String::from_utf8_lossy(&term.value).to_string());
                    }
                }
                _ => {}
            },
            Ok(Event::Text(t)) => {
                let text = t.unescape().unwrap_or_default().to_string();
                if in_title {
                    title.push_str(&text);
                } else if in_summary {
                    summary.push_str(&text);
                } else if in_id {
                    id.push_str(&text);
                } else if in_author_name {
                    authors.push(text);
                } else if in_published {
                    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(&text) {
                        published = Some(parsed.naive_utc().date());
                    }
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"entry" => {
                    in_entry = false;
                    let short_id = id.rsplit('/').next().unwrap_or(&id).to_string();
                    papers.push(PaperRecord {
                        id: PaperId::new(if short_id.is_empty() { id.clone() } else { short_id }),
                        title: title.trim().to_string(),
                        abstract_text: if summary.trim().is_empty() { None } else { Some(summary.trim().to_string()) },
                        authors: authors.clone(),
                        categories: categories.clone(),
                        published_date: published,
                        citation_count: None,
                    });
                }
                b"title" => in_title = false,
                b"summary" => in_summary = false,
                b"id" => in_id = false,
                b"name" => in_author_name = false,
                b"published" => in_published = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ProviderError::InvalidInput(format!("arxiv feed parse error: {e}"))),
            _ => {}
        }
        buf.clear();
    }

    debug!(n = papers.len(), "parsed arxiv atom feed");
    Ok(papers)
}
