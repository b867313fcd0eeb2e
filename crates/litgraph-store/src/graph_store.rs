//! The graph store: papers/concepts as nodes, citations/mentions as edges,
//! backed by Postgres (spec §4.4). Writes are append-only in the same spirit
//! as this codebase's other fact stores — citation edges are superseded
//! (`valid_until = NOW()`) rather than overwritten in place, preserving the
//! provenance of earlier classifications.

use async_trait::async_trait;
use litgraph_common::entities::{CitationEdge, CitationIntent, CitationPosition, Concept, ConceptKind, MentionsEdge, Paper};
use litgraph_common::{CoreError, PaperId, Result};
use sqlx::PgPool;
use tracing::{debug, instrument};

#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Insert or update a paper node. Idempotent: calling this twice with
    /// the same `Paper` leaves the store in the same state (spec §8).
    async fn upsert_paper(&self, paper: &Paper) -> Result<()>;

    async fn get_paper(&self, id: &PaperId) -> Result<Option<Paper>>;

    /// Insert a citation edge, or supersede an existing one if `incoming`
    /// carries non-null fields the stored edge is missing (spec §3 merge
    /// semantics for `CitationEdge::merge`).
    async fn upsert_citation_edge(&self, edge: &CitationEdge) -> Result<()>;

    async fn upsert_concept(&self, concept: &Concept) -> Result<()>;

    async fn upsert_mention(&self, mention: &MentionsEdge) -> Result<()>;

    /// Papers within `depth` hops of `id` via citation edges in either direction.
    async fn citation_neighborhood(&self, id: &PaperId, depth: u32, limit: usize) -> Result<Vec<PaperId>>;

    /// All current citation edges, for offline community detection (spec
    /// §4.4/§4.6 "community detection via batch export").
    async fn export_edges(&self) -> Result<Vec<(PaperId, PaperId)>>;

    /// A page of papers ordered by id, optionally restricted to one category,
    /// plus the total count matching the filter (spec §4.6 `list_papers`).
    async fn list_papers(&self, offset: i64, limit: i64, category: Option<&str>) -> Result<(Vec<Paper>, i64)>;

    /// Ids of papers `id` cites (outgoing edges), for `get_paper`'s
    /// `include_references` (spec §4.6).
    async fn outgoing_citations(&self, id: &PaperId) -> Result<Vec<PaperId>>;

    /// Ids of papers that cite `id` (incoming edges), for `get_paper`'s
    /// `include_citations` (spec §4.6).
    async fn incoming_citations(&self, id: &PaperId) -> Result<Vec<PaperId>>;
}

#[derive(Clone)]
pub struct PgGraphStore {
    pool: PgPool,
}

impl PgGraphStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl GraphStore for PgGraphStore {
    #[instrument(skip(self, paper), fields(paper_id = paper.id.as_ref().map(|i| i.as_str())))]
    async fn upsert_paper(&self, paper: &Paper) -> Result<()> {
        let id = paper.id.as_ref().ok_or_else(|| CoreError::InvalidId("paper has no id".to_string()))?;
        sqlx::query(
            r#"
            INSERT INTO papers
                (id, title, abstract_text, authors, categories, published_date,
                 citation_count, tl_dr, summary, duplicate_of)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                abstract_text = EXCLUDED.abstract_text,
                authors = EXCLUDED.authors,
                categories = EXCLUDED.categories,
                published_date = EXCLUDED.published_date,
                citation_count = EXCLUDED.citation_count,
                tl_dr = EXCLUDED.tl_dr,
                summary = EXCLUDED.summary,
                duplicate_of = EXCLUDED.duplicate_of
            "#,
        )
        .bind(id.as_str())
        .bind(&paper.title)
        .bind(&paper.abstract_text)
        .bind(&paper.authors)
        .bind(&paper.categories)
        .bind(paper.published_date)
        .bind(paper.citation_count.map(|c| c as i64))
        .bind(&paper.tl_dr)
        .bind(&paper.summary)
        .bind(paper.duplicate_of.as_ref().map(|d| d.as_str().to_string()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_paper(&self, id: &PaperId) -> Result<Option<Paper>> {
        let row = sqlx::query_as::<_, PaperRow>(
            r#"
            SELECT id, title, abstract_text, authors, categories, published_date,
                   citation_count, tl_dr, summary, duplicate_of
            FROM papers WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Paper::from))
    }

    #[instrument(skip(self, edge))]
    async fn upsert_citation_edge(&self, edge: &CitationEdge) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, CitationEdgeRow>(
            r#"
            SELECT src, dst, intent, position, context
            FROM citation_edges
            WHERE src = $1 AND dst = $2 AND valid_until IS NULL
            "#,
        )
        .bind(edge.src.as_str())
        .bind(edge.dst.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let existing_edge: Option<CitationEdge> = existing.map(CitationEdge::from);
        let merged = match &existing_edge {
            Some(row) => {
                let mut current = row.clone();
                current.merge(edge);
                current
            }
            None => edge.clone(),
        };

        if existing_edge.as_ref() == Some(&merged) {
            tx.commit().await?;
            return Ok(());
        }

        sqlx::query("UPDATE citation_edges SET valid_until = NOW() WHERE src = $1 AND dst = $2 AND valid_until IS NULL")
            .bind(edge.src.as_str())
            .bind(edge.dst.as_str())
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO citation_edges (src, dst, intent, position, context, valid_from, valid_until)
            VALUES ($1,$2,$3,$4,$5,NOW(),NULL)
            "#,
        )
        .bind(merged.src.as_str())
        .bind(merged.dst.as_str())
        .bind(intent_str(&merged.intent))
        .bind(position_str(&merged.position))
        .bind(&merged.context)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(src = edge.src.as_str(), dst = edge.dst.as_str(), "upserted citation edge");
        Ok(())
    }

    #[instrument(skip(self, concept))]
    async fn upsert_concept(&self, concept: &Concept) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO concepts (normalized_name, display_name, kind)
            VALUES ($1,$2,$3)
            ON CONFLICT (normalized_name) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                kind = EXCLUDED.kind
            "#,
        )
        .bind(concept.normalized_name())
        .bind(&concept.name)
        .bind(concept_kind_str(&concept.kind))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self, mention))]
    async fn upsert_mention(&self, mention: &MentionsEdge) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO mentions_edges (paper_id, concept_normalized_name, confidence)
            VALUES ($1,$2,$3)
            ON CONFLICT (paper_id, concept_normalized_name) DO UPDATE SET confidence = EXCLUDED.confidence
            "#,
        )
        .bind(mention.paper.as_str())
        .bind(litgraph_common::entities::normalize_name(&mention.concept_name))
        .bind(mention.confidence.map(|c| c as f64))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn citation_neighborhood(&self, id: &PaperId, depth: u32, limit: usize) -> Result<Vec<PaperId>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            WITH RECURSIVE neighborhood(id, hop) AS (
                SELECT $1::text, 0
                UNION
                SELECT CASE WHEN e.src = n.id THEN e.dst ELSE e.src END, n.hop + 1
                FROM citation_edges e
                JOIN neighborhood n ON (e.src = n.id OR e.dst = n.id)
                WHERE e.valid_until IS NULL AND n.hop < $2
            )
            SELECT DISTINCT id FROM neighborhood WHERE id != $1 LIMIT $3
            "#,
        )
        .bind(id.as_str())
        .bind(depth as i32)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(s,)| PaperId::new(s)).collect())
    }

    #[instrument(skip(self))]
    async fn export_edges(&self) -> Result<Vec<(PaperId, PaperId)>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT src, dst FROM citation_edges WHERE valid_until IS NULL")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(a, b)| (PaperId::new(a), PaperId::new(b))).collect())
    }

    #[instrument(skip(self))]
    async fn list_papers(&self, offset: i64, limit: i64, category: Option<&str>) -> Result<(Vec<Paper>, i64)> {
        let rows = sqlx::query_as::<_, PaperRow>(
            r#"
            SELECT id, title, abstract_text, authors, categories, published_date,
                   citation_count, tl_dr, summary, duplicate_of
            FROM papers
            WHERE $1::text IS NULL OR $1 = ANY(categories)
            ORDER BY id
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(category)
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(
            r#"SELECT COUNT(*) FROM papers WHERE $1::text IS NULL OR $1 = ANY(categories)"#,
        )
        .bind(category)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows.into_iter().map(Paper::from).collect(), total))
    }

    #[instrument(skip(self))]
    async fn outgoing_citations(&self, id: &PaperId) -> Result<Vec<PaperId>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT dst FROM citation_edges WHERE src = $1 AND valid_until IS NULL")
                .bind(id.as_str())
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(s,)| PaperId::new(s)).collect())
    }

    #[instrument(skip(self))]
    async fn incoming_citations(&self, id: &PaperId) -> Result<Vec<PaperId>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT src FROM citation_edges WHERE dst = $1 AND valid_until IS NULL")
                .bind(id.as_str())
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(s,)| PaperId::new(s)).collect())
    }
}

fn intent_str(intent: &CitationIntent) -> &'static str {
    match intent {
        CitationIntent::Method => "method",
        CitationIntent::Background => "background",
        CitationIntent::Result => "result",
        CitationIntent::Critique => "critique",
        CitationIntent::Extension => "extension",
        CitationIntent::Unknown => "unknown",
    }
}

fn intent_from_str(s: &str) -> CitationIntent {
    match s {
        "method" => CitationIntent::Method,
        "background" => CitationIntent::Background,
        "result" => CitationIntent::Result,
        "critique" => CitationIntent::Critique,
        "extension" => CitationIntent::Extension,
        _ => CitationIntent::Unknown,
    }
}

fn position_str(position: &CitationPosition) -> &'static str {
    match position {
        CitationPosition::Abstract => "abstract",
        CitationPosition::Introduction => "introduction",
        CitationPosition::Methods => "methods",
        CitationPosition::Results => "results",
        CitationPosition::Discussion => "discussion",
        CitationPosition::Other => "other",
    }
}

fn position_from_str(s: &str) -> CitationPosition {
    match s {
        "abstract" => CitationPosition::Abstract,
        "introduction" => CitationPosition::Introduction,
        "methods" => CitationPosition::Methods,
        "results" => CitationPosition::Results,
        "discussion" => CitationPosition::Discussion,
        _ => CitationPosition::Other,
    }
}

fn concept_kind_str(kind: &ConceptKind) -> &'static str {
    match kind {
        ConceptKind::Method => "method",
        ConceptKind::Theorem => "theorem",
        ConceptKind::Dataset => "dataset",
        ConceptKind::Equation => "equation",
        ConceptKind::Constant => "constant",
        ConceptKind::Conjecture => "conjecture",
        ConceptKind::Other => "other",
    }
}

#[derive(sqlx::FromRow)]
struct PaperRow {
    id: String,
    title: String,
    abstract_text: Option<String>,
    authors: Vec<String>,
    categories: Vec<String>,
    published_date: Option<chrono::NaiveDate>,
    citation_count: Option<i64>,
    tl_dr: Option<String>,
    summary: Option<String>,
    duplicate_of: Option<String>,
}

impl From<PaperRow> for Paper {
    fn from(r: PaperRow) -> Self {
        Paper {
            id: Some(PaperId::new(r.id)),
            title: r.title,
            abstract_text: r.abstract_text,
            authors: r.authors,
            categories: r.categories,
            published_date: r.published_date,
            citation_count: r.citation_count.map(|c| c as u64),
            tl_dr: r.tl_dr,
            summary: r.summary,
            embedding: None,
            duplicate_of: r.duplicate_of.map(PaperId::new),
        }
    }
}

#[derive(sqlx::FromRow)]
struct CitationEdgeRow {
    src: String,
    dst: String,
    intent: String,
    position: String,
    context: Option<String>,
}

impl From<CitationEdgeRow> for CitationEdge {
    fn from(r: CitationEdgeRow) -> Self {
        CitationEdge {
            src: PaperId::new(r.src),
            dst: PaperId::new(r.dst),
            intent: intent_from_str(&r.intent),
            position: position_from_str(&r.position),
            context: r.context,
        }
    }
}
