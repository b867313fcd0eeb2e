//! The vector store: paper embeddings in an embedded LanceDB database,
//! queried by cosine similarity with optional attribute filters (spec §4.4).
//!
//! This store is intentionally separate from the graph store's Postgres
//! connection — the two are never part of the same transaction (spec §4.4
//! "graph and vector writes are not jointly transactional"). A paper whose
//! graph write succeeds but whose vector write fails is left in the
//! documented "graph-persisted, embedding-missing" state and is retried by
//! a later analyzer pass rather than rolled back.

use std::path::Path;
use std::sync::Arc;

use arrow_array::{Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatch, RecordBatchIterator, StringArray};
use arrow_schema::{DataType, Field, Fields, Schema};
use async_trait::async_trait;
use futures::StreamExt;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase};
use litgraph_common::{CoreError, PaperId, Result};

const TABLE_PAPER_EMBEDDINGS: &str = "paper_embeddings";

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedPaper {
    pub id: PaperId,
    pub title: String,
    pub categories: Vec<String>,
    pub citation_count: Option<u64>,
    pub embedding_model_id: String,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatch {
    pub id: PaperId,
    pub title: String,
    pub distance: f32,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite a paper's embedding (spec §8 idempotent upsert).
    async fn upsert(&self, paper: &EmbeddedPaper) -> Result<()>;

    /// The embedding-model-id a paper was last embedded with, if any
    /// (spec §9 Open Question: re-embed on model-id mismatch).
    async fn embedding_model_id(&self, id: &PaperId) -> Result<Option<String>>;

    /// `k` nearest neighbors to `query`, optionally restricted by a LanceDB
    /// filter expression over projected attributes (e.g. `"citation_count > 10"`).
    async fn query(&self, query: &[f32], k: usize, filter: Option<&str>) -> Result<Vec<VectorMatch>>;
}

pub struct LanceVectorStore {
    conn: Connection,
    embedding_dim: usize,
}

impl LanceVectorStore {
    pub async fn open(path: impl AsRef<Path>, embedding_dim: usize) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        if !path.as_ref().exists() {
            std::fs::create_dir_all(path.as_ref()).map_err(|e| CoreError::Other(e.into()))?;
        }
        let conn = lancedb::connect(&path_str)
            .execute()
            .await
            .map_err(|e| CoreError::Other(e.into()))?;
        let store = Self { conn, embedding_dim };
        store.ensure_table().await?;
        Ok(store)
    }

    fn schema(&self) -> Arc<Schema> {
        let fields: Fields = vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("title", DataType::Utf8, false),
            Field::new("categories", DataType::Utf8, true),
            Field::new("citation_count", DataType::Int64, true),
            Field::new("embedding_model_id", DataType::Utf8, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, false)), self.embedding_dim as i32),
                false,
            ),
        ]
        .into();
        Arc::new(Schema::new(fields))
    }

    async fn ensure_table(&self) -> Result<()> {
        let names = self.conn.table_names().execute().await.map_err(|e| CoreError::Other(e.into()))?;
        if names.contains(&TABLE_PAPER_EMBEDDINGS.to_string()) {
            return Ok(());
        }
        let schema = self.schema();
        let empty = RecordBatchIterator::new(vec![], schema);
        self.conn
            .create_table(TABLE_PAPER_EMBEDDINGS, empty)
            .execute()
            .await
            .map_err(|e| CoreError::Other(e.into()))?;
        Ok(())
    }

    fn to_record(&self, paper: &EmbeddedPaper) -> Result<RecordBatch> {
        if paper.embedding.len() != self.embedding_dim {
            return Err(CoreError::SchemaMismatch(format!(
                "embedding has {} dims, expected {}",
                paper.embedding.len(),
                self.embedding_dim
            )));
        }
        let schema = self.schema();
        let id = StringArray::from(vec![paper.id.as_str()]);
        let title = StringArray::from(vec![paper.title.as_str()]);
        let categories = StringArray::from(vec![paper.categories.join(",")]);
        let citation_count = Int64Array::from(vec![paper.citation_count.map(|c| c as i64)]);
        let embedding_model_id = StringArray::from(vec![paper.embedding_model_id.as_str()]);
        let values = Float32Array::from(paper.embedding.clone());
        let embedding = FixedSizeListArray::try_new_from_values(values, self.embedding_dim as i32)
            .map_err(|e| CoreError::Other(e.into()))?;

        RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(id) as Arc<dyn Array>,
                Arc::new(title),
                Arc::new(categories),
                Arc::new(citation_count),
                Arc::new(embedding_model_id),
                Arc::new(embedding),
            ],
        )
        .map_err(|e| CoreError::Other(e.into()))
    }
}

#[async_trait]
impl VectorStore for LanceVectorStore {
    async fn upsert(&self, paper: &EmbeddedPaper) -> Result<()> {
        let table = self
            .conn
            .open_table(TABLE_PAPER_EMBEDDINGS)
            .execute()
            .await
            .map_err(|e| CoreError::Other(e.into()))?;

        let record = self.to_record(paper)?;
        let schema = record.schema();
        let iter = RecordBatchIterator::new(vec![Ok(record)], schema);

        let mut builder = table.merge_insert(&["id"]);
        builder.when_matched_update_all(None);
        builder.when_not_matched_insert_all();
        builder
            .execute(Box::new(iter))
            .await
            .map_err(|e| CoreError::Other(e.into()))?;
        Ok(())
    }

    async fn embedding_model_id(&self, id: &PaperId) -> Result<Option<String>> {
        let table = self
            .conn
            .open_table(TABLE_PAPER_EMBEDDINGS)
            .execute()
            .await
            .map_err(|e| CoreError::Other(e.into()))?;

        let mut stream = table
            .query()
            .only_if(format!("id = '{}'", escape(id.as_str())))
            .execute()
            .await
            .map_err(|e| CoreError::Other(e.into()))?;

        while let Some(batch) = stream.next().await {
            let batch = batch.map_err(|e| CoreError::Other(e.into()))?;
            if batch.num_rows() > 0 {
                let col = batch
                    .column_by_name("embedding_model_id")
                    .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                    .map(|a| a.value(0).to_string());
                return Ok(col);
            }
        }
        Ok(None)
    }

    async fn query(&self, query: &[f32], k: usize, filter: Option<&str>) -> Result<Vec<VectorMatch>> {
        let table = self
            .conn
            .open_table(TABLE_PAPER_EMBEDDINGS)
            .execute()
            .await
            .map_err(|e| CoreError::Other(e.into()))?;

        let mut builder = table.vector_search(query.to_vec()).map_err(|e| CoreError::Other(e.into()))?.limit(k);
        if let Some(f) = filter {
            builder = builder.only_if(f);
        }
        let mut stream = builder.execute().await.map_err(|e| CoreError::Other(e.into()))?;

        let mut matches = Vec::new();
        while let Some(batch) = stream.next().await {
            let batch = batch.map_err(|e| CoreError::Other(e.into()))?;
            let ids = batch.column_by_name("id").and_then(|c| c.as_any().downcast_ref::<StringArray>());
            let titles = batch.column_by_name("title").and_then(|c| c.as_any().downcast_ref::<StringArray>());
            let distances = batch.column_by_name("_distance").and_then(|c| c.as_any().downcast_ref::<Float32Array>());
            if let (Some(ids), Some(titles)) = (ids, titles) {
                for i in 0..batch.num_rows() {
                    matches.push(VectorMatch {
                        id: PaperId::new(ids.value(i)),
                        title: titles.value(i).to_string(),
                        distance: distances.map(|d| d.value(i)).unwrap_or(f32::NAN),
                    });
                }
            }
        }
        Ok(matches)
    }
}

fn escape(s: &str) -> String {
    s.replace('\'', "''")
}
