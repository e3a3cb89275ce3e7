use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::instrument;
use url::Url;

use super::{RecordStore, SegmentRow, TranscriptRow, VideoRow, SEGMENT_TABLE, TRANSCRIPT_TABLE, VIDEO_TABLE};
use crate::config::DatabaseConfig;
use crate::{ProcessorError, Result};

/// Record store speaking to a PostgREST endpoint such as Supabase's `/rest/v1`
#[derive(Clone)]
pub struct PostgrestStore {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl PostgrestStore {
    pub fn new(config: &DatabaseConfig) -> anyhow::Result<Self> {
        let mut base = config.url.trim_end_matches('/').to_string();
        if !base.ends_with("/rest/v1") {
            base.push_str("/rest/v1");
        }
        base.push('/');

        let base_url = Url::parse(&base).map_err(|_| anyhow::anyhow!("Invalid database URL: {}", config.url))?;

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    fn table_url(&self, table: &str) -> Result<Url> {
        self.base_url
            .join(table)
            .map_err(|e| ProcessorError::Database(format!("invalid table {}: {}", table, e)))
    }

    /// Insert or merge `rows` into `table` and return what the database stored
    async fn upsert_rows<T>(&self, table: &str, rows: &[T]) -> Result<Vec<T>>
    where
        T: Serialize + DeserializeOwned + Sync,
    {
        let url = self.table_url(table)?;
        tracing::debug!("Upserting {} rows into {}", rows.len(), table);

        let response = self
            .http
            .post(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(rows)
            .send()
            .await
            .map_err(|e| ProcessorError::Database(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProcessorError::Database(format!("{} returned HTTP {}: {}", table, status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| ProcessorError::Database(format!("unreadable {} response: {}", table, e)))
    }

    async fn upsert_one<T>(&self, table: &str, row: T) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Sync,
    {
        self.upsert_rows(table, std::slice::from_ref(&row))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ProcessorError::Database(format!("{} returned no rows", table)))
    }
}

#[async_trait]
impl RecordStore for PostgrestStore {
    #[instrument(skip(self, row), fields(id = %row.id))]
    async fn upsert_video(&self, row: VideoRow) -> Result<VideoRow> {
        self.upsert_one(VIDEO_TABLE, row).await
    }

    #[instrument(skip(self, row), fields(id = %row.id))]
    async fn upsert_transcript(&self, row: TranscriptRow) -> Result<TranscriptRow> {
        self.upsert_one(TRANSCRIPT_TABLE, row).await
    }

    #[instrument(skip(self, rows), fields(count = rows.len()))]
    async fn upsert_segments(&self, rows: Vec<SegmentRow>) -> Result<Vec<SegmentRow>> {
        self.upsert_rows(SEGMENT_TABLE, &rows).await
    }
}
