use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response, Url};
use serde_json::json;

use super::{realtime, Backend, BackendError, ChangeFeed};
use crate::config::Settings;
use crate::state::data::{NewTestCase, RecordId, Status, TestCase};

/// Supabase project used as the board's backend.
///
/// Reads and writes go through PostgREST (`/rest/v1/<table>`), the change
/// stream through Realtime (see `realtime.rs`).
#[derive(Debug, Clone)]
pub struct SupabaseBackend {
    http: Client,
    settings: Settings,
    table_url: Url,
}

impl SupabaseBackend {
    pub fn new(settings: Settings) -> Result<Self, BackendError> {
        let table_url = table_url(&settings)?;

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&settings.anon_key)
            .map_err(|_| BackendError::Url("anon key is not a valid header value".into()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", settings.anon_key))
            .map_err(|_| BackendError::Url("anon key is not a valid header value".into()))?;
        headers.insert("apikey", key);
        headers.insert(reqwest::header::AUTHORIZATION, bearer);

        let http = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            settings,
            table_url,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// `?id=eq.<id>` filter used by update and delete
    fn id_filter(id: &RecordId) -> [(&'static str, String); 1] {
        [("id", format!("eq.{}", id.as_str()))]
    }
}

#[async_trait]
impl Backend for SupabaseBackend {
    async fn fetch_all(&self) -> Result<Vec<TestCase>, BackendError> {
        let response = self
            .http
            .get(self.table_url.clone())
            .query(&[("select", "*"), ("order", "created_at.asc")])
            .send()
            .await?;
        let body = check(response).await?.text().await?;
        let records: Vec<TestCase> = serde_json::from_str(&body)?;
        debug!("fetched {} test cases", records.len());
        Ok(records)
    }

    async fn insert(&self, record: &NewTestCase) -> Result<(), BackendError> {
        let response = self
            .http
            .post(self.table_url.clone())
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn update_status(&self, id: &RecordId, status: Status) -> Result<(), BackendError> {
        let response = self
            .http
            .patch(self.table_url.clone())
            .query(&Self::id_filter(id))
            .header("Prefer", "return=minimal")
            .json(&json!({ "status": status }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn delete(&self, id: &RecordId) -> Result<(), BackendError> {
        let response = self
            .http
            .delete(self.table_url.clone())
            .query(&Self::id_filter(id))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn subscribe(&self) -> Result<ChangeFeed, BackendError> {
        realtime::connect(&self.settings).await
    }
}

/// Turn a non-success status into an error carrying the response body
async fn check(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Project URL with `path` appended to whatever path it already has
pub(crate) fn project_url(settings: &Settings, path: &str) -> Result<Url, BackendError> {
    let mut url = Url::parse(&settings.url)
        .map_err(|e| BackendError::Url(format!("{}: {e}", settings.url)))?;
    let base = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{base}/{path}"));
    Ok(url)
}

fn table_url(settings: &Settings) -> Result<Url, BackendError> {
    project_url(settings, &format!("rest/v1/{}", settings.table))
}
