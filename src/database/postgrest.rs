use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error};
use url::Url;

use crate::config::DataApiConfig;
use crate::database::record::Record;
use crate::database::store::{DataError, DataStore};
use crate::filter::filter_where::validate_table_name;
use crate::filter::FilterData;

/// Postgres unique_violation, surfaced by PostgREST in the `code` field
const UNIQUE_VIOLATION: &str = "23505";

/// Error body returned by PostgREST on non-2xx responses
#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

/// `DataStore` backed by a PostgREST-compatible HTTP API
#[derive(Clone)]
pub struct PostgrestClient {
    http: reqwest::Client,
    base: Url,
    api_key: Option<String>,
}

impl PostgrestClient {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self, DataError> {
        let mut base = Url::parse(base_url).map_err(|_| DataError::InvalidUrl(base_url.to_string()))?;
        // Url::join replaces the last segment unless the path ends with '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::Connection(e.to_string()))?;

        Ok(Self { http, base, api_key })
    }

    pub fn from_config(config: &DataApiConfig) -> Result<Self, DataError> {
        Self::new(&config.url, config.api_key.clone(), Duration::from_secs(config.timeout_secs))
    }

    fn table_url(&self, table: &str, filter: &FilterData) -> Result<Url, DataError> {
        validate_table_name(table)?;
        let mut url = self.base.join(table).map_err(|_| DataError::InvalidUrl(table.to_string()))?;
        let pairs = filter.to_query_pairs()?;
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut builder = self.http.request(method, url).header(header::ACCEPT, "application/json");
        if let Some(key) = &self.api_key {
            builder = builder
                .header("apikey", key)
                .header(header::AUTHORIZATION, format!("Bearer {}", key));
        }
        builder
    }

    async fn read_rows(response: Response) -> Result<Vec<Record>, DataError> {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_from(status.as_u16(), response).await);
        }

        let body: Value = response.json().await?;
        match body {
            Value::Array(rows) => rows
                .into_iter()
                .map(|row| match row {
                    Value::Object(map) => Ok(map),
                    other => Err(DataError::Decode(format!("expected object row, got {}", other))),
                })
                .collect(),
            Value::Object(map) => Ok(vec![map]),
            other => Err(DataError::Decode(format!("expected array of rows, got {}", other))),
        }
    }

    async fn error_from(status: u16, response: Response) -> DataError {
        let text = response.text().await.unwrap_or_default();
        let parsed: Option<PostgrestErrorBody> = serde_json::from_str(&text).ok();

        let (code, message) = match parsed {
            Some(body) => {
                let message = match (body.message, body.details) {
                    (Some(m), Some(d)) => format!("{} ({})", m, d),
                    (Some(m), None) => m,
                    (None, Some(d)) => d,
                    (None, None) => text.clone(),
                };
                (body.code, message)
            }
            None => (None, text),
        };

        if code.as_deref() == Some(UNIQUE_VIOLATION) || status == 409 {
            return DataError::Conflict(message);
        }

        error!("Data API returned {}: {}", status, message);
        DataError::Api { status, code, message }
    }
}

#[async_trait]
impl DataStore for PostgrestClient {
    async fn select(&self, table: &str, filter: &FilterData) -> Result<Vec<Record>, DataError> {
        let url = self.table_url(table, filter)?;
        debug!("GET {}", url);
        let response = self.request(Method::GET, url).send().await?;
        Self::read_rows(response).await
    }

    async fn insert(&self, table: &str, record: Record) -> Result<Record, DataError> {
        let url = self.table_url(table, &FilterData::default())?;
        debug!("POST {}", url);
        let response = self
            .request(Method::POST, url)
            .header("Prefer", "return=representation")
            .json(&record)
            .send()
            .await?;

        Self::read_rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DataError::Decode(format!("insert into {} returned no row", table)))
    }

    async fn update(&self, table: &str, filter: &FilterData, patch: Record) -> Result<Vec<Record>, DataError> {
        let url = self.table_url(table, &filter.selector())?;
        debug!("PATCH {}", url);
        let response = self
            .request(Method::PATCH, url)
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?;
        Self::read_rows(response).await
    }

    async fn delete(&self, table: &str, filter: &FilterData) -> Result<Vec<Record>, DataError> {
        let url = self.table_url(table, &filter.selector())?;
        debug!("DELETE {}", url);
        let response = self
            .request(Method::DELETE, url)
            .header("Prefer", "return=representation")
            .send()
            .await?;
        Self::read_rows(response).await
    }

    async fn ping(&self) -> Result<(), DataError> {
        let response = self.request(Method::GET, self.base.clone()).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from(response.status().as_u16(), response).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_url_keeps_base_path_and_encodes_filters() {
        let client = PostgrestClient::new("http://localhost:3001/rest/v1", None, Duration::from_secs(5)).unwrap();
        let filter = FilterData::new()
            .eq("merchant_id", 3)
            .order("created_at desc")
            .unwrap()
            .limit(10);

        let url = client.table_url("customers", &filter).unwrap();
        assert_eq!(url.path(), "/rest/v1/customers");
        let query = url.query().unwrap();
        assert!(query.contains("merchant_id=eq.3"));
        assert!(query.contains("order=created_at.desc"));
        assert!(query.contains("limit=10"));
    }

    #[test]
    fn rejects_invalid_table_names() {
        let client = PostgrestClient::new("http://localhost:3001", None, Duration::from_secs(5)).unwrap();
        assert!(matches!(
            client.table_url("../admin", &FilterData::default()),
            Err(DataError::Query(_))
        ));
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(matches!(
            PostgrestClient::new("not a url", None, Duration::from_secs(5)),
            Err(DataError::InvalidUrl(_))
        ));
    }
}
