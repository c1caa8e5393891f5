//! Pinecone vector store backend (REST control and data planes).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::debug;

use super::{IndexInfo, VectorStore};
use crate::error::VectorStoreError;
use crate::models::{Metric, UpsertUnit, VectorStoreConfig};

const API_VERSION: &str = "2025-01";

#[derive(Debug, Deserialize)]
struct IndexModel {
    #[serde(default)]
    dimension: Option<u64>,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    status: IndexStatus,
}

#[derive(Debug, Default, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Debug, Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: u64,
    metric: String,
    spec: IndexSpec<'a>,
}

#[derive(Debug, Serialize)]
struct IndexSpec<'a> {
    serverless: ServerlessSpec<'a>,
}

#[derive(Debug, Serialize)]
struct ServerlessSpec<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [UpsertUnit],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexStats {
    #[serde(default)]
    total_vector_count: u64,
    #[serde(default)]
    dimension: Option<u64>,
    #[serde(default)]
    namespaces: HashMap<String, NamespaceSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceSummary {
    #[serde(default)]
    vector_count: u64,
}

/// Pinecone backend. The data-plane host comes from configuration or is
/// resolved once from the control plane.
pub struct PineconeBackend {
    client: Client,
    control_url: String,
    index: String,
    dimension: u64,
    metric: Metric,
    cloud: String,
    region: String,
    namespace: Option<String>,
    host: OnceCell<String>,
    ready_timeout: Duration,
    poll_interval: Duration,
}

impl PineconeBackend {
    pub fn new(
        config: &VectorStoreConfig,
        api_key: &str,
        dimension: u64,
    ) -> Result<Self, VectorStoreError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Api-Key",
            HeaderValue::from_str(api_key.trim())
                .map_err(|e| VectorStoreError::ConnectionError(format!("invalid API key: {e}")))?,
        );
        headers.insert(
            "X-Pinecone-API-Version",
            HeaderValue::from_static(API_VERSION),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            control_url: config.url.trim_end_matches('/').to_string(),
            index: config.index.clone(),
            dimension,
            metric: config.metric,
            cloud: config.cloud.clone(),
            region: config.region.clone(),
            namespace: config.namespace.clone(),
            host: OnceCell::new_with(config.host.as_deref().map(normalize_host)),
            ready_timeout: Duration::from_secs(config.ready_timeout_secs),
            poll_interval: Duration::from_secs(1),
        })
    }

    /// Override the readiness polling interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn index_url(&self) -> String {
        format!("{}/indexes/{}", self.control_url, self.index)
    }

    async fn describe_model(&self) -> Result<Option<IndexModel>, VectorStoreError> {
        let response = self.client.get(self.index_url()).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response, VectorStoreError::IndexError).await?;
        let model = response
            .json()
            .await
            .map_err(|e| VectorStoreError::IndexError(e.to_string()))?;
        Ok(Some(model))
    }

    async fn data_host(&self) -> Result<&str, VectorStoreError> {
        self.host
            .get_or_try_init(|| async {
                let model = self
                    .describe_model()
                    .await?
                    .ok_or_else(|| VectorStoreError::IndexNotFound(self.index.clone()))?;
                let host = model.host.ok_or_else(|| {
                    VectorStoreError::IndexError(format!("index '{}' has no host", self.index))
                })?;
                debug!(index = %self.index, host = %host, "resolved Pinecone index host");
                Ok::<_, VectorStoreError>(normalize_host(&host))
            })
            .await
            .map(String::as_str)
    }

    async fn index_stats(&self) -> Result<IndexStats, VectorStoreError> {
        let url = format!("{}/describe_index_stats", self.data_host().await?);
        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let response = check_status(response, VectorStoreError::IndexError).await?;
        response
            .json()
            .await
            .map_err(|e| VectorStoreError::IndexError(e.to_string()))
    }

    async fn wait_until_ready(&self) -> Result<(), VectorStoreError> {
        let started = Instant::now();
        loop {
            if let Some(model) = self.describe_model().await?
                && model.status.ready
            {
                return Ok(());
            }
            if started.elapsed() >= self.ready_timeout {
                return Err(VectorStoreError::NotReady {
                    name: self.index.clone(),
                    secs: self.ready_timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

async fn check_status(
    response: Response,
    to_error: fn(String) -> VectorStoreError,
) -> Result<Response, VectorStoreError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(to_error(format!("status {}: {}", status, body)))
}

#[async_trait]
impl VectorStore for PineconeBackend {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        let response = self
            .client
            .get(format!("{}/indexes", self.control_url))
            .send()
            .await
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;
        Ok(response.status().is_success())
    }

    async fn describe(&self) -> Result<Option<IndexInfo>, VectorStoreError> {
        let Some(model) = self.describe_model().await? else {
            return Ok(None);
        };

        if !model.status.ready {
            return Ok(Some(IndexInfo {
                vector_count: 0,
                dimension: model.dimension,
                ready: false,
            }));
        }

        let stats = self.index_stats().await?;
        let vector_count = match self.namespace {
            Some(ref ns) => stats.namespaces.get(ns).map_or(0, |s| s.vector_count),
            None => stats.total_vector_count,
        };

        Ok(Some(IndexInfo {
            vector_count,
            dimension: stats.dimension.or(model.dimension),
            ready: true,
        }))
    }

    async fn create_index(&self) -> Result<bool, VectorStoreError> {
        if let Some(model) = self.describe_model().await? {
            if !model.status.ready {
                self.wait_until_ready().await?;
            }
            return Ok(false);
        }

        let request = CreateIndexRequest {
            name: &self.index,
            dimension: self.dimension,
            metric: self.metric.to_string(),
            spec: IndexSpec {
                serverless: ServerlessSpec {
                    cloud: &self.cloud,
                    region: &self.region,
                },
            },
        };

        let response = self
            .client
            .post(format!("{}/indexes", self.control_url))
            .json(&request)
            .send()
            .await?;

        if response.status() == StatusCode::CONFLICT {
            return Ok(false);
        }
        check_status(response, VectorStoreError::IndexError).await?;

        self.wait_until_ready().await?;
        Ok(true)
    }

    async fn delete_index(&self) -> Result<bool, VectorStoreError> {
        let response = self.client.delete(self.index_url()).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check_status(response, VectorStoreError::DeleteError).await?;
        Ok(true)
    }

    async fn upsert(&self, units: Vec<UpsertUnit>) -> Result<(), VectorStoreError> {
        if units.is_empty() {
            return Ok(());
        }

        let url = format!("{}/vectors/upsert", self.data_host().await?);
        let request = UpsertRequest {
            vectors: &units,
            namespace: self.namespace.as_deref(),
        };

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;
        check_status(response, VectorStoreError::UpsertError).await?;

        Ok(())
    }

    fn index_name(&self) -> &str {
        &self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SanitizedMetadata;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer, host: Option<String>) -> PineconeBackend {
        let config = VectorStoreConfig {
            url: server.uri(),
            host,
            ready_timeout_secs: 2,
            ..Default::default()
        };
        PineconeBackend::new(&config, "pc-test", 3)
            .unwrap()
            .with_poll_interval(Duration::from_millis(10))
    }

    fn unit(id: &str) -> UpsertUnit {
        let mut metadata = SanitizedMetadata::new();
        metadata.insert("severity".to_string(), "LOW".into());
        UpsertUnit {
            id: id.to_string(),
            values: vec![0.5, 0.5, 0.0],
            metadata,
        }
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(
            normalize_host("cve-rag-abc.svc.pinecone.io"),
            "https://cve-rag-abc.svc.pinecone.io"
        );
        assert_eq!(normalize_host("http://localhost:5080/"), "http://localhost:5080");
    }

    #[tokio::test]
    async fn test_describe_missing_index() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes/cve-rag"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = backend(&server, None);
        assert_eq!(store.describe().await.unwrap(), None);
        assert!(matches!(
            store.stat_count().await,
            Err(VectorStoreError::IndexNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_existing_index_is_noop() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes/cve-rag"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "cve-rag", "dimension": 3, "host": "h", "status": {"ready": true}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/indexes"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        assert!(!backend(&server, None).create_index().await.unwrap());
    }

    #[tokio::test]
    async fn test_create_index_waits_for_ready() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes/cve-rag"))
            .respond_with(ResponseTemplate::new(404))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/indexes/cve-rag"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "cve-rag", "dimension": 3, "status": {"ready": false}
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/indexes/cve-rag"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "cve-rag", "dimension": 3, "host": "h", "status": {"ready": true}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/indexes"))
            .and(header("Api-Key", "pc-test"))
            .and(body_json(json!({
                "name": "cve-rag",
                "dimension": 3,
                "metric": "cosine",
                "spec": {"serverless": {"cloud": "aws", "region": "us-east-1"}},
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        assert!(backend(&server, None).create_index().await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_index() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/indexes/cve-rag"))
            .respond_with(ResponseTemplate::new(202))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/indexes/cve-rag"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = backend(&server, None);
        assert!(store.delete_index().await.unwrap());
        assert!(!store.delete_index().await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_resolves_host_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes/cve-rag"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "cve-rag", "dimension": 3, "host": server.uri(), "status": {"ready": true}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/vectors/upsert"))
            .and(body_json(json!({
                "vectors": [
                    {"id": "CVE-2021-1", "values": [0.5, 0.5, 0.0], "metadata": {"severity": "LOW"}}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"upsertedCount": 1})))
            .expect(2)
            .mount(&server)
            .await;

        let store = backend(&server, None);
        store.upsert(vec![unit("CVE-2021-1")]).await.unwrap();
        store.upsert(vec![unit("CVE-2021-1")]).await.unwrap();
    }

    #[tokio::test]
    async fn test_upsert_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vectors/upsert"))
            .respond_with(ResponseTemplate::new(400).set_body_string("dimension mismatch"))
            .mount(&server)
            .await;

        let store = backend(&server, Some(server.uri()));
        let err = store.upsert(vec![unit("CVE-2021-1")]).await.unwrap_err();
        assert!(matches!(err, VectorStoreError::UpsertError(msg) if msg.contains("dimension mismatch")));
    }

    #[tokio::test]
    async fn test_stat_count_uses_namespace() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes/cve-rag"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "cve-rag", "dimension": 3, "host": server.uri(), "status": {"ready": true}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/describe_index_stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "namespaces": {"": {"vectorCount": 7}, "cves": {"vectorCount": 5}},
                "dimension": 3,
                "totalVectorCount": 12,
            })))
            .mount(&server)
            .await;

        let store = backend(&server, None);
        assert_eq!(store.stat_count().await.unwrap(), 12);

        let config = VectorStoreConfig {
            url: server.uri(),
            namespace: Some("cves".to_string()),
            ..Default::default()
        };
        let scoped = PineconeBackend::new(&config, "pc-test", 3).unwrap();
        let info = scoped.describe().await.unwrap().unwrap();
        assert_eq!(info.vector_count, 5);
        assert_eq!(info.dimension, Some(3));
        assert!(info.ready);
    }
}
