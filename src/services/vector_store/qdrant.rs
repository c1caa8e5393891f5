//! Qdrant vector store backend implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, UpsertPointsBuilder, Value,
    VectorParamsBuilder,
};
use uuid::Uuid;

use super::{IndexInfo, VectorStore};
use crate::error::VectorStoreError;
use crate::models::{MetadataValue, Metric, UpsertUnit, VectorStoreConfig};

/// Payload key holding the original record id.
pub const ID_PAYLOAD_KEY: &str = "cve_id";

/// Qdrant vector store backend.
pub struct QdrantBackend {
    client: Qdrant,
    collection: String,
    dimension: u64,
    metric: Metric,
}

impl QdrantBackend {
    pub fn new(config: &VectorStoreConfig, dimension: u64) -> Result<Self, VectorStoreError> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder
            .build()
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            collection: config.index.clone(),
            dimension,
            metric: config.metric,
        })
    }

    /// Qdrant only accepts UUID or integer ids, so string ids map to UUIDv5.
    pub fn point_id(id: &str) -> String {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes()).to_string()
    }

    fn distance(&self) -> Distance {
        match self.metric {
            Metric::Cosine => Distance::Cosine,
            Metric::Euclidean => Distance::Euclid,
            Metric::DotProduct => Distance::Dot,
        }
    }
}

fn to_payload(unit: &UpsertUnit) -> HashMap<String, Value> {
    let mut payload: HashMap<String, Value> = HashMap::new();
    for (key, value) in &unit.metadata {
        let value: Value = match value {
            MetadataValue::String(s) => s.clone().into(),
            MetadataValue::Number(n) => match n.as_i64() {
                Some(i) => i.into(),
                None => n.as_f64().unwrap_or_default().into(),
            },
            MetadataValue::Bool(b) => (*b).into(),
            MetadataValue::StringList(list) => list
                .iter()
                .map(|s| Value::from(s.clone()))
                .collect::<Vec<Value>>()
                .into(),
        };
        payload.insert(key.clone(), value);
    }
    payload.insert(ID_PAYLOAD_KEY.to_string(), unit.id.clone().into());
    payload
}

#[async_trait]
impl VectorStore for QdrantBackend {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        self.client
            .health_check()
            .await
            .map(|_| true)
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))
    }

    async fn describe(&self) -> Result<Option<IndexInfo>, VectorStoreError> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| VectorStoreError::IndexError(e.to_string()))?;
        if !exists {
            return Ok(None);
        }

        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(|e| VectorStoreError::IndexError(e.to_string()))?;

        Ok(Some(IndexInfo {
            vector_count: info.result.map_or(0, |r| r.points_count.unwrap_or(0)),
            dimension: Some(self.dimension),
            ready: true,
        }))
    }

    async fn create_index(&self) -> Result<bool, VectorStoreError> {
        if self.describe().await?.is_some() {
            return Ok(false);
        }

        let create_collection = CreateCollectionBuilder::new(&self.collection)
            .vectors_config(VectorParamsBuilder::new(self.dimension, self.distance()));

        self.client
            .create_collection(create_collection)
            .await
            .map_err(|e| VectorStoreError::IndexError(e.to_string()))?;

        Ok(true)
    }

    async fn delete_index(&self) -> Result<bool, VectorStoreError> {
        if self.describe().await?.is_none() {
            return Ok(false);
        }

        self.client
            .delete_collection(&self.collection)
            .await
            .map_err(|e| VectorStoreError::DeleteError(e.to_string()))?;

        Ok(true)
    }

    async fn upsert(&self, units: Vec<UpsertUnit>) -> Result<(), VectorStoreError> {
        if units.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = units
            .into_iter()
            .map(|unit| {
                let payload = to_payload(&unit);
                PointStruct::new(Self::point_id(&unit.id), unit.values, payload)
            })
            .collect();

        let upsert = UpsertPointsBuilder::new(&self.collection, points).wait(true);

        self.client
            .upsert_points(upsert)
            .await
            .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;

        Ok(())
    }

    fn index_name(&self) -> &str {
        &self.collection
    }
}
