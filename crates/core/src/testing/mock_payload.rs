//! Mock payload fetcher for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::payload::{PayloadError, PayloadFetcher};

/// Mock implementation of the PayloadFetcher trait.
///
/// Serves registered bytes by URL; anything else is a 404.
#[derive(Debug, Default)]
pub struct MockPayloadFetcher {
    payloads: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    requested: Arc<RwLock<Vec<String>>>,
}

impl MockPayloadFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, url: &str, bytes: Vec<u8>) {
        self.payloads.write().await.insert(url.to_string(), bytes);
    }

    /// URLs requested so far, in order.
    pub async fn requested(&self) -> Vec<String> {
        self.requested.read().await.clone()
    }
}

#[async_trait]
impl PayloadFetcher for MockPayloadFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PayloadError> {
        self.requested.write().await.push(url.to_string());
        self.payloads
            .read()
            .await
            .get(url)
            .cloned()
            .ok_or(PayloadError::Status(404))
    }
}
