// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::config::loader::EngineConfig;
use crate::errors::ConfigError;

/// Storage seam for configuration revisions.
///
/// The engine never touches storage itself; it asks a provider for the latest revision on
/// startup and hands every accepted replacement back to it.
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Highest stored revision, or `None` when nothing has been saved yet.
    async fn latest_revision(&self) -> Result<Option<u64>, ConfigError>;

    async fn load(&self, revision: u64) -> Result<EngineConfig, ConfigError>;

    async fn save(&self, config: &EngineConfig) -> Result<(), ConfigError>;
}

/// Keeps every saved revision in memory.
#[derive(Debug, Default)]
pub struct InMemoryConfigProvider {
    revisions: RwLock<BTreeMap<u64, EngineConfig>>,
}

impl InMemoryConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider pre-seeded with `configs`.
    pub fn with_configs(configs: impl IntoIterator<Item = EngineConfig>) -> Self {
        Self {
            revisions: RwLock::new(
                configs
                    .into_iter()
                    .map(|config| (config.revision, config))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl ConfigProvider for InMemoryConfigProvider {
    async fn latest_revision(&self) -> Result<Option<u64>, ConfigError> {
        Ok(self.revisions.read().await.keys().next_back().copied())
    }

    async fn load(&self, revision: u64) -> Result<EngineConfig, ConfigError> {
        self.revisions
            .read()
            .await
            .get(&revision)
            .cloned()
            .ok_or_else(|| ConfigError::Provider(format!("revision {} not found", revision)))
    }

    async fn save(&self, config: &EngineConfig) -> Result<(), ConfigError> {
        self.revisions
            .write()
            .await
            .insert(config.revision, config.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_latest_revision_tracks_saves() {
        let provider = InMemoryConfigProvider::new();
        assert_eq!(provider.latest_revision().await.unwrap(), None);

        provider.save(&EngineConfig::empty(3)).await.unwrap();
        provider.save(&EngineConfig::empty(1)).await.unwrap();

        assert_eq!(provider.latest_revision().await.unwrap(), Some(3));
        assert_eq!(provider.load(1).await.unwrap().revision, 1);
    }

    #[tokio::test]
    async fn test_missing_revision_is_an_error() {
        let provider = InMemoryConfigProvider::with_configs([EngineConfig::empty(2)]);
        assert!(matches!(provider.load(5).await, Err(ConfigError::Provider(_))));
    }
}
