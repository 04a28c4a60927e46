//! Keyword spotting models
//!
//! A model is loaded once and shared read-only between sessions through an `Arc`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Immutable keyword spotting model data
#[derive(Debug, PartialEq, Eq)]
pub struct KeywordModel {
    /// File the model was loaded from
    pub path: PathBuf,
    /// Raw model bytes, interpreted by the recognition engine
    data: Vec<u8>,
}

impl KeywordModel {
    pub fn from_bytes(path: impl Into<PathBuf>, data: Vec<u8>) -> Result<Self> {
        let path = path.into();
        if data.is_empty() {
            anyhow::bail!("Keyword model {} is empty", path.display());
        }
        Ok(Self { path, data })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// Keyword model loader
#[async_trait::async_trait]
pub trait KeywordModelLoader: Send + Sync {
    async fn load(&self, path: &Path) -> Result<Arc<KeywordModel>>;
}

/// Loads keyword models from the filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FileKeywordModelLoader;

#[async_trait::async_trait]
impl KeywordModelLoader for FileKeywordModelLoader {
    async fn load(&self, path: &Path) -> Result<Arc<KeywordModel>> {
        info!("Loading keyword model: {}", path.display());

        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read keyword model {}", path.display()))?;

        let model = KeywordModel::from_bytes(path, data)?;
        info!("Keyword model loaded: {} bytes", model.size_bytes());

        Ok(Arc::new(model))
    }
}
