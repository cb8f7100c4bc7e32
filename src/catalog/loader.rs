//! CSV catalog loading with an optional read-through cache.

use crate::catalog::types::Product;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to open catalog {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("All {0} catalog rows failed to parse")]
    NoValidRows(usize),

    #[error("Catalog load task failed: {0}")]
    Task(String),
}

/// Read every record of the catalog at `path`.
///
/// Cells that should be numeric but are not become `None`. Short rows keep
/// the columns they have; the missing trailing cells read as empty. Rows that
/// cannot be decoded at all are logged and skipped; only a file where every
/// row is broken is an error.
pub fn load_catalog(path: &Path) -> Result<Vec<Product>, CatalogError> {
    let open_error = |source: csv::Error| CatalogError::Open {
        path: path.display().to_string(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_path(path)
        .map_err(open_error)?;
    let headers = reader.headers().map_err(open_error)?.clone();

    let mut products = Vec::new();
    let mut rows = 0usize;

    for (idx, record) in reader.records().enumerate() {
        rows += 1;
        let parsed = record.and_then(|mut record| {
            while record.len() < headers.len() {
                record.push_field("");
            }
            record.deserialize::<Product>(Some(&headers))
        });

        match parsed {
            Ok(product) => products.push(product),
            Err(e) => {
                tracing::warn!(
                    row = idx + 1,
                    error = %e,
                    "Skipping malformed catalog row"
                );
            }
        }
    }

    if products.is_empty() && rows > 0 {
        return Err(CatalogError::NoValidRows(rows));
    }

    tracing::debug!(
        path = %path.display(),
        rows,
        parsed = products.len(),
        "Catalog parsed"
    );

    Ok(products)
}

/// Handle to the product catalog.
///
/// With caching enabled the first successful load is kept for the lifetime of
/// the process. Failed loads are never cached, so the next search retries.
pub struct Catalog {
    path: PathBuf,
    cache: Option<OnceCell<Arc<[Product]>>>,
}

impl Catalog {
    pub fn new(path: impl Into<PathBuf>, cache_enabled: bool) -> Self {
        Self {
            path: path.into(),
            cache: cache_enabled.then(OnceCell::new),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a parsed catalog is currently held in memory.
    pub fn is_cached(&self) -> bool {
        self.cache
            .as_ref()
            .is_some_and(|cell| cell.initialized())
    }

    /// All catalog records, in file order.
    pub async fn products(&self) -> Result<Arc<[Product]>, CatalogError> {
        match &self.cache {
            Some(cell) => cell.get_or_try_init(|| self.read()).await.map(Arc::clone),
            None => self.read().await,
        }
    }

    async fn read(&self) -> Result<Arc<[Product]>, CatalogError> {
        let start = std::time::Instant::now();
        let path = self.path.clone();

        // csv parsing is blocking file I/O
        let products = tokio::task::spawn_blocking(move || load_catalog(&path))
            .await
            .map_err(|e| CatalogError::Task(e.to_string()))??;

        tracing::info!(
            path = %self.path.display(),
            products = products.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Catalog loaded"
        );

        Ok(products.into())
    }
}
