use crate::catalog::Catalog;
use crate::chat::ChatService;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::provider::{CompletionProvider, OpenAiProvider};
use crate::tools::{rate_source_from_config, CurrencyConverter, ProductSearch, RateSource, ToolRegistry};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Application state shared across all request handlers.
pub struct AppState {
    pub chat: Arc<ChatService>,
    pub catalog: Arc<Catalog>,
    /// Flag indicating the service is ready (dependencies wired, catalog warmed)
    pub ready: AtomicBool,
    pub config: Arc<Config>,
}

impl AppState {
    /// Initialize application state with the providers selected by `config`.
    pub async fn new(config: Config) -> Result<Self> {
        let provider: Arc<dyn CompletionProvider> = Arc::new(OpenAiProvider::new(&config.completion)?);
        let rates = rate_source_from_config(&config.rates)
            .map_err(|e| AppError::InternalError(e.to_string()))?;

        Self::with_dependencies(config, provider, rates).await
    }

    /// Initialize application state around an explicit provider and rate source.
    pub async fn with_dependencies(
        config: Config,
        provider: Arc<dyn CompletionProvider>,
        rates: Arc<dyn RateSource>,
    ) -> Result<Self> {
        let catalog = Arc::new(Catalog::new(&config.catalog_path, config.catalog_cache));

        let registry = ToolRegistry::new(
            ProductSearch::new(Arc::clone(&catalog)),
            CurrencyConverter::new(rates),
        )?;

        let state = Self {
            chat: Arc::new(ChatService::new(provider, Arc::new(registry))),
            catalog,
            ready: AtomicBool::new(false),
            config: Arc::new(config),
        };

        state.warmup().await;

        state.ready.store(true, Ordering::SeqCst);

        Ok(state)
    }

    /// Pre-load the catalog so the first search does not pay for parsing.
    ///
    /// A failure here is not fatal: searches retry the load and report
    /// failures to the model.
    async fn warmup(&self) {
        if !self.config.catalog_cache {
            return;
        }

        tracing::info!(path = %self.catalog.path().display(), "Warming catalog cache...");

        match self.catalog.products().await {
            Ok(products) => {
                tracing::info!(products = products.len(), "Catalog warmup completed successfully");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Catalog warmup failed, will retry on first search");
            }
        }
    }

    /// Check if the service is ready to handle requests.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}
