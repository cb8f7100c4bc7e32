//! Substring relevance ranking over the product catalog.

use crate::catalog::{Catalog, CatalogError, Product};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Number of products handed back to the model.
pub const MAX_RESULTS: usize = 2;

/// Arguments of the `searchProducts` tool.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    /// Best matches, at most [`MAX_RESULTS`]
    pub products: Vec<Product>,
    /// Number of records that matched at all
    pub total: usize,
}

/// One point for a title match, one for a description match.
fn score(product: &Product, needle: &str) -> u8 {
    u8::from(product.display_title.to_lowercase().contains(needle))
        + u8::from(product.embedding_text.to_lowercase().contains(needle))
}

/// Rank `catalog` against `query`.
///
/// Records scoring zero are dropped. The rest are ordered by score, highest
/// first; equal scores keep catalog order.
pub fn rank(query: &str, catalog: &[Product]) -> SearchResponse {
    let needle = query.to_lowercase();

    let mut scored: Vec<(u8, &Product)> = catalog
        .iter()
        .filter_map(|product| {
            let score = score(product, &needle);
            (score > 0).then_some((score, product))
        })
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    SearchResponse {
        total: scored.len(),
        products: scored
            .into_iter()
            .take(MAX_RESULTS)
            .map(|(_, product)| product.clone())
            .collect(),
    }
}

/// The `searchProducts` tool: loads the catalog, then ranks it.
pub struct ProductSearch {
    catalog: Arc<Catalog>,
}

impl ProductSearch {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, CatalogError> {
        let products = self.catalog.products().await?;
        let response = rank(&request.query, &products);

        tracing::debug!(
            query = %request.query,
            catalog_size = products.len(),
            total = response.total,
            "Product search completed"
        );

        Ok(response)
    }
}
