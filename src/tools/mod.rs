//! Local capabilities the model may invoke.
//!
//! - `searchProducts`: substring relevance ranking over the product catalog
//! - `convertCurrencies`: currency conversion over a pluggable rate source

pub mod currency;
pub mod products;
pub mod registry;

pub use currency::{
    rate_source_from_config, ConversionRequest, ConversionResult, CurrencyConverter, FixedRates,
    LiveRates, RateError, RateSource, RateTable,
};
pub use products::{rank, ProductSearch, SearchRequest, SearchResponse, MAX_RESULTS};
pub use registry::{ToolArguments, ToolError, ToolKind, ToolRegistry};
