//! Type definitions for the catalog module.

use serde::{Deserialize, Serialize};

/// A catalog entry.
///
/// Field names mirror the catalog's CSV headers and are serialized the same
/// way when products are handed back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Human-readable product title
    pub display_title: String,

    /// Free-text description used for matching
    pub embedding_text: String,

    pub url: String,

    pub image_url: String,

    /// Numeric type code. `None` when the cell is empty or not a number.
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub product_type: Option<i64>,

    /// `None` when the cell is empty or not a number.
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub discount: Option<f64>,

    /// Price as displayed, currency symbol included (e.g. "$799.00 USD")
    pub price: String,

    /// Variant descriptor, kept verbatim
    pub variants: String,

    pub create_date: String,
}
