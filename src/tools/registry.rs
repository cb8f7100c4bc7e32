//! Tool registry: what the model may call, and how each call is executed.
//!
//! Every tool is a [`ToolKind`] variant carrying its advertised schema. A call
//! is resolved by name, its raw argument text is validated against that
//! schema, deserialized into the variant's typed arguments and executed.
//! Nothing here returns an error to the chat loop: [`ToolRegistry::dispatch`]
//! always yields a payload, failures included.

use crate::error::{AppError, Result};
use crate::provider::{ToolCall, ToolDefinition};
use crate::tools::currency::{ConversionRequest, CurrencyConverter};
use crate::tools::products::{ProductSearch, SearchRequest};
use jsonschema::{Draft, JSONSchema};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    SearchProducts,
    ConvertCurrencies,
}

impl ToolKind {
    pub const ALL: [ToolKind; 2] = [ToolKind::SearchProducts, ToolKind::ConvertCurrencies];

    /// Name advertised to the model.
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::SearchProducts => "searchProducts",
            ToolKind::ConvertCurrencies => "convertCurrencies",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "searchProducts" => Some(ToolKind::SearchProducts),
            "convertCurrencies" => Some(ToolKind::ConvertCurrencies),
            _ => None,
        }
    }

    fn description(&self) -> &'static str {
        match self {
            ToolKind::SearchProducts => "Search for 2 relevant products",
            ToolKind::ConvertCurrencies => "Convert currency from one to another",
        }
    }

    /// JSON Schema of the arguments. Unknown properties are rejected.
    fn parameters(&self) -> Value {
        match self {
            ToolKind::SearchProducts => json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" }
                },
                "required": ["query"],
                "additionalProperties": false
            }),
            ToolKind::ConvertCurrencies => json!({
                "type": "object",
                "properties": {
                    "amount": { "type": "number" },
                    "from": { "type": "string" },
                    "to": { "type": "string" }
                },
                "required": ["amount", "from", "to"],
                "additionalProperties": false
            }),
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Validated arguments, one variant per tool.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolArguments {
    SearchProducts(SearchRequest),
    ConvertCurrencies(ConversionRequest),
}

/// Why a tool call produced no result. The message becomes the tool payload.
#[derive(Error, Debug, PartialEq)]
pub enum ToolError {
    #[error("Function {0} not implemented.")]
    Unavailable(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: &'static str, reason: String },

    #[error("{tool} failed: {reason}")]
    Execution { tool: &'static str, reason: String },
}

impl ToolError {
    fn invalid(kind: ToolKind, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: kind.name(),
            reason: reason.into(),
        }
    }

    fn execution(kind: ToolKind, reason: impl ToString) -> Self {
        Self::Execution {
            tool: kind.name(),
            reason: reason.to_string(),
        }
    }
}

pub struct ToolRegistry {
    definitions: Vec<ToolDefinition>,
    schemas: HashMap<ToolKind, JSONSchema>,
    products: ProductSearch,
    currency: CurrencyConverter,
}

impl ToolRegistry {
    pub fn new(products: ProductSearch, currency: CurrencyConverter) -> Result<Self> {
        let mut definitions = Vec::with_capacity(ToolKind::ALL.len());
        let mut schemas = HashMap::with_capacity(ToolKind::ALL.len());

        for kind in ToolKind::ALL {
            let definition = kind.definition();
            let schema = JSONSchema::options()
                .with_draft(Draft::Draft7)
                .compile(&definition.parameters)
                .map_err(|e| {
                    AppError::InternalError(format!(
                        "Failed to compile schema for {}: {}",
                        kind.name(),
                        e
                    ))
                })?;

            schemas.insert(kind, schema);
            definitions.push(definition);
        }

        tracing::debug!(tools = definitions.len(), "Tool registry initialized");

        Ok(Self {
            definitions,
            schemas,
            products,
            currency,
        })
    }

    /// Every tool advertised to the model, in a stable order.
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Execute `call` and return the serialized tool result payload.
    ///
    /// Unknown tools, invalid arguments and execution failures are reported
    /// in the payload as a JSON string instead of failing the query.
    pub async fn dispatch(&self, call: &ToolCall) -> String {
        let tool = ToolKind::from_name(&call.name).map_or("unknown", |kind| kind.name());

        match self.execute(call).await {
            Ok(payload) => {
                metrics::counter!("tool_calls_total", "tool" => tool, "outcome" => "ok").increment(1);
                payload.to_string()
            }
            Err(err) => {
                tracing::warn!(
                    tool = %call.name,
                    call_id = %call.id,
                    error = %err,
                    "Tool call failed"
                );
                metrics::counter!("tool_calls_total", "tool" => tool, "outcome" => "error").increment(1);
                Value::String(err.to_string()).to_string()
            }
        }
    }

    /// Resolve, validate and run `call`.
    pub async fn execute(&self, call: &ToolCall) -> std::result::Result<Value, ToolError> {
        let kind = ToolKind::from_name(&call.name)
            .ok_or_else(|| ToolError::Unavailable(call.name.clone()))?;

        match self.parse_arguments(kind, &call.arguments)? {
            ToolArguments::SearchProducts(request) => {
                let response = self
                    .products
                    .search(&request)
                    .await
                    .map_err(|e| ToolError::execution(kind, e))?;
                to_payload(kind, &response)
            }
            ToolArguments::ConvertCurrencies(request) => {
                let result = self
                    .currency
                    .convert(&request)
                    .await
                    .map_err(|e| ToolError::execution(kind, e))?;
                to_payload(kind, &result)
            }
        }
    }

    /// Parse the raw argument text of a `kind` call.
    pub fn parse_arguments(
        &self,
        kind: ToolKind,
        raw: &str,
    ) -> std::result::Result<ToolArguments, ToolError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| ToolError::invalid(kind, format!("malformed JSON ({})", e)))?;

        let schema = self
            .schemas
            .get(&kind)
            .ok_or_else(|| ToolError::Unavailable(kind.name().to_string()))?;

        if let Err(errors) = schema.validate(&value) {
            let messages: Vec<String> = errors.map(|e| e.to_string()).collect();
            return Err(ToolError::invalid(kind, messages.join("; ")));
        }

        let arguments = match kind {
            ToolKind::SearchProducts => {
                serde_json::from_value(value).map(ToolArguments::SearchProducts)
            }
            ToolKind::ConvertCurrencies => {
                serde_json::from_value(value).map(ToolArguments::ConvertCurrencies)
            }
        };

        arguments.map_err(|e| ToolError::invalid(kind, e.to_string()))
    }
}

fn to_payload<T: Serialize>(kind: ToolKind, value: &T) -> std::result::Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::execution(kind, e))
}
