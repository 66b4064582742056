//! Per-backend schema adaptation
//!
//! Every backend accepts a different subset of JSON-Schema. An adapter walks the canonical tree
//! depth-first and, node by node, strips whatever its backend cannot enforce, recording each
//! stripped constraint with the path of the field it belonged to. Paths accumulate as
//! `parent.child` for properties and `parent[]` for array items, with the root at `""`.
//!
//! Adapting an already adapted schema removes nothing further.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::json::number_value;
use super::{anthropic, gemini, openai, Schema};

/// Supported LLM backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Anthropic Messages API
    #[default]
    Anthropic,
    /// OpenAI strict structured outputs
    #[serde(rename = "openai", alias = "open_ai")]
    OpenAi,
    /// Google Gemini
    #[serde(alias = "google")]
    Gemini,
}

impl Backend {
    /// The schema adapter for this backend
    pub fn schema_adapter(&self) -> &'static dyn SchemaAdapter {
        match self {
            Backend::Anthropic => &anthropic::AnthropicSchemaAdapter,
            Backend::OpenAi => &openai::OpenAiSchemaAdapter,
            Backend::Gemini => &gemini::GeminiSchemaAdapter,
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Anthropic => write!(f, "anthropic"),
            Backend::OpenAi => write!(f, "openai"),
            Backend::Gemini => write!(f, "gemini"),
        }
    }
}

/// A constraint keyword an adapter may strip
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConstraintType {
    MinLength,
    MaxLength,
    Pattern,
    Format,
    Minimum,
    Maximum,
    ExclusiveMinimum,
    ExclusiveMaximum,
    MinItems,
    MaxItems,
    AdditionalProperties,
}

impl ConstraintType {
    /// The JSON-Schema keyword for this constraint
    pub fn keyword(&self) -> &'static str {
        match self {
            ConstraintType::MinLength => "minLength",
            ConstraintType::MaxLength => "maxLength",
            ConstraintType::Pattern => "pattern",
            ConstraintType::Format => "format",
            ConstraintType::Minimum => "minimum",
            ConstraintType::Maximum => "maximum",
            ConstraintType::ExclusiveMinimum => "exclusiveMinimum",
            ConstraintType::ExclusiveMaximum => "exclusiveMaximum",
            ConstraintType::MinItems => "minItems",
            ConstraintType::MaxItems => "maxItems",
            ConstraintType::AdditionalProperties => "additionalProperties",
        }
    }
}

impl std::fmt::Display for ConstraintType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A constraint stripped by an adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovedConstraint {
    pub constraint_type: ConstraintType,
    /// Dotted path of the field the constraint applied to (`""` for the root)
    pub field_path: String,
    /// The stripped keyword value
    pub value: Value,
}

impl RemovedConstraint {
    pub fn new(constraint_type: ConstraintType, field_path: impl Into<String>, value: Value) -> Self {
        Self {
            constraint_type,
            field_path: field_path.into(),
            value,
        }
    }
}

/// Output of an adaptation pass
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaAdaptationResult {
    pub schema: Schema,
    pub removed_constraints: Vec<RemovedConstraint>,
}

/// Backend-specific schema translation
pub trait SchemaAdapter: Send + Sync {
    /// The backend this adapter targets
    fn backend(&self) -> Backend;

    /// Adapt a single node's own constraints, without descending into children.
    ///
    /// Returns the adapted copy; stripped constraints are pushed onto `removed`.
    fn adapt_node(&self, node: &Schema, field_path: &str, removed: &mut Vec<RemovedConstraint>) -> Schema;

    /// Adapt a whole tree rooted at the empty path
    fn adapt(&self, schema: &Schema) -> SchemaAdaptationResult {
        self.adapt_at(schema, "")
    }

    /// Adapt a whole tree whose root sits at `field_path`
    fn adapt_at(&self, schema: &Schema, field_path: &str) -> SchemaAdaptationResult {
        let mut removed = Vec::new();
        let schema = adapt_tree(self, schema, field_path, &mut removed);
        SchemaAdaptationResult {
            schema,
            removed_constraints: removed,
        }
    }
}

fn adapt_tree<A: SchemaAdapter + ?Sized>(
    adapter: &A,
    schema: &Schema,
    field_path: &str,
    removed: &mut Vec<RemovedConstraint>,
) -> Schema {
    let mut node = adapter.adapt_node(schema, field_path, removed);

    node.properties = node
        .properties
        .iter()
        .map(|(name, child)| {
            let path = child_path(field_path, name);
            (name.clone(), adapt_tree(adapter, child, &path, removed))
        })
        .collect();

    if let Some(items) = node.items.take() {
        let path = items_path(field_path);
        node.items = Some(Box::new(adapt_tree(adapter, &items, &path, removed)));
    }

    node
}

/// Path of a named property under `parent`
pub fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

/// Path of the items of the array at `parent`
pub fn items_path(parent: &str) -> String {
    format!("{}[]", parent)
}

// Helpers shared by the concrete adapters. Each takes the constraint out of `slot` and records it.

pub(crate) fn strip_u64(
    slot: &mut Option<u64>,
    constraint_type: ConstraintType,
    field_path: &str,
    removed: &mut Vec<RemovedConstraint>,
) {
    if let Some(value) = slot.take() {
        removed.push(RemovedConstraint::new(constraint_type, field_path, Value::from(value)));
    }
}

pub(crate) fn strip_f64(
    slot: &mut Option<f64>,
    constraint_type: ConstraintType,
    field_path: &str,
    removed: &mut Vec<RemovedConstraint>,
) {
    if let Some(value) = slot.take() {
        removed.push(RemovedConstraint::new(constraint_type, field_path, number_value(value)));
    }
}

pub(crate) fn strip_string(
    slot: &mut Option<String>,
    constraint_type: ConstraintType,
    field_path: &str,
    removed: &mut Vec<RemovedConstraint>,
) {
    if let Some(value) = slot.take() {
        removed.push(RemovedConstraint::new(constraint_type, field_path, Value::from(value)));
    }
}

pub(crate) fn strip_bool(
    slot: &mut Option<bool>,
    constraint_type: ConstraintType,
    field_path: &str,
    removed: &mut Vec<RemovedConstraint>,
) {
    if let Some(value) = slot.take() {
        removed.push(RemovedConstraint::new(constraint_type, field_path, Value::from(value)));
    }
}

pub(crate) fn strip_numeric_bounds(node: &mut Schema, field_path: &str, removed: &mut Vec<RemovedConstraint>) {
    strip_f64(&mut node.minimum, ConstraintType::Minimum, field_path, removed);
    strip_f64(&mut node.maximum, ConstraintType::Maximum, field_path, removed);
    strip_f64(&mut node.exclusive_minimum, ConstraintType::ExclusiveMinimum, field_path, removed);
    strip_f64(&mut node.exclusive_maximum, ConstraintType::ExclusiveMaximum, field_path, removed);
}

pub(crate) fn strip_length_bounds(node: &mut Schema, field_path: &str, removed: &mut Vec<RemovedConstraint>) {
    strip_u64(&mut node.min_length, ConstraintType::MinLength, field_path, removed);
    strip_u64(&mut node.max_length, ConstraintType::MaxLength, field_path, removed);
}
