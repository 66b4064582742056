//! Canonical constraint model
//!
//! A [`Schema`] is the provider-agnostic description of a value: a JSON-Schema-like tree of
//! object/array/string/number/boolean nodes with their constraints. Backend adapters
//! (see [`adapter`]) turn it into the subset each LLM backend accepts, and the constraints they
//! cannot keep are rendered back into prompt text by [`instructions`].
//!
//! ## Example
//!
//! ```rust
//! use agentrail::schema::Schema;
//!
//! let person = Schema::object()
//!     .with_property("name", Schema::string().with_min_length(1), true)
//!     .with_property("age", Schema::integer().with_minimum(0.0), true);
//!
//! assert_eq!(person.required.len(), 2);
//! ```

pub mod adapter;
pub mod anthropic;
pub mod gemini;
pub mod instructions;
pub mod json;
pub mod openai;
pub mod structure;
pub mod validation;

pub use adapter::{Backend, ConstraintType, RemovedConstraint, SchemaAdaptationResult, SchemaAdapter};
pub use instructions::to_instruction_text;
pub use structure::{DynamicStructure, NamedField};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The JSON type of a schema node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    #[default]
    Object,
    Array,
    String,
    Integer,
    Number,
    Boolean,
}

impl SchemaKind {
    /// JSON-Schema `type` keyword value
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaKind::Object => "object",
            SchemaKind::Array => "array",
            SchemaKind::String => "string",
            SchemaKind::Integer => "integer",
            SchemaKind::Number => "number",
            SchemaKind::Boolean => "boolean",
        }
    }

    /// Parse a JSON-Schema `type` keyword value
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "object" => Some(SchemaKind::Object),
            "array" => Some(SchemaKind::Array),
            "string" => Some(SchemaKind::String),
            "integer" => Some(SchemaKind::Integer),
            "number" => Some(SchemaKind::Number),
            "boolean" => Some(SchemaKind::Boolean),
            _ => None,
        }
    }
}

impl std::fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node of the canonical constraint tree.
///
/// Constraints that do not apply to the node's kind are simply left as `None`. Adapters never
/// mutate a schema in place; they clone and return a new tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    pub kind: SchemaKind,
    pub description: Option<String>,
    /// Whether `null` is accepted in addition to `kind`
    pub nullable: bool,

    // object
    pub properties: BTreeMap<String, Schema>,
    pub required: BTreeSet<String>,
    pub additional_properties: Option<bool>,

    // array
    pub items: Option<Box<Schema>>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,

    // string
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    pub format: Option<String>,
    pub enum_values: Option<Vec<String>>,

    // integer / number
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: Option<f64>,
    pub exclusive_maximum: Option<f64>,
}

impl Schema {
    /// Create an empty node of the given kind
    pub fn of_kind(kind: SchemaKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    pub fn object() -> Self {
        Self::of_kind(SchemaKind::Object)
    }

    pub fn array(items: Schema) -> Self {
        Self {
            kind: SchemaKind::Array,
            items: Some(Box::new(items)),
            ..Default::default()
        }
    }

    pub fn string() -> Self {
        Self::of_kind(SchemaKind::String)
    }

    pub fn integer() -> Self {
        Self::of_kind(SchemaKind::Integer)
    }

    pub fn number() -> Self {
        Self::of_kind(SchemaKind::Number)
    }

    pub fn boolean() -> Self {
        Self::of_kind(SchemaKind::Boolean)
    }

    /// A string restricted to the given values
    pub fn string_enum<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::string().with_enum(values)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Add a property to an object node
    pub fn with_property(mut self, name: impl Into<String>, schema: Schema, required: bool) -> Self {
        let name = name.into();
        if required {
            self.required.insert(name.clone());
        } else {
            self.required.remove(&name);
        }
        self.properties.insert(name, schema);
        self
    }

    pub fn with_additional_properties(mut self, allowed: bool) -> Self {
        self.additional_properties = Some(allowed);
        self
    }

    pub fn with_min_items(mut self, min: u64) -> Self {
        self.min_items = Some(min);
        self
    }

    pub fn with_max_items(mut self, max: u64) -> Self {
        self.max_items = Some(max);
        self
    }

    pub fn with_min_length(mut self, min: u64) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn with_max_length(mut self, max: u64) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_enum<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_minimum(mut self, min: f64) -> Self {
        self.minimum = Some(min);
        self
    }

    pub fn with_maximum(mut self, max: f64) -> Self {
        self.maximum = Some(max);
        self
    }

    pub fn with_exclusive_minimum(mut self, min: f64) -> Self {
        self.exclusive_minimum = Some(min);
        self
    }

    pub fn with_exclusive_maximum(mut self, max: f64) -> Self {
        self.exclusive_maximum = Some(max);
        self
    }

    /// Whether a property of this object node is required
    pub fn is_required(&self, name: &str) -> bool {
        self.required.contains(name)
    }
}
