//! Schema adapter for the Anthropic backend.
//!
//! Keeps `pattern`, `enum`, `format` and `additionalProperties`. Drops every numeric bound, every
//! string length bound, `maxItems`, and `minItems` unless it is 0 or 1.

use super::adapter::{
    strip_length_bounds, strip_numeric_bounds, strip_u64, Backend, ConstraintType, RemovedConstraint,
    SchemaAdapter,
};
use super::Schema;

/// Backend A
#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicSchemaAdapter;

impl SchemaAdapter for AnthropicSchemaAdapter {
    fn backend(&self) -> Backend {
        Backend::Anthropic
    }

    fn adapt_node(&self, node: &Schema, field_path: &str, removed: &mut Vec<RemovedConstraint>) -> Schema {
        let mut adapted = node.clone();

        if matches!(adapted.min_items, Some(min) if min > 1) {
            strip_u64(&mut adapted.min_items, ConstraintType::MinItems, field_path, removed);
        }
        strip_u64(&mut adapted.max_items, ConstraintType::MaxItems, field_path, removed);
        strip_numeric_bounds(&mut adapted, field_path, removed);
        strip_length_bounds(&mut adapted, field_path, removed);

        adapted
    }
}
