//! Schema adapter for the OpenAI backend (strict structured outputs).
//!
//! Every object is closed (`additionalProperties: false`) and lists every property as required.
//! Properties that were optional become nullable instead. All numeric, length, item-count,
//! `pattern` and `format` constraints are dropped; `enum` is kept.

use super::adapter::{
    strip_length_bounds, strip_numeric_bounds, strip_string, strip_u64, Backend, ConstraintType,
    RemovedConstraint, SchemaAdapter,
};
use super::{Schema, SchemaKind};
use serde_json::Value;

/// Backend B
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiSchemaAdapter;

impl SchemaAdapter for OpenAiSchemaAdapter {
    fn backend(&self) -> Backend {
        Backend::OpenAi
    }

    fn adapt_node(&self, node: &Schema, field_path: &str, removed: &mut Vec<RemovedConstraint>) -> Schema {
        let mut adapted = node.clone();

        strip_numeric_bounds(&mut adapted, field_path, removed);
        strip_length_bounds(&mut adapted, field_path, removed);
        strip_string(&mut adapted.pattern, ConstraintType::Pattern, field_path, removed);
        strip_string(&mut adapted.format, ConstraintType::Format, field_path, removed);
        strip_u64(&mut adapted.min_items, ConstraintType::MinItems, field_path, removed);
        strip_u64(&mut adapted.max_items, ConstraintType::MaxItems, field_path, removed);

        if adapted.kind == SchemaKind::Object {
            if adapted.additional_properties == Some(true) {
                removed.push(RemovedConstraint::new(
                    ConstraintType::AdditionalProperties,
                    field_path,
                    Value::Bool(true),
                ));
            }
            adapted.additional_properties = Some(false);

            for (name, child) in adapted.properties.iter_mut() {
                if !adapted.required.contains(name) {
                    child.nullable = true;
                }
            }
            adapted.required = adapted.properties.keys().cloned().collect();
        }

        adapted
    }
}
