//! Schema adapter for the Gemini backend.
//!
//! Keeps `minimum`/`maximum`, item-count bounds and `enum`. Drops exclusive bounds, string length
//! bounds, `pattern`, `additionalProperties`, and any `format` outside [`SUPPORTED_FORMATS`].

use super::adapter::{
    strip_bool, strip_f64, strip_length_bounds, strip_string, Backend, ConstraintType,
    RemovedConstraint, SchemaAdapter,
};
use super::Schema;

/// String formats Gemini enforces
pub const SUPPORTED_FORMATS: &[&str] = &["date-time", "date", "time"];

/// Backend C
#[derive(Debug, Clone, Copy, Default)]
pub struct GeminiSchemaAdapter;

impl SchemaAdapter for GeminiSchemaAdapter {
    fn backend(&self) -> Backend {
        Backend::Gemini
    }

    fn adapt_node(&self, node: &Schema, field_path: &str, removed: &mut Vec<RemovedConstraint>) -> Schema {
        let mut adapted = node.clone();

        strip_f64(&mut adapted.exclusive_minimum, ConstraintType::ExclusiveMinimum, field_path, removed);
        strip_f64(&mut adapted.exclusive_maximum, ConstraintType::ExclusiveMaximum, field_path, removed);
        strip_length_bounds(&mut adapted, field_path, removed);
        strip_string(&mut adapted.pattern, ConstraintType::Pattern, field_path, removed);

        let unsupported_format = adapted
            .format
            .as_deref()
            .is_some_and(|format| !SUPPORTED_FORMATS.contains(&format));
        if unsupported_format {
            strip_string(&mut adapted.format, ConstraintType::Format, field_path, removed);
        }

        strip_bool(
            &mut adapted.additional_properties,
            ConstraintType::AdditionalProperties,
            field_path,
            removed,
        );

        adapted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::adapter::tests::{kitchen_sink, removed_at};
    use serde_json::json;

    #[test]
    fn test_format_allow_list() {
        let result = GeminiSchemaAdapter.adapt(&kitchen_sink());
        let schema = &result.schema;

        assert_eq!(schema.properties["born"].format.as_deref(), Some("date"));
        assert_eq!(schema.properties["email"].format, None);

        let email = removed_at(&result.removed_constraints, "email");
        assert_eq!(email.len(), 1);
        assert_eq!(email[0].constraint_type, ConstraintType::Format);
        assert_eq!(email[0].value, json!("email"));
    }

    #[test]
    fn test_keeps_inclusive_numeric_and_item_bounds() {
        let result = GeminiSchemaAdapter.adapt(&kitchen_sink());
        let schema = &result.schema;

        let score = &schema.properties["score"];
        assert_eq!(score.minimum, Some(0.0));
        assert_eq!(score.maximum, Some(10.0));
        assert_eq!(score.exclusive_minimum, None);
        assert_eq!(score.exclusive_maximum, None);

        let tags = &schema.properties["tags"];
        assert_eq!(tags.min_items, Some(1));
        assert_eq!(tags.max_items, Some(5));
    }

    #[test]
    fn test_additional_properties_always_dropped() {
        let result = GeminiSchemaAdapter.adapt(&kitchen_sink());

        assert_eq!(result.schema.additional_properties, None);
        let friend = result.schema.properties["friends"].items.as_ref().unwrap();
        assert_eq!(friend.additional_properties, None);

        let root = removed_at(&result.removed_constraints, "");
        assert_eq!(root[0].value, json!(true));
        let nested = removed_at(&result.removed_constraints, "friends[]");
        assert_eq!(nested[0].value, json!(false));
    }
}
