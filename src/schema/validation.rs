//! Validation of model output against the canonical schema.
//!
//! Backends only enforce the adapted schema, so a final payload is re-checked against the
//! original tree to catch whatever the backend was never told about.

use jsonschema::Draft;
use serde_json::Value;

use super::{Schema, SchemaKind};

/// Validate `value` against `schema`, returning every violation found
pub fn validate(schema: &Schema, value: &Value) -> Result<(), Vec<String>> {
    let document = schema.to_json_schema();
    let validator = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&document)
        .map_err(|err| vec![format!("invalid schema: {}", err)])?;

    let violations: Vec<String> = validator.iter_errors(value).map(|err| err.to_string()).collect();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// Drop `null` values of optional, non-nullable properties.
///
/// Backends that force every property into `required` express "absent" as `null`; the
/// canonical tree treats those as missing fields.
pub fn strip_optional_nulls(schema: &Schema, value: &Value) -> Value {
    match (schema.kind, value) {
        (SchemaKind::Object, Value::Object(map)) => Value::Object(
            map.iter()
                .filter_map(|(key, field)| match schema.properties.get(key) {
                    Some(property)
                        if field.is_null() && !property.nullable && !schema.required.contains(key) =>
                    {
                        None
                    }
                    Some(property) => Some((key.clone(), strip_optional_nulls(property, field))),
                    None => Some((key.clone(), field.clone())),
                })
                .collect(),
        ),
        (SchemaKind::Array, Value::Array(elements)) => match &schema.items {
            Some(items) => Value::Array(elements.iter().map(|e| strip_optional_nulls(items, e)).collect()),
            None => value.clone(),
        },
        _ => value.clone(),
    }
}
