//! Conversion between [`Schema`] and JSON-Schema documents.
//!
//! `to_json_schema` is what backend adapters send on the wire and what output validation
//! compiles. `from_json_schema` is the recursive parser used for tool definitions coming from
//! MCP servers: anything it does not understand falls back to an empty object schema, which is a
//! deliberate approximation rather than an error.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};

use super::{Schema, SchemaKind};

impl Schema {
    /// Render this schema as a JSON-Schema document
    pub fn to_json_schema(&self) -> Value {
        let mut map = Map::new();

        let kind = Value::String(self.kind.as_str().to_string());
        if self.nullable {
            map.insert("type".into(), json!([kind, "null"]));
        } else {
            map.insert("type".into(), kind);
        }

        if let Some(description) = &self.description {
            map.insert("description".into(), json!(description));
        }

        if self.kind == SchemaKind::Object || !self.properties.is_empty() {
            let properties: Map<String, Value> = self
                .properties
                .iter()
                .map(|(name, schema)| (name.clone(), schema.to_json_schema()))
                .collect();
            map.insert("properties".into(), Value::Object(properties));
            if !self.required.is_empty() {
                map.insert("required".into(), json!(self.required));
            }
        }
        if let Some(additional) = self.additional_properties {
            map.insert("additionalProperties".into(), json!(additional));
        }

        if let Some(items) = &self.items {
            map.insert("items".into(), items.to_json_schema());
        }
        if let Some(min) = self.min_items {
            map.insert("minItems".into(), json!(min));
        }
        if let Some(max) = self.max_items {
            map.insert("maxItems".into(), json!(max));
        }

        if let Some(min) = self.min_length {
            map.insert("minLength".into(), json!(min));
        }
        if let Some(max) = self.max_length {
            map.insert("maxLength".into(), json!(max));
        }
        if let Some(pattern) = &self.pattern {
            map.insert("pattern".into(), json!(pattern));
        }
        if let Some(format) = &self.format {
            map.insert("format".into(), json!(format));
        }
        if let Some(values) = &self.enum_values {
            let mut values: Vec<Value> = values.iter().map(|v| json!(v)).collect();
            // a nullable enum has to list null or validators reject it
            if self.nullable {
                values.push(Value::Null);
            }
            map.insert("enum".into(), Value::Array(values));
        }

        if let Some(min) = self.minimum {
            map.insert("minimum".into(), number_value(min));
        }
        if let Some(max) = self.maximum {
            map.insert("maximum".into(), number_value(max));
        }
        if let Some(min) = self.exclusive_minimum {
            map.insert("exclusiveMinimum".into(), number_value(min));
        }
        if let Some(max) = self.exclusive_maximum {
            map.insert("exclusiveMaximum".into(), number_value(max));
        }

        Value::Object(map)
    }

    /// Parse a JSON-Schema document into a canonical schema.
    ///
    /// Unknown or missing `type` values produce an empty object schema.
    pub fn from_json_schema(value: &Value) -> Schema {
        let Some(map) = value.as_object() else {
            return Schema::object();
        };

        let (kind, nullable) = parse_type(map.get("type"));
        let Some(kind) = kind else {
            return Schema::object().with_nullable(nullable);
        };

        let mut schema = Schema::of_kind(kind).with_nullable(nullable);
        schema.description = map
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);

        if let Some(properties) = map.get("properties").and_then(Value::as_object) {
            schema.properties = properties
                .iter()
                .map(|(name, child)| (name.clone(), Schema::from_json_schema(child)))
                .collect();
        }
        if let Some(required) = map.get("required").and_then(Value::as_array) {
            schema.required = required
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
        }
        schema.additional_properties = map.get("additionalProperties").and_then(Value::as_bool);

        if let Some(items) = map.get("items") {
            schema.items = Some(Box::new(Schema::from_json_schema(items)));
        } else if kind == SchemaKind::Array {
            schema.items = Some(Box::new(Schema::object()));
        }
        schema.min_items = map.get("minItems").and_then(Value::as_u64);
        schema.max_items = map.get("maxItems").and_then(Value::as_u64);

        schema.min_length = map.get("minLength").and_then(Value::as_u64);
        schema.max_length = map.get("maxLength").and_then(Value::as_u64);
        schema.pattern = map.get("pattern").and_then(Value::as_str).map(str::to_string);
        schema.format = map.get("format").and_then(Value::as_str).map(str::to_string);
        schema.enum_values = map.get("enum").and_then(Value::as_array).map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        });

        schema.minimum = map.get("minimum").and_then(Value::as_f64);
        schema.maximum = map.get("maximum").and_then(Value::as_f64);
        schema.exclusive_minimum = map.get("exclusiveMinimum").and_then(Value::as_f64);
        schema.exclusive_maximum = map.get("exclusiveMaximum").and_then(Value::as_f64);

        schema
    }
}

/// Returns the declared kind (if recognised) and whether `null` was listed
fn parse_type(value: Option<&Value>) -> (Option<SchemaKind>, bool) {
    match value {
        Some(Value::String(kind)) => (SchemaKind::parse(kind), false),
        Some(Value::Array(kinds)) => {
            let nullable = kinds.iter().any(|k| k.as_str() == Some("null"));
            let kind = kinds
                .iter()
                .filter_map(Value::as_str)
                .find_map(SchemaKind::parse);
            (kind, nullable)
        }
        _ => (None, false),
    }
}

/// Encode a bound as an integer when it has no fractional part
pub(crate) fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        json!(value as i64)
    } else {
        json!(value)
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json_schema().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Schema::from_json_schema(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_json_schema_object() {
        let schema = Schema::object()
            .with_description("A person")
            .with_property("name", Schema::string().with_min_length(1), true)
            .with_property("age", Schema::integer().with_minimum(0.0), false)
            .with_additional_properties(false);

        let json = schema.to_json_schema();

        assert_eq!(json["type"], "object");
        assert_eq!(json["description"], "A person");
        assert_eq!(json["required"], json!(["name"]));
        assert_eq!(json["additionalProperties"], false);
        assert_eq!(json["properties"]["name"]["minLength"], 1);
        assert_eq!(json["properties"]["age"]["minimum"], 0);
    }

    #[test]
    fn test_nullable_enum_lists_null() {
        let schema = Schema::string_enum(["a", "b"]).with_nullable(true);
        let json = schema.to_json_schema();

        assert_eq!(json["type"], json!(["string", "null"]));
        assert_eq!(json["enum"], json!(["a", "b", null]));
    }

    #[test]
    fn test_from_json_schema_nested() {
        let json = json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File path", "pattern": "^/" },
                "lines": {
                    "type": "array",
                    "items": { "type": "integer", "minimum": 1 },
                    "maxItems": 10
                },
                "mode": { "type": ["string", "null"], "enum": ["r", "w"] }
            },
            "required": ["path"]
        });

        let schema = Schema::from_json_schema(&json);

        assert_eq!(schema.kind, SchemaKind::Object);
        assert!(schema.is_required("path"));
        assert_eq!(schema.properties["path"].pattern.as_deref(), Some("^/"));
        let lines = &schema.properties["lines"];
        assert_eq!(lines.max_items, Some(10));
        assert_eq!(lines.items.as_ref().unwrap().minimum, Some(1.0));
        let mode = &schema.properties["mode"];
        assert!(mode.nullable);
        assert_eq!(mode.enum_values, Some(vec!["r".to_string(), "w".to_string()]));
    }

    #[test]
    fn test_unknown_type_defaults_to_empty_object() {
        let schema = Schema::from_json_schema(&json!({ "type": "tuple" }));
        assert_eq!(schema, Schema::object());

        let schema = Schema::from_json_schema(&json!({ "anyOf": [] }));
        assert_eq!(schema, Schema::object());

        let schema = Schema::from_json_schema(&json!("not a schema"));
        assert_eq!(schema, Schema::object());
    }

    #[test]
    fn test_parse_then_render_preserves_constraints() {
        let original = Schema::object()
            .with_property(
                "tags",
                Schema::array(Schema::string().with_max_length(8)).with_min_items(1),
                true,
            )
            .with_property("score", Schema::number().with_exclusive_maximum(1.5), true);

        let reparsed = Schema::from_json_schema(&original.to_json_schema());
        assert_eq!(reparsed, original);
    }
}
