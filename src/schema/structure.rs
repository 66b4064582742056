//! Declarative object-schema assembly

use super::Schema;

/// One field of a [`DynamicStructure`]
#[derive(Debug, Clone, PartialEq)]
pub struct NamedField {
    pub name: String,
    pub schema: Schema,
    pub is_required: bool,
}

impl NamedField {
    pub fn new(name: impl Into<String>, schema: Schema, is_required: bool) -> Self {
        Self {
            name: name.into(),
            schema,
            is_required,
        }
    }

    pub fn required(name: impl Into<String>, schema: Schema) -> Self {
        Self::new(name, schema, true)
    }

    pub fn optional(name: impl Into<String>, schema: Schema) -> Self {
        Self::new(name, schema, false)
    }
}

/// A named object shape built from an ordered list of fields.
///
/// Equality is structural: name, description and the fields in order.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicStructure {
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<NamedField>,
}

impl DynamicStructure {
    pub fn new(name: impl Into<String>, fields: Vec<NamedField>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields,
        }
    }

    /// Start an empty structure and add fields fluently
    pub fn builder(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_field(mut self, field: NamedField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_required(self, name: impl Into<String>, schema: Schema) -> Self {
        self.with_field(NamedField::required(name, schema))
    }

    pub fn with_optional(self, name: impl Into<String>, schema: Schema) -> Self {
        self.with_field(NamedField::optional(name, schema))
    }

    /// Convert to a closed object schema.
    ///
    /// `required` is exactly the set of required fields and `additionalProperties` is `false`.
    /// A field name declared twice keeps its last declaration.
    pub fn to_schema(&self) -> Schema {
        let mut schema = Schema::object().with_additional_properties(false);
        schema.description = self.description.clone();
        for field in &self.fields {
            schema = schema.with_property(field.name.clone(), field.schema.clone(), field.is_required);
        }
        schema
    }
}
