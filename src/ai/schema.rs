//! Response Schemas for Structured Generation
//!
//! Declares the named fields a structured generation must return and renders
//! them in the OpenAPI subset the Gemini API accepts as `responseSchema`.

use serde_json::{Map, Value, json};

/// Primitive or composite field type
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    /// Array of the inner type
    Array(Box<FieldType>),
    /// Nested object with its own fields
    Object(Vec<Field>),
}

/// One named field of a schema
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub field_type: FieldType,
    pub description: Option<&'static str>,
    pub required: bool,
}

impl Field {
    /// Required string field
    pub fn string(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            field_type: FieldType::String,
            description: Some(description),
            required: true,
        }
    }

    /// Required array-of-objects field
    pub fn object_array(name: &'static str, description: &'static str, fields: Vec<Field>) -> Self {
        Self {
            name,
            field_type: FieldType::Array(Box::new(FieldType::Object(fields))),
            description: Some(description),
            required: true,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Top-level object schema for a structured response
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSchema {
    fields: Vec<Field>,
}

impl ResponseSchema {
    pub fn object(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Names of the required top-level fields, in declaration order
    pub fn required_fields(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect()
    }

    /// Render as a Gemini `responseSchema` value
    pub fn to_value(&self) -> Value {
        object_value(&self.fields)
    }
}

fn object_value(fields: &[Field]) -> Value {
    let mut properties = Map::new();
    for field in fields {
        let mut value = type_value(&field.field_type);
        if let (Some(description), Value::Object(map)) = (field.description, &mut value) {
            map.insert("description".to_string(), json!(description));
        }
        properties.insert(field.name.to_string(), value);
    }

    let required: Vec<&str> = fields.iter().filter(|f| f.required).map(|f| f.name).collect();
    let ordering: Vec<&str> = fields.iter().map(|f| f.name).collect();

    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": required,
        "propertyOrdering": ordering,
    })
}

fn type_value(field_type: &FieldType) -> Value {
    match field_type {
        FieldType::String => json!({"type": "STRING"}),
        FieldType::Integer => json!({"type": "INTEGER"}),
        FieldType::Number => json!({"type": "NUMBER"}),
        FieldType::Boolean => json!({"type": "BOOLEAN"}),
        FieldType::Array(inner) => json!({"type": "ARRAY", "items": type_value(inner)}),
        FieldType::Object(fields) => object_value(fields),
    }
}
