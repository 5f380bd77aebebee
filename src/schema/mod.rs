//! Schema translation: declarative JSON parameter schemas into input descriptors.
//!
//! Coverage is best-effort. Unknown or missing type tags degrade to
//! [`DescriptorKind::Any`] instead of failing, so a capability with an exotic
//! schema is still offered to the model.

pub mod provider;
pub mod validation;

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Value};

pub use provider::normalize_schema_for_family;

/// Validated-input descriptor produced from a parameter schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputDescriptor {
    pub kind: DescriptorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Closed literal set, preserved verbatim from `enum`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enumeration: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
}

/// Shape of an accepted value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DescriptorKind {
    String {
        min_length: Option<u64>,
        max_length: Option<u64>,
    },
    Number {
        integer: bool,
        minimum: Option<f64>,
        maximum: Option<f64>,
    },
    Boolean,
    Array {
        items: Box<InputDescriptor>,
        min_items: Option<u64>,
        max_items: Option<u64>,
    },
    Object {
        fields: Vec<FieldDescriptor>,
    },
    Any,
}

/// One named field of an object descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub descriptor: InputDescriptor,
    pub required: bool,
}

impl InputDescriptor {
    /// Accept-anything descriptor.
    pub fn any() -> Self {
        Self::of(DescriptorKind::Any)
    }

    fn of(kind: DescriptorKind) -> Self {
        Self {
            kind,
            description: None,
            enumeration: None,
            nullable: false,
        }
    }

    /// Object fields, if this describes an object.
    pub fn fields(&self) -> Option<&[FieldDescriptor]> {
        match &self.kind {
            DescriptorKind::Object { fields } => Some(fields),
            _ => None,
        }
    }

    /// Field lookup by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields()?.iter().find(|f| f.name == name)
    }

    /// JSON Schema type tag for this descriptor (`"any"` when unconstrained).
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            DescriptorKind::String { .. } => "string",
            DescriptorKind::Number { integer: true, .. } => "integer",
            DescriptorKind::Number { .. } => "number",
            DescriptorKind::Boolean => "boolean",
            DescriptorKind::Array { .. } => "array",
            DescriptorKind::Object { .. } => "object",
            DescriptorKind::Any => "any",
        }
    }

    /// Re-emit this descriptor as a JSON Schema document.
    pub fn to_json_schema(&self) -> Value {
        let mut out = Map::new();
        let type_name = self.type_name();
        if type_name != "any" {
            let tag = if self.nullable {
                serde_json::json!([type_name, "null"])
            } else {
                Value::String(type_name.to_string())
            };
            out.insert("type".into(), tag);
        }
        if let Some(description) = &self.description {
            out.insert("description".into(), Value::String(description.clone()));
        }
        if let Some(values) = &self.enumeration {
            out.insert("enum".into(), Value::Array(values.clone()));
        }

        match &self.kind {
            DescriptorKind::String {
                min_length,
                max_length,
            } => {
                insert_u64(&mut out, "minLength", *min_length);
                insert_u64(&mut out, "maxLength", *max_length);
            }
            DescriptorKind::Number {
                minimum, maximum, ..
            } => {
                insert_f64(&mut out, "minimum", *minimum);
                insert_f64(&mut out, "maximum", *maximum);
            }
            DescriptorKind::Array {
                items,
                min_items,
                max_items,
            } => {
                out.insert("items".into(), items.to_json_schema());
                insert_u64(&mut out, "minItems", *min_items);
                insert_u64(&mut out, "maxItems", *max_items);
            }
            DescriptorKind::Object { fields } => {
                let mut properties = Map::new();
                let mut required = Vec::new();
                for field in fields {
                    properties.insert(field.name.clone(), field.descriptor.to_json_schema());
                    if field.required {
                        required.push(Value::String(field.name.clone()));
                    }
                }
                out.insert("properties".into(), Value::Object(properties));
                if !required.is_empty() {
                    out.insert("required".into(), Value::Array(required));
                }
            }
            DescriptorKind::Boolean | DescriptorKind::Any => {}
        }

        Value::Object(out)
    }
}

/// Translate a JSON Schema node into an [`InputDescriptor`].
///
/// Pure and total: anything unrecognized becomes an unconstrained descriptor.
pub fn translate(schema: &Value) -> InputDescriptor {
    let Some(obj) = schema.as_object() else {
        return InputDescriptor::any();
    };

    let (tag, nullable) = type_tag(obj);
    let kind = match tag {
        Some("string") => DescriptorKind::String {
            min_length: obj.get("minLength").and_then(Value::as_u64),
            max_length: obj.get("maxLength").and_then(Value::as_u64),
        },
        Some(tag @ ("number" | "integer")) => DescriptorKind::Number {
            integer: tag == "integer",
            minimum: obj.get("minimum").and_then(Value::as_f64),
            maximum: obj.get("maximum").and_then(Value::as_f64),
        },
        Some("boolean") => DescriptorKind::Boolean,
        Some("array") => DescriptorKind::Array {
            items: Box::new(
                obj.get("items")
                    .map(translate)
                    .unwrap_or_else(InputDescriptor::any),
            ),
            min_items: obj.get("minItems").and_then(Value::as_u64),
            max_items: obj.get("maxItems").and_then(Value::as_u64),
        },
        Some("object") => object_kind(obj),
        None if obj.contains_key("properties") => object_kind(obj),
        _ => DescriptorKind::Any,
    };

    InputDescriptor {
        kind,
        description: obj
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_owned),
        enumeration: obj.get("enum").and_then(Value::as_array).cloned(),
        nullable,
    }
}

fn object_kind(obj: &Map<String, Value>) -> DescriptorKind {
    let required: HashSet<&str> = obj
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let fields = obj
        .get("properties")
        .and_then(Value::as_object)
        .map(|properties| {
            properties
                .iter()
                .map(|(name, schema)| FieldDescriptor {
                    name: name.clone(),
                    descriptor: translate(schema),
                    required: required.contains(name.as_str()),
                })
                .collect()
        })
        .unwrap_or_default();

    DescriptorKind::Object { fields }
}

/// Returns the effective type tag and whether `null` is also admitted.
fn type_tag(obj: &Map<String, Value>) -> (Option<&str>, bool) {
    match obj.get("type") {
        Some(Value::String(tag)) => (Some(tag.as_str()), false),
        Some(Value::Array(tags)) => {
            let tags: Vec<&str> = tags.iter().filter_map(Value::as_str).collect();
            let nullable = tags.contains(&"null");
            (tags.into_iter().find(|t| *t != "null"), nullable)
        }
        _ => (None, false),
    }
}

fn insert_u64(out: &mut Map<String, Value>, key: &str, value: Option<u64>) {
    if let Some(value) = value {
        out.insert(key.into(), Value::from(value));
    }
}

fn insert_f64(out: &mut Map<String, Value>, key: &str, value: Option<f64>) {
    if let Some(number) = value.and_then(serde_json::Number::from_f64) {
        out.insert(key.into(), Value::Number(number));
    }
}
