//! Validate structured tool input against a translated descriptor.

use serde_json::Value;

use super::{DescriptorKind, InputDescriptor};

impl InputDescriptor {
    /// Validate `value` against this descriptor.
    ///
    /// Recurses through objects and arrays. Returns `Err(message)` describing
    /// the first violation found; extra object fields are accepted.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        self.validate_at("input", value)
    }

    fn validate_at(&self, path: &str, value: &Value) -> Result<(), String> {
        if value.is_null() && self.nullable {
            return Ok(());
        }

        if let Some(allowed) = &self.enumeration {
            if !allowed.contains(value) {
                return Err(format!("{path}: {value} is not one of the allowed values"));
            }
        }

        match &self.kind {
            DescriptorKind::Any => Ok(()),
            DescriptorKind::Boolean => expect(path, value.is_boolean(), "boolean", value),
            DescriptorKind::String {
                min_length,
                max_length,
            } => {
                let Some(text) = value.as_str() else {
                    return expect(path, false, "string", value);
                };
                let len = text.chars().count() as u64;
                check_bounds(
                    path,
                    "length",
                    len as f64,
                    min_length.map(|v| v as f64),
                    max_length.map(|v| v as f64),
                )
            }
            DescriptorKind::Number {
                integer,
                minimum,
                maximum,
            } => {
                let is_integer = value.is_i64() || value.is_u64();
                if *integer && !is_integer {
                    return expect(path, false, "integer", value);
                }
                let Some(number) = value.as_f64() else {
                    return expect(path, false, "number", value);
                };
                check_bounds(path, "value", number, *minimum, *maximum)
            }
            DescriptorKind::Array {
                items,
                min_items,
                max_items,
            } => {
                let Some(elements) = value.as_array() else {
                    return expect(path, false, "array", value);
                };
                check_bounds(
                    path,
                    "item count",
                    elements.len() as f64,
                    min_items.map(|v| v as f64),
                    max_items.map(|v| v as f64),
                )?;
                for (index, element) in elements.iter().enumerate() {
                    items.validate_at(&format!("{path}[{index}]"), element)?;
                }
                Ok(())
            }
            DescriptorKind::Object { fields } => {
                let Some(obj) = value.as_object() else {
                    return expect(path, false, "object", value);
                };
                for field in fields {
                    match obj.get(&field.name) {
                        Some(inner) => field
                            .descriptor
                            .validate_at(&format!("{path}.{}", field.name), inner)?,
                        None if field.required => {
                            return Err(format!("{path}: missing required field '{}'", field.name));
                        }
                        None => {}
                    }
                }
                Ok(())
            }
        }
    }
}

fn expect(path: &str, ok: bool, expected: &str, value: &Value) -> Result<(), String> {
    if ok {
        Ok(())
    } else {
        Err(format!(
            "{path}: expected {expected}, got {}",
            json_type_name(value)
        ))
    }
}

fn check_bounds(
    path: &str,
    what: &str,
    actual: f64,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<(), String> {
    if let Some(min) = min {
        if actual < min {
            return Err(format!("{path}: {what} {actual} is below minimum {min}"));
        }
    }
    if let Some(max) = max {
        if actual > max {
            return Err(format!("{path}: {what} {actual} exceeds maximum {max}"));
        }
    }
    Ok(())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
