use std::collections::HashMap;

use serde_json::Value;

use crate::document::{is_date, is_object_id};
use crate::error::{MovieDbError, Result};

/// Compiled `$jsonSchema` validator
#[derive(Clone, Debug)]
pub struct CompiledSchema {
    pub(super) required: Vec<String>,
    pub(super) properties: HashMap<String, PropertySchema>,
}

/// Constraints on one top-level field
#[derive(Clone, Debug)]
pub struct PropertySchema {
    pub types: Vec<BsonType>,
    /// Allowed element types when the field is an array
    pub items: Option<Vec<BsonType>>,
    pub enum_values: Option<Vec<Value>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BsonType {
    String,
    /// 32-bit integer
    Int,
    /// 64-bit integer
    Long,
    Double,
    /// Any of int, long, double
    Number,
    Bool,
    Date,
    ObjectId,
    Array,
    Object,
    Null,
}

impl BsonType {
    /// Accepts `bsonType` names and the JSON Schema `type` spellings
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "string" => Some(Self::String),
            "int" | "integer" => Some(Self::Int),
            "long" => Some(Self::Long),
            "double" => Some(Self::Double),
            "number" => Some(Self::Number),
            "bool" | "boolean" => Some(Self::Bool),
            "date" => Some(Self::Date),
            "objectId" => Some(Self::ObjectId),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            "null" => Some(Self::Null),
            _ => None,
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            BsonType::String => value.is_string(),
            BsonType::Int => value
                .as_i64()
                .map(|i| i32::try_from(i).is_ok())
                .unwrap_or(false),
            BsonType::Long => value.is_i64(),
            BsonType::Double => value.is_f64(),
            BsonType::Number => value.is_number(),
            BsonType::Bool => value.is_boolean(),
            BsonType::Date => is_date(value),
            BsonType::ObjectId => is_object_id(value),
            BsonType::Array => value.is_array(),
            BsonType::Object => value.is_object() && !is_date(value) && !is_object_id(value),
            BsonType::Null => value.is_null(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BsonType::String => "string",
            BsonType::Int => "int",
            BsonType::Long => "long",
            BsonType::Double => "double",
            BsonType::Number => "number",
            BsonType::Bool => "bool",
            BsonType::Date => "date",
            BsonType::ObjectId => "objectId",
            BsonType::Array => "array",
            BsonType::Object => "object",
            BsonType::Null => "null",
        }
    }
}

fn describe(types: &[BsonType]) -> String {
    types
        .iter()
        .map(BsonType::as_str)
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Read `bsonType` (or `type`) as one name or a list of names
fn parse_types(spec: &Value, field: &str) -> Result<Option<Vec<BsonType>>> {
    let raw = match spec.get("bsonType").or_else(|| spec.get("type")) {
        Some(raw) => raw,
        None => return Ok(None),
    };

    let names: Vec<&Value> = match raw {
        Value::Array(list) => list.iter().collect(),
        other => vec![other],
    };

    let mut types = Vec::with_capacity(names.len());
    for name in names {
        let name = name.as_str().ok_or_else(|| {
            MovieDbError::SchemaError(format!("Property '{}' type must be a string", field))
        })?;
        let parsed = BsonType::from_str(name).ok_or_else(|| {
            MovieDbError::SchemaError(format!(
                "Unsupported type '{}' for field '{}'",
                name, field
            ))
        })?;
        types.push(parsed);
    }
    Ok(Some(types))
}

impl CompiledSchema {
    /// Compile a validator. Accepts `{"$jsonSchema": {...}}` or the bare schema.
    pub fn from_value(schema: &Value) -> Result<Self> {
        let schema = schema.get("$jsonSchema").unwrap_or(schema);
        let obj = schema.as_object().ok_or_else(|| {
            MovieDbError::SchemaError("Schema must be a JSON object".to_string())
        })?;

        if let Some(root_types) = parse_types(schema, "<root>")? {
            if root_types != [BsonType::Object] {
                return Err(MovieDbError::SchemaError(
                    "Only object schemas are supported".to_string(),
                ));
            }
        }

        let mut required = Vec::new();
        if let Some(required_value) = obj.get("required") {
            let arr = required_value.as_array().ok_or_else(|| {
                MovieDbError::SchemaError("required must be an array of field names".to_string())
            })?;
            for entry in arr {
                let field = entry.as_str().ok_or_else(|| {
                    MovieDbError::SchemaError("required entries must be strings".to_string())
                })?;
                required.push(field.to_string());
            }
        }

        let mut properties = HashMap::new();
        if let Some(props) = obj.get("properties") {
            let props_obj = props.as_object().ok_or_else(|| {
                MovieDbError::SchemaError("properties must be an object".to_string())
            })?;
            for (field, spec) in props_obj {
                let types = match parse_types(spec, field)? {
                    Some(types) => types,
                    None => continue,
                };

                let items = match spec.get("items") {
                    Some(items_spec) => parse_types(items_spec, &format!("{}.items", field))?,
                    None => None,
                };

                let enum_values = match spec.get("enum") {
                    Some(enum_value) => Some(
                        enum_value
                            .as_array()
                            .ok_or_else(|| {
                                MovieDbError::SchemaError(format!(
                                    "Property '{}' enum must be an array",
                                    field
                                ))
                            })?
                            .clone(),
                    ),
                    None => None,
                };

                properties.insert(
                    field.clone(),
                    PropertySchema {
                        types,
                        items,
                        enum_values,
                    },
                );
            }
        }

        Ok(Self {
            required,
            properties,
        })
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        let obj = value.as_object().ok_or_else(|| {
            MovieDbError::SchemaError("Document must be a JSON object".to_string())
        })?;

        for field in &self.required {
            if !obj.contains_key(field) {
                return Err(MovieDbError::SchemaError(format!(
                    "Missing required field '{}'",
                    field
                )));
            }
        }

        for (field, prop) in &self.properties {
            let field_value = match obj.get(field) {
                Some(v) => v,
                None => continue,
            };

            if !prop.types.iter().any(|t| t.matches(field_value)) {
                return Err(MovieDbError::SchemaError(format!(
                    "Field '{}' expected type {}",
                    field,
                    describe(&prop.types)
                )));
            }

            if let (Some(item_types), Some(arr)) = (&prop.items, field_value.as_array()) {
                for (i, item) in arr.iter().enumerate() {
                    if !item_types.iter().any(|t| t.matches(item)) {
                        return Err(MovieDbError::SchemaError(format!(
                            "Field '{}' item {} expected type {}",
                            field,
                            i,
                            describe(item_types)
                        )));
                    }
                }
            }

            if let Some(enum_values) = &prop.enum_values {
                if !enum_values.contains(field_value) {
                    return Err(MovieDbError::SchemaError(format!(
                        "Field '{}' value not in allowed enum values: {:?}",
                        field, enum_values
                    )));
                }
            }
        }

        Ok(())
    }
}
