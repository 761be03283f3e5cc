// Update operators: $set, $unset, $inc

use serde_json::{Number, Value};

use crate::document::{Document, ID_FIELD};
use crate::error::{MovieDbError, Result};

/// Apply an update document to `document` in place.
///
/// Returns true if any field actually changed.
pub(super) fn apply_update_operators(document: &mut Document, update: &Value) -> Result<bool> {
    let ops = update.as_object().ok_or_else(|| {
        MovieDbError::InvalidQuery("Update must be a JSON object".to_string())
    })?;
    if ops.is_empty() {
        return Err(MovieDbError::InvalidQuery(
            "Update document is empty".to_string(),
        ));
    }

    let mut was_modified = false;
    for (op, fields) in ops {
        let field_values = fields.as_object().ok_or_else(|| {
            MovieDbError::InvalidQuery(format!("{} expects an object of fields", op))
        })?;

        for (field, value) in field_values {
            if field == ID_FIELD {
                return Err(MovieDbError::InvalidQuery(
                    "Cannot modify the immutable field '_id'".to_string(),
                ));
            }

            match op.as_str() {
                "$set" => {
                    if document.get(field) != Some(value) {
                        document.set(field, value.clone());
                        was_modified = true;
                    }
                }
                "$unset" => {
                    was_modified |= document.remove(field).is_some();
                }
                "$inc" => {
                    let next = increment(document.get(field), value, field)?;
                    document.set(field, next);
                    was_modified = true;
                }
                other => {
                    return Err(MovieDbError::InvalidQuery(format!(
                        "Unsupported update operator '{}'",
                        other
                    )))
                }
            }
        }
    }
    Ok(was_modified)
}

fn increment(current: Option<&Value>, by: &Value, field: &str) -> Result<Value> {
    let by_num = by.as_f64().ok_or_else(|| {
        MovieDbError::InvalidQuery(format!("$inc on '{}' needs a numeric amount", field))
    })?;

    let current = match current {
        None => return Ok(by.clone()),
        Some(v) => v,
    };

    // Keep integers integral while they fit
    if let (Some(a), Some(b)) = (current.as_i64(), by.as_i64()) {
        if let Some(sum) = a.checked_add(b) {
            return Ok(Value::from(sum));
        }
    }

    let base = current.as_f64().ok_or_else(|| {
        MovieDbError::InvalidQuery(format!("$inc on non-numeric field '{}'", field))
    })?;
    Number::from_f64(base + by_num)
        .map(Value::Number)
        .ok_or_else(|| MovieDbError::InvalidQuery(format!("$inc on '{}' overflowed", field)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentId;
    use serde_json::json;

    fn doc(fields: Value) -> Document {
        Document::new(DocumentId::Int(1), fields.as_object().cloned().unwrap_or_default())
    }

    #[test]
    fn test_set_and_unset() {
        let mut d = doc(json!({"title": "Heat", "description": "x"}));
        let changed = apply_update_operators(
            &mut d,
            &json!({"$set": {"title": "Ronin"}, "$unset": {"description": ""}}),
        )
        .unwrap();
        assert!(changed);
        assert_eq!(d.get("title"), Some(&json!("Ronin")));
        assert!(d.get("description").is_none());
    }

    #[test]
    fn test_set_same_value_is_not_a_change() {
        let mut d = doc(json!({"title": "Heat"}));
        assert!(!apply_update_operators(&mut d, &json!({"$set": {"title": "Heat"}})).unwrap());
        assert!(!apply_update_operators(&mut d, &json!({"$unset": {"missing": 1}})).unwrap());
    }

    #[test]
    fn test_inc() {
        let mut d = doc(json!({"votes": 10, "revenue": 1.5}));
        apply_update_operators(&mut d, &json!({"$inc": {"votes": 5, "revenue": 1, "runtime": 90}}))
            .unwrap();
        assert_eq!(d.get("votes"), Some(&json!(15)));
        assert_eq!(d.get("revenue"), Some(&json!(2.5)));
        assert_eq!(d.get("runtime"), Some(&json!(90)));
    }

    #[test]
    fn test_inc_rejects_non_numeric() {
        let mut d = doc(json!({"title": "Heat"}));
        assert!(apply_update_operators(&mut d, &json!({"$inc": {"title": 1}})).is_err());
        assert!(apply_update_operators(&mut d, &json!({"$inc": {"votes": "1"}})).is_err());
    }

    #[test]
    fn test_invalid_updates() {
        let mut d = doc(json!({"title": "Heat"}));
        assert!(apply_update_operators(&mut d, &json!({})).is_err());
        assert!(apply_update_operators(&mut d, &json!({"title": "x"})).is_err());
        assert!(apply_update_operators(&mut d, &json!({"$push": {"genres": 1}})).is_err());
        assert!(apply_update_operators(&mut d, &json!({"$set": {"_id": 2}})).is_err());
    }
}
