//! Conversion between plain JSON and Firestore's typed value encoding.
//!
//! Firestore REST wraps every value in a single-key object naming its type
//! (`{"stringValue": "x"}`, `{"integerValue": "42"}`, ...). 64-bit integers
//! travel as strings.

use serde_json::{json, Map, Number, Value};

use nutrilog_core::{CloudError, MealRecord};

pub fn encode(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or(0.0) }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            json!({ "arrayValue": { "values": items.iter().map(encode).collect::<Vec<_>>() } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

pub fn encode_fields(map: &Map<String, Value>) -> Value {
    Value::Object(map.iter().map(|(k, v)| (k.clone(), encode(v))).collect())
}

pub fn decode(value: &Value) -> Result<Value, CloudError> {
    let (kind, inner) = value
        .as_object()
        .and_then(|o| o.iter().next())
        .ok_or_else(|| invalid("expected a typed value"))?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| invalid("booleanValue")),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                other => other.as_i64(),
            };
            parsed
                .map(|i| Value::Number(i.into()))
                .ok_or_else(|| invalid("integerValue"))
        }
        "doubleValue" => inner
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| invalid("doubleValue")),
        "stringValue" | "timestampValue" | "referenceValue" => inner
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| invalid(kind)),
        "arrayValue" => match inner.get("values") {
            Some(Value::Array(items)) => items
                .iter()
                .map(decode)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            // An empty array has no `values` key.
            _ => Ok(Value::Array(Vec::new())),
        },
        "mapValue" => decode_fields(inner.get("fields")),
        other => Err(invalid(&format!("unsupported value type `{}`", other))),
    }
}

pub fn decode_fields(fields: Option<&Value>) -> Result<Value, CloudError> {
    let mut out = Map::new();
    if let Some(Value::Object(fields)) = fields {
        for (key, value) in fields {
            out.insert(key.clone(), decode(value)?);
        }
    }
    Ok(Value::Object(out))
}

/// Document body for a record: `{"fields": {...}}`.
pub fn record_to_document(record: &MealRecord) -> Result<Value, CloudError> {
    let value = serde_json::to_value(record).map_err(|e| invalid(&e.to_string()))?;
    let Value::Object(map) = value else {
        return Err(invalid("meal record did not serialize to an object"));
    };
    Ok(json!({ "fields": encode_fields(&map) }))
}

/// Record from a document resource. The id falls back to the last segment
/// of the document name when the fields do not carry one.
pub fn document_to_record(document: &Value) -> Result<MealRecord, CloudError> {
    let mut value = decode_fields(document.get("fields"))?;
    if let Value::Object(map) = &mut value {
        if !map.contains_key("id") {
            if let Some(id) = document["name"].as_str().and_then(|n| n.rsplit('/').next()) {
                map.insert("id".to_string(), Value::String(id.to_string()));
            }
        }
    }
    serde_json::from_value(value).map_err(|e| invalid(&e.to_string()))
}

fn invalid(what: &str) -> CloudError {
    CloudError::InvalidResponse(format!("malformed Firestore value: {}", what))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nutrilog_core::{MacroProfile, MealAnalysis};

    #[test]
    fn test_encode_scalars() {
        assert_eq!(encode(&json!(42)), json!({ "integerValue": "42" }));
        assert_eq!(encode(&json!(1.5)), json!({ "doubleValue": 1.5 }));
        assert_eq!(encode(&json!("x")), json!({ "stringValue": "x" }));
        assert_eq!(encode(&json!(true)), json!({ "booleanValue": true }));
        assert_eq!(encode(&Value::Null), json!({ "nullValue": null }));
    }

    #[test]
    fn test_decode_nested() {
        let typed = json!({
            "mapValue": { "fields": {
                "n": { "integerValue": "7" },
                "items": { "arrayValue": { "values": [{ "stringValue": "egg" }] } },
                "empty": { "arrayValue": {} }
            }}
        });
        assert_eq!(
            decode(&typed).unwrap(),
            json!({ "n": 7, "items": ["egg"], "empty": [] })
        );
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        assert!(decode(&json!({ "geoPointValue": {} })).is_err());
        assert!(decode(&json!("bare")).is_err());
    }

    #[test]
    fn test_record_document_shape() {
        let record = MealRecord::new(
            "2 eggs",
            MealAnalysis::new(MacroProfile::new(140.0, 12.0, 1.0, 10.0, 0.0), "Eggs")
                .with_food_items(vec!["egg".into()]),
        )
        .with_id("m1")
        .with_timestamp(1_700_000_000_000);

        let doc = record_to_document(&record).unwrap();
        let fields = &doc["fields"];
        assert_eq!(fields["id"], json!({ "stringValue": "m1" }));
        assert_eq!(fields["timestamp"], json!({ "integerValue": "1700000000000" }));
        assert_eq!(
            fields["analysis"]["mapValue"]["fields"]["calories"],
            json!({ "doubleValue": 140.0 })
        );

        assert_eq!(document_to_record(&doc).unwrap(), record);
    }

    #[test]
    fn test_document_id_from_name_and_integer_macros() {
        let doc = json!({
            "name": "projects/p/databases/(default)/documents/users/u1/meals/abc",
            "fields": {
                "timestamp": { "integerValue": "5" },
                "originalText": { "stringValue": "toast" },
                "analysis": { "mapValue": { "fields": {
                    "calories": { "integerValue": "90" },
                    "protein": { "integerValue": "3" },
                    "carbs": { "doubleValue": 15.5 },
                    "fat": { "integerValue": "1" },
                    "summary": { "stringValue": "Toast" }
                }}}
            }
        });

        let record = document_to_record(&doc).unwrap();
        assert_eq!(record.id, "abc");
        assert_eq!(record.analysis.macros.calories, 90.0);
        assert_eq!(record.analysis.macros.fiber, 0.0);
        assert!(record.analysis.food_items.is_empty());
    }
}
