// Typed-value wire format of the document database REST API.
//
// Every field arrives wrapped in a one-key object naming its type
// (`{"integerValue": "3"}`, `{"mapValue": {"fields": {...}}}`, ...). These are
// unwrapped into plain JSON so the core document types can deserialize them
// with serde as if they had been stored as ordinary JSON.

use serde::Deserialize;
use serde_json::{Map, Number, Value};

use clubrecord_core::store::StoreError;

/// One document as returned by a get or list call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Document {
    /// Full resource name, ending in `.../documents/{collection}/{id}`.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Document {
    /// Last path segment of the resource name.
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or_default()
    }

    /// Decode every field into a plain JSON object.
    pub fn to_plain(&self) -> Result<Value, StoreError> {
        decode_fields(&self.fields).map(Value::Object)
    }
}

/// One page of a collection listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

fn malformed(message: String) -> StoreError {
    StoreError::Malformed { message }
}

fn decode_fields(fields: &Map<String, Value>) -> Result<Map<String, Value>, StoreError> {
    fields
        .iter()
        .map(|(key, value)| Ok((key.clone(), decode_value(value)?)))
        .collect()
}

/// Unwrap one typed value.
pub fn decode_value(value: &Value) -> Result<Value, StoreError> {
    let Some(object) = value.as_object() else {
        return Err(malformed(format!("expected a typed value object, got {value}")));
    };
    let Some((kind, inner)) = object.iter().next() else {
        // An empty value object only appears for an unset field.
        return Ok(Value::Null);
    };

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => Ok(Value::Bool(inner.as_bool().unwrap_or(false))),
        // 64-bit integers travel as decimal strings.
        "integerValue" => match inner {
            Value::String(s) => s
                .parse::<i64>()
                .map(|n| Value::Number(n.into()))
                .map_err(|_| malformed(format!("integerValue `{s}` is not an integer"))),
            Value::Number(n) => Ok(Value::Number(n.clone())),
            other => Err(malformed(format!("integerValue has unexpected shape {other}"))),
        },
        // NaN and infinities arrive as strings and have no JSON number form.
        "doubleValue" => Ok(inner
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null)),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => Ok(inner.clone()),
        "geoPointValue" => Ok(inner.clone()),
        "arrayValue" => {
            let values = inner.get("values").and_then(Value::as_array);
            values
                .map(|vs| vs.iter().map(decode_value).collect::<Result<Vec<_>, _>>())
                .transpose()
                .map(|vs| Value::Array(vs.unwrap_or_default()))
        }
        "mapValue" => {
            let empty = Map::new();
            let fields = inner.get("fields").and_then(Value::as_object).unwrap_or(&empty);
            decode_fields(fields).map(Value::Object)
        }
        other => Err(malformed(format!("unknown value type `{other}`"))),
    }
}
