//! JSON document <-> DynamoDB attribute value conversion.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use serde_json::{Map, Number, Value};

use crate::driver::{DriverError, Result};

pub(crate) fn to_attr(value: Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s),
        Value::Array(values) => AttributeValue::L(values.into_iter().map(to_attr).collect()),
        Value::Object(map) => AttributeValue::M(to_attrs(map)),
    }
}

pub(crate) fn to_attrs(map: Map<String, Value>) -> HashMap<String, AttributeValue> {
    map.into_iter().map(|(k, v)| (k, to_attr(v))).collect()
}

pub(crate) fn from_attr(attr: AttributeValue) -> Result<Value> {
    Ok(match attr {
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::Bool(b) => Value::Bool(b),
        AttributeValue::S(s) => Value::String(s),
        AttributeValue::N(n) => Value::Number(parse_number(&n)?),
        AttributeValue::L(values) => Value::Array(
            values
                .into_iter()
                .map(from_attr)
                .collect::<Result<Vec<_>>>()?,
        ),
        AttributeValue::M(map) => Value::Object(from_attrs(map)?),
        AttributeValue::Ss(values) => Value::Array(values.into_iter().map(Value::String).collect()),
        AttributeValue::Ns(values) => Value::Array(
            values
                .iter()
                .map(|n| parse_number(n).map(Value::Number))
                .collect::<Result<Vec<_>>>()?,
        ),
        AttributeValue::B(_) | AttributeValue::Bs(_) => {
            return Err(DriverError::Unsupported(
                "binary attributes have no document representation".to_string(),
            ))
        }
        other => {
            return Err(DriverError::Conversion(format!(
                "unknown attribute value: {:?}",
                other
            )))
        }
    })
}

pub(crate) fn from_attrs(map: HashMap<String, AttributeValue>) -> Result<Map<String, Value>> {
    map.into_iter()
        .map(|(k, v)| from_attr(v).map(|v| (k, v)))
        .collect()
}

pub(crate) fn from_opt_attrs(
    map: Option<HashMap<String, AttributeValue>>,
) -> Result<Option<Map<String, Value>>> {
    map.map(from_attrs).transpose()
}

fn parse_number(n: &str) -> Result<Number> {
    n.parse::<Number>()
        .map_err(|e| DriverError::Conversion(format!("invalid number '{}': {}", n, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_document_converts_both_ways() {
        let doc = json!({
            "id": "taco-1",
            "price": 4.5,
            "qty": 3,
            "tags": ["pollo", "verde"],
            "meta": {"vegan": false, "note": null}
        });
        let Value::Object(map) = doc.clone() else {
            unreachable!()
        };

        let attrs = to_attrs(map);
        assert_eq!(attrs.get("qty"), Some(&AttributeValue::N("3".to_string())));
        assert!(matches!(attrs.get("meta"), Some(AttributeValue::M(_))));

        let back = from_attrs(attrs).unwrap();
        assert_eq!(Value::Object(back), doc);
    }

    #[test]
    fn test_string_set_reads_as_array() {
        let value = from_attr(AttributeValue::Ss(vec!["a".into(), "b".into()])).unwrap();
        assert_eq!(value, json!(["a", "b"]));
    }

    #[test]
    fn test_invalid_number_is_conversion_error() {
        let err = from_attr(AttributeValue::N("not-a-number".into())).unwrap_err();
        assert!(matches!(err, DriverError::Conversion(_)));
    }

    #[test]
    fn test_binary_is_unsupported() {
        let blob = aws_sdk_dynamodb::primitives::Blob::new(vec![1u8, 2, 3]);
        let err = from_attr(AttributeValue::B(blob)).unwrap_err();
        assert!(matches!(err, DriverError::Unsupported(_)));
    }
}
