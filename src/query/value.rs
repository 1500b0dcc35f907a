//! Ordering and equality over JSON values
//!
//! Values are grouped into type brackets the way document stores order
//! mixed-type fields: `null < number < string < object < array < bool`.
//! Range comparisons only ever match inside one bracket.

use crate::types::JsonValue;
use std::cmp::Ordering;

/// Position of a value's type in the cross-type ordering
pub fn type_rank(value: &JsonValue) -> u8 {
    match value {
        JsonValue::Null => 0,
        JsonValue::Number(_) => 1,
        JsonValue::String(_) => 2,
        JsonValue::Object(_) => 3,
        JsonValue::Array(_) => 4,
        JsonValue::Bool(_) => 5,
    }
}

/// Total order over JSON values
pub fn compare_values(a: &JsonValue, b: &JsonValue) -> Ordering {
    match (a, b) {
        (JsonValue::Null, JsonValue::Null) => Ordering::Equal,
        (JsonValue::Number(x), JsonValue::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                x.cmp(&y)
            } else if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                x.cmp(&y)
            } else {
                let x = x.as_f64().unwrap_or(f64::NAN);
                let y = y.as_f64().unwrap_or(f64::NAN);
                x.total_cmp(&y)
            }
        }
        (JsonValue::String(x), JsonValue::String(y)) => x.cmp(y),
        (JsonValue::Bool(x), JsonValue::Bool(y)) => x.cmp(y),
        (JsonValue::Array(x), JsonValue::Array(y)) => {
            for (left, right) in x.iter().zip(y.iter()) {
                let ord = compare_values(left, right);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (JsonValue::Object(x), JsonValue::Object(y)) => {
            for ((lk, lv), (rk, rv)) in x.iter().zip(y.iter()) {
                let ord = lk.cmp(rk).then_with(|| compare_values(lv, rv));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Compare two values only when they share a type bracket
pub fn compare_same_type(a: &JsonValue, b: &JsonValue) -> Option<Ordering> {
    (type_rank(a) == type_rank(b)).then(|| compare_values(a, b))
}

/// Equality that treats `1` and `1.0` as the same number
pub fn values_equal(a: &JsonValue, b: &JsonValue) -> bool {
    compare_same_type(a, b) == Some(Ordering::Equal)
}

/// Look up a possibly dotted path (`author.name`) inside a document
pub fn lookup<'a>(document: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    path.split('.')
        .try_fold(document, |current, part| current.as_object()?.get(part))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numbers_compare_across_representations() {
        assert_eq!(compare_values(&json!(1), &json!(2)), Ordering::Less);
        assert_eq!(compare_values(&json!(2.5), &json!(2)), Ordering::Greater);
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert_eq!(compare_values(&json!(-3), &json!(u64::MAX)), Ordering::Less);
    }

    #[test]
    fn test_type_brackets() {
        assert_eq!(compare_values(&json!(null), &json!(0)), Ordering::Less);
        assert_eq!(compare_values(&json!(999), &json!("a")), Ordering::Less);
        assert_eq!(compare_values(&json!("z"), &json!({})), Ordering::Less);
        assert_eq!(compare_values(&json!([]), &json!(false)), Ordering::Less);
        assert_eq!(compare_same_type(&json!(5), &json!("5")), None);
    }

    #[test]
    fn test_lookup_dotted_path() {
        let doc = json!({"author": {"name": "Ada"}, "value": 3});
        assert_eq!(lookup(&doc, "value"), Some(&json!(3)));
        assert_eq!(lookup(&doc, "author.name"), Some(&json!("Ada")));
        assert_eq!(lookup(&doc, "author.missing"), None);
        assert_eq!(lookup(&doc, "value.deeper"), None);
    }
}
