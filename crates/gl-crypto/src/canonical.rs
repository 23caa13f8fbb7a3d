use std::fmt::Write;

use serde::Serialize;
use serde_json::Value;

/// Render a JSON value in canonical form.
///
/// Object keys are sorted at every nesting level and no whitespace is
/// emitted, so two values that compare equal always render to the same
/// bytes regardless of how their maps were built.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

/// Serialize any value and render it in canonical form.
pub fn to_canonical_string<T: Serialize>(value: &T) -> Result<String, CanonicalError> {
    let value =
        serde_json::to_value(value).map_err(|e| CanonicalError::Serialization(e.to_string()))?;
    Ok(canonical_json(&value))
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (key, inner)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, key);
                out.push(':');
                write_value(out, inner);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, inner) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, inner);
            }
            out.push(']');
        }
        scalar => {
            // Display for scalars is the compact JSON form.
            let _ = write!(out, "{scalar}");
        }
    }
}

fn write_string(out: &mut String, s: &str) {
    let _ = write!(out, "{}", Value::String(s.to_owned()));
}

/// Errors from canonical encoding.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CanonicalError {
    #[error("serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    #[test]
    fn keys_are_sorted_and_compact() {
        let value = json!({"b": 1, "a": "x", "c": [true, null]});
        assert_eq!(canonical_json(&value), r#"{"a":"x","b":1,"c":[true,null]}"#);
    }

    #[test]
    fn nested_objects_are_sorted() {
        let value = json!({"outer": {"z": 1, "m": {"y": 2, "b": 3}}});
        assert_eq!(
            canonical_json(&value),
            r#"{"outer":{"m":{"b":3,"y":2},"z":1}}"#
        );
    }

    #[test]
    fn strings_are_escaped() {
        let value = json!({"quote": "say \"hi\"", "pipe": "a|b"});
        assert_eq!(
            canonical_json(&value),
            r#"{"pipe":"a|b","quote":"say \"hi\""}"#
        );
    }

    #[test]
    fn struct_serialization_is_canonical() {
        #[derive(Serialize)]
        struct Entry {
            zeta: u32,
            alpha: &'static str,
        }
        let s = to_canonical_string(&Entry { zeta: 9, alpha: "first" }).unwrap();
        assert_eq!(s, r#"{"alpha":"first","zeta":9}"#);
    }

    #[test]
    fn non_ascii_is_written_as_utf8() {
        let value = json!({"name": "José Ñúñez", "subject": "数学"});
        assert_eq!(
            canonical_json(&value),
            r#"{"name":"José Ñúñez","subject":"数学"}"#
        );
    }

    #[test]
    fn scalar_string_is_quoted() {
        assert_eq!(canonical_json(&json!("marker")), "\"marker\"");
    }

    proptest! {
        #[test]
        fn insertion_order_does_not_matter(
            entries in proptest::collection::vec(("[a-z]{1,8}", any::<i64>()), 0..16)
        ) {
            let forward: HashMap<String, i64> = entries.into_iter().collect();
            let sorted: BTreeMap<String, i64> = forward.clone().into_iter().collect();
            let mut reversed: Vec<(String, i64)> = sorted.clone().into_iter().collect();
            reversed.reverse();

            let a = to_canonical_string(&forward).unwrap();
            let b = to_canonical_string(&sorted).unwrap();
            let c = to_canonical_string(&reversed.into_iter().collect::<HashMap<_, _>>()).unwrap();
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(&a, &c);
        }
    }
}
