//! Producer trees and the mutations the agent applies to them.

use anyhow::{bail, Context, Result};
use proptree_core::{Scalar, SenderProperty};
use serde_json::Value;

/// The two-ticker portfolio used by the demo producer.
///
/// # Errors
///
/// Never fails in practice; sibling names are distinct.
pub fn portfolio() -> Result<SenderProperty> {
    let ticker = |name: &str, price: f32, currency: &str, volume: i32| {
        SenderProperty::group(
            name,
            [
                SenderProperty::leaf("Price", price),
                SenderProperty::leaf("Currency", currency),
                SenderProperty::leaf("Volume", volume),
            ],
        )
    };

    Ok(SenderProperty::group(
        "Portfolio",
        [
            ticker("TICKER1", 100.0, "USD", 1000)?,
            ticker("TICKER2", 200.0, "EUR", 2000)?,
        ],
    )?)
}

/// Build a producer tree from a JSON document.
///
/// Objects become groups (key order is kept), strings, booleans, integers that
/// fit in 32 bits, and other numbers become leaves of the matching type.
///
/// # Errors
///
/// Returns error for arrays, nulls, or out-of-range integers.
pub fn tree_from_json(name: &str, value: &Value) -> Result<SenderProperty> {
    let node = match value {
        Value::Object(map) => {
            let children = map
                .iter()
                .map(|(key, child)| tree_from_json(key, child))
                .collect::<Result<Vec<_>>>()?;
            SenderProperty::group(name, children)?
        }
        Value::String(s) => SenderProperty::leaf(name, s.as_str()),
        Value::Bool(b) => SenderProperty::leaf(name, *b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                let i = i32::try_from(i)
                    .with_context(|| format!("'{name}': {i} does not fit in an int"))?;
                SenderProperty::leaf(name, i)
            } else if let Some(f) = n.as_f64() {
                #[allow(clippy::cast_possible_truncation)]
                let f = f as f32;
                SenderProperty::leaf(name, f)
            } else {
                bail!("'{name}': unsupported number {n}");
            }
        }
        Value::Array(_) | Value::Null => bail!("'{name}': arrays and nulls are not properties"),
    };
    Ok(node)
}

/// Parse a `{ "<root>": { ... } }` document into a producer tree.
///
/// # Errors
///
/// Returns error if the JSON is invalid or does not have exactly one root key.
pub fn parse_tree(json: &str) -> Result<SenderProperty> {
    let value: Value = serde_json::from_str(json).context("Invalid tree JSON")?;
    let Value::Object(map) = &value else {
        bail!("tree JSON must be an object");
    };
    let mut roots = map.iter();
    match (roots.next(), roots.next()) {
        (Some((name, root)), None) => tree_from_json(name, root),
        _ => bail!("tree JSON must have exactly one root key"),
    }
}

/// Nudge the leaf at `path`: numbers go up by one, booleans flip, strings are rewritten as-is.
///
/// Returns `Ok(false)` if there is no leaf at `path`.
///
/// # Errors
///
/// Returns error if the leaf rejects the new value.
pub fn bump(root: &mut SenderProperty, path: &str) -> Result<bool> {
    let Some(leaf) = root.get_mut(path).and_then(SenderProperty::as_leaf_mut) else {
        return Ok(false);
    };
    let next = match leaf.value() {
        Scalar::Float(v) => Scalar::Float(v + 1.0),
        Scalar::Int(v) => Scalar::Int(v.wrapping_add(1)),
        Scalar::Bool(v) => Scalar::Bool(!v),
        Scalar::String(s) => Scalar::String(s.clone()),
    };
    leaf.set_value(next)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn portfolio_shape() {
        let root = portfolio().unwrap();

        assert_eq!(root.name(), "Portfolio");
        assert!(root.get("TICKER1/Price").is_some());
        assert!(root.get("TICKER2/Volume").is_some());
    }

    #[test]
    fn json_tree_matches_types() {
        let root = parse_tree(
            r#"{"Sensors": {"Temp": 21.5, "Count": 3, "Online": true, "Unit": "C", "Rack": {}}}"#,
        )
        .unwrap();

        assert_eq!(root.name(), "Sensors");
        let describe = root.describe();
        assert!(describe.contains("\"Temp\": 21.5"));
        assert!(describe.contains("\"Unit\": \"C\""));
        assert!(describe.contains("\"Rack\": {}"));
        assert_eq!(
            root.get("Count").unwrap().value_type(),
            proptree_core::ValueType::Int
        );
    }

    #[test]
    fn json_tree_rejects_unsupported_values() {
        assert!(parse_tree(r#"{"A": [1, 2]}"#).is_err());
        assert!(parse_tree(r#"{"A": {"B": null}}"#).is_err());
        assert!(parse_tree(r#"{"A": 1, "B": 2}"#).is_err());
        assert!(parse_tree(r#"{"A": 99999999999}"#).is_err());
        assert!(parse_tree("[]").is_err());
    }

    #[test]
    fn bump_advances_leaf() {
        let mut root = portfolio().unwrap();
        assert!(bump(&mut root, "TICKER1/Price").unwrap());
        assert!(bump(&mut root, "TICKER1/Volume").unwrap());
        assert!(!bump(&mut root, "TICKER1").unwrap());

        let describe = root.describe();
        assert!(describe.contains("\"Price\": 101"));
        assert!(describe.contains("\"Volume\": 1001"));
    }
}
