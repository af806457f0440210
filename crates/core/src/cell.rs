//! Typed-cell decoding for Data API result rows.
//!
//! The Data API returns every column as a record tagged by the kind of value
//! it carries (`{"stringValue": "…"}`, `{"isNull": true}`, …). [`decode_cell`]
//! flattens those records into plain JSON values and never fails: shapes it
//! does not recognize fall back to their first value.

use serde_json::{Map, Value};

/// Scalar tags, in lookup order.
const SCALAR_KEYS: [&str; 7] = [
    "doubleValue",
    "longValue",
    "intValue",
    "realValue",
    "stringValue",
    "booleanValue",
    "blobValue",
];

/// Typed lists inside a Data API `arrayValue` object.
const ARRAY_LIST_KEYS: [&str; 4] = ["longValues", "doubleValues", "stringValues", "booleanValues"];

pub fn decode_cell(cell: &Value) -> Value {
    let Value::Object(record) = cell else {
        return cell.clone();
    };

    if record.get("isNull").and_then(Value::as_bool) == Some(true) {
        return Value::Null;
    }

    if let Some(value) = SCALAR_KEYS.iter().find_map(|key| record.get(*key)) {
        return value.clone();
    }

    if let Some(Value::Array(items)) = record.get("arrayValues") {
        return Value::Array(items.iter().map(decode_cell).collect());
    }

    if let Some(Value::Object(array)) = record.get("arrayValue") {
        return decode_array_value(array);
    }

    if let Some(nested) = record.get("structValue") {
        return nested.clone();
    }

    record.values().next().cloned().unwrap_or(Value::Null)
}

/// Decodes every cell of a row, preserving column order.
pub fn decode_row(row: &[Value]) -> Vec<Value> {
    row.iter().map(decode_cell).collect()
}

fn decode_array_value(array: &Map<String, Value>) -> Value {
    if let Some(list) = ARRAY_LIST_KEYS.iter().find_map(|key| array.get(*key)) {
        return list.clone();
    }

    match array.get("arrayValues") {
        Some(Value::Array(nested)) => Value::Array(
            nested
                .iter()
                .map(|item| match item {
                    Value::Object(inner) => decode_array_value(inner),
                    other => other.clone(),
                })
                .collect(),
        ),
        _ => Value::Array(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::{decode_cell, decode_row};

    #[test]
    fn single_scalar_tag_returns_value_unchanged() {
        let cases = [
            (json!({"doubleValue": 12.5}), json!(12.5)),
            (json!({"longValue": 9_000_000_000_i64}), json!(9_000_000_000_i64)),
            (json!({"intValue": 7}), json!(7)),
            (json!({"realValue": 0.25}), json!(0.25)),
            (json!({"stringValue": "CR-001"}), json!("CR-001")),
            (json!({"stringValue": ""}), json!("")),
            (json!({"booleanValue": false}), json!(false)),
        ];

        for (cell, expected) in cases {
            assert_eq!(decode_cell(&cell), expected, "cell {cell}");
        }
    }

    #[test]
    fn null_marker_wins_over_other_tags() {
        assert_eq!(decode_cell(&json!({"isNull": true})), Value::Null);
        assert_eq!(decode_cell(&json!({"isNull": true, "stringValue": "stale"})), Value::Null);
        assert_eq!(decode_cell(&json!({"stringValue": "kept", "isNull": false})), json!("kept"));
    }

    #[test]
    fn array_of_cells_decodes_element_wise_and_recursively() {
        let cell = json!({
            "arrayValues": [
                {"longValue": 1},
                {"isNull": true},
                {"arrayValues": [{"stringValue": "a"}, {"arrayValues": []}]},
            ]
        });

        assert_eq!(decode_cell(&cell), json!([1, null, ["a", []]]));
    }

    #[test]
    fn data_api_array_value_object_yields_its_typed_list() {
        let flat = json!({"arrayValue": {"stringValues": ["x", "y"]}});
        assert_eq!(decode_cell(&flat), json!(["x", "y"]));

        let nested = json!({
            "arrayValue": {"arrayValues": [{"longValues": [1, 2]}, {"doubleValues": [0.5]}]}
        });
        assert_eq!(decode_cell(&nested), json!([[1, 2], [0.5]]));
    }

    #[test]
    fn struct_value_is_returned_raw() {
        let nested = json!({"attributes": [{"stringValue": "x"}]});
        assert_eq!(decode_cell(&json!({"structValue": nested.clone()})), nested);
    }

    #[test]
    fn plain_values_pass_through() {
        for value in [json!("raw"), json!(3), json!(null), json!([1, 2])] {
            assert_eq!(decode_cell(&value), value);
        }
    }

    #[test]
    fn unknown_shapes_fall_back_to_first_value() {
        assert_eq!(decode_cell(&json!({"decimalValue": "10.00", "other": 1})), json!("10.00"));
        assert_eq!(decode_cell(&json!({})), Value::Null);
    }

    #[test]
    fn decode_row_keeps_column_order() {
        let row = vec![
            json!({"stringValue": "001"}),
            json!({"stringValue": "Ana"}),
            json!({"stringValue": "PEN"}),
            json!({"doubleValue": 10.0}),
        ];

        assert_eq!(decode_row(&row), vec![json!("001"), json!("Ana"), json!("PEN"), json!(10.0)]);
    }
}
