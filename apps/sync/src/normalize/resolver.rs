//! Field Resolver: tolerates backend field-naming drift.
//!
//! None of these functions can fail: absent or unusable input yields `None`
//! or an empty label.

use serde_json::Value;

use crate::model::choices::ChoiceMap;

/// Returns the first non-null value found under `keys`, in order.
/// A non-object `record` resolves nothing.
pub fn resolve<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find(|value| !value.is_null())
}

/// Decodes a choice code (integer) or alternate label (string) into the
/// canonical label.
///
/// Unknown codes decode to `""`. Strings that match no known label pass
/// through trimmed so labels added server-side still display. Any other
/// JSON type decodes to `""`.
pub fn decode_choice(value: &Value, map: &ChoiceMap) -> String {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .and_then(|code| map.label(code))
            .unwrap_or_default()
            .to_string(),
        Value::String(raw) => match map.canonical_label(raw) {
            Some(label) => label.to_string(),
            None => raw.trim().to_string(),
        },
        _ => String::new(),
    }
}

/// Encodes a label back to its backend code; unknown labels get the map default.
pub fn encode_choice(label: &str, map: &ChoiceMap) -> u8 {
    map.code(label).unwrap_or(map.default_code)
}

/// Parses numbers that may arrive as currency-formatted strings ("$80,000").
/// Strings keep only digits and `.` before parsing.
pub fn parse_loose_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            cleaned.parse::<f64>().ok().filter(|f| f.is_finite())
        }
        _ => None,
    }
}
