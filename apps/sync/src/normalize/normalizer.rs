//! Payload Normalizer: turns whatever JSON the backend returns into a
//! `CanonicalPatch`.
//!
//! Algorithm:
//! 1. Unwrap envelope keys (`resume`, `data`, `parsed_data`, ...) until none
//!    match; the innermost record is the candidate.
//! 2. Copy through any section the candidate already carries under one of its
//!    section keys.
//! 3. If nothing was pre-shaped, distribute recognizable flat fields
//!    (`name`, `email`, `skills`, ...) into sections.
//! 4. Every field goes through alias resolution and kind coercion.
//!
//! Explicitly provided sections survive even when empty; sections built from
//! flat fields only appear when at least one field resolved.

use std::borrow::Cow;

use serde_json::{Map, Number, Value};
use thiserror::Error;
use tracing::debug;

use crate::model::schema::{self, FieldKind, FieldSpec};
use crate::model::{CanonicalPatch, Section, SectionKind};
use crate::normalize::resolver::{decode_choice, parse_loose_number, resolve};

/// Wrapper keys under which the real payload may be nested, highest priority first.
pub const ENVELOPE_KEYS: &[&str] = &[
    "resume",
    "data",
    "parsed_data",
    "resume_data",
    "parsedData",
    "resumeData",
    "profile",
];

const MAX_ENVELOPE_DEPTH: usize = 4;

const HAS_DATA_KEYS: &[&str] = &["has_resume_data", "hasResumeData", "resume_ready"];
const FAILURE_MESSAGE_KEYS: &[&str] = &["error", "message", "detail", "error_message"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationError {
    #[error("expected a JSON object payload, found {found}")]
    NotAnObject { found: &'static str },

    #[error("envelope '{key}' holds a string that is not valid JSON")]
    MalformedEnvelope { key: &'static str },
}

/// Normalizes a raw backend payload into a canonical patch.
pub fn normalize(payload: &Value) -> Result<CanonicalPatch, NormalizationError> {
    let root = payload.as_object().ok_or(NormalizationError::NotAnObject {
        found: json_type(payload),
    })?;
    let candidate = locate_envelope(root)?;

    let mut patch = CanonicalPatch::default();
    for kind in SectionKind::ALL {
        if let Some(section) = find_section(&candidate, kind) {
            patch.set(kind, shape_section(kind, section));
        }
    }

    if patch.is_empty() {
        patch = distribute_flat(&candidate);
    }

    Ok(patch)
}

/// Reads the "has resume data" flag some status responses carry.
pub fn has_resume_data_flag(payload: &Value) -> bool {
    match resolve(payload, HAS_DATA_KEYS) {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1"),
        _ => false,
    }
}

/// Failure detail from a status payload, if it carries a non-empty string.
pub fn failure_message(payload: &Value) -> Option<String> {
    FAILURE_MESSAGE_KEYS
        .iter()
        .filter_map(|key| payload.get(*key))
        .filter_map(|value| match value {
            Value::String(s) => Some(s.trim()),
            Value::Object(inner) => inner.get("message").and_then(Value::as_str).map(str::trim),
            _ => None,
        })
        .find(|s| !s.is_empty())
        .map(String::from)
}

fn locate_envelope(root: &Map<String, Value>) -> Result<Cow<'_, Map<String, Value>>, NormalizationError> {
    let mut current = Cow::Borrowed(root);
    for _ in 0..MAX_ENVELOPE_DEPTH {
        // A level that already carries sections is the record itself; any
        // envelope key beside them is metadata.
        if has_section(&current) {
            break;
        }
        match unwrap_envelope(&current)? {
            Some(inner) => current = Cow::Owned(inner),
            None => break,
        }
    }
    Ok(current)
}

fn unwrap_envelope(map: &Map<String, Value>) -> Result<Option<Map<String, Value>>, NormalizationError> {
    for key in ENVELOPE_KEYS {
        match map.get(*key) {
            Some(Value::Object(inner)) => return Ok(Some(inner.clone())),
            // Some endpoints double-encode the parsed resume as a JSON string.
            Some(Value::String(raw)) if raw.trim_start().starts_with('{') => {
                return match serde_json::from_str::<Value>(raw) {
                    Ok(Value::Object(inner)) => Ok(Some(inner)),
                    _ => Err(NormalizationError::MalformedEnvelope { key: *key }),
                };
            }
            _ => continue,
        }
    }
    Ok(None)
}

fn has_section(map: &Map<String, Value>) -> bool {
    SectionKind::ALL
        .into_iter()
        .any(|kind| find_section(map, kind).is_some())
}

fn find_section(candidate: &Map<String, Value>, kind: SectionKind) -> Option<&Map<String, Value>> {
    kind.section_keys()
        .iter()
        .find_map(|key| candidate.get(*key).and_then(Value::as_object))
}

/// Shapes a pre-shaped section: known fields are resolved and coerced under
/// their canonical names, unknown fields pass through untouched.
fn shape_section(kind: SectionKind, raw: &Map<String, Value>) -> Section {
    let specs = schema::fields(kind);
    let record = Value::Object(raw.clone());
    let mut section = Section::new();

    for spec in specs {
        if let Some(value) = resolve(&record, spec.aliases).and_then(|v| coerce(spec, v)) {
            section.insert(spec.name, value);
        }
    }

    for (key, value) in raw {
        if value.is_null() || specs.iter().any(|spec| spec.is_alias(key)) {
            continue;
        }
        section.insert(key.clone(), value.clone());
    }

    section
}

fn distribute_flat(candidate: &Map<String, Value>) -> CanonicalPatch {
    let record = Value::Object(candidate.clone());
    let mut patch = CanonicalPatch::default();

    for kind in SectionKind::ALL {
        let section: Section = schema::fields(kind)
            .iter()
            .filter(|spec| !spec.flat.is_empty())
            .filter_map(|spec| {
                resolve(&record, spec.flat)
                    .and_then(|v| coerce(spec, v))
                    .map(|v| (spec.name.to_string(), v))
            })
            .collect();
        if !section.is_empty() {
            patch.set(kind, section);
        }
    }

    patch
}

fn coerce(spec: &FieldSpec, value: &Value) -> Option<Value> {
    let coerced = match spec.kind {
        FieldKind::Text => coerce_text(value),
        FieldKind::List => coerce_list(value),
        FieldKind::Number => parse_loose_number(value).and_then(number_value),
        FieldKind::Bool => coerce_bool(value),
        FieldKind::Records => coerce_records(value),
        FieldKind::Choice(map) => {
            let label = decode_choice(value, map);
            (!label.is_empty()).then_some(Value::String(label))
        }
    };
    if coerced.is_none() {
        debug!(field = spec.name, %value, "dropping field that could not be coerced");
    }
    coerced
}

fn coerce_text(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) => Some(Value::String(s.trim().to_string())),
        Value::Number(n) => Some(Value::String(n.to_string())),
        Value::Bool(b) => Some(Value::String(b.to_string())),
        _ => None,
    }
}

fn coerce_list(value: &Value) -> Option<Value> {
    let items: Vec<Value> = match value {
        Value::Array(items) => items.iter().filter_map(list_item).collect(),
        Value::String(s) => s
            .split([',', ';'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Value::String(s.to_string()))
            .collect(),
        _ => return None,
    };
    Some(Value::Array(items))
}

fn list_item(item: &Value) -> Option<Value> {
    let text = match item {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        // Skill objects such as {"name": "Rust", "level": 4}.
        Value::Object(obj) => ["name", "skill", "title", "label"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_str))?
            .trim()
            .to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(Value::String(text))
}

fn coerce_bool(value: &Value) -> Option<Value> {
    let flag = match value {
        Value::Bool(b) => *b,
        Value::Number(n) => match n.as_i64() {
            Some(0) => false,
            Some(1) => true,
            _ => return None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => true,
            "false" | "no" | "n" | "0" => false,
            _ => return None,
        },
        _ => return None,
    };
    Some(Value::Bool(flag))
}

fn coerce_records(value: &Value) -> Option<Value> {
    match value {
        Value::Array(items) => Some(Value::Array(
            items.iter().filter(|item| !item.is_null()).cloned().collect(),
        )),
        Value::Object(_) => Some(Value::Array(vec![value.clone()])),
        _ => None,
    }
}

/// Whole numbers become JSON integers so re-normalizing is stable.
fn number_value(f: f64) -> Option<Value> {
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(Value::from(f as i64))
    } else {
        Number::from_f64(f).map(Value::Number)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
