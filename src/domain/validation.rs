//! Declarative report validation.
//!
//! Every accepted input shape (create body, update body, list query) is
//! described by a table of [`FieldRule`]s and checked by the same engine.
//! The engine never short-circuits: it walks every rule and returns the
//! full list of violations, or a normalized record with strings trimmed
//! and unknown keys dropped.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::error::Violation;
use super::report::{
    ListOptions, MAX_LIST_LIMIT, NewReport, ReportFilter, ReportPatch, SortField, SortOrder,
    ThreatLevel,
};

static FIELD_CODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9-]+$").expect("field code pattern is valid"));

/// Named text patterns a rule can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextPattern {
    /// Uppercase letters, digits and hyphens.
    FieldCode,
}

impl TextPattern {
    fn is_match(self, value: &str) -> bool {
        match self {
            Self::FieldCode => FIELD_CODE_PATTERN.is_match(value),
        }
    }

    const fn message(self) -> &'static str {
        match self {
            Self::FieldCode => "must contain only uppercase letters, numbers, and hyphens",
        }
    }
}

/// Shape constraint for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Trimmed string with a length range in characters.
    Text {
        min_len: usize,
        max_len: usize,
        pattern: Option<TextPattern>,
    },
    /// Whole number in an inclusive range.
    Integer { min: i64, max: i64 },
    /// `true` / `false`.
    Boolean,
}

/// One row of a rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldRule {
    const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

/// Where the raw values come from. Query strings carry everything as text,
/// so numbers and booleans are parsed out of strings there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Body,
    Query,
}

const FIELD_CODE: FieldKind = FieldKind::Text {
    min_len: 2,
    max_len: 20,
    pattern: Some(TextPattern::FieldCode),
};
/// Listing filters only check the syntax of a field code.
const FIELD_CODE_FILTER: FieldKind = FieldKind::Text {
    min_len: 1,
    max_len: usize::MAX,
    pattern: Some(TextPattern::FieldCode),
};
const LOCATION: FieldKind = FieldKind::Text {
    min_len: 3,
    max_len: 100,
    pattern: None,
};
const THREAT_LEVEL: FieldKind = FieldKind::Integer {
    min: ThreatLevel::MIN as i64,
    max: ThreatLevel::MAX as i64,
};
const DESCRIPTION: FieldKind = FieldKind::Text {
    min_len: 10,
    max_len: 1000,
    pattern: None,
};

/// Rules for `POST /reports`.
pub const CREATE_RULES: &[FieldRule] = &[
    FieldRule::required("fieldCode", FIELD_CODE),
    FieldRule::required("location", LOCATION),
    FieldRule::required("threatLevel", THREAT_LEVEL),
    FieldRule::required("description", DESCRIPTION),
];

/// Rules for partial updates. At least one field must be present.
pub const UPDATE_RULES: &[FieldRule] = &[
    FieldRule::optional("fieldCode", FIELD_CODE),
    FieldRule::optional("location", LOCATION),
    FieldRule::optional("threatLevel", THREAT_LEVEL),
    FieldRule::optional("description", DESCRIPTION),
    FieldRule::optional("confirmed", FieldKind::Boolean),
];

/// Rules for list query parameters.
pub const LIST_QUERY_RULES: &[FieldRule] = &[
    FieldRule::optional("threatLevel", THREAT_LEVEL),
    FieldRule::optional("confirmed", FieldKind::Boolean),
    FieldRule::optional("fieldCode", FIELD_CODE_FILTER),
    FieldRule::optional(
        "limit",
        FieldKind::Integer {
            min: 1,
            max: MAX_LIST_LIMIT as i64,
        },
    ),
    FieldRule::optional(
        "skip",
        FieldKind::Integer {
            min: 0,
            max: i64::MAX,
        },
    ),
];

/// Check `input` against `rules`, collecting every violation.
///
/// On success returns only the fields named by the rules, normalized:
/// strings trimmed, numbers as integers, booleans as booleans.
///
/// # Errors
/// Returns all violations found, in rule order.
pub fn check(
    input: &Value,
    rules: &[FieldRule],
    source: Source,
) -> Result<Map<String, Value>, Vec<Violation>> {
    let Some(object) = input.as_object() else {
        return Err(vec![Violation::new("value", "\"value\" must be of type object")]);
    };

    let mut normalized = Map::new();
    let mut violations = Vec::new();

    for rule in rules {
        match object.get(rule.name) {
            None => {
                if rule.required {
                    violations.push(Violation::new(
                        rule.name,
                        format!("\"{}\" is required", rule.name),
                    ));
                }
            }
            Some(raw) => {
                if let Some(value) = check_field(rule, raw, source, &mut violations) {
                    normalized.insert(rule.name.to_string(), value);
                }
            }
        }
    }

    if violations.is_empty() {
        Ok(normalized)
    } else {
        Err(violations)
    }
}

/// Returns the normalized value when the field passes every rule.
fn check_field(
    rule: &FieldRule,
    raw: &Value,
    source: Source,
    violations: &mut Vec<Violation>,
) -> Option<Value> {
    let name = rule.name;
    let before = violations.len();

    let value = match rule.kind {
        FieldKind::Text {
            min_len,
            max_len,
            pattern,
        } => {
            let Some(text) = raw.as_str() else {
                violations.push(Violation::new(name, format!("\"{name}\" must be a string")));
                return None;
            };
            let text = text.trim();
            if text.is_empty() {
                violations.push(Violation::new(
                    name,
                    format!("\"{name}\" is not allowed to be empty"),
                ));
                return None;
            }
            let len = text.chars().count();
            if len < min_len {
                violations.push(Violation::new(
                    name,
                    format!("\"{name}\" length must be at least {min_len} characters long"),
                ));
            }
            if len > max_len {
                violations.push(Violation::new(
                    name,
                    format!(
                        "\"{name}\" length must be less than or equal to {max_len} characters long"
                    ),
                ));
            }
            if let Some(pattern) = pattern {
                if !pattern.is_match(text) {
                    violations.push(Violation::new(
                        name,
                        format!("\"{name}\" {}", pattern.message()),
                    ));
                }
            }
            Value::String(text.to_string())
        }
        FieldKind::Integer { min, max } => {
            let number = match integer_value(raw, source) {
                Ok(n) => n,
                Err(message) => {
                    violations.push(Violation::new(name, format!("\"{name}\" {message}")));
                    return None;
                }
            };
            if number < min {
                violations.push(Violation::new(
                    name,
                    format!("\"{name}\" must be greater than or equal to {min}"),
                ));
            }
            if number > max {
                violations.push(Violation::new(
                    name,
                    format!("\"{name}\" must be less than or equal to {max}"),
                ));
            }
            Value::from(number)
        }
        FieldKind::Boolean => match boolean_value(raw, source) {
            Some(flag) => Value::Bool(flag),
            None => {
                violations.push(Violation::new(name, format!("\"{name}\" must be a boolean")));
                return None;
            }
        },
    };

    (violations.len() == before).then_some(value)
}

#[allow(clippy::cast_possible_truncation)]
fn integer_value(raw: &Value, source: Source) -> Result<i64, &'static str> {
    let number = match (raw, source) {
        (Value::Number(n), _) => n.as_f64(),
        (Value::String(s), Source::Query) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    let Some(number) = number.filter(|n| n.is_finite()) else {
        return Err("must be a number");
    };
    if let Some(exact) = raw.as_i64() {
        return Ok(exact);
    }
    if number.fract() != 0.0 {
        return Err("must be an integer");
    }
    Ok(number as i64)
}

fn boolean_value(raw: &Value, source: Source) -> Option<bool> {
    match (raw, source) {
        (Value::Bool(b), _) => Some(*b),
        (Value::String(s), Source::Query) => match s.trim() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

// ────────────────────────────────────────────
// Typed entry points
// ────────────────────────────────────────────

/// Validate a creation body into a [`NewReport`].
///
/// # Errors
/// Returns every violated rule.
pub fn validate_new_report(input: &Value) -> Result<NewReport, Vec<Violation>> {
    let fields = check(input, CREATE_RULES, Source::Body)?;
    let threat_level = threat_level_of(&fields).ok_or_else(|| {
        vec![Violation::new("threatLevel", "\"threatLevel\" is required")]
    })?;

    Ok(NewReport {
        field_code: string_of(&fields, "fieldCode").unwrap_or_default(),
        location: string_of(&fields, "location").unwrap_or_default(),
        threat_level,
        description: string_of(&fields, "description").unwrap_or_default(),
        timestamp: None,
    })
}

/// Validate a partial update body into a non-empty [`ReportPatch`].
///
/// # Errors
/// Returns every violated rule, including an empty update.
pub fn validate_patch(input: &Value) -> Result<ReportPatch, Vec<Violation>> {
    let fields = check(input, UPDATE_RULES, Source::Body)?;
    let patch = ReportPatch {
        field_code: string_of(&fields, "fieldCode"),
        location: string_of(&fields, "location"),
        threat_level: threat_level_of(&fields),
        description: string_of(&fields, "description"),
        confirmed: fields.get("confirmed").and_then(Value::as_bool),
    };

    if patch.is_empty() {
        return Err(vec![Violation::new(
            "value",
            "\"value\" must have at least 1 key",
        )]);
    }
    Ok(patch)
}

/// Validate list query parameters into a filter and page options.
///
/// # Errors
/// Returns every violated rule.
pub fn validate_list_query(
    params: &HashMap<String, String>,
) -> Result<(ReportFilter, ListOptions), Vec<Violation>> {
    let raw: Map<String, Value> = params
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    let fields = check(&Value::Object(raw), LIST_QUERY_RULES, Source::Query)?;

    let filter = ReportFilter {
        field_code: string_of(&fields, "fieldCode"),
        threat_level: threat_level_of(&fields),
        min_threat_level: None,
        confirmed: fields.get("confirmed").and_then(Value::as_bool),
    };
    let defaults = ListOptions::default();
    let options = ListOptions {
        limit: fields
            .get("limit")
            .and_then(Value::as_u64)
            .and_then(|l| u32::try_from(l).ok())
            .unwrap_or(defaults.limit),
        skip: fields
            .get("skip")
            .and_then(Value::as_u64)
            .unwrap_or(defaults.skip),
        sort_field: SortField::Timestamp,
        sort_order: SortOrder::Descending,
    };
    Ok((filter, options))
}

fn string_of(fields: &Map<String, Value>, name: &str) -> Option<String> {
    fields.get(name).and_then(Value::as_str).map(str::to_string)
}

fn threat_level_of(fields: &Map<String, Value>) -> Option<ThreatLevel> {
    fields
        .get("threatLevel")
        .and_then(Value::as_i64)
        .and_then(ThreatLevel::new)
}
