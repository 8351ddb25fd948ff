//! JSON body parsing and rule validation.
//!
//! # Purpose
//! Mutating endpoints accept JSON objects validated against per-key rules.
//! A rule passes when the value's type matches and, if a pattern is
//! configured, the value matches it at position 0; a `nil_ok` rule also
//! accepts an absent or null value. Any parse error or rule failure is a 400.
use super::error::{ApiError, bad_request};
use regex::Regex;
use serde_json::{Map, Value};

/// Pattern shared by client, check, and source names.
pub(crate) const NAME_PATTERN: &str = r"^[A-Za-z0-9_.\-]+$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    String,
    Integer,
    Array,
    Object,
}

impl Kind {
    fn matches(&self, value: &Value) -> bool {
        match self {
            Kind::String => value.is_string(),
            Kind::Integer => value.is_i64() || value.is_u64(),
            Kind::Array => value.is_array(),
            Kind::Object => value.is_object(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Rule {
    key: &'static str,
    kind: Kind,
    nil_ok: bool,
    pattern: Option<Regex>,
}

impl Rule {
    pub(crate) fn required(key: &'static str, kind: Kind) -> Self {
        Self {
            key,
            kind,
            nil_ok: false,
            pattern: None,
        }
    }

    pub(crate) fn optional(key: &'static str, kind: Kind) -> Self {
        Self {
            key,
            kind,
            nil_ok: true,
            pattern: None,
        }
    }

    pub(crate) fn matching(mut self, pattern: &str) -> Self {
        self.pattern = Some(Regex::new(pattern).expect("rule pattern"));
        self
    }

    fn passes(&self, value: Option<&Value>) -> bool {
        match value {
            None | Some(Value::Null) => self.nil_ok,
            Some(value) => self.kind.matches(value) && self.pattern_matches(value),
        }
    }

    // A configured pattern must match at position 0; without one the type
    // check alone decides.
    fn pattern_matches(&self, value: &Value) -> bool {
        match &self.pattern {
            None => true,
            Some(pattern) => value
                .as_str()
                .is_some_and(|text| pattern.find(text).is_some_and(|found| found.start() == 0)),
        }
    }
}

/// Parse the body as a JSON object, or 400.
pub(crate) fn read_object(bytes: &[u8]) -> Result<Map<String, Value>, ApiError> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(object)) => Ok(object),
        _ => Err(bad_request()),
    }
}

/// Parse the body and apply every rule, or 400.
pub(crate) fn read_data(bytes: &[u8], rules: &[Rule]) -> Result<Map<String, Value>, ApiError> {
    let object = read_object(bytes)?;
    for rule in rules {
        if !rule.passes(object.get(rule.key)) {
            return Err(bad_request());
        }
    }
    Ok(object)
}

/// Fetch a rule-validated string field.
pub(crate) fn string_field<'a>(
    object: &'a Map<String, Value>,
    key: &str,
) -> Result<&'a str, ApiError> {
    object
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(bad_request)
}
