//! Client payload validation.
//!
//! # Purpose
//! Registration payloads arrive as arbitrary JSON; the validator is the
//! pluggable predicate that decides whether a payload may be written to the
//! registry.
use crate::model::valid_resource_name;
use serde_json::{Map, Value};

/// Capability consulted by client registration.
pub trait ClientValidator: Send + Sync {
    fn valid(&self, client: &Map<String, Value>) -> bool;
}

/// Default validator: requires a well-formed name and sane types for the
/// optional fields the platform understands.
#[derive(Debug, Default)]
pub struct StandardValidator;

impl StandardValidator {
    pub fn new() -> Self {
        Self
    }
}

impl ClientValidator for StandardValidator {
    fn valid(&self, client: &Map<String, Value>) -> bool {
        let Some(name) = client.get("name").and_then(Value::as_str) else {
            return false;
        };
        if !valid_resource_name(name) {
            return false;
        }
        // Optional fields may be absent or null, but not mistyped.
        match client.get("address") {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(_) => return false,
        }
        match client.get("subscriptions") {
            None | Some(Value::Null) => {}
            Some(Value::Array(subscriptions)) => {
                if !subscriptions.iter().all(Value::is_string) {
                    return false;
                }
            }
            Some(_) => return false,
        }
        true
    }
}
