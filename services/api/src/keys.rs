//! Registry key shapes.
//!
//! Every piece of persisted fleet state lives under one of these keys; the
//! handlers never format registry keys inline.

/// Set of registered client names.
pub const CLIENTS_SET: &str = "clients";
/// Set of stash paths.
pub const STASHES_SET: &str = "stashes";
/// Set of aggregate names.
pub const AGGREGATES_SET: &str = "aggregates";

pub fn client_data(name: &str) -> String {
    format!("client:{name}")
}

pub fn client_signature(name: &str) -> String {
    format!("client:{name}:signature")
}

/// Hash of currently-firing events for a client, keyed by check name.
pub fn client_events(name: &str) -> String {
    format!("events:{name}")
}

pub fn result_data(client: &str, check: &str) -> String {
    format!("result:{client}:{check}")
}

/// Set enumerating the checks a client has results for.
pub fn result_index(client: &str) -> String {
    format!("result:{client}")
}

pub fn check_history(client: &str, check: &str) -> String {
    format!("history:{client}:{check}")
}

pub fn aggregate_members(name: &str) -> String {
    format!("aggregates:{name}")
}

pub fn stash_data(path: &str) -> String {
    format!("stash:{path}")
}
