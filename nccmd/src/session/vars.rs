//! Token-substitution table for request templates.

use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;
use log::debug;

/// The timestamp token, defaulted to the Unix time of the first 1.1 send.
pub const TIMESTAMP_TOKEN: &str = "${TIMESTAMP}";

/// Ordered `${TOKEN}` to replacement mapping.
///
/// Insertion order is the replacement order, so substitution results are
/// deterministic across runs.
#[derive(Debug, Default, Clone)]
pub struct VarTable {
    vars: IndexMap<String, String>,
}

impl VarTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable by bare name; the `${...}` wrapper is added here.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let token = format!("${{{name}}}");
        let value = value.into();
        debug!("var {token} = {value}");
        self.vars.insert(token, value);
    }

    /// Look up a variable by bare name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(&format!("${{{name}}}")).map(String::as_str)
    }

    /// Default `${TIMESTAMP}` to the current Unix time if it is absent.
    ///
    /// A caller-provided value is never overwritten mid-session.
    pub fn ensure_timestamp(&mut self) {
        self.vars
            .entry(TIMESTAMP_TOKEN.to_string())
            .or_insert_with(unix_time_string);
    }

    /// Replace every known token occurrence in `line`.
    pub fn substitute(&self, line: &str) -> String {
        let mut out = line.to_string();
        for (token, value) in &self.vars {
            out = out.replace(token, value);
        }
        out
    }
}

fn unix_time_string() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    now.as_secs().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_every_occurrence() {
        let mut vars = VarTable::new();
        vars.set("HOSTNAME", "host.domain");
        assert_eq!(
            vars.substitute("<name>${HOSTNAME}</name><alt>${HOSTNAME}</alt>"),
            "<name>host.domain</name><alt>host.domain</alt>"
        );
    }

    #[test]
    fn unknown_tokens_pass_through() {
        let vars = VarTable::new();
        assert_eq!(vars.substitute("<id>${NOPE}</id>"), "<id>${NOPE}</id>");
    }

    #[test]
    fn ensure_timestamp_never_overwrites_caller_value() {
        let mut vars = VarTable::new();
        vars.set("TIMESTAMP", "1700000000");
        vars.ensure_timestamp();
        assert_eq!(vars.get("TIMESTAMP"), Some("1700000000"));
        assert_eq!(
            vars.substitute("<rpc message-id=\"${TIMESTAMP}\"/>"),
            "<rpc message-id=\"1700000000\"/>"
        );
    }

    #[test]
    fn ensure_timestamp_fills_absent_value() {
        let mut vars = VarTable::new();
        vars.ensure_timestamp();
        let value = vars.get("TIMESTAMP").unwrap().to_string();
        assert!(value.parse::<u64>().is_ok());

        // A second call keeps the first value.
        vars.ensure_timestamp();
        assert_eq!(vars.get("TIMESTAMP"), Some(value.as_str()));
    }
}
