//! Environment snapshot and `${NAME}` placeholder expansion.

use std::collections::HashMap;

use derive_more::Deref;

/// Process variables captured once at start-up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref)]
pub struct Environment(HashMap<String, String>);

impl Environment {
    pub fn from_process() -> Self {
        Self(std::env::vars().collect())
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// A variable's value; empty values count as missing.
    pub fn var(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Replace every `${NAME}` in `input`.
    ///
    /// Returns the names of all unset variables when any is missing. An
    /// unterminated `${` is kept verbatim.
    pub fn expand(&self, input: &str) -> Result<String, Vec<String>> {
        let mut output = String::with_capacity(input.len());
        let mut missing = Vec::new();
        let mut rest = input;

        while let Some(start) = rest.find("${") {
            output.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                output.push_str(&rest[start..]);
                rest = "";
                break;
            };

            let name = &after[..end];
            match self.var(name) {
                Some(value) => output.push_str(value),
                None => missing.push(name.to_string()),
            }
            rest = &after[end + 1..];
        }
        output.push_str(rest);

        if missing.is_empty() {
            Ok(output)
        } else {
            Err(missing)
        }
    }
}
