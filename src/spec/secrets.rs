use crate::{Error, Result};
use std::collections::HashMap;

/// Placeholder-token store, e.g. `<ACCOUNT_PASSWORD>` -> the real password.
///
/// Built once per run from the process environment and CLI overrides, read-only
/// afterward. Lookup is a pass-through: unknown tokens resolve to themselves,
/// so literal text flows through `resolve` unchanged.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    values: HashMap<String, String>,
}

impl Secrets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one token. Bare names are wrapped in angle brackets.
    pub fn set(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.values.insert(token_for(name.as_ref()), value.into());
        self
    }

    /// Source every process environment variable as `<NAME>`.
    pub fn with_env(self) -> Self {
        self.with_env_filtered(None)
    }

    /// Source environment variables whose names start with `prefix` (the
    /// bundle selector), or all of them when no prefix is given.
    pub fn with_env_filtered(mut self, prefix: Option<&str>) -> Self {
        for (name, value) in std::env::vars() {
            if prefix.map_or(true, |p| name.starts_with(p)) {
                self.values.insert(token_for(&name), value);
            }
        }
        self
    }

    /// Overlay CLI overrides given as `NAME=value`.
    pub fn with_args(mut self, args: &[String]) -> Result<Self> {
        for arg in args {
            let (name, value) = arg.split_once('=').ok_or_else(|| {
                Error::Config(format!("invalid param '{}', expected NAME=value", arg))
            })?;
            self.values.insert(token_for(name), value.to_string());
        }
        Ok(self)
    }

    /// Resolve one token: the stored value when known, the input unchanged
    /// otherwise.
    pub fn resolve(&self, token: &str) -> String {
        self.values
            .get(token)
            .cloned()
            .unwrap_or_else(|| token.to_string())
    }

    /// Resolve each fragment and join with `,`.
    pub fn resolve_all(&self, fragments: &[&str]) -> String {
        fragments
            .iter()
            .map(|f| self.resolve(f))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn token_for(name: &str) -> String {
    if name.starts_with('<') && name.ends_with('>') {
        name.to_string()
    } else {
        format!("<{}>", name)
    }
}
