//! Entry aliases
//!
//! An alias maps a short name to a fully-qualified target name. When no
//! short name is given it defaults to the lowercased last `::` segment
//! of the target, so `demo::util::Clock` is reachable as `clock`.

use dashmap::DashMap;

/// A (short-name, target-name) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    name: Option<String>,
    target: String,
}

impl Alias {
    /// Alias whose short name is derived from the target's last segment.
    pub fn new(target: &str) -> Self {
        Self {
            name: None,
            target: target.to_string(),
        }
    }

    pub fn named(name: &str, target: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            target: target.to_string(),
        }
    }

    pub fn name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => short_name(&self.target),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

fn short_name(target: &str) -> String {
    let last = target.rsplit("::").next().unwrap_or(target);
    last.to_lowercase()
}

/// Process-wide index of short name to target name.
#[derive(Debug, Default)]
pub struct AliasIndex {
    aliases: DashMap<String, String>,
}

impl AliasIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, alias: Alias) {
        self.aliases.insert(alias.name(), alias.target().to_string());
    }

    pub fn contains(&self, short: &str) -> bool {
        self.aliases.contains_key(short)
    }

    pub fn target_of(&self, short: &str) -> Option<String> {
        self.aliases.get(short).map(|entry| entry.value().clone())
    }

    /// Register the derived alias for a target and return the short name.
    pub fn register_target(&self, target: &str) -> String {
        let alias = Alias::new(target);
        let short = alias.name();
        self.insert(alias);
        short
    }
}
