//! Negation of running-configuration lines

use std::collections::HashSet;

use nexus_cfgmgr_common::{Settings, DEFAULT_IGNORE_CLEAR};

use crate::commands::NEGATE_PREFIX;

/// Negated commands that are never emitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreList(HashSet<String>);

impl IgnoreList {
    /// Build an ignore list from negated command strings
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(entries.into_iter().map(Into::into).collect())
    }

    /// An ignore list that drops nothing
    pub fn empty() -> Self {
        Self(HashSet::new())
    }

    /// Ignore list configured in `settings`
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.clear.ignore.iter().map(String::as_str))
    }

    pub fn contains(&self, command: &str) -> bool {
        self.0.contains(command)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for IgnoreList {
    fn default() -> Self {
        Self::new(DEFAULT_IGNORE_CLEAR.iter().copied())
    }
}

/// Turns configuration lines into the commands that undo them
#[derive(Debug, Clone, Default)]
pub struct NegationEngine {
    ignore: IgnoreList,
}

impl NegationEngine {
    pub fn new(ignore: IgnoreList) -> Self {
        Self { ignore }
    }

    pub fn ignore_list(&self) -> &IgnoreList {
        &self.ignore
    }

    /// Prefix every line with `no `, dropping ignore-listed results
    pub fn negate(&self, lines: &[String]) -> Vec<String> {
        lines
            .iter()
            .map(|line| format!("{}{}", NEGATE_PREFIX, line))
            .filter(|negated| !self.ignore.contains(negated))
            .collect()
    }
}
