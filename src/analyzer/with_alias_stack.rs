use indexmap::IndexMap;
use tracing::trace;

use crate::{analyzer::AnalyzerError, types::Type};

/// What a visible WITH alias resolves to.
#[derive(Debug, Clone, PartialEq)]
pub struct WithEntryInfo {
    /// Statement-unique name of the entry.
    pub unique_alias: String,
    pub columns: Vec<(String, Type)>,
    /// References read the recursive term under construction.
    pub recursive: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Entry(WithEntryInfo),
    /// Blocks the alias while the non-recursive term of a recursive entry
    /// is resolved.
    Poisoned,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WithLookup<'a> {
    Entry(&'a WithEntryInfo),
    Poisoned,
}

/// Returned by a push; the matching pop must present it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct WithToken(u64);

/// Visible WITH aliases. Inner entries shadow outer ones with the same name
/// and are removed in LIFO order.
#[derive(Debug, Default)]
pub struct WithAliasStack {
    slots: IndexMap<String, Vec<(WithToken, Slot)>>,
    next_token: u64,
    alias_uses: IndexMap<String, usize>,
}

impl WithAliasStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_entry(&mut self, alias: &str, info: WithEntryInfo) -> WithToken {
        self.push(alias, Slot::Entry(info))
    }

    pub fn push_poisoned(&mut self, alias: &str) -> WithToken {
        self.push(alias, Slot::Poisoned)
    }

    fn push(&mut self, alias: &str, slot: Slot) -> WithToken {
        self.next_token += 1;
        let token = WithToken(self.next_token);
        trace!(alias, poisoned = matches!(slot, Slot::Poisoned), "with entry pushed");
        self.slots.entry(alias.to_lowercase()).or_default().push((token, slot));
        token
    }

    /// Removes the innermost entry for `alias`, which must be the one
    /// `token` was issued for.
    pub fn pop(&mut self, alias: &str, token: WithToken) -> Result<(), AnalyzerError> {
        let key = alias.to_lowercase();
        let top = self.slots.get(&key).and_then(|s| s.last().map(|(t, _)| *t));
        match top {
            Some(top) if top == token => {
                if let Some(stack) = self.slots.get_mut(&key) {
                    stack.pop();
                    if stack.is_empty() {
                        self.slots.shift_remove(&key);
                    }
                }
                trace!(alias, "with entry popped");
                Ok(())
            }
            _ => Err(AnalyzerError::FailedPrecondition(format!("WITH entry {alias} popped out of order"))),
        }
    }

    pub fn lookup(&self, alias: &str) -> Option<WithLookup<'_>> {
        let (_, slot) = self.slots.get(&alias.to_lowercase())?.last()?;
        Some(match slot {
            Slot::Entry(info) => WithLookup::Entry(info),
            Slot::Poisoned => WithLookup::Poisoned,
        })
    }

    /// `alias` the first time it is used in a statement, then `alias_2`,
    /// `alias_3`, ...
    pub fn unique_alias(&mut self, alias: &str) -> String {
        let uses = self.alias_uses.entry(alias.to_lowercase()).or_insert(0);
        *uses += 1;
        if *uses == 1 { alias.to_string() } else { format!("{alias}_{uses}") }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(alias: &str) -> WithEntryInfo {
        WithEntryInfo { unique_alias: alias.into(), columns: vec![("a".into(), Type::Int64)], recursive: false }
    }

    #[test]
    fn inner_entries_shadow_outer_ones() {
        let mut stack = WithAliasStack::new();
        let outer = stack.push_entry("q", info("q"));
        let inner = stack.push_entry("Q", info("q_2"));
        assert_eq!(stack.lookup("q"), Some(WithLookup::Entry(&info("q_2"))));
        stack.pop("q", inner).unwrap();
        assert_eq!(stack.lookup("q"), Some(WithLookup::Entry(&info("q"))));
        stack.pop("q", outer).unwrap();
        assert!(stack.lookup("q").is_none());
        assert!(stack.is_empty());
    }

    #[test]
    fn out_of_order_pop_is_an_internal_error() {
        let mut stack = WithAliasStack::new();
        let outer = stack.push_entry("q", info("q"));
        let _inner = stack.push_poisoned("q");
        assert_eq!(stack.lookup("q"), Some(WithLookup::Poisoned));
        let err = stack.pop("q", outer).unwrap_err();
        assert_eq!(err.class(), crate::analyzer::ErrorClass::Misuse);
        assert!(stack.pop("missing", outer).is_err());
    }

    #[test]
    fn unique_aliases_are_numbered() {
        let mut stack = WithAliasStack::new();
        assert_eq!(stack.unique_alias("q"), "q");
        assert_eq!(stack.unique_alias("Q"), "Q_2");
        assert_eq!(stack.unique_alias("r"), "r");
    }
}
