//! Canonical to broker symbol translation

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fixed mapping from canonical instrument names to broker-specific names
///
/// Read-only once built. Symbols without an entry pass through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolMap {
    entries: HashMap<String, String>,
}

impl Default for SymbolMap {
    fn default() -> Self {
        Self::from_pairs([("XAUUSD", "XAUUSD_i")])
    }
}

impl SymbolMap {
    /// Build from `(canonical, broker)` pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(canonical, broker)| (canonical.into(), broker.into()))
                .collect(),
        }
    }

    /// Overlay `other` on top of this map; `other` wins on conflicts
    pub fn merged(mut self, other: SymbolMap) -> Self {
        self.entries.extend(other.entries);
        self
    }

    /// Broker symbol for `canonical`
    pub fn resolve<'a>(&'a self, canonical: &'a str) -> &'a str {
        self.entries
            .get(canonical)
            .map(String::as_str)
            .unwrap_or(canonical)
    }

    /// Number of remapped symbols
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is remapped
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gold_is_remapped() {
        assert_eq!(SymbolMap::default().resolve("XAUUSD"), "XAUUSD_i");
    }

    #[test]
    fn test_unmapped_symbol_passes_through() {
        assert_eq!(SymbolMap::default().resolve("EURUSD"), "EURUSD");
    }

    #[test]
    fn test_merge_overrides_defaults() {
        let map = SymbolMap::default().merged(SymbolMap::from_pairs([
            ("XAUUSD", "GOLD.pro"),
            ("US30", "DJ30"),
        ]));
        assert_eq!(map.resolve("XAUUSD"), "GOLD.pro");
        assert_eq!(map.resolve("US30"), "DJ30");
        assert_eq!(map.len(), 2);
    }
}
