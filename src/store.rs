//! Accumulating store for observed argument value states.
//!
//! The store is the single mutable artifact of a run: a map from
//! (symbol, parameter position) to the ordered, duplicate-free sequence of
//! value strings observed across every call site and file. Per-file
//! analyses run in parallel and stay side-effect free; the driver folds
//! their results into one store instance as a single writer.

use crate::constants::NONDET;
use rustc_hash::FxHashMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// The resolved contribution of one argument occurrence.
///
/// By the time a value reaches the store, every reference placeholder from
/// pass 1 has been resolved, so only these two variants exist; an
/// unresolved reference surviving into the report is unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueState {
    /// Verbatim literal text from the source (base and format preserved).
    Literal(String),
    /// Not statically reducible to a finite set of literals.
    Dynamic,
}

impl ValueState {
    /// The string recorded in the report for this state.
    #[must_use]
    pub fn as_report_str(&self) -> &str {
        match self {
            ValueState::Literal(text) => text,
            ValueState::Dynamic => NONDET,
        }
    }
}

/// Distinct value strings observed for one parameter position, in
/// first-seen order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ParamRecord {
    values: Vec<String>,
}

impl ParamRecord {
    fn insert(&mut self, value: &str) {
        if !self.values.iter().any(|v| v == value) {
            self.values.push(value.to_owned());
        }
    }

    /// The recorded value strings.
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Whether at least one non-deterministic occurrence was observed.
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.values.iter().any(|v| v == NONDET)
    }
}

/// Accumulated argument states for every target symbol of a run.
///
/// Symbols are registered up front in target-list order, so symbols with
/// zero observed call sites still appear in the report and the serialized
/// symbol order is stable across runs.
#[derive(Debug, Clone, Default)]
pub struct ArgStateStore {
    symbols: Vec<String>,
    records: FxHashMap<String, Vec<ParamRecord>>,
}

impl ArgStateStore {
    /// Creates a store with every target symbol registered, in order.
    #[must_use]
    pub fn new(symbols: &[String]) -> Self {
        let mut store = Self::default();
        for symbol in symbols {
            store.register(symbol);
        }
        store
    }

    fn register(&mut self, symbol: &str) {
        if !self.records.contains_key(symbol) {
            self.symbols.push(symbol.to_owned());
            self.records.insert(symbol.to_owned(), Vec::new());
        }
    }

    /// Merges one resolved value state into the record for
    /// (`symbol`, `position`).
    ///
    /// Duplicates of an already-seen value are dropped; a dynamic
    /// occurrence adds the sentinel but never erases concrete values
    /// observed at other call sites.
    pub fn merge(&mut self, symbol: &str, position: usize, state: &ValueState) {
        if !self.records.contains_key(symbol) {
            self.symbols.push(symbol.to_owned());
        }
        let params = self.records.entry(symbol.to_owned()).or_default();
        if params.len() <= position {
            params.resize_with(position + 1, ParamRecord::default);
        }
        params[position].insert(state.as_report_str());
    }

    /// Registered symbols in serialization order.
    #[must_use]
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Parameter records for `symbol`, indexed by call position.
    #[must_use]
    pub fn params(&self, symbol: &str) -> &[ParamRecord] {
        self.records.get(symbol).map_or(&[], Vec::as_slice)
    }

    /// Total number of distinct value strings across all records.
    #[must_use]
    pub fn total_values(&self) -> usize {
        self.records
            .values()
            .flat_map(|params| params.iter())
            .map(|record| record.values.len())
            .sum()
    }
}

/// Serializes as `{"<symbol>": {"param1": [...], ...}, ...}`.
///
/// Parameter keys are 1-based and follow call order; symbol order follows
/// the target list. Entries are streamed so the emitted JSON preserves both
/// orders.
impl Serialize for ArgStateStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.symbols.len()))?;
        for symbol in &self.symbols {
            map.serialize_entry(symbol, &SymbolEntry(self.params(symbol)))?;
        }
        map.end()
    }
}

struct SymbolEntry<'a>(&'a [ParamRecord]);

impl Serialize for SymbolEntry<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (position, record) in self.0.iter().enumerate() {
            map.serialize_entry(&format!("param{}", position + 1), record)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(text: &str) -> ValueState {
        ValueState::Literal(text.to_owned())
    }

    #[test]
    fn merge_deduplicates_identical_literals() {
        let mut store = ArgStateStore::new(&["f".to_owned()]);
        store.merge("f", 0, &lit("1"));
        store.merge("f", 0, &lit("1"));
        store.merge("f", 0, &lit("2"));
        assert_eq!(store.params("f")[0].values(), ["1", "2"]);
    }

    #[test]
    fn merge_preserves_first_seen_order() {
        let mut store = ArgStateStore::new(&["f".to_owned()]);
        store.merge("f", 0, &lit("2"));
        store.merge("f", 0, &lit("1"));
        store.merge("f", 0, &lit("2"));
        assert_eq!(store.params("f")[0].values(), ["2", "1"]);
    }

    #[test]
    fn dynamic_does_not_erase_concrete_values() {
        let mut store = ArgStateStore::new(&["f".to_owned()]);
        store.merge("f", 1, &lit("3"));
        store.merge("f", 1, &ValueState::Dynamic);
        store.merge("f", 1, &ValueState::Dynamic);
        let record = &store.params("f")[1];
        assert_eq!(record.values(), ["3", NONDET]);
        assert!(record.is_unbounded());
    }

    #[test]
    fn unreported_symbols_serialize_empty() {
        let store = ArgStateStore::new(&["never_called".to_owned()]);
        let json = serde_json::to_string(&store).unwrap();
        assert_eq!(json, r#"{"never_called":{}}"#);
    }

    #[test]
    fn serialized_param_keys_are_one_based_call_order() {
        let mut store = ArgStateStore::new(&["f".to_owned()]);
        store.merge("f", 0, &lit("1"));
        store.merge("f", 1, &ValueState::Dynamic);
        let json = serde_json::to_string(&store).unwrap();
        assert_eq!(json, r#"{"f":{"param1":["1"],"param2":["<nondet>"]}}"#);
    }

    #[test]
    fn symbol_order_follows_target_list() {
        let mut store = ArgStateStore::new(&["zeta".to_owned(), "alpha".to_owned()]);
        store.merge("zeta", 0, &lit("1"));
        store.merge("alpha", 0, &lit("2"));
        let json = serde_json::to_string(&store).unwrap();
        assert!(json.find("zeta").unwrap() < json.find("alpha").unwrap());
    }
}
