//! Heap layout planner.
//!
//! Assigns every symbol a unique address in `[0, heap_size)`: named
//! symbols in insertion order from 0, extern signature literals
//! (deduplicated by value) after the last named symbol in first-use
//! order. The assembler applies the same rule, so the planned size and
//! addressing match the assembled program exactly.
//!
//! Determinism: insertion order is the only ordering used, so a fixed
//! bound class always produces identical addresses across compiles.

use indexmap::IndexMap;

use usharp_core::{Interner, SyncMode, UdonType, UdonValue};

use super::error::EmitError;

/// A symbol planned into the heap.
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedSymbol {
    pub ty: UdonType,
    pub default: UdonValue,
    pub exported: bool,
    pub sync: SyncMode,
}

/// Planner state: named symbols plus deduplicated extern literals.
#[derive(Debug, Default)]
pub struct HeapLayout {
    symbols: IndexMap<String, PlannedSymbol>,
    literals: Interner,
}

impl HeapLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named symbol; its address is its insertion index.
    pub fn add_symbol(
        &mut self,
        name: impl Into<String>,
        symbol: PlannedSymbol,
    ) -> Result<u32, EmitError> {
        let name = name.into();
        if self.symbols.contains_key(&name) {
            return Err(EmitError::DuplicateSymbol(name));
        }
        let address = self.symbols.len() as u32;
        self.symbols.insert(name, symbol);
        Ok(address)
    }

    /// Record an extern signature literal. Repeated values share a slot.
    pub fn intern_literal(&mut self, signature: &str) {
        self.literals.intern(signature);
    }

    pub fn address_of(&self, name: &str) -> Option<u32> {
        self.symbols.get_index_of(name).map(|i| i as u32)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    /// Patch a symbol's default value (return-address constants resolve
    /// after layout).
    pub fn set_default(&mut self, name: &str, value: UdonValue) -> bool {
        match self.symbols.get_mut(name) {
            Some(sym) => {
                sym.default = value;
                true
            }
            None => false,
        }
    }

    pub fn symbol_count(&self) -> u32 {
        self.symbols.len() as u32
    }

    pub fn literal_count(&self) -> u32 {
        self.literals.len() as u32
    }

    /// Total heap slots: unique symbols plus unique extern literals.
    pub fn heap_size(&self) -> u32 {
        self.symbol_count() + self.literal_count()
    }

    /// Named symbols in address order.
    pub fn symbols(&self) -> impl Iterator<Item = (&str, &PlannedSymbol)> {
        self.symbols.iter().map(|(name, sym)| (name.as_str(), sym))
    }
}
