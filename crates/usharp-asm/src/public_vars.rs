//! Per-instance overrides of exported symbol defaults.
//!
//! The table is owned by the instantiating scene object, but the compiled
//! program is the sole authority on which keys are valid. The refresh pass
//! is mandatory after every recompile: address stability across recompiles
//! is best-effort, so stale entries must be pruned rather than trusted.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use usharp_core::types::BEHAVIOUR_VM_TYPE;
use usharp_core::UdonValue;

use crate::program::Program;

/// One override entry: the declared type it was recorded under and the value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublicVariable {
    /// Assembler-level type name at the time the override was written.
    pub vm_type: String,
    pub value: UdonValue,
}

/// Instance-level overrides keyed by exported symbol name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicVariableTable {
    vars: IndexMap<String, PublicVariable>,
}

impl PublicVariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, vm_type: impl Into<String>, value: UdonValue) {
        self.vars.insert(
            name.into(),
            PublicVariable {
                vm_type: vm_type.into(),
                value,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&PublicVariable> {
        self.vars.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<PublicVariable> {
        self.vars.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PublicVariable)> {
        self.vars.iter().map(|(name, var)| (name.as_str(), var))
    }

    /// Revalidate every entry against the current compiled program.
    ///
    /// - Keys that no longer name an exported symbol are removed.
    /// - Entries recorded under a type that no longer matches the symbol's
    ///   current type are replaced with the compiled default value.
    /// - Null-valued behaviour references are removed so the host re-seeds
    ///   them; a stored null is indistinguishable from a never-set entry.
    ///
    /// Returns true when anything changed (the instance must be marked
    /// dirty and reserialized).
    pub fn refresh(&mut self, program: &Program) -> bool {
        let mut dirty = false;

        let stale: Vec<String> = self
            .vars
            .keys()
            .filter(|name| {
                program
                    .symbols
                    .get(name.as_str())
                    .map(|sym| !sym.exported)
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        for name in stale {
            self.vars.shift_remove(&name);
            dirty = true;
        }

        let mut retyped: Vec<(String, String, UdonValue)> = Vec::new();
        let mut nulled: Vec<String> = Vec::new();
        for (name, var) in &self.vars {
            let Some(sym) = program.symbols.get(name) else {
                continue;
            };

            if var.vm_type != sym.vm_type {
                let default = program
                    .heap
                    .heap_variable(sym.address)
                    .cloned()
                    .unwrap_or(UdonValue::Null);
                retyped.push((name.clone(), sym.vm_type.clone(), default));
                continue;
            }

            if sym.vm_type == BEHAVIOUR_VM_TYPE && var.value.is_null() {
                nulled.push(name.clone());
            }
        }

        for (name, vm_type, default) in retyped {
            self.vars.insert(
                name,
                PublicVariable {
                    vm_type,
                    value: default,
                },
            );
            dirty = true;
        }
        for name in nulled {
            self.vars.shift_remove(&name);
            dirty = true;
        }

        dirty
    }
}
