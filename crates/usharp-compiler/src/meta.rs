//! Per-field compiler metadata for external inspection tooling.
//!
//! The extractor classifies; it never renders. A `FieldDefinition` carries
//! enough for a presentation layer to build a correctly typed, correctly
//! constrained widget and to validate dropped object references against
//! the field's declared behaviour type, narrowed to the originating source
//! class when the static type is a user-defined behaviour subtype.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use usharp_core::{SyncMode, UdonType};

use crate::bind::BoundClass;

/// Source attributes recorded on a field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FieldAttribute {
    HideInInspector,
    Tooltip(String),
    Range { min: f64, max: f64 },
    Header(String),
    Space(f32),
    ColorUsage { show_alpha: bool, hdr: bool },
    GradientUsage { hdr: bool },
    TextArea,
}

/// Compiler metadata for one exported field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Owning symbol name.
    pub symbol: String,
    /// Declared type, before assembler-level erasure (jagged arrays and
    /// behaviour subtypes are preserved here).
    pub ty: UdonType,
    pub sync: SyncMode,
    pub attributes: Vec<FieldAttribute>,
    /// Originating source class when the field's (element) type is a
    /// user-defined behaviour subtype; None for the base capability.
    pub behaviour_source: Option<String>,
}

impl FieldDefinition {
    pub fn is_hidden(&self) -> bool {
        self.attributes
            .iter()
            .any(|a| matches!(a, FieldAttribute::HideInInspector))
    }

    pub fn tooltip(&self) -> Option<&str> {
        self.attributes.iter().find_map(|a| match a {
            FieldAttribute::Tooltip(text) => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn range(&self) -> Option<(f64, f64)> {
        self.attributes.iter().find_map(|a| match a {
            FieldAttribute::Range { min, max } => Some((*min, *max)),
            _ => None,
        })
    }
}

/// Build the field-definition map for every exported field, keyed by
/// symbol name in declaration order. Rebuilt wholesale each compile.
pub fn extract(class: &BoundClass) -> IndexMap<String, FieldDefinition> {
    let mut defs = IndexMap::new();

    for field in &class.fields {
        if !field.exported {
            continue;
        }

        let behaviour_source = match field.ty.base_type() {
            UdonType::Behaviour(Some(source)) => Some(source.clone()),
            _ => None,
        };

        defs.insert(
            field.name.clone(),
            FieldDefinition {
                symbol: field.name.clone(),
                ty: field.ty.clone(),
                sync: field.sync,
                attributes: field.attributes.clone(),
                behaviour_source,
            },
        );
    }

    defs
}
