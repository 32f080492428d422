//! Heap values.
//!
//! `UdonValue` is what a heap slot holds: the default-value snapshot baked
//! into a compiled program's heap template, and the per-instance overrides
//! kept in a public-variable table. Behaviour references are opaque ids
//! assigned by the host scene; copying a reference copies the id, never the
//! instance.

use serde::{Deserialize, Serialize};

use crate::UdonType;

/// A value held in one heap slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum UdonValue {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    Single(f32),
    Double(f64),
    String(String),
    Vector3([f32; 3]),
    Color([f32; 4]),
    /// Opaque scene-instance id of a scripted behaviour.
    BehaviourRef(u32),
    Array(UdonArray),
}

impl UdonValue {
    pub fn is_null(&self) -> bool {
        matches!(self, UdonValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            UdonValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            UdonValue::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            UdonValue::UInt32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            UdonValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Human-readable rendering used by ToString externs and the dump.
    pub fn display_string(&self) -> String {
        match self {
            UdonValue::Null => "null".to_string(),
            UdonValue::Bool(b) => b.to_string(),
            UdonValue::Int32(v) => v.to_string(),
            UdonValue::Int64(v) => v.to_string(),
            UdonValue::UInt32(v) => format!("0x{v:08X}"),
            UdonValue::Single(v) => v.to_string(),
            UdonValue::Double(v) => v.to_string(),
            UdonValue::String(s) => s.clone(),
            UdonValue::Vector3([x, y, z]) => format!("({x}, {y}, {z})"),
            UdonValue::Color([r, g, b, a]) => format!("RGBA({r}, {g}, {b}, {a})"),
            UdonValue::BehaviourRef(id) => format!("behaviour#{id}"),
            UdonValue::Array(arr) => format!("{}[{}]", arr.elem, arr.items.len()),
        }
    }
}

/// An array value with its element type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UdonArray {
    pub elem: UdonType,
    pub items: Vec<UdonValue>,
}

impl UdonArray {
    pub fn new(elem: UdonType, len: usize) -> Self {
        let default = elem.default_value();
        Self {
            elem,
            items: vec![default; len],
        }
    }

    pub fn from_items(elem: UdonType, items: Vec<UdonValue>) -> Self {
        Self { elem, items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Resize in place, keeping existing elements.
    ///
    /// Shrinking discards the tail. Growing fills new slots with a copy of
    /// the last element's value — for references this duplicates the
    /// reference, not the instance — unless the last element is itself an
    /// array: jagged sub-arrays are never duplicated, so new slots stay at
    /// the element default.
    pub fn resize(&mut self, new_len: usize) {
        if new_len <= self.items.len() {
            self.items.truncate(new_len);
            return;
        }

        let fill = match self.items.last() {
            Some(UdonValue::Array(_)) | None => self.elem.default_value(),
            Some(last) => last.clone(),
        };
        self.items.resize(new_len, fill);
    }
}
