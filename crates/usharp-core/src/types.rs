//! The target VM's type model.
//!
//! `UdonType` is the declared type of a heap symbol as the compiler sees it.
//! The assembler and the VM only know the flat assembler-level type names
//! (`SystemInt32`, `SystemInt32Array`, ...); `assembler_type` performs that
//! erasure. Jagged arrays erase to the object-array type because they are
//! not blittable to a single contiguous value.

use serde::{Deserialize, Serialize};

/// Assembler-level name of the scripted-behaviour reference type.
pub const BEHAVIOUR_VM_TYPE: &str = "ScriptedBehaviour";

/// Network replication mode recorded on a heap symbol.
///
/// `None` means synced with unspecified reliability; the compiler records
/// the mode and never alters it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    #[default]
    NotSynced,
    None,
    Linear,
    Smooth,
}

impl SyncMode {
    /// Parse the mode name used by the `.sync` directive.
    pub fn parse(s: &str) -> Option<SyncMode> {
        match s {
            "none" => Some(SyncMode::None),
            "linear" => Some(SyncMode::Linear),
            "smooth" => Some(SyncMode::Smooth),
            "notsynced" => Some(SyncMode::NotSynced),
            _ => Option::None,
        }
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SyncMode::NotSynced => "notsynced",
            SyncMode::None => "none",
            SyncMode::Linear => "linear",
            SyncMode::Smooth => "smooth",
        };
        f.write_str(s)
    }
}

/// Declared type of a symbol, local, or expression.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UdonType {
    Void,
    Bool,
    Int32,
    Int64,
    /// Compiler-internal: return-address constants and slots.
    UInt32,
    Single,
    Double,
    String,
    Object,
    Vector3,
    Color,
    /// Scripted-behaviour reference. `None` is the base capability;
    /// `Some(class)` narrows to a particular user-defined behaviour class.
    Behaviour(Option<String>),
    Array(Box<UdonType>),
}

impl UdonType {
    pub fn array_of(elem: UdonType) -> UdonType {
        UdonType::Array(Box::new(elem))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, UdonType::Array(_))
    }

    /// Array of arrays. Jagged arrays never collapse to the element
    /// array's assembler type.
    pub fn is_jagged(&self) -> bool {
        matches!(self, UdonType::Array(elem) if elem.is_array())
    }

    pub fn element_type(&self) -> Option<&UdonType> {
        match self {
            UdonType::Array(elem) => Some(elem),
            _ => None,
        }
    }

    pub fn is_behaviour(&self) -> bool {
        matches!(self, UdonType::Behaviour(_))
    }

    /// Innermost non-array type.
    pub fn base_type(&self) -> &UdonType {
        match self {
            UdonType::Array(elem) => elem.base_type(),
            other => other,
        }
    }

    /// Reference types may hold `null`.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            UdonType::String | UdonType::Object | UdonType::Behaviour(_) | UdonType::Array(_)
        )
    }

    /// Whether values of this type are numeric (arithmetic externs exist).
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            UdonType::Int32 | UdonType::Int64 | UdonType::UInt32 | UdonType::Single | UdonType::Double
        )
    }

    /// Assembler-level type name used in the data section (`%SystemInt32`).
    ///
    /// All user-defined behaviour classes erase to one reference type, and
    /// jagged arrays erase to the object-array type.
    pub fn assembler_type(&self) -> String {
        match self {
            UdonType::Void => "SystemVoid".to_string(),
            UdonType::Bool => "SystemBoolean".to_string(),
            UdonType::Int32 => "SystemInt32".to_string(),
            UdonType::Int64 => "SystemInt64".to_string(),
            UdonType::UInt32 => "SystemUInt32".to_string(),
            UdonType::Single => "SystemSingle".to_string(),
            UdonType::Double => "SystemDouble".to_string(),
            UdonType::String => "SystemString".to_string(),
            UdonType::Object => "SystemObject".to_string(),
            UdonType::Vector3 => "UnityEngineVector3".to_string(),
            UdonType::Color => "UnityEngineColor".to_string(),
            UdonType::Behaviour(_) => BEHAVIOUR_VM_TYPE.to_string(),
            UdonType::Array(elem) => {
                if elem.is_array() {
                    "SystemObjectArray".to_string()
                } else {
                    format!("{}Array", elem.assembler_type())
                }
            }
        }
    }

    /// Default value placed in the heap template when no initializer is given.
    pub fn default_value(&self) -> crate::UdonValue {
        use crate::UdonValue;
        match self {
            UdonType::Void => UdonValue::Null,
            UdonType::Bool => UdonValue::Bool(false),
            UdonType::Int32 => UdonValue::Int32(0),
            UdonType::Int64 => UdonValue::Int64(0),
            UdonType::UInt32 => UdonValue::UInt32(0),
            UdonType::Single => UdonValue::Single(0.0),
            UdonType::Double => UdonValue::Double(0.0),
            // Vector and color slots start null; the host seeds concrete
            // values per instance, the data section only carries scalars.
            UdonType::String
            | UdonType::Object
            | UdonType::Behaviour(_)
            | UdonType::Array(_)
            | UdonType::Vector3
            | UdonType::Color => UdonValue::Null,
        }
    }
}

impl std::fmt::Display for UdonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UdonType::Void => f.write_str("void"),
            UdonType::Bool => f.write_str("bool"),
            UdonType::Int32 => f.write_str("int"),
            UdonType::Int64 => f.write_str("long"),
            UdonType::UInt32 => f.write_str("uint"),
            UdonType::Single => f.write_str("float"),
            UdonType::Double => f.write_str("double"),
            UdonType::String => f.write_str("string"),
            UdonType::Object => f.write_str("object"),
            UdonType::Vector3 => f.write_str("Vector3"),
            UdonType::Color => f.write_str("Color"),
            UdonType::Behaviour(Some(class)) => f.write_str(class),
            UdonType::Behaviour(None) => f.write_str(BEHAVIOUR_VM_TYPE),
            UdonType::Array(elem) => write!(f, "{elem}[]"),
        }
    }
}
