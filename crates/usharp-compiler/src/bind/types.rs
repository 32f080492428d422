//! Source type resolution.

use usharp_core::types::BEHAVIOUR_VM_TYPE;
use usharp_core::UdonType;

use crate::parser::ast::TypeRef;

use super::binder::BindEnv;
use super::error::{BindError, BindErrorKind};

/// Resolve a written type against the VM registry and the known behaviour
/// classes. Array rank wraps the base type; rank ≥ 2 yields a jagged array.
pub fn resolve_type(
    ty: &TypeRef,
    env: &BindEnv<'_>,
    class_name: &str,
) -> Result<UdonType, BindError> {
    let base = match ty.name.as_str() {
        "void" => UdonType::Void,
        "bool" => UdonType::Bool,
        "int" => UdonType::Int32,
        "long" => UdonType::Int64,
        "float" => UdonType::Single,
        "double" => UdonType::Double,
        "string" => UdonType::String,
        "object" => UdonType::Object,
        "Vector3" => UdonType::Vector3,
        "Color" => UdonType::Color,
        BEHAVIOUR_VM_TYPE => UdonType::Behaviour(None),
        name if name == class_name || env.behaviour_classes.contains(name) => {
            UdonType::Behaviour(Some(name.to_string()))
        }
        name => {
            return Err(BindError::new(
                ty.span,
                BindErrorKind::UnresolvedType(name.to_string()),
            ));
        }
    };

    if base == UdonType::Void && ty.rank > 0 {
        return Err(BindError::new(
            ty.span,
            BindErrorKind::UnresolvedType("void[]".to_string()),
        ));
    }

    // Behaviour classes are not in the extern registry; everything else
    // must be resolvable against the target VM.
    if !base.is_behaviour() && !env.externs.has_type(&base.assembler_type()) {
        return Err(BindError::new(
            ty.span,
            BindErrorKind::UnresolvedType(ty.name.clone()),
        ));
    }

    let mut resolved = base;
    for _ in 0..ty.rank {
        resolved = UdonType::array_of(resolved);
    }
    Ok(resolved)
}

/// Map an assembler-level type name back to the type model. Used for
/// extern return types; unknown names conservatively map to `object`.
pub fn udon_type_from_vm(name: &str) -> UdonType {
    if let Some(elem) = name.strip_suffix("Array") {
        return UdonType::array_of(udon_type_from_vm(elem));
    }
    match name {
        "SystemVoid" => UdonType::Void,
        "SystemBoolean" => UdonType::Bool,
        "SystemInt32" => UdonType::Int32,
        "SystemInt64" => UdonType::Int64,
        "SystemUInt32" => UdonType::UInt32,
        "SystemSingle" => UdonType::Single,
        "SystemDouble" => UdonType::Double,
        "SystemString" => UdonType::String,
        "UnityEngineVector3" => UdonType::Vector3,
        "UnityEngineColor" => UdonType::Color,
        BEHAVIOUR_VM_TYPE => UdonType::Behaviour(None),
        _ => UdonType::Object,
    }
}
