//! The host VM's extern binding surface.
//!
//! The target VM has no inline arithmetic: every operator, conversion and
//! host call compiles to an `EXTERN` instruction whose operand is a
//! signature string (`SystemInt32.__op_Addition__SystemInt32_SystemInt32__SystemInt32`).
//! The registry owns the set of types and extern overloads the binder may
//! resolve against; binding fails for anything outside it.
//!
//! The built-in table covers the restricted subset the compiler can emit.
//! Hosts can extend it from a JSON description of additional externs.

use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;

use crate::types::BEHAVIOUR_VM_TYPE;

/// Vm-type sentinel the binder passes for an untyped `null` argument.
///
/// Null converts to every reference type and is never an exact match, so a
/// null argument reaching two reference overloads is reported as ambiguous.
pub const NULL_VM_TYPE: &str = "null";

/// One resolvable extern overload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternDef {
    pub signature: String,
    pub params: Vec<String>,
    pub ret: String,
}

/// Errors produced while resolving against the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExternError {
    #[error("type '{0}' is not resolvable against the target VM")]
    UnknownType(String),

    #[error("'{vm_type}' has no extern '{name}'")]
    UnknownMethod { vm_type: String, name: String },

    #[error("no overload of '{vm_type}.{name}' accepts ({args})")]
    NoOverload {
        vm_type: String,
        name: String,
        args: String,
    },

    #[error("call to '{vm_type}.{name}' is ambiguous between {candidates} overloads")]
    Ambiguous {
        vm_type: String,
        name: String,
        candidates: usize,
    },

    #[error("malformed extern extension: {0}")]
    Extension(String),
}

/// JSON shape for registry extensions.
#[derive(Debug, Deserialize)]
struct ExternExtension {
    #[serde(rename = "type")]
    vm_type: String,
    method: String,
    #[serde(default)]
    params: Vec<String>,
    ret: String,
    /// Source-language name the type is reachable under (`Debug`, `Time`).
    #[serde(default)]
    static_as: Option<String>,
}

/// Registry of VM types and extern overloads.
#[derive(Debug, Clone)]
pub struct ExternRegistry {
    types: IndexSet<String>,
    /// (vm type, method name) -> overload set, in registration order.
    methods: IndexMap<(String, String), Vec<ExternDef>>,
    /// Source-language identifier -> vm type, for static host classes.
    statics: IndexMap<String, String>,
}

const NUMERIC_TYPES: &[&str] = &["SystemInt32", "SystemInt64", "SystemSingle", "SystemDouble"];

const BINARY_ARITHMETIC: &[&str] = &[
    "op_Addition",
    "op_Subtraction",
    "op_Multiplication",
    "op_Division",
    "op_Remainder",
];

const COMPARISONS: &[&str] = &[
    "op_LessThan",
    "op_GreaterThan",
    "op_LessThanOrEqual",
    "op_GreaterThanOrEqual",
    "op_Equality",
    "op_Inequality",
];

/// Element types that have a registered array form.
const ARRAY_ELEMENTS: &[&str] = &[
    "SystemBoolean",
    "SystemInt32",
    "SystemInt64",
    "SystemSingle",
    "SystemDouble",
    "SystemString",
    "SystemObject",
    "UnityEngineVector3",
    "UnityEngineColor",
    BEHAVIOUR_VM_TYPE,
];

/// Build an extern signature string.
pub fn make_signature(vm_type: &str, name: &str, params: &[String], ret: &str) -> String {
    if params.is_empty() {
        format!("{vm_type}.__{name}__{ret}")
    } else {
        format!("{vm_type}.__{name}__{}__{ret}", params.join("_"))
    }
}

impl ExternRegistry {
    /// The built-in binding surface of the target VM.
    pub fn builtin() -> Self {
        let mut reg = Self {
            types: IndexSet::new(),
            methods: IndexMap::new(),
            statics: IndexMap::new(),
        };

        for ty in [
            "SystemVoid",
            "SystemBoolean",
            "SystemInt32",
            "SystemInt64",
            "SystemUInt32",
            "SystemSingle",
            "SystemDouble",
            "SystemString",
            "SystemObject",
            "UnityEngineVector3",
            "UnityEngineColor",
            BEHAVIOUR_VM_TYPE,
        ] {
            reg.types.insert(ty.to_string());
        }

        for &ty in NUMERIC_TYPES {
            for &op in BINARY_ARITHMETIC {
                reg.register(ty, op, &[ty, ty], ty);
            }
            for &op in COMPARISONS {
                reg.register(ty, op, &[ty, ty], "SystemBoolean");
            }
            reg.register(ty, "op_UnaryMinus", &[ty], ty);
            reg.register(ty, "ToString", &[], "SystemString");
        }

        for op in ["op_Equality", "op_Inequality"] {
            reg.register("SystemBoolean", op, &["SystemBoolean", "SystemBoolean"], "SystemBoolean");
            reg.register("SystemString", op, &["SystemString", "SystemString"], "SystemBoolean");
            // Reference equality fallback for behaviours, objects and arrays
            reg.register("SystemObject", op, &["SystemObject", "SystemObject"], "SystemBoolean");
        }
        reg.register("SystemBoolean", "op_UnaryNegation", &["SystemBoolean"], "SystemBoolean");
        reg.register("SystemBoolean", "ToString", &[], "SystemString");
        reg.register("SystemObject", "ToString", &[], "SystemString");
        reg.register(BEHAVIOUR_VM_TYPE, "ToString", &[], "SystemString");

        reg.register(
            "SystemString",
            "Concat",
            &["SystemString", "SystemString"],
            "SystemString",
        );
        reg.register(
            "SystemString",
            "Concat",
            &["SystemObject", "SystemObject"],
            "SystemString",
        );
        reg.register("SystemString", "get_Length", &[], "SystemInt32");

        reg.register(
            BEHAVIOUR_VM_TYPE,
            "SendCustomEvent",
            &["SystemString"],
            "SystemVoid",
        );

        for &elem in ARRAY_ELEMENTS {
            let array_ty = format!("{elem}Array");
            reg.types.insert(array_ty.clone());
            reg.register(&array_ty, "ctor", &["SystemInt32"], &array_ty);
            reg.register(&array_ty, "Get", &["SystemInt32"], elem);
            reg.register(&array_ty, "Set", &["SystemInt32", elem], "SystemVoid");
            reg.register(&array_ty, "get_Length", &[], "SystemInt32");
        }

        // Host classes reachable by their source-language name
        reg.types.insert("UnityEngineDebug".to_string());
        reg.statics
            .insert("Debug".to_string(), "UnityEngineDebug".to_string());
        reg.register("UnityEngineDebug", "Log", &["SystemObject"], "SystemVoid");
        reg.register("UnityEngineDebug", "Log", &["SystemString"], "SystemVoid");

        reg
    }

    fn register(&mut self, vm_type: &str, name: &str, params: &[&str], ret: &str) {
        let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
        let def = ExternDef {
            signature: make_signature(vm_type, name, &params, ret),
            params,
            ret: ret.to_string(),
        };
        self.methods
            .entry((vm_type.to_string(), name.to_string()))
            .or_default()
            .push(def);
    }

    /// Extend the registry from a JSON description.
    ///
    /// Returns the number of externs added.
    pub fn load_extensions(&mut self, json: &str) -> Result<usize, ExternError> {
        let extensions: Vec<ExternExtension> =
            serde_json::from_str(json).map_err(|e| ExternError::Extension(e.to_string()))?;

        let count = extensions.len();
        for ext in extensions {
            self.types.insert(ext.vm_type.clone());
            let params: Vec<&str> = ext.params.iter().map(|p| p.as_str()).collect();
            self.register(&ext.vm_type, &ext.method, &params, &ext.ret);
            if let Some(alias) = ext.static_as {
                self.statics.insert(alias, ext.vm_type.clone());
            }
        }
        Ok(count)
    }

    /// Whether the VM exposes this assembler-level type.
    pub fn has_type(&self, vm_type: &str) -> bool {
        self.types.contains(vm_type)
    }

    /// Resolve a source-language identifier to a static host class.
    pub fn static_class(&self, name: &str) -> Option<&str> {
        self.statics.get(name).map(|s| s.as_str())
    }

    /// Resolve a method call against the overload set.
    ///
    /// Exact parameter matches win; otherwise a single convertible overload
    /// is accepted (conversion: anything to `SystemObject`, `null` to any
    /// reference type). Multiple convertible candidates with no exact match
    /// are ambiguous.
    pub fn resolve(
        &self,
        vm_type: &str,
        name: &str,
        args: &[String],
    ) -> Result<&ExternDef, ExternError> {
        let Some(overloads) = self
            .methods
            .get(&(vm_type.to_string(), name.to_string()))
        else {
            if !self.has_type(vm_type) {
                return Err(ExternError::UnknownType(vm_type.to_string()));
            }
            return Err(ExternError::UnknownMethod {
                vm_type: vm_type.to_string(),
                name: name.to_string(),
            });
        };

        if let Some(exact) = overloads
            .iter()
            .find(|def| def.params.as_slice() == args)
        {
            return Ok(exact);
        }

        let convertible: Vec<&ExternDef> = overloads
            .iter()
            .filter(|def| {
                def.params.len() == args.len()
                    && def
                        .params
                        .iter()
                        .zip(args)
                        .all(|(param, arg)| is_convertible(arg, param))
            })
            .collect();

        match convertible.as_slice() {
            [single] => Ok(single),
            [] => Err(ExternError::NoOverload {
                vm_type: vm_type.to_string(),
                name: name.to_string(),
                args: args.join(", "),
            }),
            many => Err(ExternError::Ambiguous {
                vm_type: vm_type.to_string(),
                name: name.to_string(),
                candidates: many.len(),
            }),
        }
    }

    /// Shorthand: resolve and return just the signature string.
    pub fn signature(
        &self,
        vm_type: &str,
        name: &str,
        args: &[String],
    ) -> Result<String, ExternError> {
        self.resolve(vm_type, name, args).map(|def| def.signature.clone())
    }
}

impl Default for ExternRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn is_reference_vm_type(vm_type: &str) -> bool {
    vm_type == "SystemString"
        || vm_type == "SystemObject"
        || vm_type == BEHAVIOUR_VM_TYPE
        || vm_type.ends_with("Array")
}

fn is_convertible(arg: &str, param: &str) -> bool {
    arg == param
        || param == "SystemObject"
        || (arg == NULL_VM_TYPE && is_reference_vm_type(param))
}
