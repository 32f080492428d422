//! Program assets and the compile driver.
//!
//! A `ProgramAsset` owns everything one compiled unit exposes: the
//! finalized program, cached assembly text, field metadata, the error
//! list, and the interact flag. State machine:
//! `Uncompiled → Compiling → {Compiled, Errored}`, re-entering `Compiling`
//! on every trigger. Automatic recompilation is suppressed while the host
//! is mid-build or while errors are outstanding.
//!
//! The `CompilerContext` replaces process-wide singletons: it owns the
//! extern registry and the heap factory and is passed `&mut` into every
//! compile, which makes the one-compile-at-a-time constraint a borrow
//! rule instead of a convention.

use indexmap::{IndexMap, IndexSet};

use usharp_asm::{AssemblyError, HeapFactory, Program};
use usharp_core::{ExternRegistry, UdonValue};

use crate::bind::{bind, BindEnv};
use crate::emit::{emit, EmitError};
use crate::meta::{self, FieldDefinition};
use crate::parser;

/// Reserved entry-point name that marks a program as interactable.
pub const INTERACT_ENTRY: &str = "_interact";

/// Compile-state of a program asset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AssetState {
    #[default]
    Uncompiled,
    Compiling,
    Compiled,
    Errored,
}

/// What the host reports about itself; compilation against a half-updated
/// type system is suppressed.
#[derive(Clone, Copy, Debug, Default)]
pub struct HostStatus {
    pub is_building: bool,
    pub is_refreshing: bool,
}

/// Mutation surface of the compiled-program holder.
///
/// An explicit API instead of reflection into a private base-class field;
/// the assembler-error slot is part of the contract.
pub trait ProgramContainer {
    fn set_assembly_error(&mut self, error: Option<String>);
    fn store_program(&mut self, program: Program);
    fn clear_program(&mut self);
}

/// One compilable unit and everything its last compile produced.
#[derive(Clone, Debug, Default)]
pub struct ProgramAsset {
    pub source: String,
    /// Class name, known after the first successful parse.
    pub class_name: Option<String>,
    state: AssetState,
    program: Option<Program>,
    /// Cached assembly text of the current program.
    assembly: Option<String>,
    pub compile_errors: Vec<String>,
    assembly_error: Option<String>,
    pub field_definitions: IndexMap<String, FieldDefinition>,
    has_interact_event: bool,
}

impl ProgramAsset {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn state(&self) -> AssetState {
        self.state
    }

    pub fn program(&self) -> Option<&Program> {
        self.program.as_ref()
    }

    pub fn assembly_error(&self) -> Option<&str> {
        self.assembly_error.as_deref()
    }

    pub fn has_interact_event(&self) -> bool {
        self.has_interact_event
    }

    /// The assembly text backing the current program.
    pub fn export_assembly(&self) -> Option<&str> {
        self.assembly.as_deref()
    }

    /// Name of the injected behaviour-ID heap symbol.
    pub fn behaviour_id_symbol(&self) -> &'static str {
        "__behaviour_id"
    }

    /// Compiled default value of an exported symbol.
    pub fn public_variable_default(&self, symbol: &str) -> Option<&UdonValue> {
        let program = self.program.as_ref()?;
        let address = program.symbols.address_of(symbol)?;
        program.heap.heap_variable(address)
    }

    /// Whether an automatic recompile may run now. Suppressed while the
    /// host is mid-build/mid-refresh and while errors are outstanding
    /// (they clear only through an explicit compile).
    pub fn should_auto_compile(&self, host: &HostStatus) -> bool {
        !host.is_building
            && !host.is_refreshing
            && self.assembly_error.is_none()
            && self.compile_errors.is_empty()
    }

    fn fail(&mut self, messages: Vec<String>) {
        self.compile_errors.extend(messages);
        self.state = AssetState::Errored;
    }
}

impl ProgramContainer for ProgramAsset {
    fn set_assembly_error(&mut self, error: Option<String>) {
        self.assembly_error = error;
    }

    fn store_program(&mut self, program: Program) {
        self.program = Some(program);
    }

    fn clear_program(&mut self) {
        self.program = None;
        self.assembly = None;
    }
}

/// Explicitly constructed compiler state shared across a batch.
#[derive(Debug)]
pub struct CompilerContext {
    externs: ExternRegistry,
    heap_factory: HeapFactory,
    behaviour_classes: IndexSet<String>,
}

impl CompilerContext {
    pub fn new() -> Self {
        Self::with_registry(ExternRegistry::builtin())
    }

    pub fn with_registry(externs: ExternRegistry) -> Self {
        Self {
            externs,
            heap_factory: HeapFactory::new(),
            behaviour_classes: IndexSet::new(),
        }
    }

    pub fn externs(&self) -> &ExternRegistry {
        &self.externs
    }

    pub fn externs_mut(&mut self) -> &mut ExternRegistry {
        &mut self.externs
    }

    /// Make a behaviour class name resolvable as a field/parameter type.
    pub fn register_behaviour_class(&mut self, name: impl Into<String>) {
        self.behaviour_classes.insert(name.into());
    }

    pub fn behaviour_classes(&self) -> &IndexSet<String> {
        &self.behaviour_classes
    }
}

impl Default for CompilerContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a compile failed. The same information lands on the asset's error
/// surface; the returned value is for the interactive caller.
#[derive(Debug, thiserror::Error)]
pub enum CompileFailure {
    #[error("parsing failed with {0} errors")]
    Parse(usize),

    #[error("binding failed with {0} errors")]
    Bind(usize),

    #[error(transparent)]
    Emit(#[from] EmitError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}

/// Compile one asset to completion.
///
/// Binding and emission failures leave any previous program untouched; an
/// assembly failure clears the program reference with no rollback, so
/// callers always observe the failure.
pub fn compile(ctx: &mut CompilerContext, asset: &mut ProgramAsset) -> Result<(), CompileFailure> {
    asset.state = AssetState::Compiling;

    let class = match parser::parse(&asset.source) {
        Ok(class) => class,
        Err(diags) => {
            let count = diags.error_count();
            asset.fail(diags.messages());
            return Err(CompileFailure::Parse(count));
        }
    };

    asset.class_name = Some(class.name.clone());
    ctx.register_behaviour_class(class.name.clone());

    let env = BindEnv {
        externs: &ctx.externs,
        behaviour_classes: &ctx.behaviour_classes,
    };
    let bound = match bind(&class, &env) {
        Ok(bound) => bound,
        Err(diags) => {
            let count = diags.error_count();
            asset.fail(diags.messages());
            return Err(CompileFailure::Bind(count));
        }
    };

    let output = match emit(&bound) {
        Ok(output) => output,
        Err(err) => {
            asset.fail(vec![err.to_string()]);
            return Err(err.into());
        }
    };

    ctx.heap_factory.factory_heap_size = output.heap_size;
    match ctx.heap_factory.assemble(&output.assembly) {
        Ok(program) => {
            asset.set_assembly_error(None);
            asset.has_interact_event = program.entry_points.contains(INTERACT_ENTRY);
            asset.field_definitions = meta::extract(&bound);
            asset.assembly = Some(output.assembly);
            asset.store_program(program);
            asset.compile_errors.clear();
            asset.state = AssetState::Compiled;
            Ok(())
        }
        Err(err) => {
            asset.clear_program();
            asset.set_assembly_error(Some(err.to_string()));
            asset.state = AssetState::Errored;
            Err(err.into())
        }
    }
}

/// Compile a batch of assets sharing one context.
///
/// Class names are collected first so assets may reference each other's
/// behaviour types regardless of order. Units fail independently; the
/// return value is the number of failures.
pub fn compile_all(ctx: &mut CompilerContext, assets: &mut [ProgramAsset]) -> usize {
    for asset in assets.iter() {
        if let Ok(class) = parser::parse(&asset.source) {
            ctx.register_behaviour_class(class.name);
        }
    }

    let mut failures = 0;
    for asset in assets.iter_mut() {
        if compile(ctx, asset).is_err() {
            failures += 1;
        }
    }
    failures
}
