//! The finalized program: instruction stream, heap template, symbol table
//! and entry-point table.
//!
//! A `Program` is immutable once assembled; the owning asset replaces it
//! atomically on a successful compile. Persistence is an opaque blob: a
//! 16-byte header (magic, version, crc32, payload length) followed by a
//! postcard payload, reloadable without recompilation.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use usharp_core::{SyncMode, UdonValue};

use crate::opcode::{Instruction, STEP_SIZE};

/// Magic bytes of the serialized program blob.
pub const BLOB_MAGIC: [u8; 4] = *b"USPA";

/// Serialized blob format version.
pub const BLOB_VERSION: u32 = 1;

/// One named heap symbol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeapSymbol {
    pub address: u32,
    /// Assembler-level type name (`SystemInt32`).
    pub vm_type: String,
    pub exported: bool,
    pub sync: SyncMode,
}

/// Identifier → heap symbol mapping, in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolTable {
    symbols: IndexMap<String, HeapSymbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a symbol. Returns false when the name is already taken.
    pub fn insert(&mut self, name: String, symbol: HeapSymbol) -> bool {
        if self.symbols.contains_key(&name) {
            return false;
        }
        self.symbols.insert(name, symbol);
        true
    }

    pub fn get(&self, name: &str) -> Option<&HeapSymbol> {
        self.symbols.get(name)
    }

    /// Mark a symbol exported. Returns false for an unknown name.
    pub fn set_exported(&mut self, name: &str) -> bool {
        match self.symbols.get_mut(name) {
            Some(sym) => {
                sym.exported = true;
                true
            }
            None => false,
        }
    }

    /// Record a symbol's sync mode. Returns false for an unknown name.
    pub fn set_sync(&mut self, name: &str, sync: SyncMode) -> bool {
        match self.symbols.get_mut(name) {
            Some(sym) => {
                sym.sync = sync;
                true
            }
            None => false,
        }
    }

    /// Exported symbol names, in declaration order.
    pub fn exported_symbols(&self) -> impl Iterator<Item = &str> {
        self.symbols
            .iter()
            .filter(|(_, sym)| sym.exported)
            .map(|(name, _)| name.as_str())
    }

    /// Assembler-level type of a symbol.
    pub fn symbol_type(&self, name: &str) -> Option<&str> {
        self.symbols.get(name).map(|s| s.vm_type.as_str())
    }

    pub fn address_of(&self, name: &str) -> Option<u32> {
        self.symbols.get(name).map(|s| s.address)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeapSymbol)> {
        self.symbols.iter().map(|(name, sym)| (name.as_str(), sym))
    }
}

/// Default-value snapshot of the VM heap, keyed by address.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Heap {
    values: Vec<UdonValue>,
}

impl Heap {
    pub fn new(size: u32) -> Self {
        Self {
            values: vec![UdonValue::Null; size as usize],
        }
    }

    pub fn heap_variable(&self, address: u32) -> Option<&UdonValue> {
        self.values.get(address as usize)
    }

    pub fn set(&mut self, address: u32, value: UdonValue) -> bool {
        match self.values.get_mut(address as usize) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[UdonValue] {
        &self.values
    }

    /// Mutable copy for interpreter runs; the template itself stays intact.
    pub fn to_vec(&self) -> Vec<UdonValue> {
        self.values.clone()
    }
}

/// Entry-point name → code address, in export order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryPoints {
    entries: IndexMap<String, u32>,
}

impl EntryPoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: String, address: u32) -> bool {
        if self.entries.contains_key(&name) {
            return false;
        }
        self.entries.insert(name, address);
        true
    }

    /// Exported entry-point names, in export order.
    pub fn exported_symbols(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|name| name.as_str())
    }

    pub fn address_of(&self, name: &str) -> Option<u32> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Immutable result of assembling one compilation unit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub instructions: Vec<Instruction>,
    pub heap: Heap,
    pub symbols: SymbolTable,
    pub entry_points: EntryPoints,
}

/// Errors loading a serialized program blob.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("blob too short for header")]
    TooShort,

    #[error("bad blob magic")]
    BadMagic,

    #[error("unsupported blob version {0}")]
    UnsupportedVersion(u32),

    #[error("blob payload truncated: header says {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("blob checksum mismatch: expected {expected:#010x}, computed {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("blob payload malformed: {0}")]
    Payload(#[from] postcard::Error),
}

impl Program {
    /// Byte-encode the instruction stream (8-byte little-endian steps).
    pub fn byte_code(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.instructions.len() * STEP_SIZE as usize);
        for instr in &self.instructions {
            bytes.extend_from_slice(&instr.to_bytes());
        }
        bytes
    }

    /// Instruction at a byte address, if the address is step-aligned and in
    /// range.
    pub fn instruction_at(&self, address: u32) -> Option<Instruction> {
        if address % STEP_SIZE != 0 {
            return None;
        }
        self.instructions
            .get((address / STEP_SIZE) as usize)
            .copied()
    }

    /// Serialize to the opaque persistence blob.
    pub fn store(&self) -> Result<Vec<u8>, BlobError> {
        let payload = postcard::to_allocvec(self)?;
        let mut blob = Vec::with_capacity(16 + payload.len());
        blob.extend_from_slice(&BLOB_MAGIC);
        blob.extend_from_slice(&BLOB_VERSION.to_le_bytes());
        blob.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        blob.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        blob.extend_from_slice(&payload);
        Ok(blob)
    }

    /// Reload a program from a persistence blob, validating the header.
    pub fn load(blob: &[u8]) -> Result<Program, BlobError> {
        if blob.len() < 16 {
            return Err(BlobError::TooShort);
        }
        if blob[..4] != BLOB_MAGIC {
            return Err(BlobError::BadMagic);
        }

        let version = u32::from_le_bytes([blob[4], blob[5], blob[6], blob[7]]);
        if version != BLOB_VERSION {
            return Err(BlobError::UnsupportedVersion(version));
        }

        let checksum = u32::from_le_bytes([blob[8], blob[9], blob[10], blob[11]]);
        let len = u32::from_le_bytes([blob[12], blob[13], blob[14], blob[15]]) as usize;

        let payload = &blob[16..];
        if payload.len() != len {
            return Err(BlobError::Truncated {
                expected: len,
                actual: payload.len(),
            });
        }

        let actual = crc32fast::hash(payload);
        if actual != checksum {
            return Err(BlobError::ChecksumMismatch {
                expected: checksum,
                actual,
            });
        }

        Ok(postcard::from_bytes(payload)?)
    }
}
