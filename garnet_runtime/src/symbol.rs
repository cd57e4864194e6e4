//! Interned symbols.
//!
//! Method names are compared on every dispatch, so they are interned once
//! into a process-wide table and carried around as a 32-bit [`Symbol`].
//! Equality and hashing are integer operations; the name is only materialized
//! for diagnostics.

use dashmap::DashMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, OnceLock};

// =============================================================================
// Symbol
// =============================================================================

/// An interned name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    /// Raw table index.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// The name this symbol was interned from.
    pub fn as_str(self) -> Arc<str> {
        symbol_table().name(self)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

// =============================================================================
// Symbol Table
// =============================================================================

/// Bidirectional name ↔ symbol table.
///
/// Interning takes a shard lock in the forward map; resolving a symbol back
/// to its name takes a read lock on the reverse vector.
pub struct SymbolTable {
    by_name: DashMap<Arc<str>, Symbol>,
    names: RwLock<Vec<Arc<str>>>,
}

impl SymbolTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            by_name: DashMap::new(),
            names: RwLock::new(Vec::new()),
        }
    }

    /// Intern `name`, returning the existing symbol if already present.
    pub fn intern(&self, name: &str) -> Symbol {
        if let Some(existing) = self.by_name.get(name) {
            return *existing;
        }

        let key: Arc<str> = Arc::from(name);
        *self.by_name.entry(key.clone()).or_insert_with(|| {
            let mut names = self.names.write();
            let symbol = Symbol(names.len() as u32);
            names.push(key);
            symbol
        })
    }

    /// Resolve a symbol to its name.
    ///
    /// Symbols are only created by [`SymbolTable::intern`], so an unknown
    /// index means the symbol came from a different table.
    pub fn name(&self, symbol: Symbol) -> Arc<str> {
        self.names
            .read()
            .get(symbol.0 as usize)
            .cloned()
            .unwrap_or_else(|| Arc::from(format!("<symbol#{}>", symbol.0)))
    }

    /// Number of interned symbols.
    pub fn len(&self) -> usize {
        self.names.read().len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Global Table Access
// =============================================================================

static SYMBOL_TABLE: OnceLock<SymbolTable> = OnceLock::new();

/// Get the process-wide symbol table.
#[inline]
pub fn symbol_table() -> &'static SymbolTable {
    SYMBOL_TABLE.get_or_init(SymbolTable::new)
}

/// Intern a name in the process-wide table.
#[inline]
pub fn intern(name: &str) -> Symbol {
    symbol_table().intern(name)
}

// =============================================================================
// Core Symbols
// =============================================================================

/// Symbols the dispatch engine and kernel refer to by identity.
#[derive(Debug, Clone, Copy)]
pub struct CoreSymbols {
    pub method_missing: Symbol,
    pub respond_to: Symbol,
    pub respond_to_missing: Symbol,
    pub send: Symbol,
    pub underscore_send: Symbol,
    pub public_send: Symbol,
    pub class: Symbol,
    pub singleton_class: Symbol,
}

static CORE_SYMBOLS: OnceLock<CoreSymbols> = OnceLock::new();

/// Get the well-known core symbols.
pub fn core_symbols() -> &'static CoreSymbols {
    CORE_SYMBOLS.get_or_init(|| CoreSymbols {
        method_missing: intern("method_missing"),
        respond_to: intern("respond_to?"),
        respond_to_missing: intern("respond_to_missing?"),
        send: intern("send"),
        underscore_send: intern("__send__"),
        public_send: intern("public_send"),
        class: intern("class"),
        singleton_class: intern("singleton_class"),
    })
}
