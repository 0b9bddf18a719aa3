//! Static symbol tables for lambdas and scripts.
//!
//! A `Scope` describes the parameters and local variables of one function
//! body. It is built while the body is parsed and then shared (through
//! `Arc`) by every closure and call frame created for that body.
//!
//! # Symbol layout
//!
//! Symbols are dense indices allocated in declaration order:
//! - `[0, arg_count)`: parameters
//! - `[arg_count, symbol_count)`: locals and hoisted captures
//!
//! A symbol is also the slot index of the value in a [`Frame`].
//!
//! # Hoisting
//!
//! Resolving a free identifier walks the parent chain. On success a local
//! symbol is allocated and linked to the parent's symbol; frames built for
//! this scope copy the parent's value into that slot. Hoisted symbols are
//! final: they are snapshots of the enclosing binding.

use std::fmt;
use std::hash::{BuildHasherDefault, Hash, Hasher};
use std::sync::Arc;

use bitflags::bitflags;
use exl_ir::{Symbol, ValueType};
use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHasher};

use crate::errors::{final_redeclared, parameter_after_variable, EvalError};
use crate::frame::{Frame, Slot};
use crate::value::Value;

/// Insertion-ordered map with the Fx hasher.
pub(crate) type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

bitflags! {
    /// Declaration modifiers of a symbol.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct SymbolFlags: u8 {
        /// Assigned once; redeclaration is an error.
        const FINAL = 1 << 0;
        /// Must never hold null.
        const REQUIRED = 1 << 1;
    }
}

/// Per-symbol metadata attached at declaration.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SymbolInfo {
    pub declared_type: Option<ValueType>,
    pub flags: SymbolFlags,
}

impl SymbolInfo {
    pub const fn new() -> Self {
        SymbolInfo {
            declared_type: None,
            flags: SymbolFlags::empty(),
        }
    }

    #[must_use]
    pub const fn with_type(mut self, ty: ValueType) -> Self {
        self.declared_type = Some(ty);
        self
    }

    #[must_use]
    pub fn with_final(mut self) -> Self {
        self.flags |= SymbolFlags::FINAL;
        self
    }

    #[must_use]
    pub fn with_required(mut self) -> Self {
        self.flags |= SymbolFlags::REQUIRED;
        self
    }

    #[inline]
    pub fn is_final(&self) -> bool {
        self.flags.contains(SymbolFlags::FINAL)
    }

    #[inline]
    pub fn is_required(&self) -> bool {
        self.flags.contains(SymbolFlags::REQUIRED)
    }
}

#[derive(Clone, Default)]
struct ScopeTables {
    /// Name to symbol, in declaration order. The position of a name in
    /// this map is its symbol index.
    names: FxIndexMap<String, Symbol>,
    /// Local symbol to the parent symbol it was hoisted from.
    hoisted: FxIndexMap<Symbol, Symbol>,
    info: FxHashMap<Symbol, SymbolInfo>,
    parms: usize,
    vars: usize,
    var_args: bool,
}

impl ScopeTables {
    fn allocate(&mut self, name: &str) -> Symbol {
        let symbol = Symbol::from_index(self.names.len());
        self.names.insert(name.to_string(), symbol);
        symbol
    }

    fn name_of(&self, symbol: Symbol) -> Option<&str> {
        self.names
            .get_index(symbol.index())
            .map(|(name, _)| name.as_str())
    }
}

/// The static description of a function body's symbols.
///
/// Tables sit behind a lock so that hoisting can extend a scope reached
/// through a shared `Arc` parent link. Locks are only ever taken child
/// before parent, and never held across a call into another scope.
pub struct Scope {
    parent: Option<Arc<Scope>>,
    tables: RwLock<ScopeTables>,
}

impl Scope {
    /// A top-level scope (script body).
    pub fn new() -> Self {
        Scope {
            parent: None,
            tables: RwLock::new(ScopeTables::default()),
        }
    }

    /// A lambda scope nested in `parent`.
    pub fn with_parent(parent: Arc<Scope>) -> Self {
        Scope {
            parent: Some(parent),
            tables: RwLock::new(ScopeTables::default()),
        }
    }

    pub fn parent(&self) -> Option<&Arc<Scope>> {
        self.parent.as_ref()
    }

    /// Declare a parameter.
    ///
    /// Parameters must precede every other symbol. Redeclaring a parameter
    /// name returns its existing symbol.
    pub fn declare_parameter(&self, name: &str, info: SymbolInfo) -> Result<Symbol, EvalError> {
        let mut tables = self.tables.write();
        if let Some(&symbol) = tables.names.get(name) {
            return Ok(symbol);
        }
        if tables.names.len() > tables.parms {
            return Err(parameter_after_variable(name));
        }
        let symbol = tables.allocate(name);
        tables.parms += 1;
        tables.info.insert(symbol, info);
        Ok(symbol)
    }

    /// Declare a local variable.
    ///
    /// A new name that an enclosing scope also resolves is linked to the
    /// enclosing symbol so frames start from the captured value.
    /// Redeclaring an existing name updates its metadata, unless the
    /// existing symbol is final; the metadata is left untouched then.
    pub fn declare_variable(&self, name: &str, info: SymbolInfo) -> Result<Symbol, EvalError> {
        {
            let mut tables = self.tables.write();
            if let Some(&symbol) = tables.names.get(name) {
                let existing = tables.info.get(&symbol).copied().unwrap_or_default();
                if existing.is_final() {
                    return Err(final_redeclared(name));
                }
                tables.info.insert(symbol, info);
                return Ok(symbol);
            }
        }

        // Resolve in the parent without holding our own lock.
        let captured = match &self.parent {
            Some(parent) => parent.get_symbol(name, true),
            None => None,
        };

        let mut tables = self.tables.write();
        if let Some(&symbol) = tables.names.get(name) {
            // Hoisted concurrently by a lookup on another thread.
            if tables.info.get(&symbol).is_some_and(SymbolInfo::is_final) {
                return Err(final_redeclared(name));
            }
            tables.info.insert(symbol, info);
            return Ok(symbol);
        }
        let symbol = tables.allocate(name);
        tables.vars += 1;
        tables.info.insert(symbol, info);
        if let Some(parent_symbol) = captured {
            tables.hoisted.insert(symbol, parent_symbol);
            tracing::trace!(name, %symbol, %parent_symbol, "variable captures enclosing binding");
        }
        Ok(symbol)
    }

    /// Mark the last parameter as accumulating extra arguments.
    pub fn declare_var_args(&self) {
        self.tables.write().var_args = true;
    }

    /// Resolve a name, hoisting it from enclosing scopes when `hoist` is set.
    pub fn get_symbol(&self, name: &str, hoist: bool) -> Option<Symbol> {
        if let Some(&symbol) = self.tables.read().names.get(name) {
            return Some(symbol);
        }
        if !hoist {
            return None;
        }
        let parent = self.parent.as_ref()?;
        let parent_symbol = parent.get_symbol(name, true)?;
        let declared_type = parent.declared_type(parent_symbol);

        let mut tables = self.tables.write();
        if let Some(&symbol) = tables.names.get(name) {
            return Some(symbol);
        }
        let symbol = tables.allocate(name);
        tables.hoisted.insert(symbol, parent_symbol);
        tables.info.insert(
            symbol,
            SymbolInfo {
                declared_type,
                flags: SymbolFlags::FINAL,
            },
        );
        tracing::trace!(name, %symbol, %parent_symbol, "hoisted symbol");
        Some(symbol)
    }

    /// Build a frame for one activation of this scope.
    ///
    /// Hoisted slots are copied from `caller`, which must be a frame of the
    /// parent scope. Every other slot starts undeclared; `args` are then
    /// bound from symbol 0.
    pub fn create_frame(self: &Arc<Self>, caller: Option<&Frame>, args: &[Value]) -> Frame {
        let stack = {
            let tables = self.tables.read();
            let mut stack = vec![Slot::Undeclared; tables.names.len()];
            if let Some(caller) = caller {
                for (&local, &parent) in &tables.hoisted {
                    stack[local.index()] = caller.slot(parent).clone();
                }
            }
            stack
        };
        Frame::new(Arc::clone(self), stack, 0).assign(args)
    }

    // Queries

    pub fn arg_count(&self) -> usize {
        self.tables.read().parms
    }

    pub fn symbol_count(&self) -> usize {
        self.tables.read().names.len()
    }

    /// Number of declared (non-hoisted) local variables.
    pub fn var_count(&self) -> usize {
        self.tables.read().vars
    }

    /// Whether the last parameter accumulates extra arguments.
    pub fn is_var_args(&self) -> bool {
        let tables = self.tables.read();
        tables.var_args && tables.parms > 0
    }

    /// Declared element type of the vararg parameter.
    pub fn var_arg_type(&self) -> ValueType {
        let tables = self.tables.read();
        tables
            .parms
            .checked_sub(1)
            .and_then(|last| tables.info.get(&Symbol::from_index(last)))
            .and_then(|info| info.declared_type)
            .unwrap_or_default()
    }

    /// All symbol names in declaration order.
    pub fn symbols(&self) -> Vec<String> {
        self.tables.read().names.keys().cloned().collect()
    }

    pub fn parameters(&self) -> Vec<String> {
        self.parameters_from(0)
    }

    /// Parameter names from position `bound` on.
    pub fn parameters_from(&self, bound: usize) -> Vec<String> {
        let tables = self.tables.read();
        let parms = tables.parms;
        tables
            .names
            .keys()
            .take(parms)
            .skip(bound)
            .cloned()
            .collect()
    }

    /// Non-parameter, non-hoisted local names.
    pub fn local_variables(&self) -> Vec<String> {
        let tables = self.tables.read();
        tables
            .names
            .iter()
            .skip(tables.parms)
            .filter(|(_, symbol)| !tables.hoisted.contains_key(*symbol))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Names captured from enclosing scopes.
    pub fn hoisted_variables(&self) -> Vec<String> {
        let tables = self.tables.read();
        tables
            .hoisted
            .keys()
            .filter_map(|&symbol| tables.name_of(symbol).map(str::to_string))
            .collect()
    }

    pub fn is_hoisted(&self, symbol: Symbol) -> bool {
        self.tables.read().hoisted.contains_key(&symbol)
    }

    /// Parent symbol a hoisted symbol was captured from.
    pub fn hoisted_from(&self, symbol: Symbol) -> Option<Symbol> {
        self.tables.read().hoisted.get(&symbol).copied()
    }

    /// Local symbol that captures `parent_symbol`, if any.
    pub fn captured_by(&self, parent_symbol: Symbol) -> Option<Symbol> {
        self.tables
            .read()
            .hoisted
            .iter()
            .find(|(_, parent)| **parent == parent_symbol)
            .map(|(&local, _)| local)
    }

    pub fn name_of(&self, symbol: Symbol) -> Option<String> {
        self.tables.read().name_of(symbol).map(str::to_string)
    }

    pub fn info(&self, symbol: Symbol) -> SymbolInfo {
        self.tables
            .read()
            .info
            .get(&symbol)
            .copied()
            .unwrap_or_default()
    }

    pub fn declared_type(&self, symbol: Symbol) -> Option<ValueType> {
        self.info(symbol).declared_type
    }

    pub fn is_final(&self, symbol: Symbol) -> bool {
        self.info(symbol).is_final()
    }

    pub fn is_required(&self, symbol: Symbol) -> bool {
        self.info(symbol).is_required()
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        {
            let (a, b) = (self.tables.read(), other.tables.read());
            let same = a.parms == b.parms
                && a.var_args == b.var_args
                && a.names.len() == b.names.len()
                && a.names.keys().eq(b.names.keys())
                && a.hoisted.iter().eq(b.hoisted.iter());
            if !same {
                return false;
            }
        }
        match (&self.parent, &other.parent) {
            (None, None) => true,
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Scope {}

impl Hash for Scope {
    fn hash<H: Hasher>(&self, state: &mut H) {
        {
            let tables = self.tables.read();
            tables.parms.hash(state);
            tables.var_args.hash(state);
            for name in tables.names.keys() {
                name.hash(state);
            }
            for (local, parent) in &tables.hoisted {
                local.hash(state);
                parent.hash(state);
            }
        }
        if let Some(parent) = &self.parent {
            parent.hash(state);
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables = self.tables.read();
        f.debug_struct("Scope")
            .field("symbols", &tables.names.keys().collect::<Vec<_>>())
            .field("parms", &tables.parms)
            .field("hoisted", &tables.hoisted)
            .field("var_args", &tables.var_args)
            .field("nested", &self.parent.is_some())
            .finish()
    }
}
