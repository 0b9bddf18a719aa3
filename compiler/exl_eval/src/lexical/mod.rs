//! Block-level symbol liveness within one activation.
//!
//! A [`LexicalFrame`] layers a stack of blocks over a [`Frame`]. Each
//! block records which symbols it declared. Popping a block undefines
//! those symbols and restores any hoisted value the block shadowed, so a
//! nested block can rebind a captured variable and hand it back intact.
//!
//! # RAII Guards
//!
//! `LexicalFrame::block()` returns a guard that pops the block on drop,
//! including during unwinding:
//!
//! ```text
//! {
//!     let mut block = lex.block();
//!     block.declare(x)?;
//!     // ... evaluate the block body ...
//! } // block popped here
//! ```

mod symbol_set;

use std::ops::{Deref, DerefMut};

use exl_ir::{Symbol, ValueType};

use crate::errors::{lexical_clash, EvalError};
use crate::frame::{Frame, Slot};

pub use symbol_set::SymbolSet;

/// Symbols declared in one block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LexicalScope {
    symbols: SymbolSet,
    count: usize,
}

impl LexicalScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the symbol is already declared in this block.
    pub fn add_symbol(&mut self, symbol: Symbol) -> bool {
        let added = self.symbols.declare(symbol);
        if added {
            self.count += 1;
        }
        added
    }

    /// Declare `symbol` (if needed) and mark it constant.
    pub fn add_constant(&mut self, symbol: Symbol) -> bool {
        if !self.symbols.is_declared(symbol) {
            self.count += 1;
        }
        self.symbols.declare_constant(symbol)
    }

    pub fn has_symbol(&self, symbol: Symbol) -> bool {
        self.symbols.is_declared(symbol)
    }

    pub fn is_constant(&self, symbol: Symbol) -> bool {
        self.symbols.is_constant(symbol)
    }

    pub fn symbol_count(&self) -> usize {
        self.count
    }

    /// Forget every symbol, passing each to `f` first.
    pub fn clear_symbols(&mut self, mut f: impl FnMut(Symbol)) {
        for symbol in self.symbols.declared() {
            f(symbol);
        }
        self.symbols.clear();
        self.count = 0;
    }
}

#[derive(Default)]
struct Block {
    scope: LexicalScope,
    /// Prior slots of shadowed hoisted symbols, in declaration order.
    saved: Vec<(Symbol, Slot)>,
}

/// A frame plus the stack of blocks currently open over it.
pub struct LexicalFrame {
    frame: Frame,
    current: Block,
    enclosing: Vec<Block>,
}

impl LexicalFrame {
    /// Open the function-body block over `frame`.
    pub fn new(frame: Frame) -> Self {
        LexicalFrame {
            frame,
            current: Block::default(),
            enclosing: Vec::new(),
        }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn frame_mut(&mut self) -> &mut Frame {
        &mut self.frame
    }

    pub fn into_frame(self) -> Frame {
        self.frame
    }

    /// The innermost open block.
    pub fn current(&self) -> &LexicalScope {
        &self.current.scope
    }

    /// Number of blocks open above the function-body block.
    pub fn depth(&self) -> usize {
        self.enclosing.len()
    }

    /// Mark every parameter live in the current block.
    pub fn define_args(&mut self) {
        for index in 0..self.frame.scope().arg_count() {
            self.current.scope.add_symbol(Symbol::from_index(index));
        }
    }

    /// Declare `symbol` in the current block.
    ///
    /// Returns `false` if it is already declared in this block. A hoisted
    /// symbol has its current slot saved and is reset to undefined until
    /// the block assigns it.
    pub fn declare_symbol(&mut self, symbol: Symbol) -> bool {
        if !self.current.scope.add_symbol(symbol) {
            return false;
        }
        if self.frame.scope().is_hoisted(symbol) {
            let prior = self.frame.slot(symbol).clone();
            self.frame.set_slot(symbol, Slot::Undefined);
            self.current.saved.push((symbol, prior));
        }
        true
    }

    /// [`declare_symbol`](Self::declare_symbol), reporting a clash as an error.
    pub fn declare(&mut self, symbol: Symbol) -> Result<(), EvalError> {
        if self.declare_symbol(symbol) {
            return Ok(());
        }
        let name = self.frame.scope().name_of(symbol).unwrap_or_default();
        tracing::debug!(%symbol, name = %name, "lexical clash");
        Err(lexical_clash(&name))
    }

    /// Declare `symbol` as a constant of the current block.
    pub fn declare_constant(&mut self, symbol: Symbol) -> Result<(), EvalError> {
        self.declare(symbol)?;
        self.current.scope.add_constant(symbol);
        Ok(())
    }

    /// Whether any open block declares `symbol`.
    pub fn has_symbol(&self, symbol: Symbol) -> bool {
        self.blocks().any(|block| block.scope.has_symbol(symbol))
    }

    /// Constant in the nearest declaring block, else final in the scope.
    pub fn is_constant(&self, symbol: Symbol) -> bool {
        match self.blocks().find(|block| block.scope.has_symbol(symbol)) {
            Some(block) => block.scope.is_constant(symbol) || self.frame.scope().is_final(symbol),
            None => self.frame.scope().is_final(symbol),
        }
    }

    pub fn declared_type(&self, symbol: Symbol) -> Option<ValueType> {
        self.frame.scope().declared_type(symbol)
    }

    pub fn is_required(&self, symbol: Symbol) -> bool {
        self.frame.scope().is_required(symbol)
    }

    /// Open a nested block.
    pub fn push(&mut self) {
        let enclosing = std::mem::take(&mut self.current);
        self.enclosing.push(enclosing);
    }

    /// Close the innermost block.
    ///
    /// Symbols it declared become undefined; shadowed hoisted symbols get
    /// their prior slot back, latest declaration first. Returns the block
    /// now current, or `None` when only the function-body block is open.
    pub fn pop(&mut self) -> Option<&LexicalScope> {
        let enclosing = self.enclosing.pop()?;
        let mut closed = std::mem::replace(&mut self.current, enclosing);
        let frame = &mut self.frame;
        closed
            .scope
            .clear_symbols(|symbol| frame.set_slot(symbol, Slot::Undefined));
        while let Some((symbol, prior)) = closed.saved.pop() {
            frame.set_slot(symbol, prior);
        }
        Some(&self.current.scope)
    }

    /// Open a block that is popped when the guard drops.
    pub fn block(&mut self) -> BlockGuard<'_> {
        self.push();
        BlockGuard { lex: self }
    }

    /// Run `f` inside a nested block.
    pub fn with_block<R>(&mut self, f: impl FnOnce(&mut LexicalFrame) -> R) -> R {
        let mut guard = self.block();
        f(&mut *guard)
    }

    /// Open blocks, innermost first.
    fn blocks(&self) -> impl Iterator<Item = &Block> {
        std::iter::once(&self.current).chain(self.enclosing.iter().rev())
    }
}

/// Pops its block when dropped.
pub struct BlockGuard<'a> {
    lex: &'a mut LexicalFrame,
}

impl Deref for BlockGuard<'_> {
    type Target = LexicalFrame;

    fn deref(&self) -> &LexicalFrame {
        self.lex
    }
}

impl DerefMut for BlockGuard<'_> {
    fn deref_mut(&mut self) -> &mut LexicalFrame {
        self.lex
    }
}

impl Drop for BlockGuard<'_> {
    fn drop(&mut self) {
        self.lex.pop();
    }
}

#[cfg(test)]
mod tests;
