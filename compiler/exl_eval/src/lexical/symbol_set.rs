//! Compact per-block symbol liveness.

use exl_ir::Symbol;
use smallvec::SmallVec;

/// Two bits per symbol: declared, constant.
const BITS_PER_SYMBOL: usize = 2;
const SYMBOLS_PER_WORD: usize = u64::BITS as usize / BITS_PER_SYMBOL;
const DECLARED: u64 = 0b01;
const CONSTANT: u64 = 0b10;

/// Declared/constant bits for the symbols of one block.
///
/// The first 32 symbols live in an inline word; higher symbols spill into
/// an overflow vector of words.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SymbolSet {
    inline: u64,
    overflow: SmallVec<[u64; 2]>,
}

impl SymbolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Word index (0 is the inline word) and bit shift of a symbol.
    #[inline]
    fn locate(symbol: Symbol) -> (usize, usize) {
        let index = symbol.index();
        (
            index / SYMBOLS_PER_WORD,
            (index % SYMBOLS_PER_WORD) * BITS_PER_SYMBOL,
        )
    }

    #[inline]
    fn word(&self, word: usize) -> u64 {
        match word {
            0 => self.inline,
            n => self.overflow.get(n - 1).copied().unwrap_or(0),
        }
    }

    fn word_mut(&mut self, word: usize) -> &mut u64 {
        if word == 0 {
            return &mut self.inline;
        }
        if self.overflow.len() < word {
            self.overflow.resize(word, 0);
        }
        &mut self.overflow[word - 1]
    }

    #[inline]
    fn bits(&self, symbol: Symbol) -> u64 {
        let (word, shift) = Self::locate(symbol);
        (self.word(word) >> shift) & (DECLARED | CONSTANT)
    }

    fn set_bits(&mut self, symbol: Symbol, bits: u64) {
        let (word, shift) = Self::locate(symbol);
        *self.word_mut(word) |= bits << shift;
    }

    /// Mark `symbol` declared. Returns `false` if it already was.
    pub fn declare(&mut self, symbol: Symbol) -> bool {
        if self.is_declared(symbol) {
            return false;
        }
        self.set_bits(symbol, DECLARED);
        true
    }

    /// Mark `symbol` declared and constant. Returns `false` if it was
    /// already constant.
    pub fn declare_constant(&mut self, symbol: Symbol) -> bool {
        if self.is_constant(symbol) {
            return false;
        }
        self.set_bits(symbol, DECLARED | CONSTANT);
        true
    }

    #[inline]
    pub fn is_declared(&self, symbol: Symbol) -> bool {
        self.bits(symbol) & DECLARED != 0
    }

    #[inline]
    pub fn is_constant(&self, symbol: Symbol) -> bool {
        self.bits(symbol) & CONSTANT != 0
    }

    pub fn is_empty(&self) -> bool {
        self.inline == 0 && self.overflow.iter().all(|&w| w == 0)
    }

    /// Declared symbols in ascending order.
    pub fn declared(&self) -> impl Iterator<Item = Symbol> + '_ {
        std::iter::once(self.inline)
            .chain(self.overflow.iter().copied())
            .enumerate()
            .flat_map(|(word, bits)| {
                (0..SYMBOLS_PER_WORD)
                    .filter(move |slot| (bits >> (slot * BITS_PER_SYMBOL)) & DECLARED != 0)
                    .map(move |slot| Symbol::from_index(word * SYMBOLS_PER_WORD + slot))
            })
    }

    pub fn clear(&mut self) {
        self.inline = 0;
        self.overflow.clear();
    }
}
