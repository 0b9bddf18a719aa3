//! Call frames: the runtime storage for one activation of a [`Scope`].

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use exl_ir::Symbol;

use crate::closure::Closure;
use crate::scope::Scope;
use crate::value::Value;

/// Content of one frame slot.
///
/// The two sentinels are distinct from every value, `Value::Null`
/// included.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Never declared in this activation.
    #[default]
    Undeclared,
    /// Declared but not assigned yet.
    Undefined,
    Value(Value),
    /// The closure owning this frame. Only appears in a closure's captured
    /// frame; call frames have it resolved to the running closure.
    SelfRef,
}

impl Slot {
    pub fn value(&self) -> Option<&Value> {
        match self {
            Slot::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_declared(&self) -> bool {
        !matches!(self, Slot::Undeclared)
    }
}

/// The values of one activation, indexed by symbol.
///
/// Cloning copies the storage: two frames never share a mutable array.
#[derive(Clone)]
pub struct Frame {
    scope: Arc<Scope>,
    stack: Vec<Slot>,
    /// Number of leading parameters already bound.
    curried: usize,
}

impl Frame {
    pub(crate) fn new(scope: Arc<Scope>, stack: Vec<Slot>, curried: usize) -> Self {
        Frame {
            scope,
            stack,
            curried,
        }
    }

    pub fn scope(&self) -> &Arc<Scope> {
        &self.scope
    }

    pub fn curried(&self) -> usize {
        self.curried
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.stack
    }

    /// Panics if `symbol` is outside this frame.
    #[inline]
    pub fn slot(&self, symbol: Symbol) -> &Slot {
        &self.stack[symbol.index()]
    }

    /// The value bound to `symbol`; `None` for sentinels.
    #[inline]
    pub fn get(&self, symbol: Symbol) -> Option<&Value> {
        self.slot(symbol).value()
    }

    #[inline]
    pub fn set(&mut self, symbol: Symbol, value: Value) {
        self.stack[symbol.index()] = Slot::Value(value);
    }

    #[inline]
    pub fn set_slot(&mut self, symbol: Symbol, slot: Slot) {
        self.stack[symbol.index()] = slot;
    }

    /// True unless the slot is [`Slot::Undeclared`].
    #[inline]
    pub fn has(&self, symbol: Symbol) -> bool {
        self.slot(symbol).is_declared()
    }

    /// Bind more arguments, producing a new frame.
    ///
    /// Values fill the unbound fixed parameters first. For a variadic
    /// scope, the rest is appended to the vararg array, each array
    /// argument contributing its elements; the vararg slot always holds an
    /// array afterwards. Surplus values of a non-variadic scope are dropped.
    ///
    /// Binding `[a, b]` then `[c]` gives the same frame as binding
    /// `[a, b, c]` at once.
    #[must_use]
    pub fn assign(&self, values: &[Value]) -> Frame {
        let mut frame = self.clone();
        if self.stack.is_empty() {
            return frame;
        }

        let nparm = self.scope.arg_count();
        let var_args = self.scope.is_var_args();
        let fixed = if var_args { nparm - 1 } else { nparm };

        let ncopy = fixed.saturating_sub(self.curried).min(values.len());
        for (i, value) in values[..ncopy].iter().enumerate() {
            frame.stack[self.curried + i] = Slot::Value(value.clone());
        }
        frame.curried = self.curried + ncopy;

        if var_args && frame.curried == fixed {
            let rest = &values[ncopy..];
            let mut items = match &frame.stack[fixed] {
                Slot::Value(Value::Array(previous)) => previous.items().to_vec(),
                _ => Vec::with_capacity(rest.len()),
            };
            for value in rest {
                match value {
                    Value::Array(spread) => items.extend_from_slice(spread.items()),
                    _ => items.push(value.clone()),
                }
            }
            frame.stack[fixed] = Slot::Value(Value::array(self.scope.var_arg_type(), items));
        }
        frame
    }

    /// Parameter names not bound yet.
    pub fn unbound_parameters(&self) -> Vec<String> {
        self.scope.parameters_from(self.curried)
    }

    /// Copy of the storage with every reference to `owner` replaced by
    /// [`Slot::SelfRef`]. Used for hashing and equality only.
    pub fn nocycle_stack(&self, owner: &Closure) -> Vec<Slot> {
        self.stack
            .iter()
            .map(|slot| match slot {
                Slot::Value(Value::Closure(c)) if c.same_as(owner) => Slot::SelfRef,
                other => other.clone(),
            })
            .collect()
    }

    /// Replace [`Slot::SelfRef`] with the running closure.
    pub(crate) fn resolve_self(&mut self, owner: &Closure) {
        for slot in &mut self.stack {
            if matches!(slot, Slot::SelfRef) {
                *slot = Slot::Value(Value::Closure(owner.clone()));
            }
        }
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.curried == other.curried && self.stack == other.stack && self.scope == other.scope
    }
}

impl Eq for Frame {}

impl Hash for Frame {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.curried.hash(state);
        self.stack.hash(state);
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("curried", &self.curried)
            .field("stack", &self.stack)
            .finish_non_exhaustive()
    }
}
