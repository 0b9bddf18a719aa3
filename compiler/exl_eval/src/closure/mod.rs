//! Closures: callable values over a lambda and a captured frame.
//!
//! A closure is created three ways:
//! - fresh, when the evaluator reaches a lambda literal ([`Closure::new`]),
//!   capturing the hoisted values of the enclosing activation
//! - by currying ([`Closure::curry`]), extending the captured frame with
//!   more leading arguments
//! - by chaining ([`Closure::chain`]), feeding the result into another
//!   closure
//!
//! # Recursive self-reference
//!
//! `var fact = function(n) { n <= 1 ? 1 : n * fact(n - 1) }` captures
//! `fact` before it is assigned. The evaluator patches the captured slot
//! with [`Closure::capture_self_if_recursive`], which stores
//! [`Slot::SelfRef`] rather than the closure itself. The marker is
//! replaced by the running closure only in the call frame built by
//! [`Closure::execute`], so a closure never owns a reference to itself.

mod shape;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use exl_ir::Symbol;

use crate::engine::{Lambda, SharedContext, SharedEngine};
use crate::errors::EvalResult;
use crate::frame::{Frame, Slot};
use crate::scope::Scope;
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;

pub use shape::{ParamKind, Shape};

/// A callable value.
///
/// Cheap to clone; the captured state is shared and copied on write.
#[derive(Clone)]
pub struct Closure(Arc<ClosureInner>);

#[derive(Clone)]
struct ClosureInner {
    engine: SharedEngine,
    lambda: Arc<Lambda>,
    frame: Frame,
    /// Context active when the closure was created.
    context: SharedContext,
    chained: Option<Closure>,
    shape: Shape,
}

impl Closure {
    /// Capture a lambda literal in the activation `caller`.
    pub fn new(
        engine: SharedEngine,
        lambda: Arc<Lambda>,
        context: SharedContext,
        caller: Option<&Frame>,
    ) -> Self {
        let frame = lambda.scope().create_frame(caller, &[]);
        Self::from_parts(engine, lambda, frame, context, None)
    }

    /// Bind `args` to an uncurried lambda.
    pub fn from_lambda(
        engine: SharedEngine,
        lambda: Arc<Lambda>,
        context: SharedContext,
        args: &[Value],
    ) -> Self {
        let frame = lambda.scope().create_frame(None, args);
        Self::from_parts(engine, lambda, frame, context, None)
    }

    fn from_parts(
        engine: SharedEngine,
        lambda: Arc<Lambda>,
        frame: Frame,
        context: SharedContext,
        chained: Option<Closure>,
    ) -> Self {
        let shape = Shape::of(&frame);
        Closure(Arc::new(ClosureInner {
            engine,
            lambda,
            frame,
            context,
            chained,
            shape,
        }))
    }

    /// The captured frame with self-references bound to this closure.
    ///
    /// Used whenever the frame moves to a different closure instance.
    fn detached_frame(&self) -> Frame {
        let mut frame = self.0.frame.clone();
        frame.resolve_self(self);
        frame
    }

    /// Partially apply leading arguments.
    #[must_use]
    pub fn curry(&self, args: &[Value]) -> Closure {
        if args.is_empty() {
            return self.clone();
        }
        let frame = self.detached_frame().assign(args);
        tracing::trace!(lambda = %self.0.lambda.node(), curried = frame.curried(), "curry");
        Self::from_parts(
            Arc::clone(&self.0.engine),
            Arc::clone(&self.0.lambda),
            frame,
            Arc::clone(&self.0.context),
            self.0.chained.clone(),
        )
    }

    /// Compose: the result of this closure feeds `next`.
    ///
    /// An array result is spread across `next`'s parameters; any other
    /// result is passed as its only argument. Chaining onto an already
    /// chained closure appends `next` at the end of the chain.
    #[must_use]
    pub fn chain(&self, next: Closure) -> Closure {
        let chained = match &self.0.chained {
            Some(existing) => existing.chain(next),
            None => next,
        };
        tracing::trace!(lambda = %self.0.lambda.node(), "chain");
        Self::from_parts(
            Arc::clone(&self.0.engine),
            Arc::clone(&self.0.lambda),
            self.detached_frame(),
            Arc::clone(&self.0.context),
            Some(chained),
        )
    }

    /// The same closure evaluated by another engine.
    #[must_use]
    pub fn with_engine(&self, engine: SharedEngine) -> Closure {
        let mut inner = (*self.0).clone();
        inner.engine = engine;
        Closure(Arc::new(inner))
    }

    /// Call the closure.
    ///
    /// `args` are bound after the curried ones. The body runs in
    /// `context`, or in the capturing context when none is given.
    #[tracing::instrument(level = "debug", skip_all, fields(lambda = %self.0.lambda.node(), args = args.len()))]
    pub fn execute(&self, context: Option<&SharedContext>, args: &[Value]) -> EvalResult {
        let mut frame = self.0.frame.assign(args);
        frame.resolve_self(self);
        let target = context.unwrap_or(&self.0.context);
        let result = ensure_sufficient_stack(|| {
            self.0.engine.evaluate(&self.0.lambda, frame, target)
        })?;
        match &self.0.chained {
            None => Ok(result),
            Some(next) => match &result {
                Value::Array(spread) => next.execute(context, spread.items()),
                _ => next.execute(context, std::slice::from_ref(&result)),
            },
        }
    }

    /// Write `value` into the captured slot `symbol`.
    ///
    /// A value that is this very closure is stored as [`Slot::SelfRef`].
    pub fn set_captured(&mut self, symbol: Symbol, value: Value) {
        let slot = match value {
            Value::Closure(c) if c.same_as(self) => Slot::SelfRef,
            other => Slot::Value(other),
        };
        Arc::make_mut(&mut self.0).frame.set_slot(symbol, slot);
    }

    /// Patch a recursive binding.
    ///
    /// When this closure captured `parent_symbol` of `parent_scope` (the
    /// variable the closure is being assigned to), the captured slot is
    /// made to refer to the closure itself. Returns whether a slot was
    /// patched. The caller must store the patched closure.
    pub fn capture_self_if_recursive(
        &mut self,
        parent_scope: &Arc<Scope>,
        parent_symbol: Symbol,
    ) -> bool {
        let scope = self.0.lambda.scope();
        if !scope
            .parent()
            .is_some_and(|parent| Arc::ptr_eq(parent, parent_scope))
        {
            return false;
        }
        let Some(local) = scope.captured_by(parent_symbol) else {
            return false;
        };
        Arc::make_mut(&mut self.0).frame.set_slot(local, Slot::SelfRef);
        true
    }

    /// Identity comparison.
    #[inline]
    pub fn same_as(&self, other: &Closure) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    // Accessors

    pub fn lambda(&self) -> &Arc<Lambda> {
        &self.0.lambda
    }

    pub fn scope(&self) -> &Arc<Scope> {
        self.0.lambda.scope()
    }

    pub fn frame(&self) -> &Frame {
        &self.0.frame
    }

    pub fn context(&self) -> &SharedContext {
        &self.0.context
    }

    pub fn engine(&self) -> &SharedEngine {
        &self.0.engine
    }

    pub fn chained(&self) -> Option<&Closure> {
        self.0.chained.as_ref()
    }

    pub fn shape(&self) -> Shape {
        self.0.shape
    }

    pub fn curried(&self) -> usize {
        self.0.frame.curried()
    }

    pub fn parameters(&self) -> Vec<String> {
        self.scope().parameters()
    }

    pub fn unbound_parameters(&self) -> Vec<String> {
        self.0.frame.unbound_parameters()
    }

    // Shaped entry points

    pub fn call0(&self) -> EvalResult {
        self.execute(None, &[])
    }

    pub fn call1(&self, arg: Value) -> EvalResult {
        self.execute(None, &[arg])
    }

    pub fn call2(&self, first: Value, second: Value) -> EvalResult {
        self.execute(None, &[first, second])
    }

    /// Call with one `int`, widened to the parameter's declared type.
    pub fn call_int(&self, arg: i32) -> EvalResult {
        self.call1(self.0.shape.int_arg(arg))
    }

    /// Call with one `long`, narrowed to `int` when the parameter is
    /// declared `int` and the value fits.
    pub fn call_long(&self, arg: i64) -> EvalResult {
        self.call1(self.0.shape.long_arg(arg))
    }

    pub fn call_double(&self, arg: f64) -> EvalResult {
        self.call1(Value::Double(arg))
    }
}

impl PartialEq for Closure {
    fn eq(&self, other: &Self) -> bool {
        if self.same_as(other) {
            return true;
        }
        std::ptr::addr_eq(Arc::as_ptr(&self.0.engine), Arc::as_ptr(&other.0.engine))
            && self.0.lambda.node() == other.0.lambda.node()
            && self.0.frame.curried() == other.0.frame.curried()
            && self.0.frame.nocycle_stack(self) == other.0.frame.nocycle_stack(other)
            && self.0.chained == other.0.chained
    }
}

impl Eq for Closure {}

impl Hash for Closure {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.lambda.node().hash(state);
        self.0.frame.curried().hash(state);
        self.0.frame.nocycle_stack(self).hash(state);
        self.0.chained.hash(state);
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("lambda", &self.0.lambda.node())
            .field("curried", &self.0.frame.curried())
            .field("shape", &self.0.shape)
            .field("chained", &self.0.chained.is_some())
            .finish()
    }
}
