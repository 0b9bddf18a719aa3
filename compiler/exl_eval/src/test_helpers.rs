//! Test helpers for runtime unit tests.
//!
//! Provides scripted stand-ins for the collaborators the runtime core
//! talks to:
//! - `MockEngine`: lambda bodies are Rust closures keyed by `NodeId`
//! - `MockArithmetic`: integer/string default operator semantics
//! - `MockOverloads` / `MockMethods`: overload and reflective resolvers
//!   over a few host test types (`Money`, `Counter`, `Bag`, `Cell`)

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::missing_panics_doc
)]

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::{
    Arithmetic, EmptyContext, Engine, EvalResult, Frame, HostError, HostObject, Lambda,
    MethodHandle, MethodResolver, NodeId, Operator, OverloadResolver, Scope, SharedContext,
    SharedEngine, SharedMethod, Symbol, SymbolInfo, Value, ValueType,
};

// Engine

type Body = Box<dyn Fn(&Frame, &SharedContext) -> EvalResult + Send + Sync>;

/// Engine whose lambda bodies are registered Rust closures.
pub struct MockEngine {
    bodies: FxHashMap<NodeId, Body>,
    calls: AtomicUsize,
}

impl MockEngine {
    pub fn new() -> Self {
        MockEngine {
            bodies: FxHashMap::default(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Register the body evaluated for lambda `node`.
    pub fn with_body(
        mut self,
        node: u32,
        body: impl Fn(&Frame, &SharedContext) -> EvalResult + Send + Sync + 'static,
    ) -> Self {
        self.bodies.insert(NodeId::new(node), Box::new(body));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn shared(self) -> Arc<MockEngine> {
        Arc::new(self)
    }
}

impl Engine for MockEngine {
    fn evaluate(&self, lambda: &Lambda, frame: Frame, context: &SharedContext) -> EvalResult {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let body = self
            .bodies
            .get(&lambda.node())
            .unwrap_or_else(|| panic!("no body registered for {}", lambda.node()));
        body(&frame, context)
    }
}

/// Upcast helper.
pub fn as_engine(engine: &Arc<MockEngine>) -> SharedEngine {
    Arc::clone(engine) as SharedEngine
}

pub fn empty_context() -> SharedContext {
    Arc::new(EmptyContext)
}

/// Read the value of symbol `index`, panicking on a sentinel.
pub fn arg(frame: &Frame, index: u32) -> Value {
    frame
        .get(Symbol::new(index))
        .cloned()
        .unwrap_or_else(|| panic!("slot {index} holds {:?}", frame.slot(Symbol::new(index))))
}

pub fn long_arg(frame: &Frame, index: u32) -> i64 {
    arg(frame, index).as_long().unwrap()
}

/// A top-level scope with parameters `params`.
pub fn scope_with_params(params: &[&str]) -> Arc<Scope> {
    let scope = Scope::new();
    for name in params {
        scope.declare_parameter(name, SymbolInfo::new()).unwrap();
    }
    Arc::new(scope)
}

pub fn ints(values: &[i32]) -> Vec<Value> {
    values.iter().copied().map(Value::Int).collect()
}

// Arithmetic

/// Integer and string arithmetic, enough to exercise dispatch fallbacks.
pub struct MockArithmetic {
    pub strict: bool,
}

impl MockArithmetic {
    pub fn new() -> Self {
        MockArithmetic { strict: true }
    }

    pub fn lenient() -> Self {
        MockArithmetic { strict: false }
    }

    fn both_long(left: &Value, right: &Value) -> Option<(i64, i64, bool)> {
        let wide = matches!(left, Value::Long(_)) || matches!(right, Value::Long(_));
        Some((left.as_long()?, right.as_long()?, wide))
    }

    fn integral(value: i64, wide: bool) -> Value {
        if wide {
            Value::Long(value)
        } else {
            Value::Int(value as i32)
        }
    }
}

impl Arithmetic for MockArithmetic {
    fn strict(&self) -> bool {
        self.strict
    }

    fn to_boolean(&self, value: &Value) -> Result<bool, HostError> {
        match value {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(*b),
            Value::Int(_) | Value::Long(_) => Ok(value.as_long() != Some(0)),
            Value::Str(s) => Ok(!s.is_empty()),
            other => Err(HostError::new(format!("not a boolean: {other}"))),
        }
    }

    fn to_int(&self, value: &Value) -> Result<i32, HostError> {
        let long = self.to_long(value)?;
        i32::try_from(long).map_err(|_| HostError::new(format!("int overflow: {long}")))
    }

    fn to_long(&self, value: &Value) -> Result<i64, HostError> {
        match value {
            Value::Null => Ok(0),
            Value::Bool(b) => Ok(i64::from(*b)),
            Value::Double(d) => Ok(*d as i64),
            other => other
                .as_long()
                .ok_or_else(|| HostError::new(format!("not a number: {other}"))),
        }
    }

    fn to_double(&self, value: &Value) -> Result<f64, HostError> {
        match value {
            Value::Double(d) => Ok(*d),
            other => self.to_long(other).map(|l| l as f64),
        }
    }

    fn binary(&self, op: Operator, left: &Value, right: &Value) -> Result<Value, HostError> {
        if let (Operator::Add, Value::Str(a), Value::Str(b)) = (op, left, right) {
            return Ok(Value::string(format!("{}{}", &**a, &**b)));
        }
        let (a, b, wide) = Self::both_long(left, right)
            .ok_or_else(|| HostError::new(format!("cannot apply {op} to {left} and {right}")))?;
        let value = match op {
            Operator::Add => Self::integral(a.wrapping_add(b), wide),
            Operator::Subtract => Self::integral(a.wrapping_sub(b), wide),
            Operator::Multiply => Self::integral(a.wrapping_mul(b), wide),
            Operator::Divide | Operator::Mod if b == 0 => {
                return Err(HostError::new("division by zero"))
            }
            Operator::Divide => Self::integral(a / b, wide),
            Operator::Mod => Self::integral(a % b, wide),
            Operator::And => Self::integral(a & b, wide),
            Operator::Or => Self::integral(a | b, wide),
            Operator::Xor => Self::integral(a ^ b, wide),
            Operator::ShiftLeft => Self::integral(a << (b & 63), wide),
            Operator::ShiftRight => Self::integral(a >> (b & 63), wide),
            Operator::Eq => Value::Bool(a == b),
            Operator::Lt => Value::Bool(a < b),
            Operator::Le => Value::Bool(a <= b),
            Operator::Gt => Value::Bool(a > b),
            Operator::Ge => Value::Bool(a >= b),
            other => return Err(HostError::new(format!("no default for {other}"))),
        };
        Ok(value)
    }

    fn increment(&self, value: &Value) -> Result<Value, HostError> {
        self.binary(Operator::Add, value, &Value::Int(1))
    }

    fn decrement(&self, value: &Value) -> Result<Value, HostError> {
        self.binary(Operator::Subtract, value, &Value::Int(1))
    }

    fn equals(&self, left: &Value, right: &Value) -> Result<bool, HostError> {
        match Self::both_long(left, right) {
            Some((a, b, _)) => Ok(a == b),
            None => Ok(left == right),
        }
    }

    fn contains(&self, container: &Value, value: &Value) -> Result<Option<bool>, HostError> {
        Ok(match (container, value) {
            (Value::Str(s), Value::Str(sub)) => Some(s.contains(&**sub)),
            (Value::Array(a), v) => Some(a.items().contains(v)),
            _ => None,
        })
    }

    fn starts_with(&self, left: &Value, right: &Value) -> Result<Option<bool>, HostError> {
        Ok(match (left, right) {
            (Value::Str(s), Value::Str(prefix)) => Some(s.starts_with(&**prefix)),
            _ => None,
        })
    }

    fn ends_with(&self, left: &Value, right: &Value) -> Result<Option<bool>, HostError> {
        Ok(match (left, right) {
            (Value::Str(s), Value::Str(suffix)) => Some(s.ends_with(&**suffix)),
            _ => None,
        })
    }

    fn is_empty(&self, value: &Value) -> Option<bool> {
        match value {
            Value::Str(s) => Some(s.is_empty()),
            Value::Array(a) => Some(a.is_empty()),
            _ => None,
        }
    }

    fn size(&self, value: &Value) -> Option<i64> {
        match value {
            Value::Str(s) => Some(s.len() as i64),
            Value::Array(a) => Some(a.len() as i64),
            _ => None,
        }
    }

    fn narrow(&self, value: &Value) -> Value {
        match value {
            Value::Long(l) => i32::try_from(*l).map_or(value.clone(), Value::Int),
            other => other.clone(),
        }
    }
}

// Host test types

/// Immutable amount; overloads `+` only.
#[derive(Debug, PartialEq, Eq)]
pub struct Money {
    pub cents: i64,
}

/// Mutable counter; overloads `+=` in place.
#[derive(Debug)]
pub struct Counter {
    pub value: AtomicI64,
}

/// A bag of words; overloads `=~` and also exposes a `contains` method.
#[derive(Debug)]
pub struct Bag {
    pub words: Vec<String>,
}

/// Pointer-like cell with `get`/`set` methods; `size` and `is_empty`
/// methods report whether it holds a value.
#[derive(Debug)]
pub struct Cell {
    pub value: Mutex<Value>,
}

macro_rules! host_object {
    ($ty:ident, $name:literal) => {
        impl HostObject for $ty {
            fn type_name(&self) -> &'static str {
                $name
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

host_object!(Counter, "Counter");
host_object!(Bag, "Bag");
host_object!(Cell, "Cell");

impl HostObject for Money {
    fn type_name(&self) -> &'static str {
        "Money"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn host_eq(&self, other: &dyn HostObject) -> bool {
        other
            .as_any()
            .downcast_ref::<Money>()
            .is_some_and(|m| m == self)
    }

    fn host_hash(&self, state: &mut dyn std::hash::Hasher) {
        state.write_i64(self.cents);
    }
}

pub fn money(cents: i64) -> Value {
    Value::object(Money { cents })
}

pub fn counter(value: i64) -> Value {
    Value::object(Counter {
        value: AtomicI64::new(value),
    })
}

pub fn bag(words: &[&str]) -> Value {
    Value::object(Bag {
        words: words.iter().map(ToString::to_string).collect(),
    })
}

pub fn cell(value: Value) -> Value {
    Value::object(Cell {
        value: Mutex::new(value),
    })
}

// Methods

type Invoke = Box<dyn Fn(Option<&Value>, &[Value]) -> Result<Value, HostError> + Send + Sync>;

/// A method implemented by a Rust closure.
pub struct FnMethod {
    pub name: &'static str,
    pub return_type: ValueType,
    pub is_static: bool,
    pub builtin: bool,
    accepts: fn(&[Value]) -> bool,
    body: Invoke,
    invocations: AtomicUsize,
}

impl FnMethod {
    pub fn new(
        name: &'static str,
        return_type: ValueType,
        body: impl Fn(Option<&Value>, &[Value]) -> Result<Value, HostError> + Send + Sync + 'static,
    ) -> Self {
        FnMethod {
            name,
            return_type,
            is_static: false,
            builtin: false,
            accepts: |_| true,
            body: Box::new(body),
            invocations: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn accepting(mut self, accepts: fn(&[Value]) -> bool) -> Self {
        self.accepts = accepts;
        self
    }

    #[must_use]
    pub fn static_method(mut self) -> Self {
        self.is_static = true;
        self
    }

    #[must_use]
    pub fn builtin(mut self) -> Self {
        self.builtin = true;
        self
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::Relaxed)
    }

    pub fn shared(self) -> Arc<FnMethod> {
        Arc::new(self)
    }
}

impl fmt::Debug for FnMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMethod")
            .field("name", &self.name)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

impl MethodHandle for FnMethod {
    fn name(&self) -> &str {
        self.name
    }

    fn invoke(&self, receiver: Option<&Value>, args: &[Value]) -> Result<Value, HostError> {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        (self.body)(receiver, args)
    }

    fn accepts(&self, args: &[Value]) -> bool {
        (self.accepts)(args)
    }

    fn return_type(&self) -> ValueType {
        self.return_type
    }

    fn is_static(&self) -> bool {
        self.is_static
    }

    fn is_builtin(&self) -> bool {
        self.builtin
    }
}

/// Overload resolver over registered methods.
#[derive(Default)]
pub struct MockOverloads {
    methods: FxHashMap<Operator, Vec<SharedMethod>>,
    lookups: AtomicUsize,
}

impl MockOverloads {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, op: Operator, method: Arc<FnMethod>) -> Self {
        self.methods.entry(op).or_default().push(method);
        self
    }

    /// Number of `get_operator` calls so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }
}

impl OverloadResolver for MockOverloads {
    fn overloads(&self, op: Operator) -> bool {
        self.methods.contains_key(&op)
    }

    fn get_operator(&self, op: Operator, args: &[Value]) -> Option<SharedMethod> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.methods
            .get(&op)?
            .iter()
            .find(|m| m.accepts(args))
            .cloned()
    }
}

/// Reflective resolver: methods registered per host type name, no constructors.
#[derive(Default)]
pub struct MockMethods {
    methods: FxHashMap<(&'static str, &'static str), Vec<SharedMethod>>,
}

impl MockMethods {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, type_name: &'static str, method: Arc<FnMethod>) -> Self {
        self.methods
            .entry((type_name, method.name))
            .or_default()
            .push(method);
        self
    }
}

impl MethodResolver for MockMethods {
    fn get_method(&self, target: &Value, name: &str, args: &[Value]) -> Option<SharedMethod> {
        self.get_methods(target, name, false)
            .into_iter()
            .find(|m| m.accepts(args))
    }

    fn get_methods(&self, target: &Value, name: &str, include_static: bool) -> Vec<SharedMethod> {
        self.methods
            .iter()
            .filter(|((ty, method), _)| *ty == target.type_name() && *method == name)
            .flat_map(|(_, methods)| methods.iter())
            .filter(|m| include_static || !m.is_static())
            .cloned()
            .collect()
    }
}

// Canned methods over the host test types

fn receiver<T: HostObject>(receiver: Option<&Value>) -> Result<&T, HostError> {
    receiver
        .and_then(Value::downcast_ref::<T>)
        .ok_or_else(|| HostError::new("bad receiver"))
}

/// `Money + Money`.
pub fn money_add() -> Arc<FnMethod> {
    FnMethod::new("add", ValueType::Object, |recv, args| {
        let left = receiver::<Money>(recv)?;
        let right = args
            .first()
            .and_then(Value::downcast_ref::<Money>)
            .ok_or_else(|| HostError::new("money expected"))?;
        Ok(money(left.cents + right.cents))
    })
    .accepting(|args| args.iter().all(|a| a.downcast_ref::<Money>().is_some()))
    .shared()
}

/// `Counter += int`, in place.
pub fn counter_self_add() -> Arc<FnMethod> {
    FnMethod::new("self_add", ValueType::Void, |recv, args| {
        let counter = receiver::<Counter>(recv)?;
        let step = args.first().and_then(Value::as_long).unwrap_or(0);
        counter.value.fetch_add(step, Ordering::Relaxed);
        Ok(Value::Null)
    })
    .accepting(|args| args.first().and_then(Value::downcast_ref::<Counter>).is_some())
    .shared()
}

/// `Bag =~ word` as an operator overload.
pub fn bag_contains_overload() -> Arc<FnMethod> {
    FnMethod::new("contains", ValueType::Bool, |recv, args| {
        let bag = receiver::<Bag>(recv)?;
        let word = args.first().and_then(Value::as_str).unwrap_or_default();
        Ok(Value::Bool(bag.words.iter().any(|w| w == word)))
    })
    .accepting(|args| args.first().and_then(Value::downcast_ref::<Bag>).is_some())
    .shared()
}

/// `bag.contains(x)` as a plain method that always answers `false`.
pub fn bag_contains_method() -> Arc<FnMethod> {
    FnMethod::new("contains", ValueType::Bool, |_, _| Ok(Value::Bool(false))).shared()
}

pub fn cell_get() -> Arc<FnMethod> {
    FnMethod::new("get", ValueType::Object, |recv, _| {
        Ok(receiver::<Cell>(recv)?.value.lock().clone())
    })
    .accepting(<[Value]>::is_empty)
    .shared()
}

pub fn cell_set() -> Arc<FnMethod> {
    FnMethod::new("set", ValueType::Void, |recv, args| {
        let cell = receiver::<Cell>(recv)?;
        *cell.value.lock() = args.first().cloned().unwrap_or_default();
        Ok(Value::Null)
    })
    .accepting(|args| args.len() == 1)
    .shared()
}

pub fn cell_is_empty() -> Arc<FnMethod> {
    FnMethod::new("is_empty", ValueType::Bool, |recv, _| {
        Ok(Value::Bool(receiver::<Cell>(recv)?.value.lock().is_null()))
    })
    .shared()
}

pub fn cell_size() -> Arc<FnMethod> {
    FnMethod::new("size", ValueType::Long, |recv, _| {
        let empty = receiver::<Cell>(recv)?.value.lock().is_null();
        Ok(Value::Long(if empty { 0 } else { 1 }))
    })
    .shared()
}

/// Every canned method registered on its host type.
pub fn mock_methods() -> MockMethods {
    MockMethods::new()
        .with("Bag", bag_contains_method())
        .with("Cell", cell_get())
        .with("Cell", cell_set())
        .with("Cell", cell_is_empty())
        .with("Cell", cell_size())
}
