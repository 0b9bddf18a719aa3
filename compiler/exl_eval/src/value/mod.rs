//! Runtime values.
//!
//! The runtime core only needs a small value universe: scalars, strings,
//! arrays (vararg accumulation, chained-closure argument spreading),
//! closures, and opaque host objects that operator overloads and
//! reflective methods act upon.

mod heap;

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use exl_ir::ValueType;

use crate::closure::Closure;

pub use heap::Heap;

/// A host-language object carried through the evaluator untouched.
///
/// Operator overloads and reflective methods receive these as receivers
/// and arguments; the runtime itself only compares and hashes them.
pub trait HostObject: Any + Send + Sync + fmt::Debug {
    /// Type name used in diagnostics and by resolvers.
    fn type_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    /// Host equality. Identity unless the host type says otherwise.
    fn host_eq(&self, other: &dyn HostObject) -> bool {
        std::ptr::addr_eq(self, other)
    }

    /// Must agree with [`HostObject::host_eq`].
    fn host_hash(&self, state: &mut dyn Hasher) {
        state.write(self.type_name().as_bytes());
    }
}

/// An immutable array with a declared element type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArrayValue {
    elem: ValueType,
    items: Heap<Vec<Value>>,
}

impl ArrayValue {
    pub fn elem_type(&self) -> ValueType {
        self.elem
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Str(Heap<str>),
    Array(ArrayValue),
    Closure(Closure),
    Object(Heap<dyn HostObject>),
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::Str(Heap::from_arc(Arc::from(s.as_ref())))
    }

    pub fn array(elem: ValueType, items: Vec<Value>) -> Self {
        Value::Array(ArrayValue {
            elem,
            items: Heap::new(items),
        })
    }

    pub fn object<T: HostObject>(object: T) -> Self {
        let inner: Arc<dyn HostObject> = Arc::new(object);
        Value::Object(Heap::from_arc(inner))
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integral payload widened to `i64`.
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(i64::from(*i)),
            Value::Long(l) => Some(*l),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(&**s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayValue> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_closure(&self) -> Option<&Closure> {
        match self {
            Value::Closure(c) => Some(c),
            _ => None,
        }
    }

    /// Downcast a host object to its concrete type.
    pub fn downcast_ref<T: HostObject>(&self) -> Option<&T> {
        match self {
            Value::Object(obj) => obj.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null | Value::Object(_) => ValueType::Object,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Long(_) => ValueType::Long,
            Value::Double(_) => ValueType::Double,
            Value::Str(_) => ValueType::Str,
            Value::Array(_) => ValueType::Array,
            Value::Closure(_) => ValueType::Closure,
        }
    }

    /// Type name for diagnostics; host objects report their own.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Object(obj) => obj.type_name(),
            other => other.value_type().name(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Closure(a), Value::Closure(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Heap::ptr_eq(a, b) || a.host_eq(&**b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Long(l) => l.hash(state),
            Value::Double(d) => d.to_bits().hash(state),
            Value::Str(s) => s.hash(state),
            Value::Array(a) => a.hash(state),
            Value::Closure(c) => c.hash(state),
            Value::Object(obj) => obj.host_hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Long(l) => write!(f, "{l}L"),
            Value::Double(d) => write!(f, "{d}"),
            Value::Str(s) => write!(f, "'{}'", &**s),
            Value::Array(a) => {
                f.write_str("[")?;
                for (i, item) in a.items().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Closure(c) => write!(f, "<function {}>", c.lambda().node()),
            Value::Object(obj) => write!(f, "<{}>", obj.type_name()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Value::Long(l)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<Closure> for Value {
    fn from(c: Closure) -> Self {
        Value::Closure(c)
    }
}
