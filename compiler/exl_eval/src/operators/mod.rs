//! Operator dispatch through host overloads.
//!
//! The evaluator asks [`Operators`] before applying any operator whose
//! meaning a host type may redefine. Resolution order is fixed:
//!
//! 1. host overload of the operator (cached per call site)
//! 2. the arithmetic capability
//! 3. for duck-typed operators, a reflective method of the same name
//! 4. a structural default (equality, `false`, `0`)
//!
//! Every failure raised by a host method is reported as
//! `OperatorFailed`, attributed to the call-site node.

mod call_site;

use std::slice;
use std::sync::Arc;

use exl_ir::{Operator, ValueType};

use crate::capability::{Arithmetic, MethodResolver, OverloadResolver, SharedMethod};
use crate::errors::{null_operand, operator_failed, unsupported_operator, EvalError};
use crate::value::Value;

pub use call_site::CallSite;

/// Outcome of a compound assignment (`+=`, `++x`, `x--`, ...).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Assigned {
    /// An overload updated the left operand in place. Nothing to store;
    /// the expression yields the operand.
    InPlace,
    /// Store `value` into the left operand; the expression yields
    /// `result` (the previous value for postfix forms).
    Store { value: Value, result: Value },
}

/// Operator overload dispatch.
pub struct Operators {
    arithmetic: Arc<dyn Arithmetic>,
    overloads: Option<Arc<dyn OverloadResolver>>,
    methods: Option<Arc<dyn MethodResolver>>,
    cache_call_sites: bool,
}

/// Builder for [`Operators`].
pub struct OperatorsBuilder {
    arithmetic: Arc<dyn Arithmetic>,
    overloads: Option<Arc<dyn OverloadResolver>>,
    methods: Option<Arc<dyn MethodResolver>>,
    cache_call_sites: bool,
}

impl OperatorsBuilder {
    /// Without a resolver no operator is overloaded.
    #[must_use]
    pub fn overloads(mut self, resolver: Arc<dyn OverloadResolver>) -> Self {
        self.overloads = Some(resolver);
        self
    }

    /// Without a resolver there is no duck typing.
    #[must_use]
    pub fn methods(mut self, resolver: Arc<dyn MethodResolver>) -> Self {
        self.methods = Some(resolver);
        self
    }

    /// Enable or disable the per-call-site method cache (default: on).
    #[must_use]
    pub fn call_site_cache(mut self, enabled: bool) -> Self {
        self.cache_call_sites = enabled;
        self
    }

    pub fn build(self) -> Operators {
        Operators {
            arithmetic: self.arithmetic,
            overloads: self.overloads,
            methods: self.methods,
            cache_call_sites: self.cache_call_sites,
        }
    }
}

impl Operators {
    pub fn builder(arithmetic: Arc<dyn Arithmetic>) -> OperatorsBuilder {
        OperatorsBuilder {
            arithmetic,
            overloads: None,
            methods: None,
            cache_call_sites: true,
        }
    }

    /// Arithmetic only: no overloads, no duck typing.
    pub fn new(arithmetic: Arc<dyn Arithmetic>) -> Self {
        Self::builder(arithmetic).build()
    }

    pub fn arithmetic(&self) -> &Arc<dyn Arithmetic> {
        &self.arithmetic
    }

    /// Whether any host type overloads `op`.
    pub fn overloads(&self, op: Operator) -> bool {
        self.overloads
            .as_ref()
            .is_some_and(|resolver| resolver.overloads(op))
    }

    /// Reject null operands of operators the arithmetic marks strict.
    pub fn control_null_operands(
        &self,
        site: &CallSite,
        op: Operator,
        args: &[Value],
    ) -> Result<(), EvalError> {
        if args.iter().any(Value::is_null) && self.arithmetic.is_strict(op) {
            return Err(null_operand(op).at(site.node()));
        }
        Ok(())
    }

    /// Find the overload of `op` for `args`, consulting the call-site
    /// cache first. Built-in methods do not count as overloads.
    fn resolve(&self, site: &CallSite, op: Operator, args: &[Value]) -> Option<SharedMethod> {
        let resolver = self.overloads.as_ref().filter(|r| r.overloads(op))?;
        if self.cache_call_sites {
            if let Some(method) = site.cached(op) {
                if method.accepts(args) {
                    tracing::trace!(node = %site.node(), %op, "call-site cache hit");
                    return Some(method);
                }
                tracing::trace!(node = %site.node(), %op, "stale call-site entry");
            }
        }
        let method = resolver.get_operator(op, args)?;
        if method.is_builtin() {
            return None;
        }
        tracing::trace!(node = %site.node(), %op, method = method.name(), "resolved overload");
        Some(method)
    }

    fn invoke(
        &self,
        site: &CallSite,
        op: Operator,
        method: &SharedMethod,
        args: &[Value],
    ) -> Result<Value, EvalError> {
        let outcome = match args.split_first() {
            Some((receiver, rest)) if !method.is_static() => method.invoke(Some(receiver), rest),
            _ => method.invoke(None, args),
        };
        outcome.map_err(|err| operator_failed(op, &err).at(site.node()))
    }

    fn remember(&self, site: &CallSite, op: Operator, method: SharedMethod) {
        if self.cache_call_sites {
            site.store(op, method);
        }
    }

    /// Apply a host overload of `op`.
    ///
    /// `Ok(None)` when no overload applies; the evaluator then uses the
    /// arithmetic. A failing overload is an error, not a fallback.
    pub fn try_overload(
        &self,
        site: &CallSite,
        op: Operator,
        args: &[Value],
    ) -> Result<Option<Value>, EvalError> {
        self.control_null_operands(site, op, args)?;
        let Some(method) = self.resolve(site, op, args) else {
            return Ok(None);
        };
        let value = self.invoke(site, op, &method, args)?;
        self.remember(site, op, method);
        Ok(Some(value))
    }

    /// Apply a compound assignment or increment/decrement.
    ///
    /// 1. An overload of the compound operator itself. One declared to
    ///    return `void` mutated its operand in place.
    /// 2. An overload of the base operator: `a = a + b`.
    /// 3. The arithmetic's default for the base operator.
    pub fn try_assign_overload(
        &self,
        site: &CallSite,
        op: Operator,
        args: &[Value],
    ) -> Result<Assigned, EvalError> {
        let Some(base) = op.base() else {
            return Err(unsupported_operator(op).at(site.node()));
        };
        self.control_null_operands(site, op, args)?;

        if let Some(method) = self.resolve(site, op, args) {
            let value = self.invoke(site, op, &method, args)?;
            let in_place = method.return_type() == ValueType::Void;
            self.remember(site, op, method);
            return Ok(if in_place {
                Assigned::InPlace
            } else {
                Assigned::Store {
                    result: value.clone(),
                    value,
                }
            });
        }

        let value = match self.try_overload(site, base, args)? {
            Some(value) => value,
            None => self.perform_base_operation(site, op, base, args)?,
        };
        let result = if op.is_postfix() {
            args.first().cloned().unwrap_or_default()
        } else {
            value.clone()
        };
        Ok(Assigned::Store { value, result })
    }

    fn perform_base_operation(
        &self,
        site: &CallSite,
        op: Operator,
        base: Operator,
        args: &[Value],
    ) -> Result<Value, EvalError> {
        let outcome = match (base, args) {
            (Operator::Increment, [operand, ..]) => self.arithmetic.increment(operand),
            (Operator::Decrement, [operand, ..]) => self.arithmetic.decrement(operand),
            (_, [left, right, ..]) if base.arity() == 2 => self.arithmetic.binary(base, left, right),
            _ => return Err(unsupported_operator(op).at(site.node())),
        };
        outcome.map_err(|err| operator_failed(op, &err).at(site.node()))
    }

    // Duck-typed pattern operators

    /// `container =~ value`.
    pub fn contains(
        &self,
        site: &CallSite,
        container: &Value,
        value: &Value,
    ) -> Result<bool, EvalError> {
        self.pattern_match(site, Operator::Contains, container, value)
    }

    /// `left =^ right`.
    pub fn starts_with(
        &self,
        site: &CallSite,
        left: &Value,
        right: &Value,
    ) -> Result<bool, EvalError> {
        self.pattern_match(site, Operator::StartsWith, left, right)
    }

    /// `left =$ right`.
    pub fn ends_with(&self, site: &CallSite, left: &Value, right: &Value) -> Result<bool, EvalError> {
        self.pattern_match(site, Operator::EndsWith, left, right)
    }

    fn pattern_match(
        &self,
        site: &CallSite,
        op: Operator,
        left: &Value,
        right: &Value,
    ) -> Result<bool, EvalError> {
        let fail = |err: crate::HostError| operator_failed(op, &err).at(site.node());

        let args = [left.clone(), right.clone()];
        if let Some(answer) = self.try_overload(site, op, &args)? {
            return self.arithmetic.to_boolean(&answer).map_err(fail);
        }

        let known = match op {
            Operator::Contains => self.arithmetic.contains(left, right),
            Operator::StartsWith => self.arithmetic.starts_with(left, right),
            _ => self.arithmetic.ends_with(left, right),
        }
        .map_err(fail)?;
        if let Some(answer) = known {
            return Ok(answer);
        }

        if let Some(answer) = self.duck_pattern(site, op, left, right)? {
            return Ok(answer);
        }

        self.arithmetic.equals(left, right).map_err(fail)
    }

    /// `left.<op>(right)` returning a boolean, retried once with the
    /// argument narrowed.
    fn duck_pattern(
        &self,
        site: &CallSite,
        op: Operator,
        left: &Value,
        right: &Value,
    ) -> Result<Option<bool>, EvalError> {
        let Some(methods) = &self.methods else {
            return Ok(None);
        };
        let name = op.method_name();
        let mut arg = right.clone();
        let mut method = methods.get_method(left, name, slice::from_ref(&arg));
        if method.is_none() {
            let narrowed = self.arithmetic.narrow(right);
            if narrowed != arg {
                arg = narrowed;
                method = methods.get_method(left, name, slice::from_ref(&arg));
            }
        }
        let Some(method) = method.filter(|m| m.return_type() == ValueType::Bool) else {
            return Ok(None);
        };
        tracing::trace!(node = %site.node(), %op, "duck-typed method");
        let answer = method
            .invoke(Some(left), slice::from_ref(&arg))
            .map_err(|err| operator_failed(op, &err).at(site.node()))?;
        Ok(answer.as_bool())
    }

    /// Invoke the first zero-argument instance method `name` of `target`
    /// whose return type satisfies `returns`.
    fn duck_nullary(
        &self,
        site: &CallSite,
        op: Operator,
        target: &Value,
        name: &str,
        returns: fn(ValueType) -> bool,
    ) -> Result<Option<Value>, EvalError> {
        let Some(methods) = &self.methods else {
            return Ok(None);
        };
        let Some(method) = methods
            .get_methods(target, name, false)
            .into_iter()
            .find(|m| returns(m.return_type()) && m.accepts(&[]))
        else {
            return Ok(None);
        };
        tracing::trace!(node = %site.node(), %op, name, "duck-typed method");
        method
            .invoke(Some(target), &[])
            .map(Some)
            .map_err(|err| operator_failed(op, &err).at(site.node()))
    }

    // Unary queries

    /// `empty(value)`: null is empty; `false` when nothing knows better.
    pub fn empty(&self, site: &CallSite, value: &Value) -> Result<bool, EvalError> {
        if value.is_null() {
            return Ok(true);
        }
        if let Some(answer) = self.try_overload(site, Operator::Empty, slice::from_ref(value))? {
            return self
                .arithmetic
                .to_boolean(&answer)
                .map_err(|err| operator_failed(Operator::Empty, &err).at(site.node()));
        }
        if let Some(answer) = self.arithmetic.is_empty(value) {
            return Ok(answer);
        }
        let found = self.duck_nullary(site, Operator::Empty, value, "is_empty", |ty| {
            ty == ValueType::Bool
        })?;
        Ok(found.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    /// `size(value)`: null has size 0; `0` when nothing knows better.
    pub fn size(&self, site: &CallSite, value: &Value) -> Result<i64, EvalError> {
        if value.is_null() {
            return Ok(0);
        }
        if let Some(answer) = self.try_overload(site, Operator::Size, slice::from_ref(value))? {
            return self
                .arithmetic
                .to_long(&answer)
                .map_err(|err| operator_failed(Operator::Size, &err).at(site.node()));
        }
        if let Some(answer) = self.arithmetic.size(value) {
            return Ok(answer);
        }
        let found = self.duck_nullary(
            site,
            Operator::Size,
            value,
            "size",
            ValueType::is_integral,
        )?;
        Ok(found.as_ref().and_then(Value::as_long).unwrap_or(0))
    }

    // Indirection

    /// `*value`.
    pub fn indirect(&self, site: &CallSite, value: &Value) -> Result<Value, EvalError> {
        let op = Operator::Indirect;
        if let Some(answer) = self.try_overload(site, op, slice::from_ref(value))? {
            return Ok(answer);
        }
        if let Some(answer) = self.arithmetic.indirect(value) {
            return Ok(answer);
        }
        if let Some(answer) =
            self.duck_nullary(site, op, value, "get", |ty| ty != ValueType::Void)?
        {
            return Ok(answer);
        }
        let cause = format!("cannot dereference {}", value.type_name());
        Err(operator_failed(op, &cause).at(site.node()))
    }

    /// `*target = value`; yields the stored value.
    pub fn indirect_assign(
        &self,
        site: &CallSite,
        target: &Value,
        value: &Value,
    ) -> Result<Value, EvalError> {
        let op = Operator::IndirectAssign;
        let args = [target.clone(), value.clone()];
        if let Some(answer) = self.try_overload(site, op, &args)? {
            return Ok(answer);
        }
        if let Some(answer) = self.arithmetic.indirect_assign(target, value) {
            return Ok(answer);
        }
        if let Some(methods) = &self.methods {
            if let Some(setter) = methods.get_method(target, "set", slice::from_ref(value)) {
                setter
                    .invoke(Some(target), slice::from_ref(value))
                    .map_err(|err| operator_failed(op, &err).at(site.node()))?;
                return Ok(value.clone());
            }
        }
        let cause = format!("cannot assign through {}", target.type_name());
        Err(operator_failed(op, &cause).at(site.node()))
    }
}

impl std::fmt::Debug for Operators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operators")
            .field("overloads", &self.overloads.is_some())
            .field("methods", &self.methods.is_some())
            .field("cache_call_sites", &self.cache_call_sites)
            .finish_non_exhaustive()
    }
}
