#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use super::*;
use crate::errors::EvalErrorKind;
use crate::scope::{Scope, SymbolInfo};
use crate::value::Value;
use pretty_assertions::assert_eq;

fn sym(index: u32) -> Symbol {
    Symbol::new(index)
}

/// Outer scope with `x`, and a nested lambda scope capturing it.
fn capturing_frame(x: Slot) -> (LexicalFrame, Symbol) {
    let outer = Arc::new(Scope::new());
    let outer_x = outer.declare_variable("x", SymbolInfo::new()).unwrap();
    let mut caller = outer.create_frame(None, &[]);
    caller.set_slot(outer_x, x);

    let inner = Arc::new(Scope::with_parent(outer));
    let local = inner.declare_variable("x", SymbolInfo::new()).unwrap();
    inner.declare_variable("y", SymbolInfo::new()).unwrap();
    let frame = inner.create_frame(Some(&caller), &[]);
    (LexicalFrame::new(frame), local)
}

#[test]
fn test_symbol_set_inline_and_overflow() {
    let mut set = SymbolSet::new();
    assert!(set.is_empty());
    for index in [0, 5, 31, 32, 63, 64, 200] {
        assert!(set.declare(sym(index)));
        assert!(!set.declare(sym(index)));
    }
    assert!(set.is_declared(sym(200)));
    assert!(!set.is_declared(sym(199)));
    assert!(!set.is_declared(sym(1000)));

    assert!(set.declare_constant(sym(64)));
    assert!(!set.declare_constant(sym(64)));
    assert!(set.is_constant(sym(64)));
    assert!(!set.is_constant(sym(63)));

    let declared: Vec<u32> = set.declared().map(Symbol::raw).collect();
    assert_eq!(declared, vec![0, 5, 31, 32, 63, 64, 200]);

    set.clear();
    assert!(set.is_empty());
    assert!(!set.is_declared(sym(32)));
}

#[test]
fn test_lexical_scope_counts() {
    let mut scope = LexicalScope::new();
    assert!(scope.add_symbol(sym(1)));
    assert!(!scope.add_symbol(sym(1)));
    assert!(scope.add_constant(sym(2)));
    assert_eq!(scope.symbol_count(), 2);
    assert!(scope.is_constant(sym(2)));

    let mut cleared = Vec::new();
    scope.clear_symbols(|s| cleared.push(s));
    assert_eq!(cleared, vec![sym(1), sym(2)]);
    assert_eq!(scope.symbol_count(), 0);
    assert!(!scope.has_symbol(sym(1)));
}

#[test]
fn test_clash_in_same_block() {
    let scope = Arc::new(Scope::new());
    let a = scope.declare_variable("a", SymbolInfo::new()).unwrap();
    let mut lex = LexicalFrame::new(scope.create_frame(None, &[]));

    lex.declare(a).unwrap();
    let err = lex.declare(a).unwrap_err();
    assert_eq!(
        err.kind,
        EvalErrorKind::LexicalClash {
            name: "a".to_string()
        }
    );

    // A nested block may redeclare it.
    lex.push();
    assert!(lex.declare_symbol(a));
    assert!(lex.has_symbol(a));
    lex.pop();
    assert!(lex.has_symbol(a));
}

#[test]
fn test_pop_undefines_block_symbols() {
    let scope = Arc::new(Scope::new());
    let a = scope.declare_variable("a", SymbolInfo::new()).unwrap();
    let mut lex = LexicalFrame::new(scope.create_frame(None, &[]));

    lex.push();
    lex.declare(a).unwrap();
    lex.frame_mut().set(a, Value::Int(1));
    assert_eq!(lex.depth(), 1);
    assert!(lex.pop().is_some());

    assert_eq!(lex.depth(), 0);
    assert_eq!(lex.frame().slot(a), &Slot::Undefined);
    assert!(!lex.has_symbol(a));
    assert!(lex.pop().is_none());
}

#[test]
fn test_shadowed_hoisted_value_is_restored() {
    let (mut lex, x) = capturing_frame(Slot::Value(Value::Int(10)));
    assert_eq!(lex.frame().get(x), Some(&Value::Int(10)));

    lex.push();
    lex.declare(x).unwrap();
    assert_eq!(lex.frame().slot(x), &Slot::Undefined);
    lex.frame_mut().set(x, Value::Int(20));
    lex.pop();

    assert_eq!(lex.frame().get(x), Some(&Value::Int(10)));
}

#[test]
fn test_restore_distinguishes_unset_from_null() {
    let (mut lex, x) = capturing_frame(Slot::Undeclared);
    lex.with_block(|lex| {
        lex.declare(x).unwrap();
        lex.frame_mut().set(x, Value::Int(1));
    });
    assert_eq!(lex.frame().slot(x), &Slot::Undeclared);

    let (mut lex, x) = capturing_frame(Slot::Value(Value::Null));
    lex.with_block(|lex| {
        lex.declare(x).unwrap();
        lex.frame_mut().set(x, Value::Int(1));
    });
    assert_eq!(lex.frame().slot(x), &Slot::Value(Value::Null));
}

#[test]
fn test_nested_shadowing_restores_in_order() {
    let (mut lex, x) = capturing_frame(Slot::Value(Value::Int(1)));
    {
        let mut outer = lex.block();
        outer.declare(x).unwrap();
        outer.frame_mut().set(x, Value::Int(2));
        {
            let mut inner = outer.block();
            inner.declare(x).unwrap();
            inner.frame_mut().set(x, Value::Int(3));
        }
        assert_eq!(outer.frame().get(x), Some(&Value::Int(2)));
    }
    assert_eq!(lex.frame().get(x), Some(&Value::Int(1)));
    assert_eq!(lex.depth(), 0);
}

#[test]
fn test_block_guard_pops_on_unwind() {
    let (mut lex, x) = capturing_frame(Slot::Value(Value::Int(5)));
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let mut block = lex.block();
        block.declare(x).unwrap();
        panic!("evaluation failed");
    }));
    assert!(outcome.is_err());
    assert_eq!(lex.depth(), 0);
    assert_eq!(lex.frame().get(x), Some(&Value::Int(5)));
}

#[test]
fn test_constants() {
    let scope = Arc::new(Scope::new());
    let c = scope.declare_variable("c", SymbolInfo::new()).unwrap();
    let f = scope
        .declare_variable("f", SymbolInfo::new().with_final())
        .unwrap();
    let v = scope.declare_variable("v", SymbolInfo::new()).unwrap();
    let mut lex = LexicalFrame::new(scope.create_frame(None, &[]));

    lex.declare_constant(c).unwrap();
    lex.declare(v).unwrap();
    assert!(lex.is_constant(c));
    assert!(lex.is_constant(f));
    assert!(!lex.is_constant(v));

    lex.with_block(|lex| {
        lex.declare(c).unwrap();
        // The nearest declaration is not constant.
        assert!(!lex.is_constant(c));
    });
    assert!(lex.is_constant(c));
}

#[test]
fn test_define_args() {
    let scope = Arc::new(Scope::new());
    let a = scope.declare_parameter("a", SymbolInfo::new()).unwrap();
    let b = scope.declare_parameter("b", SymbolInfo::new()).unwrap();
    let mut lex = LexicalFrame::new(scope.create_frame(None, &[]));

    lex.define_args();
    assert!(lex.has_symbol(a));
    assert!(lex.has_symbol(b));
    assert!(!lex.declare_symbol(a));
    assert_eq!(lex.current().symbol_count(), 2);
}

#[test]
fn test_metadata_comes_from_scope() {
    let scope = Arc::new(Scope::new());
    let n = scope
        .declare_variable(
            "n",
            SymbolInfo::new().with_type(ValueType::Int).with_required(),
        )
        .unwrap();
    let lex = LexicalFrame::new(scope.create_frame(None, &[]));
    assert_eq!(lex.declared_type(n), Some(ValueType::Int));
    assert!(lex.is_required(n));
}
