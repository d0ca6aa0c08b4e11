#[path = "../ast_test_utils.rs"]
mod util;

use util::{check, program, AstBuilder};

use crate::ast::{BinaryOp, CompositeKind, Declaration, Members, TransferOp, VariableKind};
use crate::interpreter::value::{IntegerValue, Value};
use crate::interpreter::{
    AccountStorage, InMemorySlabStorage, Interpreter, InterpreterConfig, MeterLimits,
    RuntimeError, UserErrorKind,
};
use crate::sema::CheckedProgram;
use crate::stdlib::install_base_values;

fn interpreter_for(checked: CheckedProgram, config: InterpreterConfig) -> Interpreter {
    let storage = AccountStorage::new(Box::new(InMemorySlabStorage::new()));
    let mut interpreter = Interpreter::new(checked, storage, config).expect("interpreter setup");
    install_base_values(&mut interpreter);
    interpreter
}

/// resource Counter { var count: Int; init(); fun increment() } plus a
/// `main` that creates, increments, reads, and destroys one.
fn counter_program() -> CheckedProgram {
    let mut b = AstBuilder::new();

    let int_ty = b.t_nominal("Int");
    let annotation = b.annotation(false, int_ty);
    let field = b.field(VariableKind::Var, "count", annotation);

    let self_expr = b.name("self");
    let target = b.member(self_expr, "count");
    let zero = b.int(0);
    let init_assignment = b.assign(target, TransferOp::Copy, zero);
    let init_body = b.block(vec![init_assignment]);
    let initializer = b.init(Vec::new(), Some(init_body));

    let self_expr = b.name("self");
    let target = b.member(self_expr, "count");
    let self_expr = b.name("self");
    let current = b.member(self_expr, "count");
    let one = b.int(1);
    let incremented = b.binary(BinaryOp::Add, current, one);
    let increment_assignment = b.assign(target, TransferOp::Copy, incremented);
    let increment_body = b.block(vec![increment_assignment]);
    let increment = b.fun("increment", Vec::new(), None, Some(increment_body));

    let counter = b.composite(
        CompositeKind::Resource,
        "Counter",
        Vec::new(),
        Members {
            fields: vec![field],
            initializers: vec![initializer],
            functions: vec![increment],
            ..Members::default()
        },
    );

    let created = b.create("Counter", Vec::new());
    let binding = b.let_("c", TransferOp::Move, created);
    let c = b.name("c");
    let member = b.member(c, "increment");
    let first_call = b.call(member, Vec::new());
    let first = b.expr_stmt(first_call);
    let c = b.name("c");
    let member = b.member(c, "increment");
    let second_call = b.call(member, Vec::new());
    let second = b.expr_stmt(second_call);
    let c = b.name("c");
    let count = b.member(c, "count");
    let read = b.let_("n", TransferOp::Copy, count);
    let c = b.name("c");
    let destroyed = b.destroy(c);
    let n = b.name("n");
    let ret = b.ret(Some(n));
    let body = b.block(vec![binding, first, second, read, destroyed, ret]);
    let int_ty = b.t_nominal("Int");
    let return_annotation = b.annotation(false, int_ty);
    let main = b.fun("main", Vec::new(), Some(return_annotation), Some(body));

    check(program(vec![
        Declaration::Composite(counter),
        Declaration::Function(main),
    ]))
    .expect("counter program checks")
}

#[test]
fn test_counter_script_round_trip() {
    let mut interpreter = interpreter_for(counter_program(), InterpreterConfig::default());
    let result = interpreter.run_script(Vec::new()).expect("script runs");
    assert!(result.equal(&Value::Integer(IntegerValue::int(2))));
}

#[test]
fn test_computation_meter_unwinds() {
    // fun main() { while true {} }
    let mut b = AstBuilder::new();
    let condition = b.boolean(true);
    let body = b.block(Vec::new());
    let loop_stmt = b.while_(condition, body);
    let main_body = b.block(vec![loop_stmt]);
    let main = b.fun("main", Vec::new(), None, Some(main_body));
    let checked = check(program(vec![Declaration::Function(main)])).expect("program checks");

    let mut interpreter = interpreter_for(
        checked,
        InterpreterConfig {
            limits: MeterLimits {
                memory: None,
                computation: Some(100),
            },
        },
    );
    let error = interpreter.run_script(Vec::new()).expect_err("meter trips");
    match error {
        RuntimeError::User(user) => {
            assert!(matches!(user.kind, UserErrorKind::LimitExceeded { .. }));
        }
        other => panic!("expected a user error, got {other:?}"),
    }
}

#[test]
fn test_assert_host_function() {
    // fun main() { assert(false, message: "boom") }
    let mut b = AstBuilder::new();
    let callee = b.name("assert");
    let condition = b.boolean(false);
    let message = b.string("boom");
    let call = b.call_labeled(callee, vec![(None, condition), (Some("message"), message)]);
    let stmt = b.expr_stmt(call);
    let body = b.block(vec![stmt]);
    let main = b.fun("main", Vec::new(), None, Some(body));
    let checked = check(program(vec![Declaration::Function(main)])).expect("program checks");

    let mut interpreter = interpreter_for(checked, InterpreterConfig::default());
    let error = interpreter.run_script(Vec::new()).expect_err("assert fails");
    match error {
        RuntimeError::User(user) => match user.kind {
            UserErrorKind::AssertionFailed { message } => {
                assert_eq!(message.as_deref(), Some("boom"));
            }
            other => panic!("expected assertion failure, got {other:?}"),
        },
        other => panic!("expected a user error, got {other:?}"),
    }
}

#[test]
fn test_division_by_zero_is_user_error() {
    // fun main(): Int { return 1 / 0 }
    let mut b = AstBuilder::new();
    let one = b.int(1);
    let zero = b.int(0);
    let division = b.binary(BinaryOp::Div, one, zero);
    let ret = b.ret(Some(division));
    let body = b.block(vec![ret]);
    let int_ty = b.t_nominal("Int");
    let annotation = b.annotation(false, int_ty);
    let main = b.fun("main", Vec::new(), Some(annotation), Some(body));
    let checked = check(program(vec![Declaration::Function(main)])).expect("program checks");

    let mut interpreter = interpreter_for(checked, InterpreterConfig::default());
    let error = interpreter.run_script(Vec::new()).expect_err("division fails");
    match error {
        RuntimeError::User(user) => {
            assert!(matches!(user.kind, UserErrorKind::DivisionByZero));
        }
        other => panic!("expected a user error, got {other:?}"),
    }
}

#[test]
fn test_array_builtins_in_program() {
    // fun main(): Int { let xs = [1, 2]; xs.append(3); return xs.length }
    let mut b = AstBuilder::new();
    let one = b.int(1);
    let two = b.int(2);
    let literal = b.array(vec![one, two]);
    let binding = b.let_("xs", TransferOp::Copy, literal);
    let xs = b.name("xs");
    let append = b.member(xs, "append");
    let three = b.int(3);
    let call = b.call(append, vec![three]);
    let appended = b.expr_stmt(call);
    let xs = b.name("xs");
    let length = b.member(xs, "length");
    let ret = b.ret(Some(length));
    let body = b.block(vec![binding, appended, ret]);
    let int_ty = b.t_nominal("Int");
    let annotation = b.annotation(false, int_ty);
    let main = b.fun("main", Vec::new(), Some(annotation), Some(body));
    let checked = check(program(vec![Declaration::Function(main)])).expect("program checks");

    let mut interpreter = interpreter_for(checked, InterpreterConfig::default());
    let result = interpreter.run_script(Vec::new()).expect("script runs");
    assert!(result.equal(&Value::Integer(IntegerValue::int(3))));
}

#[test]
fn test_dictionary_iteration_is_deterministic() {
    // Insertion order is observable through `keys`.
    let mut b = AstBuilder::new();
    let key_b = b.string("b");
    let value_b = b.int(2);
    let key_a = b.string("a");
    let value_a = b.int(1);
    let literal = b.dictionary(vec![(key_b, value_b), (key_a, value_a)]);
    let binding = b.let_("entries", TransferOp::Copy, literal);
    let entries = b.name("entries");
    let keys = b.member(entries, "keys");
    let keys_binding = b.let_("ks", TransferOp::Copy, keys);
    let ks = b.name("ks");
    let zero = b.int(0);
    let first = b.index(ks, zero);
    let ret = b.ret(Some(first));
    let body = b.block(vec![binding, keys_binding, ret]);
    let string_ty = b.t_nominal("String");
    let annotation = b.annotation(false, string_ty);
    let main = b.fun("main", Vec::new(), Some(annotation), Some(body));
    let checked = check(program(vec![Declaration::Function(main)])).expect("program checks");

    let mut interpreter = interpreter_for(checked, InterpreterConfig::default());
    let result = interpreter.run_script(Vec::new()).expect("script runs");
    assert!(result.equal(&Value::string("b")));
}

#[test]
fn test_interface_default_function_dispatch() {
    // struct interface HasDescription { fun describe(): Int { return 7 } }
    // struct Plain: HasDescription {}
    // fun main(): Int { return Plain().describe() }
    let mut b = AstBuilder::new();
    let seven = b.int(7);
    let ret = b.ret(Some(seven));
    let default_body = b.block(vec![ret]);
    let int_ty = b.t_nominal("Int");
    let annotation = b.annotation(false, int_ty);
    let describe = b.fun("describe", Vec::new(), Some(annotation), Some(default_body));
    let interface = b.interface(
        CompositeKind::Struct,
        "HasDescription",
        Members {
            functions: vec![describe],
            ..Members::default()
        },
    );
    let plain = b.composite(
        CompositeKind::Struct,
        "Plain",
        vec!["HasDescription"],
        Members::default(),
    );

    let constructor = b.name("Plain");
    let instance = b.call(constructor, Vec::new());
    let member = b.member(instance, "describe");
    let call = b.call(member, Vec::new());
    let ret = b.ret(Some(call));
    let body = b.block(vec![ret]);
    let int_ty = b.t_nominal("Int");
    let annotation = b.annotation(false, int_ty);
    let main = b.fun("main", Vec::new(), Some(annotation), Some(body));

    let checked = check(program(vec![
        Declaration::Interface(interface),
        Declaration::Composite(plain),
        Declaration::Function(main),
    ]))
    .expect("program checks");

    let mut interpreter = interpreter_for(checked, InterpreterConfig::default());
    let result = interpreter.run_script(Vec::new()).expect("script runs");
    assert!(result.equal(&Value::Integer(IntegerValue::int(7))));
}
