#[path = "../ast_test_utils.rs"]
mod util;

use util::{check, error_codes, program, AstBuilder};

use crate::ast::{
    Access, BinaryOp, Comment, CompositeKind, Declaration, Members, TransferOp, VariableKind,
};

#[test]
fn test_declaration_doc_comments_are_recorded() {
    // Doc comments land in the nominal registry; ordinary comments do
    // not.
    let mut b = AstBuilder::new();
    let mut s = b.composite(CompositeKind::Struct, "S", Vec::new(), Members::default());
    s.comments.leading = vec![
        Comment::new("/// A point in storage."),
        Comment::new("// implementation note"),
    ];
    let checked = check(program(vec![Declaration::Composite(s)])).expect("program checks");

    let id = checked
        .registry
        .ids()
        .find(|id| {
            checked
                .cache
                .get(*id)
                .nominal_key()
                .map(|key| key.qualified_identifier == "S")
                .unwrap_or(false)
        })
        .expect("S is registered");
    let entry = checked.registry.get(id).expect("entry exists");
    assert_eq!(entry.docs, vec![" A point in storage.".to_string()]);
}

#[test]
fn test_top_level_redeclaration() {
    let mut b = AstBuilder::new();
    let first = b.composite(CompositeKind::Struct, "S", Vec::new(), Members::default());
    let second = b.composite(CompositeKind::Struct, "S", Vec::new(), Members::default());
    let errors = check(program(vec![
        Declaration::Composite(first),
        Declaration::Composite(second),
    ]))
    .expect_err("expected a redeclaration error");
    assert!(
        error_codes(&errors).contains(&"redeclaration"),
        "got {errors:?}",
    );
}

#[test]
fn test_unknown_type_is_reported() {
    let mut b = AstBuilder::new();
    let unknown = b.t_nominal("Missing");
    let annotation = b.annotation(false, unknown);
    let field = b.field(VariableKind::Let, "x", annotation);
    let zero = b.int(0);
    let self_expr = b.name("self");
    let target = b.member(self_expr, "x");
    let assignment = b.assign(target, TransferOp::Copy, zero);
    let body = b.block(vec![assignment]);
    let initializer = b.init(Vec::new(), Some(body));
    let s = b.composite(
        CompositeKind::Struct,
        "S",
        Vec::new(),
        Members {
            fields: vec![field],
            initializers: vec![initializer],
            ..Members::default()
        },
    );
    let errors = check(program(vec![Declaration::Composite(s)]))
        .expect_err("expected a not-declared error");
    assert!(
        error_codes(&errors).contains(&"not-declared"),
        "got {errors:?}",
    );
}

#[test]
fn test_missing_field_initialization() {
    let mut b = AstBuilder::new();
    let int_ty = b.t_nominal("Int");
    let annotation = b.annotation(false, int_ty);
    let field = b.field(VariableKind::Let, "x", annotation);
    let body = b.block(Vec::new());
    let initializer = b.init(Vec::new(), Some(body));
    let s = b.composite(
        CompositeKind::Struct,
        "S",
        Vec::new(),
        Members {
            fields: vec![field],
            initializers: vec![initializer],
            ..Members::default()
        },
    );
    let errors = check(program(vec![Declaration::Composite(s)]))
        .expect_err("expected an initializer error");
    assert!(
        error_codes(&errors).contains(&"invalid-initializer"),
        "got {errors:?}",
    );
}

#[test]
fn test_field_initialized_in_one_branch_only() {
    let mut b = AstBuilder::new();
    let int_ty = b.t_nominal("Int");
    let annotation = b.annotation(false, int_ty);
    let field = b.field(VariableKind::Var, "x", annotation);

    let self_expr = b.name("self");
    let target = b.member(self_expr, "x");
    let one = b.int(1);
    let assignment = b.assign(target, TransferOp::Copy, one);
    let then_block = b.block(vec![assignment]);
    let condition = b.boolean(true);
    let branch = b.if_(condition, then_block, None);
    let body = b.block(vec![branch]);
    let initializer = b.init(Vec::new(), Some(body));
    let s = b.composite(
        CompositeKind::Struct,
        "S",
        Vec::new(),
        Members {
            fields: vec![field],
            initializers: vec![initializer],
            ..Members::default()
        },
    );
    let errors = check(program(vec![Declaration::Composite(s)]))
        .expect_err("expected an initializer error");
    assert!(
        error_codes(&errors).contains(&"invalid-initializer"),
        "got {errors:?}",
    );
}

#[test]
fn test_field_initialized_in_both_branches() {
    let mut b = AstBuilder::new();
    let int_ty = b.t_nominal("Int");
    let annotation = b.annotation(false, int_ty);
    let field = b.field(VariableKind::Var, "x", annotation);

    let self_expr = b.name("self");
    let target = b.member(self_expr, "x");
    let one = b.int(1);
    let then_assignment = b.assign(target, TransferOp::Copy, one);
    let then_block = b.block(vec![then_assignment]);

    let self_expr = b.name("self");
    let target = b.member(self_expr, "x");
    let two = b.int(2);
    let else_assignment = b.assign(target, TransferOp::Copy, two);
    let else_block = b.block(vec![else_assignment]);

    let condition = b.boolean(true);
    let branch = b.if_(condition, then_block, Some(else_block));
    let body = b.block(vec![branch]);
    let initializer = b.init(Vec::new(), Some(body));
    let s = b.composite(
        CompositeKind::Struct,
        "S",
        Vec::new(),
        Members {
            fields: vec![field],
            initializers: vec![initializer],
            ..Members::default()
        },
    );
    let result = check(program(vec![Declaration::Composite(s)]));
    assert!(result.is_ok(), "expected success, got {:?}", result.err());
}

#[test]
fn test_let_field_reassignment_in_initializer() {
    let mut b = AstBuilder::new();
    let int_ty = b.t_nominal("Int");
    let annotation = b.annotation(false, int_ty);
    let field = b.field(VariableKind::Let, "x", annotation);

    let self_expr = b.name("self");
    let target = b.member(self_expr, "x");
    let one = b.int(1);
    let first = b.assign(target, TransferOp::Copy, one);
    let self_expr = b.name("self");
    let target = b.member(self_expr, "x");
    let two = b.int(2);
    let second = b.assign(target, TransferOp::Copy, two);
    let body = b.block(vec![first, second]);
    let initializer = b.init(Vec::new(), Some(body));
    let s = b.composite(
        CompositeKind::Struct,
        "S",
        Vec::new(),
        Members {
            fields: vec![field],
            initializers: vec![initializer],
            ..Members::default()
        },
    );
    let errors = check(program(vec![Declaration::Composite(s)]))
        .expect_err("expected a reassignment error");
    assert!(
        error_codes(&errors).contains(&"invalid-initializer"),
        "got {errors:?}",
    );
}

#[test]
fn test_struct_with_resource_field_is_invalid() {
    let mut b = AstBuilder::new();
    let r = b.composite(CompositeKind::Resource, "R", Vec::new(), Members::default());
    let nominal = b.t_nominal("R");
    let annotation = b.annotation(true, nominal);
    let field = b.field(VariableKind::Let, "r", annotation);
    let s = b.composite(
        CompositeKind::Struct,
        "S",
        Vec::new(),
        Members {
            fields: vec![field],
            ..Members::default()
        },
    );
    let errors = check(program(vec![
        Declaration::Composite(r),
        Declaration::Composite(s),
    ]))
    .expect_err("expected an invalid resource field error");
    assert!(
        error_codes(&errors).contains(&"invalid-resource-field"),
        "got {errors:?}",
    );
}

#[test]
fn test_entitled_member_requires_authorized_reference() {
    // entitlement Withdraw
    // resource Vault { access(Withdraw) fun take() {} }
    // fun main(vault: &Vault) { vault.take() }   -- unauthorized: error
    let mut b = AstBuilder::new();
    let withdraw = b.entitlement("Withdraw");

    let body = b.block(Vec::new());
    let withdraw_ident = b.ident("Withdraw");
    let take = b.fun_access(
        Access::Entitlements(vec![withdraw_ident]),
        "take",
        Vec::new(),
        None,
        Some(body),
    );
    let vault = b.composite(
        CompositeKind::Resource,
        "Vault",
        Vec::new(),
        Members {
            functions: vec![take],
            ..Members::default()
        },
    );

    let nominal = b.t_nominal("Vault");
    let reference = b.t_reference(Vec::new(), nominal);
    let annotation = b.annotation(false, reference);
    let parameter = b.param(None, "vault", annotation);
    let vault_expr = b.name("vault");
    let member = b.member(vault_expr, "take");
    let invocation = b.call(member, Vec::new());
    let stmt = b.expr_stmt(invocation);
    let body = b.block(vec![stmt]);
    let main = b.fun("main", vec![parameter], None, Some(body));

    let errors = check(program(vec![
        Declaration::Entitlement(withdraw),
        Declaration::Composite(vault),
        Declaration::Function(main),
    ]))
    .expect_err("expected an access control error");
    assert!(
        error_codes(&errors).contains(&"access-control"),
        "got {errors:?}",
    );
}

#[test]
fn test_entitled_member_with_authorized_reference() {
    let mut b = AstBuilder::new();
    let withdraw = b.entitlement("Withdraw");

    let body = b.block(Vec::new());
    let withdraw_ident = b.ident("Withdraw");
    let take = b.fun_access(
        Access::Entitlements(vec![withdraw_ident]),
        "take",
        Vec::new(),
        None,
        Some(body),
    );
    let vault = b.composite(
        CompositeKind::Resource,
        "Vault",
        Vec::new(),
        Members {
            functions: vec![take],
            ..Members::default()
        },
    );

    let nominal = b.t_nominal("Vault");
    let reference = b.t_reference(vec!["Withdraw"], nominal);
    let annotation = b.annotation(false, reference);
    let parameter = b.param(None, "vault", annotation);
    let vault_expr = b.name("vault");
    let member = b.member(vault_expr, "take");
    let invocation = b.call(member, Vec::new());
    let stmt = b.expr_stmt(invocation);
    let body = b.block(vec![stmt]);
    let main = b.fun("main", vec![parameter], None, Some(body));

    let result = check(program(vec![
        Declaration::Entitlement(withdraw),
        Declaration::Composite(vault),
        Declaration::Function(main),
    ]));
    assert!(result.is_ok(), "expected success, got {:?}", result.err());
}

#[test]
fn test_type_mismatch_in_binding() {
    let mut b = AstBuilder::new();
    let int_ty = b.t_nominal("Int");
    let annotation = b.annotation(false, int_ty);
    let value = b.boolean(true);
    let binding = b.let_typed("x", annotation, TransferOp::Copy, value);
    let body = b.block(vec![binding]);
    let main = b.fun("main", Vec::new(), None, Some(body));
    let errors = check(program(vec![Declaration::Function(main)]))
        .expect_err("expected a type mismatch");
    assert!(
        error_codes(&errors).contains(&"type-mismatch"),
        "got {errors:?}",
    );
}

#[test]
fn test_arithmetic_and_comparison_types() {
    let mut b = AstBuilder::new();
    let one = b.int(1);
    let two = b.int(2);
    let sum = b.binary(BinaryOp::Add, one, two);
    let three = b.int(3);
    let comparison = b.binary(BinaryOp::Less, sum, three);
    let binding = b.let_("ok", TransferOp::Copy, comparison);
    let body = b.block(vec![binding]);
    let main = b.fun("main", Vec::new(), None, Some(body));
    let result = check(program(vec![Declaration::Function(main)]));
    assert!(result.is_ok(), "expected success, got {:?}", result.err());
}

#[test]
fn test_nil_coalescing_unwraps_optional() {
    // let x: Int? = nil; let y: Int = x ?? 5
    let mut b = AstBuilder::new();
    let int_ty = b.t_nominal("Int");
    let optional = b.t_optional(int_ty);
    let annotation = b.annotation(false, optional);
    let nil = b.nil();
    let first = b.let_typed("x", annotation, TransferOp::Copy, nil);

    let int_ty = b.t_nominal("Int");
    let annotation = b.annotation(false, int_ty);
    let x = b.name("x");
    let five = b.int(5);
    let coalesced = b.binary(BinaryOp::NilCoalesce, x, five);
    let second = b.let_typed("y", annotation, TransferOp::Copy, coalesced);
    let body = b.block(vec![first, second]);
    let main = b.fun("main", Vec::new(), None, Some(body));
    let result = check(program(vec![Declaration::Function(main)]));
    assert!(result.is_ok(), "expected success, got {:?}", result.err());
}

#[test]
fn test_missing_return_value_is_reported() {
    let mut b = AstBuilder::new();
    let int_ty = b.t_nominal("Int");
    let annotation = b.annotation(false, int_ty);
    let body = b.block(Vec::new());
    let main = b.fun("main", Vec::new(), Some(annotation), Some(body));
    let errors = check(program(vec![Declaration::Function(main)]))
        .expect_err("expected a missing return error");
    assert!(
        error_codes(&errors).contains(&"missing-return-value"),
        "got {errors:?}",
    );
}

#[test]
fn test_argument_label_mismatch() {
    let mut b = AstBuilder::new();
    let int_ty = b.t_nominal("Int");
    let annotation = b.annotation(false, int_ty);
    let parameter = b.param(Some("count"), "value", annotation);
    let body = b.block(Vec::new());
    let target = b.fun("consume", vec![parameter], None, Some(body));

    let callee = b.name("consume");
    let one = b.int(1);
    let call = b.call_labeled(callee, vec![(Some("wrong"), one)]);
    let stmt = b.expr_stmt(call);
    let body = b.block(vec![stmt]);
    let main = b.fun("main", Vec::new(), None, Some(body));

    let errors = check(program(vec![
        Declaration::Function(target),
        Declaration::Function(main),
    ]))
    .expect_err("expected a label mismatch");
    assert!(
        error_codes(&errors).contains(&"argument-label-mismatch"),
        "got {errors:?}",
    );
}
