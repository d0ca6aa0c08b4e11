#[path = "../ast_test_utils.rs"]
mod util;

use util::{check, error_codes, program, AstBuilder};

use crate::ast::{CompositeKind, Declaration, Members, TransferOp};
use crate::sema::CheckErrorKind;

#[test]
fn test_event_is_exempt_from_conformance() {
    // contract interface CI { event E(a: Int) }
    // contract C: CI { event E(b: String) }
    let mut b = AstBuilder::new();

    let int_ty = b.t_nominal("Int");
    let int_annotation = b.annotation(false, int_ty);
    let interface_event_param = b.param(None, "a", int_annotation);
    let interface_event = b.event("E", vec![interface_event_param]);
    let ci = b.interface(
        CompositeKind::Contract,
        "CI",
        Members {
            events: vec![interface_event],
            ..Members::default()
        },
    );

    let string_ty = b.t_nominal("String");
    let string_annotation = b.annotation(false, string_ty);
    let composite_event_param = b.param(None, "b", string_annotation);
    let composite_event = b.event("E", vec![composite_event_param]);
    let c = b.composite(
        CompositeKind::Contract,
        "C",
        vec!["CI"],
        Members {
            events: vec![composite_event],
            ..Members::default()
        },
    );

    let result = check(program(vec![
        Declaration::Interface(ci),
        Declaration::Composite(c),
    ]));
    assert!(result.is_ok(), "expected success, got {:?}", result.err());
}

/// Builds:
///   resource interface RI {}
///   resource R: RI {}
///   struct interface SI { fun get(): <interface_return> }
///   struct S: SI { fun get(): <impl_return> { return <- create R() } }
fn covariant_return_program(swap: bool) -> Result<(), Vec<crate::sema::CheckError>> {
    let mut b = AstBuilder::new();

    let ri = b.interface(CompositeKind::Resource, "RI", Members::default());
    let r = b.composite(CompositeKind::Resource, "R", vec!["RI"], Members::default());

    let (interface_return, impl_return) = if swap {
        let nominal = b.t_nominal("R");
        let interface_return = b.annotation(true, nominal);
        let intersection = b.t_intersection(vec!["RI"]);
        let impl_return = b.annotation(true, intersection);
        (interface_return, impl_return)
    } else {
        let intersection = b.t_intersection(vec!["RI"]);
        let interface_return = b.annotation(true, intersection);
        let nominal = b.t_nominal("R");
        let impl_return = b.annotation(true, nominal);
        (interface_return, impl_return)
    };

    let requirement = b.fun("get", Vec::new(), Some(interface_return), None);
    let si = b.interface(
        CompositeKind::Struct,
        "SI",
        Members {
            functions: vec![requirement],
            ..Members::default()
        },
    );

    let created = b.create("R", Vec::new());
    let moved = b.move_expr(created);
    let ret = b.ret(Some(moved));
    let body = b.block(vec![ret]);
    let implementation = b.fun("get", Vec::new(), Some(impl_return), Some(body));
    let s = b.composite(
        CompositeKind::Struct,
        "S",
        vec!["SI"],
        Members {
            functions: vec![implementation],
            ..Members::default()
        },
    );

    check(program(vec![
        Declaration::Interface(ri),
        Declaration::Composite(r),
        Declaration::Interface(si),
        Declaration::Composite(s),
    ]))
    .map(|_| ())
}

#[test]
fn test_covariant_return_type_conforms() {
    // The implementation returns @R where the interface requires @{RI}.
    let result = covariant_return_program(false);
    assert!(result.is_ok(), "expected success, got {:?}", result.err());
}

#[test]
fn test_supertype_return_yields_one_conformance_error() {
    // Swapped: the implementation returns @{RI} where the interface
    // requires @R.
    let errors = covariant_return_program(true).expect_err("expected a conformance error");
    assert_eq!(
        error_codes(&errors),
        vec!["conformance"],
        "expected exactly one conformance error, got {errors:?}",
    );
}

#[test]
fn test_initializer_mismatch_note_locates_initializer() {
    // resource interface I { let x: Int; init(x: Int) }
    // resource R: I { let x: Int; init() { self.x = 1 } }
    let mut b = AstBuilder::new();

    let int_ty = b.t_nominal("Int");
    let interface_field_annotation = b.annotation(false, int_ty);
    let interface_field =
        b.field(crate::ast::VariableKind::Let, "x", interface_field_annotation);
    let int_ty = b.t_nominal("Int");
    let init_param_annotation = b.annotation(false, int_ty);
    let init_param = b.param(None, "x", init_param_annotation);
    let interface_init = b.init(vec![init_param], None);
    let i = b.interface(
        CompositeKind::Resource,
        "I",
        Members {
            fields: vec![interface_field],
            initializers: vec![interface_init],
            ..Members::default()
        },
    );

    let int_ty = b.t_nominal("Int");
    let field_annotation = b.annotation(false, int_ty);
    let field = b.field(crate::ast::VariableKind::Let, "x", field_annotation);
    let self_expr = b.name("self");
    let target = b.member(self_expr, "x");
    let one = b.int(1);
    let assignment = b.assign(target, TransferOp::Copy, one);
    let body = b.block(vec![assignment]);
    let initializer = b.init(Vec::new(), Some(body));
    let initializer_span = initializer.span;
    let r = b.composite(
        CompositeKind::Resource,
        "R",
        vec!["I"],
        Members {
            fields: vec![field],
            initializers: vec![initializer],
            ..Members::default()
        },
    );

    let errors = check(program(vec![
        Declaration::Interface(i),
        Declaration::Composite(r),
    ]))
    .expect_err("expected a conformance error");

    assert_eq!(error_codes(&errors), vec!["conformance"]);
    assert_eq!(errors[0].notes.len(), 1, "expected one note: {errors:?}");
    assert_eq!(errors[0].notes[0].span, initializer_span);
}

#[test]
fn test_missing_members_and_types_note_message() {
    // contract interface I { struct S {} fun foo() }
    // contract C: I {}
    let mut b = AstBuilder::new();

    let nested = b.composite(CompositeKind::Struct, "S", Vec::new(), Members::default());
    let requirement = b.fun("foo", Vec::new(), None, None);
    let i = b.interface(
        CompositeKind::Contract,
        "I",
        Members {
            composites: vec![nested],
            functions: vec![requirement],
            ..Members::default()
        },
    );
    let c = b.composite(CompositeKind::Contract, "C", vec!["I"], Members::default());

    let errors = check(program(vec![
        Declaration::Interface(i),
        Declaration::Composite(c),
    ]))
    .expect_err("expected a conformance error");

    assert_eq!(error_codes(&errors), vec!["conformance"]);
    let messages: Vec<&str> = errors[0]
        .notes
        .iter()
        .map(|note| note.message.as_str())
        .collect();
    assert_eq!(
        messages,
        vec![
            "`C` is missing definitions for members: `foo`. \
             `C` is also missing definitions for types: `I.S`"
        ],
    );
}

#[test]
fn test_different_argument_label_does_not_conform() {
    // interface: fun foo(x: Int); implementation: fun foo(y: Int)
    let mut b = AstBuilder::new();

    let int_ty = b.t_nominal("Int");
    let annotation = b.annotation(false, int_ty);
    let requirement_param = b.param(None, "x", annotation);
    let requirement = b.fun("foo", vec![requirement_param], None, None);
    let si = b.interface(
        CompositeKind::Struct,
        "SI",
        Members {
            functions: vec![requirement],
            ..Members::default()
        },
    );

    let int_ty = b.t_nominal("Int");
    let annotation = b.annotation(false, int_ty);
    let implementation_param = b.param(None, "y", annotation);
    let body = b.block(Vec::new());
    let implementation = b.fun("foo", vec![implementation_param], None, Some(body));
    let s = b.composite(
        CompositeKind::Struct,
        "S",
        vec!["SI"],
        Members {
            functions: vec![implementation],
            ..Members::default()
        },
    );

    let errors = check(program(vec![
        Declaration::Interface(si),
        Declaration::Composite(s),
    ]))
    .expect_err("expected a conformance error");
    assert_eq!(error_codes(&errors), vec!["conformance"]);
}

#[test]
fn test_same_label_different_parameter_name_conforms() {
    // interface: fun foo(x y: String); implementation: fun foo(x z: String)
    let mut b = AstBuilder::new();

    let string_ty = b.t_nominal("String");
    let annotation = b.annotation(false, string_ty);
    let requirement_param = b.param(Some("x"), "y", annotation);
    let requirement = b.fun("foo", vec![requirement_param], None, None);
    let si = b.interface(
        CompositeKind::Struct,
        "SI",
        Members {
            functions: vec![requirement],
            ..Members::default()
        },
    );

    let string_ty = b.t_nominal("String");
    let annotation = b.annotation(false, string_ty);
    let implementation_param = b.param(Some("x"), "z", annotation);
    let body = b.block(Vec::new());
    let implementation = b.fun("foo", vec![implementation_param], None, Some(body));
    let s = b.composite(
        CompositeKind::Struct,
        "S",
        vec!["SI"],
        Members {
            functions: vec![implementation],
            ..Members::default()
        },
    );

    let result = check(program(vec![
        Declaration::Interface(si),
        Declaration::Composite(s),
    ]));
    assert!(result.is_ok(), "expected success, got {:?}", result.err());
}

#[test]
fn test_missing_function_with_default_body_conforms() {
    // The interface supplies a default body; the composite may omit the
    // member.
    let mut b = AstBuilder::new();

    let body = b.block(Vec::new());
    let default_fun = b.fun("foo", Vec::new(), None, Some(body));
    let si = b.interface(
        CompositeKind::Struct,
        "SI",
        Members {
            functions: vec![default_fun],
            ..Members::default()
        },
    );
    let s = b.composite(CompositeKind::Struct, "S", vec!["SI"], Members::default());

    let result = check(program(vec![
        Declaration::Interface(si),
        Declaration::Composite(s),
    ]));
    assert!(result.is_ok(), "expected success, got {:?}", result.err());
}

#[test]
fn test_duplicate_nested_declaration_halts_conformance() {
    // The duplicate nested declaration is fatal for the declaration:
    // conformance checking does not run, so the missing member is not
    // reported.
    let mut b = AstBuilder::new();

    let requirement = b.fun("foo", Vec::new(), None, None);
    let i = b.interface(
        CompositeKind::Contract,
        "I",
        Members {
            functions: vec![requirement],
            ..Members::default()
        },
    );

    let first = b.composite(CompositeKind::Struct, "S", Vec::new(), Members::default());
    let second = b.composite(CompositeKind::Struct, "S", Vec::new(), Members::default());
    let c = b.composite(
        CompositeKind::Contract,
        "C",
        vec!["I"],
        Members {
            composites: vec![first, second],
            ..Members::default()
        },
    );

    let errors = check(program(vec![
        Declaration::Interface(i),
        Declaration::Composite(c),
    ]))
    .expect_err("expected a nested declaration error");

    assert!(
        errors
            .iter()
            .all(|error| matches!(error.kind, CheckErrorKind::InvalidNestedDeclaration { .. })),
        "expected only nested declaration errors, got {errors:?}",
    );
}
