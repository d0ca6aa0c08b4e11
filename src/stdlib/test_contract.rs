//! The `Test` contract.
//!
//! Checked once per process against a base activation predeclaring
//! `assert` and `panic`; the checked program is a lazily initialized
//! singleton that is never mutated afterwards. The contract's functions
//! are native declarations dispatched to host implementations, with file
//! reads and the emulator blockchain behind the [`TestFramework`] trait.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::OnceLock;

use crate::ast::{
    Access, CompositeDeclaration, CompositeKind, Comments, Declaration, FieldDeclaration,
    FunctionDeclaration, Identifier, Members, NominalType, Parameter, Program, TypeAnnotation,
    TypeExpr, VariableKind,
};
use crate::common::Location;
use crate::diag::Span;
use crate::interpreter::errors::{RuntimeError, UserErrorKind};
use crate::interpreter::value::{CompositeValue, FunctionValue, Value};
use crate::interpreter::{host_function, Interpreter, Invocation};
use crate::sema::{check_program, BaseActivation, CheckedProgram, CheckerConfig};
use crate::types::{PrimitiveType, TypeCache, TypeId};

pub const TEST_CONTRACT_NAME: &str = "Test";

const MATCHER_TYPE_NAME: &str = "Matcher";
const BLOCKCHAIN_TYPE_NAME: &str = "Blockchain";
const MATCHER_TEST_FUNCTION_NAME: &str = "test";

/// Host imports of the testing surface: source files and the emulator
/// blockchain are provided by the embedder.
pub trait TestFramework {
    fn read_file(&self, path: &str) -> Result<String, RuntimeError>;

    /// A fresh emulator blockchain, as a host composite of type
    /// `Test.Blockchain`.
    fn new_emulator_blockchain(&mut self) -> Result<Value, RuntimeError>;
}

/// The once-checked `Test` contract. Initialized at most once per
/// process and never mutated.
pub fn test_contract_checker() -> Result<&'static CheckedProgram, Vec<crate::sema::CheckError>> {
    static CHECKED: OnceLock<Result<CheckedProgram, Vec<crate::sema::CheckError>>> =
        OnceLock::new();
    CHECKED
        .get_or_init(|| {
            let mut base = BaseActivation::new();
            base.declare("assert", |cache: &mut TypeCache| {
                assert_requirement_type(cache)
            });
            base.declare("panic", |cache: &mut TypeCache| panic_requirement_type(cache));
            check_program(
                test_contract_program(),
                Location::Identifier(TEST_CONTRACT_NAME.to_string()),
                &base,
                CheckerConfig {
                    allow_native_declarations: true,
                },
            )
        })
        .as_ref()
        .map_err(Clone::clone)
}

fn assert_requirement_type(cache: &mut TypeCache) -> TypeId {
    let bool_ty = cache.primitive(PrimitiveType::Bool);
    let string_ty = cache.primitive(PrimitiveType::String);
    let void_ty = cache.primitive(PrimitiveType::Void);
    cache.intern(crate::types::Type::Function(crate::types::FunctionType {
        type_parameters: Vec::new(),
        parameters: vec![
            crate::types::FunctionParameter {
                label: None,
                identifier: "condition".to_string(),
                ty: bool_ty,
            },
            crate::types::FunctionParameter {
                label: Some("message".to_string()),
                identifier: "message".to_string(),
                ty: string_ty,
            },
        ],
        return_type: void_ty,
        is_constructor: false,
    }))
}

fn panic_requirement_type(cache: &mut TypeCache) -> TypeId {
    let string_ty = cache.primitive(PrimitiveType::String);
    let never_ty = cache.never();
    cache.intern(crate::types::Type::Function(crate::types::FunctionType {
        type_parameters: Vec::new(),
        parameters: vec![crate::types::FunctionParameter {
            label: None,
            identifier: "message".to_string(),
            ty: string_ty,
        }],
        return_type: never_ty,
        is_constructor: false,
    }))
}

// --- Contract AST ---

fn span() -> Span {
    Span::default()
}

fn identifier(name: &str) -> Identifier {
    Identifier::new(name, span())
}

fn nominal(name: &str) -> TypeExpr {
    let identifiers = name.split('.').map(identifier).collect();
    TypeExpr::Nominal(NominalType {
        identifiers,
        span: span(),
    })
}

fn annotation(ty: TypeExpr) -> TypeAnnotation {
    TypeAnnotation {
        is_resource: false,
        ty,
        span: span(),
    }
}

fn parameter(label: Option<&str>, name: &str, ty: TypeExpr) -> Parameter {
    Parameter {
        label: label.map(str::to_string),
        identifier: identifier(name),
        type_annotation: annotation(ty),
        span: span(),
    }
}

fn native_function(
    name: &str,
    parameters: Vec<Parameter>,
    return_type: Option<TypeExpr>,
) -> FunctionDeclaration {
    FunctionDeclaration {
        access: Access::All,
        identifier: identifier(name),
        parameters,
        return_type: return_type.map(annotation),
        body: None,
        comments: Comments::default(),
        span: span(),
    }
}

fn matcher_test_function_type() -> TypeExpr {
    TypeExpr::Function {
        parameters: vec![annotation(nominal("AnyStruct"))],
        return_type: Box::new(annotation(nominal("Bool"))),
    }
}

/// `contract Test { struct Matcher { … } struct Blockchain {} … }`
fn test_contract_program() -> Program {
    let matcher = CompositeDeclaration {
        access: Access::All,
        kind: CompositeKind::Struct,
        identifier: identifier(MATCHER_TYPE_NAME),
        conformances: Vec::new(),
        members: Members {
            fields: vec![FieldDeclaration {
                access: Access::All,
                kind: VariableKind::Let,
                identifier: identifier(MATCHER_TEST_FUNCTION_NAME),
                type_annotation: annotation(matcher_test_function_type()),
                comments: Comments::default(),
                span: span(),
            }],
            ..Members::default()
        },
        comments: Comments::default(),
        span: span(),
    };

    let blockchain = CompositeDeclaration {
        access: Access::All,
        kind: CompositeKind::Struct,
        identifier: identifier(BLOCKCHAIN_TYPE_NAME),
        conformances: Vec::new(),
        members: Members::default(),
        comments: Comments::default(),
        span: span(),
    };

    let functions = vec![
        native_function(
            "assert",
            vec![
                parameter(None, "condition", nominal("Bool")),
                parameter(Some("message"), "message", nominal("String")),
            ],
            None,
        ),
        native_function(
            "fail",
            vec![parameter(None, "message", nominal("String"))],
            None,
        ),
        native_function(
            "expect",
            vec![
                parameter(None, "value", nominal("AnyStruct")),
                parameter(None, "matcher", nominal(MATCHER_TYPE_NAME)),
            ],
            None,
        ),
        native_function(
            "readFile",
            vec![parameter(None, "path", nominal("String"))],
            Some(nominal("String")),
        ),
        native_function(
            "newEmulatorBlockchain",
            Vec::new(),
            Some(nominal(BLOCKCHAIN_TYPE_NAME)),
        ),
        native_function(
            "equal",
            vec![parameter(None, "value", nominal("AnyStruct"))],
            Some(nominal(MATCHER_TYPE_NAME)),
        ),
        native_function("beEmpty", Vec::new(), Some(nominal(MATCHER_TYPE_NAME))),
        native_function(
            "haveElementCount",
            vec![parameter(None, "count", nominal("Int"))],
            Some(nominal(MATCHER_TYPE_NAME)),
        ),
        native_function(
            "contain",
            vec![parameter(None, "element", nominal("AnyStruct"))],
            Some(nominal(MATCHER_TYPE_NAME)),
        ),
        native_function(
            "beGreaterThan",
            vec![parameter(None, "value", nominal("Int"))],
            Some(nominal(MATCHER_TYPE_NAME)),
        ),
        native_function(
            "beLessThan",
            vec![parameter(None, "value", nominal("Int"))],
            Some(nominal(MATCHER_TYPE_NAME)),
        ),
        native_function(
            "newMatcher",
            vec![parameter(None, MATCHER_TEST_FUNCTION_NAME, matcher_test_function_type())],
            Some(nominal(MATCHER_TYPE_NAME)),
        ),
    ];

    Program {
        declarations: vec![Declaration::Composite(CompositeDeclaration {
            access: Access::All,
            kind: CompositeKind::Contract,
            identifier: identifier(TEST_CONTRACT_NAME),
            conformances: Vec::new(),
            members: Members {
                composites: vec![matcher, blockchain],
                functions,
                ..Members::default()
            },
            comments: Comments::default(),
            span: span(),
        })],
    }
}

// --- Contract value ---

fn matcher_value(test: FunctionValue) -> Value {
    let mut matcher = CompositeValue::new(
        Location::Identifier(TEST_CONTRACT_NAME.to_string()),
        format!("{TEST_CONTRACT_NAME}.{MATCHER_TYPE_NAME}"),
        CompositeKind::Struct,
    );
    matcher
        .fields
        .insert(MATCHER_TEST_FUNCTION_NAME.to_string(), Value::Function(test));
    Value::composite(matcher)
}

fn matcher_from(
    name: &str,
    test: impl Fn(&mut Interpreter, &Value) -> Result<bool, RuntimeError> + 'static,
) -> Value {
    let function = host_function(name, move |interpreter, invocation| {
        let value = invocation
            .arguments
            .first()
            .cloned()
            .unwrap_or(Value::Void);
        Ok(Value::Bool(test(interpreter, &value)?))
    });
    matcher_value(function)
}

fn collection_length(value: &Value) -> Option<usize> {
    match value {
        Value::Array(array) => Some(array.borrow().values.len()),
        Value::Dictionary(dictionary) => Some(dictionary.borrow().entries.len()),
        Value::String(string) => Some(string.borrow().chars().count()),
        _ => None,
    }
}

fn invoke_matcher(
    interpreter: &mut Interpreter,
    matcher: &Value,
    value: Value,
    span: Span,
) -> Result<bool, RuntimeError> {
    let test = interpreter.get_member(matcher, MATCHER_TEST_FUNCTION_NAME, span)?;
    let Value::Function(test) = test else {
        return Err(RuntimeError::internal("matcher `test` is not a function"));
    };
    match interpreter.call_value(test, vec![value])? {
        Value::Bool(result) => Ok(result),
        _ => Err(RuntimeError::internal("matcher `test` returned non-boolean")),
    }
}

fn numeric_compare(value: &Value, other: &Value) -> Option<std::cmp::Ordering> {
    match (value, other) {
        (Value::Integer(left), Value::Integer(right)) => Some(left.value.cmp(&right.value)),
        _ => None,
    }
}

/// Builds the `Test` contract instance with its host function table.
pub fn test_contract_value(framework: Rc<RefCell<dyn TestFramework>>) -> Value {
    let mut contract = CompositeValue::new(
        Location::Identifier(TEST_CONTRACT_NAME.to_string()),
        TEST_CONTRACT_NAME,
        CompositeKind::Contract,
    );

    let mut declare = |name: &str, function: FunctionValue| {
        contract.functions.insert(name.to_string(), function);
    };

    declare(
        "assert",
        host_function("assert", |_, invocation| {
            if matches!(invocation.arguments.first(), Some(Value::Bool(true))) {
                return Ok(Value::Void);
            }
            let message = invocation
                .arguments
                .get(1)
                .map(|message| message.to_string());
            Err(UserErrorKind::AssertionFailed { message }.at(invocation.span))
        }),
    );

    declare(
        "fail",
        host_function("fail", |_, invocation| {
            let message = invocation
                .arguments
                .first()
                .map(|message| message.to_string());
            Err::<Value, RuntimeError>(
                UserErrorKind::AssertionFailed { message }.at(invocation.span),
            )
        }),
    );

    declare(
        "expect",
        host_function("expect", |interpreter, invocation: Invocation| {
            let mut arguments = invocation.arguments.into_iter();
            let value = arguments.next().unwrap_or(Value::Void);
            let Some(matcher) = arguments.next() else {
                return Err(RuntimeError::internal("expect requires a matcher"));
            };
            if invoke_matcher(interpreter, &matcher, value, invocation.span)? {
                Ok(Value::Void)
            } else {
                Err(UserErrorKind::AssertionFailed {
                    message: Some("given value does not match the matcher".to_string()),
                }
                .at(invocation.span))
            }
        }),
    );

    let read_framework = framework.clone();
    declare(
        "readFile",
        host_function("readFile", move |_, invocation| {
            let Some(Value::String(path)) = invocation.arguments.first() else {
                return Err(RuntimeError::internal("readFile requires a path"));
            };
            let path = path.borrow().clone();
            let content = read_framework.borrow().read_file(&path)?;
            Ok(Value::string(content))
        }),
    );

    let blockchain_framework = framework.clone();
    declare(
        "newEmulatorBlockchain",
        host_function("newEmulatorBlockchain", move |_, _| {
            blockchain_framework.borrow_mut().new_emulator_blockchain()
        }),
    );

    declare(
        "equal",
        host_function("equal", |_, invocation| {
            let expected = invocation
                .arguments
                .first()
                .cloned()
                .unwrap_or(Value::Void);
            Ok(matcher_from("equal.test", move |_, value| {
                Ok(value.equal(&expected))
            }))
        }),
    );

    declare(
        "beEmpty",
        host_function("beEmpty", |_, _| {
            Ok(matcher_from("beEmpty.test", |_, value| {
                Ok(collection_length(value) == Some(0))
            }))
        }),
    );

    declare(
        "haveElementCount",
        host_function("haveElementCount", |_, invocation| {
            let Some(Value::Integer(count)) = invocation.arguments.first().cloned() else {
                return Err(RuntimeError::internal("haveElementCount requires a count"));
            };
            Ok(matcher_from("haveElementCount.test", move |_, value| {
                Ok(collection_length(value)
                    .and_then(|length| count.to_usize().map(|count| length == count))
                    .unwrap_or(false))
            }))
        }),
    );

    declare(
        "contain",
        host_function("contain", |_, invocation| {
            let element = invocation
                .arguments
                .first()
                .cloned()
                .unwrap_or(Value::Void);
            Ok(matcher_from("contain.test", move |_, value| {
                Ok(match value {
                    Value::Array(array) => array
                        .borrow()
                        .values
                        .iter()
                        .any(|item| item.equal(&element)),
                    Value::Dictionary(dictionary) => dictionary
                        .borrow()
                        .entries
                        .values()
                        .any(|item| item.equal(&element)),
                    _ => false,
                })
            }))
        }),
    );

    declare(
        "beGreaterThan",
        host_function("beGreaterThan", |_, invocation| {
            let bound = invocation
                .arguments
                .first()
                .cloned()
                .unwrap_or(Value::Void);
            Ok(matcher_from("beGreaterThan.test", move |_, value| {
                Ok(numeric_compare(value, &bound) == Some(std::cmp::Ordering::Greater))
            }))
        }),
    );

    declare(
        "beLessThan",
        host_function("beLessThan", |_, invocation| {
            let bound = invocation
                .arguments
                .first()
                .cloned()
                .unwrap_or(Value::Void);
            Ok(matcher_from("beLessThan.test", move |_, value| {
                Ok(numeric_compare(value, &bound) == Some(std::cmp::Ordering::Less))
            }))
        }),
    );

    declare(
        "newMatcher",
        host_function("newMatcher", |_, invocation| {
            let Some(Value::Function(test)) = invocation.arguments.first().cloned() else {
                return Err(RuntimeError::internal("newMatcher requires a function"));
            };
            Ok(matcher_value(test))
        }),
    );

    Value::composite(contract)
}
