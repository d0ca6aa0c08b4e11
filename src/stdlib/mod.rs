//! The standard-library surface: predeclared base values, host import
//! traits, and the `Test` contract.

mod test_contract;

pub use test_contract::{
    test_contract_checker, test_contract_value, TestFramework, TEST_CONTRACT_NAME,
};

use tracing::info;

use crate::interpreter::errors::{RuntimeError, UserErrorKind};
use crate::interpreter::value::Value;
use crate::interpreter::{host_function, Interpreter};
use crate::sema::BaseActivation;
use crate::types::{
    FunctionParameter, FunctionType, PrimitiveType, Type, TypeCache, TypeId,
};

/// Host-provided cryptographic primitives. The runtime only dispatches;
/// it implements nothing itself.
pub trait CryptoProvider {
    fn verify_signature(&self, public_key: &[u8], signature: &[u8], message: &[u8]) -> bool;
    fn hash(&self, algorithm: &str, data: &[u8]) -> Vec<u8>;
}

/// The base activation every program is checked against: `assert`,
/// `panic`, and `log`.
pub fn base_activation() -> BaseActivation {
    let mut base = BaseActivation::new();
    base.declare("assert", assert_function_type);
    base.declare("panic", panic_function_type);
    base.declare("log", log_function_type);
    base
}

fn assert_function_type(cache: &mut TypeCache) -> TypeId {
    let bool_ty = cache.primitive(PrimitiveType::Bool);
    let string_ty = cache.primitive(PrimitiveType::String);
    let void_ty = cache.primitive(PrimitiveType::Void);
    cache.intern(Type::Function(FunctionType {
        type_parameters: Vec::new(),
        parameters: vec![
            FunctionParameter {
                label: None,
                identifier: "condition".to_string(),
                ty: bool_ty,
            },
            FunctionParameter {
                label: Some("message".to_string()),
                identifier: "message".to_string(),
                ty: string_ty,
            },
        ],
        return_type: void_ty,
        is_constructor: false,
    }))
}

fn panic_function_type(cache: &mut TypeCache) -> TypeId {
    let string_ty = cache.primitive(PrimitiveType::String);
    let never_ty = cache.never();
    cache.intern(Type::Function(FunctionType {
        type_parameters: Vec::new(),
        parameters: vec![FunctionParameter {
            label: None,
            identifier: "message".to_string(),
            ty: string_ty,
        }],
        return_type: never_ty,
        is_constructor: false,
    }))
}

fn log_function_type(cache: &mut TypeCache) -> TypeId {
    let any_ty = cache.primitive(PrimitiveType::AnyStruct);
    let void_ty = cache.primitive(PrimitiveType::Void);
    cache.intern(Type::Function(FunctionType {
        type_parameters: Vec::new(),
        parameters: vec![FunctionParameter {
            label: None,
            identifier: "value".to_string(),
            ty: any_ty,
        }],
        return_type: void_ty,
        is_constructor: false,
    }))
}

/// Installs the interpreter-side implementations of the base activation.
pub fn install_base_values(interpreter: &mut Interpreter) {
    interpreter.declare_global(
        "assert",
        Value::Function(host_function("assert", |_, invocation| {
            let condition = matches!(invocation.arguments.first(), Some(Value::Bool(true)));
            if condition {
                return Ok(Value::Void);
            }
            let message = invocation.arguments.get(1).map(render_message);
            Err(UserErrorKind::AssertionFailed { message }.at(invocation.span))
        })),
    );
    interpreter.declare_global(
        "panic",
        Value::Function(host_function("panic", |_, invocation| {
            let message = invocation.arguments.first().map(render_message);
            Err::<Value, RuntimeError>(UserErrorKind::Panic { message }.at(invocation.span))
        })),
    );
    interpreter.declare_global(
        "log",
        Value::Function(host_function("log", |_, invocation| {
            if let Some(value) = invocation.arguments.first() {
                info!(target: "cadence::log", "{value}");
            }
            Ok(Value::Void)
        })),
    );
}

fn render_message(value: &Value) -> String {
    match value {
        Value::String(message) => message.borrow().clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "../tests/stdlib/t_stdlib.rs"]
mod stdlib_tests;
