use thiserror::Error;

use crate::diag::{Span, SpannedError};

#[derive(Debug, Clone, Error)]
pub enum CheckErrorKind {
    #[error("cannot find {kind} `{name}` in this scope")]
    NotDeclared { kind: &'static str, name: String },

    #[error("cannot redeclare `{name}`")]
    Redeclaration { name: String },

    #[error("invalid nested declaration: `{name}` is declared more than once")]
    InvalidNestedDeclaration { name: String },

    #[error("mismatched types: expected `{expected}`, found `{actual}`")]
    TypeMismatch { expected: String, actual: String },

    #[error("`{composite}` does not conform to {interface_kind} interface `{interface}`")]
    Conformance {
        composite: String,
        interface: String,
        interface_kind: &'static str,
    },

    #[error("member `{member}` of `{container}` has a mismatched declaration")]
    MemberMismatch { container: String, member: String },

    #[error("value of type `{ty}` has no member `{member}`")]
    MissingMember { ty: String, member: String },

    #[error("access denied: member `{member}` requires {required}")]
    AccessControl { member: String, required: String },

    #[error("loss of resource `{name}`")]
    ResourceLoss { name: String },

    #[error("resource expression is discarded without a move or destroy")]
    ResourceLossExpression,

    #[error("use of `{name}` after it was moved or destroyed")]
    InvalidMove { name: String },

    #[error("resource `{name}` is invalidated inside a loop")]
    ResourceInvalidatedInLoop { name: String },

    #[error("missing move operator `<-` for resource value")]
    MissingMoveOperator,

    #[error("unexpected move operator `<-` for non-resource value")]
    UnexpectedMoveOperator,

    #[error("field `{field}` of `{composite}` is not initialized on all paths")]
    InvalidInitializer { composite: String, field: String },

    #[error("cannot reassign constant field `{field}`")]
    ConstantFieldReassignment { field: String },

    #[error("cannot assign to constant `{name}`")]
    AssignmentToConstant { name: String },

    #[error("cannot assign to resource-typed field without moving out the previous value")]
    ResourceFieldOverwrite,

    #[error("resource type `{ty}` is invalid here: resources must be stored in other resources or referenced")]
    InvalidResourceField { ty: String },

    #[error("resource annotation `@` does not match the type `{ty}`")]
    InvalidResourceAnnotation { ty: String },

    #[error("expression is not callable")]
    NotCallable,

    #[error("wrong number of arguments: expected {expected}, found {actual}")]
    ArgumentCountMismatch { expected: usize, actual: usize },

    #[error("incorrect argument label: expected `{expected}`, found `{actual}`")]
    ArgumentLabelMismatch { expected: String, actual: String },

    #[error("`create` requires a resource constructor, found `{ty}`")]
    InvalidCreate { ty: String },

    #[error("`destroy` requires a resource value")]
    InvalidDestroy,

    #[error("cannot infer type from expression; an explicit annotation is required")]
    CannotInferType,

    #[error("control statement is only valid inside a loop")]
    ControlStatementOutsideLoop,

    #[error("missing return value of type `{expected}`")]
    MissingReturnValue { expected: String },

    #[error("capability borrow requires a reference type argument, found `{ty}`")]
    InvalidBorrowType { ty: String },

    #[error("function `{name}` requires a body")]
    MissingFunctionBody { name: String },

    #[error("resource constructor invocation requires `create`")]
    MissingCreate,
}

impl CheckErrorKind {
    /// Stable identifier of the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            CheckErrorKind::NotDeclared { .. } => "not-declared",
            CheckErrorKind::Redeclaration { .. } => "redeclaration",
            CheckErrorKind::InvalidNestedDeclaration { .. } => "invalid-nested-declaration",
            CheckErrorKind::TypeMismatch { .. } => "type-mismatch",
            CheckErrorKind::Conformance { .. } => "conformance",
            CheckErrorKind::MemberMismatch { .. } => "member-mismatch",
            CheckErrorKind::MissingMember { .. } => "missing-member",
            CheckErrorKind::AccessControl { .. } => "access-control",
            CheckErrorKind::ResourceLoss { .. } => "resource-loss",
            CheckErrorKind::ResourceLossExpression => "resource-loss",
            CheckErrorKind::InvalidMove { .. } => "invalid-move",
            CheckErrorKind::ResourceInvalidatedInLoop { .. } => "invalid-move",
            CheckErrorKind::MissingMoveOperator => "missing-move-operator",
            CheckErrorKind::UnexpectedMoveOperator => "unexpected-move-operator",
            CheckErrorKind::InvalidInitializer { .. } => "invalid-initializer",
            CheckErrorKind::ConstantFieldReassignment { .. } => "invalid-initializer",
            CheckErrorKind::AssignmentToConstant { .. } => "assignment-to-constant",
            CheckErrorKind::ResourceFieldOverwrite => "resource-field-overwrite",
            CheckErrorKind::InvalidResourceField { .. } => "invalid-resource-field",
            CheckErrorKind::InvalidResourceAnnotation { .. } => "invalid-resource-annotation",
            CheckErrorKind::NotCallable => "not-callable",
            CheckErrorKind::ArgumentCountMismatch { .. } => "argument-count-mismatch",
            CheckErrorKind::ArgumentLabelMismatch { .. } => "argument-label-mismatch",
            CheckErrorKind::InvalidCreate { .. } => "invalid-create",
            CheckErrorKind::InvalidDestroy => "invalid-destroy",
            CheckErrorKind::CannotInferType => "cannot-infer-type",
            CheckErrorKind::ControlStatementOutsideLoop => "control-statement-outside-loop",
            CheckErrorKind::MissingReturnValue { .. } => "missing-return-value",
            CheckErrorKind::InvalidBorrowType { .. } => "invalid-borrow-type",
            CheckErrorKind::MissingFunctionBody { .. } => "missing-function-body",
            CheckErrorKind::MissingCreate => "missing-create",
        }
    }

    pub fn at(self, span: Span) -> CheckError {
        CheckError::new(self, span)
    }
}

pub type CheckError = SpannedError<CheckErrorKind>;
