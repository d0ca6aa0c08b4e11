//! The abstract syntax tree consumed by the checker.
//!
//! Nodes are immutable and carry source spans; expression nodes additionally
//! carry a `NodeId` so the elaboration can record per-node facts without
//! mutating the tree. The producing parser is an external collaborator;
//! tests build trees through builder helpers.

mod comments;

pub use comments::{Comment, Comments};

use num_bigint::BigInt;

use crate::common::PathDomain;
use crate::diag::Span;

/// Identity of an AST node, unique within one program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

#[derive(Debug, Default, Clone)]
pub struct NodeIdGen {
    next: u32,
}

impl NodeIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

impl Identifier {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone)]
pub enum Declaration {
    Composite(CompositeDeclaration),
    Interface(InterfaceDeclaration),
    Function(FunctionDeclaration),
    Entitlement(EntitlementDeclaration),
    Variable(VariableDeclaration),
}

impl Declaration {
    pub fn identifier(&self) -> &Identifier {
        match self {
            Declaration::Composite(declaration) => &declaration.identifier,
            Declaration::Interface(declaration) => &declaration.identifier,
            Declaration::Function(declaration) => &declaration.identifier,
            Declaration::Entitlement(declaration) => &declaration.identifier,
            Declaration::Variable(declaration) => &declaration.identifier,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Declaration::Composite(declaration) => declaration.span,
            Declaration::Interface(declaration) => declaration.span,
            Declaration::Function(declaration) => declaration.span,
            Declaration::Entitlement(declaration) => declaration.span,
            Declaration::Variable(declaration) => declaration.span,
        }
    }
}

/// The nominal kind of a composite or interface declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositeKind {
    Struct,
    Resource,
    Contract,
    Enum,
    Attachment,
    Event,
}

impl CompositeKind {
    pub fn is_resource(self) -> bool {
        matches!(self, CompositeKind::Resource)
    }

    pub fn keyword(self) -> &'static str {
        match self {
            CompositeKind::Struct => "struct",
            CompositeKind::Resource => "resource",
            CompositeKind::Contract => "contract",
            CompositeKind::Enum => "enum",
            CompositeKind::Attachment => "attachment",
            CompositeKind::Event => "event",
        }
    }
}

/// `access(self | contract | account | all | E₁, …, Eₙ)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Access {
    SelfOnly,
    Contract,
    Account,
    All,
    /// Access requires the listed entitlements on the accessing reference.
    Entitlements(Vec<Identifier>),
}

impl Default for Access {
    fn default() -> Self {
        Access::All
    }
}

#[derive(Debug, Clone)]
pub struct CompositeDeclaration {
    pub access: Access,
    pub kind: CompositeKind,
    pub identifier: Identifier,
    pub conformances: Vec<NominalType>,
    pub members: Members,
    pub comments: Comments,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct InterfaceDeclaration {
    pub access: Access,
    /// The kind of composite this interface constrains.
    pub kind: CompositeKind,
    pub identifier: Identifier,
    pub members: Members,
    pub comments: Comments,
    pub span: Span,
}

#[derive(Debug, Clone, Default)]
pub struct Members {
    pub fields: Vec<FieldDeclaration>,
    pub initializers: Vec<InitializerDeclaration>,
    pub functions: Vec<FunctionDeclaration>,
    pub events: Vec<EventDeclaration>,
    pub composites: Vec<CompositeDeclaration>,
    pub interfaces: Vec<InterfaceDeclaration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Let,
    Var,
}

#[derive(Debug, Clone)]
pub struct FieldDeclaration {
    pub access: Access,
    pub kind: VariableKind,
    pub identifier: Identifier,
    pub type_annotation: TypeAnnotation,
    pub comments: Comments,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct InitializerDeclaration {
    pub parameters: Vec<Parameter>,
    pub body: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FunctionDeclaration {
    pub access: Access,
    pub identifier: Identifier,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<TypeAnnotation>,
    /// `None` for native (host-implemented) declarations and for interface
    /// requirements without a default body.
    pub body: Option<Block>,
    pub comments: Comments,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct EventDeclaration {
    pub access: Access,
    pub identifier: Identifier,
    pub parameters: Vec<Parameter>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct EntitlementDeclaration {
    pub access: Access,
    pub identifier: Identifier,
    pub span: Span,
}

/// A function parameter. The argument label is what call sites must write;
/// the identifier is the binding name inside the body. A label of `_`
/// means the argument is unlabeled.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub label: Option<String>,
    pub identifier: Identifier,
    pub type_annotation: TypeAnnotation,
    pub span: Span,
}

impl Parameter {
    /// The label call sites must use: the explicit label, or the parameter
    /// name when no label is declared. `Some("_")` means unlabeled.
    pub fn effective_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.identifier.name)
    }
}

// --- Types (syntactic) ---

/// A type annotation: the `@` resource marker plus a type expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeAnnotation {
    pub is_resource: bool,
    pub ty: TypeExpr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NominalType {
    /// One segment per qualification level, e.g. `I.S` is two segments.
    pub identifiers: Vec<Identifier>,
    pub span: Span,
}

impl NominalType {
    pub fn name(&self) -> String {
        self.identifiers
            .iter()
            .map(|identifier| identifier.name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    Nominal(NominalType),
    Optional(Box<TypeExpr>),
    VariableSizedArray(Box<TypeExpr>),
    ConstantSizedArray(Box<TypeExpr>, u64),
    Dictionary(Box<TypeExpr>, Box<TypeExpr>),
    Reference {
        entitlements: Vec<Identifier>,
        referenced: Box<TypeExpr>,
    },
    Capability {
        borrow: Option<Box<TypeExpr>>,
    },
    Intersection(Vec<NominalType>),
    Function {
        parameters: Vec<TypeAnnotation>,
        return_type: Box<TypeAnnotation>,
    },
}

// --- Statements ---

#[derive(Debug, Clone)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
}

/// The operator of a binding or assignment: `=` copies, `<-` moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOp {
    Copy,
    Move,
}

#[derive(Debug, Clone)]
pub struct VariableDeclaration {
    pub kind: VariableKind,
    pub identifier: Identifier,
    pub type_annotation: Option<TypeAnnotation>,
    pub transfer: TransferOp,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Statement {
    Variable(VariableDeclaration),
    Assignment {
        target: Expr,
        transfer: TransferOp,
        value: Expr,
        span: Span,
    },
    Return {
        value: Option<Expr>,
        span: Span,
    },
    If {
        condition: Expr,
        then_block: Block,
        else_block: Option<Block>,
        span: Span,
    },
    While {
        condition: Expr,
        body: Block,
        span: Span,
    },
    Break {
        span: Span,
    },
    Continue {
        span: Span,
    },
    Destroy {
        expr: Expr,
        span: Span,
    },
    Expression(Expr),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Variable(declaration) => declaration.span,
            Statement::Assignment { span, .. }
            | Statement::Return { span, .. }
            | Statement::If { span, .. }
            | Statement::While { span, .. }
            | Statement::Break { span }
            | Statement::Continue { span }
            | Statement::Destroy { span, .. } => *span,
            Statement::Expression(expr) => expr.span,
        }
    }
}

// --- Expressions ---

#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Argument {
    pub label: Option<String>,
    pub value: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
    NilCoalesce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

/// `as` performs a static upcast, `as?` a failable downcast, `as!` a forced
/// downcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    Static,
    Failable,
    Forced,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    IntLiteral(BigInt),
    BoolLiteral(bool),
    StringLiteral(String),
    NilLiteral,
    PathLiteral {
        domain: PathDomain,
        identifier: String,
    },
    ArrayLiteral(Vec<Expr>),
    DictionaryLiteral(Vec<(Expr, Expr)>),
    Identifier(String),
    Member {
        target: Box<Expr>,
        name: Identifier,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Invocation {
        invoked: Box<Expr>,
        type_arguments: Vec<TypeAnnotation>,
        arguments: Vec<Argument>,
    },
    /// `create T(...)`: a resource constructor invocation.
    Create(Box<Expr>),
    /// The unary move operator `<-expr` in expression position.
    Move(Box<Expr>),
    /// `&target as <annotation>`
    Reference {
        target: Box<Expr>,
        type_annotation: TypeAnnotation,
    },
    Cast {
        target: Box<Expr>,
        kind: CastKind,
        type_annotation: TypeAnnotation,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
}
