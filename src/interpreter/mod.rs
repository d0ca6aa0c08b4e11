//! The tree-walking interpreter.
//!
//! Executes an elaborated program against account storage. Type
//! information is never recomputed from the AST: every expression's type,
//! member resolution, and call-site type binding is looked up in the
//! elaboration by node identity, and a missing entry aborts with an
//! internal error.

pub mod encoding;
pub mod errors;
pub mod meter;
pub mod storage;
pub mod value;

pub use errors::{InternalError, RuntimeError, UserError, UserErrorKind};
pub use meter::{Meter, MeterLimits};
pub use storage::{
    AccountStorage, InMemorySlabStorage, SlabId, SlabStorage, StorageCell, StorageDomain,
    StorageKey,
};

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use num_bigint::BigInt;
use tracing::debug;

use crate::ast::{
    BinaryOp, Block, CastKind, CompositeKind, Declaration, Expr, ExprKind, Parameter, Statement,
    TransferOp, UnaryOp,
};
use crate::common::{Address, Path};
use crate::diag::Span;
use crate::sema::{Activation, CheckedProgram};
use crate::types::{
    is_subtype, FunctionType, PrimitiveType, StaticType, Type, TypeId,
};
use value::{
    ArrayValue, BuiltinFn, CompositeValue, DictionaryKey, FunctionDef, FunctionValue,
    HostFunction, IdCapabilityValue, IntegerValue, ReferenceValue, Value, FIXED_POINT_SCALE,
    INVALID_CAPABILITY_ID,
};

const MAX_CALL_DEPTH: usize = 256;

/// Everything a host function receives about its call site.
pub struct Invocation {
    pub receiver: Option<Value>,
    pub arguments: Vec<Value>,
    pub type_arguments: Vec<TypeId>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InterpreterConfig {
    pub limits: MeterLimits,
}

#[derive(Debug)]
enum ControlFlow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

struct ConstructorDef {
    parameters: Vec<Parameter>,
    body: Option<Block>,
    qualified_identifier: String,
    kind: CompositeKind,
}

pub struct Interpreter {
    checked: CheckedProgram,
    pub storage: AccountStorage,
    meter: Meter,
    /// The global frame every call scope forks from: host values, contract
    /// instances, and global function values.
    base: Activation<Value>,
    scopes: Activation<Value>,
    global_functions: HashMap<String, Rc<FunctionDef>>,
    composite_functions: HashMap<(String, String), Rc<FunctionDef>>,
    constructors: HashMap<String, Rc<ConstructorDef>>,
    /// Conformance interfaces per composite, by qualified identifier, for
    /// default function dispatch.
    conformance_ids: HashMap<String, Vec<String>>,
    contract_instances: IndexMap<String, Value>,
    call_depth: usize,
}

impl Interpreter {
    pub fn new(
        checked: CheckedProgram,
        storage: AccountStorage,
        config: InterpreterConfig,
    ) -> Result<Self, RuntimeError> {
        let mut interpreter = Self {
            checked,
            storage,
            meter: Meter::new(config.limits),
            base: Activation::new(),
            scopes: Activation::new(),
            global_functions: HashMap::new(),
            composite_functions: HashMap::new(),
            constructors: HashMap::new(),
            conformance_ids: HashMap::new(),
            contract_instances: IndexMap::new(),
            call_depth: 0,
        };
        interpreter.collect_conformances();
        let declarations = interpreter.checked.program.declarations.clone();
        interpreter.collect_declarations(&declarations, "");
        interpreter.initialize_contracts(&declarations)?;
        Ok(interpreter)
    }

    /// Injects a host value into the global scope (e.g. `assert`, `panic`,
    /// or the `Test` contract instance).
    pub fn declare_global(&mut self, name: impl Into<String>, value: Value) {
        self.base.declare(name, value);
    }

    pub fn meter(&self) -> &Meter {
        &self.meter
    }

    pub fn checked(&self) -> &CheckedProgram {
        &self.checked
    }

    fn collect_conformances(&mut self) {
        for id in self.checked.registry.ids().collect::<Vec<_>>() {
            let Some(key) = self.checked.cache.get(id).nominal_key().cloned() else {
                continue;
            };
            let interfaces = self
                .checked
                .registry
                .conformances(id)
                .iter()
                .filter_map(|interface| {
                    self.checked
                        .cache
                        .get(*interface)
                        .nominal_key()
                        .map(|key| key.qualified_identifier.clone())
                })
                .collect();
            self.conformance_ids
                .insert(key.qualified_identifier, interfaces);
        }
    }

    fn collect_declarations(&mut self, declarations: &[Declaration], prefix: &str) {
        for declaration in declarations {
            match declaration {
                Declaration::Function(function) => {
                    if let Some(body) = &function.body {
                        let def = Rc::new(FunctionDef {
                            name: function.identifier.name.clone(),
                            parameters: function.parameters.clone(),
                            body: body.clone(),
                            composite: None,
                        });
                        self.global_functions
                            .insert(function.identifier.name.clone(), def.clone());
                        // Globals are also first-class values.
                        self.base.declare(
                            function.identifier.name.clone(),
                            Value::Function(FunctionValue::Interpreted(def)),
                        );
                    }
                }
                Declaration::Composite(composite) => {
                    let qualified = qualify(prefix, &composite.identifier.name);
                    self.collect_members(&composite.members, &qualified, composite.kind);
                }
                Declaration::Interface(interface) => {
                    let qualified = qualify(prefix, &interface.identifier.name);
                    self.collect_members(&interface.members, &qualified, interface.kind);
                }
                Declaration::Variable(_) | Declaration::Entitlement(_) => {}
            }
        }
    }

    fn collect_members(
        &mut self,
        members: &crate::ast::Members,
        qualified: &str,
        kind: CompositeKind,
    ) {
        for function in &members.functions {
            if let Some(body) = &function.body {
                self.composite_functions.insert(
                    (qualified.to_string(), function.identifier.name.clone()),
                    Rc::new(FunctionDef {
                        name: function.identifier.name.clone(),
                        parameters: function.parameters.clone(),
                        body: body.clone(),
                        composite: Some(qualified.to_string()),
                    }),
                );
            }
        }
        if let Some(initializer) = members.initializers.first() {
            self.constructors.insert(
                qualified.to_string(),
                Rc::new(ConstructorDef {
                    parameters: initializer.parameters.clone(),
                    body: initializer.body.clone(),
                    qualified_identifier: qualified.to_string(),
                    kind,
                }),
            );
        }
        for nested in &members.composites {
            let nested_qualified = qualify(qualified, &nested.identifier.name);
            self.collect_members(&nested.members, &nested_qualified, nested.kind);
        }
        for nested in &members.interfaces {
            let nested_qualified = qualify(qualified, &nested.identifier.name);
            self.collect_members(&nested.members, &nested_qualified, nested.kind);
        }
    }

    /// Creates the singleton value of every top-level contract and runs
    /// its parameterless initializer if it has one.
    fn initialize_contracts(&mut self, declarations: &[Declaration]) -> Result<(), RuntimeError> {
        for declaration in declarations {
            let Declaration::Composite(composite) = declaration else {
                continue;
            };
            if composite.kind != CompositeKind::Contract {
                continue;
            }
            let name = composite.identifier.name.clone();
            let instance = Value::composite(CompositeValue::new(
                self.checked.location.clone(),
                name.clone(),
                CompositeKind::Contract,
            ));
            if let Some(constructor) = self.constructors.get(&name).cloned()
                && constructor.parameters.is_empty()
                && let Some(body) = &constructor.body
            {
                self.with_call_scope(Some(instance.clone()), Vec::new(), &[], |interpreter| {
                    match interpreter.exec_statements(&body.statements)? {
                        ControlFlow::Normal | ControlFlow::Return(_) => Ok(Value::Void),
                        _ => Err(RuntimeError::internal(
                            "loop control escaped an initializer",
                        )),
                    }
                })?;
            }
            self.contract_instances.insert(name.clone(), instance.clone());
            self.base.declare(name, instance);
        }
        Ok(())
    }

    // --- Entry points ---

    /// Runs the value-returning `main` function of a script.
    pub fn run_script(&mut self, arguments: Vec<Value>) -> Result<Value, RuntimeError> {
        debug!("running script");
        let result = self.invoke_global("main", arguments)?;
        self.storage.commit()?;
        Ok(result)
    }

    /// Runs a transaction entry function with the signing accounts'
    /// addresses as arguments. Transactions return nothing.
    pub fn run_transaction(
        &mut self,
        name: &str,
        authorizers: &[Address],
    ) -> Result<(), RuntimeError> {
        debug!(name, "running transaction");
        let arguments = authorizers
            .iter()
            .map(|address| Value::Address(*address))
            .collect();
        self.invoke_global(name, arguments)?;
        self.storage.commit()?;
        Ok(())
    }

    pub fn invoke_global(
        &mut self,
        name: &str,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        if let Some(function) = self.global_functions.get(name).cloned() {
            return self.call_interpreted(&function, None, arguments);
        }
        if let Some(value) = self.base.resolve(name).cloned() {
            if let Value::Function(function) = value {
                return self.call_function(function, arguments, Vec::new(), Span::default());
            }
        }
        Err(RuntimeError::internal(format!(
            "unknown entry point `{name}`",
        )))
    }

    /// Invokes an arbitrary function value (used by matcher combinators
    /// and embedders).
    pub fn call_value(
        &mut self,
        function: FunctionValue,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        self.call_function(function, arguments, Vec::new(), Span::default())
    }

    // --- Elaboration access ---

    fn expr_type(&self, expr: &Expr) -> Result<TypeId, RuntimeError> {
        self.checked.elaboration.expr_type(expr.id).ok_or_else(|| {
            RuntimeError::internal(format!(
                "corrupted elaboration: no type for expression at {}",
                expr.span,
            ))
        })
    }

    fn static_type_of(&self, id: TypeId) -> Result<StaticType, RuntimeError> {
        StaticType::from_semantic(&self.checked.cache, id).ok_or_else(|| {
            RuntimeError::internal("corrupted elaboration: type has no static representation")
        })
    }

    // --- Statements ---

    fn exec_statements(&mut self, statements: &[Statement]) -> Result<ControlFlow, RuntimeError> {
        for statement in statements {
            match self.exec_statement(statement)? {
                ControlFlow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(ControlFlow::Normal)
    }

    fn exec_statement(&mut self, statement: &Statement) -> Result<ControlFlow, RuntimeError> {
        self.meter.tick_statement(statement.span())?;
        match statement {
            Statement::Variable(declaration) => {
                let value =
                    self.eval_transfer(&declaration.value, declaration.transfer)?;
                self.scopes.declare(declaration.identifier.name.clone(), value);
                Ok(ControlFlow::Normal)
            }
            Statement::Assignment {
                target,
                transfer,
                value,
                span,
            } => {
                let new = self.eval_transfer(value, *transfer)?;
                self.assign(target, new, *span)?;
                Ok(ControlFlow::Normal)
            }
            Statement::Return { value, .. } => {
                let result = match value {
                    Some(value) => self.eval_expr(value)?,
                    None => Value::Void,
                };
                Ok(ControlFlow::Return(result))
            }
            Statement::If {
                condition,
                then_block,
                else_block,
                ..
            } => {
                if self.eval_bool(condition)? {
                    self.exec_block(then_block)
                } else if let Some(else_block) = else_block {
                    self.exec_block(else_block)
                } else {
                    Ok(ControlFlow::Normal)
                }
            }
            Statement::While {
                condition, body, ..
            } => {
                loop {
                    // Poll once per iteration, not once per statement.
                    self.meter.tick_statement(condition.span)?;
                    if !self.eval_bool(condition)? {
                        break;
                    }
                    match self.exec_block(body)? {
                        ControlFlow::Normal | ControlFlow::Continue => {}
                        ControlFlow::Break => break,
                        flow @ ControlFlow::Return(_) => return Ok(flow),
                    }
                }
                Ok(ControlFlow::Normal)
            }
            Statement::Break { .. } => Ok(ControlFlow::Break),
            Statement::Continue { .. } => Ok(ControlFlow::Continue),
            Statement::Destroy { expr, .. } => {
                let value = self.eval_move_source(expr)?;
                self.destroy_value(value, expr.span)?;
                Ok(ControlFlow::Normal)
            }
            Statement::Expression(expr) => {
                self.eval_expr(expr)?;
                Ok(ControlFlow::Normal)
            }
        }
    }

    fn exec_block(&mut self, block: &Block) -> Result<ControlFlow, RuntimeError> {
        self.scopes.enter();
        let result = self.exec_statements(&block.statements);
        self.scopes.leave();
        result
    }

    /// Destroys a resource: runs its `destroy` member if declared, then
    /// annihilates the value and its children.
    fn destroy_value(&mut self, value: Value, span: Span) -> Result<(), RuntimeError> {
        if let Value::Composite(composite) = &value {
            let qualified = composite.borrow().qualified_identifier.clone();
            if let Some(destructor) = self
                .composite_functions
                .get(&(qualified, "destroy".to_string()))
                .cloned()
            {
                self.call_interpreted(&destructor, Some(value.clone()), Vec::new())?;
            }
            let fields: Vec<Value> = composite.borrow().fields.values().cloned().collect();
            for field in fields {
                if field.is_resource_kinded() {
                    self.destroy_value(field, span)?;
                }
            }
        }
        Ok(())
    }

    fn assign(&mut self, target: &Expr, new: Value, span: Span) -> Result<(), RuntimeError> {
        match &target.kind {
            ExprKind::Identifier(name) => {
                let slot = self.scopes.resolve_mut(name).ok_or_else(|| {
                    RuntimeError::internal(format!("unresolved variable `{name}`"))
                })?;
                let old = std::mem::replace(slot, new);
                if old.is_resource_kinded() {
                    // The checker rejects overwriting a live resource;
                    // seeing one here means the elaboration lied.
                    return Err(RuntimeError::internal(
                        "resource overwritten in assignment",
                    ));
                }
                Ok(())
            }
            ExprKind::Member {
                target: member_target,
                name,
            } => {
                let container = self.eval_expr(member_target)?;
                self.set_member(&container, &name.name, new, span)
            }
            ExprKind::Index { target, index } => {
                let container = self.eval_expr(target)?;
                let index_value = self.eval_expr(index)?;
                match &container {
                    Value::Array(array) => {
                        let index = self.array_index(array, &index_value, span)?;
                        let old = std::mem::replace(
                            &mut array.borrow_mut().values[index],
                            new,
                        );
                        if old.is_resource_kinded() {
                            return Err(UserErrorKind::ResourceLoss.at(span));
                        }
                        Ok(())
                    }
                    Value::Dictionary(dictionary) => {
                        let key = DictionaryKey::from_value(&index_value).ok_or_else(|| {
                            RuntimeError::internal("unhashable dictionary key")
                        })?;
                        let old = dictionary.borrow_mut().entries.insert(key, new);
                        if old.map(|old| old.is_resource_kinded()).unwrap_or(false) {
                            return Err(UserErrorKind::ResourceLoss.at(span));
                        }
                        Ok(())
                    }
                    _ => Err(RuntimeError::internal("indexed assignment on non-container")),
                }
            }
            _ => Err(RuntimeError::internal("invalid assignment target")),
        }
    }

    /// Re-checks resource loss at the point of member assignment: the
    /// previous value must be absent, nil, or already moved out.
    fn set_member(
        &mut self,
        container: &Value,
        name: &str,
        new: Value,
        span: Span,
    ) -> Result<(), RuntimeError> {
        match container {
            Value::Composite(composite) => {
                let old = composite.borrow_mut().fields.insert(name.to_string(), new);
                match old {
                    Some(old)
                        if old.is_resource_kinded()
                            && !matches!(old, Value::Optional(None)) =>
                    {
                        Err(UserErrorKind::ResourceLoss.at(span))
                    }
                    _ => Ok(()),
                }
            }
            Value::Reference(reference) => {
                self.set_member(&reference.target, name, new, span)
            }
            _ => Err(RuntimeError::internal("member assignment on non-composite")),
        }
    }

    // --- Transfers (§ value motion) ---

    /// Uniform cross-binding motion: moves take the source slot, copies
    /// deep-copy containers so the destination mutates independently.
    fn eval_transfer(&mut self, expr: &Expr, transfer: TransferOp) -> Result<Value, RuntimeError> {
        match transfer {
            TransferOp::Move => self.eval_move_source(expr),
            TransferOp::Copy => {
                let value = self.eval_expr(expr)?;
                Ok(copy_for_transfer(value))
            }
        }
    }

    /// Takes the value out of its source slot, leaving a tombstone.
    fn eval_move_source(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match &expr.kind {
            ExprKind::Identifier(name) => {
                let slot = self.scopes.resolve_mut(name).ok_or_else(|| {
                    RuntimeError::internal(format!("unresolved variable `{name}`"))
                })?;
                let value = std::mem::replace(slot, Value::Moved);
                if matches!(value, Value::Moved) {
                    return Err(RuntimeError::internal(format!(
                        "corrupted elaboration: move from invalidated binding `{name}`",
                    )));
                }
                Ok(value)
            }
            ExprKind::Member { target, name } => {
                let container = self.eval_expr(target)?;
                match &container {
                    Value::Composite(composite) => {
                        let old = composite
                            .borrow_mut()
                            .fields
                            .insert(name.name.clone(), Value::Moved);
                        match old {
                            Some(Value::Moved) | None => Err(RuntimeError::internal(format!(
                                "corrupted elaboration: move from vacated field `{}`",
                                name.name,
                            ))),
                            Some(value) => Ok(value),
                        }
                    }
                    _ => Err(RuntimeError::internal("field move on non-composite")),
                }
            }
            ExprKind::Index { target, index } => {
                let container = self.eval_expr(target)?;
                let index_value = self.eval_expr(index)?;
                match &container {
                    Value::Dictionary(dictionary) => {
                        let key = DictionaryKey::from_value(&index_value).ok_or_else(|| {
                            RuntimeError::internal("unhashable dictionary key")
                        })?;
                        let removed = dictionary.borrow_mut().entries.shift_remove(&key);
                        Ok(match removed {
                            Some(value) => Value::some(value),
                            None => Value::nil(),
                        })
                    }
                    _ => Err(RuntimeError::internal("indexed move on non-dictionary")),
                }
            }
            ExprKind::Move(inner) => self.eval_move_source(inner),
            // Temporaries (create, calls) own their value already.
            _ => self.eval_expr(expr),
        }
    }

    // --- Expressions ---

    fn eval_bool(&mut self, expr: &Expr) -> Result<bool, RuntimeError> {
        match self.eval_expr(expr)? {
            Value::Bool(value) => Ok(value),
            _ => Err(RuntimeError::internal("condition is not a boolean")),
        }
    }

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match &expr.kind {
            ExprKind::IntLiteral(literal) => {
                self.meter.use_memory(8, expr.span)?;
                let kind = match self.checked.cache.get(self.expr_type(expr)?) {
                    Type::Primitive(kind) if kind.is_number() => *kind,
                    _ => PrimitiveType::Int,
                };
                let value = if matches!(kind, PrimitiveType::Fix64 | PrimitiveType::UFix64) {
                    literal * BigInt::from(10u64.pow(FIXED_POINT_SCALE))
                } else {
                    literal.clone()
                };
                Ok(Value::Integer(IntegerValue::new(kind, value)))
            }
            ExprKind::BoolLiteral(value) => Ok(Value::Bool(*value)),
            ExprKind::StringLiteral(value) => {
                self.meter.use_memory(value.len() as u64, expr.span)?;
                Ok(Value::string(value.clone()))
            }
            ExprKind::NilLiteral => Ok(Value::nil()),
            ExprKind::PathLiteral { domain, identifier } => {
                Ok(Value::Path(Path::new(*domain, identifier.clone())))
            }
            ExprKind::ArrayLiteral(elements) => {
                self.meter
                    .use_memory(8 + 8 * elements.len() as u64, expr.span)?;
                let ty = self.static_type_of(self.expr_type(expr)?)?;
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval_element(element)?);
                }
                Ok(Value::Array(Rc::new(std::cell::RefCell::new(ArrayValue {
                    ty,
                    values,
                }))))
            }
            ExprKind::DictionaryLiteral(entries) => {
                self.meter
                    .use_memory(8 + 16 * entries.len() as u64, expr.span)?;
                let ty = self.static_type_of(self.expr_type(expr)?)?;
                let mut map = IndexMap::with_capacity(entries.len());
                for (key_expr, value_expr) in entries {
                    let key_value = self.eval_expr(key_expr)?;
                    let key = DictionaryKey::from_value(&key_value)
                        .ok_or_else(|| RuntimeError::internal("unhashable dictionary key"))?;
                    let value = self.eval_element(value_expr)?;
                    map.insert(key, value);
                }
                Ok(Value::dictionary(ty, map))
            }
            ExprKind::Identifier(name) => self.eval_identifier(name, expr),
            ExprKind::Member { target, name } => {
                let value = self.eval_expr(target)?;
                self.get_member(&value, &name.name, expr.span)
            }
            ExprKind::Index { target, index } => {
                let container = self.eval_expr(target)?;
                let index_value = self.eval_expr(index)?;
                match &container {
                    Value::Array(array) => {
                        let index = self.array_index(array, &index_value, expr.span)?;
                        Ok(array.borrow().values[index].clone())
                    }
                    Value::Dictionary(dictionary) => {
                        let key = DictionaryKey::from_value(&index_value).ok_or_else(|| {
                            RuntimeError::internal("unhashable dictionary key")
                        })?;
                        Ok(match dictionary.borrow().entries.get(&key) {
                            Some(value) => Value::some(value.clone()),
                            None => Value::nil(),
                        })
                    }
                    _ => Err(RuntimeError::internal("index on non-container")),
                }
            }
            ExprKind::Invocation {
                invoked, arguments, ..
            } => {
                let function = match self.eval_expr(invoked)? {
                    Value::Function(function) => function,
                    _ => return Err(RuntimeError::internal("invoked value is not a function")),
                };
                let mut argument_values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    argument_values.push(self.eval_element(&argument.value)?);
                }
                let type_arguments = self
                    .checked
                    .elaboration
                    .call_type_bindings(expr.id)
                    .map(|bindings| bindings.to_vec())
                    .unwrap_or_default();
                self.call_function(function, argument_values, type_arguments, expr.span)
            }
            ExprKind::Create(inner) => self.eval_expr(inner),
            ExprKind::Move(inner) => self.eval_move_source(inner),
            ExprKind::Reference { target, .. } => {
                let authorization = match self.checked.cache.get(self.expr_type(expr)?) {
                    Type::Reference { authorization, .. } => authorization.clone(),
                    _ => {
                        return Err(RuntimeError::internal(
                            "corrupted elaboration: reference expression without reference type",
                        ))
                    }
                };
                let value = self.eval_expr(target)?;
                Ok(Value::Reference(ReferenceValue {
                    authorization,
                    target: Box::new(value),
                }))
            }
            ExprKind::Cast { target, kind, .. } => {
                let value = self.eval_expr(target)?;
                let (cast_kind, cast_ty) =
                    self.checked.elaboration.cast_type(expr.id).ok_or_else(|| {
                        RuntimeError::internal("corrupted elaboration: cast without target type")
                    })?;
                debug_assert_eq!(cast_kind, *kind);
                match kind {
                    CastKind::Static => Ok(value),
                    CastKind::Failable => Ok(if self.value_satisfies(&value, cast_ty)? {
                        Value::some(value)
                    } else {
                        Value::nil()
                    }),
                    CastKind::Forced => {
                        if self.value_satisfies(&value, cast_ty)? {
                            Ok(value)
                        } else {
                            let actual = value
                                .static_type()
                                .map(|ty| ty.id())
                                .unwrap_or_else(|| "unknown".to_string());
                            Err(UserErrorKind::ForcedCastFailure {
                                expected: crate::types::type_string(
                                    &self.checked.cache,
                                    cast_ty,
                                ),
                                actual,
                            }
                            .at(expr.span))
                        }
                    }
                }
            }
            ExprKind::Binary { op, left, right } => self.eval_binary(*op, left, right, expr.span),
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Not => Ok(Value::Bool(!self.eval_bool(operand)?)),
                UnaryOp::Negate => {
                    let value = self.eval_expr(operand)?;
                    let Value::Integer(integer) = value else {
                        return Err(RuntimeError::internal("negation of non-number"));
                    };
                    integer
                        .checked_neg()
                        .map(Value::Integer)
                        .ok_or_else(|| {
                            UserErrorKind::Overflow {
                                ty: integer.kind.name().to_string(),
                            }
                            .at(expr.span)
                        })
                }
            },
        }
    }

    /// Array literal elements, dictionary values, and call arguments move
    /// resources explicitly and copy everything else.
    fn eval_element(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        if matches!(expr.kind, ExprKind::Move(_)) {
            self.eval_move_source(expr)
        } else {
            Ok(copy_for_transfer(self.eval_expr(expr)?))
        }
    }

    fn eval_identifier(&mut self, name: &str, expr: &Expr) -> Result<Value, RuntimeError> {
        if let Some(value) = self.scopes.resolve(name) {
            if matches!(value, Value::Moved) {
                return Err(RuntimeError::internal(format!(
                    "corrupted elaboration: use of invalidated binding `{name}`",
                )));
            }
            return Ok(value.clone());
        }

        // A type name in expression position: a constructor or a contract
        // instance, per the elaborated expression type.
        let ty = self.expr_type(expr)?;
        match self.checked.cache.get(ty) {
            Type::Function(FunctionType {
                is_constructor: true,
                return_type,
                ..
            }) => {
                let qualified = self
                    .checked
                    .cache
                    .get(*return_type)
                    .nominal_key()
                    .map(|key| key.qualified_identifier.clone())
                    .ok_or_else(|| {
                        RuntimeError::internal("constructor of non-nominal type")
                    })?;
                Ok(Value::Function(FunctionValue::Constructor(qualified)))
            }
            Type::Composite(key) if key.kind == CompositeKind::Contract => self
                .contract_instances
                .get(&key.qualified_identifier)
                .cloned()
                .ok_or_else(|| {
                    RuntimeError::internal(format!(
                        "missing contract instance `{}`",
                        key.qualified_identifier,
                    ))
                }),
            _ => Err(RuntimeError::internal(format!(
                "unresolved identifier `{name}`",
            ))),
        }
    }

    fn array_index(
        &self,
        array: &Rc<std::cell::RefCell<ArrayValue>>,
        index: &Value,
        span: Span,
    ) -> Result<usize, RuntimeError> {
        let Value::Integer(integer) = index else {
            return Err(RuntimeError::internal("non-integer array index"));
        };
        let length = array.borrow().values.len();
        match integer.to_usize() {
            Some(index) if index < length => Ok(index),
            _ => Err(UserErrorKind::IndexOutOfBounds {
                index: integer.value.to_string(),
                length,
            }
            .at(span)),
        }
    }

    fn eval_binary(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        match op {
            BinaryOp::And => {
                return Ok(Value::Bool(
                    self.eval_bool(left)? && self.eval_bool(right)?,
                ));
            }
            BinaryOp::Or => {
                return Ok(Value::Bool(
                    self.eval_bool(left)? || self.eval_bool(right)?,
                ));
            }
            BinaryOp::NilCoalesce => {
                let value = self.eval_expr(left)?;
                return match value {
                    Value::Optional(Some(inner)) => Ok(*inner),
                    Value::Optional(None) => self.eval_expr(right),
                    _ => Err(RuntimeError::internal("nil-coalescing on non-optional")),
                };
            }
            _ => {}
        }

        let left_value = self.eval_expr(left)?;
        let right_value = self.eval_expr(right)?;

        match op {
            BinaryOp::Equal => Ok(Value::Bool(left_value.equal(&right_value))),
            BinaryOp::NotEqual => Ok(Value::Bool(!left_value.equal(&right_value))),
            BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Mod
            | BinaryOp::Less
            | BinaryOp::LessEqual
            | BinaryOp::Greater
            | BinaryOp::GreaterEqual => {
                let (Value::Integer(left), Value::Integer(right)) = (&left_value, &right_value)
                else {
                    return Err(RuntimeError::internal("arithmetic on non-numbers"));
                };
                self.eval_arithmetic(op, left, right, span)
            }
            BinaryOp::And | BinaryOp::Or | BinaryOp::NilCoalesce => unreachable!(),
        }
    }

    fn eval_arithmetic(
        &self,
        op: BinaryOp,
        left: &IntegerValue,
        right: &IntegerValue,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        let overflow = || {
            UserErrorKind::Overflow {
                ty: left.kind.name().to_string(),
            }
            .at(span)
        };
        Ok(match op {
            BinaryOp::Add => Value::Integer(left.checked_add(right).ok_or_else(overflow)?),
            BinaryOp::Sub => Value::Integer(left.checked_sub(right).ok_or_else(overflow)?),
            BinaryOp::Mul => Value::Integer(left.checked_mul(right).ok_or_else(overflow)?),
            BinaryOp::Div => match left.checked_div(right) {
                None => return Err(UserErrorKind::DivisionByZero.at(span)),
                Some(quotient) => Value::Integer(quotient.ok_or_else(overflow)?),
            },
            BinaryOp::Mod => match left.checked_rem(right) {
                None => return Err(UserErrorKind::DivisionByZero.at(span)),
                Some(remainder) => Value::Integer(remainder.ok_or_else(overflow)?),
            },
            BinaryOp::Less => Value::Bool(left.value < right.value),
            BinaryOp::LessEqual => Value::Bool(left.value <= right.value),
            BinaryOp::Greater => Value::Bool(left.value > right.value),
            BinaryOp::GreaterEqual => Value::Bool(left.value >= right.value),
            _ => unreachable!(),
        })
    }

    /// Dynamic type test for failable and forced casts.
    fn value_satisfies(&mut self, value: &Value, target: TypeId) -> Result<bool, RuntimeError> {
        let Some(static_type) = value.static_type() else {
            return Ok(false);
        };
        let actual = static_type.to_semantic(&mut self.checked.cache);
        Ok(is_subtype(
            &self.checked.cache,
            &self.checked.registry,
            actual,
            target,
        ))
    }

    // --- Member dispatch ---

    /// The closed member dispatch switch: composites consult the injected
    /// function table, then interpreted members (including interface
    /// defaults), then fields; built-in kinds dispatch per kind.
    pub fn get_member(
        &mut self,
        value: &Value,
        name: &str,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        match value {
            Value::Composite(composite) => {
                if let Some(function) = composite.borrow().functions.get(name) {
                    return Ok(Value::Function(FunctionValue::Bound {
                        receiver: Box::new(value.clone()),
                        function: Box::new(function.clone()),
                    }));
                }
                let qualified = composite.borrow().qualified_identifier.clone();
                if let Some(function) = self.lookup_member_function(&qualified, name) {
                    return Ok(Value::Function(FunctionValue::Bound {
                        receiver: Box::new(value.clone()),
                        function: Box::new(FunctionValue::Interpreted(function)),
                    }));
                }
                let field = composite.borrow().fields.get(name).cloned();
                match field {
                    Some(Value::Moved) => Err(RuntimeError::internal(format!(
                        "corrupted elaboration: read of vacated field `{name}`",
                    ))),
                    Some(field) => Ok(field),
                    None => Err(RuntimeError::internal(format!(
                        "missing member `{name}` on `{qualified}` at {span}",
                    ))),
                }
            }
            Value::Array(array) => match name {
                "length" => Ok(Value::Integer(IntegerValue::int(
                    array.borrow().values.len() as i64,
                ))),
                "append" => Ok(builtin(BuiltinFn::ArrayAppend, value)),
                "contains" => Ok(builtin(BuiltinFn::ArrayContains, value)),
                "remove" => Ok(builtin(BuiltinFn::ArrayRemove, value)),
                _ => Err(RuntimeError::internal(format!(
                    "missing array member `{name}`",
                ))),
            },
            Value::Dictionary(dictionary) => match name {
                "length" => Ok(Value::Integer(IntegerValue::int(
                    dictionary.borrow().entries.len() as i64,
                ))),
                "keys" => {
                    let dictionary = dictionary.borrow();
                    let StaticType::Dictionary { key, .. } = &dictionary.ty else {
                        return Err(RuntimeError::internal("dictionary with non-dictionary type"));
                    };
                    Ok(Value::array(
                        StaticType::VariableSizedArray(key.clone()),
                        dictionary
                            .entries
                            .keys()
                            .map(DictionaryKey::to_value)
                            .collect(),
                    ))
                }
                "values" => {
                    let dictionary = dictionary.borrow();
                    let StaticType::Dictionary { value: value_ty, .. } = &dictionary.ty else {
                        return Err(RuntimeError::internal("dictionary with non-dictionary type"));
                    };
                    Ok(Value::array(
                        StaticType::VariableSizedArray(value_ty.clone()),
                        dictionary.entries.values().cloned().collect(),
                    ))
                }
                "insert" => Ok(builtin(BuiltinFn::DictionaryInsert, value)),
                "remove" => Ok(builtin(BuiltinFn::DictionaryRemove, value)),
                _ => Err(RuntimeError::internal(format!(
                    "missing dictionary member `{name}`",
                ))),
            },
            Value::String(string) => match name {
                "length" => Ok(Value::Integer(IntegerValue::int(
                    string.borrow().chars().count() as i64,
                ))),
                "concat" => Ok(builtin(BuiltinFn::StringConcat, value)),
                _ => Err(RuntimeError::internal(format!(
                    "missing string member `{name}`",
                ))),
            },
            Value::IdCapability(capability) => match name {
                "address" => Ok(Value::Address(capability.address)),
                "id" => Ok(Value::Integer(IntegerValue::uint64(capability.id))),
                "borrow" => Ok(builtin(BuiltinFn::CapabilityBorrow, value)),
                "check" => Ok(builtin(BuiltinFn::CapabilityCheck, value)),
                _ => Err(RuntimeError::internal(format!(
                    "missing capability member `{name}`",
                ))),
            },
            Value::PathCapability(capability) => match name {
                "address" => Ok(Value::Address(capability.address)),
                "id" => Ok(Value::Integer(IntegerValue::uint64(INVALID_CAPABILITY_ID))),
                "borrow" => Ok(builtin(BuiltinFn::CapabilityBorrow, value)),
                "check" => Ok(builtin(BuiltinFn::CapabilityCheck, value)),
                _ => Err(RuntimeError::internal(format!(
                    "missing capability member `{name}`",
                ))),
            },
            Value::Reference(reference) => self.get_member(&reference.target, name, span),
            _ => Err(RuntimeError::internal(format!(
                "member access `{name}` on unsupported value",
            ))),
        }
    }

    /// An interpreted member function, falling back to interface defaults
    /// in conformance order.
    fn lookup_member_function(&self, qualified: &str, name: &str) -> Option<Rc<FunctionDef>> {
        if let Some(function) = self
            .composite_functions
            .get(&(qualified.to_string(), name.to_string()))
        {
            return Some(function.clone());
        }
        for interface in self.conformance_ids.get(qualified)? {
            if let Some(function) = self
                .composite_functions
                .get(&(interface.clone(), name.to_string()))
            {
                return Some(function.clone());
            }
        }
        None
    }

    // --- Calls ---

    fn call_function(
        &mut self,
        function: FunctionValue,
        arguments: Vec<Value>,
        type_arguments: Vec<TypeId>,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(UserErrorKind::LimitExceeded { kind: "call stack" }.at(span));
        }
        match function {
            FunctionValue::Interpreted(def) => self.call_interpreted(&def, None, arguments),
            FunctionValue::Bound { receiver, function } => match *function {
                FunctionValue::Interpreted(def) => {
                    self.call_interpreted(&def, Some(*receiver), arguments)
                }
                FunctionValue::Host(host) => {
                    let invocation = Invocation {
                        receiver: Some(*receiver),
                        arguments,
                        type_arguments,
                        span,
                    };
                    (host.implementation)(self, invocation)
                }
                function => self.call_function(function, arguments, type_arguments, span),
            },
            FunctionValue::Constructor(qualified) => {
                self.call_constructor(&qualified, arguments, span)
            }
            FunctionValue::Host(host) => {
                let invocation = Invocation {
                    receiver: None,
                    arguments,
                    type_arguments,
                    span,
                };
                (host.implementation)(self, invocation)
            }
            FunctionValue::Builtin { kind, receiver } => {
                self.call_builtin(kind, *receiver, arguments, type_arguments, span)
            }
        }
    }

    fn call_interpreted(
        &mut self,
        def: &Rc<FunctionDef>,
        receiver: Option<Value>,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let parameters = def.parameters.clone();
        let body = def.body.clone();
        self.with_call_scope(receiver, arguments, &parameters, |interpreter| {
            match interpreter.exec_statements(&body.statements)? {
                ControlFlow::Return(value) => Ok(value),
                ControlFlow::Normal => Ok(Value::Void),
                _ => Err(RuntimeError::internal("loop control escaped a function")),
            }
        })
    }

    fn call_constructor(
        &mut self,
        qualified: &str,
        arguments: Vec<Value>,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        self.meter.use_memory(32, span)?;
        let Some(constructor) = self.constructors.get(qualified).cloned() else {
            // No declared initializer: an empty instance.
            let kind = self
                .checked
                .registry
                .ids()
                .find_map(|id| {
                    let key = self.checked.cache.get(id).nominal_key()?;
                    (key.qualified_identifier == qualified).then_some(key.kind)
                })
                .ok_or_else(|| {
                    RuntimeError::internal(format!("missing constructor for `{qualified}`"))
                })?;
            return Ok(Value::composite(CompositeValue::new(
                self.checked.location.clone(),
                qualified,
                kind,
            )));
        };
        let instance = Value::composite(CompositeValue::new(
            self.checked.location.clone(),
            constructor.qualified_identifier.clone(),
            constructor.kind,
        ));
        match &constructor.body {
            Some(body) => {
                let body = body.clone();
                let parameters = constructor.parameters.clone();
                self.with_call_scope(
                    Some(instance.clone()),
                    arguments,
                    &parameters,
                    |interpreter| match interpreter.exec_statements(&body.statements)? {
                        ControlFlow::Normal | ControlFlow::Return(_) => Ok(Value::Void),
                        _ => Err(RuntimeError::internal(
                            "loop control escaped an initializer",
                        )),
                    },
                )?;
            }
            None => {
                // Native constructor: parameters map to fields by name.
                if let Value::Composite(composite) = &instance {
                    for (parameter, argument) in
                        constructor.parameters.iter().zip(arguments)
                    {
                        composite
                            .borrow_mut()
                            .fields
                            .insert(parameter.identifier.name.clone(), argument);
                    }
                }
            }
        }
        Ok(instance)
    }

    /// Runs `body` inside a fresh call frame holding `self` and the
    /// parameter bindings. The frame is released on every exit path.
    fn with_call_scope(
        &mut self,
        receiver: Option<Value>,
        arguments: Vec<Value>,
        parameters: &[Parameter],
        body: impl FnOnce(&mut Self) -> Result<Value, RuntimeError>,
    ) -> Result<Value, RuntimeError> {
        let mut scope = self.base.fork();
        scope.enter();
        if let Some(receiver) = receiver {
            scope.declare("self", receiver);
        }
        for (parameter, argument) in parameters.iter().zip(arguments) {
            scope.declare(parameter.identifier.name.clone(), argument);
        }

        let saved = std::mem::replace(&mut self.scopes, scope);
        self.call_depth += 1;
        let result = body(self);
        self.call_depth -= 1;
        self.scopes = saved;
        result
    }

    fn call_builtin(
        &mut self,
        kind: BuiltinFn,
        receiver: Value,
        mut arguments: Vec<Value>,
        type_arguments: Vec<TypeId>,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        match (kind, &receiver) {
            (BuiltinFn::ArrayAppend, Value::Array(array)) => {
                let value = take_argument(&mut arguments, span)?;
                array.borrow_mut().values.push(value);
                Ok(Value::Void)
            }
            (BuiltinFn::ArrayContains, Value::Array(array)) => {
                let value = take_argument(&mut arguments, span)?;
                Ok(Value::Bool(
                    array.borrow().values.iter().any(|item| item.equal(&value)),
                ))
            }
            (BuiltinFn::ArrayRemove, Value::Array(array)) => {
                let index_value = take_argument(&mut arguments, span)?;
                let index = self.array_index(array, &index_value, span)?;
                Ok(array.borrow_mut().values.remove(index))
            }
            (BuiltinFn::DictionaryInsert, Value::Dictionary(dictionary)) => {
                let key_value = take_argument(&mut arguments, span)?;
                let value = take_argument(&mut arguments, span)?;
                let key = DictionaryKey::from_value(&key_value)
                    .ok_or_else(|| RuntimeError::internal("unhashable dictionary key"))?;
                Ok(match dictionary.borrow_mut().entries.insert(key, value) {
                    Some(old) => Value::some(old),
                    None => Value::nil(),
                })
            }
            (BuiltinFn::DictionaryRemove, Value::Dictionary(dictionary)) => {
                let key_value = take_argument(&mut arguments, span)?;
                let key = DictionaryKey::from_value(&key_value)
                    .ok_or_else(|| RuntimeError::internal("unhashable dictionary key"))?;
                Ok(match dictionary.borrow_mut().entries.shift_remove(&key) {
                    Some(old) => Value::some(old),
                    None => Value::nil(),
                })
            }
            (BuiltinFn::StringConcat, Value::String(string)) => {
                let other = take_argument(&mut arguments, span)?;
                let Value::String(other) = other else {
                    return Err(RuntimeError::internal("concat of non-string"));
                };
                let mut result = string.borrow().clone();
                result.push_str(&other.borrow());
                Ok(Value::string(result))
            }
            (BuiltinFn::CapabilityBorrow, Value::IdCapability(capability)) => {
                self.borrow_id_capability(capability, &type_arguments)
            }
            (BuiltinFn::CapabilityCheck, Value::IdCapability(capability)) => {
                let borrowed = self.borrow_id_capability(capability, &type_arguments)?;
                Ok(Value::Bool(!matches!(borrowed, Value::Optional(None))))
            }
            // Path capabilities never authorize anything anymore.
            (BuiltinFn::CapabilityBorrow, Value::PathCapability(_)) => Ok(Value::nil()),
            (BuiltinFn::CapabilityCheck, Value::PathCapability(_)) => Ok(Value::Bool(false)),
            _ => Err(RuntimeError::internal("builtin receiver mismatch")),
        }
    }

    // --- Capabilities over storage ---

    /// `capability.borrow<&T>()`: controller lookup, revocation check,
    /// borrow-type covariance check, then a reference to the stored
    /// target bearing the authorization of `T`. `nil` on any failure.
    fn borrow_id_capability(
        &mut self,
        capability: &IdCapabilityValue,
        type_arguments: &[TypeId],
    ) -> Result<Value, RuntimeError> {
        let wanted = match type_arguments.first() {
            Some(ty) => *ty,
            None => capability
                .borrow_type
                .to_semantic(&mut self.checked.cache),
        };
        let Type::Reference {
            authorization,
            referenced,
        } = self.checked.cache.get(wanted).clone()
        else {
            return Err(RuntimeError::internal(
                "capability borrow with non-reference type",
            ));
        };

        let Some(controller) = self.storage.controller(capability.address, capability.id)? else {
            return Ok(Value::nil());
        };
        if controller.revoked {
            return Ok(Value::nil());
        }

        let controller_type = controller.borrow_type.to_semantic(&mut self.checked.cache);
        if !is_subtype(
            &self.checked.cache,
            &self.checked.registry,
            controller_type,
            wanted,
        ) {
            return Ok(Value::nil());
        }

        let key = StorageKey::new(capability.address, controller.target.domain.into());
        let Some(target) = self.storage.read(key, &controller.target.identifier)? else {
            return Ok(Value::nil());
        };
        if let Some(actual) = target.static_type() {
            let actual = actual.to_semantic(&mut self.checked.cache);
            if !is_subtype(
                &self.checked.cache,
                &self.checked.registry,
                actual,
                referenced,
            ) {
                return Ok(Value::nil());
            }
        }

        Ok(Value::some(Value::Reference(ReferenceValue {
            authorization,
            target: Box::new(target),
        })))
    }

    // --- Storage operations (lifecycle: store / load) ---

    /// Stores a value under an account path, transferring ownership to the
    /// account. The slot must be vacant.
    pub fn storage_save(
        &mut self,
        address: Address,
        path: &Path,
        value: Value,
        span: Span,
    ) -> Result<(), RuntimeError> {
        if !value.is_storable() {
            let actual = value
                .static_type()
                .map(|ty| ty.id())
                .unwrap_or_else(|| "function".to_string());
            return Err(UserErrorKind::NotStorable { actual }.at(span));
        }
        let key = StorageKey::new(address, path.domain.into());
        if self.storage.contains(key, &path.identifier) {
            return Err(UserErrorKind::StorageSlotOccupied {
                path: path.to_string(),
            }
            .at(span));
        }
        let value = self.transfer(value, Some(address), true)?;
        self.storage.write(key, &path.identifier, value)
    }

    /// Loads (removes) a value from an account path, returning ownership
    /// to the caller.
    pub fn storage_load(
        &mut self,
        address: Address,
        path: &Path,
    ) -> Result<Option<Value>, RuntimeError> {
        let key = StorageKey::new(address, path.domain.into());
        self.storage.remove(key, &path.identifier)
    }

    /// Reads a copy of a stored value without removing it.
    pub fn storage_copy(
        &mut self,
        address: Address,
        path: &Path,
    ) -> Result<Option<Value>, RuntimeError> {
        let key = StorageKey::new(address, path.domain.into());
        Ok(self
            .storage
            .read(key, &path.identifier)?
            .map(|value| value.clone_value()))
    }

    /// Issues a capability controller for a storage path and returns the
    /// id capability value for it.
    pub fn issue_capability(
        &mut self,
        address: Address,
        target: Path,
        borrow_type: StaticType,
    ) -> Result<Value, RuntimeError> {
        let id = self
            .storage
            .issue_controller(address, target, borrow_type.clone())?;
        Ok(Value::IdCapability(IdCapabilityValue {
            address,
            id,
            borrow_type,
        }))
    }

    /// The uniform transfer operation (see the transfer protocol): copies
    /// non-resources, relocates resources, never touches controller state
    /// for capabilities.
    pub fn transfer(
        &mut self,
        value: Value,
        destination: Option<Address>,
        remove: bool,
    ) -> Result<Value, RuntimeError> {
        if value.is_resource_kinded() {
            if !remove {
                return Err(RuntimeError::internal(
                    "resource transfer without removal from the source",
                ));
            }
            if let Some(destination) = destination
                && value.needs_store_to(destination)
            {
                value.set_owner(Some(destination));
            }
            Ok(value)
        } else {
            Ok(copy_for_transfer(value))
        }
    }
}

fn qualify(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn builtin(kind: BuiltinFn, receiver: &Value) -> Value {
    Value::Function(FunctionValue::Builtin {
        kind,
        receiver: Box::new(receiver.clone()),
    })
}

fn take_argument(arguments: &mut Vec<Value>, span: Span) -> Result<Value, RuntimeError> {
    if arguments.is_empty() {
        return Err(RuntimeError::internal(format!(
            "missing builtin argument at {span}",
        )));
    }
    Ok(arguments.remove(0))
}

/// Copies give each binding independent mutation; sharing survives only
/// through references.
fn copy_for_transfer(value: Value) -> Value {
    match &value {
        Value::Array(_) | Value::Dictionary(_) | Value::Composite(_) => {
            if value.is_resource_kinded() {
                value
            } else {
                value.clone_value()
            }
        }
        _ => value,
    }
}

/// Convenience constructor for host functions.
pub fn host_function(
    name: impl Into<String>,
    implementation: impl Fn(&mut Interpreter, Invocation) -> Result<Value, RuntimeError> + 'static,
) -> FunctionValue {
    FunctionValue::Host(HostFunction {
        name: name.into(),
        implementation: Rc::new(implementation),
    })
}

#[cfg(test)]
#[path = "../tests/interpreter/t_interpreter.rs"]
mod interpreter_tests;

#[cfg(test)]
#[path = "../tests/interpreter/t_encoding.rs"]
mod encoding_tests;

#[cfg(test)]
#[path = "../tests/interpreter/t_capabilities.rs"]
mod capability_tests;

#[cfg(test)]
#[path = "../tests/interpreter/t_transfer.rs"]
mod transfer_tests;
