//! Statement and expression checking.
//!
//! Checking is bidirectional: expected types flow down into literals,
//! collection constructors, returns, and arguments; synthesized types flow
//! up everywhere else. Resource invalidation and definite field
//! initialization ride along in the [`FlowState`].

use std::collections::{HashMap, HashSet};

use num_bigint::BigInt;

use crate::ast::{
    Access, Argument, BinaryOp, Block, CastKind, CompositeKind, Expr, ExprKind, Identifier,
    Parameter, Statement, TransferOp, UnaryOp, VariableDeclaration, VariableKind,
};
use crate::common::Location;
use crate::diag::Span;
use crate::sema::activations::Activation;
use crate::sema::elaboration::{Elaboration, ResolvedMember};
use crate::sema::errors::{CheckError, CheckErrorKind};
use crate::sema::flow::{DefId, FlowState};
use crate::sema::CheckerConfig;
use crate::types::{
    is_resource_kinded, is_subtype, type_string, Authorization, FunctionParameter, FunctionType,
    Member, MemberAccess, MemberKind, NominalRegistry, PrimitiveType, Type, TypeCache, TypeId,
    TypeParameter,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindingKind {
    Let,
    Var,
    Param,
    SelfBinding,
    Function,
}

#[derive(Debug, Clone)]
pub(crate) struct VarInfo {
    pub ty: TypeId,
    pub kind: BindingKind,
    pub def: DefId,
}

/// A member signature resolved for an access expression, either from the
/// nominal registry or from the built-in member table.
pub(crate) struct MemberSig {
    pub ty: TypeId,
    pub access: MemberAccess,
    pub field_kind: Option<VariableKind>,
}

pub(crate) struct Checker {
    pub location: Location,
    pub config: CheckerConfig,
    pub cache: TypeCache,
    pub registry: NominalRegistry,
    pub elaboration: Elaboration,
    pub errors: Vec<CheckError>,
    pub values: Activation<VarInfo>,
    pub types: Activation<TypeId>,
    pub entitlements: HashSet<String>,
    pub flow: FlowState,
    pub composite_stack: Vec<TypeId>,
    pub return_type: Option<TypeId>,
    /// Set while checking an initializer body of the given composite.
    pub initializer_composite: Option<TypeId>,
    /// Declarations whose conformance work is halted by a fatal
    /// structural error (duplicate nested declaration).
    pub halted_declarations: HashSet<TypeId>,
    pub def_names: HashMap<DefId, String>,
    def_depths: HashMap<DefId, usize>,
    next_def: u32,
    loop_depth: usize,
    in_create: bool,
}

impl Checker {
    pub fn new(location: Location, config: CheckerConfig) -> Self {
        Self {
            location,
            config,
            cache: TypeCache::new(),
            registry: NominalRegistry::new(),
            elaboration: Elaboration::new(),
            errors: Vec::new(),
            values: Activation::new(),
            types: Activation::new(),
            entitlements: HashSet::new(),
            flow: FlowState::new(),
            composite_stack: Vec::new(),
            return_type: None,
            initializer_composite: None,
            halted_declarations: HashSet::new(),
            def_names: HashMap::new(),
            def_depths: HashMap::new(),
            next_def: 0,
            loop_depth: 0,
            in_create: false,
        }
    }

    pub fn report(&mut self, error: CheckError) {
        self.errors.push(error);
    }

    pub(crate) fn new_def(&mut self, name: &str) -> DefId {
        let def = DefId(self.next_def);
        self.next_def += 1;
        self.def_names.insert(def, name.to_string());
        self.def_depths.insert(def, self.values.depth());
        def
    }

    pub(crate) fn type_string(&self, ty: TypeId) -> String {
        type_string(&self.cache, ty)
    }

    fn is_resource(&self, ty: TypeId) -> bool {
        is_resource_kinded(&self.cache, ty)
    }

    fn subtype(&self, sub: TypeId, sup: TypeId) -> bool {
        is_subtype(&self.cache, &self.registry, sub, sup)
    }

    // --- Function bodies ---

    pub(crate) fn check_function_body(
        &mut self,
        parameters: &[Parameter],
        return_type: TypeId,
        body: &Block,
        self_type: Option<TypeId>,
    ) {
        let saved_return = self.return_type.replace(return_type);
        let saved_flow = std::mem::take(&mut self.flow);

        self.values.enter();
        if let Some(self_type) = self_type {
            let def = self.new_def("self");
            self.values.declare(
                "self",
                VarInfo {
                    ty: self_type,
                    kind: BindingKind::SelfBinding,
                    def,
                },
            );
        }
        for parameter in parameters {
            let ty = self.resolve_type_annotation(&parameter.type_annotation);
            let def = self.new_def(&parameter.identifier.name);
            if self.is_resource(ty) {
                self.flow.track_resource(def);
            }
            self.values.declare(
                parameter.identifier.name.clone(),
                VarInfo {
                    ty,
                    kind: BindingKind::Param,
                    def,
                },
            );
        }

        for statement in &body.statements {
            self.check_statement(statement);
        }
        self.check_scope_resource_loss();

        if !self.flow.is_terminated()
            && !matches!(
                self.cache.get(return_type),
                Type::Primitive(PrimitiveType::Void) | Type::Never
            )
        {
            self.report(
                CheckErrorKind::MissingReturnValue {
                    expected: self.type_string(return_type),
                }
                .at(body.span),
            );
        }

        self.values.leave();
        self.flow = saved_flow;
        self.return_type = saved_return;
    }

    fn check_block(&mut self, block: &Block) {
        self.values.enter();
        for statement in &block.statements {
            self.check_statement(statement);
        }
        self.check_scope_resource_loss();
        self.values.leave();
    }

    /// Reports resource bindings of the innermost frame that are still
    /// valid when the scope exits on a non-terminated path.
    fn check_scope_resource_loss(&mut self) {
        if self.flow.is_terminated() {
            return;
        }
        let lost: Vec<(String, DefId)> = self
            .values
            .current_frame()
            .filter(|(_, info)| {
                matches!(info.kind, BindingKind::Let | BindingKind::Var)
                    && is_resource_kinded(&self.cache, info.ty)
                    && self.flow.is_valid(info.def)
            })
            .map(|(name, info)| (name.clone(), info.def))
            .collect();
        for (name, def) in lost {
            self.flow.invalidate(def);
            self.report(CheckErrorKind::ResourceLoss { name }.at(Span::default()));
        }
    }

    // --- Statements ---

    pub(crate) fn check_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Variable(declaration) => self.check_variable_declaration(declaration),
            Statement::Assignment {
                target,
                transfer,
                value,
                span,
            } => self.check_assignment(target, *transfer, value, *span),
            Statement::Return { value, span } => self.check_return(value.as_ref(), *span),
            Statement::If {
                condition,
                then_block,
                else_block,
                ..
            } => {
                let bool_ty = self.cache.primitive(PrimitiveType::Bool);
                self.check_expr(condition, Some(bool_ty));

                let before = self.flow.clone();
                self.check_block(then_block);
                let then_state = std::mem::replace(&mut self.flow, before);
                if let Some(else_block) = else_block {
                    self.check_block(else_block);
                }
                let else_state = std::mem::take(&mut self.flow);
                self.flow = then_state.join(else_state);
            }
            Statement::While {
                condition, body, ..
            } => {
                let bool_ty = self.cache.primitive(PrimitiveType::Bool);
                self.check_expr(condition, Some(bool_ty));

                let before = self.flow.clone();
                let outer_depth = self.values.depth();
                self.loop_depth += 1;
                self.check_block(body);
                self.loop_depth -= 1;

                // A binding declared outside the loop must not be
                // invalidated by the body: a second iteration would
                // use it after the move.
                let invalidated: Vec<DefId> = self.flow.invalidated_since(&before).collect();
                for def in invalidated {
                    let declared_outside = self
                        .def_depths
                        .get(&def)
                        .map(|depth| *depth <= outer_depth)
                        .unwrap_or(false);
                    if declared_outside {
                        let name = self
                            .def_names
                            .get(&def)
                            .cloned()
                            .unwrap_or_else(|| "<unknown>".to_string());
                        self.report(
                            CheckErrorKind::ResourceInvalidatedInLoop { name }.at(body.span),
                        );
                    }
                }
                let after = std::mem::take(&mut self.flow);
                self.flow = after.join(before);
            }
            Statement::Break { span } | Statement::Continue { span } => {
                if self.loop_depth == 0 {
                    self.report(CheckErrorKind::ControlStatementOutsideLoop.at(*span));
                }
            }
            Statement::Destroy { expr, span } => {
                let ty = self.check_expr(expr, None);
                if !self.is_resource(ty) && !matches!(self.cache.get(ty), Type::Never) {
                    self.report(CheckErrorKind::InvalidDestroy.at(*span));
                }
                self.invalidate_if_identifier(expr);
            }
            Statement::Expression(expr) => {
                let ty = self.check_expr(expr, None);
                if self.is_resource(ty) {
                    self.report(CheckErrorKind::ResourceLossExpression.at(expr.span));
                }
            }
        }
    }

    fn check_variable_declaration(&mut self, declaration: &VariableDeclaration) {
        let expected = declaration
            .type_annotation
            .as_ref()
            .map(|annotation| self.resolve_type_annotation(annotation));

        let value_ty = self.check_expr(&declaration.value, expected);
        let ty = expected.unwrap_or(value_ty);

        self.check_transfer_operator(ty, declaration.transfer, &declaration.value);
        if declaration.transfer == TransferOp::Move {
            self.invalidate_if_identifier(&declaration.value);
        }

        let name = &declaration.identifier.name;
        if self.values.declared_in_current_frame(name) {
            self.report(
                CheckErrorKind::Redeclaration { name: name.clone() }.at(declaration.identifier.span),
            );
        }
        let def = self.new_def(name);
        if self.is_resource(ty) {
            self.flow.track_resource(def);
        }
        let kind = match declaration.kind {
            VariableKind::Let => BindingKind::Let,
            VariableKind::Var => BindingKind::Var,
        };
        self.values.declare(
            name.clone(),
            VarInfo {
                ty,
                kind,
                def,
            },
        );
    }

    /// A resource motion needs `<-`; a non-resource motion must not use it.
    fn check_transfer_operator(&mut self, ty: TypeId, transfer: TransferOp, value: &Expr) {
        let is_resource = self.is_resource(ty);
        match transfer {
            TransferOp::Copy if is_resource => {
                self.report(CheckErrorKind::MissingMoveOperator.at(value.span));
            }
            TransferOp::Move if !is_resource && !matches!(self.cache.get(ty), Type::Never) => {
                self.report(CheckErrorKind::UnexpectedMoveOperator.at(value.span));
            }
            _ => {}
        }
    }

    fn check_assignment(&mut self, target: &Expr, transfer: TransferOp, value: &Expr, span: Span) {
        match &target.kind {
            ExprKind::Identifier(name) => {
                let Some(info) = self.values.resolve(name).cloned() else {
                    self.report(
                        CheckErrorKind::NotDeclared {
                            kind: "variable",
                            name: name.clone(),
                        }
                        .at(target.span),
                    );
                    self.check_expr(value, None);
                    return;
                };
                match info.kind {
                    BindingKind::Var => {}
                    _ => {
                        self.report(
                            CheckErrorKind::AssignmentToConstant { name: name.clone() }
                                .at(target.span),
                        );
                    }
                }
                self.check_expr(value, Some(info.ty));
                self.check_transfer_operator(info.ty, transfer, value);
                if transfer == TransferOp::Move {
                    self.invalidate_if_identifier(value);
                }
                if self.is_resource(info.ty) {
                    // Overwriting a live resource would lose it; writing to
                    // an invalidated binding revives it.
                    if self.flow.is_valid(info.def) {
                        self.report(CheckErrorKind::ResourceLoss { name: name.clone() }.at(span));
                    } else {
                        self.flow.track_resource(info.def);
                    }
                }
                self.elaboration.record_expr_type(target.id, info.ty);
            }
            ExprKind::Member {
                target: member_target,
                name,
            } => {
                self.check_member_assignment(target, member_target, name, transfer, value, span);
            }
            ExprKind::Index {
                target: index_target,
                index,
            } => {
                let target_ty = self.check_expr(index_target, None);
                match self.cache.get(target_ty).clone() {
                    Type::VariableSizedArray(element)
                    | Type::ConstantSizedArray { element, .. } => {
                        let int_ty = self.cache.primitive(PrimitiveType::Int);
                        self.check_expr(index, Some(int_ty));
                        self.check_expr(value, Some(element));
                        self.check_transfer_operator(element, transfer, value);
                        if self.is_resource(element) {
                            self.report(CheckErrorKind::ResourceFieldOverwrite.at(span));
                        }
                        self.elaboration.record_expr_type(target.id, element);
                    }
                    Type::Dictionary { key, value: value_ty } => {
                        self.check_expr(index, Some(key));
                        self.check_expr(value, Some(value_ty));
                        self.check_transfer_operator(value_ty, transfer, value);
                        if transfer == TransferOp::Move {
                            self.invalidate_if_identifier(value);
                        }
                        self.elaboration.record_expr_type(target.id, value_ty);
                    }
                    Type::Never => {
                        self.check_expr(value, None);
                    }
                    _ => {
                        self.report(
                            CheckErrorKind::TypeMismatch {
                                expected: "an array or dictionary".to_string(),
                                actual: self.type_string(target_ty),
                            }
                            .at(index_target.span),
                        );
                        self.check_expr(value, None);
                    }
                }
            }
            _ => {
                self.report(
                    CheckErrorKind::TypeMismatch {
                        expected: "an assignable target".to_string(),
                        actual: "expression".to_string(),
                    }
                    .at(target.span),
                );
                self.check_expr(value, None);
            }
        }
    }

    fn check_member_assignment(
        &mut self,
        target: &Expr,
        member_target: &Expr,
        name: &Identifier,
        transfer: TransferOp,
        value: &Expr,
        span: Span,
    ) {
        let container_ty = self.check_expr(member_target, None);
        let container = self.strip_reference(container_ty).unwrap_or(container_ty);

        let Some(member) = self.resolve_member(container, &name.name, name.span) else {
            self.check_expr(value, None);
            return;
        };

        let is_self_target = matches!(&member_target.kind, ExprKind::Identifier(n) if n == "self");
        let in_own_initializer = self.initializer_composite == Some(container) && is_self_target;
        let in_declaring_composite = self.composite_stack.last() == Some(&container);

        if !in_declaring_composite {
            self.report(
                CheckErrorKind::AccessControl {
                    member: name.name.clone(),
                    required: "access within the declaring type".to_string(),
                }
                .at(name.span),
            );
        }

        match member.field_kind {
            Some(VariableKind::Let) => {
                if in_own_initializer {
                    if self.flow.is_field_initialized(&name.name) {
                        self.report(
                            CheckErrorKind::ConstantFieldReassignment {
                                field: name.name.clone(),
                            }
                            .at(name.span),
                        );
                    }
                } else {
                    self.report(
                        CheckErrorKind::ConstantFieldReassignment {
                            field: name.name.clone(),
                        }
                        .at(name.span),
                    );
                }
            }
            Some(VariableKind::Var) => {}
            None => {
                self.report(
                    CheckErrorKind::MemberMismatch {
                        container: self.type_string(container),
                        member: name.name.clone(),
                    }
                    .at(name.span),
                );
            }
        }

        self.check_expr(value, Some(member.ty));
        self.check_transfer_operator(member.ty, transfer, value);
        if transfer == TransferOp::Move {
            self.invalidate_if_identifier(value);
        }

        if self.is_resource(member.ty) {
            let optional_field = matches!(self.cache.get(member.ty), Type::Optional(_));
            let first_init = in_own_initializer && !self.flow.is_field_initialized(&name.name);
            if !optional_field && !first_init {
                self.report(CheckErrorKind::ResourceFieldOverwrite.at(span));
            }
        }

        if in_own_initializer {
            self.flow.initialize_field(&name.name);
        }

        self.elaboration.record_member_access(
            target.id,
            ResolvedMember {
                container,
                name: name.name.clone(),
            },
        );
        self.elaboration.record_expr_type(target.id, member.ty);
    }

    fn check_return(&mut self, value: Option<&Expr>, span: Span) {
        // A return outside any function is only reachable for stray
        // top-level statements; treat the expected type as Void.
        let return_type = match self.return_type {
            Some(return_type) => return_type,
            None => self.cache.primitive(PrimitiveType::Void),
        };
        match value {
            Some(value) => {
                if self.is_resource(return_type) && !matches!(value.kind, ExprKind::Move(_)) {
                    self.report(CheckErrorKind::MissingMoveOperator.at(value.span));
                }
                self.check_expr(value, Some(return_type));
                self.invalidate_if_identifier(value);
            }
            None => {
                if !matches!(
                    self.cache.get(return_type),
                    Type::Primitive(PrimitiveType::Void) | Type::Never
                ) {
                    self.report(
                        CheckErrorKind::MissingReturnValue {
                            expected: self.type_string(return_type),
                        }
                        .at(span),
                    );
                }
            }
        }
        self.flow.terminate();
    }

    /// Invalidates the resource binding a move consumed. Applies through a
    /// top-level identifier or a `<-identifier` move expression.
    fn invalidate_if_identifier(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Identifier(name) => {
                if let Some(info) = self.values.resolve(name).cloned()
                    && matches!(
                        info.kind,
                        BindingKind::Let | BindingKind::Var | BindingKind::Param
                    )
                    && is_resource_kinded(&self.cache, info.ty)
                {
                    self.flow.invalidate(info.def);
                    self.elaboration.record_invalidation(expr.id, expr.span);
                }
            }
            ExprKind::Move(inner) => self.invalidate_if_identifier(inner),
            _ => {}
        }
    }

    // --- Expressions ---

    pub(crate) fn check_expr(&mut self, expr: &Expr, expected: Option<TypeId>) -> TypeId {
        let actual = self.infer_expr(expr, expected);
        let ty = if let Some(expected) = expected {
            if matches!(self.cache.get(actual), Type::Never) || self.subtype(actual, expected) {
                actual
            } else {
                self.report(
                    CheckErrorKind::TypeMismatch {
                        expected: self.type_string(expected),
                        actual: self.type_string(actual),
                    }
                    .at(expr.span),
                );
                expected
            }
        } else {
            actual
        };
        self.elaboration.record_expr_type(expr.id, ty);
        ty
    }

    fn infer_expr(&mut self, expr: &Expr, expected: Option<TypeId>) -> TypeId {
        match &expr.kind {
            ExprKind::IntLiteral(value) => self.infer_int_literal(value, expected, expr.span),
            ExprKind::BoolLiteral(_) => self.cache.primitive(PrimitiveType::Bool),
            ExprKind::StringLiteral(_) => self.cache.primitive(PrimitiveType::String),
            ExprKind::PathLiteral { .. } => self.cache.primitive(PrimitiveType::Path),
            ExprKind::NilLiteral => match expected {
                Some(expected) if matches!(self.cache.get(expected), Type::Optional(_)) => {
                    expected
                }
                _ => {
                    self.report(CheckErrorKind::CannotInferType.at(expr.span));
                    self.cache.never()
                }
            },
            ExprKind::ArrayLiteral(elements) => self.infer_array_literal(elements, expected),
            ExprKind::DictionaryLiteral(entries) => {
                self.infer_dictionary_literal(entries, expected, expr)
            }
            ExprKind::Identifier(name) => self.infer_identifier(name, expr),
            ExprKind::Member { target, name } => self.infer_member(expr, target, name),
            ExprKind::Index { target, index } => self.infer_index(target, index),
            ExprKind::Invocation {
                invoked,
                type_arguments,
                arguments,
            } => self.infer_invocation(expr, invoked, type_arguments, arguments),
            ExprKind::Create(inner) => {
                if !matches!(inner.kind, ExprKind::Invocation { .. }) {
                    self.report(
                        CheckErrorKind::InvalidCreate {
                            ty: "expression".to_string(),
                        }
                        .at(expr.span),
                    );
                    return self.cache.never();
                }
                let previous = std::mem::replace(&mut self.in_create, true);
                let ty = self.check_expr(inner, expected);
                self.in_create = previous;
                if !self.is_resource(ty) && !matches!(self.cache.get(ty), Type::Never) {
                    self.report(
                        CheckErrorKind::InvalidCreate {
                            ty: self.type_string(ty),
                        }
                        .at(expr.span),
                    );
                }
                ty
            }
            ExprKind::Move(inner) => {
                let ty = self.check_expr(inner, expected);
                if !self.is_resource(ty) && !matches!(self.cache.get(ty), Type::Never) {
                    self.report(CheckErrorKind::UnexpectedMoveOperator.at(expr.span));
                }
                ty
            }
            ExprKind::Reference {
                target,
                type_annotation,
            } => {
                let reference_ty = self.resolve_type_annotation(type_annotation);
                let Type::Reference { referenced, .. } = self.cache.get(reference_ty).clone()
                else {
                    if !matches!(self.cache.get(reference_ty), Type::Never) {
                        self.report(
                            CheckErrorKind::TypeMismatch {
                                expected: "a reference type".to_string(),
                                actual: self.type_string(reference_ty),
                            }
                            .at(type_annotation.span),
                        );
                    }
                    self.check_expr(target, None);
                    return self.cache.never();
                };
                let target_ty = self.check_expr(target, None);
                if !matches!(self.cache.get(target_ty), Type::Never)
                    && !self.subtype(target_ty, referenced)
                {
                    self.report(
                        CheckErrorKind::TypeMismatch {
                            expected: self.type_string(referenced),
                            actual: self.type_string(target_ty),
                        }
                        .at(target.span),
                    );
                }
                reference_ty
            }
            ExprKind::Cast {
                target,
                kind,
                type_annotation,
            } => {
                let cast_ty = self.resolve_type_annotation(type_annotation);
                let target_ty = self.check_expr(target, None);
                self.elaboration.record_cast_type(expr.id, *kind, cast_ty);
                match kind {
                    CastKind::Static => {
                        if !matches!(self.cache.get(target_ty), Type::Never)
                            && !self.subtype(target_ty, cast_ty)
                        {
                            self.report(
                                CheckErrorKind::TypeMismatch {
                                    expected: self.type_string(cast_ty),
                                    actual: self.type_string(target_ty),
                                }
                                .at(expr.span),
                            );
                        }
                        cast_ty
                    }
                    CastKind::Failable => self.cache.optional(cast_ty),
                    CastKind::Forced => cast_ty,
                }
            }
            ExprKind::Binary { op, left, right } => self.infer_binary(*op, left, right, expr.span),
            ExprKind::Unary { op, operand } => self.infer_unary(*op, operand, expr.span),
        }
    }

    fn infer_int_literal(
        &mut self,
        value: &BigInt,
        expected: Option<TypeId>,
        span: Span,
    ) -> TypeId {
        if let Some(expected) = expected
            && let Type::Primitive(kind) = self.cache.get(expected)
            && kind.is_number()
        {
            let kind = *kind;
            // Fixed-point kinds are bounds-checked in their scaled
            // representation at evaluation time.
            if kind.is_integer()
                && let Some((min, max)) = crate::interpreter::value::integer_bounds(kind)
                && (value < &min || value > &max)
            {
                self.report(
                    CheckErrorKind::TypeMismatch {
                        expected: kind.name().to_string(),
                        actual: format!("out-of-range literal {value}"),
                    }
                    .at(span),
                );
            }
            return expected;
        }
        self.cache.primitive(PrimitiveType::Int)
    }

    fn infer_array_literal(&mut self, elements: &[Expr], expected: Option<TypeId>) -> TypeId {
        let expected_element = expected.and_then(|e| match self.cache.get(e) {
            Type::VariableSizedArray(element) => Some(*element),
            Type::ConstantSizedArray { element, .. } => Some(*element),
            _ => None,
        });

        let mut element_ty = expected_element;
        for element in elements {
            let ty = self.check_expr(element, element_ty);
            if element_ty.is_none() {
                element_ty = Some(ty);
            }
            if self.is_resource(ty) {
                if !matches!(element.kind, ExprKind::Move(_)) {
                    self.report(CheckErrorKind::MissingMoveOperator.at(element.span));
                }
                self.invalidate_if_identifier(element);
            }
        }

        match (expected, element_ty) {
            (Some(expected), _) => expected,
            (None, Some(element)) => self.cache.variable_sized_array(element),
            (None, None) => {
                let never = self.cache.never();
                self.cache.variable_sized_array(never)
            }
        }
    }

    fn infer_dictionary_literal(
        &mut self,
        entries: &[(Expr, Expr)],
        expected: Option<TypeId>,
        expr: &Expr,
    ) -> TypeId {
        let expected_pair = expected.and_then(|e| match self.cache.get(e) {
            Type::Dictionary { key, value } => Some((*key, *value)),
            _ => None,
        });

        let mut key_ty = expected_pair.map(|(k, _)| k);
        let mut value_ty = expected_pair.map(|(_, v)| v);
        for (key, value) in entries {
            let kt = self.check_expr(key, key_ty);
            let vt = self.check_expr(value, value_ty);
            key_ty.get_or_insert(kt);
            value_ty.get_or_insert(vt);
            if self.is_resource(vt) {
                if !matches!(value.kind, ExprKind::Move(_)) {
                    self.report(CheckErrorKind::MissingMoveOperator.at(value.span));
                }
                self.invalidate_if_identifier(value);
            }
        }

        match (expected, key_ty, value_ty) {
            (Some(expected), _, _) => expected,
            (None, Some(key), Some(value)) => self.cache.dictionary(key, value),
            _ => {
                self.report(CheckErrorKind::CannotInferType.at(expr.span));
                self.cache.never()
            }
        }
    }

    fn infer_identifier(&mut self, name: &str, expr: &Expr) -> TypeId {
        if let Some(info) = self.values.resolve(name).cloned() {
            if matches!(
                info.kind,
                BindingKind::Let | BindingKind::Var | BindingKind::Param
            ) && is_resource_kinded(&self.cache, info.ty)
                && !self.flow.is_valid(info.def)
            {
                self.report(
                    CheckErrorKind::InvalidMove {
                        name: name.to_string(),
                    }
                    .at(expr.span),
                );
            }
            return info.ty;
        }

        // Not a value: a nominal type in expression position is either a
        // contract instance or a composite constructor.
        if let Some(&type_id) = self.types.resolve(name) {
            return self.nominal_in_expression_position(type_id, expr);
        }

        self.report(
            CheckErrorKind::NotDeclared {
                kind: "variable",
                name: name.to_string(),
            }
            .at(expr.span),
        );
        self.cache.never()
    }

    fn nominal_in_expression_position(&mut self, type_id: TypeId, expr: &Expr) -> TypeId {
        match self.cache.get(type_id).clone() {
            Type::Composite(key) if key.kind == CompositeKind::Contract => type_id,
            Type::Composite(key)
                if matches!(key.kind, CompositeKind::Struct | CompositeKind::Resource) =>
            {
                self.constructor_type(type_id)
            }
            _ => {
                self.report(
                    CheckErrorKind::NotDeclared {
                        kind: "variable",
                        name: self.type_string(type_id),
                    }
                    .at(expr.span),
                );
                self.cache.never()
            }
        }
    }

    pub(crate) fn constructor_type(&mut self, composite: TypeId) -> TypeId {
        let parameters = self
            .registry
            .get(composite)
            .and_then(|entry| entry.initializers.first())
            .map(|initializer| {
                initializer
                    .parameters
                    .iter()
                    .map(|parameter| FunctionParameter {
                        label: parameter.label.clone(),
                        identifier: parameter.identifier.clone(),
                        ty: parameter.ty,
                    })
                    .collect()
            })
            .unwrap_or_default();
        self.cache.intern(Type::Function(FunctionType {
            type_parameters: Vec::new(),
            parameters,
            return_type: composite,
            is_constructor: true,
        }))
    }

    fn infer_member(&mut self, expr: &Expr, target: &Expr, name: &Identifier) -> TypeId {
        let target_ty = self.check_expr(target, None);
        if matches!(self.cache.get(target_ty), Type::Never) {
            return self.cache.never();
        }

        if matches!(self.cache.get(target_ty), Type::Optional(_)) {
            self.report(
                CheckErrorKind::MissingMember {
                    ty: self.type_string(target_ty),
                    member: name.name.clone(),
                }
                .at(name.span),
            );
            return self.cache.never();
        }

        let authorization = match self.cache.get(target_ty) {
            Type::Reference { authorization, .. } => Some(authorization.clone()),
            _ => None,
        };
        let container = self.strip_reference(target_ty).unwrap_or(target_ty);

        let Some(member) = self.resolve_member(container, &name.name, name.span) else {
            return self.cache.never();
        };

        self.check_member_access_control(target, &member, &name.name, authorization.as_ref());

        self.elaboration.record_member_access(
            expr.id,
            ResolvedMember {
                container,
                name: name.name.clone(),
            },
        );
        member.ty
    }

    fn strip_reference(&self, ty: TypeId) -> Option<TypeId> {
        match self.cache.get(ty) {
            Type::Reference { referenced, .. } => Some(*referenced),
            _ => None,
        }
    }

    fn check_member_access_control(
        &mut self,
        target: &Expr,
        member: &MemberSig,
        name: &str,
        authorization: Option<&Authorization>,
    ) {
        let span = target.span;
        match &member.access {
            MemberAccess::All => {}
            MemberAccess::SelfOnly => {
                let is_self = matches!(&target.kind, ExprKind::Identifier(n) if n == "self");
                if !is_self {
                    self.report(
                        CheckErrorKind::AccessControl {
                            member: name.to_string(),
                            required: "access(self)".to_string(),
                        }
                        .at(span),
                    );
                }
            }
            MemberAccess::Contract | MemberAccess::Account => {
                if self.composite_stack.is_empty() {
                    self.report(
                        CheckErrorKind::AccessControl {
                            member: name.to_string(),
                            required: "access from the declaring contract".to_string(),
                        }
                        .at(span),
                    );
                }
            }
            MemberAccess::Entitlements(required) => {
                if let Some(authorization) = authorization
                    && !authorization.satisfies(required)
                {
                    let list = required.iter().cloned().collect::<Vec<_>>().join(", ");
                    self.report(
                        CheckErrorKind::AccessControl {
                            member: name.to_string(),
                            required: format!("entitlements {list}"),
                        }
                        .at(span),
                    );
                }
            }
        }
    }

    fn infer_index(&mut self, target: &Expr, index: &Expr) -> TypeId {
        let target_ty = self.check_expr(target, None);
        match self.cache.get(target_ty).clone() {
            Type::VariableSizedArray(element) | Type::ConstantSizedArray { element, .. } => {
                let int_ty = self.cache.primitive(PrimitiveType::Int);
                self.check_expr(index, Some(int_ty));
                element
            }
            Type::Dictionary { key, value } => {
                self.check_expr(index, Some(key));
                self.cache.optional(value)
            }
            Type::Never => self.cache.never(),
            _ => {
                self.report(
                    CheckErrorKind::TypeMismatch {
                        expected: "an array or dictionary".to_string(),
                        actual: self.type_string(target_ty),
                    }
                    .at(target.span),
                );
                self.check_expr(index, None);
                self.cache.never()
            }
        }
    }

    fn infer_invocation(
        &mut self,
        expr: &Expr,
        invoked: &Expr,
        type_arguments: &[crate::ast::TypeAnnotation],
        arguments: &[Argument],
    ) -> TypeId {
        let invoked_ty = self.check_expr(invoked, None);
        let Type::Function(function) = self.cache.get(invoked_ty).clone() else {
            if !matches!(self.cache.get(invoked_ty), Type::Never) {
                self.report(CheckErrorKind::NotCallable.at(invoked.span));
            }
            for argument in arguments {
                self.check_expr(&argument.value, None);
            }
            return self.cache.never();
        };

        // Bind type arguments and substitute generics.
        let mut bindings: HashMap<String, TypeId> = HashMap::new();
        if function.type_parameters.len() != type_arguments.len() {
            self.report(
                CheckErrorKind::ArgumentCountMismatch {
                    expected: function.type_parameters.len(),
                    actual: type_arguments.len(),
                }
                .at(expr.span),
            );
        } else if !type_arguments.is_empty() {
            let mut bound = Vec::with_capacity(type_arguments.len());
            for (parameter, annotation) in function.type_parameters.iter().zip(type_arguments) {
                let ty = self.resolve_type_annotation(annotation);
                bindings.insert(parameter.name.clone(), ty);
                bound.push(ty);
            }
            self.elaboration.record_call_type_bindings(expr.id, bound);
        }

        if function.parameters.len() != arguments.len() {
            self.report(
                CheckErrorKind::ArgumentCountMismatch {
                    expected: function.parameters.len(),
                    actual: arguments.len(),
                }
                .at(expr.span),
            );
        }

        for (parameter, argument) in function.parameters.iter().zip(arguments) {
            let expected_label = parameter.label.as_deref().filter(|label| *label != "_");
            match (expected_label, argument.label.as_deref()) {
                (Some(expected), Some(actual)) if expected != actual => {
                    self.report(
                        CheckErrorKind::ArgumentLabelMismatch {
                            expected: expected.to_string(),
                            actual: actual.to_string(),
                        }
                        .at(argument.value.span),
                    );
                }
                (Some(expected), None) => {
                    self.report(
                        CheckErrorKind::ArgumentLabelMismatch {
                            expected: expected.to_string(),
                            actual: "_".to_string(),
                        }
                        .at(argument.value.span),
                    );
                }
                (None, Some(actual)) => {
                    self.report(
                        CheckErrorKind::ArgumentLabelMismatch {
                            expected: "_".to_string(),
                            actual: actual.to_string(),
                        }
                        .at(argument.value.span),
                    );
                }
                _ => {}
            }

            let parameter_ty = self.substitute_generics(parameter.ty, &bindings);
            let argument_ty = self.check_expr(&argument.value, Some(parameter_ty));
            if self.is_resource(argument_ty) {
                if !matches!(argument.value.kind, ExprKind::Move(_)) {
                    self.report(CheckErrorKind::MissingMoveOperator.at(argument.value.span));
                }
                self.invalidate_if_identifier(&argument.value);
            }
        }

        let return_type = self.substitute_generics(function.return_type, &bindings);
        if function.is_constructor && self.is_resource(return_type) && !self.in_create {
            self.report(CheckErrorKind::MissingCreate.at(expr.span));
        }
        return_type
    }

    pub(crate) fn substitute_generics(
        &mut self,
        ty: TypeId,
        bindings: &HashMap<String, TypeId>,
    ) -> TypeId {
        if bindings.is_empty() {
            return ty;
        }
        match self.cache.get(ty).clone() {
            Type::Generic(TypeParameter { name }) => {
                bindings.get(&name).copied().unwrap_or(ty)
            }
            Type::Optional(inner) => {
                let inner = self.substitute_generics(inner, bindings);
                self.cache.optional(inner)
            }
            Type::VariableSizedArray(element) => {
                let element = self.substitute_generics(element, bindings);
                self.cache.variable_sized_array(element)
            }
            Type::ConstantSizedArray { element, size } => {
                let element = self.substitute_generics(element, bindings);
                self.cache.intern(Type::ConstantSizedArray { element, size })
            }
            Type::Dictionary { key, value } => {
                let key = self.substitute_generics(key, bindings);
                let value = self.substitute_generics(value, bindings);
                self.cache.dictionary(key, value)
            }
            Type::Reference {
                authorization,
                referenced,
            } => {
                let referenced = self.substitute_generics(referenced, bindings);
                self.cache.reference(authorization, referenced)
            }
            Type::Capability { borrow } => {
                let borrow = borrow.map(|borrow| self.substitute_generics(borrow, bindings));
                self.cache.capability(borrow)
            }
            Type::Function(function) => {
                let parameters = function
                    .parameters
                    .iter()
                    .map(|parameter| FunctionParameter {
                        label: parameter.label.clone(),
                        identifier: parameter.identifier.clone(),
                        ty: self.substitute_generics(parameter.ty, bindings),
                    })
                    .collect();
                let return_type = self.substitute_generics(function.return_type, bindings);
                self.cache.intern(Type::Function(FunctionType {
                    type_parameters: function.type_parameters.clone(),
                    parameters,
                    return_type,
                    is_constructor: function.is_constructor,
                }))
            }
            _ => ty,
        }
    }

    fn infer_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr, span: Span) -> TypeId {
        let bool_ty = self.cache.primitive(PrimitiveType::Bool);
        match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                let left_ty = self.check_expr(left, None);
                self.check_expr(right, Some(left_ty));
                if !self.is_number(left_ty) {
                    self.report(
                        CheckErrorKind::TypeMismatch {
                            expected: "a number".to_string(),
                            actual: self.type_string(left_ty),
                        }
                        .at(span),
                    );
                    return self.cache.never();
                }
                left_ty
            }
            BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
                let left_ty = self.check_expr(left, None);
                self.check_expr(right, Some(left_ty));
                if !self.is_number(left_ty) {
                    self.report(
                        CheckErrorKind::TypeMismatch {
                            expected: "a number".to_string(),
                            actual: self.type_string(left_ty),
                        }
                        .at(span),
                    );
                }
                bool_ty
            }
            BinaryOp::Equal | BinaryOp::NotEqual => {
                let left_ty = self.check_expr(left, None);
                self.check_expr(right, Some(left_ty));
                if self.is_resource(left_ty) || matches!(self.cache.get(left_ty), Type::Function(_))
                {
                    self.report(
                        CheckErrorKind::TypeMismatch {
                            expected: "an equatable value".to_string(),
                            actual: self.type_string(left_ty),
                        }
                        .at(span),
                    );
                }
                bool_ty
            }
            BinaryOp::And | BinaryOp::Or => {
                self.check_expr(left, Some(bool_ty));
                self.check_expr(right, Some(bool_ty));
                bool_ty
            }
            BinaryOp::NilCoalesce => {
                let left_ty = self.check_expr(left, None);
                let Type::Optional(inner) = self.cache.get(left_ty).clone() else {
                    if !matches!(self.cache.get(left_ty), Type::Never) {
                        self.report(
                            CheckErrorKind::TypeMismatch {
                                expected: "an optional".to_string(),
                                actual: self.type_string(left_ty),
                            }
                            .at(left.span),
                        );
                    }
                    self.check_expr(right, None);
                    return self.cache.never();
                };
                self.check_expr(right, Some(inner));
                inner
            }
        }
    }

    fn infer_unary(&mut self, op: UnaryOp, operand: &Expr, span: Span) -> TypeId {
        match op {
            UnaryOp::Not => {
                let bool_ty = self.cache.primitive(PrimitiveType::Bool);
                self.check_expr(operand, Some(bool_ty));
                bool_ty
            }
            UnaryOp::Negate => {
                let ty = self.check_expr(operand, None);
                let signed = matches!(
                    self.cache.get(ty),
                    Type::Primitive(
                        PrimitiveType::Int
                            | PrimitiveType::Int8
                            | PrimitiveType::Int16
                            | PrimitiveType::Int32
                            | PrimitiveType::Int64
                            | PrimitiveType::Int128
                            | PrimitiveType::Int256
                            | PrimitiveType::Fix64
                    )
                );
                if !signed {
                    self.report(
                        CheckErrorKind::TypeMismatch {
                            expected: "a signed number".to_string(),
                            actual: self.type_string(ty),
                        }
                        .at(span),
                    );
                    return self.cache.never();
                }
                ty
            }
        }
    }

    fn is_number(&self, ty: TypeId) -> bool {
        matches!(self.cache.get(ty), Type::Primitive(kind) if kind.is_number())
    }

    // --- Member resolution ---

    /// Resolves a member on a container type, reporting `MissingMember`
    /// when absent.
    pub(crate) fn resolve_member(
        &mut self,
        container: TypeId,
        name: &str,
        span: Span,
    ) -> Option<MemberSig> {
        if let Some(member) = self.registry.member(container, name).cloned() {
            return Some(self.member_sig(&member));
        }

        // Members supplied by conformed interfaces (e.g. default
        // functions) are inherited.
        for interface in self.registry.conformances(container).to_vec() {
            if let Some(member) = self.registry.member(interface, name).cloned() {
                return Some(self.member_sig(&member));
            }
        }

        // Intersections expose the members of every interface in the set.
        if let Type::Intersection(interfaces) = self.cache.get(container).clone() {
            for interface in interfaces {
                if let Some(member) = self.registry.member(interface, name).cloned() {
                    return Some(self.member_sig(&member));
                }
            }
        }

        if let Some(sig) = self.builtin_member(container, name) {
            return Some(sig);
        }

        self.report(
            CheckErrorKind::MissingMember {
                ty: self.type_string(container),
                member: name.to_string(),
            }
            .at(span),
        );
        None
    }

    fn member_sig(&self, member: &Member) -> MemberSig {
        MemberSig {
            ty: member.ty,
            access: member.access.clone(),
            field_kind: match &member.kind {
                MemberKind::Field { kind } => Some(*kind),
                MemberKind::Function { .. } => None,
            },
        }
    }

    /// The closed per-kind switch of built-in members.
    fn builtin_member(&mut self, container: TypeId, name: &str) -> Option<MemberSig> {
        let int_ty = self.cache.primitive(PrimitiveType::Int);
        let bool_ty = self.cache.primitive(PrimitiveType::Bool);
        let void_ty = self.cache.primitive(PrimitiveType::Void);
        let string_ty = self.cache.primitive(PrimitiveType::String);

        let field = |ty: TypeId| MemberSig {
            ty,
            access: MemberAccess::All,
            field_kind: Some(VariableKind::Let),
        };

        match self.cache.get(container).clone() {
            Type::VariableSizedArray(element) | Type::ConstantSizedArray { element, .. } => {
                match name {
                    "length" => Some(field(int_ty)),
                    "append" => Some(self.builtin_function(
                        vec![(None, "element", element)],
                        void_ty,
                    )),
                    "contains" => Some(self.builtin_function(
                        vec![(None, "element", element)],
                        bool_ty,
                    )),
                    "remove" => Some(self.builtin_function(
                        vec![(Some("at"), "index", int_ty)],
                        element,
                    )),
                    _ => None,
                }
            }
            Type::Dictionary { key, value } => match name {
                "length" => Some(field(int_ty)),
                "keys" => {
                    let keys_ty = self.cache.variable_sized_array(key);
                    Some(field(keys_ty))
                }
                "values" => {
                    let values_ty = self.cache.variable_sized_array(value);
                    Some(field(values_ty))
                }
                "insert" => {
                    let optional_value = self.cache.optional(value);
                    Some(self.builtin_function(
                        vec![(Some("key"), "key", key), (None, "value", value)],
                        optional_value,
                    ))
                }
                "remove" => {
                    let optional_value = self.cache.optional(value);
                    Some(self.builtin_function(vec![(Some("key"), "key", key)], optional_value))
                }
                _ => None,
            },
            Type::Primitive(PrimitiveType::String) => match name {
                "length" => Some(field(int_ty)),
                "concat" => Some(self.builtin_function(
                    vec![(None, "other", string_ty)],
                    string_ty,
                )),
                _ => None,
            },
            Type::Capability { borrow } => match name {
                "address" => {
                    let address_ty = self.cache.primitive(PrimitiveType::Address);
                    Some(field(address_ty))
                }
                "id" => {
                    let id_ty = self.cache.primitive(PrimitiveType::UInt64);
                    Some(field(id_ty))
                }
                "borrow" => Some(self.capability_borrow_member(borrow, false)),
                "check" => Some(self.capability_borrow_member(borrow, true)),
                _ => None,
            },
            _ => None,
        }
    }

    /// `borrow` and `check` on capabilities: typed capabilities know their
    /// borrow type, untyped ones take it as a type argument.
    fn capability_borrow_member(&mut self, borrow: Option<TypeId>, is_check: bool) -> MemberSig {
        let bool_ty = self.cache.primitive(PrimitiveType::Bool);
        let (type_parameters, result) = match borrow {
            Some(borrow) => (Vec::new(), borrow),
            None => {
                let parameter = TypeParameter {
                    name: "T".to_string(),
                };
                let generic = self.cache.intern(Type::Generic(parameter.clone()));
                (vec![parameter], generic)
            }
        };
        let return_type = if is_check {
            bool_ty
        } else {
            self.cache.optional(result)
        };
        let ty = self.cache.intern(Type::Function(FunctionType {
            type_parameters,
            parameters: Vec::new(),
            return_type,
            is_constructor: false,
        }));
        MemberSig {
            ty,
            access: MemberAccess::All,
            field_kind: None,
        }
    }

    fn builtin_function(
        &mut self,
        parameters: Vec<(Option<&str>, &str, TypeId)>,
        return_type: TypeId,
    ) -> MemberSig {
        let parameters = parameters
            .into_iter()
            .map(|(label, identifier, ty)| FunctionParameter {
                label: label.map(str::to_string),
                identifier: identifier.to_string(),
                ty,
            })
            .collect();
        let ty = self.cache.intern(Type::Function(FunctionType {
            type_parameters: Vec::new(),
            parameters,
            return_type,
            is_constructor: false,
        }));
        MemberSig {
            ty,
            access: MemberAccess::All,
            field_kind: None,
        }
    }

    // --- Access resolution ---

    pub(crate) fn resolve_access(&mut self, access: &Access) -> MemberAccess {
        match access {
            Access::SelfOnly => MemberAccess::SelfOnly,
            Access::Contract => MemberAccess::Contract,
            Access::Account => MemberAccess::Account,
            Access::All => MemberAccess::All,
            Access::Entitlements(identifiers) => {
                let mut names = std::collections::BTreeSet::new();
                for identifier in identifiers {
                    if !self.entitlements.contains(&identifier.name) {
                        self.report(
                            CheckErrorKind::NotDeclared {
                                kind: "entitlement",
                                name: identifier.name.clone(),
                            }
                            .at(identifier.span),
                        );
                        continue;
                    }
                    names.insert(identifier.name.clone());
                }
                MemberAccess::Entitlements(names)
            }
        }
    }
}
