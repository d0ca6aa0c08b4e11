//! Declaration collection.
//!
//! Two passes per scope, so forward references within the same scope
//! resolve: the first pass records every declaration's name and kind, the
//! second resolves conformances and member types into the nominal
//! registry. Bodies are checked afterwards (see `check_declarations`).

use crate::ast::{
    CompositeDeclaration, CompositeKind, Declaration, FunctionDeclaration, InterfaceDeclaration,
    NominalType, Parameter, TypeAnnotation, TypeExpr,
};
use crate::diag::Span;
use crate::sema::checker::{BindingKind, Checker, VarInfo};
use crate::sema::errors::CheckErrorKind;
use crate::types::{
    is_resource_kinded, Authorization, FunctionParameter, FunctionType, InitializerSig, Member,
    MemberKind, NominalEntry, NominalKey, ParamSig, PrimitiveType, Type, TypeId,
};

impl Checker {
    // --- Pass A: names and kinds ---

    pub(crate) fn collect_declarations(&mut self, declarations: &[Declaration]) {
        for declaration in declarations {
            match declaration {
                Declaration::Composite(composite) => {
                    self.collect_nominal(
                        &composite.identifier.name,
                        composite.kind,
                        false,
                        "",
                        None,
                        composite.identifier.span,
                    );
                    self.collect_nested(
                        &composite.members.composites,
                        &composite.members.interfaces,
                        &composite.identifier.name,
                    );
                }
                Declaration::Interface(interface) => {
                    self.collect_nominal(
                        &interface.identifier.name,
                        interface.kind,
                        true,
                        "",
                        None,
                        interface.identifier.span,
                    );
                    self.collect_nested(
                        &interface.members.composites,
                        &interface.members.interfaces,
                        &interface.identifier.name,
                    );
                }
                Declaration::Entitlement(entitlement) => {
                    if !self.entitlements.insert(entitlement.identifier.name.clone()) {
                        self.report(
                            CheckErrorKind::Redeclaration {
                                name: entitlement.identifier.name.clone(),
                            }
                            .at(entitlement.identifier.span),
                        );
                    }
                }
                Declaration::Function(_) | Declaration::Variable(_) => {}
            }
        }
    }

    fn collect_nested(
        &mut self,
        composites: &[CompositeDeclaration],
        interfaces: &[InterfaceDeclaration],
        prefix: &str,
    ) {
        let parent = self.nominal_id(prefix);
        for composite in composites {
            self.collect_nominal(
                &composite.identifier.name,
                composite.kind,
                false,
                prefix,
                parent,
                composite.identifier.span,
            );
            let qualified = format!("{prefix}.{}", composite.identifier.name);
            self.collect_nested(
                &composite.members.composites,
                &composite.members.interfaces,
                &qualified,
            );
        }
        for interface in interfaces {
            self.collect_nominal(
                &interface.identifier.name,
                interface.kind,
                true,
                prefix,
                parent,
                interface.identifier.span,
            );
            let qualified = format!("{prefix}.{}", interface.identifier.name);
            self.collect_nested(
                &interface.members.composites,
                &interface.members.interfaces,
                &qualified,
            );
        }
    }

    fn collect_nominal(
        &mut self,
        name: &str,
        kind: CompositeKind,
        is_interface: bool,
        prefix: &str,
        parent: Option<TypeId>,
        span: Span,
    ) {
        let qualified_identifier = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        };
        let key = NominalKey {
            location: self.location.clone(),
            qualified_identifier,
            kind,
        };
        let ty = if is_interface {
            Type::Interface(key)
        } else {
            Type::Composite(key)
        };
        let id = self.cache.intern(ty);
        self.registry.insert(id, NominalEntry::new(kind, is_interface));

        match parent {
            Some(parent_id) => {
                let entry = self
                    .registry
                    .get_mut(parent_id)
                    .expect("parent entry was collected before its children");
                if entry.nested.contains_key(name) {
                    // A duplicate nested declaration is fatal for the
                    // parent: conformance work stops for it.
                    self.halted_declarations.insert(parent_id);
                    self.report(
                        CheckErrorKind::InvalidNestedDeclaration {
                            name: name.to_string(),
                        }
                        .at(span),
                    );
                } else {
                    entry.nested.insert(name.to_string(), id);
                }
            }
            None => {
                if self.types.declare(name.to_string(), id).is_some() {
                    self.report(
                        CheckErrorKind::Redeclaration {
                            name: name.to_string(),
                        }
                        .at(span),
                    );
                }
            }
        }
    }

    /// Looks up the interned id of a nominal declared in this program by
    /// its qualified identifier. Composite and interface variants cannot
    /// collide because the qualified identifier is unique per program.
    pub(crate) fn nominal_id(&self, qualified_identifier: &str) -> Option<TypeId> {
        if qualified_identifier.is_empty() {
            return None;
        }
        self.registry.ids().find(|id| {
            self.cache
                .get(*id)
                .nominal_key()
                .map(|key| key.qualified_identifier == qualified_identifier)
                .unwrap_or(false)
        })
    }

    // --- Pass B: member types ---

    pub(crate) fn resolve_declarations(&mut self, declarations: &[Declaration]) {
        for declaration in declarations {
            match declaration {
                Declaration::Composite(composite) => self.resolve_composite(composite, ""),
                Declaration::Interface(interface) => self.resolve_interface(interface, ""),
                Declaration::Function(function) => self.resolve_global_function(function),
                Declaration::Variable(_) => {}
                Declaration::Entitlement(_) => {}
            }
        }
    }

    fn resolve_composite(&mut self, declaration: &CompositeDeclaration, prefix: &str) {
        let qualified = self.qualify(prefix, &declaration.identifier.name);
        let Some(id) = self.nominal_id(&qualified) else {
            return;
        };

        if let Some(entry) = self.registry.get_mut(id) {
            entry.docs = declaration.comments.doc_strings().collect();
        }

        self.enter_nested_type_scope(id);

        let mut conformances = Vec::new();
        for conformance in &declaration.conformances {
            if let Some(interface_id) = self.resolve_conformance(conformance, declaration.kind) {
                conformances.push(interface_id);
            }
        }
        if let Some(entry) = self.registry.get_mut(id) {
            entry.conformances = conformances.clone();
        }
        self.elaboration.record_conformances(id, conformances);

        self.resolve_members(id, &declaration.members, declaration.kind, false);

        for nested in &declaration.members.composites {
            self.resolve_composite(nested, &qualified);
        }
        for nested in &declaration.members.interfaces {
            self.resolve_interface(nested, &qualified);
        }

        self.types.leave();
    }

    fn resolve_interface(&mut self, declaration: &InterfaceDeclaration, prefix: &str) {
        let qualified = self.qualify(prefix, &declaration.identifier.name);
        let Some(id) = self.nominal_id(&qualified) else {
            return;
        };

        if let Some(entry) = self.registry.get_mut(id) {
            entry.docs = declaration.comments.doc_strings().collect();
        }

        self.enter_nested_type_scope(id);
        self.resolve_members(id, &declaration.members, declaration.kind, true);
        for nested in &declaration.members.composites {
            self.resolve_composite(nested, &qualified);
        }
        for nested in &declaration.members.interfaces {
            self.resolve_interface(nested, &qualified);
        }
        self.types.leave();
    }

    pub(crate) fn qualify(&self, prefix: &str, name: &str) -> String {
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        }
    }

    /// Makes the nested declarations of a nominal resolvable by simple
    /// name while its members and bodies are processed.
    pub(crate) fn enter_nested_type_scope(&mut self, id: TypeId) {
        self.types.enter();
        let nested: Vec<(String, TypeId)> = self
            .registry
            .get(id)
            .map(|entry| {
                entry
                    .nested
                    .iter()
                    .map(|(name, nested_id)| (name.clone(), *nested_id))
                    .collect()
            })
            .unwrap_or_default();
        for (name, nested_id) in nested {
            self.types.declare(name, nested_id);
        }
    }

    fn resolve_conformance(
        &mut self,
        conformance: &NominalType,
        kind: CompositeKind,
    ) -> Option<TypeId> {
        let id = self.resolve_nominal(conformance)?;
        match self.cache.get(id) {
            Type::Interface(key) if key.kind == kind => Some(id),
            _ => {
                self.report(
                    CheckErrorKind::TypeMismatch {
                        expected: format!("a {} interface", kind.keyword()),
                        actual: self.type_string(id),
                    }
                    .at(conformance.span),
                );
                None
            }
        }
    }

    fn resolve_members(
        &mut self,
        id: TypeId,
        members: &crate::ast::Members,
        kind: CompositeKind,
        is_interface: bool,
    ) {
        for field in &members.fields {
            let ty = self.resolve_type_annotation(&field.type_annotation);

            // A resource may only sit in a non-reference field of another
            // resource (or a contract, which is account-bound itself).
            if is_resource_kinded(&self.cache, ty)
                && !matches!(kind, CompositeKind::Resource | CompositeKind::Contract)
            {
                self.report(
                    CheckErrorKind::InvalidResourceField {
                        ty: self.type_string(ty),
                    }
                    .at(field.type_annotation.span),
                );
            }

            let access = self.resolve_access(&field.access);
            let member = Member {
                identifier: field.identifier.name.clone(),
                access,
                kind: MemberKind::Field { kind: field.kind },
                ty,
                span: field.span,
            };
            self.insert_member(id, member, field.identifier.span);
        }

        for function in &members.functions {
            if function.body.is_none()
                && !is_interface
                && !self.config.allow_native_declarations
            {
                self.report(
                    CheckErrorKind::MissingFunctionBody {
                        name: function.identifier.name.clone(),
                    }
                    .at(function.identifier.span),
                );
            }
            let ty = self.function_type(function);
            let access = self.resolve_access(&function.access);
            let member = Member {
                identifier: function.identifier.name.clone(),
                access,
                kind: MemberKind::Function {
                    has_body: function.body.is_some(),
                },
                ty,
                span: function.span,
            };
            self.insert_member(id, member, function.identifier.span);
        }

        for event in &members.events {
            let parameters = self.resolve_parameters(&event.parameters);
            if let Some(entry) = self.registry.get_mut(id) {
                entry.events.insert(event.identifier.name.clone(), parameters);
            }
        }

        for initializer in &members.initializers {
            let parameters = self.resolve_parameters(&initializer.parameters);
            if let Some(entry) = self.registry.get_mut(id) {
                entry.initializers.push(InitializerSig {
                    parameters,
                    span: initializer.span,
                });
            }
        }
    }

    fn insert_member(&mut self, id: TypeId, member: Member, span: Span) {
        let Some(entry) = self.registry.get_mut(id) else {
            return;
        };
        let name = member.identifier.clone();
        if entry.members.insert(name.clone(), member).is_some() {
            self.report(CheckErrorKind::Redeclaration { name }.at(span));
        }
    }

    fn resolve_parameters(&mut self, parameters: &[Parameter]) -> Vec<ParamSig> {
        parameters
            .iter()
            .map(|parameter| ParamSig {
                label: Some(parameter.effective_label().to_string()),
                identifier: parameter.identifier.name.clone(),
                ty: self.resolve_type_annotation(&parameter.type_annotation),
            })
            .collect()
    }

    pub(crate) fn function_type(&mut self, declaration: &FunctionDeclaration) -> TypeId {
        let parameters = declaration
            .parameters
            .iter()
            .map(|parameter| FunctionParameter {
                label: Some(parameter.effective_label().to_string()),
                identifier: parameter.identifier.name.clone(),
                ty: self.resolve_type_annotation(&parameter.type_annotation),
            })
            .collect();
        let return_type = match &declaration.return_type {
            Some(annotation) => self.resolve_type_annotation(annotation),
            None => self.cache.primitive(PrimitiveType::Void),
        };
        self.cache.intern(Type::Function(FunctionType {
            type_parameters: Vec::new(),
            parameters,
            return_type,
            is_constructor: false,
        }))
    }

    fn resolve_global_function(&mut self, declaration: &FunctionDeclaration) {
        if declaration.body.is_none() && !self.config.allow_native_declarations {
            self.report(
                CheckErrorKind::MissingFunctionBody {
                    name: declaration.identifier.name.clone(),
                }
                .at(declaration.identifier.span),
            );
        }
        let ty = self.function_type(declaration);
        let name = &declaration.identifier.name;
        if self.values.declared_in_current_frame(name) {
            self.report(
                CheckErrorKind::Redeclaration { name: name.clone() }
                    .at(declaration.identifier.span),
            );
        }
        let def = self.new_def(name);
        self.values.declare(
            name.clone(),
            VarInfo {
                ty,
                kind: BindingKind::Function,
                def,
            },
        );
    }

    // --- Type annotations ---

    pub(crate) fn resolve_type_annotation(&mut self, annotation: &TypeAnnotation) -> TypeId {
        let ty = self.resolve_type_expr(&annotation.ty, annotation.span);
        if matches!(self.cache.get(ty), Type::Never) {
            return ty;
        }
        let resource = is_resource_kinded(&self.cache, ty);
        if annotation.is_resource != resource {
            self.report(
                CheckErrorKind::InvalidResourceAnnotation {
                    ty: self.type_string(ty),
                }
                .at(annotation.span),
            );
        }
        ty
    }

    pub(crate) fn resolve_type_expr(&mut self, expr: &TypeExpr, span: Span) -> TypeId {
        match expr {
            TypeExpr::Nominal(nominal) => self
                .resolve_nominal(nominal)
                .unwrap_or_else(|| self.cache.never()),
            TypeExpr::Optional(inner) => {
                let inner = self.resolve_type_expr(inner, span);
                self.cache.optional(inner)
            }
            TypeExpr::VariableSizedArray(element) => {
                let element = self.resolve_type_expr(element, span);
                self.cache.variable_sized_array(element)
            }
            TypeExpr::ConstantSizedArray(element, size) => {
                let element = self.resolve_type_expr(element, span);
                self.cache.intern(Type::ConstantSizedArray {
                    element,
                    size: *size,
                })
            }
            TypeExpr::Dictionary(key, value) => {
                let key = self.resolve_type_expr(key, span);
                let value = self.resolve_type_expr(value, span);
                self.cache.dictionary(key, value)
            }
            TypeExpr::Reference {
                entitlements,
                referenced,
            } => {
                let referenced = self.resolve_type_expr(referenced, span);
                let authorization = if entitlements.is_empty() {
                    Authorization::Unauthorized
                } else {
                    let mut names = std::collections::BTreeSet::new();
                    for entitlement in entitlements {
                        if !self.entitlements.contains(&entitlement.name) {
                            self.report(
                                CheckErrorKind::NotDeclared {
                                    kind: "entitlement",
                                    name: entitlement.name.clone(),
                                }
                                .at(entitlement.span),
                            );
                            continue;
                        }
                        names.insert(entitlement.name.clone());
                    }
                    Authorization::Entitlements(names)
                };
                self.cache.reference(authorization, referenced)
            }
            TypeExpr::Capability { borrow } => {
                let borrow = match borrow {
                    Some(borrow) => {
                        let borrow_ty = self.resolve_type_expr(borrow, span);
                        if !matches!(
                            self.cache.get(borrow_ty),
                            Type::Reference { .. } | Type::Never
                        ) {
                            self.report(
                                CheckErrorKind::InvalidBorrowType {
                                    ty: self.type_string(borrow_ty),
                                }
                                .at(span),
                            );
                        }
                        Some(borrow_ty)
                    }
                    None => None,
                };
                self.cache.capability(borrow)
            }
            TypeExpr::Intersection(nominals) => {
                let mut interfaces = Vec::new();
                for nominal in nominals {
                    let Some(id) = self.resolve_nominal(nominal) else {
                        continue;
                    };
                    if !self.cache.get(id).is_interface() {
                        self.report(
                            CheckErrorKind::TypeMismatch {
                                expected: "an interface type".to_string(),
                                actual: self.type_string(id),
                            }
                            .at(nominal.span),
                        );
                        continue;
                    }
                    interfaces.push(id);
                }
                self.cache.intersection(interfaces)
            }
            TypeExpr::Function {
                parameters,
                return_type,
            } => {
                let parameters = parameters
                    .iter()
                    .enumerate()
                    .map(|(index, annotation)| FunctionParameter {
                        label: None,
                        identifier: format!("arg{index}"),
                        ty: self.resolve_type_annotation(annotation),
                    })
                    .collect();
                let return_type = self.resolve_type_annotation(return_type);
                self.cache.intern(Type::Function(FunctionType {
                    type_parameters: Vec::new(),
                    parameters,
                    return_type,
                    is_constructor: false,
                }))
            }
        }
    }

    pub(crate) fn resolve_nominal(&mut self, nominal: &NominalType) -> Option<TypeId> {
        let first = &nominal.identifiers[0];

        let mut current = if let Some(&id) = self.types.resolve(&first.name) {
            id
        } else if let Some(primitive) = PrimitiveType::from_name(&first.name) {
            self.cache.primitive(primitive)
        } else if first.name == "Never" {
            self.cache.never()
        } else if first.name == "Capability" {
            self.cache.capability(None)
        } else {
            self.report(
                CheckErrorKind::NotDeclared {
                    kind: "type",
                    name: first.name.clone(),
                }
                .at(first.span),
            );
            return None;
        };

        for segment in &nominal.identifiers[1..] {
            let nested = self
                .registry
                .get(current)
                .and_then(|entry| entry.nested.get(&segment.name).copied());
            match nested {
                Some(id) => current = id,
                None => {
                    self.report(
                        CheckErrorKind::NotDeclared {
                            kind: "type",
                            name: format!("{}.{}", nominal.name(), segment.name),
                        }
                        .at(segment.span),
                    );
                    return None;
                }
            }
        }
        Some(current)
    }
}
