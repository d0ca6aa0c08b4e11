//! Declaration body checking: function bodies, initializers with definite
//! field initialization, and nested declarations.

use crate::ast::{
    CompositeDeclaration, Declaration, InitializerDeclaration, InterfaceDeclaration, Statement,
};
use crate::sema::checker::{BindingKind, Checker, VarInfo};
use crate::sema::errors::CheckErrorKind;
use crate::sema::flow::FlowState;
use crate::types::{is_resource_kinded, MemberKind, PrimitiveType, Type, TypeId};

impl Checker {
    pub(crate) fn check_declarations(&mut self, declarations: &[Declaration]) {
        for declaration in declarations {
            match declaration {
                Declaration::Composite(composite) => self.check_composite(composite, ""),
                Declaration::Interface(interface) => self.check_interface(interface, ""),
                Declaration::Function(function) => {
                    if let Some(body) = &function.body {
                        let ty = self.function_type(function);
                        let Type::Function(function_ty) = self.cache.get(ty).clone() else {
                            unreachable!("function declarations resolve to function types");
                        };
                        self.check_function_body(
                            &function.parameters,
                            function_ty.return_type,
                            body,
                            None,
                        );
                    }
                }
                Declaration::Variable(variable) => {
                    self.check_statement(&Statement::Variable(variable.clone()));
                }
                Declaration::Entitlement(_) => {}
            }
        }
    }

    fn check_composite(&mut self, declaration: &CompositeDeclaration, prefix: &str) {
        let qualified = self.qualify(prefix, &declaration.identifier.name);
        let Some(id) = self.nominal_id(&qualified) else {
            return;
        };

        self.enter_nested_type_scope(id);
        self.composite_stack.push(id);

        for initializer in &declaration.members.initializers {
            self.check_initializer(id, initializer);
        }

        for function in &declaration.members.functions {
            if let Some(body) = &function.body {
                let member_ty = self
                    .registry
                    .member(id, &function.identifier.name)
                    .map(|member| member.ty);
                let return_type = member_ty
                    .and_then(|ty| match self.cache.get(ty) {
                        Type::Function(function_ty) => Some(function_ty.return_type),
                        _ => None,
                    })
                    .unwrap_or_else(|| self.cache.primitive(PrimitiveType::Void));
                self.check_function_body(&function.parameters, return_type, body, Some(id));
            }
        }

        for nested in &declaration.members.composites {
            self.check_composite(nested, &qualified);
        }
        for nested in &declaration.members.interfaces {
            self.check_interface(nested, &qualified);
        }

        self.composite_stack.pop();
        self.types.leave();

        if !self.halted_declarations.contains(&id) {
            self.check_conformances(declaration, id);
        }
    }

    fn check_interface(&mut self, declaration: &InterfaceDeclaration, prefix: &str) {
        let qualified = self.qualify(prefix, &declaration.identifier.name);
        let Some(id) = self.nominal_id(&qualified) else {
            return;
        };

        self.enter_nested_type_scope(id);
        self.composite_stack.push(id);

        // Only default bodies are checked; requirements have no body.
        for function in &declaration.members.functions {
            if let Some(body) = &function.body {
                let return_type = self
                    .registry
                    .member(id, &function.identifier.name)
                    .and_then(|member| match self.cache.get(member.ty) {
                        Type::Function(function_ty) => Some(function_ty.return_type),
                        _ => None,
                    })
                    .unwrap_or_else(|| self.cache.primitive(PrimitiveType::Void));
                self.check_function_body(&function.parameters, return_type, body, Some(id));
            }
        }

        for nested in &declaration.members.composites {
            self.check_composite(nested, &qualified);
        }
        for nested in &declaration.members.interfaces {
            self.check_interface(nested, &qualified);
        }

        self.composite_stack.pop();
        self.types.leave();
    }

    /// Checks an initializer body, tracking definite assignment of the
    /// composite's fields and verifying every non-optional field is
    /// assigned on all paths.
    fn check_initializer(&mut self, id: TypeId, initializer: &InitializerDeclaration) {
        let Some(body) = &initializer.body else {
            return;
        };

        let saved_flow = std::mem::replace(&mut self.flow, FlowState::new());
        let saved_initializer = self.initializer_composite.replace(id);
        let void_ty = self.cache.primitive(PrimitiveType::Void);
        let saved_return = self.return_type.replace(void_ty);

        self.values.enter();
        let self_def = self.new_def("self");
        self.values.declare(
            "self",
            VarInfo {
                ty: id,
                kind: BindingKind::SelfBinding,
                def: self_def,
            },
        );
        for parameter in &initializer.parameters {
            let ty = self.resolve_type_annotation(&parameter.type_annotation);
            let def = self.new_def(&parameter.identifier.name);
            if is_resource_kinded(&self.cache, ty) {
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

        // Every non-optional field must be definitely assigned.
        let fields: Vec<(String, TypeId)> = self
            .registry
            .get(id)
            .map(|entry| {
                entry
                    .members
                    .iter()
                    .filter(|(_, member)| matches!(member.kind, MemberKind::Field { .. }))
                    .map(|(name, member)| (name.clone(), member.ty))
                    .collect()
            })
            .unwrap_or_default();
        let composite_name = self.type_string(id);
        for (name, field_ty) in fields {
            let optional = matches!(self.cache.get(field_ty), Type::Optional(_));
            if !optional && !self.flow.is_field_initialized(&name) {
                self.report(
                    CheckErrorKind::InvalidInitializer {
                        composite: composite_name.clone(),
                        field: name,
                    }
                    .at(initializer.span),
                );
            }
        }

        self.values.leave();
        self.return_type = saved_return;
        self.initializer_composite = saved_initializer;
        self.flow = saved_flow;
    }
}
