//! Conformance checking.
//!
//! One conformance error is reported per (composite, interface) pair,
//! carrying a note for each mismatched member and a combined note for
//! missing members and missing nested type requirements. Events impose no
//! obligations.

use crate::ast::CompositeDeclaration;
use crate::diag::ErrorNote;
use crate::sema::checker::Checker;
use crate::sema::errors::CheckErrorKind;
use crate::types::{is_subtype, Member, MemberKind, Type, TypeId};

impl Checker {
    pub(crate) fn check_conformances(&mut self, declaration: &CompositeDeclaration, id: TypeId) {
        let conformances = self.registry.conformances(id).to_vec();
        for interface in conformances {
            self.check_conformance(declaration, id, interface);
        }
    }

    fn check_conformance(
        &mut self,
        declaration: &CompositeDeclaration,
        composite: TypeId,
        interface: TypeId,
    ) {
        let Some(interface_entry) = self.registry.get(interface) else {
            return;
        };

        let mut missing_members: Vec<String> = Vec::new();
        let mut missing_types: Vec<String> = Vec::new();
        let mut notes: Vec<ErrorNote> = Vec::new();

        let interface_members: Vec<Member> = interface_entry.members.values().cloned().collect();
        let interface_nested: Vec<(String, TypeId)> = interface_entry
            .nested
            .iter()
            .map(|(name, nested)| (name.clone(), *nested))
            .collect();
        let interface_initializers = interface_entry.initializers.clone();
        let interface_name = self.simple_name(interface);
        let interface_kind = interface_entry.kind.keyword();

        for requirement in interface_members {
            match self.registry.member(composite, &requirement.identifier).cloned() {
                None => {
                    let has_default =
                        matches!(requirement.kind, MemberKind::Function { has_body: true });
                    if !has_default {
                        missing_members.push(requirement.identifier.clone());
                    }
                }
                Some(member) => {
                    if let Some(note) = self.member_conformance_note(&requirement, &member) {
                        notes.push(note);
                    }
                }
            }
        }

        // Nested type declarations of the interface are type requirements:
        // the composite must declare a nested type of the same name and
        // kind.
        for (name, required) in interface_nested {
            let required_kind = self.registry.get(required).map(|entry| entry.kind);
            let actual = self
                .registry
                .get(composite)
                .and_then(|entry| entry.nested.get(&name).copied());
            let satisfied = match actual {
                Some(actual_id) => {
                    self.registry.get(actual_id).map(|entry| entry.kind) == required_kind
                }
                None => false,
            };
            if !satisfied {
                missing_types.push(format!("{interface_name}.{name}"));
            }
        }

        // Initializer requirements: parameter types invariant, labels
        // identical.
        if let Some(requirement) = interface_initializers.first() {
            let initializers = self
                .registry
                .get(composite)
                .map(|entry| entry.initializers.clone())
                .unwrap_or_default();
            let matches = initializers.iter().any(|initializer| {
                initializer.parameters.len() == requirement.parameters.len()
                    && initializer
                        .parameters
                        .iter()
                        .zip(&requirement.parameters)
                        .all(|(actual, required)| {
                            actual.label == required.label && actual.ty == required.ty
                        })
            });
            if !matches {
                let span = initializers
                    .first()
                    .map(|initializer| initializer.span)
                    .unwrap_or(declaration.identifier.span);
                notes.push(ErrorNote::new(
                    format!(
                        "initializer of `{}` does not match the initializer requirement of `{}`",
                        declaration.identifier.name, interface_name,
                    ),
                    span,
                ));
            }
        }

        if let Some(note) = self.missing_definitions_note(
            &declaration.identifier.name,
            &missing_members,
            &missing_types,
            declaration.identifier.span,
        ) {
            notes.push(note);
        }

        if notes.is_empty() && missing_members.is_empty() && missing_types.is_empty() {
            return;
        }

        self.report(
            CheckErrorKind::Conformance {
                composite: declaration.identifier.name.clone(),
                interface: interface_name,
                interface_kind,
            }
            .at(declaration.identifier.span)
            .with_notes(notes),
        );
    }

    /// A note describing why a declared member does not satisfy the
    /// interface requirement, or `None` when it conforms: identical
    /// argument labels, invariant parameter types, covariant return type,
    /// identical field types.
    fn member_conformance_note(&self, requirement: &Member, member: &Member) -> Option<ErrorNote> {
        match (&requirement.kind, &member.kind) {
            (MemberKind::Field { kind: required_kind }, MemberKind::Field { kind }) => {
                if requirement.ty != member.ty || required_kind != kind {
                    return Some(ErrorNote::new(
                        format!(
                            "field `{}` does not match the declaration in the interface",
                            member.identifier,
                        ),
                        member.span,
                    ));
                }
                None
            }
            (MemberKind::Function { .. }, MemberKind::Function { .. }) => {
                let (Type::Function(required), Type::Function(actual)) = (
                    self.cache.get(requirement.ty),
                    self.cache.get(member.ty),
                ) else {
                    return None;
                };

                let labels_match = required.parameters.len() == actual.parameters.len()
                    && required
                        .parameters
                        .iter()
                        .zip(&actual.parameters)
                        .all(|(required, actual)| required.label == actual.label);
                let parameters_match = labels_match
                    && required
                        .parameters
                        .iter()
                        .zip(&actual.parameters)
                        .all(|(required, actual)| required.ty == actual.ty);
                let return_matches = is_subtype(
                    &self.cache,
                    &self.registry,
                    actual.return_type,
                    required.return_type,
                );

                if !labels_match || !parameters_match || !return_matches {
                    return Some(ErrorNote::new(
                        format!(
                            "function `{}` does not match the declaration in the interface",
                            member.identifier,
                        ),
                        member.span,
                    ));
                }
                None
            }
            _ => Some(ErrorNote::new(
                format!(
                    "member `{}` has a different kind than the declaration in the interface",
                    member.identifier,
                ),
                member.span,
            )),
        }
    }

    fn missing_definitions_note(
        &self,
        composite_name: &str,
        missing_members: &[String],
        missing_types: &[String],
        span: crate::diag::Span,
    ) -> Option<ErrorNote> {
        let members_sentence = if missing_members.is_empty() {
            None
        } else {
            Some(format!(
                "`{}` is missing definitions for members: `{}`",
                composite_name,
                missing_members.join("`, `"),
            ))
        };
        let types_sentence = if missing_types.is_empty() {
            None
        } else if members_sentence.is_some() {
            Some(format!(
                "`{}` is also missing definitions for types: `{}`",
                composite_name,
                missing_types.join("`, `"),
            ))
        } else {
            Some(format!(
                "`{}` is missing definitions for types: `{}`",
                composite_name,
                missing_types.join("`, `"),
            ))
        };

        let message = match (members_sentence, types_sentence) {
            (Some(members), Some(types)) => format!("{members}. {types}"),
            (Some(members), None) => members,
            (None, Some(types)) => types,
            (None, None) => return None,
        };
        Some(ErrorNote::new(message, span))
    }

    fn simple_name(&self, id: TypeId) -> String {
        self.cache
            .get(id)
            .nominal_key()
            .map(|key| key.qualified_identifier.clone())
            .unwrap_or_else(|| self.type_string(id))
    }
}
