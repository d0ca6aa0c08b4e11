//! The semantic checker.
//!
//! Given an AST, a base activation of predeclared values, and a
//! configuration, checking produces either a [`CheckedProgram`] (the
//! program together with its elaboration, type arena, and nominal
//! registry) or a non-empty batch of structured errors. Checking never
//! panics on user input.

mod activations;
mod checker;
mod collect;
mod conformance;
mod decls;
mod elaboration;
mod errors;
mod flow;

pub use activations::Activation;
pub use elaboration::{Elaboration, ResolvedMember};
pub use errors::{CheckError, CheckErrorKind};
pub use flow::DefId;

use tracing::debug;

use crate::ast::Program;
use crate::common::Location;
use crate::sema::checker::{BindingKind, Checker, VarInfo};
use crate::types::{NominalRegistry, TypeCache, TypeId};

#[derive(Debug, Clone, Default)]
pub struct CheckerConfig {
    /// Permit function declarations without bodies outside interfaces.
    /// Used for host-implemented (native) declarations such as the `Test`
    /// contract surface.
    pub allow_native_declarations: bool,
}

/// Predeclared value bindings available to a program before any of its own
/// declarations, e.g. `assert` and `panic`. Types are built inside the
/// checker's own arena, so entries are type builders rather than types.
#[derive(Default)]
pub struct BaseActivation {
    entries: Vec<(String, fn(&mut TypeCache) -> TypeId)>,
}

impl BaseActivation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: impl Into<String>, make_type: fn(&mut TypeCache) -> TypeId) {
        self.entries.push((name.into(), make_type));
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

/// The output of successful checking, consumed by the interpreter.
#[derive(Debug, Clone)]
pub struct CheckedProgram {
    pub program: Program,
    pub location: Location,
    pub elaboration: Elaboration,
    pub cache: TypeCache,
    pub registry: NominalRegistry,
}

pub fn check_program(
    program: Program,
    location: Location,
    base: &BaseActivation,
    config: CheckerConfig,
) -> Result<CheckedProgram, Vec<CheckError>> {
    debug!(location = %location, "checking program");

    let mut checker = Checker::new(location.clone(), config);

    for (name, make_type) in &base.entries {
        let ty = make_type(&mut checker.cache);
        let def = checker.new_def(name);
        checker.values.declare(
            name.clone(),
            VarInfo {
                ty,
                kind: BindingKind::Function,
                def,
            },
        );
    }

    checker.collect_declarations(&program.declarations);
    checker.resolve_declarations(&program.declarations);
    checker.check_declarations(&program.declarations);

    if checker.errors.is_empty() {
        Ok(CheckedProgram {
            program,
            location,
            elaboration: checker.elaboration,
            cache: checker.cache,
            registry: checker.registry,
        })
    } else {
        debug!(errors = checker.errors.len(), "checking failed");
        Err(checker.errors)
    }
}

#[cfg(test)]
#[path = "../tests/sema/t_conformance.rs"]
mod conformance_tests;

#[cfg(test)]
#[path = "../tests/sema/t_resources.rs"]
mod resource_tests;

#[cfg(test)]
#[path = "../tests/sema/t_checker.rs"]
mod checker_tests;

#[cfg(test)]
#[path = "../tests/sema/t_subtyping.rs"]
mod subtyping_tests;
