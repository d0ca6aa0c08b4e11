//! Member tables for nominal types.
//!
//! The type arena stores only the identity of a composite or interface; the
//! registry holds what the checker learned about it: members, nested
//! declarations, initializers, and declared conformances.

use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::ast::{CompositeKind, VariableKind};
use crate::diag::Span;
use crate::types::TypeId;

/// The resolved access of a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberAccess {
    SelfOnly,
    Contract,
    Account,
    All,
    Entitlements(BTreeSet<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberKind {
    Field {
        kind: VariableKind,
    },
    Function {
        /// Interface members with a default body need no conforming
        /// implementation.
        has_body: bool,
    },
}

#[derive(Debug, Clone)]
pub struct Member {
    pub identifier: String,
    pub access: MemberAccess,
    pub kind: MemberKind,
    /// Field type, or the function type for function members.
    pub ty: TypeId,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ParamSig {
    pub label: Option<String>,
    pub identifier: String,
    pub ty: TypeId,
}

#[derive(Debug, Clone)]
pub struct InitializerSig {
    pub parameters: Vec<ParamSig>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct NominalEntry {
    pub kind: CompositeKind,
    pub is_interface: bool,
    /// Interface types this composite declares conformance to.
    pub conformances: Vec<TypeId>,
    pub members: IndexMap<String, Member>,
    /// Event declarations, kept apart from members: they impose no
    /// conformance obligations.
    pub events: IndexMap<String, Vec<ParamSig>>,
    /// Nested composite/interface declarations by simple name.
    pub nested: IndexMap<String, TypeId>,
    pub initializers: Vec<InitializerSig>,
    /// Leading documentation comment text of the declaration, one entry
    /// per doc comment, delimiters stripped.
    pub docs: Vec<String>,
}

impl NominalEntry {
    pub fn new(kind: CompositeKind, is_interface: bool) -> Self {
        Self {
            kind,
            is_interface,
            conformances: Vec::new(),
            members: IndexMap::new(),
            events: IndexMap::new(),
            nested: IndexMap::new(),
            initializers: Vec::new(),
            docs: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct NominalRegistry {
    entries: IndexMap<TypeId, NominalEntry>,
}

impl NominalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: TypeId, entry: NominalEntry) {
        self.entries.insert(id, entry);
    }

    pub fn get(&self, id: TypeId) -> Option<&NominalEntry> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: TypeId) -> Option<&mut NominalEntry> {
        self.entries.get_mut(&id)
    }

    pub fn contains(&self, id: TypeId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn member(&self, id: TypeId, name: &str) -> Option<&Member> {
        self.entries.get(&id)?.members.get(name)
    }

    /// Declared conformances of a nominal type; empty for unknown ids.
    pub fn conformances(&self, id: TypeId) -> &[TypeId] {
        self.entries
            .get(&id)
            .map(|entry| entry.conformances.as_slice())
            .unwrap_or(&[])
    }

    pub fn ids(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.entries.keys().copied()
    }
}
