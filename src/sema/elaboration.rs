//! The elaboration: everything the checker resolved, keyed by node
//! identity, for the interpreter to look up instead of recompute.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::ast::{CastKind, NodeId};
use crate::diag::Span;
use crate::types::TypeId;

/// The member an access expression resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMember {
    /// The container type the member was found on.
    pub container: TypeId,
    pub name: String,
}

#[derive(Debug, Default, Clone)]
pub struct Elaboration {
    expr_types: HashMap<NodeId, TypeId>,
    member_accesses: HashMap<NodeId, ResolvedMember>,
    /// Conformances per composite type, in declaration order.
    conformances: IndexMap<TypeId, Vec<TypeId>>,
    /// Bound type arguments per invocation site, in parameter order.
    call_type_bindings: HashMap<NodeId, Vec<TypeId>>,
    cast_types: HashMap<NodeId, (CastKind, TypeId)>,
    /// The spans at which a resource binding was invalidated, keyed by the
    /// use that invalidated it. Diagnostic side table; the AST stays
    /// untouched.
    invalidations: HashMap<NodeId, Span>,
}

impl Elaboration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_expr_type(&mut self, node: NodeId, ty: TypeId) {
        self.expr_types.insert(node, ty);
    }

    pub fn expr_type(&self, node: NodeId) -> Option<TypeId> {
        self.expr_types.get(&node).copied()
    }

    pub fn record_member_access(&mut self, node: NodeId, member: ResolvedMember) {
        self.member_accesses.insert(node, member);
    }

    pub fn member_access(&self, node: NodeId) -> Option<&ResolvedMember> {
        self.member_accesses.get(&node)
    }

    pub fn record_conformances(&mut self, composite: TypeId, interfaces: Vec<TypeId>) {
        self.conformances.insert(composite, interfaces);
    }

    pub fn conformances(&self, composite: TypeId) -> &[TypeId] {
        self.conformances
            .get(&composite)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn record_call_type_bindings(&mut self, node: NodeId, bindings: Vec<TypeId>) {
        self.call_type_bindings.insert(node, bindings);
    }

    pub fn call_type_bindings(&self, node: NodeId) -> Option<&[TypeId]> {
        self.call_type_bindings.get(&node).map(Vec::as_slice)
    }

    pub fn record_cast_type(&mut self, node: NodeId, kind: CastKind, target: TypeId) {
        self.cast_types.insert(node, (kind, target));
    }

    pub fn cast_type(&self, node: NodeId) -> Option<(CastKind, TypeId)> {
        self.cast_types.get(&node).copied()
    }

    pub fn record_invalidation(&mut self, node: NodeId, span: Span) {
        self.invalidations.insert(node, span);
    }

    pub fn invalidation(&self, node: NodeId) -> Option<Span> {
        self.invalidations.get(&node).copied()
    }
}
