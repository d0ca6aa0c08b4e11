//! Flow-sensitive state for resource invalidation and definite field
//! initialization.
//!
//! Both analyses are must-analyses over the same branch structure: the
//! still-valid resource set and the definitely-initialized field set shrink
//! and grow together, and control-flow joins intersect them. A branch that
//! terminated (returned) does not constrain the join.

use std::collections::HashSet;

/// Identity of a checked variable binding, assigned by the checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefId(pub u32);

#[derive(Debug, Clone, Default)]
pub struct FlowState {
    /// Resource bindings that still hold their value.
    valid_resources: HashSet<DefId>,
    /// Fields of the enclosing composite definitely assigned so far.
    /// Only populated while checking an initializer.
    initialized_fields: HashSet<String>,
    /// Whether this path has definitely returned.
    terminated: bool,
}

impl FlowState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track_resource(&mut self, def: DefId) {
        self.valid_resources.insert(def);
    }

    /// Invalidates a resource binding; returns whether it was still valid.
    pub fn invalidate(&mut self, def: DefId) -> bool {
        self.valid_resources.remove(&def)
    }

    pub fn is_valid(&self, def: DefId) -> bool {
        self.valid_resources.contains(&def)
    }

    pub fn initialize_field(&mut self, name: impl Into<String>) {
        self.initialized_fields.insert(name.into());
    }

    pub fn is_field_initialized(&self, name: &str) -> bool {
        self.initialized_fields.contains(name)
    }

    pub fn terminate(&mut self) {
        self.terminated = true;
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Joins the states of two alternative branches: the intersection of
    /// both must-sets, ignoring branches that terminated.
    pub fn join(self, other: FlowState) -> FlowState {
        match (self.terminated, other.terminated) {
            (true, true) => FlowState {
                terminated: true,
                ..self
            },
            (true, false) => other,
            (false, true) => self,
            (false, false) => FlowState {
                valid_resources: self
                    .valid_resources
                    .intersection(&other.valid_resources)
                    .copied()
                    .collect(),
                initialized_fields: self
                    .initialized_fields
                    .intersection(&other.initialized_fields)
                    .cloned()
                    .collect(),
                terminated: false,
            },
        }
    }

    /// Resource bindings valid in `before` but no longer valid here.
    pub fn invalidated_since(&self, before: &FlowState) -> impl Iterator<Item = DefId> + '_ {
        before
            .valid_resources
            .difference(&self.valid_resources)
            .copied()
            .collect::<Vec<_>>()
            .into_iter()
    }
}
