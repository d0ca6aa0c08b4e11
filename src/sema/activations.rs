//! Lexical activations: stackable, forkable scopes for values and types.

use indexmap::IndexMap;

/// A stack of scope frames mapping names to entries. Used both for value
/// bindings (variables, functions) and for type bindings during checking,
/// and again for variable bindings during execution.
#[derive(Debug, Clone)]
pub struct Activation<V> {
    frames: Vec<IndexMap<String, V>>,
}

impl<V> Default for Activation<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Activation<V> {
    pub fn new() -> Self {
        Self {
            frames: vec![IndexMap::new()],
        }
    }

    pub fn enter(&mut self) {
        self.frames.push(IndexMap::new());
    }

    pub fn leave(&mut self) {
        debug_assert!(self.frames.len() > 1, "cannot leave the root frame");
        self.frames.pop();
    }

    /// Declares a name in the innermost frame. Returns the previous entry
    /// if the name was already declared *in the same frame* (shadowing an
    /// outer frame is not a redeclaration).
    pub fn declare(&mut self, name: impl Into<String>, value: V) -> Option<V> {
        self.frames
            .last_mut()
            .expect("activation has at least one frame")
            .insert(name.into(), value)
    }

    pub fn resolve(&self, name: &str) -> Option<&V> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    pub fn resolve_mut(&mut self, name: &str) -> Option<&mut V> {
        self.frames
            .iter_mut()
            .rev()
            .find_map(|frame| frame.get_mut(name))
    }

    pub fn declared_in_current_frame(&self, name: &str) -> bool {
        self.frames
            .last()
            .map(|frame| frame.contains_key(name))
            .unwrap_or(false)
    }

    /// Names declared in the innermost frame, in declaration order.
    pub fn current_frame(&self) -> impl Iterator<Item = (&String, &V)> {
        self.frames.last().into_iter().flat_map(|frame| frame.iter())
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

impl<V: Clone> Activation<V> {
    /// An independent copy of the current scope stack, for checking
    /// diverging control-flow branches against the same starting state.
    pub fn fork(&self) -> Self {
        self.clone()
    }
}
