//! Root discovery.
//!
//! At a safepoint (every allocation) the collector must be able to
//! enumerate every live reference the mutator holds. The primary
//! mechanism is the scope stack: generated code opens a scope on entry
//! to any region that may allocate, registers each reference it keeps
//! across an allocation, and re-reads registered references by slot
//! index afterwards.
//!
//! Root enumeration is behind the [`RootSource`] trait so alternative
//! discovery schemes (the shadow-stack chain in [`shadow`]) plug into
//! the same marker.

pub mod shadow;

pub use shadow::ShadowStack;

use smallvec::SmallVec;

use crate::object::ObjRef;

/// Slot index returned by root registration.
pub type RootIndex = usize;

/// Enumerate every live reference slot at a safepoint.
///
/// The visitor receives mutable access to each slot so a relocating
/// collector could rewrite roots in place; the current collectors only
/// read them.
pub trait RootSource {
    /// Invoke `visitor` on every registered slot, newest scope first.
    fn visit_roots(&mut self, visitor: &mut dyn FnMut(&mut ObjRef));
}

/// Per-scope slot vector. Most scopes hold a handful of roots.
type Slots = SmallVec<[ObjRef; 8]>;

/// The mutator's stack of root scopes.
///
/// Scopes nest: each `push_scope` extends the chain, each `pop_scope`
/// restores the parent. Registration and read-back address the
/// innermost scope only.
pub struct ScopeStack {
    scopes: Vec<Slots>,
}

impl ScopeStack {
    /// Create an empty stack (no active scope).
    pub fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    /// Number of active scopes.
    #[inline]
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Open a new innermost scope.
    pub fn push_scope(&mut self) {
        self.scopes.push(Slots::new());
    }

    /// Close the innermost scope, dropping its registrations.
    ///
    /// Panics if no scope is active; an unbalanced pop is a mutator
    /// bug, not a recoverable condition.
    pub fn pop_scope(&mut self) {
        assert!(
            self.scopes.pop().is_some(),
            "pop_scope with no active root scope"
        );
    }

    /// Register `obj` in the innermost scope, returning its slot index.
    pub fn reg_root(&mut self, obj: ObjRef) -> RootIndex {
        let scope = self
            .scopes
            .last_mut()
            .unwrap_or_else(|| panic!("reg_root with no active root scope"));
        scope.push(obj);
        scope.len() - 1
    }

    /// Read back slot `index` of the innermost scope.
    pub fn root(&self, index: RootIndex) -> ObjRef {
        let scope = self
            .scopes
            .last()
            .unwrap_or_else(|| panic!("root read with no active root scope"));
        scope[index]
    }

    /// Overwrite slot `index` of the innermost scope.
    pub fn set_root(&mut self, index: RootIndex, obj: ObjRef) {
        let scope = self
            .scopes
            .last_mut()
            .unwrap_or_else(|| panic!("root write with no active root scope"));
        scope[index] = obj;
    }

    /// Number of slots in the innermost scope.
    pub fn current_len(&self) -> usize {
        self.scopes.last().map_or(0, |s| s.len())
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl RootSource for ScopeStack {
    fn visit_roots(&mut self, visitor: &mut dyn FnMut(&mut ObjRef)) {
        // Innermost scope first, then each parent up the chain.
        for scope in self.scopes.iter_mut().rev() {
            for slot in scope.iter_mut() {
                visitor(slot);
            }
        }
    }
}
