//! Shadow-stack root discovery.
//!
//! Alternative to the scope stack for code generators that emit an
//! explicit frame chain: each compiled function pushes a frame record
//! on entry and pops it on return, and every live reference in the
//! frame occupies one slot. The collector walks the chain newest-first.
//!
//! Semantically equivalent to [`super::ScopeStack`]; both enumerate
//! every live reference at a safepoint through [`super::RootSource`].

use smallvec::SmallVec;

use super::RootSource;
use crate::object::ObjRef;

/// One function frame's root slots.
#[derive(Default)]
pub struct Frame {
    roots: SmallVec<[ObjRef; 8]>,
}

impl Frame {
    /// Number of slots in this frame.
    #[inline]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// True if the frame registered no roots.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// The chain of frame records, newest last.
pub struct ShadowStack {
    frames: Vec<Frame>,
}

impl ShadowStack {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Push a frame record for a function entry.
    pub fn push_frame(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Pop the newest frame on function exit.
    pub fn pop_frame(&mut self) {
        assert!(
            self.frames.pop().is_some(),
            "pop_frame with no active frame"
        );
    }

    /// Record a live reference in the newest frame, returning its slot.
    pub fn add_root(&mut self, obj: ObjRef) -> usize {
        let frame = self
            .frames
            .last_mut()
            .unwrap_or_else(|| panic!("add_root with no active frame"));
        frame.roots.push(obj);
        frame.roots.len() - 1
    }

    /// Read back slot `index` of the newest frame.
    pub fn root(&self, index: usize) -> ObjRef {
        let frame = self
            .frames
            .last()
            .unwrap_or_else(|| panic!("root read with no active frame"));
        frame.roots[index]
    }

    /// Number of frames in the chain.
    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

impl Default for ShadowStack {
    fn default() -> Self {
        Self::new()
    }
}

impl RootSource for ShadowStack {
    fn visit_roots(&mut self, visitor: &mut dyn FnMut(&mut ObjRef)) {
        for frame in self.frames.iter_mut().rev() {
            for slot in frame.roots.iter_mut() {
                visitor(slot);
            }
        }
    }
}
