//! Shared state read by listeners
//!
//! Written only by the initialization sequence. Listeners hold an `Rc` to
//! this value and read the compiled patterns at event time, so they always
//! see the latest compilation.

use std::cell::RefCell;
use std::rc::Rc;

use sw_core::patterns::CompiledPatterns;

use crate::resources::ResourceCache;

#[derive(Debug, Default)]
pub struct InjectionState {
    pub resources: ResourceCache,
    patterns: RefCell<Rc<CompiledPatterns>>,
}

impl InjectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently published compilation.
    pub fn patterns(&self) -> Rc<CompiledPatterns> {
        Rc::clone(&self.patterns.borrow())
    }

    /// Replace the compiled patterns as a whole.
    pub fn publish(&self, patterns: Rc<CompiledPatterns>) {
        *self.patterns.borrow_mut() = patterns;
    }
}
