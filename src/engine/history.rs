// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Undo/redo snapshots for a single edit session.
//!
//! History never outlives the session that owns it; committed layers are
//! immutable and have no history of their own.

/// Maximum number of snapshots kept on the undo stack.
pub const MAX_HISTORY: usize = 50;

/// Snapshot-based undo/redo stacks.
#[derive(Debug, Clone)]
pub struct History<T> {
    /// Undo stack (past states)
    undo_stack: Vec<T>,
    /// Redo stack (future states after undo)
    redo_stack: Vec<T>,
    max_size: usize,
}

impl<T> Default for History<T> {
    fn default() -> Self {
        Self::new(MAX_HISTORY)
    }
}

impl<T> History<T> {
    pub fn new(max_size: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_size: max_size.max(1),
        }
    }

    /// Save the current state before making a change.
    pub fn push(&mut self, state: T) {
        self.undo_stack.push(state);
        if self.undo_stack.len() > self.max_size {
            self.undo_stack.remove(0);
        }
        // A new action invalidates anything that was undone.
        self.redo_stack.clear();
    }

    /// Restore the previous state, parking `current` for redo.
    pub fn undo(&mut self, current: T) -> Result<T, T> {
        match self.undo_stack.pop() {
            Some(previous) => {
                self.redo_stack.push(current);
                Ok(previous)
            }
            None => Err(current),
        }
    }

    /// Restore the next state, parking `current` for undo.
    pub fn redo(&mut self, current: T) -> Result<T, T> {
        match self.redo_stack.pop() {
            Some(next) => {
                self.undo_stack.push(current);
                Ok(next)
            }
            None => Err(current),
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
