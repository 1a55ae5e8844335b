//! Script variable scope: a stack of name-to-value frames (spec §3 "Script variable scope").

use meshbatch_core::value::QueryValue;
use std::collections::HashMap;

/// `DECLARE` adds to the current (innermost) frame. `SET` mutates the nearest enclosing
/// definition. Reads walk outward from the innermost frame.
#[derive(Debug, Default)]
pub struct VariableScope {
    frames: Vec<HashMap<String, QueryValue>>,
}

/// Raised by `SET` against a name with no enclosing `DECLARE`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("undefined variable {0}")]
pub struct UndefinedVariable(pub String);

impl VariableScope {
    pub fn new() -> Self {
        Self { frames: vec![HashMap::new()] }
    }

    /// Pushes a new, empty frame (entered on `BEGIN`).
    pub fn push_frame(&mut self) {
        self.frames.push(HashMap::new());
    }

    /// Pops the innermost frame (left on `END`). The root frame is never popped.
    pub fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// `DECLARE @name = value`, bound in the current frame.
    pub fn declare(&mut self, name: impl Into<String>, value: QueryValue) {
        self.frames
            .last_mut()
            .expect("root frame always present")
            .insert(name.into(), value);
    }

    /// `SET @name = value`, mutating the nearest enclosing binding.
    pub fn set(&mut self, name: &str, value: QueryValue) -> Result<(), UndefinedVariable> {
        for frame in self.frames.iter_mut().rev() {
            if let Some(slot) = frame.get_mut(name) {
                *slot = value;
                return Ok(());
            }
        }
        Err(UndefinedVariable(name.to_string()))
    }

    /// Reads a binding, walking outward from the innermost frame.
    pub fn get(&self, name: &str) -> Option<&QueryValue> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }
}
