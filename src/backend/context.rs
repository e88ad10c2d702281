//! Per-function emission context.

use std::collections::HashMap;

use crate::ast::VarId;

/// Maps each local variable of the function being emitted to its slot.
/// Parameters carry their index in their own storage kind and globals go
/// through field handles, so only locals need a table here.
#[derive(Debug, Default)]
pub struct FunctionContext {
    slots: HashMap<VarId, u16>,
}

impl FunctionContext {
    pub fn new() -> FunctionContext {
        FunctionContext::default()
    }

    pub fn assign_slot(&mut self, var: VarId, slot: u16) {
        self.slots.insert(var, slot);
    }

    pub fn slot(&self, var: VarId) -> u16 {
        *self
            .slots
            .get(&var)
            .expect("local variable has no emitted slot")
    }
}
