//! Host procedures callable from bytecode.
//!
//! A foreign procedure is registered under a procedure id. `Call` with that
//! id runs the host routine instead of entering bytecode: it sees the top
//! `param_count` stack slots, may set one return value, and may fail with a
//! message. Any state the routine needs lives in the value implementing
//! [`ForeignProcedure`].

use std::collections::HashMap;

use object::Value;

use crate::{Output, Stack, VmError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ForeignError(pub String);

impl ForeignError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub trait ForeignProcedure {
    fn name(&self) -> &str;
    fn param_count(&self) -> usize;
    fn call(&mut self, ctx: &mut ForeignContext<'_>) -> Result<(), ForeignError>;
}

/// What a foreign procedure can see and do during one call.
pub struct ForeignContext<'a> {
    params: &'a [Value],
    output: &'a mut dyn Output,
    ret: Option<Value>,
}

impl<'a> ForeignContext<'a> {
    pub fn new(params: &'a [Value], output: &'a mut dyn Output) -> Self {
        Self {
            params,
            output,
            ret: None,
        }
    }

    /// Parameters, oldest (first pushed) first.
    pub fn params(&self) -> &[Value] {
        self.params
    }

    pub fn param(&self, index: usize) -> Result<Value, ForeignError> {
        self.params
            .get(index)
            .copied()
            .ok_or_else(|| ForeignError::new(format!("missing parameter {index}")))
    }

    pub fn output(&mut self) -> &mut dyn Output {
        self.output
    }

    pub fn set_return(&mut self, value: Value) {
        self.ret = Some(value);
    }

    pub fn return_value(&self) -> Option<Value> {
        self.ret
    }
}

#[derive(Default)]
pub struct ForeignTable {
    procedures: HashMap<u32, Box<dyn ForeignProcedure>>,
}

impl ForeignTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: u32, procedure: Box<dyn ForeignProcedure>) {
        if let Some(old) = self.procedures.insert(id, procedure) {
            log::warn!("foreign procedure {id} (`{}`) replaced", old.name());
        }
    }

    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }

    /// Run procedure `id` against the top of `stack`.
    ///
    /// Returns `Ok(false)` when no procedure is registered under `id`.
    /// Otherwise the parameters are popped and the return value, if any,
    /// pushed in their place.
    pub fn invoke(
        &mut self,
        id: u32,
        stack: &mut Stack,
        output: &mut dyn Output,
    ) -> Result<bool, VmError> {
        let Some(procedure) = self.procedures.get_mut(&id) else {
            return Ok(false);
        };

        let param_count = procedure.param_count();
        let params = stack.top(param_count)?;
        let mut ctx = ForeignContext::new(params, output);
        procedure
            .call(&mut ctx)
            .map_err(|err| VmError::Foreign {
                procedure: procedure.name().to_string(),
                message: err.0,
            })?;
        let ret = ctx.return_value();

        stack.truncate(stack.sp() - param_count);
        if let Some(value) = ret {
            stack.push(value)?;
        }
        Ok(true)
    }
}

impl core::fmt::Debug for ForeignTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut ids: Vec<_> = self.procedures.keys().collect();
        ids.sort();
        f.debug_struct("ForeignTable").field("ids", &ids).finish()
    }
}
