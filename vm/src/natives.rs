//! The standard foreign procedures the `vm` binary registers.

use std::{thread, time::Duration, time::Instant};

use object::Value;

use crate::{ForeignContext, ForeignError, ForeignProcedure, VMBuilder};

pub const SLEEP_ID: u32 = 20;
pub const CLOCK_ID: u32 = 21;

/// `ms ->` blocks the interpreter thread.
#[derive(Debug, Default)]
pub struct Sleep;

impl ForeignProcedure for Sleep {
    fn name(&self) -> &str {
        "Sleep"
    }

    fn param_count(&self) -> usize {
        1
    }

    fn call(&mut self, ctx: &mut ForeignContext<'_>) -> Result<(), ForeignError> {
        let ms = ctx.param(0)?.as_i64();
        let ms = u64::try_from(ms)
            .map_err(|_| ForeignError::new(format!("negative duration {ms} ms")))?;
        thread::sleep(Duration::from_millis(ms));
        Ok(())
    }
}

/// `-> ms` milliseconds since the clock was created.
#[derive(Debug)]
pub struct Clock {
    started: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl ForeignProcedure for Clock {
    fn name(&self) -> &str {
        "Clock"
    }

    fn param_count(&self) -> usize {
        0
    }

    fn call(&mut self, ctx: &mut ForeignContext<'_>) -> Result<(), ForeignError> {
        let ms = self.started.elapsed().as_millis();
        ctx.set_return(Value::from_i64(i64::try_from(ms).unwrap_or(i64::MAX)));
        Ok(())
    }
}

pub fn register_std(builder: VMBuilder) -> VMBuilder {
    builder
        .with_procedure(SLEEP_ID, Box::new(Sleep))
        .with_procedure(CLOCK_ID, Box::new(Clock::new()))
}
