//! The memory/computation meter.
//!
//! Polled on every value allocation and every statement boundary. On
//! exhaustion the current call stack unwinds with a `LimitExceeded` user
//! error; scoped state is released by the unwind itself.

use crate::diag::Span;
use crate::interpreter::errors::{RuntimeError, UserErrorKind};

#[derive(Debug, Clone, Copy, Default)]
pub struct MeterLimits {
    /// Maximum metered memory units; `None` is unlimited.
    pub memory: Option<u64>,
    /// Maximum statement executions; `None` is unlimited.
    pub computation: Option<u64>,
}

#[derive(Debug, Default)]
pub struct Meter {
    limits: MeterLimits,
    memory_used: u64,
    computation_used: u64,
}

impl Meter {
    pub fn new(limits: MeterLimits) -> Self {
        Self {
            limits,
            memory_used: 0,
            computation_used: 0,
        }
    }

    pub fn use_memory(&mut self, amount: u64, span: Span) -> Result<(), RuntimeError> {
        self.memory_used = self.memory_used.saturating_add(amount);
        if let Some(limit) = self.limits.memory
            && self.memory_used > limit
        {
            return Err(UserErrorKind::LimitExceeded { kind: "memory" }.at(span));
        }
        Ok(())
    }

    pub fn tick_statement(&mut self, span: Span) -> Result<(), RuntimeError> {
        self.computation_used = self.computation_used.saturating_add(1);
        if let Some(limit) = self.limits.computation
            && self.computation_used > limit
        {
            return Err(UserErrorKind::LimitExceeded {
                kind: "computation",
            }
            .at(span));
        }
        Ok(())
    }

    pub fn memory_used(&self) -> u64 {
        self.memory_used
    }

    pub fn computation_used(&self) -> u64 {
        self.computation_used
    }
}
