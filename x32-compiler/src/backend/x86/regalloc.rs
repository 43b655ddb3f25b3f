//! The register pool.
//!
//! Temporaries map one-to-one onto registers for their whole lifetime, so
//! allocation is a free list plus an acquisition-ordered in-use stack. The
//! in-use stack is what `push_state` saves across calls.

use super::abi::Register;
use crate::CompileError;

pub struct RegisterPool {
    /// Free registers; the last entry is handed out next, so `eax` (the
    /// call-result register) goes last.
    free: Vec<Register>,
    /// Registers handed out, in acquisition order.
    in_use: Vec<Register>,
}

impl RegisterPool {
    pub fn new() -> Self {
        Self {
            free: vec![Register::Eax, Register::Ecx, Register::Ebx, Register::Edx],
            in_use: Vec::new(),
        }
    }

    pub fn acquire(&mut self) -> Result<Register, CompileError> {
        match self.free.pop() {
            Some(reg) => {
                self.in_use.push(reg);
                Ok(reg)
            }
            None => Err(CompileError::Internal(
                "expression needs more than four live values at once".to_string(),
            )),
        }
    }

    /// Return a register to the pool. Releasing one this pool never handed
    /// out (or releasing twice) is a no-op.
    pub fn release(&mut self, reg: Register) {
        if let Some(pos) = self.in_use.iter().position(|r| *r == reg) {
            self.in_use.remove(pos);
            self.free.push(reg);
        }
    }

    /// Currently live registers, in acquisition order.
    pub fn in_use(&self) -> &[Register] {
        &self.in_use
    }
}

impl Default for RegisterPool {
    fn default() -> Self {
        Self::new()
    }
}
