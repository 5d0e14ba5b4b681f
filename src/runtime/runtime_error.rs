use thiserror::Error;

use crate::bytecode::{Op, Word, verify::VerifyError};

/// Failure while executing a chunk. `ip` is the address of the instruction
/// being executed when the error was raised.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("division by zero at {ip}")]
    DivisionByZero { ip: usize },

    #[error("integer overflow in {op} at {ip}")]
    IntegerOverflow { ip: usize, op: Op },

    #[error("stack underflow at {ip}")]
    StackUnderflow { ip: usize },

    #[error("operand stack limit exceeded ({limit}) at {ip}")]
    StackOverflow { ip: usize, limit: usize },

    #[error("call depth limit exceeded ({limit}) at {ip}, possible infinite recursion")]
    FrameOverflow { ip: usize, limit: usize },

    #[error("return without a call frame at {ip}")]
    FrameUnderflow { ip: usize },

    #[error("slot {slot} is outside the current frame at {ip}")]
    InvalidSlot { ip: usize, slot: Word },

    #[error("instruction pointer {ip} is outside the chunk")]
    InstructionOutOfBounds { ip: usize },

    #[error("execution step limit exceeded ({limit})")]
    StepLimitExceeded { limit: u64 },

    #[error("malformed chunk: {0}")]
    Malformed(#[from] VerifyError),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}
