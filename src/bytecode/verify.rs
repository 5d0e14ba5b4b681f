use thiserror::Error;

use crate::bytecode::{Chunk, Op, Word};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("unknown opcode {word} at {at}")]
    UnknownOpcode { at: usize, word: Word },

    #[error("{op} at {at} is missing operand words")]
    Truncated { at: usize, op: Op },

    #[error("{op} at {at} targets {target}, outside the chunk")]
    TargetOutOfRange { at: usize, op: Op, target: Word },

    #[error("{op} at {at} targets {target}, which is not the start of an instruction")]
    MisalignedTarget { at: usize, op: Op, target: Word },

    #[error("{op} at {at} has negative operand {value}")]
    NegativeOperand { at: usize, op: Op, value: Word },
}

/// One decoded instruction: its address, opcode and immediate operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction<'a> {
    pub at: usize,
    pub op: Op,
    pub operands: &'a [Word],
}

/// Splits a chunk into instructions, checking opcodes and operand widths.
pub fn decode(chunk: &Chunk) -> Result<Vec<Instruction<'_>>, VerifyError> {
    let words = chunk.words();
    let mut instructions = Vec::new();
    let mut at = 0;

    while at < words.len() {
        let word = words[at];
        let op = Op::from_word(word).ok_or(VerifyError::UnknownOpcode { at, word })?;
        let end = at + op.width();
        if end > words.len() {
            return Err(VerifyError::Truncated { at, op });
        }
        instructions.push(Instruction {
            at,
            op,
            operands: &words[at + 1..end],
        });
        at = end;
    }

    Ok(instructions)
}

/// Checks that a chunk is well formed before it is executed.
///
/// This is structural only: opcodes decode, operands are present and
/// non-negative where they count or index something, and every jump or call
/// target lands on an instruction boundary (or exactly at the end).
/// It does not re-check types; the compiler has already done that.
pub fn verify_chunk(chunk: &Chunk) -> Result<(), VerifyError> {
    let instructions = decode(chunk)?;

    let len = chunk.len();
    let mut boundary = vec![false; len + 1];
    boundary[len] = true;
    for ins in &instructions {
        boundary[ins.at] = true;
    }

    for ins in &instructions {
        match ins.op {
            Op::Load | Op::Store | Op::Return => {
                non_negative(ins, ins.operands[0])?;
            }
            Op::Call => {
                non_negative(ins, ins.operands[1])?;
            }
            _ => {}
        }

        if ins.op.has_target() {
            let target = ins.operands[0];
            let index = usize::try_from(target)
                .ok()
                .filter(|t| *t <= len)
                .ok_or(VerifyError::TargetOutOfRange {
                    at: ins.at,
                    op: ins.op,
                    target,
                })?;
            if !boundary[index] {
                return Err(VerifyError::MisalignedTarget {
                    at: ins.at,
                    op: ins.op,
                    target,
                });
            }
        }
    }

    Ok(())
}

fn non_negative(ins: &Instruction<'_>, value: Word) -> Result<(), VerifyError> {
    if value < 0 {
        return Err(VerifyError::NegativeOperand {
            at: ins.at,
            op: ins.op,
            value,
        });
    }
    Ok(())
}
