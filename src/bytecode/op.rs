use serde::{Deserialize, Serialize};

use crate::bytecode::Word;

// =============================================================================
// OP - Bytecode instructions
// =============================================================================

/// Opcode word. Each opcode is followed by a fixed number of immediate
/// operand words, given by [`Op::operand_count`]; the count is never encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Op {
    Noop = 0,
    /// Halts the VM.
    Exit = 1,
    Pop = 2,

    // literals
    /// `PUSH_INTEGER n`
    PushInteger = 3,
    PushTrue = 4,
    PushFalse = 5,

    // locals, addressed relative to the frame base
    /// `LOAD slot`
    Load = 6,
    /// `STORE slot`
    Store = 7,

    // output
    PrintInteger = 8,
    PrintBoolean = 9,

    // arithmetic
    Add = 10,
    Sub = 11,
    Mul = 12,
    Div = 13,
    Negate = 14,

    // comparison
    Equal = 15,
    NotEqual = 16,
    Less = 17,
    LessEqual = 18,
    Greater = 19,
    GreaterEqual = 20,

    // control flow, all targets are absolute word indices
    /// `JUMP dest`
    Jump = 21,
    /// `JUMP_IF_FALSE dest`, pops the condition.
    JumpIfFalse = 22,
    /// `CALL entry arg_count`
    Call = 23,
    /// `RETURN local_count`
    Return = 24,
}

impl Op {
    pub const ALL: [Op; 25] = [
        Op::Noop,
        Op::Exit,
        Op::Pop,
        Op::PushInteger,
        Op::PushTrue,
        Op::PushFalse,
        Op::Load,
        Op::Store,
        Op::PrintInteger,
        Op::PrintBoolean,
        Op::Add,
        Op::Sub,
        Op::Mul,
        Op::Div,
        Op::Negate,
        Op::Equal,
        Op::NotEqual,
        Op::Less,
        Op::LessEqual,
        Op::Greater,
        Op::GreaterEqual,
        Op::Jump,
        Op::JumpIfFalse,
        Op::Call,
        Op::Return,
    ];

    /// Number of immediate words that follow the opcode word.
    pub fn operand_count(self) -> usize {
        match self {
            Op::PushInteger | Op::Load | Op::Store | Op::Jump | Op::JumpIfFalse | Op::Return => 1,
            Op::Call => 2,
            _ => 0,
        }
    }

    /// Total width of the instruction in words.
    pub fn width(self) -> usize {
        1 + self.operand_count()
    }

    pub fn word(self) -> Word {
        self as u8 as Word
    }

    pub fn from_word(word: Word) -> Option<Op> {
        usize::try_from(word)
            .ok()
            .and_then(|index| Op::ALL.get(index).copied())
    }

    /// Returns (pops, pushes) on the operand stack, or None when the effect
    /// depends on the call frame.
    pub fn stack_effect(self) -> Option<(usize, usize)> {
        use Op::*;
        Some(match self {
            Noop => (0, 0),
            Pop => (1, 0),

            PushInteger | PushTrue | PushFalse => (0, 1),
            Load => (0, 1),
            Store => (1, 0),

            PrintInteger | PrintBoolean => (1, 0),

            Add | Sub | Mul | Div => (2, 1),
            Negate => (1, 1),

            Equal | NotEqual | Less | LessEqual | Greater | GreaterEqual => (2, 1),

            Jump => (0, 0),
            JumpIfFalse => (1, 0),

            Exit | Call | Return => return None,
        })
    }

    /// True for instructions whose first operand is an absolute chunk address.
    pub fn has_target(self) -> bool {
        matches!(self, Op::Jump | Op::JumpIfFalse | Op::Call)
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Op::Noop => "NOOP",
            Op::Exit => "EXIT",
            Op::Pop => "POP",
            Op::PushInteger => "PUSH_INTEGER",
            Op::PushTrue => "PUSH_TRUE",
            Op::PushFalse => "PUSH_FALSE",
            Op::Load => "LOAD",
            Op::Store => "STORE",
            Op::PrintInteger => "PRINT_INTEGER",
            Op::PrintBoolean => "PRINT_BOOLEAN",
            Op::Add => "ADD",
            Op::Sub => "SUB",
            Op::Mul => "MUL",
            Op::Div => "DIV",
            Op::Negate => "NEGATE",
            Op::Equal => "EQUAL",
            Op::NotEqual => "NOT_EQUAL",
            Op::Less => "LESS",
            Op::LessEqual => "LESS_EQUAL",
            Op::Greater => "GREATER",
            Op::GreaterEqual => "GREATER_EQUAL",
            Op::Jump => "JUMP",
            Op::JumpIfFalse => "JUMP_IF_FALSE",
            Op::Call => "CALL",
            Op::Return => "RETURN",
        }
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_roundtrip_for_every_op() {
        for op in Op::ALL {
            assert_eq!(Op::from_word(op.word()), Some(op));
        }
    }

    #[test]
    fn test_all_is_indexed_by_discriminant() {
        for (i, op) in Op::ALL.iter().enumerate() {
            assert_eq!(op.word(), i as Word);
        }
    }

    #[test]
    fn test_invalid_words() {
        assert_eq!(Op::from_word(-1), None);
        assert_eq!(Op::from_word(Op::ALL.len() as Word), None);
        assert_eq!(Op::from_word(Word::MAX), None);
    }

    #[test]
    fn test_operand_counts() {
        assert_eq!(Op::Exit.operand_count(), 0);
        assert_eq!(Op::PushInteger.operand_count(), 1);
        assert_eq!(Op::JumpIfFalse.operand_count(), 1);
        assert_eq!(Op::Return.operand_count(), 1);
        assert_eq!(Op::Call.operand_count(), 2);
        assert_eq!(Op::Call.width(), 3);
    }

    #[test]
    fn test_stack_effects() {
        assert_eq!(Op::Sub.stack_effect(), Some((2, 1)));
        assert_eq!(Op::Less.stack_effect(), Some((2, 1)));
        assert_eq!(Op::Negate.stack_effect(), Some((1, 1)));
        assert_eq!(Op::Store.stack_effect(), Some((1, 0)));
        assert_eq!(Op::Call.stack_effect(), None);
        assert_eq!(Op::Return.stack_effect(), None);
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(Op::JumpIfFalse.to_string(), "JUMP_IF_FALSE");
        assert_eq!(Op::GreaterEqual.mnemonic(), "GREATER_EQUAL");
    }
}
