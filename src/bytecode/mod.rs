pub mod chunk;
pub mod compile;
pub mod compile_error;
pub mod disasm;
pub mod function;
pub mod op;
pub mod scope;
pub mod verify;

pub use chunk::Chunk;
pub use op::Op;

/// Every chunk cell holds one word: an opcode, an immediate operand, an
/// absolute address or a count.
pub type Word = i64;
