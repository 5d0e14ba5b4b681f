//! aquila: a small statically typed language compiled in a single pass to a
//! flat word-encoded chunk and run on a stack VM.
//!
//! ```text
//! func square(n: integer): integer { return n * n; }
//! func main(): integer { print(square(7)); return 0; }
//! ```

pub mod bytecode;
pub mod frontend;
pub mod lang;
pub mod runtime;

use std::io::Write;

pub use bytecode::compile_error::{CompileError, ErrorKind};
pub use bytecode::{Chunk, Op, Word};
pub use lang::{ty::StaticType, value::Value};
pub use runtime::{RuntimeError, Vm, VmConfig};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

pub fn compile_source(source: &str) -> Result<Chunk, CompileError> {
    bytecode::compile::compile(source)
}

/// Compiles and runs `source` with the given limits, writing printed values
/// to `out`. Returns the value `main` returned.
pub fn run_source(source: &str, config: VmConfig, out: &mut impl Write) -> Result<Word, Error> {
    let chunk = compile_source(source)?;
    let mut vm = Vm::with_config(config);
    vm.run(&chunk, out)?;
    Ok(vm.exit_value().map(Value::as_integer).unwrap_or_default())
}
