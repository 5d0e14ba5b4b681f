use serde::{Deserialize, Serialize};

use crate::bytecode::Word;

/// Runtime value: one untagged machine word.
///
/// Integers are stored as-is and booleans as `TRUE`/`FALSE`. Nothing at
/// runtime records which of the two a value is; the compiler picks the
/// print opcode from the static type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Value(pub Word);

impl Value {
    pub const TRUE: Value = Value(1);
    pub const FALSE: Value = Value(0);

    pub fn from_bool(b: bool) -> Self {
        if b { Value::TRUE } else { Value::FALSE }
    }

    pub fn as_integer(self) -> Word {
        self.0
    }

    pub fn as_bool(self) -> bool {
        self.0 != Value::FALSE.0
    }
}

impl From<Word> for Value {
    fn from(word: Word) -> Self {
        Value(word)
    }
}
