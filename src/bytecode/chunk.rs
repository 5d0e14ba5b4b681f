use serde::{Deserialize, Serialize};

use crate::bytecode::{Op, Word};

/// Value stored in a reserved word until it is patched.
pub const PLACEHOLDER: Word = -1;

/// A compiled program: one flat, growable sequence of words.
///
/// Every address stored in the chunk (jump targets, call entries) is an
/// absolute index into `code`, so the chunk is position independent and
/// reallocation never invalidates anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    code: Vec<Word>,
}

impl Chunk {
    pub fn new() -> Self {
        Self { code: Vec::new() }
    }

    pub fn from_words(code: Vec<Word>) -> Self {
        Self { code }
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn words(&self) -> &[Word] {
        &self.code
    }

    pub fn get(&self, index: usize) -> Option<Word> {
        self.code.get(index).copied()
    }

    pub fn write(&mut self, word: Word) {
        self.code.push(word);
    }

    pub fn write_op(&mut self, op: Op) {
        self.write(op.word());
    }

    /// Appends a placeholder word and returns its index for a later `patch`.
    pub fn reserve(&mut self) -> usize {
        self.code.push(PLACEHOLDER);
        self.code.len() - 1
    }

    /// Overwrites a previously reserved word.
    pub fn patch(&mut self, index: usize, word: Word) {
        debug_assert_eq!(self.code[index], PLACEHOLDER, "patching a word that was not reserved");
        self.code[index] = word;
    }

    /// Encodes the chunk as a standalone artifact.
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}
