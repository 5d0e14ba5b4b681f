use thiserror::Error;

use crate::lang::ty::StaticType;

/// Broad class of a compile error, for callers that only need to branch on
/// what went wrong rather than where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lexical,
    Syntax,
    Type,
    Name,
    Arity,
    EntryPoint,
    Return,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ErrorKind::Lexical => "lexical error",
            ErrorKind::Syntax => "syntax error",
            ErrorKind::Type => "type error",
            ErrorKind::Name => "name error",
            ErrorKind::Arity => "arity error",
            ErrorKind::EntryPoint => "entry point error",
            ErrorKind::Return => "return error",
            ErrorKind::Internal => "internal error",
        };
        f.write_str(text)
    }
}

/// Every compile error is fatal: compilation stops at the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("line {line}: unexpected character '{lexeme}'")]
    UnexpectedCharacter { line: usize, lexeme: String },

    #[error("line {line}: integer literal {lexeme} does not fit in a word")]
    IntegerOutOfRange { line: usize, lexeme: String },

    #[error("line {line}: expected {expected} but found {found}")]
    Syntax {
        line: usize,
        expected: String,
        found: String,
    },

    #[error("line {line}: expected {expected} but found {found}")]
    Type {
        line: usize,
        expected: StaticType,
        found: StaticType,
    },

    #[error("line {line}: undeclared variable '{name}'")]
    UndeclaredVariable { line: usize, name: String },

    #[error("line {line}: variable '{name}' is already declared in this block")]
    DuplicateDeclaration { line: usize, name: String },

    #[error("line {line}: unknown function '{name}'")]
    UnknownFunction { line: usize, name: String },

    #[error("line {line}: function '{name}' is already declared")]
    DuplicateFunction { line: usize, name: String },

    #[error("line {line}: '{function}' expects {expected} argument(s) but received {found}")]
    Arity {
        line: usize,
        function: String,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: argument {position} of '{function}' expects {expected} but found {found}")]
    ArgumentType {
        line: usize,
        function: String,
        position: usize,
        expected: StaticType,
        found: StaticType,
    },

    #[error("no 'main' function")]
    MissingEntryPoint,

    #[error("line {line}: 'main' must take no parameters, found {count}")]
    EntryPointParameters { line: usize, count: usize },

    #[error("line {line}: function '{function}' can reach its end without returning")]
    MissingReturn { line: usize, function: String },

    #[error("line {line}: internal compiler error: {message}")]
    Internal { line: usize, message: String },
}

impl CompileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompileError::UnexpectedCharacter { .. } | CompileError::IntegerOutOfRange { .. } => {
                ErrorKind::Lexical
            }
            CompileError::Syntax { .. } => ErrorKind::Syntax,
            CompileError::Type { .. } => ErrorKind::Type,
            CompileError::UndeclaredVariable { .. }
            | CompileError::DuplicateDeclaration { .. }
            | CompileError::UnknownFunction { .. }
            | CompileError::DuplicateFunction { .. } => ErrorKind::Name,
            CompileError::Arity { .. } | CompileError::ArgumentType { .. } => ErrorKind::Arity,
            CompileError::MissingEntryPoint | CompileError::EntryPointParameters { .. } => {
                ErrorKind::EntryPoint
            }
            CompileError::MissingReturn { .. } => ErrorKind::Return,
            CompileError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Source line of the offending token, if the error has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            CompileError::UnexpectedCharacter { line, .. }
            | CompileError::IntegerOutOfRange { line, .. }
            | CompileError::Syntax { line, .. }
            | CompileError::Type { line, .. }
            | CompileError::UndeclaredVariable { line, .. }
            | CompileError::DuplicateDeclaration { line, .. }
            | CompileError::UnknownFunction { line, .. }
            | CompileError::DuplicateFunction { line, .. }
            | CompileError::Arity { line, .. }
            | CompileError::ArgumentType { line, .. }
            | CompileError::EntryPointParameters { line, .. }
            | CompileError::MissingReturn { line, .. }
            | CompileError::Internal { line, .. } => Some(*line),
            CompileError::MissingEntryPoint => None,
        }
    }
}
