use crate::frontend::token::Token;
use crate::lang::ty::StaticType;

pub const ENTRY_POINT: &str = "main";

/// A declared function. Only `entry` outlives compilation, baked into every
/// `CALL` that targets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: Token,
    pub parameters: Vec<StaticType>,
    pub return_type: StaticType,
    pub entry: usize,
}

#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: Vec<Function>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a function by name and returns its index. Parameters,
    /// return type and entry are filled in as its header is compiled.
    pub fn add(&mut self, name: Token) -> usize {
        self.functions.push(Function {
            name,
            parameters: Vec::new(),
            return_type: StaticType::Unit,
            entry: 0,
        });
        self.functions.len() - 1
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Function> {
        self.functions.get_mut(index)
    }

    pub fn find(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name.lexeme == name)
    }

    pub fn find_main(&self) -> Option<&Function> {
        self.find(ENTRY_POINT)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
