use crate::bytecode::compile_error::CompileError;
use crate::frontend::token::Token;
use crate::lang::ty::StaticType;

/// A local variable known to the compiler.
///
/// `depth` is `None` while the variable's initializer is still being
/// compiled, so the initializer cannot refer to the variable itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: Token,
    pub ty: StaticType,
    pub depth: Option<usize>,
}

/// Result of resolving a name: the frame-relative slot and its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub slot: usize,
    pub ty: StaticType,
}

/// Declared variables of the function being compiled, in declaration order.
///
/// A variable's index in this table is its runtime slot: the number of
/// values the frame already holds when the variable's initializer runs.
#[derive(Debug, Default)]
pub struct Scope {
    variables: Vec<Variable>,
    depth: usize,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live variables, which is also the number of live slots.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Declares an uninitialized variable in the current block and returns
    /// its slot. Shadowing a variable from an enclosing block is allowed.
    pub fn declare(&mut self, name: Token, ty: StaticType) -> Result<usize, CompileError> {
        for variable in self.variables.iter().rev() {
            if variable.depth.is_some_and(|d| d < self.depth) {
                break;
            }
            if variable.name.same_name(&name) {
                return Err(CompileError::DuplicateDeclaration {
                    line: name.span.line,
                    name: name.lexeme,
                });
            }
        }

        self.variables.push(Variable {
            name,
            ty,
            depth: None,
        });
        Ok(self.variables.len() - 1)
    }

    /// Makes the most recently declared variable visible to `resolve`.
    pub fn mark_initialized(&mut self) {
        let depth = self.depth;
        if let Some(variable) = self.variables.last_mut() {
            variable.depth = Some(depth);
        }
    }

    /// Finds the innermost initialized variable with this name.
    pub fn resolve(&self, name: &Token) -> Result<Resolved, CompileError> {
        self.variables
            .iter()
            .enumerate()
            .rev()
            .find(|(_, v)| v.depth.is_some() && v.name.same_name(name))
            .map(|(slot, v)| Resolved { slot, ty: v.ty })
            .ok_or_else(|| CompileError::UndeclaredVariable {
                line: name.span.line,
                name: name.lexeme.clone(),
            })
    }

    pub fn enter_block(&mut self) {
        self.depth += 1;
    }

    /// Leaves the current block, dropping its variables. Returns how many
    /// were dropped; the caller emits one `POP` for each.
    pub fn exit_block(&mut self) -> usize {
        self.depth = self.depth.saturating_sub(1);

        let mut popped = 0;
        while self
            .variables
            .last()
            .is_some_and(|v| v.depth.is_none_or(|d| d > self.depth))
        {
            self.variables.pop();
            popped += 1;
        }
        popped
    }

    /// Forgets everything; used between functions.
    pub fn reset(&mut self) {
        self.variables.clear();
        self.depth = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::token::{Span, TokenKind};

    fn name(text: &str) -> Token {
        Token::new(TokenKind::Name, text, Span { line: 1, col: 1 })
    }

    fn declare_init(scope: &mut Scope, text: &str, ty: StaticType) -> usize {
        let slot = scope.declare(name(text), ty).unwrap();
        scope.mark_initialized();
        slot
    }

    #[test]
    fn test_slots_follow_declaration_order() {
        let mut scope = Scope::new();
        assert_eq!(declare_init(&mut scope, "a", StaticType::Integer), 0);
        assert_eq!(declare_init(&mut scope, "b", StaticType::Boolean), 1);
        assert_eq!(
            scope.resolve(&name("b")).unwrap(),
            Resolved {
                slot: 1,
                ty: StaticType::Boolean
            }
        );
    }

    #[test]
    fn test_uninitialized_is_invisible() {
        let mut scope = Scope::new();
        scope.declare(name("a"), StaticType::Integer).unwrap();
        let err = scope.resolve(&name("a")).unwrap_err();
        assert!(matches!(err, CompileError::UndeclaredVariable { .. }));
        scope.mark_initialized();
        assert!(scope.resolve(&name("a")).is_ok());
    }

    #[test]
    fn test_duplicate_in_same_block() {
        let mut scope = Scope::new();
        scope.enter_block();
        declare_init(&mut scope, "a", StaticType::Integer);
        let err = scope.declare(name("a"), StaticType::Integer).unwrap_err();
        assert_eq!(
            err,
            CompileError::DuplicateDeclaration {
                line: 1,
                name: "a".to_string()
            }
        );
    }

    #[test]
    fn test_shadowing_in_nested_block() {
        let mut scope = Scope::new();
        scope.enter_block();
        declare_init(&mut scope, "a", StaticType::Integer);
        scope.enter_block();
        assert_eq!(declare_init(&mut scope, "a", StaticType::Boolean), 1);
        assert_eq!(scope.resolve(&name("a")).unwrap().slot, 1);
        assert_eq!(scope.resolve(&name("a")).unwrap().ty, StaticType::Boolean);

        assert_eq!(scope.exit_block(), 1);
        assert_eq!(scope.resolve(&name("a")).unwrap().slot, 0);
        assert_eq!(scope.resolve(&name("a")).unwrap().ty, StaticType::Integer);
    }

    #[test]
    fn test_exit_block_pops_only_inner_variables() {
        let mut scope = Scope::new();
        declare_init(&mut scope, "p", StaticType::Integer);
        scope.enter_block();
        declare_init(&mut scope, "a", StaticType::Integer);
        scope.enter_block();
        declare_init(&mut scope, "b", StaticType::Integer);
        declare_init(&mut scope, "c", StaticType::Integer);
        assert_eq!(scope.exit_block(), 2);
        assert_eq!(scope.len(), 2);
        assert_eq!(scope.exit_block(), 1);
        assert_eq!(scope.len(), 1);
        assert_eq!(scope.depth, 0);
    }

    #[test]
    fn test_empty_block_pops_nothing() {
        let mut scope = Scope::new();
        scope.enter_block();
        assert_eq!(scope.exit_block(), 0);
    }

    #[test]
    fn test_reset() {
        let mut scope = Scope::new();
        scope.enter_block();
        declare_init(&mut scope, "a", StaticType::Integer);
        scope.reset();
        assert!(scope.is_empty());
        assert_eq!(scope.depth, 0);
    }
}
