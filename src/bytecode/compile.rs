use crate::{
    bytecode::{
        Chunk, Op, Word,
        compile_error::CompileError,
        function::FunctionRegistry,
        scope::Scope,
    },
    frontend::{
        lexer::{Lexer, TokenSource},
        token::{Token, TokenKind},
    },
    lang::ty::StaticType,
};

/// Compiles source text straight to a chunk.
pub fn compile(source: &str) -> Result<Chunk, CompileError> {
    Compiler::new(Lexer::new(source)).compile()
}

/// Single-pass compiler: parsing, type checking, scope resolution and code
/// generation all happen in one walk over the tokens.
///
/// Three pieces of state move in lockstep with what the VM will later do:
/// - `types` mirrors the operand stack while an expression is compiled,
/// - `scope` mirrors the locals of the current frame (index = slot),
/// - `chunk` receives instructions as soon as each construct is recognised.
pub struct Compiler<S> {
    tokens: S,
    chunk: Chunk,
    scope: Scope,
    functions: FunctionRegistry,
    types: Vec<StaticType>,
}

impl<S: TokenSource> Compiler<S> {
    pub fn new(tokens: S) -> Self {
        Self {
            tokens,
            chunk: Chunk::new(),
            scope: Scope::new(),
            functions: FunctionRegistry::new(),
            types: Vec::new(),
        }
    }

    /// Compiles every function declaration up to end of input.
    ///
    /// The chunk always starts with `CALL <main> 0; EXIT`, so execution
    /// begins in `main` and halts once it returns.
    pub fn compile(mut self) -> Result<Chunk, CompileError> {
        self.chunk.write_op(Op::Call);
        let main_entry = self.chunk.reserve();
        self.chunk.write(0);
        self.chunk.write_op(Op::Exit);

        while self.tokens.peek().kind != TokenKind::End {
            self.compile_function()?;
        }
        self.expect(TokenKind::End)?;

        let main = self
            .functions
            .find_main()
            .ok_or(CompileError::MissingEntryPoint)?;
        if !main.parameters.is_empty() {
            return Err(CompileError::EntryPointParameters {
                line: main.name.span.line,
                count: main.parameters.len(),
            });
        }
        let entry = main.entry;
        self.chunk.patch(main_entry, entry as Word);

        log::debug!(
            "compiled {} function(s) into {} words, main at {}",
            self.functions.len(),
            self.chunk.len(),
            entry
        );

        Ok(self.chunk)
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn compile_function(&mut self) -> Result<(), CompileError> {
        self.expect(TokenKind::Func)?;
        let name = self.expect(TokenKind::Name)?;
        if self.functions.find(&name.lexeme).is_some() {
            return Err(CompileError::DuplicateFunction {
                line: name.span.line,
                name: name.lexeme,
            });
        }
        // registered before the body so the body can call itself
        let index = self.functions.add(name.clone());

        self.expect(TokenKind::LParen)?;
        if self.tokens.peek().kind != TokenKind::RParen {
            loop {
                self.compile_parameter(index)?;
                if self.tokens.peek().kind != TokenKind::Comma {
                    break;
                }
                self.tokens.advance();
            }
        }
        self.expect(TokenKind::RParen)?;

        self.expect(TokenKind::Colon)?;
        let return_type = self.compile_type()?;

        let entry = self.chunk.len();
        if let Some(function) = self.functions.get_mut(index) {
            function.return_type = return_type;
            function.entry = entry;
        }

        log::debug!(
            "function '{}' at {} with {} parameter(s), returns {}",
            name.lexeme,
            entry,
            self.scope.len(),
            return_type
        );

        if !self.compile_block(return_type)? {
            return Err(CompileError::MissingReturn {
                line: self.tokens.line(),
                function: name.lexeme,
            });
        }
        self.scope.reset();

        Ok(())
    }

    fn compile_parameter(&mut self, function: usize) -> Result<(), CompileError> {
        let name = self.expect(TokenKind::Name)?;
        self.expect(TokenKind::Colon)?;
        let ty = self.compile_type()?;

        self.scope.declare(name, ty)?;
        self.scope.mark_initialized();
        if let Some(function) = self.functions.get_mut(function) {
            function.parameters.push(ty);
        }

        Ok(())
    }

    fn compile_type(&mut self) -> Result<StaticType, CompileError> {
        match self.tokens.peek().kind {
            TokenKind::Integer => {
                self.tokens.advance();
                Ok(StaticType::Integer)
            }
            TokenKind::Boolean => {
                self.tokens.advance();
                Ok(StaticType::Boolean)
            }
            _ => Err(self.unexpected("a type")),
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    /// `return_type` is the enclosing function's, checked by `return`.
    ///
    /// Returns true when the statement always returns: a `return`, or a
    /// block whose last statement always returns. `if` and `while` never
    /// count, since their body may be skipped.
    fn compile_statement(&mut self, return_type: StaticType) -> Result<bool, CompileError> {
        match self.tokens.peek().kind {
            TokenKind::LCurly => self.compile_block(return_type),
            TokenKind::Return => self.compile_return(return_type).map(|_| true),
            TokenKind::Let => self.compile_let().map(|_| false),
            TokenKind::Print => self.compile_print().map(|_| false),
            TokenKind::If => self.compile_if(return_type).map(|_| false),
            TokenKind::While => self.compile_while(return_type).map(|_| false),
            TokenKind::Name => self.compile_assignment().map(|_| false),
            _ => Err(self.unexpected("a statement")),
        }
    }

    fn compile_block(&mut self, return_type: StaticType) -> Result<bool, CompileError> {
        self.expect(TokenKind::LCurly)?;
        self.scope.enter_block();

        let mut returns = false;
        loop {
            let kind = self.tokens.peek().kind;
            if kind == TokenKind::RCurly || kind == TokenKind::End {
                break;
            }
            returns = self.compile_statement(return_type)?;
        }

        let pops = self.scope.exit_block();
        for _ in 0..pops {
            self.chunk.write_op(Op::Pop);
        }

        self.expect(TokenKind::RCurly)?;
        Ok(returns)
    }

    fn compile_return(&mut self, return_type: StaticType) -> Result<(), CompileError> {
        let line = self.expect(TokenKind::Return)?.span.line;
        self.compile_expression()?;
        self.expect(TokenKind::Semicolon)?;
        self.match_type(return_type, line)?;

        // every live local sits beneath the return value
        self.chunk.write_op(Op::Return);
        self.chunk.write(self.scope.len() as Word);
        Ok(())
    }

    /// The initializer's value is left on the stack, exactly where the new
    /// variable's slot is, so no store is emitted.
    fn compile_let(&mut self) -> Result<(), CompileError> {
        let line = self.expect(TokenKind::Let)?.span.line;
        let name = self.expect(TokenKind::Name)?;
        self.expect(TokenKind::Colon)?;
        let ty = self.compile_type()?;

        self.scope.declare(name, ty)?;

        self.expect(TokenKind::Equal)?;
        self.compile_expression()?;
        self.expect(TokenKind::Semicolon)?;
        self.match_type(ty, line)?;

        self.scope.mark_initialized();
        Ok(())
    }

    fn compile_assignment(&mut self) -> Result<(), CompileError> {
        let name = self.expect(TokenKind::Name)?;
        self.expect(TokenKind::Equal)?;
        let variable = self.scope.resolve(&name)?;

        self.compile_expression()?;
        self.expect(TokenKind::Semicolon)?;
        self.match_type(variable.ty, name.span.line)?;

        self.chunk.write_op(Op::Store);
        self.chunk.write(variable.slot as Word);
        Ok(())
    }

    fn compile_print(&mut self) -> Result<(), CompileError> {
        let line = self.expect(TokenKind::Print)?.span.line;
        self.expect(TokenKind::LParen)?;
        self.compile_expression()?;
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::Semicolon)?;

        match self.pop_type(line)? {
            StaticType::Integer => self.chunk.write_op(Op::PrintInteger),
            StaticType::Boolean => self.chunk.write_op(Op::PrintBoolean),
            found => {
                return Err(CompileError::Type {
                    line,
                    expected: StaticType::Integer,
                    found,
                });
            }
        }
        Ok(())
    }

    fn compile_if(&mut self, return_type: StaticType) -> Result<(), CompileError> {
        let line = self.expect(TokenKind::If)?.span.line;
        self.compile_expression()?;
        self.match_type(StaticType::Boolean, line)?;

        self.chunk.write_op(Op::JumpIfFalse);
        let exit = self.chunk.reserve();

        self.compile_block(return_type)?;

        self.chunk.patch(exit, self.chunk.len() as Word);
        Ok(())
    }

    fn compile_while(&mut self, return_type: StaticType) -> Result<(), CompileError> {
        let line = self.expect(TokenKind::While)?.span.line;
        let loop_entry = self.chunk.len();

        self.compile_expression()?;
        self.match_type(StaticType::Boolean, line)?;

        self.chunk.write_op(Op::JumpIfFalse);
        let exit = self.chunk.reserve();

        self.compile_block(return_type)?;

        self.chunk.write_op(Op::Jump);
        self.chunk.write(loop_entry as Word);

        self.chunk.patch(exit, self.chunk.len() as Word);
        Ok(())
    }

    // =========================================================================
    // Expressions
    // =========================================================================
    //
    // Each level emits its code and leaves exactly one type on `types`.

    fn compile_expression(&mut self) -> Result<(), CompileError> {
        self.compile_comparison()
    }

    /// Comparisons do not chain: `a < b < c` is a syntax error at the second `<`.
    fn compile_comparison(&mut self) -> Result<(), CompileError> {
        self.compile_additive()?;

        let op = match self.tokens.peek().kind {
            TokenKind::DoubleEqual => Op::Equal,
            TokenKind::NotEqual => Op::NotEqual,
            TokenKind::Less => Op::Less,
            TokenKind::LessEqual => Op::LessEqual,
            TokenKind::Greater => Op::Greater,
            TokenKind::GreaterEqual => Op::GreaterEqual,
            _ => return Ok(()),
        };
        let line = self.tokens.advance().span.line;
        self.compile_additive()?;

        // `==` and `!=` only accept integers too
        self.match_type(StaticType::Integer, line)?;
        self.match_type(StaticType::Integer, line)?;
        self.types.push(StaticType::Boolean);

        self.chunk.write_op(op);
        Ok(())
    }

    fn compile_additive(&mut self) -> Result<(), CompileError> {
        self.compile_multiplicative()?;

        loop {
            let op = match self.tokens.peek().kind {
                TokenKind::Plus => Op::Add,
                TokenKind::Minus => Op::Sub,
                _ => return Ok(()),
            };
            let line = self.tokens.advance().span.line;
            self.compile_multiplicative()?;
            self.emit_integer_binary(op, line)?;
        }
    }

    fn compile_multiplicative(&mut self) -> Result<(), CompileError> {
        self.compile_unary()?;

        loop {
            let op = match self.tokens.peek().kind {
                TokenKind::Star => Op::Mul,
                TokenKind::Slash => Op::Div,
                _ => return Ok(()),
            };
            let line = self.tokens.advance().span.line;
            self.compile_unary()?;
            self.emit_integer_binary(op, line)?;
        }
    }

    fn emit_integer_binary(&mut self, op: Op, line: usize) -> Result<(), CompileError> {
        self.match_type(StaticType::Integer, line)?;
        self.match_type(StaticType::Integer, line)?;
        self.types.push(StaticType::Integer);
        self.chunk.write_op(op);
        Ok(())
    }

    fn compile_unary(&mut self) -> Result<(), CompileError> {
        let token = self.tokens.peek().clone();

        match token.kind {
            TokenKind::Number => {
                self.tokens.advance();
                self.compile_integer_literal(&token.lexeme, token.span.line)?;
            }
            TokenKind::True => {
                self.tokens.advance();
                self.chunk.write_op(Op::PushTrue);
                self.types.push(StaticType::Boolean);
            }
            TokenKind::False => {
                self.tokens.advance();
                self.chunk.write_op(Op::PushFalse);
                self.types.push(StaticType::Boolean);
            }
            TokenKind::LParen => {
                self.tokens.advance();
                self.compile_expression()?;
                self.expect(TokenKind::RParen)?;
            }
            TokenKind::Minus => {
                self.tokens.advance();
                if self.tokens.peek().kind == TokenKind::Number {
                    // folded, so that Word::MIN can be written as a literal
                    let literal = self.tokens.advance();
                    let lexeme = format!("-{}", literal.lexeme);
                    self.compile_integer_literal(&lexeme, literal.span.line)?;
                } else {
                    self.compile_unary()?;
                    self.match_type(StaticType::Integer, token.span.line)?;
                    self.types.push(StaticType::Integer);
                    self.chunk.write_op(Op::Negate);
                }
            }
            TokenKind::Name => {
                self.tokens.advance();
                if self.tokens.peek().kind == TokenKind::LParen {
                    self.compile_call(&token)?;
                } else {
                    self.compile_load(&token)?;
                }
            }
            _ => return Err(self.unexpected("an expression")),
        }

        Ok(())
    }

    fn compile_integer_literal(&mut self, lexeme: &str, line: usize) -> Result<(), CompileError> {
        let n: Word = lexeme
            .parse()
            .map_err(|_| CompileError::IntegerOutOfRange {
                line,
                lexeme: lexeme.to_string(),
            })?;
        self.chunk.write_op(Op::PushInteger);
        self.chunk.write(n);
        self.types.push(StaticType::Integer);
        Ok(())
    }

    fn compile_load(&mut self, name: &Token) -> Result<(), CompileError> {
        let variable = self.scope.resolve(name)?;
        self.chunk.write_op(Op::Load);
        self.chunk.write(variable.slot as Word);
        self.types.push(variable.ty);
        Ok(())
    }

    /// Arguments are pushed left to right; they become the callee's first
    /// locals once `CALL` sets the new frame base beneath them.
    fn compile_call(&mut self, name: &Token) -> Result<(), CompileError> {
        let line = name.span.line;
        let (entry, parameters, return_type) = match self.functions.find(&name.lexeme) {
            Some(f) => (f.entry, f.parameters.clone(), f.return_type),
            None => {
                return Err(CompileError::UnknownFunction {
                    line,
                    name: name.lexeme.clone(),
                });
            }
        };

        self.expect(TokenKind::LParen)?;
        let mut count = 0;
        if self.tokens.peek().kind != TokenKind::RParen {
            loop {
                let Some(&expected) = parameters.get(count) else {
                    return Err(CompileError::Arity {
                        line,
                        function: name.lexeme.clone(),
                        expected: parameters.len(),
                        found: count + 1,
                    });
                };

                self.compile_expression()?;
                let found = self.pop_type(line)?;
                if found != expected {
                    return Err(CompileError::ArgumentType {
                        line,
                        function: name.lexeme.clone(),
                        position: count + 1,
                        expected,
                        found,
                    });
                }
                count += 1;

                if self.tokens.peek().kind != TokenKind::Comma {
                    break;
                }
                self.tokens.advance();
            }
        }
        self.expect(TokenKind::RParen)?;

        if count != parameters.len() {
            return Err(CompileError::Arity {
                line,
                function: name.lexeme.clone(),
                expected: parameters.len(),
                found: count,
            });
        }

        self.types.push(return_type);

        self.chunk.write_op(Op::Call);
        self.chunk.write(entry as Word);
        self.chunk.write(parameters.len() as Word);
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn expect(&mut self, kind: TokenKind) -> Result<Token, CompileError> {
        if self.tokens.peek().kind != kind {
            return Err(self.unexpected(&kind.to_string()));
        }
        Ok(self.tokens.advance())
    }

    /// Error for the next token, which is not what the grammar wants.
    fn unexpected(&mut self, expected: &str) -> CompileError {
        let token = self.tokens.peek();
        match token.kind {
            TokenKind::Unknown => CompileError::UnexpectedCharacter {
                line: token.span.line,
                lexeme: token.lexeme.clone(),
            },
            _ => CompileError::Syntax {
                line: token.span.line,
                expected: expected.to_string(),
                found: token.to_string(),
            },
        }
    }

    fn pop_type(&mut self, line: usize) -> Result<StaticType, CompileError> {
        self.types.pop().ok_or_else(|| CompileError::Internal {
            line,
            message: "type stack underflow".to_string(),
        })
    }

    fn match_type(&mut self, expected: StaticType, line: usize) -> Result<(), CompileError> {
        let found = self.pop_type(line)?;
        if found != expected {
            return Err(CompileError::Type {
                line,
                expected,
                found,
            });
        }
        Ok(())
    }
}
