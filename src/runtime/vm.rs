use std::io::Write;

use crate::bytecode::{
    Chunk, Op, Word,
    verify::{VerifyError, verify_chunk},
};
use crate::lang::value::Value;
use crate::runtime::runtime_error::RuntimeError;

#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Maximum number of live call frames, `main` included.
    pub max_frames: usize,
    pub max_stack_size: usize,
    pub max_steps: Option<u64>,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            max_frames: 256,
            max_stack_size: 65_536,
            max_steps: None,
        }
    }
}

/// Saved caller state, restored by `RETURN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub return_address: usize,
    pub caller_base: usize,
}

/// Stack machine executing a verified chunk from address 0.
///
/// Locals live on the operand stack itself: slot `n` of the running function
/// is `stack[base + n]`, where `base` is the stack height at the moment the
/// arguments had been pushed, minus the argument count.
pub struct Vm {
    stack: Vec<Value>,
    frames: Vec<Frame>,
    config: VmConfig,
    ip: usize,
    base: usize,
    steps: u64,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Self {
            stack: Vec::new(),
            frames: Vec::new(),
            config,
            ip: 0,
            base: 0,
            steps: 0,
        }
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// The value `main` returned, once a run has finished.
    pub fn exit_value(&self) -> Option<Value> {
        self.stack.last().copied()
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    fn reset(&mut self) {
        self.stack.clear();
        self.frames.clear();
        self.ip = 0;
        self.base = 0;
        self.steps = 0;
    }

    /// Verifies `chunk`, then executes it until `EXIT`. Printed values go to
    /// `out`, one per line.
    pub fn run(&mut self, chunk: &Chunk, out: &mut impl Write) -> Result<(), RuntimeError> {
        verify_chunk(chunk)?;
        self.reset();

        log::debug!("running chunk of {} words", chunk.len());

        loop {
            self.check_limits()?;

            let at = self.ip;
            let word = chunk
                .get(at)
                .ok_or(RuntimeError::InstructionOutOfBounds { ip: at })?;
            let op = Op::from_word(word)
                .ok_or(RuntimeError::Malformed(VerifyError::UnknownOpcode { at, word }))?;
            self.ip = at + op.width();

            log::trace!(
                "{:04} {:<14} height={} base={}",
                at,
                op.mnemonic(),
                self.stack.len(),
                self.base
            );

            match op {
                Op::Noop => {}
                Op::Exit => break,
                Op::Pop => {
                    self.pop(at)?;
                }

                // Literals
                Op::PushInteger => {
                    let n = operand(chunk, at, 0)?;
                    self.push(Value(n), at)?;
                }
                Op::PushTrue => self.push(Value::TRUE, at)?,
                Op::PushFalse => self.push(Value::FALSE, at)?,

                // Locals
                Op::Load => {
                    let slot = operand(chunk, at, 0)?;
                    let index = self.slot_index(slot, at)?;
                    let value = self.stack[index];
                    self.push(value, at)?;
                }
                Op::Store => {
                    let slot = operand(chunk, at, 0)?;
                    let value = self.pop(at)?;
                    let index = self.slot_index(slot, at)?;
                    self.stack[index] = value;
                }

                // Output
                Op::PrintInteger => {
                    let value = self.pop(at)?;
                    writeln!(out, "{}", value.as_integer())?;
                }
                Op::PrintBoolean => {
                    let value = self.pop(at)?;
                    writeln!(out, "{}", value.as_bool())?;
                }

                // Arithmetic
                Op::Add => self.arithmetic(at, op, Word::checked_add)?,
                Op::Sub => self.arithmetic(at, op, Word::checked_sub)?,
                Op::Mul => self.arithmetic(at, op, Word::checked_mul)?,
                Op::Div => {
                    let b = self.pop(at)?.as_integer();
                    let a = self.pop(at)?.as_integer();
                    if b == 0 {
                        return Err(RuntimeError::DivisionByZero { ip: at });
                    }
                    let n = a
                        .checked_div(b)
                        .ok_or(RuntimeError::IntegerOverflow { ip: at, op })?;
                    self.push(Value(n), at)?;
                }
                Op::Negate => {
                    let a = self.pop(at)?.as_integer();
                    let n = a
                        .checked_neg()
                        .ok_or(RuntimeError::IntegerOverflow { ip: at, op })?;
                    self.push(Value(n), at)?;
                }

                // Comparison
                Op::Equal => self.compare(at, |a, b| a == b)?,
                Op::NotEqual => self.compare(at, |a, b| a != b)?,
                Op::Less => self.compare(at, |a, b| a < b)?,
                Op::LessEqual => self.compare(at, |a, b| a <= b)?,
                Op::Greater => self.compare(at, |a, b| a > b)?,
                Op::GreaterEqual => self.compare(at, |a, b| a >= b)?,

                // Control flow
                Op::Jump => {
                    self.ip = index_operand(chunk, at, op, 0)?;
                }
                Op::JumpIfFalse => {
                    let target = index_operand(chunk, at, op, 0)?;
                    if !self.pop(at)?.as_bool() {
                        self.ip = target;
                    }
                }
                Op::Call => {
                    let entry = index_operand(chunk, at, op, 0)?;
                    let argc = index_operand(chunk, at, op, 1)?;
                    self.call(at, entry, argc)?;
                }
                Op::Return => {
                    let locals = index_operand(chunk, at, op, 0)?;
                    self.ret(at, locals)?;
                }
            }
        }

        log::debug!(
            "halted after {} steps, exit value {:?}",
            self.steps,
            self.exit_value().map(Value::as_integer)
        );

        Ok(())
    }

    // Execution

    fn check_limits(&mut self) -> Result<(), RuntimeError> {
        self.steps += 1;

        if let Some(limit) = self.config.max_steps {
            if self.steps > limit {
                return Err(RuntimeError::StepLimitExceeded { limit });
            }
        }

        Ok(())
    }

    /// Arguments already on the stack become slots `0..argc` of the callee.
    fn call(&mut self, at: usize, entry: usize, argc: usize) -> Result<(), RuntimeError> {
        if self.frames.len() >= self.config.max_frames {
            return Err(RuntimeError::FrameOverflow {
                ip: at,
                limit: self.config.max_frames,
            });
        }
        let base = self
            .stack
            .len()
            .checked_sub(argc)
            .ok_or(RuntimeError::StackUnderflow { ip: at })?;

        self.frames.push(Frame {
            return_address: self.ip,
            caller_base: self.base,
        });
        self.base = base;
        self.ip = entry;

        log::debug!(
            "call {} with {} argument(s), depth {}",
            entry,
            argc,
            self.frames.len()
        );
        Ok(())
    }

    /// Drops the callee's `locals`, leaving only its return value.
    fn ret(&mut self, at: usize, locals: usize) -> Result<(), RuntimeError> {
        let frame = self
            .frames
            .pop()
            .ok_or(RuntimeError::FrameUnderflow { ip: at })?;

        let value = self.pop(at)?;
        let height = self
            .stack
            .len()
            .checked_sub(locals)
            .ok_or(RuntimeError::StackUnderflow { ip: at })?;
        self.stack.truncate(height);
        self.push(value, at)?;

        self.ip = frame.return_address;
        self.base = frame.caller_base;

        log::debug!(
            "return {} to {}, depth {}",
            value.as_integer(),
            frame.return_address,
            self.frames.len()
        );
        Ok(())
    }

    fn arithmetic(
        &mut self,
        at: usize,
        op: Op,
        f: impl Fn(Word, Word) -> Option<Word>,
    ) -> Result<(), RuntimeError> {
        let b = self.pop(at)?.as_integer();
        let a = self.pop(at)?.as_integer();
        let n = f(a, b).ok_or(RuntimeError::IntegerOverflow { ip: at, op })?;
        self.push(Value(n), at)
    }

    fn compare(&mut self, at: usize, f: impl Fn(Word, Word) -> bool) -> Result<(), RuntimeError> {
        let b = self.pop(at)?.as_integer();
        let a = self.pop(at)?.as_integer();
        self.push(Value::from_bool(f(a, b)), at)
    }

    fn slot_index(&self, slot: Word, at: usize) -> Result<usize, RuntimeError> {
        usize::try_from(slot)
            .ok()
            .and_then(|s| self.base.checked_add(s))
            .filter(|&index| index < self.stack.len())
            .ok_or(RuntimeError::InvalidSlot { ip: at, slot })
    }

    // Stack helpers

    fn push(&mut self, value: Value, at: usize) -> Result<(), RuntimeError> {
        if self.stack.len() >= self.config.max_stack_size {
            return Err(RuntimeError::StackOverflow {
                ip: at,
                limit: self.config.max_stack_size,
            });
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self, at: usize) -> Result<Value, RuntimeError> {
        self.stack
            .pop()
            .ok_or(RuntimeError::StackUnderflow { ip: at })
    }
}

fn operand(chunk: &Chunk, at: usize, n: usize) -> Result<Word, RuntimeError> {
    chunk
        .get(at + 1 + n)
        .ok_or(RuntimeError::InstructionOutOfBounds { ip: at })
}

/// Operand used as an address or count; negative values are malformed.
fn index_operand(chunk: &Chunk, at: usize, op: Op, n: usize) -> Result<usize, RuntimeError> {
    let value = operand(chunk, at, n)?;
    usize::try_from(value)
        .map_err(|_| RuntimeError::Malformed(VerifyError::NegativeOperand { at, op, value }))
}
