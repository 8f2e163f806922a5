use crate::{
    disassembler::{Instruction, OpCode},
    emulation::StackValue,
};

/// Abstract interpreter over an evaluation stack and a local-variable store.
///
/// The emulator executes instruction ranges symbolically: constants and the
/// integer arithmetic of the dispatch machinery produce concrete values,
/// everything else degrades to [`StackValue::Unknown`]. Locals are tracked
/// only when requested; an untracked local always reads back unknown.
///
/// State persists across [`InstructionEmulator::emulate`] calls so that a
/// dispatcher solve can seed the key local once and emulate several
/// predecessor ranges against it. [`InstructionEmulator::initialize`] resets
/// everything; callers must reinitialize between dispatchers so no abstract
/// state leaks from one solve into the next.
#[derive(Debug, Default)]
pub struct InstructionEmulator {
    stack: Vec<StackValue>,
    locals: Vec<StackValue>,
    track_locals: bool,
}

impl InstructionEmulator {
    /// Creates an uninitialized emulator.
    #[must_use]
    pub fn new() -> Self {
        InstructionEmulator::default()
    }

    /// Resets all state for a method with `local_count` local slots.
    ///
    /// When `track_locals` is false, stores to locals are discarded and every
    /// local reads back [`StackValue::Unknown`].
    pub fn initialize(&mut self, local_count: usize, track_locals: bool) {
        self.stack.clear();
        self.locals.clear();
        self.locals.resize(local_count, StackValue::Unknown);
        self.track_locals = track_locals;
    }

    /// Emulates `instructions[start..end]`, clamped to the valid range.
    pub fn emulate(&mut self, instructions: &[Instruction], start: usize, end: usize) {
        let end = end.min(instructions.len());
        for instruction in instructions.iter().take(end).skip(start) {
            self.step(instruction);
        }
    }

    /// Pushes a value.
    pub fn push(&mut self, value: StackValue) {
        self.stack.push(value);
    }

    /// Pops a value; an empty stack yields [`StackValue::Unknown`].
    pub fn pop(&mut self) -> StackValue {
        self.stack.pop().unwrap_or(StackValue::Unknown)
    }

    /// Reads the top of the stack without popping.
    #[must_use]
    pub fn peek(&self) -> StackValue {
        self.stack.last().copied().unwrap_or(StackValue::Unknown)
    }

    /// Reads a local variable.
    #[must_use]
    pub fn get_local(&self, index: u16) -> StackValue {
        if !self.track_locals {
            return StackValue::Unknown;
        }
        self.locals
            .get(usize::from(index))
            .copied()
            .unwrap_or(StackValue::Unknown)
    }

    /// Writes a local variable; out-of-range indices are ignored.
    pub fn set_local(&mut self, index: u16, value: StackValue) {
        if !self.track_locals {
            return;
        }
        if let Some(slot) = self.locals.get_mut(usize::from(index)) {
            *slot = value;
        }
    }

    fn step(&mut self, instruction: &Instruction) {
        match instruction.opcode {
            OpCode::Nop | OpCode::Ret => {}
            OpCode::LdcI4 => {
                let value = instruction
                    .ldc_i4_value()
                    .map_or(StackValue::Unknown, StackValue::Int32);
                self.push(value);
            }
            OpCode::Ldloc => {
                let value = instruction
                    .local_index()
                    .map_or(StackValue::Unknown, |i| self.get_local(i));
                self.push(value);
            }
            OpCode::Stloc => {
                let value = self.pop();
                if let Some(index) = instruction.local_index() {
                    self.set_local(index, value);
                }
            }
            // Arguments are runtime inputs; nothing is known about them.
            OpCode::Ldarg => self.push(StackValue::Unknown),
            OpCode::Dup => {
                let top = self.peek();
                self.push(top);
            }
            OpCode::Pop => {
                self.pop();
            }
            OpCode::Add => self.binop(|a, b| StackValue::Int32(a.wrapping_add(b))),
            OpCode::Sub => self.binop(|a, b| StackValue::Int32(a.wrapping_sub(b))),
            OpCode::Mul => self.binop(|a, b| StackValue::Int32(a.wrapping_mul(b))),
            OpCode::Xor => self.binop(|a, b| StackValue::Int32(a ^ b)),
            OpCode::RemUn => self.binop(|a, b| {
                if b == 0 {
                    StackValue::Unknown
                } else {
                    StackValue::Int32(((a as u32) % (b as u32)) as i32)
                }
            }),
            // Calls inside dispatch machinery are the i32 -> i32 key helpers;
            // their result is only recoverable through NativeKeyHelpers.
            OpCode::Call => {
                self.pop();
                self.push(StackValue::Unknown);
            }
            OpCode::Brtrue | OpCode::Brfalse | OpCode::Switch => {
                self.pop();
            }
            OpCode::Bge | OpCode::Bgt | OpCode::Ble | OpCode::Blt => {
                self.pop();
                self.pop();
            }
        }
    }

    fn binop(&mut self, op: impl Fn(i32, i32) -> StackValue) {
        let rhs = self.pop();
        let lhs = self.pop();
        self.push(lhs.combine(rhs, op));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disassembler::MethodToken;

    fn emulator(local_count: usize) -> InstructionEmulator {
        let mut emu = InstructionEmulator::new();
        emu.initialize(local_count, true);
        emu
    }

    #[test]
    fn ldc_xor_rem_un_sequence() {
        let mut emu = emulator(0);
        let instrs = [
            Instruction::ldc_i4(10),
            Instruction::ldc_i4(0x5A),
            Instruction::new(OpCode::Xor),
            Instruction::ldc_i4(4),
            Instruction::new(OpCode::RemUn),
        ];
        emu.emulate(&instrs, 0, instrs.len());
        assert_eq!(emu.peek(), StackValue::Int32((10 ^ 0x5A) % 4));
    }

    #[test]
    fn rem_un_is_unsigned() {
        let mut emu = emulator(0);
        let instrs = [
            Instruction::ldc_i4(-3),
            Instruction::ldc_i4(7),
            Instruction::new(OpCode::RemUn),
        ];
        emu.emulate(&instrs, 0, instrs.len());
        let expected = ((-3_i32 as u32) % 7) as i32;
        assert_eq!(emu.peek(), StackValue::Int32(expected));
    }

    #[test]
    fn rem_un_by_zero_is_unknown() {
        let mut emu = emulator(0);
        let instrs = [
            Instruction::ldc_i4(3),
            Instruction::ldc_i4(0),
            Instruction::new(OpCode::RemUn),
        ];
        emu.emulate(&instrs, 0, instrs.len());
        assert!(emu.peek().is_unknown());
    }

    #[test]
    fn locals_roundtrip_when_tracked() {
        let mut emu = emulator(2);
        let instrs = [Instruction::ldc_i4(42), Instruction::stloc(1)];
        emu.emulate(&instrs, 0, instrs.len());
        assert_eq!(emu.get_local(1), StackValue::Int32(42));

        emu.emulate(&[Instruction::ldloc(1)], 0, 1);
        assert_eq!(emu.peek(), StackValue::Int32(42));
    }

    #[test]
    fn untracked_locals_read_unknown() {
        let mut emu = InstructionEmulator::new();
        emu.initialize(2, false);
        emu.emulate(&[Instruction::ldc_i4(42), Instruction::stloc(0)], 0, 2);
        assert!(emu.get_local(0).is_unknown());
    }

    #[test]
    fn calls_and_args_are_unknown() {
        let mut emu = emulator(0);
        let instrs = [
            Instruction::ldc_i4(7),
            Instruction::call(MethodToken(0x0600_0001)),
        ];
        emu.emulate(&instrs, 0, instrs.len());
        assert!(emu.peek().is_unknown());

        emu.emulate(&[Instruction::ldarg(0)], 0, 1);
        assert!(emu.peek().is_unknown());
    }

    #[test]
    fn mul_wraps() {
        let mut emu = emulator(0);
        let instrs = [
            Instruction::ldc_i4(i32::MAX),
            Instruction::ldc_i4(2),
            Instruction::new(OpCode::Mul),
        ];
        emu.emulate(&instrs, 0, instrs.len());
        assert_eq!(emu.peek(), StackValue::Int32(i32::MAX.wrapping_mul(2)));
    }

    #[test]
    fn pop_on_empty_stack_is_unknown() {
        let mut emu = emulator(0);
        assert!(emu.pop().is_unknown());
        assert!(emu.peek().is_unknown());
    }

    #[test]
    fn initialize_clears_residual_state() {
        let mut emu = emulator(1);
        emu.push(StackValue::Int32(9));
        emu.set_local(0, StackValue::Int32(9));
        emu.initialize(1, true);
        assert!(emu.peek().is_unknown());
        assert!(emu.get_local(0).is_unknown());
    }
}
