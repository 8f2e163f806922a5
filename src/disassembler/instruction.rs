use std::fmt;

use strum::IntoStaticStr;

/// Metadata token identifying a method referenced by a `call` instruction.
///
/// Tokens are opaque to this crate; they only matter for looking up embedded
/// native key helpers through [`crate::emulation::NativeKeyHelpers`] and for
/// reporting which helpers a rewritten method referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodToken(pub u32);

impl fmt::Display for MethodToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

/// How an instruction affects control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowType {
    /// Falls through to the next instruction
    Normal,
    /// Two-way conditional branch
    ConditionalBranch,
    /// Multi-way branch over the block's target list
    Switch,
    /// Transfers into another method and returns
    Call,
    /// Leaves the method
    Return,
}

/// The subset of CIL opcodes that appears in flattened dispatch machinery.
///
/// Mnemonics follow ECMA-335 spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
pub enum OpCode {
    /// No operation
    #[strum(serialize = "nop")]
    Nop,
    /// Discard the top-of-stack value
    #[strum(serialize = "pop")]
    Pop,
    /// Duplicate the top-of-stack value
    #[strum(serialize = "dup")]
    Dup,
    /// Push a 32-bit integer constant
    #[strum(serialize = "ldc.i4")]
    LdcI4,
    /// Push a local variable
    #[strum(serialize = "ldloc")]
    Ldloc,
    /// Pop into a local variable
    #[strum(serialize = "stloc")]
    Stloc,
    /// Push an argument
    #[strum(serialize = "ldarg")]
    Ldarg,
    /// Integer addition (wrapping)
    #[strum(serialize = "add")]
    Add,
    /// Integer subtraction (wrapping)
    #[strum(serialize = "sub")]
    Sub,
    /// Integer multiplication (wrapping)
    #[strum(serialize = "mul")]
    Mul,
    /// Bitwise exclusive or
    #[strum(serialize = "xor")]
    Xor,
    /// Unsigned remainder
    #[strum(serialize = "rem.un")]
    RemUn,
    /// Call the method named by the operand token
    #[strum(serialize = "call")]
    Call,
    /// Branch if the popped value is non-zero
    #[strum(serialize = "brtrue")]
    Brtrue,
    /// Branch if the popped value is zero
    #[strum(serialize = "brfalse")]
    Brfalse,
    /// Branch if greater than or equal
    #[strum(serialize = "bge")]
    Bge,
    /// Branch if greater than
    #[strum(serialize = "bgt")]
    Bgt,
    /// Branch if less than or equal
    #[strum(serialize = "ble")]
    Ble,
    /// Branch if less than
    #[strum(serialize = "blt")]
    Blt,
    /// Multi-way branch over the owning block's target list
    #[strum(serialize = "switch")]
    Switch,
    /// Return from the method
    #[strum(serialize = "ret")]
    Ret,
}

impl OpCode {
    /// The ECMA-335 mnemonic for this opcode.
    #[must_use]
    pub fn mnemonic(&self) -> &'static str {
        self.into()
    }

    /// How this opcode affects control flow.
    #[must_use]
    pub fn flow_type(&self) -> FlowType {
        match self {
            OpCode::Brtrue
            | OpCode::Brfalse
            | OpCode::Bge
            | OpCode::Bgt
            | OpCode::Ble
            | OpCode::Blt => FlowType::ConditionalBranch,
            OpCode::Switch => FlowType::Switch,
            OpCode::Call => FlowType::Call,
            OpCode::Ret => FlowType::Return,
            _ => FlowType::Normal,
        }
    }

    /// True for conditional branches, switches and returns.
    ///
    /// These are the only instructions a terminator rewrite has to remove;
    /// unconditional branches exist purely as `fall_through` pointers.
    #[must_use]
    pub fn is_terminator(&self) -> bool {
        matches!(
            self.flow_type(),
            FlowType::ConditionalBranch | FlowType::Switch | FlowType::Return
        )
    }
}

/// An instruction operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// No operand
    None,
    /// 32-bit integer immediate
    Int32(i32),
    /// Local variable index
    Local(u16),
    /// Argument index
    Argument(u16),
    /// Method token of a call target
    Method(MethodToken),
}

/// A decoded CIL instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// The opcode
    pub opcode: OpCode,
    /// The operand, [`Operand::None`] for most opcodes
    pub operand: Operand,
}

impl Instruction {
    /// Creates an instruction with no operand.
    #[must_use]
    pub fn new(opcode: OpCode) -> Self {
        Instruction {
            opcode,
            operand: Operand::None,
        }
    }

    /// `ldc.i4 value`
    #[must_use]
    pub fn ldc_i4(value: i32) -> Self {
        Instruction {
            opcode: OpCode::LdcI4,
            operand: Operand::Int32(value),
        }
    }

    /// `ldloc index`
    #[must_use]
    pub fn ldloc(index: u16) -> Self {
        Instruction {
            opcode: OpCode::Ldloc,
            operand: Operand::Local(index),
        }
    }

    /// `stloc index`
    #[must_use]
    pub fn stloc(index: u16) -> Self {
        Instruction {
            opcode: OpCode::Stloc,
            operand: Operand::Local(index),
        }
    }

    /// `ldarg index`
    #[must_use]
    pub fn ldarg(index: u16) -> Self {
        Instruction {
            opcode: OpCode::Ldarg,
            operand: Operand::Argument(index),
        }
    }

    /// `call token`
    #[must_use]
    pub fn call(token: MethodToken) -> Self {
        Instruction {
            opcode: OpCode::Call,
            operand: Operand::Method(token),
        }
    }

    /// True if this is `ldc.i4`.
    #[must_use]
    pub fn is_ldc_i4(&self) -> bool {
        self.opcode == OpCode::LdcI4
    }

    /// The immediate of an `ldc.i4`, if this is one.
    #[must_use]
    pub fn ldc_i4_value(&self) -> Option<i32> {
        match (self.opcode, self.operand) {
            (OpCode::LdcI4, Operand::Int32(v)) => Some(v),
            _ => None,
        }
    }

    /// The local index of an `ldloc`/`stloc`, if this is one.
    #[must_use]
    pub fn local_index(&self) -> Option<u16> {
        match (self.opcode, self.operand) {
            (OpCode::Ldloc | OpCode::Stloc, Operand::Local(i)) => Some(i),
            _ => None,
        }
    }

    /// The method token of a `call`, if this is one.
    #[must_use]
    pub fn call_target(&self) -> Option<MethodToken> {
        match (self.opcode, self.operand) {
            (OpCode::Call, Operand::Method(t)) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operand {
            Operand::None => write!(f, "{}", self.opcode.mnemonic()),
            Operand::Int32(v) => write!(f, "{} {}", self.opcode.mnemonic(), v),
            Operand::Local(i) => write!(f, "{}.{}", self.opcode.mnemonic(), i),
            Operand::Argument(i) => write!(f, "{}.{}", self.opcode.mnemonic(), i),
            Operand::Method(t) => write!(f, "{} {}", self.opcode.mnemonic(), t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonics_follow_ecma_spelling() {
        assert_eq!(OpCode::LdcI4.mnemonic(), "ldc.i4");
        assert_eq!(OpCode::RemUn.mnemonic(), "rem.un");
        assert_eq!(OpCode::Switch.mnemonic(), "switch");
    }

    #[test]
    fn flow_types() {
        assert_eq!(OpCode::Bgt.flow_type(), FlowType::ConditionalBranch);
        assert_eq!(OpCode::Switch.flow_type(), FlowType::Switch);
        assert_eq!(OpCode::Ret.flow_type(), FlowType::Return);
        assert_eq!(OpCode::Xor.flow_type(), FlowType::Normal);
        assert!(OpCode::Switch.is_terminator());
        assert!(!OpCode::Call.is_terminator());
    }

    #[test]
    fn operand_accessors() {
        assert_eq!(Instruction::ldc_i4(-5).ldc_i4_value(), Some(-5));
        assert_eq!(Instruction::stloc(2).local_index(), Some(2));
        assert_eq!(Instruction::ldloc(7).local_index(), Some(7));
        assert_eq!(Instruction::new(OpCode::Dup).ldc_i4_value(), None);
        assert_eq!(
            Instruction::call(MethodToken(0x0600_0001)).call_target(),
            Some(MethodToken(0x0600_0001))
        );
    }

    #[test]
    fn display_formats() {
        assert_eq!(Instruction::ldc_i4(10).to_string(), "ldc.i4 10");
        assert_eq!(Instruction::stloc(2).to_string(), "stloc.2");
        assert_eq!(
            Instruction::call(MethodToken(6)).to_string(),
            "call 0x00000006"
        );
    }
}
