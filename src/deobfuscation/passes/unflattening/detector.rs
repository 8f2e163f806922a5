use crate::{
    deobfuscation::passes::unflattening::SwitchData,
    disassembler::{Block, OpCode},
    emulation::NativeKeyHelpers,
};

/// Classifies a block as a flattening dispatcher.
///
/// A dispatcher ends in a multi-way switch fed by a fixed instruction
/// fingerprint: the key is stored to a local, then reduced modulo the case
/// count with `ldc.i4, rem.un`. The native scheme is tried first (the
/// remainder's dividend routes through a call into an embedded helper), then
/// the arithmetic scheme (an xor with a constant feeds the remainder).
/// Returns `None` for anything else; that is a normal "not applicable"
/// result, not an error.
pub(crate) fn detect(block: &Block, helpers: &dyn NativeKeyHelpers) -> Option<SwitchData> {
    if !block
        .last_instr()
        .is_some_and(|i| i.opcode == OpCode::Switch)
        || block.targets.is_empty()
    {
        return None;
    }

    let instrs = &block.instructions;
    let last = instrs.len().checked_sub(1)?;
    if instrs.len() < 4 {
        return None;
    }
    if instrs[last - 3].opcode != OpCode::Stloc {
        return None;
    }
    if !instrs[last - 2].is_ldc_i4() {
        return None;
    }
    if instrs[last - 1].opcode != OpCode::RemUn {
        return None;
    }

    init_native(block, helpers).or_else(|| init_arithmetic(block))
}

/// The local the dispatcher stores its key into, from the fingerprint's
/// `stloc`. Only meaningful for blocks that passed [`detect`].
pub(crate) fn switch_key_local(block: &Block) -> Option<u16> {
    let last = block.instructions.len().checked_sub(1)?;
    block.instructions.get(last - 3)?.local_index()
}

/// Native scheme: `[ldc.i4 k,] call helper, dup, stloc, ldc.i4, rem.un, switch`.
///
/// The call must sit at the very start of the block (index 0, or index 1
/// behind a hardcoded `ldc.i4` input) so that re-emulating the block with a
/// synthetic key seed can skip exactly the input-producing prefix.
fn init_native(block: &Block, helpers: &dyn NativeKeyHelpers) -> Option<SwitchData> {
    let instrs = &block.instructions;
    if instrs.len() < 6 {
        return None;
    }
    let last = instrs.len() - 1;
    if instrs[last - 4].opcode != OpCode::Dup {
        return None;
    }

    let call_index = last - 5;
    let helper = instrs[call_index].call_target()?;
    if !helpers.is_key_helper(helper) {
        return None;
    }

    match call_index {
        0 => Some(SwitchData::Native {
            helper,
            key_hardcoded: false,
            key: None,
        }),
        1 => {
            let key = instrs[0].ldc_i4_value()?;
            Some(SwitchData::Native {
                helper,
                key_hardcoded: true,
                key: Some(key),
            })
        }
        _ => None,
    }
}

/// Arithmetic scheme: `[ldc.i4 k,] ldc.i4 x, xor, dup, stloc, ldc.i4 d, rem.un, switch`.
fn init_arithmetic(block: &Block) -> Option<SwitchData> {
    let instrs = &block.instructions;
    if instrs.len() < 7 {
        return None;
    }
    let last = instrs.len() - 1;
    if instrs[last - 4].opcode != OpCode::Dup {
        return None;
    }
    if instrs[last - 5].opcode != OpCode::Xor {
        return None;
    }
    let xor_key = instrs[last - 6].ldc_i4_value()?;

    let division_key = instrs[last - 2].ldc_i4_value()?;
    if division_key == 0 {
        return None;
    }

    let key_hardcoded = instrs.len() == 8 && instrs[0].is_ldc_i4();
    let key = if key_hardcoded {
        instrs[0].ldc_i4_value()
    } else {
        None
    };

    Some(SwitchData::Arithmetic {
        xor_key,
        division_key,
        key_hardcoded,
        key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        disassembler::{BlockId, Instruction, MethodToken},
        emulation::NoNativeHelpers,
    };

    struct OneHelper(MethodToken);

    impl NativeKeyHelpers for OneHelper {
        fn is_key_helper(&self, token: MethodToken) -> bool {
            token == self.0
        }

        fn execute(&self, _token: MethodToken, input: i32) -> Option<i32> {
            Some(input)
        }
    }

    fn arithmetic_dispatcher(targets: usize) -> Block {
        let mut block = Block::new(vec![
            Instruction::ldc_i4(0x5A),
            Instruction::new(OpCode::Xor),
            Instruction::new(OpCode::Dup),
            Instruction::stloc(2),
            Instruction::ldc_i4(4),
            Instruction::new(OpCode::RemUn),
            Instruction::new(OpCode::Switch),
        ]);
        block.targets = (0..targets).map(BlockId).collect();
        block
    }

    #[test]
    fn detects_arithmetic_dispatcher() {
        let block = arithmetic_dispatcher(4);
        let data = detect(&block, &NoNativeHelpers).expect("should detect");
        assert_eq!(
            data,
            SwitchData::Arithmetic {
                xor_key: 0x5A,
                division_key: 4,
                key_hardcoded: false,
                key: None,
            }
        );
        assert_eq!(switch_key_local(&block), Some(2));
    }

    #[test]
    fn detects_hardcoded_arithmetic_dispatcher() {
        let mut block = arithmetic_dispatcher(1);
        block.instructions.insert(0, Instruction::ldc_i4(77));
        let data = detect(&block, &NoNativeHelpers).expect("should detect");
        assert!(data.is_key_hardcoded());
        assert_eq!(data.key(), Some(77));
    }

    #[test]
    fn detects_native_dispatcher() {
        let helper = MethodToken(0x0600_0042);
        let mut block = Block::new(vec![
            Instruction::call(helper),
            Instruction::new(OpCode::Dup),
            Instruction::stloc(1),
            Instruction::ldc_i4(7),
            Instruction::new(OpCode::RemUn),
            Instruction::new(OpCode::Switch),
        ]);
        block.targets = vec![BlockId(0), BlockId(1)];

        let data = detect(&block, &OneHelper(helper)).expect("should detect");
        assert_eq!(
            data,
            SwitchData::Native {
                helper,
                key_hardcoded: false,
                key: None,
            }
        );

        // same shape but the call target is not a registered helper
        assert_eq!(detect(&block, &NoNativeHelpers), None);
    }

    #[test]
    fn detects_hardcoded_native_dispatcher() {
        let helper = MethodToken(0x0600_0042);
        let mut block = Block::new(vec![
            Instruction::ldc_i4(1234),
            Instruction::call(helper),
            Instruction::new(OpCode::Dup),
            Instruction::stloc(1),
            Instruction::ldc_i4(7),
            Instruction::new(OpCode::RemUn),
            Instruction::new(OpCode::Switch),
        ]);
        block.targets = vec![BlockId(0)];

        let data = detect(&block, &OneHelper(helper)).expect("should detect");
        assert!(data.is_key_hardcoded());
        assert_eq!(data.key(), Some(1234));
    }

    #[test]
    fn rejects_switch_without_fingerprint() {
        let mut block = Block::new(vec![
            Instruction::ldc_i4(1),
            Instruction::ldc_i4(2),
            Instruction::new(OpCode::Add),
            Instruction::new(OpCode::Switch),
        ]);
        block.targets = vec![BlockId(0)];
        assert_eq!(detect(&block, &NoNativeHelpers), None);
    }

    #[test]
    fn rejects_switch_without_targets() {
        let mut block = arithmetic_dispatcher(0);
        block.targets.clear();
        assert_eq!(detect(&block, &NoNativeHelpers), None);
    }

    #[test]
    fn rejects_non_switch_terminator() {
        let block = Block::new(vec![
            Instruction::ldc_i4(0x5A),
            Instruction::new(OpCode::Xor),
            Instruction::new(OpCode::Dup),
            Instruction::stloc(2),
            Instruction::ldc_i4(4),
            Instruction::new(OpCode::RemUn),
            Instruction::new(OpCode::Ret),
        ]);
        assert_eq!(detect(&block, &NoNativeHelpers), None);
    }

    #[test]
    fn rejects_zero_division_key() {
        let mut block = arithmetic_dispatcher(4);
        block.instructions[4] = Instruction::ldc_i4(0);
        assert_eq!(detect(&block, &NoNativeHelpers), None);
    }

    #[test]
    fn rejects_short_blocks() {
        let mut block = Block::new(vec![Instruction::new(OpCode::Switch)]);
        block.targets = vec![BlockId(0)];
        assert_eq!(detect(&block, &NoNativeHelpers), None);
    }
}
