use crate::{
    deobfuscation::passes::unflattening::SwitchData,
    disassembler::Instruction,
    emulation::{InstructionEmulator, NativeKeyHelpers, StackValue},
    Error, Result,
};

/// Computes switch keys and case indices for one dispatcher.
///
/// Both operations require fully known values; an unknown anywhere along the
/// way is [`Error::UnresolvedValue`], which the solver treats as an abort of
/// the current block rather than the whole method.
pub(crate) struct KeyResolver<'a> {
    helpers: &'a dyn NativeKeyHelpers,
}

impl<'a> KeyResolver<'a> {
    pub(crate) fn new(helpers: &'a dyn NativeKeyHelpers) -> Self {
        KeyResolver { helpers }
    }

    /// Pops the dispatch input off the emulated stack and derives the raw key.
    ///
    /// Native scheme: replay the embedded helper against the popped value.
    /// Arithmetic scheme: `popped ^ xor_key`.
    pub(crate) fn compute_key(
        &self,
        emulator: &mut InstructionEmulator,
        data: &SwitchData,
    ) -> Result<i32> {
        let Some(popped) = emulator.peek().as_i32() else {
            return Err(Error::UnresolvedValue);
        };
        emulator.pop();

        match data {
            SwitchData::Native { helper, .. } => self
                .helpers
                .execute(*helper, popped)
                .ok_or(Error::UnresolvedValue),
            SwitchData::Arithmetic { xor_key, .. } => Ok(popped ^ xor_key),
        }
    }

    /// Maps a raw key to the case index the dispatcher would select.
    ///
    /// The native scheme may transform the key again before the remainder, so
    /// the dispatcher's own instruction range is re-emulated with the key
    /// pushed as a synthetic seed, skipping the input-producing prefix
    /// (`ldc.i4 + call` when hardcoded, just the call otherwise) and the
    /// trailing switch. The arithmetic scheme is the in-block `rem.un` in
    /// closed form: unsigned remainder by the division key.
    pub(crate) fn compute_case_index(
        &self,
        emulator: &mut InstructionEmulator,
        dispatcher_instrs: &[Instruction],
        data: &SwitchData,
        key: i32,
    ) -> Result<i32> {
        match data {
            SwitchData::Native { key_hardcoded, .. } => {
                emulator.push(StackValue::Int32(key));
                let start = if *key_hardcoded { 2 } else { 1 };
                let end = dispatcher_instrs.len().saturating_sub(1);
                emulator.emulate(dispatcher_instrs, start, end);
                emulator.pop().as_i32().ok_or(Error::UnresolvedValue)
            }
            SwitchData::Arithmetic { division_key, .. } => {
                Ok(((key as u32) % (*division_key as u32)) as i32)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        disassembler::{MethodToken, OpCode},
        emulation::NoNativeHelpers,
    };

    /// Helper that mirrors a typical embedded routine: a mul/xor mix.
    struct MixHelper;

    impl NativeKeyHelpers for MixHelper {
        fn is_key_helper(&self, _token: MethodToken) -> bool {
            true
        }

        fn execute(&self, _token: MethodToken, input: i32) -> Option<i32> {
            Some(input.wrapping_mul(0x343F_D89B) ^ 0x1234_5678)
        }
    }

    fn arithmetic_data() -> SwitchData {
        SwitchData::Arithmetic {
            xor_key: 0x5A,
            division_key: 4,
            key_hardcoded: false,
            key: None,
        }
    }

    #[test]
    fn arithmetic_key_is_xor_identity() {
        let mut emu = InstructionEmulator::new();
        emu.initialize(0, true);
        emu.push(StackValue::Int32(10));

        let resolver = KeyResolver::new(&NoNativeHelpers);
        let key = resolver.compute_key(&mut emu, &arithmetic_data()).unwrap();
        assert_eq!(key, 10 ^ 0x5A);
        // the dispatch input was consumed
        assert!(emu.peek().is_unknown());
    }

    #[test]
    fn arithmetic_index_is_unsigned_remainder() {
        let mut emu = InstructionEmulator::new();
        emu.initialize(0, true);
        let resolver = KeyResolver::new(&NoNativeHelpers);

        let index = resolver
            .compute_case_index(&mut emu, &[], &arithmetic_data(), 0x5A ^ 10)
            .unwrap();
        assert_eq!(index, (10 ^ 0x5A) % 4);

        // negative keys reduce as unsigned, matching the in-block rem.un
        let index = resolver
            .compute_case_index(&mut emu, &[], &arithmetic_data(), -3)
            .unwrap();
        assert_eq!(index, ((-3_i32 as u32) % 4) as i32);
    }

    #[test]
    fn unknown_dispatch_input_is_unresolved() {
        let mut emu = InstructionEmulator::new();
        emu.initialize(0, true);
        emu.push(StackValue::Unknown);

        let resolver = KeyResolver::new(&NoNativeHelpers);
        assert_eq!(
            resolver.compute_key(&mut emu, &arithmetic_data()),
            Err(Error::UnresolvedValue)
        );
    }

    #[test]
    fn native_key_replays_helper() {
        let mut emu = InstructionEmulator::new();
        emu.initialize(0, true);
        emu.push(StackValue::Int32(99));

        let data = SwitchData::Native {
            helper: MethodToken(0x0600_0042),
            key_hardcoded: false,
            key: None,
        };
        let resolver = KeyResolver::new(&MixHelper);
        let key = resolver.compute_key(&mut emu, &data).unwrap();
        assert_eq!(key, MixHelper.execute(MethodToken(0), 99).unwrap());
    }

    #[test]
    fn native_index_matches_in_block_remainder() {
        // call helper, dup, stloc.0, ldc.i4 7, rem.un, switch
        let dispatcher = [
            Instruction::call(MethodToken(0x0600_0042)),
            Instruction::new(OpCode::Dup),
            Instruction::stloc(0),
            Instruction::ldc_i4(7),
            Instruction::new(OpCode::RemUn),
            Instruction::new(OpCode::Switch),
        ];
        let data = SwitchData::Native {
            helper: MethodToken(0x0600_0042),
            key_hardcoded: false,
            key: None,
        };

        let mut emu = InstructionEmulator::new();
        emu.initialize(1, true);
        let resolver = KeyResolver::new(&MixHelper);
        let key = 1_234_567;
        let index = resolver
            .compute_case_index(&mut emu, &dispatcher, &data, key)
            .unwrap();
        assert_eq!(index, ((key as u32) % 7) as i32);
        // the re-emulation also filled the key local through the dup/stloc
        assert_eq!(emu.get_local(0), StackValue::Int32(key));
    }

    #[test]
    fn native_helper_failure_is_unresolved() {
        struct FailingHelper;
        impl NativeKeyHelpers for FailingHelper {
            fn is_key_helper(&self, _token: MethodToken) -> bool {
                true
            }
            fn execute(&self, _token: MethodToken, _input: i32) -> Option<i32> {
                None
            }
        }

        let mut emu = InstructionEmulator::new();
        emu.initialize(0, true);
        emu.push(StackValue::Int32(1));

        let data = SwitchData::Native {
            helper: MethodToken(0x0600_0001),
            key_hardcoded: false,
            key: None,
        };
        let resolver = KeyResolver::new(&FailingHelper);
        assert_eq!(
            resolver.compute_key(&mut emu, &data),
            Err(Error::UnresolvedValue)
        );
    }
}
