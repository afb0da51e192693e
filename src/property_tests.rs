//! Property-based tests.
//!
//! Uses proptest to check the bit-vector views and the instruction
//! semantics across randomly generated inputs.

#[cfg(test)]
mod tests {
    use std::io;
    use crate::asm::{assemble, disassemble_word};
    use crate::bits::{Bit, BitVector, MAX_WIDTH};
    use crate::cpu::decode::{decode, encode, Instruction};
    use crate::cpu::execute::ExecutionEngine;
    use crate::cpu::registers::{ConditionCode, Reg};
    use crate::cpu::{Computer, MachineState, Operand};
    use proptest::prelude::*;

    fn word(value: u16) -> BitVector {
        let mut w = BitVector::word();
        w.set_unsigned_value(u32::from(value));
        w
    }

    fn reg() -> impl Strategy<Value = Reg> {
        (0u8..8).prop_map(|i| Reg::new(i).unwrap())
    }

    /// A width and a value representable in it.
    fn width_and_signed() -> impl Strategy<Value = (usize, i32)> {
        (1usize..=MAX_WIDTH).prop_flat_map(|w| {
            let half = 1i64 << (w - 1);
            (Just(w), (-half..half).prop_map(|v| v as i32))
        })
    }

    /// A bit pattern and an in-range (start, len) slice of it.
    fn pattern_and_slice() -> impl Strategy<Value = (String, usize, usize)> {
        "[01]{1,32}".prop_flat_map(|p| {
            let width = p.len();
            (Just(p), 0..width).prop_flat_map(move |(p, start)| {
                (Just(p), Just(start), 1..=width - start)
            })
        })
    }

    /// ADD, AND, NOT or LD; LD offsets stay inside memory.
    fn result_instruction() -> impl Strategy<Value = Instruction> {
        prop_oneof![
            (reg(), reg(), reg()).prop_map(|(d, s, t)| Instruction::add(d, s, t)),
            (reg(), reg(), -16i32..16).prop_map(|(d, s, i)| Instruction::add_imm(d, s, i).unwrap()),
            (reg(), reg(), reg()).prop_map(|(d, s, t)| Instruction::and(d, s, t)),
            (reg(), reg(), -16i32..16).prop_map(|(d, s, i)| Instruction::and_imm(d, s, i).unwrap()),
            (reg(), reg()).prop_map(|(d, s)| Instruction::not(d, s)),
            (reg(), -1i32..48).prop_map(|(d, o)| Instruction::ld(d, o).unwrap()),
        ]
    }

    /// Run `instr` from address 0 of a machine whose registers and memory
    /// hold the given values.
    fn execute_one(instr: &Instruction, regs: &[u16], memory: &[u16]) -> MachineState {
        let mut state = MachineState::new();
        for (i, value) in regs.iter().enumerate() {
            state.registers.set(Reg::new(i as u8).unwrap(), word(*value));
        }
        let mut words: Vec<BitVector> = memory.iter().map(|v| word(*v)).collect();
        words[0] = encode(instr).unwrap();
        state.load_words(&words).unwrap();

        ExecutionEngine::new(&mut state, &mut io::sink()).step().unwrap();
        state
    }

    proptest! {
        #[test]
        fn prop_twos_complement_round_trip((width, n) in width_and_signed()) {
            let mut v = BitVector::zero(width).unwrap();
            v.set_twos_complement_value(n);
            prop_assert_eq!(v.twos_complement_value(), n);
            prop_assert_eq!(v.width(), width);
        }

        #[test]
        fn prop_unsigned_write_keeps_low_bits(width in 1usize..=MAX_WIDTH, n in any::<u32>()) {
            let mut v = BitVector::zero(width).unwrap();
            v.set_unsigned_value(n);
            let mask = if width == 32 { u32::MAX } else { (1u32 << width) - 1 };
            prop_assert_eq!(v.unsigned_value(), n & mask);
        }

        #[test]
        fn prop_substring_is_the_slice((pattern, start, len) in pattern_and_slice()) {
            let v = BitVector::from_bits(&pattern).unwrap();
            let sub = v.substring(start, len).unwrap();
            prop_assert_eq!(sub.width(), len);
            prop_assert_eq!(sub.to_string(), &pattern[start..start + len]);
        }

        #[test]
        fn prop_substring_past_end_fails(pattern in "[01]{1,32}", extra in 1usize..8) {
            let v = BitVector::from_bits(&pattern).unwrap();
            prop_assert!(v.substring(0, pattern.len() + extra).is_err());
            prop_assert!(v.substring(pattern.len(), 1).is_err());
        }

        #[test]
        fn prop_sign_extend_keeps_value((width, n) in width_and_signed(), grow in 0usize..16) {
            let v = BitVector::with_twos_complement(width, n).unwrap();
            let target = (width + grow).min(MAX_WIDTH);
            prop_assert_eq!(v.sign_extend(target).unwrap().twos_complement_value(), n);
        }

        #[test]
        fn prop_exactly_one_flag_after_result(
            instr in result_instruction(),
            regs in prop::collection::vec(any::<u16>(), 8),
            memory in prop::collection::vec(any::<u16>(), 49),
        ) {
            let state = execute_one(&instr, &regs, &memory);

            let set = state.cc().bits().iter().filter(|b| **b == Bit::One).count();
            prop_assert_eq!(set, 1);

            let dr = match instr {
                Instruction::Add { dr, .. }
                | Instruction::And { dr, .. }
                | Instruction::Not { dr, .. }
                | Instruction::Ld { dr, .. } => dr,
                _ => unreachable!(),
            };
            let value = state.register(dr).twos_complement_value();
            prop_assert_eq!(state.condition(), Some(ConditionCode::from_value(value)));
        }

        #[test]
        fn prop_alu_matches_i16(
            instr in result_instruction(),
            regs in prop::collection::vec(any::<u16>(), 8),
        ) {
            let memory = vec![0u16; 49];
            let state = execute_one(&instr, &regs, &memory);
            let r = |reg: Reg| regs[reg.index()] as i16;
            let second = |operand: &Operand| match operand {
                Operand::Register(sr2) => r(*sr2),
                Operand::Immediate(imm) => imm.twos_complement_value() as i16,
            };

            let (dr, expected) = match &instr {
                Instruction::Add { dr, sr1, operand } => (*dr, r(*sr1).wrapping_add(second(operand))),
                Instruction::And { dr, sr1, operand } => (*dr, r(*sr1) & second(operand)),
                Instruction::Not { dr, sr } => (*dr, !r(*sr)),
                _ => return Ok(()),
            };
            prop_assert_eq!(state.register(dr).twos_complement_value(), i32::from(expected));

            // Only dr changed
            for (i, value) in regs.iter().enumerate() {
                if i != dr.index() {
                    prop_assert_eq!(state.registers()[i].unsigned_value(), u32::from(*value));
                }
            }
        }

        #[test]
        fn prop_branch_moves_pc_iff_flag_matches(
            n in any::<bool>(),
            z in any::<bool>(),
            p in any::<bool>(),
            offset in -256i32..256,
            cc in prop::option::of(-1i32..=1),
        ) {
            let mut state = MachineState::new();
            if let Some(value) = cc {
                state.set_condition_code(value);
            }
            state.load_words(&[encode(&Instruction::br(n, z, p, offset).unwrap()).unwrap()]).unwrap();
            let cc_before = state.cc();

            ExecutionEngine::new(&mut state, &mut io::sink()).step().unwrap();

            let taken = match cc.map(ConditionCode::from_value) {
                Some(ConditionCode::Negative) => n,
                Some(ConditionCode::Zero) => z,
                Some(ConditionCode::Positive) => p,
                None => false,
            };
            let expected = if taken { (1 + offset) as u32 & 0xFFFF } else { 1 };
            prop_assert_eq!(state.pc().unsigned_value(), expected);
            prop_assert_eq!(state.cc(), cc_before);
        }

        #[test]
        fn prop_disassembly_reassembles(value in any::<u16>()) {
            let original = word(value);
            let text = disassemble_word(&original);
            let words = assemble(&text).unwrap();
            prop_assert_eq!(words.len(), 1);
            prop_assert_eq!(decode(&words[0]).ok(), decode(&original).ok());
        }

        #[test]
        fn prop_random_programs_never_panic(
            program in prop::collection::vec(any::<u16>(), 1..=49),
            limit in 1u64..200,
        ) {
            let words: Vec<BitVector> = program.iter().map(|v| word(*v)).collect();
            let mut computer = Computer::with_console(Vec::<u8>::new());
            computer.load_program(&words).unwrap();

            match computer.run_limited(limit) {
                Ok(executed) => prop_assert!(executed <= limit),
                Err(_) => prop_assert!(computer.cycles() < limit),
            }
        }
    }
}
