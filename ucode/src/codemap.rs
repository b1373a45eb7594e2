use std::collections::BTreeSet;

use common::InputPins;
use tracing::{debug, trace};

use crate::{
    condition::FlagState,
    error::{Result, UcodeError},
    instruction::Instruction,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpCodeStatus {
    /// Uses bits the instruction register can't hold.
    Invalid,
    /// Not claimed by any instruction.
    Unused,
    Defined,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Entry {
    NoOp,
    Named(usize),
}

#[derive(Clone, Debug)]
enum Slot {
    Invalid,
    Unused,
    Defined(Vec<Entry>),
}

/// The instruction run for every opcode in every flag state.
#[derive(Debug)]
pub struct CodeMap {
    states: Vec<FlagState>,
    instructions: Vec<Instruction>,
    no_op: Instruction,
    unused: Instruction,
    slots: Vec<Slot>,
}

impl CodeMap {
    pub(crate) fn new(
        inputs: &InputPins,
        instructions: Vec<Instruction>,
        no_op: Instruction,
        unused: Instruction,
    ) -> Result<CodeMap> {
        let states = FlagState::all(inputs.flags());
        let ir_mask = inputs.ir_mask();
        let max = inputs.max_opcode();

        let mut entries: Vec<Option<Vec<Entry>>> = vec![None; max as usize + 1];
        for (index, instruction) in instructions.iter().enumerate() {
            let codes = instruction.opcodes().map(|o| o.codes()).unwrap_or_default();
            debug!(instruction = instruction.description(), opcodes = codes.len(), "mapping");

            for &code in codes {
                if code > max || code & ir_mask != code {
                    return Err(UcodeError::InvalidOpCode(code));
                }

                let slot = entries[code as usize]
                    .get_or_insert_with(|| vec![Entry::NoOp; states.len()]);
                for state in states.iter().filter(|s| instruction.matches(s)) {
                    match slot[state.index()] {
                        Entry::Named(other) => {
                            return Err(UcodeError::Conflict {
                                code,
                                first: instructions[other].description().to_owned(),
                                second: instruction.description().to_owned(),
                                state: state.to_string(),
                            });
                        }
                        Entry::NoOp => slot[state.index()] = Entry::Named(index),
                    }
                }
            }
        }

        let slots = entries.into_iter()
            .enumerate()
            .map(|(code, entry)| match entry {
                _ if code as u32 & ir_mask != code as u32 => Slot::Invalid,
                Some(entry) => Slot::Defined(entry),
                None => {
                    trace!(code, "unused");
                    Slot::Unused
                }
            })
            .collect();

        Ok(CodeMap { states, instructions, no_op, unused, slots })
    }

    pub fn max_opcode(&self) -> u32 {
        self.slots.len() as u32 - 1
    }

    pub fn status(&self, code: u32) -> OpCodeStatus {
        match self.slots.get(code as usize) {
            None | Some(Slot::Invalid) => OpCodeStatus::Invalid,
            Some(Slot::Unused) => OpCodeStatus::Unused,
            Some(Slot::Defined(_)) => OpCodeStatus::Defined,
        }
    }

    pub fn is_valid(&self, code: u32) -> bool {
        self.status(code) != OpCodeStatus::Invalid
    }

    pub fn is_defined(&self, code: u32) -> bool {
        self.status(code) == OpCodeStatus::Defined
    }

    pub fn is_unused(&self, code: u32) -> bool {
        self.status(code) == OpCodeStatus::Unused
    }

    /// Every valid opcode, in ascending order.
    pub fn all_valid(&self) -> Vec<u32> {
        (0..=self.max_opcode()).filter(|c| self.is_valid(*c)).collect()
    }

    /// Names of the instructions reachable through `code`, in any flag state.
    pub fn names(&self, code: u32) -> Vec<&str> {
        let names: BTreeSet<&str> = match self.slots.get(code as usize) {
            Some(Slot::Defined(entries)) => entries.iter()
                .filter_map(|e| match e {
                    Entry::Named(i) => self.instructions[*i].name(),
                    Entry::NoOp => None,
                })
                .collect(),
            _ => BTreeSet::new(),
        };
        names.into_iter().collect()
    }

    /// # Panics
    ///
    /// If `code` is not a valid opcode.
    pub fn instruction(&self, code: u32, state: &FlagState) -> &Instruction {
        match self.slots.get(code as usize) {
            None | Some(Slot::Invalid) => panic!("OpCode {} is not valid", code),
            Some(Slot::Unused) => &self.unused,
            Some(Slot::Defined(entries)) => match entries[state.index()] {
                Entry::NoOp => &self.no_op,
                Entry::Named(i) => &self.instructions[i],
            },
        }
    }

    pub fn states(&self) -> &[FlagState] {
        &self.states
    }

    /// Named instructions in the order they were defined.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn no_op(&self) -> &Instruction {
        &self.no_op
    }

    pub fn unused(&self) -> &Instruction {
        &self.unused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorKind, fixtures, instruction::InstructionKind};
    use common::{IrBit, MCycle, PinState};

    fn map(inputs: &InputPins, instructions: Vec<Instruction>) -> Result<CodeMap> {
        CodeMap::new(
            inputs,
            instructions,
            Instruction::new(InstructionKind::NoOp, 3, &[]),
            Instruction::new(InstructionKind::Unused, 3, &[]))
    }

    #[test]
    fn conflict() {
        let inputs = fixtures::inputs();
        let e = map(&inputs, vec![
            fixtures::named(&inputs, "ADD", "01x", &[]),
            fixtures::named(&inputs, "SUB", "x1x", &[]),
        ]).unwrap_err();

        assert_eq!(ErrorKind::Conflict, e.kind());
        assert_eq!(
            "OpCode 2 clashed for instructions 'ADD' and 'SUB' in state {carry=0, zero=0}",
            e.to_string());
    }

    #[test]
    fn overlapping_flags() {
        let inputs = fixtures::inputs();
        let e = map(&inputs, vec![
            fixtures::named(&inputs, "JC", "1x0", &[("carry", PinState::Active)]),
            fixtures::named(&inputs, "JZ", "1x0", &[("zero", PinState::Active)]),
        ]).unwrap_err();

        assert_eq!(ErrorKind::Conflict, e.kind());
        assert_eq!(
            "OpCode 4 clashed for instructions 'JC' and 'JZ' in state {carry=1, zero=1}",
            e.to_string());

        // JC restricted to zero=0 no longer overlaps JZ
        let map = map(&inputs, vec![
            fixtures::named(&inputs, "JC", "1x0", &[("carry", PinState::Active), ("zero", PinState::Inactive)]),
            fixtures::named(&inputs, "JZ", "1x0", &[("zero", PinState::Active)]),
        ]).unwrap();
        assert_eq!(vec!["JC", "JZ"], map.names(6));
    }

    #[test]
    fn disjoint_flags() {
        let inputs = fixtures::inputs();
        let map = map(&inputs, vec![
            fixtures::named(&inputs, "JC", "100", &[("carry", PinState::Active)]),
            fixtures::named(&inputs, "JNC", "100", &[("carry", PinState::Inactive)]),
        ]).unwrap();

        assert_eq!(vec!["JC", "JNC"], map.names(4));
        for state in map.states() {
            let expected = if state.is_set(inputs.flag("carry").unwrap()) { "JC" } else { "JNC" };
            assert_eq!(expected, map.instruction(4, state).description());
        }
    }

    #[test]
    fn no_op_fallback() {
        let inputs = fixtures::inputs();
        let map = map(&inputs, vec![
            fixtures::named(&inputs, "JZ", "110", &[("zero", PinState::Active)]),
        ]).unwrap();

        assert!(map.is_defined(6));
        let zero = inputs.flag("zero").unwrap();
        for state in map.states() {
            let instruction = map.instruction(6, state);
            if state.is_set(zero) {
                assert_eq!("JZ", instruction.description());
            } else {
                assert_eq!(&InstructionKind::NoOp, instruction.kind());
            }
        }
        assert_eq!(vec!["JZ"], map.names(6));
        assert_eq!(&InstructionKind::Unused, map.instruction(5, &map.states()[0]).kind());
    }

    #[test]
    fn classification() {
        // IR_1 is not wired
        let mut inputs = InputPins::new();
        inputs.define_cycle(MCycle::M0, 0).unwrap();
        inputs.define_ir(IrBit::Ir0, 1).unwrap();
        inputs.define_ir(IrBit::Ir2, 2).unwrap();

        let map = map(&inputs, vec![
            fixtures::named(&inputs, "NOP", "000", &[]),
            fixtures::named(&inputs, "OUT", "1x1", &[]),
        ]).unwrap();

        assert_eq!(7, map.max_opcode());
        assert_eq!(vec![0, 1, 4, 5], map.all_valid());
        for code in 0..=7 {
            let status = map.status(code);
            assert_eq!(code & 0b010 == 0, status != OpCodeStatus::Invalid, "{}", code);
            assert_eq!(
                1,
                [map.is_defined(code), map.is_unused(code), !map.is_valid(code)].iter().filter(|b| **b).count());
        }
        assert!(map.is_defined(0));
        assert!(map.is_defined(5));
        assert!(map.is_unused(1));
        assert!(map.is_unused(4));
        assert_eq!(OpCodeStatus::Invalid, map.status(8));
        assert!(map.names(1).is_empty());
        assert!(map.names(2).is_empty());
    }

    #[test]
    #[should_panic]
    fn invalid_lookup() {
        let mut inputs = InputPins::new();
        inputs.define_cycle(MCycle::M0, 0).unwrap();
        inputs.define_ir(IrBit::Ir1, 1).unwrap();
        let map = map(&inputs, vec![]).unwrap();
        map.instruction(1, &map.states()[0]);
    }
}
