use std::collections::{BTreeMap, BTreeSet};

use common::{InputPin, OutputPin, PinState};

use crate::{
    condition::{Condition, FlagState},
    error::{Result, UcodeError},
    opcodes::OpCodes,
};

/// The outputs asserted during one machine cycle.
pub type Cycle = BTreeSet<OutputPin>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstructionKind {
    Fetch,
    Final,
    Unused,
    NoOp,
    Named(String),
}

impl InstructionKind {
    pub fn description(&self) -> &str {
        match self {
            InstructionKind::Fetch => "<common-fetch>",
            InstructionKind::Final => "<common-final>",
            InstructionKind::Unused => "<unused-code>",
            InstructionKind::NoOp => "<no-op>",
            InstructionKind::Named(name) => name,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Instruction {
    kind: InstructionKind,
    opcodes: Option<OpCodes>,
    flags: BTreeMap<InputPin, Condition>,
    cycles: Vec<Cycle>,
    max_cycle: usize,
}

impl Instruction {
    /// An instruction whose cycles are numbered `0..=max_cycle`, starting with `prefix`.
    pub(crate) fn new(kind: InstructionKind, max_cycle: usize, prefix: &[Cycle]) -> Instruction {
        Instruction {
            kind,
            opcodes: None,
            flags: BTreeMap::new(),
            cycles: prefix.to_vec(),
            max_cycle,
        }
    }

    pub fn kind(&self) -> &InstructionKind {
        &self.kind
    }

    /// Set only for instructions defined by name.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            InstructionKind::Named(name) => Some(name),
            _ => None,
        }
    }

    pub fn description(&self) -> &str {
        self.kind.description()
    }

    pub fn is_general(&self) -> bool {
        matches!(self.kind, InstructionKind::Named(_))
    }

    pub fn opcodes(&self) -> Option<&OpCodes> {
        self.opcodes.as_ref()
    }

    pub fn conditions(&self) -> impl Iterator<Item = &Condition> + '_ {
        self.flags.values()
    }

    pub fn condition(&self, pin: &InputPin) -> Option<&Condition> {
        self.flags.get(pin)
    }

    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    pub(crate) fn set_opcodes(&mut self, opcodes: OpCodes) -> Result<()> {
        if self.opcodes.is_some() {
            return Err(UcodeError::DuplicateOpCode(self.description().to_owned()));
        }
        self.opcodes = Some(opcodes);
        Ok(())
    }

    pub(crate) fn set_flag(&mut self, condition: Condition) -> Result<()> {
        if self.flags.contains_key(condition.pin()) {
            return Err(UcodeError::DuplicateFlag {
                instruction: self.description().to_owned(),
                flag: condition.pin().name().to_owned(),
            });
        }
        self.flags.insert(condition.pin().clone(), condition);
        Ok(())
    }

    pub(crate) fn add_cycle(&mut self, cycle: Cycle) -> Result<()> {
        if self.cycles.len() > self.max_cycle {
            return Err(UcodeError::TooManyCycles {
                instruction: self.description().to_owned(),
                limit: self.max_cycle + 1,
            });
        }
        self.cycles.push(cycle);
        Ok(())
    }

    /// The first trailing cycle runs alongside the last cycle of this instruction, the
    /// rest follow it.
    pub(crate) fn append_final(&mut self, trailing: &[Cycle]) -> Result<()> {
        let mut trailing = trailing.iter();
        if let Some(first) = trailing.next() {
            match self.cycles.last_mut() {
                Some(last) => last.extend(first.iter().cloned()),
                None => self.cycles.push(first.clone()),
            }
        }
        self.cycles.extend(trailing.cloned());

        if self.cycles.len() > self.max_cycle + 1 {
            return Err(UcodeError::TooManyFinalCycles(self.description().to_owned()));
        }
        Ok(())
    }

    /// Any flag without a condition may take either level.
    pub(crate) fn default_flags(&mut self, flags: &[InputPin]) {
        for flag in flags {
            self.flags.entry(flag.clone())
                .or_insert_with(|| Condition::new(flag, PinState::Either));
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.opcodes.is_none() {
            return Err(UcodeError::MissingOpCode(self.description().to_owned()));
        }
        if self.cycles.is_empty() {
            return Err(UcodeError::MissingCycles(self.description().to_owned()));
        }
        Ok(())
    }

    pub fn matches(&self, state: &FlagState) -> bool {
        self.flags.values().all(|c| c.accepts(state.is_set(c.pin())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use common::InputKind;

    fn named(max_cycle: usize) -> Instruction {
        Instruction::new(InstructionKind::Named("LDA".to_owned()), max_cycle, &[])
    }

    #[test]
    fn descriptions() {
        assert_eq!("<no-op>", Instruction::new(InstructionKind::NoOp, 0, &[]).description());
        assert_eq!(None, Instruction::new(InstructionKind::Unused, 0, &[]).name());
        assert!(!Instruction::new(InstructionKind::Fetch, 0, &[]).is_general());
        assert_eq!(Some("LDA"), named(3).name());
        assert!(named(3).is_general());
    }

    #[test]
    fn cycle_limit() {
        let outputs = fixtures::outputs();
        let mut instruction = named(1);
        instruction.add_cycle(fixtures::cycle(&outputs, &["MI"])).unwrap();
        instruction.add_cycle(fixtures::cycle(&outputs, &["RO"])).unwrap();
        assert_eq!(
            Err(UcodeError::TooManyCycles { instruction: "LDA".to_owned(), limit: 2 }),
            instruction.add_cycle(fixtures::cycle(&outputs, &["II"])));
    }

    #[test]
    fn final_cycles() {
        let outputs = fixtures::outputs();
        let mut instruction = named(3);
        instruction.add_cycle(fixtures::cycle(&outputs, &["MI"])).unwrap();
        instruction.add_cycle(fixtures::cycle(&outputs, &["RO"])).unwrap();
        instruction.append_final(&[
            fixtures::cycle(&outputs, &["AI"]),
            fixtures::cycle(&outputs, &["HLT"]),
        ]).unwrap();

        assert_eq!(
            vec![
                fixtures::cycle(&outputs, &["MI"]),
                fixtures::cycle(&outputs, &["RO", "AI"]),
                fixtures::cycle(&outputs, &["HLT"]),
            ],
            instruction.cycles());

        assert_eq!(
            Err(UcodeError::TooManyFinalCycles("LDA".to_owned())),
            instruction.append_final(&[Cycle::new(), Cycle::new(), Cycle::new()]));
    }

    #[test]
    fn zero_final_cycles() {
        let outputs = fixtures::outputs();
        let mut instruction = named(3);
        instruction.add_cycle(fixtures::cycle(&outputs, &["MI"])).unwrap();
        instruction.append_final(&[]).unwrap();
        assert_eq!(vec![fixtures::cycle(&outputs, &["MI"])], instruction.cycles());
    }

    #[test]
    fn flags() {
        let inputs = fixtures::inputs();
        let carry = inputs.flag("carry").unwrap();
        let states = FlagState::all(inputs.flags());

        let mut instruction = named(3);
        instruction.set_flag(Condition::new(carry, PinState::Active)).unwrap();
        assert!(matches!(
            instruction.set_flag(Condition::new(carry, PinState::Inactive)),
            Err(UcodeError::DuplicateFlag { .. })));

        instruction.default_flags(inputs.flags());
        let zero = inputs.flag("zero").unwrap();
        assert_eq!(PinState::Either, instruction.condition(zero).unwrap().state());
        assert_eq!(PinState::Active, instruction.condition(carry).unwrap().state());

        let matched: Vec<usize> = states.iter()
            .filter(|s| instruction.matches(s))
            .map(|s| s.index())
            .collect();
        assert_eq!(vec![1, 3], matched);

        let unknown = InputPin::new(InputKind::Flag, "other", 18);
        assert!(instruction.condition(&unknown).is_none());
    }

    #[test]
    fn validate() {
        let outputs = fixtures::outputs();
        let mut instruction = named(3);
        assert_eq!(Err(UcodeError::MissingOpCode("LDA".to_owned())), instruction.validate());
        instruction.set_opcodes(OpCodes::expand("0001", 0xff).unwrap()).unwrap();
        assert_eq!(Err(UcodeError::MissingCycles("LDA".to_owned())), instruction.validate());
        instruction.add_cycle(fixtures::cycle(&outputs, &[])).unwrap();
        assert!(instruction.validate().is_ok());
        assert!(matches!(
            instruction.set_opcodes(OpCodes::expand("0010", 0xff).unwrap()),
            Err(UcodeError::DuplicateOpCode(_))));
    }
}
