use std::collections::BTreeSet;

use common::{GlobalData, InputPins, OutputPin, OutputPins, PinState};
use tracing::{debug, info, warn};

use crate::{
    codemap::CodeMap,
    condition::Condition,
    error::{Result, UcodeError},
    instruction::{Cycle, Instruction, InstructionKind},
    microcode::MicroCode,
    opcodes::OpCodes,
};

/// How far through the definition the builder has got.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    Start,
    Fetch,
    Final,
    Unused,
    Named,
}

/// Collects instruction definitions, in the order fetch, final, unused and then any
/// number of named instructions. Every instruction is closed by
/// [`Builder::complete_instruction`] before the next is started.
pub struct Builder<'a> {
    global: &'a GlobalData,
    inputs: &'a InputPins,
    outputs: &'a OutputPins,
    max_cycle: usize,
    phase: Phase,
    current: Option<Instruction>,
    fetch: Option<Instruction>,
    trailing: Option<Instruction>,
    unused: Option<Instruction>,
    instructions: Vec<Instruction>,
    used: BTreeSet<OutputPin>,
}

impl<'a> Builder<'a> {
    pub fn new(global: &'a GlobalData, inputs: &'a InputPins, outputs: &'a OutputPins) -> Builder<'a> {
        Builder {
            global,
            inputs,
            outputs,
            max_cycle: inputs.max_cycle() as usize,
            phase: Phase::Start,
            current: None,
            fetch: None,
            trailing: None,
            unused: None,
            instructions: Vec::new(),
            used: BTreeSet::new(),
        }
    }

    fn idle(&self) -> Result<()> {
        match &self.current {
            Some(current) => Err(UcodeError::NotCompleted(current.description().to_owned())),
            None => Ok(()),
        }
    }

    fn open(&mut self, phase: Phase, instruction: Instruction) {
        debug!(instruction = instruction.description(), "start");
        self.phase = phase;
        self.current = Some(instruction);
    }

    fn fetch_cycles(&self) -> &[Cycle] {
        self.fetch.as_ref().map(|f| f.cycles()).unwrap_or_default()
    }

    /// Cycles every instruction starts with.
    pub fn start_fetch(&mut self) -> Result<()> {
        self.idle()?;
        if self.phase != Phase::Start {
            return Err(UcodeError::AlreadyDefined(InstructionKind::Fetch.description().to_owned()));
        }
        self.open(Phase::Fetch, Instruction::new(InstructionKind::Fetch, self.max_cycle, &[]));
        Ok(())
    }

    /// Cycles every named instruction ends with.
    pub fn start_final(&mut self) -> Result<()> {
        self.idle()?;
        match self.phase {
            Phase::Start => Err(UcodeError::MissingPhase(InstructionKind::Fetch.description().to_owned())),
            Phase::Fetch => {
                self.open(Phase::Final, Instruction::new(InstructionKind::Final, self.max_cycle, &[]));
                Ok(())
            }
            _ => Err(UcodeError::AlreadyDefined(InstructionKind::Final.description().to_owned())),
        }
    }

    /// Cycles run by opcodes no instruction claims. At most one cycle may follow fetch.
    pub fn start_unused(&mut self) -> Result<()> {
        self.idle()?;
        match self.phase {
            Phase::Start | Phase::Fetch => {
                Err(UcodeError::MissingPhase(InstructionKind::Final.description().to_owned()))
            }
            Phase::Final => {
                let fetch = self.fetch_cycles();
                let limit = fetch.len().min(self.max_cycle);
                let unused = Instruction::new(InstructionKind::Unused, limit, fetch);
                self.open(Phase::Unused, unused);
                Ok(())
            }
            _ => Err(UcodeError::AlreadyDefined(InstructionKind::Unused.description().to_owned())),
        }
    }

    pub fn start_instruction(&mut self, name: &str) -> Result<()> {
        self.idle()?;
        if self.phase < Phase::Unused {
            return Err(UcodeError::MissingPhase(InstructionKind::Unused.description().to_owned()));
        }
        if self.instructions.iter().any(|i| i.name() == Some(name)) {
            return Err(UcodeError::DuplicateInstruction(name.to_owned()));
        }

        let instruction = Instruction::new(
            InstructionKind::Named(name.to_owned()),
            self.max_cycle,
            self.fetch_cycles());
        self.open(Phase::Named, instruction);
        Ok(())
    }

    fn named(&mut self, kind: &str) -> Result<&mut Instruction> {
        match self.current.as_mut() {
            None => Err(UcodeError::NotStarted),
            Some(current) if !current.is_general() => Err(UcodeError::Unexpected {
                instruction: current.description().to_owned(),
                kind: kind.to_owned(),
            }),
            Some(current) => Ok(current),
        }
    }

    /// Sets the opcodes of the current instruction from a pattern such as `0010 1xxx`.
    pub fn set_opcodes(&mut self, pattern: &str) -> Result<()> {
        let opcodes = OpCodes::expand(pattern, self.inputs.ir_mask())?;
        self.named("OpCode")?.set_opcodes(opcodes)
    }

    pub fn set_flag(&mut self, name: &str, state: PinState) -> Result<()> {
        let inputs = self.inputs;
        let pin = inputs.flag(name).ok_or_else(|| UcodeError::UnknownFlag(name.to_owned()))?;
        self.named("Flag")?.set_flag(Condition::new(pin, state))
    }

    /// Adds a cycle asserting the named outputs. An empty list adds an idle cycle.
    pub fn set_cycle<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        let current = self.current.as_mut().ok_or(UcodeError::NotStarted)?;

        let mut cycle = Cycle::new();
        for name in names {
            let name = name.as_ref();
            let pin = self.outputs.pin(name)
                .ok_or_else(|| UcodeError::UnknownOutput(name.to_owned()))?;
            if !cycle.insert(pin.clone()) {
                return Err(UcodeError::RepeatedOutput {
                    instruction: current.description().to_owned(),
                    pin: name.to_owned(),
                });
            }
        }

        self.used.extend(cycle.iter().cloned());
        current.add_cycle(cycle)
    }

    pub fn complete_instruction(&mut self) -> Result<()> {
        let mut instruction = self.current.take().ok_or(UcodeError::NotStarted)?;
        debug!(instruction = instruction.description(), cycles = instruction.cycles().len(), "complete");

        match instruction.kind().clone() {
            InstructionKind::Fetch => self.fetch = Some(instruction),
            InstructionKind::Final => self.trailing = Some(instruction),
            InstructionKind::Unused => self.unused = Some(instruction),
            InstructionKind::NoOp => {}
            InstructionKind::Named(_) => {
                let trailing = self.trailing.as_ref().map(|f| f.cycles()).unwrap_or_default();
                instruction.append_final(trailing)?;
                instruction.default_flags(self.inputs.flags());
                instruction.validate()?;
                self.instructions.push(instruction);
            }
        }
        Ok(())
    }

    /// Resolves every opcode in every flag state and writes the ROM images.
    pub fn build(self) -> Result<MicroCode<'a>> {
        self.idle()?;
        let missing = |kind: InstructionKind| UcodeError::MissingPhase(kind.description().to_owned());
        let fetch = self.fetch.ok_or_else(|| missing(InstructionKind::Fetch))?;
        self.trailing.ok_or_else(|| missing(InstructionKind::Final))?;
        let mut unused = self.unused.ok_or_else(|| missing(InstructionKind::Unused))?;

        let mut no_op = Instruction::new(InstructionKind::NoOp, self.max_cycle, fetch.cycles());
        no_op.default_flags(self.inputs.flags());
        unused.default_flags(self.inputs.flags());

        let extra = unused.cycles().len() as isize - fetch.cycles().len() as isize;
        let halt = match extra {
            0 => Cycle::new(),
            1 => unused.cycles().last().cloned().unwrap_or_default(),
            _ => return Err(UcodeError::UnusedCycleCount(extra)),
        };

        for pin in self.outputs.pins().iter().filter(|p| !self.used.contains(*p)) {
            warn!(pin = pin.name(), rom = %pin.rom(), "output pin is never used");
        }

        info!(
            instructions = self.instructions.len(),
            flags = self.inputs.flags().len(),
            "compiling");
        let code_map = CodeMap::new(self.inputs, self.instructions, no_op, unused)?;
        MicroCode::new(self.global, self.inputs, self.outputs, code_map, halt)
    }
}
