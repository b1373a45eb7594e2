//! A small SAP-1 style machine shared by the unit tests.

use common::*;

use crate::{
    condition::Condition,
    instruction::{Cycle, Instruction, InstructionKind},
    opcodes::OpCodes,
};

/// M0/M1 on A0/A1, IR_0..IR_2 on A2..A4, carry on A5 and zero on A6.
pub fn inputs() -> InputPins {
    let mut inputs = InputPins::new();
    inputs.define_cycle(MCycle::M0, 0).unwrap();
    inputs.define_cycle(MCycle::M1, 1).unwrap();
    inputs.define_ir(IrBit::Ir0, 2).unwrap();
    inputs.define_ir(IrBit::Ir1, 3).unwrap();
    inputs.define_ir(IrBit::Ir2, 4).unwrap();
    inputs.define_flag("carry", 5).unwrap();
    inputs.define_flag("zero", 6).unwrap();
    inputs
}

pub fn outputs() -> OutputPins {
    let mut outputs = OutputPins::new();
    outputs.define("MI", Rom::Rom1, 0, false).unwrap();
    outputs.define("RO", Rom::Rom1, 1, false).unwrap();
    outputs.define("II", Rom::Rom1, 2, false).unwrap();
    outputs.define("IO", Rom::Rom1, 3, false).unwrap();
    outputs.define("HLT", Rom::Rom1, 7, true).unwrap();
    outputs.define("AI", Rom::Rom2, 0, false).unwrap();
    outputs.define("BI", Rom::Rom2, 1, false).unwrap();
    outputs.define("EO", Rom::Rom2, 2, false).unwrap();
    outputs.define("OI", Rom::Rom2, 3, false).unwrap();
    outputs
}

pub fn global() -> GlobalData {
    GlobalData::new("SAP-1", "1.0", 6).unwrap()
}

pub fn cycle(outputs: &OutputPins, names: &[&str]) -> Cycle {
    names.iter().map(|n| outputs.pin(n).unwrap().clone()).collect()
}

/// A completed single cycle instruction.
pub fn named(inputs: &InputPins, name: &str, pattern: &str, flags: &[(&str, PinState)]) -> Instruction {
    let mut instruction = Instruction::new(
        InstructionKind::Named(name.to_owned()),
        inputs.max_cycle() as usize,
        &[]);
    instruction.set_opcodes(OpCodes::expand(pattern, inputs.ir_mask()).unwrap()).unwrap();
    for (flag, state) in flags {
        instruction.set_flag(Condition::new(inputs.flag(flag).unwrap(), *state)).unwrap();
    }
    instruction.add_cycle(Cycle::new()).unwrap();
    instruction.default_flags(inputs.flags());
    instruction
}
