use std::{cell::RefCell, collections::HashMap};

use common::{InputPin, InputPins, OutputPins, Rom};

use crate::{condition::FlagState, instruction::Cycle};

/// Sets the address line of every pin whose logical bit is set in `value`.
/// Bits without a pin do not reach the address bus.
fn spread<'p>(value: u32, pin: impl Fn(u32) -> Option<&'p InputPin>) -> u32 {
    (0..u32::BITS)
        .filter(|b| (value >> b) & 1 == 1)
        .filter_map(pin)
        .fold(0, |address, p| address | p.address_bit())
}

/// Maps a flag state, opcode and machine cycle onto a ROM address.
pub struct AddressMapper<'a> {
    inputs: &'a InputPins,
    codes: RefCell<HashMap<u32, u32>>,
    cycles: RefCell<HashMap<u32, u32>>,
}

impl<'a> AddressMapper<'a> {
    pub fn new(inputs: &'a InputPins) -> AddressMapper<'a> {
        AddressMapper {
            inputs,
            codes: RefCell::new(HashMap::new()),
            cycles: RefCell::new(HashMap::new()),
        }
    }

    pub fn address(&self, state: &FlagState, code: u32, cycle: u32) -> u32 {
        state.address() | self.code_address(code) | self.cycle_address(cycle)
    }

    fn code_address(&self, code: u32) -> u32 {
        let inputs = self.inputs;
        *self.codes.borrow_mut()
            .entry(code)
            .or_insert_with(|| spread(code, |b| inputs.ir_pin(b)))
    }

    fn cycle_address(&self, cycle: u32) -> u32 {
        let inputs = self.inputs;
        *self.cycles.borrow_mut()
            .entry(cycle)
            .or_insert_with(|| spread(cycle, |b| inputs.cycle_pin(b)))
    }
}

/// Maps a set of asserted outputs onto the byte held by one ROM.
pub struct DataMapper<'a> {
    outputs: &'a OutputPins,
}

impl<'a> DataMapper<'a> {
    pub fn new(outputs: &'a OutputPins) -> DataMapper<'a> {
        DataMapper { outputs }
    }

    pub fn data(&self, rom: Rom, active: &Cycle) -> u8 {
        self.outputs.pins_for(rom)
            .filter(|p| active.contains(*p) != p.active_low())
            .fold(0, |data, p| data | (1 << p.bit()))
    }
}
