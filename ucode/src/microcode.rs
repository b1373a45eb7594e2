use std::io;

use common::{GlobalData, InputPin, InputPins, OutputPins, Rom};
use tracing::info;

use crate::{
    codemap::{CodeMap, OpCodeStatus},
    condition::FlagState,
    eeprom::EepromMap,
    error::{Result, UcodeError},
    instruction::Cycle,
    mapper::{AddressMapper, DataMapper},
};

/// One address of the control store, as seen by a [`Content`] sink.
#[derive(Clone, Debug)]
pub struct ContentEntry<'e> {
    pub opcode: u32,
    pub cycle: u32,
    pub flags: &'e FlagState,
    pub address: u32,
    pub data: Vec<(Rom, u8)>,
    pub annotation: &'e str,
}

impl<'e> ContentEntry<'e> {
    pub fn active_flags(&self) -> impl Iterator<Item = &'e InputPin> + 'e {
        self.flags.active()
    }

    pub fn byte(&self, rom: Rom) -> Option<u8> {
        self.data.iter().find(|(r, _)| *r == rom).map(|(_, b)| *b)
    }
}

/// Receives every address of the control store.
pub trait Content {
    fn entry(&mut self, entry: &ContentEntry<'_>) -> io::Result<()>;

    fn close(&mut self) -> io::Result<()>;
}

/// Receives a summary of how each opcode is used.
pub trait Report {
    fn unused_code(&mut self, code: u32);

    fn used_code(&mut self, code: u32, names: &[&str]);

    fn close(&mut self) -> io::Result<()>;
}

/// A compiled control store.
pub struct MicroCode<'a> {
    global: &'a GlobalData,
    inputs: &'a InputPins,
    outputs: &'a OutputPins,
    addresses: AddressMapper<'a>,
    code_map: CodeMap,
    eeprom: EepromMap,
    halt: Cycle,
}

impl<'a> MicroCode<'a> {
    pub(crate) fn new(
        global: &'a GlobalData,
        inputs: &'a InputPins,
        outputs: &'a OutputPins,
        code_map: CodeMap,
        halt: Cycle,
    ) -> Result<MicroCode<'a>> {
        let size = global.rom_size();
        if let Some(pin) = inputs.pins().iter().find(|p| p.address_bit() as usize >= size) {
            return Err(UcodeError::AddressOutOfRange { address: pin.address_bit(), size });
        }

        let addresses = AddressMapper::new(inputs);
        let eeprom = EepromMap::build(
            &code_map,
            &addresses,
            &DataMapper::new(outputs),
            &outputs.roms(),
            size,
            &halt)?;

        info!(
            name = global.name(),
            version = global.version(),
            opcodes = code_map.all_valid().len(),
            states = code_map.states().len(),
            "compiled");

        Ok(MicroCode { global, inputs, outputs, addresses, code_map, eeprom, halt })
    }

    pub fn global(&self) -> &GlobalData {
        self.global
    }

    pub fn inputs(&self) -> &InputPins {
        self.inputs
    }

    pub fn outputs(&self) -> &OutputPins {
        self.outputs
    }

    pub fn code_map(&self) -> &CodeMap {
        &self.code_map
    }

    pub fn eeprom(&self) -> &EepromMap {
        &self.eeprom
    }

    /// Outputs asserted at every address no instruction reaches.
    pub fn halt(&self) -> &Cycle {
        &self.halt
    }

    pub fn report<R: Report + ?Sized>(&self, report: &mut R) {
        for code in 0..=self.code_map.max_opcode() {
            match self.code_map.status(code) {
                OpCodeStatus::Defined => report.used_code(code, &self.code_map.names(code)),
                OpCodeStatus::Unused => report.unused_code(code),
                OpCodeStatus::Invalid => {}
            }
        }
    }

    /// Passes every valid opcode, flag state and machine cycle to `content`.
    pub fn generate<C: Content + ?Sized>(&self, content: &mut C) -> io::Result<()> {
        let max_cycle = self.inputs.max_cycle();
        for code in self.code_map.all_valid() {
            for state in self.code_map.states() {
                for cycle in 0..=max_cycle {
                    let address = self.addresses.address(state, code, cycle);
                    let data = self.eeprom.roms()
                        .map(|rom| (rom, self.eeprom.read(rom, address).unwrap_or_default()))
                        .collect();

                    content.entry(&ContentEntry {
                        opcode: code,
                        cycle,
                        flags: state,
                        address,
                        data,
                        annotation: self.eeprom.annotation(address),
                    })?;
                }
            }
        }
        Ok(())
    }
}
