use std::{cmp::Ordering, collections::BTreeMap, hash::{Hash, Hasher}};

use lazy_static::lazy_static;
use strum::IntoEnumIterator;

use crate::{ConfigError, MAX_ADDRESS_BIT};

#[derive(Clone, Copy, Display, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(EnumCount, EnumIter, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum InputKind {
    #[strum(serialize = "IR")]
    Ir,
    #[strum(serialize = "FLAG")]
    Flag,
    #[strum(serialize = "M_CYCLE")]
    MCycle,
}

/// Instruction register bits, in bit order.
#[derive(Clone, Copy, Display, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(EnumCount, EnumIter, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum IrBit {
    #[strum(serialize = "IR_0")]
    Ir0,
    #[strum(serialize = "IR_1")]
    Ir1,
    #[strum(serialize = "IR_2")]
    Ir2,
    #[strum(serialize = "IR_3")]
    Ir3,
    #[strum(serialize = "IR_4")]
    Ir4,
    #[strum(serialize = "IR_5")]
    Ir5,
    #[strum(serialize = "IR_6")]
    Ir6,
    #[strum(serialize = "IR_7")]
    Ir7,
}

/// Machine cycle counter bits, in bit order.
#[derive(Clone, Copy, Display, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(EnumCount, EnumIter, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum MCycle {
    M0,
    M1,
    M2,
    M3,
    M4,
    M5,
    M6,
    M7,
}

lazy_static! {
    static ref IR_BITS: Vec<IrBit> = IrBit::iter().collect();
    static ref M_CYCLES: Vec<MCycle> = MCycle::iter().collect();
}

impl IrBit {
    pub fn from_bit(bit: u32) -> Option<IrBit> {
        IR_BITS.get(bit as usize).copied()
    }

    pub fn bit(&self) -> u32 {
        *self as u32
    }

    pub fn value(&self) -> u32 {
        1 << self.bit()
    }
}

impl MCycle {
    pub fn from_bit(bit: u32) -> Option<MCycle> {
        M_CYCLES.get(bit as usize).copied()
    }

    pub fn bit(&self) -> u32 {
        *self as u32
    }

    pub fn value(&self) -> u32 {
        1 << self.bit()
    }

    /// Highest cycle number a counter running up to and including this bit can hold.
    pub fn max_cycle(&self) -> u32 {
        (self.value() << 1) - 1
    }
}

/// An address line of the control store. Pins are identified by their line.
#[derive(Clone, Debug)]
pub struct InputPin {
    kind: InputKind,
    name: String,
    line: u32,
}

impl InputPin {
    pub fn new(kind: InputKind, name: &str, line: u32) -> InputPin {
        InputPin { kind, name: name.to_owned(), line }
    }

    pub fn kind(&self) -> InputKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn address_bit(&self) -> u32 {
        1 << self.line
    }
}

impl PartialEq for InputPin {
    fn eq(&self, other: &Self) -> bool {
        self.line == other.line
    }
}

impl Eq for InputPin {}

impl Hash for InputPin {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.line.hash(state);
    }
}

impl PartialOrd for InputPin {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InputPin {
    fn cmp(&self, other: &Self) -> Ordering {
        self.line.cmp(&other.line)
    }
}

pub fn is_flag_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    name.len() <= 21 && chars.all(|c| c.is_ascii_lowercase() || c == '_')
}

#[derive(Clone, Debug, Default)]
pub struct InputPins {
    pins: Vec<InputPin>,
    ir: BTreeMap<IrBit, InputPin>,
    cycles: BTreeMap<MCycle, InputPin>,
    flags: Vec<InputPin>,
}

impl InputPins {
    pub fn new() -> InputPins {
        InputPins::default()
    }

    pub fn define_ir(&mut self, bit: IrBit, line: u32) -> Result<(), ConfigError> {
        let pin = self.add(InputKind::Ir, &bit.to_string(), line)?;
        self.ir.insert(bit, pin);
        Ok(())
    }

    pub fn define_cycle(&mut self, bit: MCycle, line: u32) -> Result<(), ConfigError> {
        let pin = self.add(InputKind::MCycle, &bit.to_string(), line)?;
        self.cycles.insert(bit, pin);
        Ok(())
    }

    pub fn define_flag(&mut self, name: &str, line: u32) -> Result<(), ConfigError> {
        if !is_flag_name(name) {
            return Err(ConfigError::FlagName(name.to_owned()));
        }
        let pin = self.add(InputKind::Flag, name, line)?;
        self.flags.push(pin);
        Ok(())
    }

    fn add(&mut self, kind: InputKind, name: &str, line: u32) -> Result<InputPin, ConfigError> {
        if line > MAX_ADDRESS_BIT {
            return Err(ConfigError::AddressLine { name: name.to_owned(), line, max: MAX_ADDRESS_BIT });
        }
        if self.pin(name).is_some() {
            return Err(ConfigError::DuplicateName(name.to_owned()));
        }
        if let Some(existing) = self.pins.iter().find(|p| p.line == line) {
            return Err(ConfigError::DuplicateLine {
                line,
                first: existing.name.clone(),
                second: name.to_owned(),
            });
        }

        let pin = InputPin::new(kind, name, line);
        self.pins.push(pin.clone());
        Ok(pin)
    }

    /// Checks the pins form a usable address space below `max_address_bit`.
    pub fn validate(&self, max_address_bit: u32) -> Result<(), ConfigError> {
        if self.ir.is_empty() {
            return Err(ConfigError::MissingPins(InputKind::Ir));
        }
        if self.cycles.is_empty() {
            return Err(ConfigError::MissingPins(InputKind::MCycle));
        }
        if !self.cycles.keys().enumerate().all(|(i, c)| c.bit() == i as u32) {
            return Err(ConfigError::NonContiguousCycles(InputKind::MCycle));
        }
        if let Some(pin) = self.pins.iter().find(|p| p.line > max_address_bit) {
            return Err(ConfigError::AddressLine {
                name: pin.name.clone(),
                line: pin.line,
                max: max_address_bit,
            });
        }
        Ok(())
    }

    /// All pins in the order they were defined.
    pub fn pins(&self) -> &[InputPin] {
        &self.pins
    }

    pub fn pin(&self, name: &str) -> Option<&InputPin> {
        self.pins.iter().find(|p| p.name == name)
    }

    pub fn flags(&self) -> &[InputPin] {
        &self.flags
    }

    pub fn flag(&self, name: &str) -> Option<&InputPin> {
        self.flags.iter().find(|p| p.name == name)
    }

    pub fn ir_pin(&self, bit: u32) -> Option<&InputPin> {
        IrBit::from_bit(bit).and_then(|b| self.ir.get(&b))
    }

    pub fn cycle_pin(&self, bit: u32) -> Option<&InputPin> {
        MCycle::from_bit(bit).and_then(|b| self.cycles.get(&b))
    }

    /// Opcode bits that reach the address bus.
    pub fn ir_mask(&self) -> u32 {
        self.ir.keys().fold(0, |mask, b| mask | b.value())
    }

    pub fn max_ir_bit(&self) -> IrBit {
        self.ir.keys().next_back().copied().unwrap_or(IrBit::Ir0)
    }

    pub fn max_opcode(&self) -> u32 {
        (self.max_ir_bit().value() << 1) - 1
    }

    pub fn max_cycle(&self) -> u32 {
        self.cycles.keys().next_back().map_or(0, |c| c.max_cycle())
    }
}
