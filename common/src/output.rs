use std::{cmp::Ordering, hash::{Hash, Hasher}};

use crate::{ConfigError, MAX_DATA_BIT};

#[derive(Clone, Copy, Display, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(EnumCount, EnumIter, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Rom {
    #[strum(serialize = "ROM_1")]
    Rom1,
    #[strum(serialize = "ROM_2")]
    Rom2,
    #[strum(serialize = "ROM_3")]
    Rom3,
    #[strum(serialize = "ROM_4")]
    Rom4,
    #[strum(serialize = "ROM_5")]
    Rom5,
    #[strum(serialize = "ROM_6")]
    Rom6,
    #[strum(serialize = "ROM_7")]
    Rom7,
    #[strum(serialize = "ROM_8")]
    Rom8,
}

impl Rom {
    pub fn number(&self) -> u32 {
        *self as u32 + 1
    }

    pub fn file_name(&self, extension: &str) -> String {
        format!("Rom{}.{}", self.number(), extension)
    }
}

/// A data line of one of the control store ROMs. Pins are identified by ROM and bit.
#[derive(Clone, Debug)]
pub struct OutputPin {
    name: String,
    rom: Rom,
    bit: u8,
    active_low: bool,
}

impl OutputPin {
    pub fn new(name: &str, rom: Rom, bit: u8, active_low: bool) -> OutputPin {
        OutputPin { name: name.to_owned(), rom, bit, active_low }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rom(&self) -> Rom {
        self.rom
    }

    pub fn bit(&self) -> u8 {
        self.bit
    }

    pub fn active_low(&self) -> bool {
        self.active_low
    }
}

impl PartialEq for OutputPin {
    fn eq(&self, other: &Self) -> bool {
        self.rom == other.rom && self.bit == other.bit
    }
}

impl Eq for OutputPin {}

impl Hash for OutputPin {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rom.hash(state);
        self.bit.hash(state);
    }
}

impl PartialOrd for OutputPin {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OutputPin {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.rom, self.bit).cmp(&(other.rom, other.bit))
    }
}

#[derive(Clone, Debug, Default)]
pub struct OutputPins {
    pins: Vec<OutputPin>,
}

impl OutputPins {
    pub fn new() -> OutputPins {
        OutputPins::default()
    }

    /// Names are matched without regard to case.
    pub fn define(&mut self, name: &str, rom: Rom, bit: u8, active_low: bool) -> Result<(), ConfigError> {
        if name.is_empty() || name == "-" || name.contains(char::is_whitespace) {
            return Err(ConfigError::OutputName(name.to_owned()));
        }
        if bit > MAX_DATA_BIT {
            return Err(ConfigError::DataBit { name: name.to_owned(), bit });
        }
        if self.pin(name).is_some() {
            return Err(ConfigError::DuplicateName(name.to_owned()));
        }

        let pin = OutputPin::new(name, rom, bit, active_low);
        if let Some(existing) = self.pins.iter().find(|p| **p == pin) {
            return Err(ConfigError::DuplicateDataBit {
                rom,
                bit,
                first: existing.name.clone(),
                second: name.to_owned(),
            });
        }

        self.pins.push(pin);
        Ok(())
    }

    pub fn pin(&self, name: &str) -> Option<&OutputPin> {
        self.pins.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// All pins in the order they were defined.
    pub fn pins(&self) -> &[OutputPin] {
        &self.pins
    }

    pub fn pins_for(&self, rom: Rom) -> impl Iterator<Item = &OutputPin> + '_ {
        self.pins.iter().filter(move |p| p.rom == rom)
    }

    /// ROMs with at least one pin, in ROM order.
    pub fn roms(&self) -> Vec<Rom> {
        let mut roms: Vec<Rom> = self.pins.iter().map(|p| p.rom).collect();
        roms.sort();
        roms.dedup();
        roms
    }
}
