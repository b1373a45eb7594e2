use crate::{ConfigError, MAX_ADDRESS_BIT};

/// Project wide settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalData {
    name: String,
    version: String,
    max_address_bit: u32,
    descriptions: Vec<String>,
}

impl GlobalData {
    pub fn new(name: &str, version: &str, max_address_bit: u32) -> Result<GlobalData, ConfigError> {
        if !(1..=MAX_ADDRESS_BIT).contains(&max_address_bit) {
            return Err(ConfigError::MaxAddressBit(max_address_bit));
        }

        Ok(GlobalData {
            name: name.to_owned(),
            version: version.to_owned(),
            max_address_bit,
            descriptions: Vec::new(),
        })
    }

    pub fn add_description(&mut self, line: &str) {
        self.descriptions.push(line.to_owned());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn descriptions(&self) -> &[String] {
        &self.descriptions
    }

    /// Address lines are numbered A0..=Amax.
    pub fn max_address_bit(&self) -> u32 {
        self.max_address_bit
    }

    pub fn address_lines(&self) -> u32 {
        self.max_address_bit + 1
    }

    pub fn rom_size(&self) -> usize {
        1 << self.address_lines()
    }
}
