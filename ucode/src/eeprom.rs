use std::collections::BTreeMap;

use common::Rom;
use itertools::Itertools;
use tracing::{debug, trace};

use crate::{
    codemap::CodeMap,
    error::{Result, UcodeError},
    instruction::Cycle,
    mapper::{AddressMapper, DataMapper},
};

/// Annotation of an address no instruction writes to.
pub const NO_INSTRUCTION: &str = "<no instruction>";

/// Description of an opcode no instruction claims.
pub const UNUSED: &str = "<unused>";

/// The finished content of every ROM, with a note describing each address.
#[derive(Debug)]
pub struct EepromMap {
    size: usize,
    images: BTreeMap<Rom, Vec<u8>>,
    annotations: Vec<Option<String>>,
}

impl EepromMap {
    /// Writes every cycle of every reachable instruction. Addresses nothing writes hold
    /// the `halt` outputs.
    pub(crate) fn build(
        code_map: &CodeMap,
        addresses: &AddressMapper,
        data: &DataMapper,
        roms: &[Rom],
        size: usize,
        halt: &Cycle,
    ) -> Result<EepromMap> {
        let mut annotations: Vec<Option<String>> = vec![None; size];
        let mut images: BTreeMap<Rom, Vec<u8>> = roms.iter()
            .map(|rom| (*rom, vec![data.data(*rom, halt); size]))
            .collect();

        let mut written = 0;
        for code in code_map.all_valid() {
            let description = if code_map.is_unused(code) {
                UNUSED.to_owned()
            } else {
                code_map.names(code).iter().join(", ")
            };

            for state in code_map.states() {
                let instruction = code_map.instruction(code, state);
                for (cycle, outputs) in instruction.cycles().iter().enumerate() {
                    let address = addresses.address(state, code, cycle as u32);
                    let annotation = annotations.get_mut(address as usize)
                        .ok_or(UcodeError::AddressOutOfRange { address, size })?;
                    if annotation.is_some() {
                        return Err(UcodeError::AddressRewritten(address));
                    }

                    trace!(address, code, cycle, instruction = instruction.description(), "write");
                    *annotation = Some(format!(
                        "opCode 0x{:02x} ({:03}), cycle {:02}: {}",
                        code, code, cycle, description));
                    for (rom, image) in images.iter_mut() {
                        image[address as usize] = data.data(*rom, outputs);
                    }
                    written += 1;
                }
            }
        }

        debug!(size, written, roms = roms.len(), "materialised");
        EepromMap::from_images(size, images, annotations)
    }

    pub(crate) fn from_images(
        size: usize,
        images: BTreeMap<Rom, Vec<u8>>,
        mut annotations: Vec<Option<String>>,
    ) -> Result<EepromMap> {
        if let Some((rom, image)) = images.iter().find(|(_, image)| image.len() != size) {
            return Err(UcodeError::ImageLength { rom: *rom, expected: size, found: image.len() });
        }
        annotations.resize(size, None);

        Ok(EepromMap { size, images, annotations })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn max_address(&self) -> u32 {
        self.size as u32 - 1
    }

    pub fn roms(&self) -> impl Iterator<Item = Rom> + '_ {
        self.images.keys().copied()
    }

    pub fn image(&self, rom: Rom) -> Option<&[u8]> {
        self.images.get(&rom).map(|i| i.as_slice())
    }

    pub fn read(&self, rom: Rom, address: u32) -> Option<u8> {
        self.image(rom).and_then(|i| i.get(address as usize)).copied()
    }

    pub fn annotation(&self, address: u32) -> &str {
        self.annotations.get(address as usize)
            .and_then(|a| a.as_deref())
            .unwrap_or(NO_INSTRUCTION)
    }
}
