use std::str::FromStr;

use common::{InputKind, InputPins, IrBit, MCycle, OutputPins, Rom};
use tracing::debug;

use crate::{
    error::SourceError,
    source::{SourceFile, SourceLine},
};

fn columns<'l>(source: &SourceFile, line: &'l SourceLine) -> Result<(&'l str, &'l str), SourceError> {
    match line.columns.as_slice() {
        [name, value] => Ok((name.as_str(), value.as_str())),
        columns => Err(SourceError::line(
            source.file(),
            line.number,
            format!("Expected 2 columns but found {}", columns.len()))),
    }
}

fn pin<T: FromStr>(source: &SourceFile, line: &SourceLine, value: &str) -> Result<T, SourceError> {
    value.parse()
        .map_err(|_| SourceError::line(source.file(), line.number, format!("Invalid pin number '{}'", value)))
}

/// Reads `input_pins.txt`, checking the pins against the highest address line.
pub fn parse_inputs(source: &SourceFile, max_address_bit: u32) -> Result<InputPins, SourceError> {
    let mut inputs = InputPins::new();
    for kind in [InputKind::Ir, InputKind::MCycle, InputKind::Flag] {
        let group = match source.find(kind) {
            Some(group) => group,
            None => continue,
        };

        for line in &group.lines {
            let (name, value) = columns(source, line)?;
            let address = pin(source, line, value)?;
            let invalid = || SourceError::line(source.file(), line.number, format!("Invalid {} field '{}'", kind, name));
            match kind {
                InputKind::Ir => {
                    let bit = IrBit::from_str(name).map_err(|_| invalid())?;
                    inputs.define_ir(bit, address).map_err(SourceError::config(source.file(), line))?;
                }
                InputKind::MCycle => {
                    let bit = MCycle::from_str(name).map_err(|_| invalid())?;
                    inputs.define_cycle(bit, address).map_err(SourceError::config(source.file(), line))?;
                }
                InputKind::Flag => inputs.define_flag(name, address).map_err(SourceError::config(source.file(), line))?,
            }
        }
    }

    inputs.validate(max_address_bit)
        .map_err(|e| SourceError::Invalid { file: source.file(), source: e })?;
    debug!(
        pins = inputs.pins().len(),
        flags = inputs.flags().len(),
        ir_mask = inputs.ir_mask(),
        max_cycle = inputs.max_cycle(),
        "input pins");
    Ok(inputs)
}

/// Reads `output_pins.txt`. A name starting with `/` is active low.
pub fn parse_outputs(source: &SourceFile) -> Result<OutputPins, SourceError> {
    let mut outputs = OutputPins::new();

    for group in source.groups() {
        let rom = Rom::from_str(&group.name)
            .map_err(|_| SourceError::line(source.file(), group.number, format!("Chip name '{}' is invalid", group.name)))?;

        for line in &group.lines {
            let (name, value) = columns(source, line)?;
            let bit = pin(source, line, value)?;
            let (name, active_low) = match name.strip_prefix('/') {
                Some(name) => (name, true),
                None => (name, false),
            };
            outputs.define(name, rom, bit, active_low)
                .map_err(SourceError::config(source.file(), line))?;
        }
    }

    debug!(pins = outputs.pins().len(), roms = outputs.roms().len(), "output pins");
    Ok(outputs)
}
