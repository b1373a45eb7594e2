use std::str::FromStr;

use common::{GlobalData, InputPins, OutputPins, PinState};
use tracing::{debug, error, span, Level};
use ucode::{Builder, MicroCode};

use crate::{
    error::SourceError,
    source::{SourceFile, SourceGroup, SourceLine, InstructionGroup},
};

/// Column that starts an opcode line.
pub const IR: &str = "IR";

/// A cycle line that asserts nothing.
pub const SKIP_CYCLE: &str = "-";

struct Compiler<'a, 'b> {
    source: &'b SourceFile,
    inputs: &'a InputPins,
    builder: Builder<'a>,
}

impl<'a, 'b> Compiler<'a, 'b> {
    fn group(&mut self, group: Option<&SourceGroup>, special: bool) -> Result<(), SourceError> {
        let file = self.source.file();
        if let Some(group) = group {
            for line in &group.lines {
                self.line(line, special)?;
            }
            self.builder.complete_instruction()
                .map_err(|source| SourceError::Code { file, line: group.number, source })
        } else {
            self.builder.complete_instruction().map_err(SourceError::from)
        }
    }

    fn line(&mut self, line: &SourceLine, special: bool) -> Result<(), SourceError> {
        let file = self.source.file();
        let input = match line.columns.first() {
            Some(input) => input.as_str(),
            None => return Ok(()),
        };

        if line.indented {
            let names: &[String] = match line.columns.as_slice() {
                [skip] if skip == SKIP_CYCLE => &[],
                names => names,
            };
            return self.builder.set_cycle(names).map_err(SourceError::code(file, line));
        }

        if !special && input == IR {
            let pattern = match &line.columns[1..] {
                [code] => code.clone(),
                [high, low] => format!("{}{}", high, low),
                _ => return Err(SourceError::line(
                    file,
                    line.number,
                    "Expected a single value for the Instruction Register")),
            };
            return self.builder.set_opcodes(&pattern).map_err(SourceError::code(file, line));
        }

        if !special && self.inputs.flag(input).is_some() {
            let state = match &line.columns[1..] {
                [state] => PinState::from_str(state).map_err(|_| SourceError::line(
                    file,
                    line.number,
                    format!("Expected 0, 1 or x for the Flag {}, not '{}'", input, state)))?,
                _ => return Err(SourceError::line(
                    file,
                    line.number,
                    format!("Expected a single value for Flag {}", input))),
            };
            return self.builder.set_flag(input, state).map_err(SourceError::code(file, line));
        }

        Err(SourceError::line(file, line.number, format!("Unexpected input '{}'", input)))
    }
}

/// Compiles `code.txt`: the fetch, final and unused groups, then every named instruction
/// in the order written.
pub fn compile<'a>(
    source: &SourceFile,
    global: &'a GlobalData,
    inputs: &'a InputPins,
    outputs: &'a OutputPins,
) -> Result<MicroCode<'a>, SourceError> {
    let file = source.file();
    let span = span!(Level::ERROR, "compile", %file);
    let _enter = span.enter();

    let fetch = source.find(InstructionGroup::Fetch).ok_or_else(|| SourceError::MissingSection {
        file,
        section: InstructionGroup::Fetch.to_string(),
    })?;
    let trailing = source.find(InstructionGroup::Final);
    let unused = source.find(InstructionGroup::Unused);

    let builder = Builder::new(global, inputs, outputs);
    let mut compiler = Compiler { source, inputs, builder };
    compiler.builder.start_fetch()?;
    compiler.group(Some(fetch), true)?;
    compiler.builder.start_final()?;
    compiler.group(trailing, true)?;
    compiler.builder.start_unused()?;
    compiler.group(unused, true)?;

    let named = source.groups().iter().filter(|g| InstructionGroup::from_str(&g.name).is_err());
    for group in named {
        debug!(name = group.name.as_str(), lines = group.lines.len(), "instruction");
        compiler.builder.start_instruction(&group.name)
            .map_err(|source| SourceError::Code { file, line: group.number, source })?;
        compiler.group(Some(group), false)?;
    }

    compiler.builder.build().map_err(|e| {
        error!(kind = %e.kind(), "compilation failed");
        SourceError::Build(e)
    })
}
