//! Reads a microcode project directory: `project.txt`, `input_pins.txt`,
//! `output_pins.txt` and `code.txt`.

extern crate pest;
#[macro_use]
extern crate pest_derive;

extern crate strum;
#[macro_use]
extern crate strum_macros;

pub mod compiler;
pub mod error;
pub mod pins;
pub mod settings;
pub mod source;

use std::{fs, path::Path};

use common::{GlobalData, InputPins, OutputPins};
use tracing::{debug, event, Level};
use ucode::MicroCode;

pub use error::SourceError;
pub use source::{ProjectFile, SourceFile};

pub fn read(directory: &Path, file: ProjectFile) -> Result<SourceFile, SourceError> {
    let path = directory.join(file.to_string());
    debug!(path = %path.display(), "reading");
    let text = fs::read_to_string(&path).map_err(|source| SourceError::Io { path, source })?;
    SourceFile::parse(file, &text)
}

/// Everything needed to compile the microcode of one machine.
pub struct Project {
    global: GlobalData,
    inputs: InputPins,
    outputs: OutputPins,
    code: SourceFile,
}

impl Project {
    pub fn load(directory: &Path) -> Result<Project, SourceError> {
        event!(Level::INFO, directory = %directory.display(), "loading project");
        let global = settings::parse_settings(&read(directory, ProjectFile::Project)?)?;
        let inputs = pins::parse_inputs(&read(directory, ProjectFile::InputPins)?, global.max_address_bit())?;
        let outputs = pins::parse_outputs(&read(directory, ProjectFile::OutputPins)?)?;
        let code = read(directory, ProjectFile::Code)?;

        Ok(Project { global, inputs, outputs, code })
    }

    pub fn global(&self) -> &GlobalData {
        &self.global
    }

    pub fn inputs(&self) -> &InputPins {
        &self.inputs
    }

    pub fn outputs(&self) -> &OutputPins {
        &self.outputs
    }

    pub fn compile(&self) -> Result<MicroCode<'_>, SourceError> {
        compiler::compile(&self.code, &self.global, &self.inputs, &self.outputs)
    }
}
