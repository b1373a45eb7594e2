//! Compiles microcode definitions into the content of a control store built from one
//! or more byte wide ROMs, addressed by flag, opcode and machine cycle lines.

extern crate strum;
#[macro_use]
extern crate strum_macros;

pub mod builder;
pub mod codemap;
pub mod condition;
pub mod eeprom;
pub mod error;
pub mod instruction;
pub mod mapper;
pub mod microcode;
pub mod opcodes;

#[cfg(test)]
mod fixtures;

pub use builder::Builder;
pub use codemap::{CodeMap, OpCodeStatus};
pub use condition::{Condition, FlagState};
pub use eeprom::{EepromMap, NO_INSTRUCTION, UNUSED};
pub use error::{ErrorKind, UcodeError};
pub use instruction::{Cycle, Instruction, InstructionKind};
pub use mapper::{AddressMapper, DataMapper};
pub use microcode::{Content, ContentEntry, MicroCode, Report};
pub use opcodes::OpCodes;
