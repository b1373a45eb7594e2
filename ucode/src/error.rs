use common::Rom;
use thiserror::Error;

/// Broad class of a compilation failure.
#[derive(Clone, Copy, Display, Debug, PartialEq, Eq, Hash)]
#[derive(EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ErrorKind {
    /// Two instructions claim the same opcode and flag state.
    Conflict,
    /// The builder was driven out of order or given bad input.
    Protocol,
    /// The compiler broke one of its own invariants.
    Internal,
    /// An opcode pattern could not be parsed.
    Pattern,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UcodeError {
    #[error("Invalid opcode pattern '{0}'")]
    InvalidPattern(String),

    #[error("OpCode {code} clashed for instructions '{first}' and '{second}' in state {state}")]
    Conflict { code: u32, first: String, second: String, state: String },

    #[error("No instruction has been started")]
    NotStarted,
    #[error("Instruction '{0}' has not been completed")]
    NotCompleted(String),
    #[error("{0} has already been defined")]
    AlreadyDefined(String),
    #[error("{0} must be defined first")]
    MissingPhase(String),
    #[error("Instruction '{0}' has been defined more than once")]
    DuplicateInstruction(String),
    #[error("OpCode for '{0}' has already been set")]
    DuplicateOpCode(String),
    #[error("Flag '{flag}' for '{instruction}' has already been set")]
    DuplicateFlag { instruction: String, flag: String },
    #[error("{kind} can not be set for {instruction}")]
    Unexpected { instruction: String, kind: String },
    #[error("Unknown flag '{0}'")]
    UnknownFlag(String),
    #[error("Unknown output pin '{0}'")]
    UnknownOutput(String),
    #[error("Output pin '{pin}' is repeated in a cycle of '{instruction}'")]
    RepeatedOutput { instruction: String, pin: String },
    #[error("Too many cycles for {instruction}, the limit is {limit}")]
    TooManyCycles { instruction: String, limit: usize },
    #[error("Too many 'final' cycles for {0}")]
    TooManyFinalCycles(String),
    #[error("OpCode has not been set for '{0}'")]
    MissingOpCode(String),
    #[error("No cycles have been defined for '{0}'")]
    MissingCycles(String),

    #[error("Unexpected 'undefined' instruction count {0}")]
    UnusedCycleCount(isize),
    #[error("Address 0x{0:x} has been written more than once")]
    AddressRewritten(u32),
    #[error("Address 0x{address:x} is outside of a {size} byte ROM")]
    AddressOutOfRange { address: u32, size: usize },
    #[error("Inconsistent ROM lengths: {rom} is {found} bytes, expected {expected}")]
    ImageLength { rom: Rom, expected: usize, found: usize },
    #[error("OpCode {0} is not valid for the instruction register")]
    InvalidOpCode(u32),
}

impl UcodeError {
    pub fn kind(&self) -> ErrorKind {
        use UcodeError::*;
        match self {
            InvalidPattern(_) => ErrorKind::Pattern,
            Conflict { .. } => ErrorKind::Conflict,
            UnusedCycleCount(_)
            | AddressRewritten(_)
            | AddressOutOfRange { .. }
            | ImageLength { .. }
            | InvalidOpCode(_) => ErrorKind::Internal,
            _ => ErrorKind::Protocol,
        }
    }
}

pub type Result<T> = std::result::Result<T, UcodeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn kinds() {
        let kinds: Vec<String> = ErrorKind::iter().map(|k| k.to_string()).collect();
        assert_eq!(vec!["conflict", "protocol", "internal", "pattern"], kinds);

        assert_eq!(ErrorKind::Pattern, UcodeError::InvalidPattern("2".to_owned()).kind());
        assert_eq!(ErrorKind::Protocol, UcodeError::NotStarted.kind());
        assert_eq!(ErrorKind::Protocol, UcodeError::TooManyFinalCycles("ADD".to_owned()).kind());
        assert_eq!(ErrorKind::Internal, UcodeError::AddressRewritten(4).kind());
        assert_eq!("Address 0x1f has been written more than once", UcodeError::AddressRewritten(31).to_string());
    }
}
