// Fatal VM errors abort the interpreter cleanly; everything recoverable is a
// log::warn! at the site that detected it and execution continues.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VmError {
    #[error("stack overflow")]
    StackOverflow,
    #[error("tried to pop from empty stack")]
    StackUnderflow,
    #[error("stack pointer is non-zero at end of expression")]
    DirtyStack,
    #[error("division by zero")]
    DivideByZero,
    #[error("instruction pointer out of bounds: {0:#x}")]
    IpOutOfBounds(u32),
    #[error("memory access out of bounds: {offset:#x}+{len}")]
    OutOfBounds { offset: usize, len: usize },
    #[error("invalid procedure number: {0}")]
    InvalidProcedure(u32),
    #[error("procedure {0} not defined")]
    UndefinedProcedure(u32),
    #[error("MES call stack overflow")]
    CallStackOverflow,
    #[error("tried to farcall to invalid address {0:#x}")]
    InvalidFarcall(u32),
    #[error("too many parameters")]
    TooManyParams,
    #[error("too few parameters: wanted index {0}")]
    TooFewParams(usize),
    #[error("string parameter overflowed buffer")]
    StringParamOverflow,
    #[error("expected string parameter at index {0}")]
    ExpectedStringParam(usize),
    #[error("expected expression parameter at index {0}")]
    ExpectedExprParam(usize),
    #[error("failed to load MES file \"{0}\"")]
    MesLoadFailed(String),
    #[error("CG data would exceed buffer size")]
    CgTooLarge,
    #[error("invalid save number: {0}")]
    InvalidSaveNumber(u32),
    #[error("save slot \"{name}\" unusable: {source}")]
    SaveIo {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid surface index: {0}")]
    InvalidSurface(u32),
    #[error("invalid animation stream index: {0}:{1}")]
    InvalidAnimStream(u32, u32),
    #[error("System.function[{0}] not implemented")]
    UnknownSysGroup(u32),
    #[error("System.function[{group}].function[{func}] not implemented")]
    UnknownSysFunction { group: u32, func: u32 },
    #[error("Util.function[{0}] not implemented")]
    UnknownUtilFunction(u32),
    #[error("procedures 110-111 not defined in Util.wait_until")]
    WaitUntilProcedures,
    #[error("no saved animation in Util.restore_animation")]
    NoSavedAnimation,
    #[error("unknown title \"{0}\"")]
    UnknownTitle(String),
    #[error("window could not be created: {0}")]
    Window(String),
}

pub type Result<T> = std::result::Result<T, VmError>;
