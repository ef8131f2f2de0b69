// Per-title configuration: dispatch tables for SYS/UTIL opcodes, memory
// geometry, flag bit assignments and the custom text hook. The same opcode
// means different things in different games, so the tables are the title.

use crate::error::{Result, VmError};
use crate::input::InputEvent;
use crate::opcodes::Dialect;
use crate::vm::{ParamList, Vm};

pub const GAME_MAX_SYS: usize = 32;
pub const GAME_MAX_UTIL: usize = 256;
pub const GAME_NR_SURFACES: usize = 10;

pub const FLAG_ALWAYS_ON: u16 = 0xffff;

pub type SysFn = fn(&mut Vm, &ParamList) -> Result<()>;
pub type UtilFn = fn(&mut Vm, &ParamList) -> Result<()>;
pub type MemHook = fn(&mut Vm);
pub type TxtFn = fn(&mut Vm, &[u8]) -> Result<()>;
// returns true when the event was consumed
pub type EventHook = fn(&mut Vm, InputEvent) -> bool;

// Logical flags; each title maps them onto its own bits of
// system_var16[FLAGS] (0 = unsupported, FLAG_ALWAYS_ON = unconditionally on).
#[derive(Debug, Copy, Clone)]
pub enum GameFlag {
    Return,
    Log,
    MenuReturn,
    AnimEnable,
    VoiceEnable,
    LoadPalette,
}

pub const GAME_NR_FLAGS: usize = 6;

#[derive(Clone)]
pub struct Game {
    pub title: &'static str,
    pub surface_sizes: [(u16, u16); GAME_NR_SURFACES],
    pub bpp: u32,
    pub var4_size: usize,
    pub mem16_size: usize,
    pub call_saves_procedures: bool,
    pub dialect: Dialect,
    pub flags: [u16; GAME_NR_FLAGS],
    pub mem_init: MemHook,
    pub mem_restore: MemHook,
    pub handle_event: Option<EventHook>,
    pub custom_txt: Option<TxtFn>,
    pub sys: [Option<SysFn>; GAME_MAX_SYS],
    pub util: [Option<UtilFn>; GAME_MAX_UTIL],
}

pub fn lookup(title: &str) -> Result<Game> {
    match title {
        "aishimai" | "ai_shimai" => Ok(crate::aishimai::game()),
        "isaku" => Ok(crate::isaku::game()),
        "shangrlia" => Ok(crate::shangrlia::game()),
        "yuno" => Ok(crate::yuno::game()),
        _ => Err(VmError::UnknownTitle(title.to_string())),
    }
}

pub fn titles() -> &'static [&'static str] {
    &["aishimai", "isaku", "shangrlia", "yuno"]
}
