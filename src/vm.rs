// The MES interpreter: byte reader, expression stack machine, parameter
// decoder and statement dispatch, plus the cooperative exec loop. Semantics
// that differ per title (syscall tables, memory geometry, custom text) come
// in through the Game record; everything here is title-independent.

use crate::anim::Anim;
use crate::asset::{AssetSource, Assets};
use crate::audio::Audio;
use crate::cursor::Cursor;
use crate::debug::{DebugSignal, Debugger};
use crate::error::{Result, VmError};
use crate::game::{Game, GameFlag};
use crate::gfx::Gfx;
use crate::input::Input;
use crate::memory::{sysvar16, Memory, MEMORY_FILE_DATA_SIZE, MEMORY_NR_MENU_ENTRIES};
use crate::menu::Menu;
use crate::opcodes::{char_is_hankaku, char_is_zenkaku, ExprOp, StatementOp, PARAM_EXPRESSION};
use crate::savedata::SaveData;
use log::warn;
use rand::Rng;
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub const VM_STACK_SIZE: usize = 1024;
pub const VM_MAX_PROCEDURES: usize = 150;
pub const VM_MES_CALL_STACK_SIZE: usize = 128;

const STRING_PARAM_SIZE: usize = 64;
const MAX_PARAMS: usize = 30;
const TXT_BUF_SIZE: usize = 4096;

// Instruction pointer: offset of the executing code block within the memory
// image, plus a cursor into that block.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct VmPointer {
    pub code: u32,
    pub ptr: u32,
}

struct MesCall {
    ip: VmPointer,
    mes_name: String,
    procedures: Option<Box<[Option<VmPointer>; VM_MAX_PROCEDURES]>>,
}

#[derive(Debug, Clone)]
pub enum Param {
    Expr(u32),
    Str(String),
}

#[derive(Debug, Clone, Default)]
pub struct ParamList {
    params: Vec<Param>,
}

impl ParamList {
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn expr(&self, i: usize) -> Result<u32> {
        match self.params.get(i) {
            Some(Param::Expr(v)) => Ok(*v),
            Some(Param::Str(_)) => Err(VmError::ExpectedExprParam(i)),
            None => Err(VmError::TooFewParams(i)),
        }
    }

    pub fn string(&self, i: usize) -> Result<&str> {
        match self.params.get(i) {
            Some(Param::Str(s)) => Ok(s),
            Some(Param::Expr(_)) => Err(VmError::ExpectedStringParam(i)),
            None => Err(VmError::TooFewParams(i)),
        }
    }
}

// Cursor-rest timer state for Util.check_cursor.
#[derive(Default)]
pub struct CursorRest {
    pub start_t: u32,
    pub wait_t: u32,
    pub x: i32,
    pub y: i32,
}

pub struct Vm {
    pub mem: Memory,
    pub game: Game,
    pub ip: VmPointer,
    pub procedures: [Option<VmPointer>; VM_MAX_PROCEDURES],
    stack: Vec<u32>,
    mes_call_stack: Vec<MesCall>,
    scope_counter: u32,
    epoch: Instant,

    pub gfx: Gfx,
    pub audio: Audio,
    pub anim: Anim,
    pub cursor: Cursor,
    pub input: Input,
    pub assets: Assets,
    pub saves: SaveData,
    pub menu: Menu,
    pub debugger: Option<Debugger>,

    // title scratch used by a few handlers
    pub cursor_rest: CursorRest,
    pub cursor_stash: u32,
}

impl Vm {
    pub fn new(
        game: Game,
        source: Box<dyn AssetSource>,
        save_dir: PathBuf,
        windowed: bool,
    ) -> Result<Vm> {
        let mut mem = Memory::new(game.var4_size, game.mem16_size);
        mem.ptr = mem.default_ptr_table();
        let gfx = Gfx::new(&game.surface_sizes, game.bpp, windowed)?;
        let file_data = mem.file_data_off() as u32;
        Ok(Vm {
            mem,
            gfx,
            audio: Audio::new(windowed),
            anim: Anim::new(),
            cursor: Cursor::new(),
            input: Input::new(!windowed),
            assets: Assets::new(source),
            saves: SaveData::new(save_dir),
            menu: Menu::new(),
            debugger: None,
            game,
            ip: VmPointer { code: file_data, ptr: 0 },
            procedures: [None; VM_MAX_PROCEDURES],
            stack: Vec::with_capacity(VM_STACK_SIZE),
            mes_call_stack: Vec::with_capacity(VM_MES_CALL_STACK_SIZE),
            scope_counter: 0,
            epoch: Instant::now(),
            cursor_rest: CursorRest::default(),
            cursor_stash: 0,
        })
    }

    pub fn print_state(&self) {
        log::error!("ip = {:08x}", self.ip.ptr);
        log::error!("file = {}", self.mem.mes_name());
    }

    // ---- byte reader ------------------------------------------------------

    fn pc(&self) -> usize {
        self.ip.code as usize + self.ip.ptr as usize
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        let v = self.mem.read_u8(self.pc())?;
        self.ip.ptr += 1;
        Ok(v)
    }

    pub fn peek_byte(&self) -> Result<u8> {
        self.mem.read_u8(self.pc())
    }

    pub fn rewind_byte(&mut self) {
        self.ip.ptr -= 1;
    }

    pub fn read_word(&mut self) -> Result<u16> {
        let v = self.mem.read_u16(self.pc())?;
        self.ip.ptr += 2;
        Ok(v)
    }

    pub fn read_dword(&mut self) -> Result<u32> {
        let v = self.mem.read_u32(self.pc())?;
        self.ip.ptr += 4;
        Ok(v)
    }

    // ---- expression stack -------------------------------------------------

    fn push(&mut self, val: u32) -> Result<()> {
        if self.stack.len() >= VM_STACK_SIZE {
            return Err(VmError::StackOverflow);
        }
        self.stack.push(val);
        Ok(())
    }

    fn pop(&mut self) -> Result<u32> {
        self.stack.pop().ok_or(VmError::StackUnderflow)
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    // ---- flags ------------------------------------------------------------

    pub fn flag_is_on(&self, flag: GameFlag) -> bool {
        let mask = self.game.flags[flag as usize];
        match mask {
            0 => false,
            crate::game::FLAG_ALWAYS_ON => true,
            _ => self.mem.get_sysvar16(sysvar16::FLAGS) & mask == mask,
        }
    }

    pub fn flag_on(&mut self, flag: GameFlag) {
        let mask = self.game.flags[flag as usize];
        if mask != 0 && mask != crate::game::FLAG_ALWAYS_ON {
            let flags = self.mem.get_sysvar16(sysvar16::FLAGS);
            self.mem.set_sysvar16(sysvar16::FLAGS, flags | mask);
        }
    }

    pub fn flag_off(&mut self, flag: GameFlag) {
        let mask = self.game.flags[flag as usize];
        if mask != 0 && mask != crate::game::FLAG_ALWAYS_ON {
            let flags = self.mem.get_sysvar16(sysvar16::FLAGS);
            self.mem.set_sysvar16(sysvar16::FLAGS, flags & !mask);
        }
    }

    // ---- timing -----------------------------------------------------------

    pub fn ticks(&self) -> u32 {
        self.epoch.elapsed().as_millis() as u32
    }

    pub fn delay(&mut self, ms: u32) -> Result<()> {
        let target = self.ticks() + ms;
        loop {
            let now = self.ticks();
            if now >= target {
                return Ok(());
            }
            self.peek()?;
            std::thread::sleep(Duration::from_millis((target - now).min(16) as u64));
        }
    }

    // ---- MES loading ------------------------------------------------------

    pub fn load_mes(&mut self, name: &str) -> Result<()> {
        self.mem.set_mes_name(name);
        let data = self
            .assets
            .load_mes(name)
            .ok_or_else(|| VmError::MesLoadFailed(name.to_string()))?;
        if data.len() > MEMORY_FILE_DATA_SIZE {
            return Err(VmError::MesLoadFailed(name.to_string()));
        }
        let off = self.mem.file_data_off();
        self.mem.bytes_mut(off, data.len())?.copy_from_slice(&data);
        Ok(())
    }

    // ---- expression evaluator ---------------------------------------------

    pub fn eval(&mut self) -> Result<u32> {
        macro_rules! operator {
            ($op:tt) => {{
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(a $op b)?;
            }};
        }
        macro_rules! arith {
            ($f:ident) => {{
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(a.$f(b))?;
            }};
        }
        macro_rules! compare {
            ($op:tt) => {{
                let b = self.pop()?;
                let a = self.pop()?;
                self.push((a $op b) as u32)?;
            }};
        }
        loop {
            let op = self.read_byte()?;
            match (self.game.dialect.expr)(op) {
                ExprOp::Imm(v) => self.push(v as u32)?,
                ExprOp::Var => {
                    let i = self.read_byte()? as usize;
                    let v = self.mem.get_var16(i)? as u32;
                    self.push(v)?;
                }
                ExprOp::Var32 => {
                    let i = self.read_byte()? as usize;
                    let v = self.mem.get_var32(i)?;
                    self.push(v)?;
                }
                ExprOp::Reg16 => {
                    let i = self.read_word()? as usize;
                    let v = self.mem.get_var4(i)? as u32;
                    self.push(v)?;
                }
                ExprOp::Reg8 => {
                    let i = self.pop()? as usize;
                    let v = self.mem.get_var4(i)? as u32;
                    self.push(v)?;
                }
                ExprOp::Array16Get16 => {
                    let i = self.pop()? as usize;
                    let var = self.read_byte()?;
                    let base = self.mem.array16_base(var)?;
                    let v = self.mem.read_u16(base + i * 2)? as u32;
                    self.push(v)?;
                }
                ExprOp::Array16Get8 => {
                    let i = self.pop()? as usize;
                    let var = self.read_byte()?;
                    let base = self.mem.array16_base(var)?;
                    let v = self.mem.read_u8(base + i)? as u32;
                    self.push(v)?;
                }
                ExprOp::Array32Get32 => {
                    let i = self.pop()? as usize;
                    let var = self.read_byte()?;
                    let base = self.mem.array32_base(var)?;
                    let v = self.mem.read_u32(base + i * 4)?;
                    self.push(v)?;
                }
                ExprOp::Array32Get16 => {
                    let i = self.pop()? as usize;
                    let var = self.read_byte()?;
                    let base = self.mem.array32_base(var)?;
                    let v = self.mem.read_u16(base + i * 2)? as u32;
                    self.push(v)?;
                }
                ExprOp::Array32Get8 => {
                    let i = self.pop()? as usize;
                    let var = self.read_byte()?;
                    let base = self.mem.array32_base(var)?;
                    let v = self.mem.read_u8(base + i)? as u32;
                    self.push(v)?;
                }
                ExprOp::Plus => arith!(wrapping_add),
                ExprOp::Minus => arith!(wrapping_sub),
                ExprOp::Mul => arith!(wrapping_mul),
                ExprOp::Div => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    if b == 0 {
                        return Err(VmError::DivideByZero);
                    }
                    self.push(a / b)?;
                }
                ExprOp::Mod => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    if b == 0 {
                        return Err(VmError::DivideByZero);
                    }
                    self.push(a % b)?;
                }
                ExprOp::BitAnd => operator!(&),
                ExprOp::BitIor => operator!(|),
                ExprOp::BitXor => operator!(^),
                ExprOp::And => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    self.push((a != 0 && b != 0) as u32)?;
                }
                ExprOp::Or => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    self.push((a != 0 || b != 0) as u32)?;
                }
                ExprOp::Lt => compare!(<),
                ExprOp::Gt => compare!(>),
                ExprOp::Lte => compare!(<=),
                ExprOp::Gte => compare!(>=),
                ExprOp::Eq => compare!(==),
                ExprOp::Neq => compare!(!=),
                ExprOp::Rand => {
                    let range = if self.game.dialect.rand_reads_imm16 {
                        self.read_word()? as u32
                    } else {
                        self.pop()?
                    };
                    if range == 0 {
                        return Err(VmError::DivideByZero);
                    }
                    let v = rand::thread_rng().gen_range(0..range);
                    self.push(v)?;
                }
                ExprOp::Imm16 => {
                    let v = self.read_word()? as u32;
                    self.push(v)?;
                }
                ExprOp::Imm32 => {
                    let v = self.read_dword()?;
                    self.push(v)?;
                }
                ExprOp::End => {
                    let r = self.pop()?;
                    if !self.stack.is_empty() {
                        return Err(VmError::DirtyStack);
                    }
                    return Ok(r);
                }
            }
        }
    }

    // ---- parameter decoder ------------------------------------------------

    fn read_string_param(&mut self) -> Result<String> {
        let mut buf = Vec::new();
        loop {
            let c = self.read_byte()?;
            if c == 0 {
                break;
            }
            if buf.len() >= STRING_PARAM_SIZE {
                return Err(VmError::StringParamOverflow);
            }
            buf.push(c);
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn read_params(&mut self) -> Result<ParamList> {
        let mut params = ParamList::default();
        loop {
            let b = self.read_byte()?;
            if b == 0 {
                break;
            }
            if params.params.len() >= MAX_PARAMS {
                return Err(VmError::TooManyParams);
            }
            if b == PARAM_EXPRESSION {
                let v = self.eval()?;
                params.params.push(Param::Expr(v));
            } else {
                let s = self.read_string_param()?;
                params.params.push(Param::Str(s));
            }
        }
        Ok(params)
    }

    // ---- text -------------------------------------------------------------

    pub fn draw_text(&mut self, text: &[u8]) -> Result<()> {
        if let Some(custom) = self.game.custom_txt {
            return custom(self, text);
        }
        let surface = self.mem.get_sysvar16(sysvar16::DST_SURFACE) as usize;
        let char_space = self.mem.get_sysvar16(sysvar16::CHAR_SPACE);
        let end_x = self.mem.get_sysvar16(sysvar16::TEXT_END_X);
        let start_x = self.mem.get_sysvar16(sysvar16::TEXT_START_X);
        let line_space = self.mem.get_sysvar16(sysvar16::LINE_SPACE);
        let mut x = self.mem.get_sysvar16(sysvar16::TEXT_CURSOR_X);
        let mut y = self.mem.get_sysvar16(sysvar16::TEXT_CURSOR_Y);
        let mut i = 0;
        while i < text.len() {
            let zenkaku = char_is_zenkaku(text[i]);
            // cursor x is in units of 8 pixels
            let advance = if zenkaku { char_space / 8 } else { char_space / 16 };
            let mut next_x = x + advance;
            if next_x > end_x {
                y += line_space;
                x = start_x;
                next_x = x + advance;
            }
            let ch = if zenkaku && i + 1 < text.len() {
                let c = u16::from_le_bytes([text[i], text[i + 1]]);
                i += 2;
                c
            } else {
                let c = text[i] as u16;
                i += 1;
                c
            };
            self.gfx.draw_glyph((x * 8) as i32, y as i32, surface, ch)?;
            x = next_x;
        }
        self.mem.set_sysvar16(sysvar16::TEXT_CURSOR_X, x);
        self.mem.set_sysvar16(sysvar16::TEXT_CURSOR_Y, y);
        Ok(())
    }

    fn stmt_txt(&mut self) -> Result<()> {
        let mut buf = Vec::new();
        loop {
            let c = self.peek_byte()?;
            if c == 0 {
                self.read_byte()?;
                break;
            }
            if !char_is_zenkaku(c) || buf.len() + 2 > TXT_BUF_SIZE {
                warn!("Invalid byte in TXT statement: {:02x}", c);
                break;
            }
            buf.push(self.read_byte()?);
            buf.push(self.read_byte()?);
        }
        self.draw_text(&buf)
    }

    fn stmt_str(&mut self) -> Result<()> {
        let mut buf = Vec::new();
        loop {
            let c = self.peek_byte()?;
            if c == 0 {
                self.read_byte()?;
                break;
            }
            if !char_is_hankaku(c) || buf.len() + 1 > TXT_BUF_SIZE {
                warn!("Invalid byte in STR statement: {:02x}", c);
                break;
            }
            buf.push(self.read_byte()?);
        }
        self.draw_text(&buf)
    }

    // ---- assignment statements --------------------------------------------

    fn stmt_setrbc(&mut self) -> Result<()> {
        let mut i = self.read_word()? as usize;
        loop {
            let v = (self.eval()? & 0xf) as u8;
            self.mem.set_var4(i, v)?;
            i += 1;
            if self.read_byte()? == 0 {
                return Ok(());
            }
        }
    }

    fn stmt_setv(&mut self) -> Result<()> {
        let mut i = self.read_byte()? as usize;
        loop {
            let v = self.eval()? as u16;
            self.mem.set_var16(i, v)?;
            i += 1;
            if self.read_byte()? == 0 {
                return Ok(());
            }
        }
    }

    fn stmt_setrbe(&mut self) -> Result<()> {
        let mut i = self.eval()? as usize;
        loop {
            let v = (self.eval()? & 0xf) as u8;
            self.mem.set_var4(i, v)?;
            i += 1;
            if self.read_byte()? == 0 {
                return Ok(());
            }
        }
    }

    fn stmt_setrd(&mut self) -> Result<()> {
        let mut i = self.read_byte()? as usize;
        loop {
            let v = self.eval()?;
            self.mem.set_var32(i, v)?;
            i += 1;
            if self.read_byte()? == 0 {
                return Ok(());
            }
        }
    }

    fn stmt_setac(&mut self) -> Result<()> {
        let i = self.eval()? as usize;
        let var = self.read_byte()?;
        let mut dst = self.mem.get_var4(var as usize)? as usize + i;
        loop {
            let v = self.eval()? as u8;
            self.mem.write_u8(dst, v)?;
            dst += 1;
            if self.read_byte()? == 0 {
                return Ok(());
            }
        }
    }

    fn stmt_seta_at(&mut self) -> Result<()> {
        let i = self.eval()? as usize;
        let var = self.read_byte()?;
        let mut dst = self.mem.array16_base(var)? + i * 2;
        loop {
            let v = self.eval()? as u16;
            self.mem.write_u16(dst, v)?;
            dst += 2;
            if self.read_byte()? == 0 {
                return Ok(());
            }
        }
    }

    fn stmt_setad(&mut self) -> Result<()> {
        let i = self.eval()? as usize;
        let var = self.read_byte()?;
        let mut dst = self.mem.array32_base(var)? + i * 4;
        loop {
            let v = self.eval()?;
            self.mem.write_u32(dst, v)?;
            dst += 4;
            if self.read_byte()? == 0 {
                return Ok(());
            }
        }
    }

    fn stmt_setaw(&mut self) -> Result<()> {
        let i = self.eval()? as usize;
        let var = self.read_byte()?;
        let base = self.mem.get_var32((var as usize).wrapping_sub(1))? as usize;
        let mut dst = base + i * 2;
        loop {
            let v = self.eval()? as u16;
            self.mem.write_u16(dst, v)?;
            dst += 2;
            if self.read_byte()? == 0 {
                return Ok(());
            }
        }
    }

    fn stmt_setab(&mut self) -> Result<()> {
        let i = self.eval()? as usize;
        let var = self.read_byte()?;
        let base = self.mem.get_var32((var as usize).wrapping_sub(1))? as usize;
        let mut dst = base + i;
        loop {
            let v = self.eval()? as u8;
            self.mem.write_u8(dst, v)?;
            dst += 1;
            if self.read_byte()? == 0 {
                return Ok(());
            }
        }
    }

    // ---- control flow -----------------------------------------------------

    fn stmt_jz(&mut self) -> Result<()> {
        let val = self.eval()?;
        let ptr = self.read_dword()?;
        if val != 1 {
            self.ip.ptr = ptr;
        }
        Ok(())
    }

    fn stmt_jmp(&mut self) -> Result<()> {
        self.ip.ptr = self.mem.read_u32(self.pc())?;
        Ok(())
    }

    fn stmt_sys(&mut self) -> Result<()> {
        let no = self.eval()?;
        let params = self.read_params()?;
        let handler = self
            .game
            .sys
            .get(no as usize)
            .copied()
            .flatten()
            .ok_or(VmError::UnknownSysGroup(no))?;
        handler(self, &params)
    }

    fn stmt_goto(&mut self) -> Result<()> {
        let params = self.read_params()?;
        let name = params.string(0)?.to_owned();
        self.load_mes(&name)?;
        self.flag_on(GameFlag::Return);
        Ok(())
    }

    fn stmt_call(&mut self) -> Result<()> {
        let params = self.read_params()?;
        let name = params.string(0)?.to_owned();

        if self.mes_call_stack.len() >= VM_MES_CALL_STACK_SIZE {
            return Err(VmError::CallStackOverflow);
        }
        let procedures = if self.game.call_saves_procedures {
            Some(Box::new(self.procedures))
        } else {
            None
        };
        self.mes_call_stack.push(MesCall {
            ip: self.ip,
            mes_name: self.mem.mes_name(),
            procedures,
        });

        // load and execute the callee
        self.ip.ptr = 0;
        self.ip.code = self.mem.file_data_off() as u32;
        self.load_mes(&name)?;
        self.exec()?;

        // restore the caller unless the callee is unwinding via GOTO
        if let Some(frame) = self.mes_call_stack.pop() {
            self.ip.code = frame.ip.code;
            if !self.flag_is_on(GameFlag::Return) {
                self.ip.ptr = frame.ip.ptr;
                if let Some(procedures) = frame.procedures {
                    self.procedures = *procedures;
                }
                self.load_mes(&frame.mes_name)?;
            }
        }
        Ok(())
    }

    fn stmt_menui(&mut self) -> Result<()> {
        let params = self.read_params()?;
        let no = params.expr(0)?;
        let addr = self.read_dword()?;
        let empty = addr == self.ip.ptr + 1;
        let body = self.ip;
        self.define_menu_entry(no, body, empty)?;
        self.ip.ptr = addr;
        Ok(())
    }

    fn define_menu_entry(&mut self, no: u32, body: VmPointer, empty: bool) -> Result<()> {
        if empty {
            return Ok(());
        }
        let i = self.menu.define(no, body);
        if i < MEMORY_NR_MENU_ENTRIES {
            let addr_off = self.mem.menu_entry_addresses_off() + i * 4;
            let no_off = self.mem.menu_entry_numbers_off() + i * 4;
            self.mem.write_u32(addr_off, body.ptr)?;
            self.mem.write_u32(no_off, no)?;
        }
        Ok(())
    }

    pub fn call_procedure(&mut self, no: u32) -> Result<()> {
        if no as usize >= VM_MAX_PROCEDURES {
            return Err(VmError::InvalidProcedure(no));
        }
        let proc = self.procedures[no as usize].ok_or(VmError::UndefinedProcedure(no))?;
        let saved_ip = self.ip;
        self.ip = proc;
        self.exec()?;
        self.ip = saved_ip;
        Ok(())
    }

    fn stmt_proc(&mut self) -> Result<()> {
        let params = self.read_params()?;
        let no = params.expr(0)?;
        self.call_procedure(no)
    }

    fn stmt_util(&mut self) -> Result<()> {
        let params = self.read_params()?;
        let no = params.expr(0)?;
        let handler = self
            .game
            .util
            .get(no as usize)
            .copied()
            .flatten()
            .ok_or(VmError::UnknownUtilFunction(no))?;
        handler(self, &params)
    }

    fn stmt_line(&mut self) -> Result<()> {
        if self.read_byte()? != 0 {
            return Ok(());
        }
        let start_x = self.mem.get_sysvar16(sysvar16::TEXT_START_X);
        let y = self.mem.get_sysvar16(sysvar16::TEXT_CURSOR_Y);
        let line_space = self.mem.get_sysvar16(sysvar16::LINE_SPACE);
        self.mem.set_sysvar16(sysvar16::TEXT_CURSOR_X, start_x);
        self.mem.set_sysvar16(sysvar16::TEXT_CURSOR_Y, y + line_space);
        Ok(())
    }

    fn stmt_procd(&mut self) -> Result<()> {
        let i = self.eval()?;
        if i as usize >= VM_MAX_PROCEDURES {
            return Err(VmError::InvalidProcedure(i));
        }
        // the body begins just past the 4-byte skip target
        self.procedures[i as usize] = Some(VmPointer {
            code: self.ip.code,
            ptr: self.ip.ptr + 4,
        });
        self.ip.ptr = self.read_dword()?;
        Ok(())
    }

    // ---- statement dispatch -----------------------------------------------

    pub fn exec_statement(&mut self) -> Result<bool> {
        if let Some(mut debugger) = self.debugger.take() {
            let signal = debugger.update(self);
            self.debugger = Some(debugger);
            if signal == DebugSignal::Quit {
                self.flag_on(GameFlag::Return);
                return Ok(false);
            }
        }
        let op = self.read_byte()?;
        match (self.game.dialect.stmt)(op) {
            StatementOp::End => return Ok(false),
            StatementOp::Txt => self.stmt_txt()?,
            StatementOp::Str => self.stmt_str()?,
            StatementOp::Setrbc => self.stmt_setrbc()?,
            StatementOp::Setv => self.stmt_setv()?,
            StatementOp::Setrbe => self.stmt_setrbe()?,
            StatementOp::Setac => self.stmt_setac()?,
            StatementOp::SetaAt => self.stmt_seta_at()?,
            StatementOp::Setad => self.stmt_setad()?,
            StatementOp::Setaw => self.stmt_setaw()?,
            StatementOp::Setab => self.stmt_setab()?,
            StatementOp::Jz => self.stmt_jz()?,
            StatementOp::Jmp => self.stmt_jmp()?,
            StatementOp::Sys => self.stmt_sys()?,
            StatementOp::Goto => self.stmt_goto()?,
            StatementOp::Call => self.stmt_call()?,
            StatementOp::Menui => self.stmt_menui()?,
            StatementOp::Proc => self.stmt_proc()?,
            StatementOp::Util => self.stmt_util()?,
            StatementOp::Line => self.stmt_line()?,
            StatementOp::Procd => self.stmt_procd()?,
            StatementOp::Menus => crate::menu::menu_exec(self)?,
            StatementOp::Setrd => self.stmt_setrd()?,
            StatementOp::Invalid => {
                self.rewind_byte();
                warn!(
                    "Unprefixed text: {:#04x} (possibly unhandled statement)",
                    op
                );
                let before = self.ip.ptr;
                if char_is_hankaku(op) {
                    self.stmt_str()?;
                } else {
                    self.stmt_txt()?;
                }
                // a byte that is neither text class would otherwise never be
                // consumed
                if self.ip.ptr == before {
                    self.read_byte()?;
                }
            }
        }
        Ok(true)
    }

    // checked after every statement
    fn check_invariants(&self) -> Result<()> {
        if !self.stack.is_empty() {
            return Err(VmError::DirtyStack);
        }
        if self.pc() > self.mem.len() {
            return Err(VmError::IpOutOfBounds(self.ip.ptr));
        }
        Ok(())
    }

    // ---- cooperative yield ------------------------------------------------

    pub fn peek(&mut self) -> Result<()> {
        self.input.poll(self.gfx.window_mut());
        self.cursor.track(&self.input);
        if let Some(handle_event) = self.game.handle_event {
            // offer each pending event to the title once; unconsumed events
            // stay queued for the wait/menu handlers
            for _ in 0..self.input.pending_events() {
                if let Some(event) = self.input.pop_event() {
                    if !handle_event(self, event) {
                        self.input.requeue(event);
                    }
                }
            }
        }
        self.anim.execute(&self.mem, &mut self.gfx)?;
        self.audio.update();
        self.gfx.update(&self.cursor)?;
        Ok(())
    }

    // ---- exec loop --------------------------------------------------------

    pub fn exec(&mut self) -> Result<()> {
        self.scope_counter += 1;
        let r = self.exec_scope();
        self.scope_counter -= 1;
        r
    }

    fn exec_scope(&mut self) -> Result<()> {
        loop {
            if self.flag_is_on(GameFlag::Return) {
                if self.scope_counter != 1 {
                    break;
                }
                self.flag_off(GameFlag::Return);
                self.ip.ptr = 0;
            }
            if !self.exec_statement()? {
                break;
            }
            self.check_invariants()?;
            self.peek()?;
        }
        Ok(())
    }

    pub fn scope_counter(&self) -> u32 {
        self.scope_counter
    }

    pub fn call_depth(&self) -> usize {
        self.mes_call_stack.len()
    }
}
