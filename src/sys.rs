// Generic SYS group handlers shared between titles. Rectangle parameters
// arrive from bytecode with x-coordinates and widths in 8-pixel units and
// inclusive bottom-right corners; everything is converted to pixels here
// before reaching gfx.

use crate::asset::cg_decode;
use crate::error::{Result, VmError};
use crate::game::{GameFlag, SysFn, GAME_MAX_SYS};
use crate::input::{input_from_no, Buttons, InputEvent};
use crate::memory::{sysvar16, sysvar32, MEMORY_FILE_DATA_SIZE};
use crate::menu;
use crate::savedata::save_name;
use crate::vm::{ParamList, Vm, VmPointer};
use log::warn;
use std::time::Duration;

fn unknown(group: u32, func: u32) -> VmError {
    VmError::UnknownSysFunction { group, func }
}

// ---- SYS[0]: font size -----------------------------------------------------

pub fn sys_set_font_size(vm: &mut Vm, _params: &ParamList) -> Result<()> {
    let size = vm.mem.get_sysvar16(sysvar16::FONT_HEIGHT);
    vm.gfx.text_set_size(size);
    Ok(())
}

// ---- SYS[2]: cursor --------------------------------------------------------

pub fn sys_cursor_save_pos(vm: &mut Vm) {
    let (x, y) = vm.cursor.pos();
    vm.mem.set_sysvar16(sysvar16::CURSOR_X, x as u16);
    vm.mem.set_sysvar16(sysvar16::CURSOR_Y, y as u16);
}

pub fn sys_cursor(vm: &mut Vm, params: &ParamList) -> Result<()> {
    match params.expr(0)? {
        0 => vm.cursor.reload(&mut vm.assets),
        1 => vm.cursor.unload(),
        2 => sys_cursor_save_pos(vm),
        3 => {
            let x = params.expr(1)? as i32;
            let y = params.expr(2)? as i32;
            vm.cursor.set_pos(x, y);
            vm.input.set_cursor_pos(x, y);
        }
        4 => vm.cursor.load(params.expr(1)?, &mut vm.assets),
        5 => vm.cursor.show(),
        6 => vm.cursor.hide(),
        no => return Err(unknown(2, no)),
    }
    Ok(())
}

// ---- SYS[3]: animation -----------------------------------------------------

pub fn sys_anim(vm: &mut Vm, params: &ParamList) -> Result<()> {
    match params.expr(0)? {
        0 => vm.anim.init_stream(params.expr(1)?, &vm.mem)?,
        1 => vm.anim.start(params.expr(1)?)?,
        2 => vm.anim.stop(params.expr(1)?)?,
        3 => vm.anim.halt(params.expr(1)?)?,
        4 => warn!("System.Anim.function[4] not implemented"),
        5 => vm.anim.stop_all(),
        6 => vm.anim.halt_all(),
        20 => {
            let no = params.expr(1)?;
            let x = params.expr(2)? as i32;
            let y = params.expr(3)? as i32;
            vm.anim.set_offset(no, x, y)?;
        }
        no => return Err(unknown(3, no)),
    }
    Ok(())
}

pub fn anim_wait(vm: &mut Vm, no: u32) -> Result<()> {
    while vm.anim.running(no) {
        vm.peek()?;
        std::thread::sleep(Duration::from_millis(16));
    }
    Ok(())
}

// ---- SYS[4]: savedata ------------------------------------------------------

pub fn resume_load(vm: &mut Vm, name: &str) -> Result<()> {
    if !vm.saves.resume_load(&mut vm.mem, name)? {
        return Ok(());
    }
    let restore = vm.game.mem_restore;
    restore(vm);
    let mes = vm.mem.mes_name();
    vm.load_mes(&mes)?;
    vm.flag_on(GameFlag::Return);
    Ok(())
}

pub fn sys_savedata(vm: &mut Vm, params: &ParamList) -> Result<()> {
    let name = save_name(params.expr(1)?)?;
    match params.expr(0)? {
        0 => resume_load(vm, &name)?,
        1 => vm.saves.resume_save(&vm.mem, &name)?,
        2 => vm.saves.load(&mut vm.mem, &name)?,
        3 => vm.saves.save(&vm.mem, &name)?,
        4 => vm.saves.load_var4(&mut vm.mem, &name)?,
        5 => vm.saves.save_var4(&vm.mem, &name)?,
        6 => vm.saves.save_union_var4(&vm.mem, &name)?,
        7 => {
            let from = params.expr(2)?;
            let to = params.expr(3)?;
            vm.saves.load_var4_slice(&mut vm.mem, &name, from, to)?;
        }
        8 => {
            let from = params.expr(2)?;
            let to = params.expr(3)?;
            vm.saves.save_var4_slice(&vm.mem, &name, from, to)?;
        }
        9 => {
            let name2 = save_name(params.expr(2)?)?;
            vm.saves.copy(&name, &name2)?;
        }
        11 => vm.saves.f11(&name),
        13 => vm.saves.set_mes_name(&name, params.string(2)?)?,
        no => return Err(unknown(4, no)),
    }
    Ok(())
}

// ---- SYS[5]: audio ---------------------------------------------------------

fn load_audio(vm: &mut Vm, name: &str) -> Option<Vec<u8>> {
    match vm.assets.load_data(name) {
        Some(data) => Some(data),
        None => {
            warn!("Failed to load audio \"{}\"", name);
            None
        }
    }
}

pub fn sys_audio(vm: &mut Vm, params: &ParamList) -> Result<()> {
    match params.expr(0)? {
        0 => {
            if let Some(data) = load_audio(vm, &params.string(1)?.to_owned()) {
                vm.audio.bgm_play(data, true);
            }
        }
        2 | 18 => vm.audio.bgm_stop(),
        3 => {
            let ch = params.expr(2)? as usize;
            if let Some(data) = load_audio(vm, &params.string(1)?.to_owned()) {
                vm.audio.se_play(ch, data);
            }
        }
        4 => vm.audio.bgm_fade(params.expr(1)?, params.expr(2)?, params.expr(3)? != 0),
        5 => vm.audio.bgm_set_volume(params.expr(1)?),
        7 => vm.audio.bgm_fade(params.expr(1)?, params.expr(2)?, params.expr(3)? != 0),
        9 => vm.audio.bgm_fade(params.expr(1)?, params.expr(1)?, true),
        10 => vm.audio.bgm_fade(params.expr(1)?, params.expr(2)?, true),
        12 => vm.audio.se_stop(params.expr(1)? as usize),
        no => return Err(unknown(5, no)),
    }
    Ok(())
}

// ---- SYS[7]: file ----------------------------------------------------------

pub fn read_file(vm: &mut Vm, name: &str, offset: u32) -> Result<()> {
    let data = match vm.assets.load_data(name) {
        Some(data) => data,
        None => {
            warn!("Failed to read data file \"{}\"", name);
            return Ok(());
        }
    };
    if offset as usize + data.len() > MEMORY_FILE_DATA_SIZE {
        warn!("Tried to read file beyond end of buffer");
        return Ok(());
    }
    let dst = vm.mem.file_data_off() + offset as usize;
    vm.mem.bytes_mut(dst, data.len())?.copy_from_slice(&data);
    Ok(())
}

pub fn sys_file(vm: &mut Vm, params: &ParamList) -> Result<()> {
    match params.expr(0)? {
        0 => read_file(vm, &params.string(1)?.to_owned(), params.expr(2)?),
        no => Err(unknown(7, no)),
    }
}

// ---- SYS[8]: image loading -------------------------------------------------

pub fn load_image(vm: &mut Vm, name: &str, i: usize) -> Result<()> {
    let data = match vm.assets.load_cg(name) {
        Some(data) => data,
        None => {
            warn!("Failed to load CG \"{}\"", name);
            return Ok(());
        }
    };

    // raw CG bytes are kept in file_data at the title's CG offset
    let off = vm.mem.get_sysvar32(sysvar32::CG_OFFSET) as usize;
    if off + data.len() > MEMORY_FILE_DATA_SIZE {
        return Err(VmError::CgTooLarge);
    }
    let dst = vm.mem.file_data_off() + off;
    vm.mem.bytes_mut(dst, data.len())?.copy_from_slice(&data);

    let cg = match cg_decode(&data) {
        Some(cg) => cg,
        None => {
            warn!("Failed to decode CG \"{}\"", name);
            return Ok(());
        }
    };

    vm.mem.set_sysvar16(sysvar16::CG_X, cg.x / 8);
    vm.mem.set_sysvar16(sysvar16::CG_Y, cg.y);
    vm.mem.set_sysvar16(sysvar16::CG_W, cg.w / 8);
    vm.mem.set_sysvar16(sysvar16::CG_H, cg.h);

    vm.gfx.draw_cg(i, &cg)?;
    if vm.flag_is_on(GameFlag::LoadPalette) {
        if let Some(pal) = &cg.palette {
            let off = vm.mem.palette_off();
            vm.mem.bytes_mut(off, 1024)?.copy_from_slice(&pal[..]);
        }
    }
    Ok(())
}

pub fn sys_load_image(vm: &mut Vm, params: &ParamList) -> Result<()> {
    let i = vm.mem.get_sysvar16(sysvar16::DST_SURFACE) as usize;
    load_image(vm, &params.string(0)?.to_owned(), i)
}

// ---- SYS[9]: palette -------------------------------------------------------

fn rgb_param(c: u32) -> (u8, u8, u8) {
    let r = (((c >> 4) & 0xf) * 17) as u8;
    let g = (((c >> 8) & 0xf) * 17) as u8;
    let b = ((c & 0xf) * 17) as u8;
    (r, g, b)
}

fn memory_palette(vm: &Vm) -> Result<Vec<u8>> {
    Ok(vm.mem.bytes(vm.mem.palette_off(), 1024)?.to_vec())
}

fn sys_palette_crossfade1(vm: &mut Vm, params: &ParamList) -> Result<()> {
    if params.len() > 1 {
        let (r, g, b) = rgb_param(params.expr(1)?);
        vm.gfx.palette_crossfade_to(r, g, b, 240, &vm.cursor)
    } else {
        let pal = memory_palette(vm)?;
        vm.gfx.palette_crossfade(&pal, 240, &vm.cursor)
    }
}

fn sys_palette_crossfade2(vm: &mut Vm, params: &ParamList) -> Result<()> {
    // t is 0-15, mapping onto [0, 3600] ms in steps of 240
    let t = params.expr(1)?;
    let ms = (t & 0xf) * 240;
    if params.len() > 2 {
        let (r, g, b) = rgb_param(params.expr(2)?);
        vm.gfx.palette_crossfade_to(r, g, b, ms, &vm.cursor)
    } else {
        let pal = memory_palette(vm)?;
        vm.gfx.palette_crossfade(&pal, ms, &vm.cursor)
    }
}

pub fn sys_palette(vm: &mut Vm, params: &ParamList) -> Result<()> {
    match params.expr(0)? {
        0 => {
            let pal = memory_palette(vm)?;
            vm.gfx.palette_set(&pal);
        }
        1 => sys_palette_crossfade1(vm, params)?,
        2 => sys_palette_crossfade2(vm, params)?,
        3 => vm.gfx.hide_screen(),
        4 => vm.gfx.unhide_screen(),
        no => return Err(unknown(9, no)),
    }
    Ok(())
}

// ---- SYS[10]: graphics -----------------------------------------------------

// (src_x, src_y, src_br_x, src_br_y, src_i, dst_x, dst_y, dst_i), 8px units
pub fn copy_params(params: &ParamList) -> Result<(i32, i32, i32, i32, usize, i32, i32, usize)> {
    let src_x = params.expr(1)? as i32;
    let src_y = params.expr(2)? as i32;
    let src_w = (params.expr(3)? as i32 - src_x) + 1;
    let src_h = (params.expr(4)? as i32 - src_y) + 1;
    let src_i = params.expr(5)? as usize;
    let dst_x = params.expr(6)? as i32;
    let dst_y = params.expr(7)? as i32;
    let dst_i = params.expr(8)? as usize;
    Ok((src_x * 8, src_y, src_w * 8, src_h, src_i, dst_x * 8, dst_y, dst_i))
}

fn rect_params(params: &ParamList) -> Result<(i32, i32, i32, i32)> {
    let x = params.expr(1)? as i32;
    let y = params.expr(2)? as i32;
    let w = (params.expr(3)? as i32 - x) + 1;
    let h = (params.expr(4)? as i32 - y) + 1;
    Ok((x * 8, y, w * 8, h))
}

pub fn sys_graphics_copy(vm: &mut Vm, params: &ParamList) -> Result<()> {
    let (sx, sy, w, h, src_i, dx, dy, dst_i) = copy_params(params)?;
    vm.gfx.copy(sx, sy, w, h, src_i, dx, dy, dst_i)
}

pub fn sys_graphics_copy_masked(vm: &mut Vm, params: &ParamList) -> Result<()> {
    let (sx, sy, w, h, src_i, dx, dy, dst_i) = copy_params(params)?;
    let mask = vm.mem.get_sysvar16(sysvar16::MASK_COLOR);
    vm.gfx.copy_masked(sx, sy, w, h, src_i, dx, dy, dst_i, mask)
}

pub fn sys_graphics_fill_bg(vm: &mut Vm, params: &ParamList) -> Result<()> {
    let (x, y, w, h) = rect_params(params)?;
    let i = vm.mem.get_sysvar16(sysvar16::DST_SURFACE) as usize;
    vm.gfx.text_fill(x, y, w, h, i)
}

pub fn sys_graphics_copy_swap(vm: &mut Vm, params: &ParamList) -> Result<()> {
    let (sx, sy, w, h, src_i, dx, dy, dst_i) = copy_params(params)?;
    vm.gfx.copy_swap(sx, sy, w, h, src_i, dx, dy, dst_i)
}

pub fn sys_graphics_swap_bg_fg(vm: &mut Vm, params: &ParamList) -> Result<()> {
    let (x, y, w, h) = rect_params(params)?;
    let i = vm.mem.get_sysvar16(sysvar16::DST_SURFACE) as usize;
    vm.gfx.text_swap_colors(x, y, w, h, i)
}

pub fn sys_graphics_compose(vm: &mut Vm, params: &ParamList) -> Result<()> {
    let fg_x = params.expr(1)? as i32;
    let fg_y = params.expr(2)? as i32;
    let w = (params.expr(3)? as i32 - fg_x) + 1;
    let h = (params.expr(4)? as i32 - fg_y) + 1;
    let fg_i = params.expr(5)? as usize;
    let bg_x = params.expr(6)? as i32;
    let bg_y = params.expr(7)? as i32;
    let bg_i = params.expr(8)? as usize;
    let dst_x = params.expr(9)? as i32;
    let dst_y = params.expr(10)? as i32;
    let dst_i = params.expr(11)? as usize;
    let mask = vm.mem.get_sysvar16(sysvar16::MASK_COLOR);
    vm.gfx.compose(
        fg_x * 8,
        fg_y,
        w * 8,
        h,
        fg_i,
        bg_x * 8,
        bg_y,
        bg_i,
        dst_x * 8,
        dst_y,
        dst_i,
        mask,
    )
}

pub fn sys_graphics_invert_colors(vm: &mut Vm, params: &ParamList) -> Result<()> {
    let (x, y, w, h) = rect_params(params)?;
    let i = vm.mem.get_sysvar16(sysvar16::DST_SURFACE) as usize;
    vm.gfx.invert_colors(x, y, w, h, i)
}

pub fn sys_graphics(vm: &mut Vm, params: &ParamList) -> Result<()> {
    match params.expr(0)? {
        0 => sys_graphics_copy(vm, params),
        1 => sys_graphics_copy_masked(vm, params),
        2 => sys_graphics_fill_bg(vm, params),
        3 => sys_graphics_copy_swap(vm, params),
        4 => sys_graphics_swap_bg_fg(vm, params),
        5 => sys_graphics_compose(vm, params),
        6 => sys_graphics_invert_colors(vm, params),
        // progressive copy; runs as a plain copy at modern speeds
        20 => sys_graphics_copy(vm, params),
        no => Err(unknown(10, no)),
    }
}

// ---- SYS[11]: wait ---------------------------------------------------------

pub fn sys_wait(vm: &mut Vm, params: &ParamList) -> Result<()> {
    if params.is_empty() || params.expr(0)? == 0 {
        loop {
            vm.peek()?;
            let mut activated = false;
            while let Some(event) = vm.input.pop_event() {
                if event == InputEvent::Down(Buttons::ACTIVATE) {
                    activated = true;
                }
            }
            if activated {
                return Ok(());
            }
            std::thread::sleep(Duration::from_millis(16));
        }
    }
    let target = vm.ticks() + params.expr(0)?;
    while vm.ticks() < target && !vm.input.down(Buttons::SHIFT) {
        vm.peek()?;
        std::thread::sleep(Duration::from_millis(16));
    }
    vm.input.clear();
    Ok(())
}

// ---- SYS[12]: text colors --------------------------------------------------

pub fn sys_set_text_colors(vm: &mut Vm, params: &ParamList) -> Result<()> {
    let colors = params.expr(0)?;
    vm.gfx.text_set_colors(((colors >> 4) & 0xf) as u8, (colors & 0xf) as u8);
    Ok(())
}

// ---- SYS[13]: farcall ------------------------------------------------------

pub fn sys_farcall(vm: &mut Vm, params: &ParamList) -> Result<()> {
    let addr = params.expr(0)?;
    if !vm.mem.file_data_contains(addr as usize, 1) {
        return Err(VmError::InvalidFarcall(addr));
    }
    let saved_ip = vm.ip;
    vm.ip = VmPointer { code: addr, ptr: 0 };
    let r = vm.exec();
    vm.ip = saved_ip;
    r
}

// ---- SYS[14]: cursor hit test ----------------------------------------------

// Walks an array of {id, top_left, bot_right} records in file_data and
// publishes the id under the cursor, 0xffff on the table's end sentinel.
pub fn sys_check_cursor_pos(vm: &mut Vm, params: &ParamList) -> Result<()> {
    let x = params.expr(0)?;
    let y = params.expr(1)?;
    let (view_w, view_h) = vm.gfx.view_size();
    if x as usize >= view_w || y as usize >= view_h {
        warn!("Invalid argument to System.check_cursor_pos: ({},{})", x, y);
        return Ok(());
    }

    let mut a = vm.mem.file_data_off() + params.expr(2)? as usize;
    let end = vm.mem.file_data_off() + MEMORY_FILE_DATA_SIZE - 10;
    while a < end {
        let id = vm.mem.read_u16(a)?;
        if id == 0xffff {
            return vm.mem.set_var16(18, 0xffff);
        }
        let x_left = vm.mem.read_u16(a + 2)? as u32;
        let y_top = vm.mem.read_u16(a + 4)? as u32;
        let x_right = vm.mem.read_u16(a + 6)? as u32;
        let y_bot = vm.mem.read_u16(a + 8)? as u32;
        if x >= x_left && x <= x_right && y >= y_top && y <= y_bot {
            return vm.mem.set_var16(18, id);
        }
        a += 10;
    }
    warn!("Read past end of buffer in System.check_cursor_pos");
    vm.mem.set_var16(18, 0)
}

// ---- SYS[15]: menu pick ----------------------------------------------------

pub fn sys_menu_get_no(vm: &mut Vm, params: &ParamList) -> Result<()> {
    menu::menu_get_no(vm, params.expr(0)?)
}

// ---- SYS[18]: input check --------------------------------------------------

pub fn sys_check_input(vm: &mut Vm, params: &ParamList) -> Result<()> {
    let input = params.expr(0)?;
    let value = params.expr(1)? != 0;
    let button = match input_from_no(input) {
        Some(b) => b,
        None => {
            warn!("Invalid input number: {}", input);
            return vm.mem.set_var32(18, 0);
        }
    };
    let is_down = vm.input.down(button);
    vm.mem.set_var32(18, (value && is_down) as u32)
}

// ---- SYS[23]: screen surface -----------------------------------------------

pub fn sys_set_screen_surface(vm: &mut Vm, params: &ParamList) -> Result<()> {
    vm.gfx.set_screen_surface(params.expr(0)? as usize)
}

// The table shared by the titles that run on the stock handlers.
pub fn default_sys_table() -> [Option<SysFn>; GAME_MAX_SYS] {
    let mut sys: [Option<SysFn>; GAME_MAX_SYS] = [None; GAME_MAX_SYS];
    sys[0] = Some(sys_set_font_size);
    sys[2] = Some(sys_cursor);
    sys[3] = Some(sys_anim);
    sys[4] = Some(sys_savedata);
    sys[5] = Some(sys_audio);
    sys[7] = Some(sys_file);
    sys[8] = Some(sys_load_image);
    sys[9] = Some(sys_palette);
    sys[10] = Some(sys_graphics);
    sys[11] = Some(sys_wait);
    sys[12] = Some(sys_set_text_colors);
    sys[13] = Some(sys_farcall);
    sys[14] = Some(sys_check_cursor_pos);
    sys[15] = Some(sys_menu_get_no);
    sys[18] = Some(sys_check_input);
    sys[23] = Some(sys_set_screen_surface);
    sys
}
