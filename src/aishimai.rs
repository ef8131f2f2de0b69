// AI Shimai. Runs at 24bpp with its own bitmap fonts, so TXT goes through
// the custom renderer instead of the stock glyph path.
//
// Text variables:
//   var4[2001]  whether "separate"-rendered text gets merged by SYS[22].1
//   var4[2002]  font select: 0 main font, 1-3 SELECT fonts (always merged)
//   var4[2017]  merged (non-zero) vs separate (zero) rendering
//   var4[2018]  redscale when non-zero

use crate::error::Result;
use crate::game::{Game, GameFlag, SysFn, UtilFn, GAME_MAX_SYS, GAME_MAX_UTIL, GAME_NR_FLAGS};
use crate::memory::{sysvar16, sysvar32};
use crate::opcodes::AI5WIN_DIALECT;
use crate::sys;
use crate::text::{merge_text_planes, render_text, RenderMode, RenderParams};
use crate::vm::{ParamList, Vm};
use log::warn;

const VAR4_SIZE: usize = 2048;
const MEM16_SIZE: usize = 4096;

const SEPARATE_TEXT_SURFACE: usize = 7;

fn mem_restore(vm: &mut Vm) {
    let ptr = vm.mem.default_ptr_table();
    vm.mem.ptr = ptr;
    // scripts reach the system bank through this published offset
    let _ = vm.mem.write_u32(ptr.system_var16_ptr, ptr.system_var16 as u32);
    vm.mem.set_sysvar16(sysvar16::HEAP, ptr.system_var16 as u16);

    let mem16 = vm.mem.mem16_off() as u32;
    let file_data = vm.mem.file_data_off() as u32;
    let menu_addr = vm.mem.menu_entry_addresses_off() as u32;
    let menu_no = vm.mem.menu_entry_numbers_off() as u32;
    let palette = vm.mem.palette_off() as u32;
    vm.mem.set_sysvar32(sysvar32::MEMORY, mem16);
    vm.mem.set_sysvar32(sysvar32::FILE_DATA, file_data);
    vm.mem.set_sysvar32(sysvar32::MENU_ENTRY_ADDRESSES, menu_addr);
    vm.mem.set_sysvar32(sysvar32::MENU_ENTRY_NUMBERS, menu_no);
    vm.mem.set_sysvar32(sysvar32::PALETTE, palette);
    vm.mem.set_sysvar32(sysvar32::MAP_OFFSET, 0);

    let flags = vm.mem.get_sysvar16(sysvar16::FLAGS);
    vm.mem.set_sysvar16(sysvar16::FLAGS, (flags & 0xffbf) | 0x21);
}

fn mem_init(vm: &mut Vm) {
    vm.mem.ptr = vm.mem.default_ptr_table();

    vm.mem.set_sysvar16(sysvar16::FLAGS, 0x060f);
    vm.mem.set_sysvar16(sysvar16::TEXT_START_X, 0);
    vm.mem.set_sysvar16(sysvar16::TEXT_START_Y, 0);
    vm.mem.set_sysvar16(sysvar16::TEXT_END_X, 640);
    vm.mem.set_sysvar16(sysvar16::TEXT_END_Y, 480);
    vm.mem.set_sysvar16(sysvar16::FONT_WIDTH, 16);
    vm.mem.set_sysvar16(sysvar16::FONT_HEIGHT, 16);
    vm.mem.set_sysvar16(sysvar16::CHAR_SPACE, 16);
    vm.mem.set_sysvar16(sysvar16::LINE_SPACE, 16);
    vm.mem.set_sysvar16(sysvar16::MASK_COLOR, 0);

    vm.mem.set_sysvar32(sysvar32::CG_OFFSET, 0x20000);
    vm.mem.set_sysvar32(sysvar32::DATA_OFFSET, 0x30000);
    mem_restore(vm);
}

// ---- custom text -----------------------------------------------------------

fn render_text_select(vm: &mut Vm, text: &[u8]) -> Result<()> {
    let sel = vm.mem.get_var4(2002)? as usize;
    if !(1..=3).contains(&sel) {
        warn!("Invalid SELECT font index: {}", sel);
        return Ok(());
    }
    let dim = if sel == 2 { 49 } else { 47 };
    let fd = vm.mem.file_data_off();
    let params = RenderParams {
        char_w: dim,
        char_h: dim,
        surface: vm.mem.get_sysvar16(sysvar16::DST_SURFACE) as usize,
        mode: RenderMode::Merged,
        font_tbl: fd + vm.mem.get_var32(3)? as usize,
        font_pal: Some(fd + vm.mem.get_var32(4 + (sel - 1) * 3)? as usize),
        font_msk: fd + vm.mem.get_var32(5 + (sel - 1) * 3)? as usize,
        font_fnt: fd + vm.mem.get_var32(6 + (sel - 1) * 3)? as usize,
    };
    render_text(vm, text, &params)
}

fn ai_shimai_txt(vm: &mut Vm, text: &[u8]) -> Result<()> {
    if vm.mem.get_var4(2002)? != 0 {
        return render_text_select(vm, text);
    }

    let render_merged = vm.mem.get_var4(2017)? != 0;
    let render_redscale = vm.mem.get_var4(2018)? != 0;
    let fd = vm.mem.file_data_off();
    let params = RenderParams {
        char_w: 28,
        char_h: 28,
        surface: if render_merged {
            vm.mem.get_sysvar16(sysvar16::DST_SURFACE) as usize
        } else {
            SEPARATE_TEXT_SURFACE
        },
        mode: if render_redscale {
            RenderMode::Redscale
        } else if render_merged {
            RenderMode::Merged
        } else {
            RenderMode::Separate
        },
        font_tbl: fd + vm.mem.get_var32(0)? as usize,
        font_msk: fd + vm.mem.get_var32(1)? as usize,
        font_fnt: fd + vm.mem.get_var32(2)? as usize,
        font_pal: None,
    };
    render_text(vm, text, &params)
}

// ---- SYS handlers ----------------------------------------------------------

// zenkaku digits so the number renders through the bitmap font
fn sys_display_number(vm: &mut Vm, params: &ParamList) -> Result<()> {
    let value = params.expr(0)?;
    let digits = value.to_string();
    let mut text = Vec::with_capacity(digits.len() * 2);
    for d in digits.bytes() {
        text.push(0x82);
        text.push(0x4f + (d - b'0'));
    }
    vm.draw_text(&text)
}

fn sys_cursor(vm: &mut Vm, params: &ParamList) -> Result<()> {
    match params.expr(0)? {
        0 => vm.cursor.show(),
        1 => vm.cursor.hide(),
        2 => sys::sys_cursor_save_pos(vm),
        3 => {
            let x = params.expr(1)? as i32;
            let y = params.expr(2)? as i32;
            vm.cursor.set_pos(x, y);
            vm.input.set_cursor_pos(x, y);
        }
        4 => vm.cursor.load(params.expr(1)? + 15, &mut vm.assets),
        5 => vm.cursor_stash = 0,
        6 => vm.mem.set_var16(18, 0)?,
        7 => {
            let stash = vm.cursor_stash;
            vm.mem.set_var32(18, stash)?;
        }
        8 => vm.cursor_stash = params.expr(1)?,
        no => {
            return Err(crate::error::VmError::UnknownSysFunction { group: 2, func: no });
        }
    }
    Ok(())
}

// streams are addressed as a pair packed into one index
fn anim_param(params: &ParamList, i: usize) -> Result<u32> {
    let a = params.expr(i)?;
    let b = params.expr(i + 1)?;
    let stream = a * 10 + b;
    if stream as usize >= crate::anim::ANIM_MAX_STREAMS {
        return Err(crate::error::VmError::InvalidAnimStream(a, b));
    }
    Ok(stream)
}

fn sys_anim(vm: &mut Vm, params: &ParamList) -> Result<()> {
    match params.expr(0)? {
        0 => {
            let stream = anim_param(params, 1)?;
            vm.anim.init_stream(stream, &vm.mem)?;
        }
        1 => {
            let stream = anim_param(params, 1)?;
            vm.anim.start(stream)?;
        }
        2 => {
            let stream = anim_param(params, 1)?;
            vm.anim.stop(stream)?;
        }
        3 => {
            let stream = anim_param(params, 1)?;
            vm.anim.halt(stream)?;
        }
        4 => {
            let stream = anim_param(params, 1)?;
            sys::anim_wait(vm, stream)?;
        }
        5 => vm.anim.stop_all(),
        6 => vm.anim.halt_all(),
        7 => vm.anim.reset_all(),
        8 => {
            let stream = anim_param(params, 1)?;
            let mem = &vm.mem;
            vm.anim.exec_copy_call(stream, mem, &mut vm.gfx)?;
        }
        no => {
            return Err(crate::error::VmError::UnknownSysFunction { group: 3, func: no });
        }
    }
    Ok(())
}

fn sys_savedata(vm: &mut Vm, params: &ParamList) -> Result<()> {
    let name = crate::savedata::save_name(params.expr(1)?)?;
    match params.expr(0)? {
        0 => sys::resume_load(vm, &name)?,
        1 => vm.saves.resume_save(&vm.mem, &name)?,
        2 => vm.saves.load_var4(&mut vm.mem, &name)?,
        3 => vm.saves.save_union_var4(&vm.mem, &name)?,
        // extra slot operations the engine family left disabled
        no @ 4..=8 => warn!("System.SaveData.function[{}] not implemented", no),
        no => {
            return Err(crate::error::VmError::UnknownSysFunction { group: 4, func: no });
        }
    }
    Ok(())
}

fn sys_audio(vm: &mut Vm, params: &ParamList) -> Result<()> {
    match params.expr(0)? {
        0 => {
            let name = params.string(1)?.to_owned();
            match vm.assets.load_data(&name) {
                Some(data) => vm.audio.bgm_play(data, true),
                None => warn!("Failed to load audio \"{}\"", name),
            }
        }
        1 => vm.audio.bgm_stop(),
        2 => vm.audio.bgm_fade(0, 2000, true),
        6 => {
            let name = params.string(1)?.to_owned();
            let ch = params.expr(2)? as usize;
            match vm.assets.load_data(&name) {
                Some(data) => vm.audio.aux_play(ch, data, false),
                None => warn!("Failed to load audio \"{}\"", name),
            }
        }
        7 => vm.audio.aux_stop(params.expr(1)? as usize),
        no => {
            return Err(crate::error::VmError::UnknownSysFunction { group: 5, func: no });
        }
    }
    Ok(())
}

fn sys_voice(vm: &mut Vm, params: &ParamList) -> Result<()> {
    if !vm.flag_is_on(GameFlag::VoiceEnable) {
        return Ok(());
    }
    match params.expr(0)? {
        0 => {
            let name = params.string(1)?.to_owned();
            match vm.assets.load_data(&name) {
                Some(data) => vm.audio.voice_play(data),
                None => warn!("Failed to load voice \"{}\"", name),
            }
        }
        1 => vm.audio.voice_stop(),
        no => warn!("System.Voice.function[{}] not implemented", no),
    }
    Ok(())
}

fn sys_load_image(vm: &mut Vm, params: &ParamList) -> Result<()> {
    vm.anim.halt_all();
    sys::sys_load_image(vm, params)
}

fn sys_display(vm: &mut Vm, params: &ParamList) -> Result<()> {
    match params.expr(0)? {
        0 => {
            if params.len() > 1 {
                vm.gfx.display_hide();
            } else {
                vm.gfx.display_unhide();
            }
        }
        1 => {
            if params.len() > 1 {
                let level = params.expr(1)?;
                vm.gfx.display_fade_out(level);
            } else {
                vm.gfx.display_fade_in();
            }
        }
        no => {
            return Err(crate::error::VmError::UnknownSysFunction { group: 9, func: no });
        }
    }
    Ok(())
}

fn sys_graphics_blend(vm: &mut Vm, params: &ParamList, masked: bool) -> Result<()> {
    let (sx, sy, w, h, src_i, dx, dy, dst_i) = sys::copy_params(params)?;
    let mask = vm.mem.get_sysvar16(sysvar16::MASK_COLOR);
    vm.gfx.blend(sx, sy, w, h, src_i, dx, dy, dst_i, masked, mask)
}

fn sys_graphics(vm: &mut Vm, params: &ParamList) -> Result<()> {
    match params.expr(0)? {
        0 => sys::sys_graphics_copy(vm, params),
        1 => sys::sys_graphics_copy_masked(vm, params),
        2 => sys::sys_graphics_fill_bg(vm, params),
        4 => sys::sys_graphics_swap_bg_fg(vm, params),
        6 => sys_graphics_blend(vm, params, false),
        7 => sys_graphics_blend(vm, params, true),
        no => Err(crate::error::VmError::UnknownSysFunction { group: 10, func: no }),
    }
}

fn sys_19(_vm: &mut Vm, _params: &ParamList) -> Result<()> {
    warn!("System.function[19] not implemented");
    Ok(())
}

fn sys_strlen(vm: &mut Vm, params: &ParamList) -> Result<()> {
    let len = params.string(0)?.len() as u32;
    vm.mem.set_var32(18, len)
}

// merge the separately rendered text planes onto the overlay
fn update_text(vm: &mut Vm, _params: &ParamList) -> Result<()> {
    if vm.mem.get_var4(2001)? != 1 {
        return Ok(());
    }
    merge_text_planes(vm, SEPARATE_TEXT_SURFACE, 128, 336)
}

fn sys_22(vm: &mut Vm, params: &ParamList) -> Result<()> {
    match params.expr(0)? {
        1 => update_text(vm, params),
        no => {
            warn!("System.function[22].function[{}] not implemented", no);
            Ok(())
        }
    }
}

// ---- UTIL handlers ---------------------------------------------------------

fn util_7(_vm: &mut Vm, _params: &ParamList) -> Result<()> {
    warn!("Util.function[7] not implemented");
    Ok(())
}

fn util_11(vm: &mut Vm, _params: &ParamList) -> Result<()> {
    vm.mem.set_var32(18, 0)
}

fn util_12(_vm: &mut Vm, _params: &ParamList) -> Result<()> {
    warn!("Util.function[12] not implemented");
    Ok(())
}

fn util_15(_vm: &mut Vm, _params: &ParamList) -> Result<()> {
    warn!("Util.function[15] not implemented");
    Ok(())
}

fn util_16(vm: &mut Vm, _params: &ParamList) -> Result<()> {
    vm.mem.set_var32(18, 1)
}

pub fn game() -> Game {
    let mut sys_table: [Option<SysFn>; GAME_MAX_SYS] = [None; GAME_MAX_SYS];
    sys_table[0] = Some(sys::sys_set_font_size);
    sys_table[1] = Some(sys_display_number);
    sys_table[2] = Some(sys_cursor);
    sys_table[3] = Some(sys_anim);
    sys_table[4] = Some(sys_savedata);
    sys_table[5] = Some(sys_audio);
    sys_table[6] = Some(sys_voice);
    sys_table[7] = Some(sys::sys_file);
    sys_table[8] = Some(sys_load_image);
    sys_table[9] = Some(sys_display);
    sys_table[10] = Some(sys_graphics);
    sys_table[11] = Some(sys::sys_wait);
    sys_table[12] = Some(sys::sys_set_text_colors);
    sys_table[13] = Some(sys::sys_farcall);
    sys_table[14] = Some(sys::sys_check_cursor_pos);
    sys_table[15] = Some(sys::sys_menu_get_no);
    sys_table[18] = Some(sys::sys_check_input);
    sys_table[19] = Some(sys_19);
    sys_table[21] = Some(sys_strlen);
    sys_table[22] = Some(sys_22);

    let mut util_table: [Option<UtilFn>; GAME_MAX_UTIL] = [None; GAME_MAX_UTIL];
    util_table[7] = Some(util_7);
    util_table[11] = Some(util_11);
    util_table[12] = Some(util_12);
    util_table[15] = Some(util_15);
    util_table[16] = Some(util_16);

    let mut flags = [0u16; GAME_NR_FLAGS];
    flags[GameFlag::AnimEnable as usize] = 0x0004;
    flags[GameFlag::MenuReturn as usize] = 0x0008;
    flags[GameFlag::Return as usize] = 0x0010;
    flags[GameFlag::Log as usize] = 0x0080;
    flags[GameFlag::VoiceEnable as usize] = 0x0100;

    Game {
        title: "aishimai",
        surface_sizes: [
            (640, 480),
            (640, 1280),
            (640, 480),
            (640, 480),
            (640, 480),
            (640, 480),
            (640, 480),
            (640, 512),
            (864, 468),
            (720, 680),
        ],
        bpp: 24,
        var4_size: VAR4_SIZE,
        mem16_size: MEM16_SIZE,
        call_saves_procedures: false,
        dialect: AI5WIN_DIALECT,
        flags,
        mem_init,
        mem_restore,
        handle_event: None,
        custom_txt: Some(ai_shimai_txt),
        sys: sys_table,
        util: util_table,
    }
}
