// Generic UTIL handlers shared between titles. Utils are dispatched on their
// first parameter; results go back through the var16[18] / var32[16] /
// var32[18] convention like every other handler.

use crate::error::{Result, VmError};
use crate::game::{UtilFn, GAME_MAX_UTIL};
use crate::input::Buttons;
use crate::memory::sysvar32;
use crate::sys::{load_image, read_file};
use crate::vm::{ParamList, Vm};
use log::warn;
use std::time::Duration;

// UTIL[10]: directional wipe
pub fn util_fade(vm: &mut Vm, params: &ParamList) -> Result<()> {
    let x = params.expr(1)? as i32;
    let y = params.expr(2)? as i32;
    let w = (params.expr(3)? as i32 - x) + 1;
    let h = (params.expr(4)? as i32 - y) + 1;
    let dst_i = params.expr(5)? as usize;
    let down = params.expr(6)? == 1;
    let src_i = if params.expr(7)? == 0 { None } else { Some(2) };

    if down {
        vm.gfx.fade_down(x * 8, y, w * 8, h, dst_i, src_i, &vm.cursor)
    } else {
        vm.gfx.fade_right(x * 8, y, w * 8, h, dst_i, src_i, &vm.cursor)
    }
}

// UTIL[12]: mosaic
pub fn util_pixelate(vm: &mut Vm, params: &ParamList) -> Result<()> {
    let x = params.expr(1)? as i32;
    let y = params.expr(2)? as i32;
    let w = (params.expr(3)? as i32 - x) + 1;
    let h = (params.expr(4)? as i32 - y) + 1;
    let dst_i = params.expr(5)? as usize;
    let mag = params.expr(6)?;
    vm.gfx.pixelate(x * 8, y, w * 8, h, dst_i, mag)
}

// UTIL[15]: wait for the cursor to rest for a given interval
pub fn util_check_cursor(vm: &mut Vm, params: &ParamList) -> Result<()> {
    if params.expr(1)? == 0 {
        vm.cursor_rest.start_t = vm.ticks();
        vm.cursor_rest.wait_t = params.expr(2)?;
        let (x, y) = vm.input.cursor_pos();
        vm.cursor_rest.x = x;
        vm.cursor_rest.y = y;
        return Ok(());
    }

    let current_t = vm.ticks();
    vm.mem.set_var16(18, 0)?;
    if current_t < vm.cursor_rest.start_t + vm.cursor_rest.wait_t {
        return Ok(());
    }

    // report TRUE only if the cursor stayed put for the whole interval
    let (x, y) = vm.input.cursor_pos();
    if x == vm.cursor_rest.x && y == vm.cursor_rest.y {
        return vm.mem.set_var16(18, 1);
    }

    vm.cursor_rest.start_t = current_t;
    vm.cursor_rest.x = x;
    vm.cursor_rest.y = y;
    Ok(())
}

// UTIL[16]: delay in 15 ms steps
pub fn util_delay(vm: &mut Vm, params: &ParamList) -> Result<()> {
    vm.delay(params.expr(1)? * 15)
}

// UTIL[17]: remember the current CG/data asset names
pub fn util_save_animation(vm: &mut Vm, _params: &ParamList) -> Result<()> {
    vm.assets.snapshot_names();
    Ok(())
}

// UTIL[18]: reload the remembered assets
pub fn util_restore_animation(vm: &mut Vm, _params: &ParamList) -> Result<()> {
    let (cg, data) = match (&vm.assets.saved_cg_name, &vm.assets.saved_data_name) {
        (Some(cg), Some(data)) => (cg.clone(), data.clone()),
        _ => return Err(VmError::NoSavedAnimation),
    };
    load_image(vm, &cg, 1)?;
    let off = vm.mem.get_sysvar32(sysvar32::DATA_OFFSET);
    read_file(vm, &data, off)
}

// UTIL[22]
pub fn util_anim_running(vm: &mut Vm, _params: &ParamList) -> Result<()> {
    let running = vm.anim.any_running();
    vm.mem.set_var16(18, running as u16)
}

// UTIL[201]: BGM without looping
pub fn util_bgm_play_once(vm: &mut Vm, params: &ParamList) -> Result<()> {
    let name = params.string(1)?.to_owned();
    match vm.assets.load_data(&name) {
        Some(data) => vm.audio.bgm_play(data, false),
        None => warn!("Failed to load audio \"{}\"", name),
    }
    Ok(())
}

// UTIL[210]
pub fn util_ticks(vm: &mut Vm, _params: &ParamList) -> Result<()> {
    let t = vm.ticks();
    vm.mem.set_var32(16, t)
}

// UTIL[211]: wait until a deadline, with interrupt procedures 110/111 bound
// to ACTIVATE/CANCEL
pub fn util_wait_until(vm: &mut Vm, params: &ParamList) -> Result<()> {
    if vm.procedures[110].is_none() || vm.procedures[111].is_none() {
        return Err(VmError::WaitUntilProcedures);
    }
    let stop_t = params.expr(1)?;
    loop {
        vm.peek()?;
        if vm.input.down(Buttons::ACTIVATE) {
            return vm.call_procedure(110);
        }
        if vm.input.down(Buttons::CANCEL) {
            return vm.call_procedure(111);
        }
        if vm.ticks() >= stop_t {
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(16));
    }
}

pub fn util_set_monochrome(_vm: &mut Vm, _params: &ParamList) -> Result<()> {
    warn!("Util.set_monochrome not implemented");
    Ok(())
}

pub fn util_213(_vm: &mut Vm, _params: &ParamList) -> Result<()> {
    warn!("Util.function[213] not implemented");
    Ok(())
}

// The table shared by the titles that run on the stock handlers.
pub fn default_util_table() -> [Option<UtilFn>; GAME_MAX_UTIL] {
    let mut util: [Option<UtilFn>; GAME_MAX_UTIL] = [None; GAME_MAX_UTIL];
    util[10] = Some(util_fade);
    util[12] = Some(util_pixelate);
    util[15] = Some(util_check_cursor);
    util[16] = Some(util_delay);
    util[17] = Some(util_save_animation);
    util[18] = Some(util_restore_animation);
    util[22] = Some(util_anim_running);
    util[100] = Some(util_set_monochrome);
    util[201] = Some(util_bgm_play_once);
    util[210] = Some(util_ticks);
    util[211] = Some(util_wait_until);
    util[213] = Some(util_213);
    util
}
