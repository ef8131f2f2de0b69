// Isaku. 8bpp indexed title on the stock handler set; palettes come in with
// the CGs.

use crate::game::{Game, GameFlag, FLAG_ALWAYS_ON, GAME_NR_FLAGS};
use crate::memory::{sysvar16, sysvar32};
use crate::opcodes::AI5WIN_DIALECT;
use crate::sys::default_sys_table;
use crate::util::default_util_table;
use crate::vm::Vm;

const VAR4_SIZE: usize = 1024;
const MEM16_SIZE: usize = 2048;

fn mem_restore(vm: &mut Vm) {
    let ptr = vm.mem.default_ptr_table();
    vm.mem.ptr = ptr;
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
}

fn mem_init(vm: &mut Vm) {
    vm.mem.ptr = vm.mem.default_ptr_table();

    vm.mem.set_sysvar16(sysvar16::FLAGS, 0x000f);
    vm.mem.set_sysvar16(sysvar16::TEXT_START_X, 0);
    vm.mem.set_sysvar16(sysvar16::TEXT_START_Y, 0);
    // text cursor x runs in 8-pixel units on the stock text path
    vm.mem.set_sysvar16(sysvar16::TEXT_END_X, 80);
    vm.mem.set_sysvar16(sysvar16::TEXT_END_Y, 400);
    vm.mem.set_sysvar16(sysvar16::FONT_WIDTH, 16);
    vm.mem.set_sysvar16(sysvar16::FONT_HEIGHT, 16);
    vm.mem.set_sysvar16(sysvar16::CHAR_SPACE, 16);
    vm.mem.set_sysvar16(sysvar16::LINE_SPACE, 16);
    vm.mem.set_sysvar16(sysvar16::MASK_COLOR, 0);

    vm.mem.set_sysvar32(sysvar32::CG_OFFSET, 0x20000);
    vm.mem.set_sysvar32(sysvar32::DATA_OFFSET, 0x30000);
    mem_restore(vm);
}

pub fn game() -> Game {
    let mut flags = [0u16; GAME_NR_FLAGS];
    flags[GameFlag::AnimEnable as usize] = 0x0004;
    flags[GameFlag::MenuReturn as usize] = 0x0008;
    flags[GameFlag::Return as usize] = 0x0010;
    flags[GameFlag::Log as usize] = 0x0080;
    flags[GameFlag::LoadPalette as usize] = FLAG_ALWAYS_ON;

    Game {
        title: "isaku",
        surface_sizes: [
            (640, 400),
            (640, 800),
            (640, 400),
            (640, 400),
            (640, 400),
            (0, 0),
            (0, 0),
            (0, 0),
            (0, 0),
            (0, 0),
        ],
        bpp: 8,
        var4_size: VAR4_SIZE,
        mem16_size: MEM16_SIZE,
        call_saves_procedures: false,
        dialect: AI5WIN_DIALECT,
        flags,
        mem_init,
        mem_restore,
        handle_event: None,
        custom_txt: None,
        sys: default_sys_table(),
        util: default_util_table(),
    }
}
