// Menu entries registered by MENUI and the interactive MENUS loop. Entries
// point at bytecode bodies; picking one reseats the instruction pointer
// there. The entry tables are mirrored into the memory image so scripts can
// inspect them through the usual array opcodes.

use crate::error::Result;
use crate::game::GameFlag;
use crate::input::{Buttons, InputEvent};
use crate::vm::{Vm, VmPointer};
use log::warn;
use std::time::Duration;

#[derive(Debug, Copy, Clone)]
pub struct MenuEntry {
    pub no: u32,
    pub body: VmPointer,
}

pub struct Menu {
    entries: Vec<MenuEntry>,
}

impl Menu {
    pub fn new() -> Self {
        Menu { entries: Vec::new() }
    }

    // Returns the index the entry landed at.
    pub fn define(&mut self, no: u32, body: VmPointer) -> usize {
        self.entries.push(MenuEntry { no, body });
        self.entries.len() - 1
    }

    pub fn get_no(&self, no: u32) -> Option<usize> {
        self.entries.iter().position(|e| e.no == no)
    }

    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// SYS menu pick: publish the table index of the entry with the given number.
pub fn menu_get_no(vm: &mut Vm, no: u32) -> Result<()> {
    let idx = match vm.menu.get_no(no) {
        Some(i) => i as u16,
        None => 0xffff,
    };
    vm.mem.set_var16(18, idx)
}

// Interactive menu loop: arrows move the selection, ACTIVATE jumps into the
// entry body, CANCEL leaves when the title enables menu return.
pub fn menu_exec(vm: &mut Vm) -> Result<()> {
    if vm.menu.is_empty() {
        warn!("MENUS with no registered entries");
        return Ok(());
    }
    let mut selection = 0usize;
    vm.input.clear();
    loop {
        vm.peek()?;
        while let Some(event) = vm.input.pop_event() {
            let down = match event {
                InputEvent::Down(b) => b,
                InputEvent::Up(_) => continue,
            };
            if down.contains(Buttons::UP) {
                selection = selection.checked_sub(1).unwrap_or(vm.menu.entries().len() - 1);
            } else if down.contains(Buttons::DOWN) {
                selection = (selection + 1) % vm.menu.entries().len();
            } else if down.contains(Buttons::ACTIVATE) {
                let entry = vm.menu.entries()[selection];
                vm.mem.set_var16(18, entry.no as u16)?;
                vm.ip = entry.body;
                vm.menu.clear();
                return Ok(());
            } else if down.contains(Buttons::CANCEL) && vm.flag_is_on(GameFlag::MenuReturn) {
                vm.menu.clear();
                return Ok(());
            }
        }
        std::thread::sleep(Duration::from_millis(16));
    }
}
