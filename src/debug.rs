// Statement-level debugger. Attached to the exec loop, it stops before every
// statement (or at breakpoints once continued), shows the VM state and takes
// single-letter commands from stdin, in the spirit of a classic monitor.

use crate::memory::sysvar16;
use crate::vm::Vm;
use std::collections::{BTreeSet, HashSet};
use std::io;
use std::io::prelude::*;
use termion::{clear, color, cursor};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DebugSignal {
    Run,
    Quit,
}

#[derive(PartialEq, Clone)]
enum DebugCommand {
    Quit,
    Step,
    Continue,
    SetBreakpoint(Option<String>),
    DeleteBreakpoint(Option<String>),
    Watch(Option<String>),
    Unwatch(Option<String>),
}

pub struct Debugger {
    code_running: bool,
    last_cmd: DebugCommand,
    breakpoints: HashSet<u32>,
    watches: BTreeSet<usize>,
}

impl Debugger {
    pub fn new() -> Debugger {
        Debugger {
            code_running: false,
            last_cmd: DebugCommand::Step,
            breakpoints: HashSet::new(),
            watches: BTreeSet::new(),
        }
    }

    pub fn update(&mut self, vm: &Vm) -> DebugSignal {
        if self.code_running && !self.breakpoints.contains(&vm.ip.ptr) {
            return DebugSignal::Run;
        }
        self.code_running = false;
        loop {
            self.draw_user_interface(vm);
            let cmd = self.get_command();
            match &cmd {
                DebugCommand::Quit => return DebugSignal::Quit,
                DebugCommand::Step => {
                    self.last_cmd = cmd;
                    return DebugSignal::Run;
                }
                DebugCommand::Continue => {
                    self.code_running = true;
                    return DebugSignal::Run;
                }
                DebugCommand::SetBreakpoint(a) => self.set_breakpoint(a, false),
                DebugCommand::DeleteBreakpoint(a) => self.set_breakpoint(a, true),
                DebugCommand::Watch(a) => self.watch(a, false),
                DebugCommand::Unwatch(a) => self.watch(a, true),
            }
        }
    }

    fn set_breakpoint(&mut self, address: &Option<String>, delete: bool) {
        match parse_address(address) {
            Some(address) => {
                if delete {
                    self.breakpoints.remove(&address);
                    println!("Breakpoint deleted.");
                } else {
                    self.breakpoints.insert(address);
                    println!("Breakpoint created.");
                }
            }
            None => println!("Invalid address!"),
        }
    }

    fn watch(&mut self, index: &Option<String>, delete: bool) {
        match index.as_ref().and_then(|i| i.parse::<usize>().ok()) {
            Some(i) => {
                if delete {
                    self.watches.remove(&i);
                } else {
                    self.watches.insert(i);
                }
            }
            None => println!("Invalid variable index!"),
        }
    }

    fn draw_user_interface(&self, vm: &Vm) {
        let op = vm
            .peek_byte()
            .map(|b| (vm.game.dialect.stmt)(b).name())
            .unwrap_or("??");
        print!("{}{}", clear::All, cursor::Goto(1, 1));
        println!(
            "{}── {} ──{}",
            color::Fg(color::Green),
            vm.game.title,
            color::Fg(color::Reset)
        );
        println!("mes:   {}", vm.mem.mes_name());
        println!("ip:    {:08x} (code base {:08x})", vm.ip.ptr, vm.ip.code);
        println!("next:  {}", op);
        println!(
            "flags: {:04x}  calls: {}  scope: {}",
            vm.mem.get_sysvar16(sysvar16::FLAGS),
            vm.call_depth(),
            vm.scope_counter(),
        );
        if !self.watches.is_empty() {
            println!("watched var16 cells:");
            for &i in self.watches.iter() {
                match vm.mem.get_var16(i) {
                    Ok(v) => println!("  var16[{:2}] = {:04x}", i, v),
                    Err(_) => println!("  var16[{:2}] = <out of range>", i),
                }
            }
        }
        println!(
            "\nn/s step, c continue, b/d <hexoff> breakpoints, w/u <idx> watch var16, q quit"
        );
        print!("> ");
        let _ = io::stdout().flush();
    }

    fn get_command(&mut self) -> DebugCommand {
        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            return DebugCommand::Quit;
        }
        let mut cmd = input.split_whitespace();
        match cmd.next() {
            Some("q") => DebugCommand::Quit,
            Some("s") | Some("n") => DebugCommand::Step,
            Some("c") => DebugCommand::Continue,
            Some("b") => DebugCommand::SetBreakpoint(cmd.next().map(String::from)),
            Some("d") => DebugCommand::DeleteBreakpoint(cmd.next().map(String::from)),
            Some("w") => DebugCommand::Watch(cmd.next().map(String::from)),
            Some("u") => DebugCommand::Unwatch(cmd.next().map(String::from)),
            _ => self.last_cmd.clone(),
        }
    }
}

fn parse_address(address: &Option<String>) -> Option<u32> {
    match address {
        Some(addr) => u32::from_str_radix(addr, 16).ok(),
        None => None,
    }
}
