use std::path::PathBuf;

pub mod anim;
pub mod asset;
pub mod audio;
pub mod cursor;
pub mod debug;
pub mod error;
pub mod game;
pub mod gfx;
pub mod input;
pub mod memory;
pub mod menu;
pub mod opcodes;
pub mod savedata;
pub mod sys;
pub mod text;
pub mod util;
pub mod vm;

pub mod aishimai;
pub mod isaku;
pub mod shangrlia;
pub mod yuno;

use asset::{AssetSource, DirSource};
use debug::Debugger;
use error::Result;
use vm::Vm;

pub struct Config {
    pub title: String,
    pub asset_dir: PathBuf,
    pub save_dir: PathBuf,
    pub windowed: bool,
}

pub struct Engine {
    pub vm: Vm,
}

impl Engine {
    pub fn new(config: Config) -> Result<Engine> {
        let game = game::lookup(&config.title)?;
        let source = Box::new(DirSource::new(config.asset_dir));
        let vm = Vm::new(game, source, config.save_dir, config.windowed)?;
        Ok(Engine { vm })
    }

    // Windowless engine over an arbitrary asset source; tests and tooling.
    pub fn headless(title: &str, source: Box<dyn AssetSource>, save_dir: PathBuf) -> Result<Engine> {
        let game = game::lookup(title)?;
        let vm = Vm::new(game, source, save_dir, false)?;
        Ok(Engine { vm })
    }

    pub fn run(&mut self, mes: &str, debug: bool) -> Result<()> {
        if debug {
            self.vm.debugger = Some(Debugger::new());
        }
        let init = self.vm.game.mem_init;
        init(&mut self.vm);
        self.vm.load_mes(mes)?;
        let result = self.vm.exec();
        if result.is_err() {
            self.vm.print_state();
        }
        result
    }
}
