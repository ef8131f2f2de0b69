use ai5vm::{Config, Engine};
use std::path::PathBuf;
use std::process::exit;

fn usage() -> ! {
    eprintln!("usage: ai5run <title> <mes> [--debug] [--assets DIR] [--saves DIR]");
    eprintln!("titles: {}", ai5vm::game::titles().join(", "));
    exit(2);
}

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let title = match args.next() {
        Some(title) => title,
        None => usage(),
    };
    let mes = match args.next() {
        Some(mes) => mes,
        None => usage(),
    };
    let mut asset_dir = PathBuf::from(".");
    let mut save_dir = PathBuf::from("saves");
    let mut debug = false;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--debug" => debug = true,
            "--assets" => match args.next() {
                Some(dir) => asset_dir = PathBuf::from(dir),
                None => usage(),
            },
            "--saves" => match args.next() {
                Some(dir) => save_dir = PathBuf::from(dir),
                None => usage(),
            },
            _ => usage(),
        }
    }

    let config = Config { title, asset_dir, save_dir, windowed: true };
    let mut engine = match Engine::new(config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ai5run: {}", e);
            exit(1);
        }
    };
    if let Err(e) = engine.run(&mes, debug) {
        eprintln!("ai5run: {}", e);
        exit(1);
    }
}
