use std::path::PathBuf;
use std::process::ExitCode;

use frost_ngin::flow::{self, RunOptions};

const USAGE: &str = "usage: frost-ngin [--config <file.json>] [model.glb ...]";

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<RunOptions, String> {
    let mut options = RunOptions::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or("--config needs a file")?;
                options.config_path = PathBuf::from(path);
            }
            "-h" | "--help" => return Err(USAGE.to_string()),
            _ => options.models.push(PathBuf::from(arg)),
        }
    }
    Ok(options)
}

fn main() -> ExitCode {
    let options = match parse_args(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };
    match flow::run(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            eprintln!("frost-ngin: {e:#}");
            ExitCode::FAILURE
        }
    }
}
