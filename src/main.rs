mod argsets;
mod command;

use anyhow::{anyhow, Result};
use env_logger::Env;

use ems_ingest::constants::{defaults, envvars};
use ems_ingest::helpers::load_dotenv;

const CMD_RUN: &str = "run";
const CMD_CONVERT: &str = "convert";
const CMD_LOAD: &str = "load";
const CMD_DEVICES: &str = "devices";

fn main() -> Result<()> {
    let dotenv_files = load_dotenv();
    env_logger::Builder::from_env(Env::default().filter_or(envvars::LOG_LEVEL, defaults::LOG_LEVEL))
        .init();
    for path in dotenv_files {
        log::debug!("Loaded {}", path.display());
    }

    let mut args = pico_args::Arguments::from_env();
    let subcommand = args.subcommand()?;
    let config = argsets::ConfigArgs {
        source_dir: args.opt_value_from_str("--source")?,
        archive_root: args.opt_value_from_str("--archive")?,
        db_path: args.opt_value_from_str("--db")?,
    };
    match subcommand.as_deref() {
        Some(CMD_RUN) => command::run(argsets::RunArgs {
            config,
            date: args.opt_value_from_str("--date")?,
        }),
        Some(CMD_CONVERT) => command::convert(argsets::ConvertArgs {
            csv_path: args.free_from_str()?,
        }),
        Some(CMD_LOAD) => command::load(argsets::LoadArgs {
            config,
            xlsx_path: args.free_from_str()?,
        }),
        Some(CMD_DEVICES) => command::devices(argsets::DevicesArgs { config }),
        _ => Err(anyhow!(
            "Subcommand must be one of 'run', 'convert', 'load', 'devices'"
        )),
    }
}
