use anyhow::Result;
use clap::Parser;
use rh_bin::cli::CliArgs;

fn main() -> Result<()> {
    let args = CliArgs::parse();
    match rh_bin::run(args) {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("fatal: {:#}", e);
            std::process::exit(1);
        }
    }
}
