use clap::Parser;
use color_eyre::eyre::Result;

use vizcheck::args::HarnessArgs;
use vizcheck::runner;

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = HarnessArgs::parse();
    runner::run(args)
}
