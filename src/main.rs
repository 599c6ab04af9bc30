mod builtins;
mod completion;
mod config;
mod executor;
mod history;
mod parser;
mod recall;
mod repl;
mod util;

use anyhow::Context;

use crate::config::ShellConfig;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = ShellConfig::from_env().context("invalid shell configuration")?;
    log::debug!("starting with {:?}", config);
    repl::start_repl(config)
}
