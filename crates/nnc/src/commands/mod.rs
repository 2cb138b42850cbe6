//! Command dispatch.

pub mod config_cmd;
pub mod health;
pub mod history;
pub mod util;
pub mod watch;

use nnc_config::Config;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Route a parsed command to its handler.
///
/// Config commands get the raw load result so `config path` and
/// `config init` keep working when the current file is invalid.
pub async fn dispatch(
    cmd: Command,
    loaded: Result<Config, CliError>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Config(args) => config_cmd::handle(args, loaded, global),
        Command::Watch(args) => watch::handle(args, &loaded?, global).await,
        Command::Health(args) => health::handle(args, &loaded?, global).await,
        Command::History(args) => history::handle(&args, &loaded?, global),
    }
}
