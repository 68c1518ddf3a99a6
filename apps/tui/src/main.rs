//! BankChat TUI: interactive terminal chat with the banking assistant.
//!
//! Chat history and input on the left, example questions and the clear
//! action on the right, built with `ratatui` + `crossterm`.

mod app;
mod panels;
mod widgets;

use std::fs::OpenOptions;
use std::sync::Mutex;

use bankchat_shared::{BankChatError, config_dir, load_config};
use color_eyre::eyre::Result;

const LOG_FILE_NAME: &str = "bankchat-tui.log";

fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing()?;
    let config = load_config()?;
    app::run(config)
}

/// Log to a file under the config dir; the terminal belongs to the UI.
fn init_tracing() -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt};

    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BankChatError::io(&dir, e))?;
    let path = dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| BankChatError::io(&path, e))?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bankchat=info"));

    fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}
