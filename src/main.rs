#![allow(clippy::collapsible_if)]

mod cli;
mod config;
mod menu;
mod params;
mod term;

use std::io::{IsTerminal, Write};
use std::time::SystemTime;

use clap::Parser;
use cli::{Cli, Command, MenuArgs};
use menu::Session;
use params::Working;
use params::storage::FileStorage;
use params::store::Store;
use params::tree::MAIN_MENU;
use term::{RawTerminal, StdioTerminal};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    config::init(config::load(cli.config.as_deref())?);

    let storage_path = cli
        .storage
        .unwrap_or_else(|| config::storage_path().to_path_buf());
    let store = Store::new(FileStorage::new(storage_path), MAIN_MENU.nodes)
        .with_version(config::schema_version());

    match cli.command.unwrap_or(Command::Menu(MenuArgs::default())) {
        Command::Menu(args) => menu(args, store),
        Command::List => {
            env_logger::init();
            let mut working = Working::new();
            let session = Session::preview(MAIN_MENU, store, &mut working)?;
            print!("{}", session.listing());
            Ok(())
        }
        Command::Reset => {
            env_logger::init();
            let mut working = Working::new();
            let mut session = Session::start(MAIN_MENU, store, &mut working)?;
            session.reset();
            session.save()?;
            println!(
                "Configuration reset to default values and saved to {}",
                session.store().storage().path().display()
            );
            Ok(())
        }
        Command::Check => {
            env_logger::init();
            let mut store = store;
            let status = store.inspect()?;
            println!("{}: {status}", store.storage().path().display());
            if !status.is_valid() {
                anyhow::bail!("stored configuration is not usable");
            }
            Ok(())
        }
    }
}

/// Logger that writes to stderr with \r\n line endings, usable in raw mode.
struct RawModeLogger;

impl log::Log for RawModeLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let now = SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default();
            let secs = now.as_secs() % 86400;
            let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
            let _ = write!(
                std::io::stderr(),
                "[{h:02}:{m:02}:{s:02}.{:03} {} {}] {}\r\n",
                now.subsec_millis(),
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static RAW_MODE_LOGGER: RawModeLogger = RawModeLogger;

fn menu(args: MenuArgs, store: Store<FileStorage>) -> anyhow::Result<()> {
    log::set_logger(&RAW_MODE_LOGGER).ok();
    log::set_max_level(
        std::env::var("RUST_LOG")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
    );

    let mut working = Working::new();
    let mut session = Session::start(MAIN_MENU, store, &mut working)?;

    // Piped input: no countdown, no raw mode.
    if !std::io::stdin().is_terminal() {
        return session.run(&mut StdioTerminal::new());
    }

    let wait = if args.no_wait {
        0
    } else {
        args.wait.unwrap_or_else(config::boot_wait_secs)
    };

    let mut term = RawTerminal::new()?;
    if wait > 0 && !term.wait_for_enter(wait)? {
        log::info!("No configuration requested, continuing with stored parameters");
        return Ok(());
    }
    session.run(&mut term)?;
    drop(term);
    drop(session);

    log::info!("Configuration finished with {} live parameters", working.len());
    Ok(())
}
