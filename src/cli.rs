use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "flightcfg", about = "Parameter menu for the flight controller")]
pub struct Cli {
    /// Config file (default: flightcfg.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// EEPROM image file, overriding the config file
    #[arg(long)]
    pub storage: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Interactive parameter menu (default)
    Menu(MenuArgs),
    /// Print every parameter with its current value
    List,
    /// Reset every parameter to its default and save
    Reset,
    /// Check the stored record without repairing it
    Check,
}

#[derive(clap::Args, Default)]
pub struct MenuArgs {
    /// Seconds to wait for Enter before skipping the menu
    #[arg(long)]
    pub wait: Option<u32>,

    /// Enter the menu immediately
    #[arg(long, conflicts_with = "wait")]
    pub no_wait: bool,
}
