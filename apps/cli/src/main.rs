use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mtk_core::session::{MtkSession, SessionConfig};
use mtk_core::{BuiltinProfileTable, FlashMedium, ParamStore, TomlProfileTable};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "MediaTek chip profile and device parameter tool", long_about = None)]
struct Args {
    /// Session configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a hardware code and print the chip parameters
    Resolve {
        /// Hardware code, e.g. 0x0766
        #[arg(value_parser = parse_hw_code)]
        hw_code: u16,

        /// Flash medium (emmc, nand, ...)
        #[arg(long)]
        flash: Option<FlashMedium>,

        /// Extra profile table (TOML), consulted before the builtin one
        #[arg(long)]
        profiles: Option<PathBuf>,
    },
    /// Read or write cached device parameters
    Param {
        /// Hex device identity the parameters belong to
        #[arg(long)]
        identity: String,

        /// Parameter directory (default: logs)
        #[arg(long)]
        path: Option<PathBuf>,

        #[command(subcommand)]
        action: ParamAction,
    },
    /// Write a default configuration file
    InitConfig {
        /// Output path
        output: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum ParamAction {
    /// Print a stored value
    Get { key: String },
    /// Store a value
    Set { key: String, value: String },
    /// List stored keys
    List,
}

fn parse_hw_code(s: &str) -> Result<u16, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid hw code '{s}': {e}"))
}

fn main() {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if args.verbose {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(e) = run(args) {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => SessionConfig::load_from_file(path)
            .with_context(|| format!("Loading config {}", path.display()))?,
        None => SessionConfig::default(),
    };

    match args.command {
        Command::Resolve {
            hw_code,
            flash,
            profiles,
        } => {
            if let Some(flash) = flash {
                config.flash = flash;
            }
            if profiles.is_some() {
                config.profiles_path = profiles;
            }
            resolve(config, hw_code)
        }
        Command::Param {
            identity,
            path,
            action,
        } => {
            let dir = path.unwrap_or(config.hwparam_path);
            param(&identity, dir, action)
        }
        Command::InitConfig { output } => {
            config.save_to_file(&output)?;
            info!(path = %output.display(), "Wrote configuration");
            Ok(())
        }
    }
}

fn resolve(config: SessionConfig, hw_code: u16) -> Result<()> {
    let profiles = config.profiles_path.clone();
    let mut session = MtkSession::new(config);
    if let Some(path) = profiles {
        let table = TomlProfileTable::load_from_file(&path)?.with_fallback(BuiltinProfileTable);
        session = session.with_table(table);
    }

    println!("{}", session.init_hw_code(hw_code));
    match session.watchdog_reset_sequence() {
        Some(wdt) => println!("  watchdog disable: {wdt}"),
        None => println!("  watchdog disable: none"),
    }
    let flash = session.config().flash.clone();
    let bmt = session.bmt_settings(hw_code);
    println!("  bmt ({flash}): {bmt}");
    Ok(())
}

fn param(identity: &str, dir: PathBuf, action: ParamAction) -> Result<()> {
    let mut store = ParamStore::open(identity, &dir)?;
    match action {
        ParamAction::Get { key } => match (store.get(&key), store.raw(&key)) {
            (Some(value), _) => println!("{value}"),
            (None, Some(value)) => println!("{value}"),
            (None, None) => anyhow::bail!("No value for '{key}'"),
        },
        ParamAction::Set { key, value } => {
            store.set(&key, &value)?;
            info!(key = %key, path = %store.path().display(), "Stored parameter");
        }
        ParamAction::List => {
            for key in store.keys() {
                match (store.get(key), store.raw(key)) {
                    (Some(value), _) => println!("{key} = {value}"),
                    (None, Some(value)) => println!("{key} = {value}"),
                    (None, None) => {}
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hw_code() {
        assert_eq!(parse_hw_code("0x0766"), Ok(0x0766));
        assert_eq!(parse_hw_code("6580"), Ok(0x6580));
        assert_eq!(parse_hw_code("0XBEEF"), Ok(0xBEEF));
        assert!(parse_hw_code("0x10000").is_err());
        assert!(parse_hw_code("zz").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from(["mtkcfg", "resolve", "0x6592", "--flash", "nand"]).unwrap();
        match args.command {
            Command::Resolve { hw_code, flash, .. } => {
                assert_eq!(hw_code, 0x6592);
                assert_eq!(flash, Some(FlashMedium::Nand));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
