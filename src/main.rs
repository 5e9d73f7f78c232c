use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use seed_converter::logging;
use seed_converter::pipeline::{flatten, receipts};
use seed_converter::Config;

#[derive(Parser)]
#[command(name = "seed_converter")]
#[command(about = "Convert JSON/NDJSON exports into CSV seed files")]
#[command(version = "0.1.0")]
struct Cli {
    /// Optional TOML file overriding the default paths and limits
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flatten every .json file in the input directory into its own CSV
    Flatten {
        /// Directory holding the JSON exports (default: raw_json)
        #[arg(long)]
        input_dir: Option<PathBuf>,
        /// Directory receiving the CSV files (default: seeds)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Expand the receipts export into one row per purchased item
    Receipts {
        /// NDJSON receipts file (default: raw_json/receipts.json)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Output CSV (default: seeds/receipt_items.csv)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run the flattener and then the receipt expander
    Run,
}

fn main() -> anyhow::Result<()> {
    // --help and argument errors exit here, before any log file is created
    let cli = Cli::parse();
    let _guard = logging::init_logging();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let result = match cli.command {
        Commands::Flatten {
            input_dir,
            output_dir,
        } => {
            if let Some(dir) = input_dir {
                config.flatten.input_dir = dir;
            }
            if let Some(dir) = output_dir {
                config.flatten.output_dir = dir;
            }
            flatten::run(&config.flatten).map(|_| ())
        }
        Commands::Receipts { input, output } => {
            if let Some(path) = input {
                config.receipts.input_file = path;
            }
            if let Some(path) = output {
                config.receipts.output_file = path;
            }
            receipts::run(&config.receipts).map(|_| ())
        }
        Commands::Run => {
            println!("📥 Step 1: Flattening JSON exports...");
            flatten::run(&config.flatten).and_then(|_| {
                println!("\n🧾 Step 2: Expanding receipt items...");
                receipts::run(&config.receipts).map(|_| ())
            })
        }
    };

    match result {
        Ok(()) => {
            info!("Run completed");
            Ok(())
        }
        Err(e) => {
            error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn help_and_bad_flags_stop_at_parsing() {
        let help = Cli::try_parse_from(["seed_converter", "--help"]).err().unwrap();
        assert_eq!(help.kind(), clap::error::ErrorKind::DisplayHelp);

        let bad = Cli::try_parse_from(["seed_converter", "flatten", "--nope"]).err().unwrap();
        assert_eq!(bad.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn flags_parse_into_overrides() {
        let cli = Cli::try_parse_from([
            "seed_converter",
            "receipts",
            "--input",
            "in.json",
            "--config",
            "c.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
        assert!(matches!(
            cli.command,
            Commands::Receipts { input: Some(ref p), output: None } if p == &PathBuf::from("in.json")
        ));
    }
}
