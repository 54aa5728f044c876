mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ratesheet",
    version,
    about = "Parse supplier matrix price sheets into normalized quotes"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a price sheet into quotes
    Parse {
        /// Path to the supplier file (xls, xlsx, csv, or positioned-text JSON)
        input_file: PathBuf,

        /// Supplier layout to parse with (see `ratesheet suppliers`)
        #[arg(short, long)]
        supplier: String,

        /// JSON file mapping rate-class aliases to internal ids
        #[arg(short, long = "aliases", value_name = "FILE")]
        aliases: Option<PathBuf>,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Write quotes to a JSON file instead of stdout
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Check a price sheet's structure without extracting quotes
    Validate {
        /// Path to the supplier file
        input_file: PathBuf,

        /// Supplier layout to validate against
        #[arg(short, long)]
        supplier: String,
    },
    /// List supported suppliers and their file formats
    Suppliers,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse {
            input_file,
            supplier,
            aliases,
            output,
            out,
        } => commands::parse::run(input_file, &supplier, aliases, &output, out),
        Commands::Validate {
            input_file,
            supplier,
        } => commands::validate::run(input_file, &supplier),
        Commands::Suppliers => commands::suppliers::list(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
