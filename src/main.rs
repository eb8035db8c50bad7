#![allow(missing_docs)]

use clap::{Parser, Subcommand};

mod cmd;

#[derive(Parser)]
#[command(name = "affyio", about = "Microarray CEL, CDF and DAT inspection tools")]
struct Cli {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// Sniff a file and print its format and dimensions.
	Info(cmd::info::Args),
	/// Dump an intensity file.
	Cel(cmd::cel::Args),
	/// Dump a probe layout.
	Cdf(cmd::cdf::Args),
	/// Dump generic container metadata.
	Calvin(cmd::calvin::Args),
	/// Dump a pixel-image header.
	Dat(cmd::dat::Args),
}

fn main() {
	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> affyio::affy::Result<()> {
	let cli = Cli::parse();

	match cli.command {
		Commands::Info(args) => cmd::info::run(args),
		Commands::Cel(args) => cmd::cel::run(args),
		Commands::Cdf(args) => cmd::cdf::run(args),
		Commands::Calvin(args) => cmd::calvin::run(args),
		Commands::Dat(args) => cmd::dat::run(args),
	}
}
