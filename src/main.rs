use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use arid::model::Node;
use arid::scope::Eval;
use arid::{Repl, Scope, serialize, source};

#[derive(Parser)]
#[command(name = "arid")]
#[command(
	author,
	version,
	about = "Lazy, inheriting configuration and templating language"
)]
#[command(arg_required_else_help = true)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// Log directive dispatch, includes and template processing to stderr
	#[arg(short, long, global = true)]
	verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
	/// Read statements from stdin, reporting recoverable errors per line
	Repl,
	/// Load a file and print the value at a path
	Get {
		/// Statement file to load
		file: PathBuf,
		/// Path words; empty for the whole file
		path: Vec<String>,
		#[arg(long, value_enum, default_value_t = Format::Text)]
		format: Format,
	},
	/// Process a template against the loaded configuration
	Template {
		template: PathBuf,
		/// Statement files loaded before processing, in order
		#[arg(long, short, value_name = "FILE")]
		config: Vec<PathBuf>,
	},
	/// Load and fully resolve each file, printing `ok: FILE` or the error
	Check {
		#[arg(required = true)]
		files: Vec<PathBuf>,
	},
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
	Text,
	Json,
	Toml,
	Source,
	Shell,
}

fn main() -> ExitCode {
	let cli = Cli::parse();
	init_logging(cli.verbose);
	match run(cli) {
		Ok(code) => code,
		Err(e) => {
			eprintln!("error: {e:?}");
			ExitCode::FAILURE
		}
	}
}

fn init_logging(verbose: bool) {
	let default = if verbose { "debug" } else { "warn" };
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.without_time()
		.init();
}

fn run(cli: Cli) -> Result<ExitCode> {
	match cli.command {
		Commands::Repl => handle_repl(),
		Commands::Get { file, path, format } => handle_get(&file, &path, format),
		Commands::Template { template, config } => handle_template(&template, &config),
		Commands::Check { files } => handle_check(&files),
	}
}

fn load(scope: &Scope, file: &Path) -> Result<()> {
	source::load_file(scope, file).with_context(|| format!("Failed to load {}", file.display()))
}

fn handle_repl() -> Result<ExitCode> {
	let scope = Scope::new();
	let mut repl = Repl::new(&scope);
	for line in std::io::stdin().lock().lines() {
		let line = line.context("Failed to read stdin")?;
		if let Err(e) = repl.feed(&line) {
			if !e.is_recoverable() {
				return Err(e).context("Statement failed");
			}
			eprintln!("{e}");
		}
	}
	repl.close().context("Input ended mid-statement")?;
	Ok(ExitCode::SUCCESS)
}

fn handle_get(file: &Path, path: &[String], format: Format) -> Result<ExitCode> {
	let scope = Scope::new();
	load(&scope, file)?;
	let node = scope
		.resolved(path)
		.with_context(|| format!("Failed to resolve: {}", path.join(" ")))?;
	let output = match (format, &node) {
		(Format::Json, _) => serialize::to_json(&node)? + "\n",
		(Format::Text | Format::Source, Node::Scope(s)) => serialize::to_source(s)?,
		(Format::Toml, Node::Scope(s)) => serialize::to_toml(s)?,
		(Format::Shell, Node::Scope(s)) => serialize::to_shell(s)?,
		(Format::Text, other) => other.cat()? + "\n",
		(_, other) => anyhow::bail!("Cannot write a {} in this format", other.kind()),
	};
	print!("{output}");
	Ok(ExitCode::SUCCESS)
}

fn handle_template(template: &Path, config: &[PathBuf]) -> Result<ExitCode> {
	let scope = Scope::new();
	for file in config {
		load(&scope, file)?;
	}
	let output = source::template_file(&scope, template)
		.with_context(|| format!("Failed to process {}", template.display()))?;
	print!("{output}");
	Ok(ExitCode::SUCCESS)
}

fn handle_check(files: &[PathBuf]) -> Result<ExitCode> {
	let mut failed = false;
	for file in files {
		let scope = Scope::new();
		let result = source::load_file(&scope, file).and_then(|()| scope.unravel(&mut Eval::new()));
		match result {
			Ok(_) => println!("ok: {}", file.display()),
			Err(e) => {
				eprintln!("{}: {e}", file.display());
				failed = true;
			}
		}
	}
	Ok(if failed {
		ExitCode::FAILURE
	} else {
		ExitCode::SUCCESS
	})
}
