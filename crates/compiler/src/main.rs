//! Quill Compiler CLI
//!
//! Command-line interface for running, compiling, and disassembling
//! Quill BASIC programs.

use clap::{CommandFactory, Parser as ClapParser, Subcommand};
use clap_complete::{Shell, generate};
use quill_runtime::{StreamEffects, Vm};
use quillc::CompilerConfig;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

#[derive(ClapParser)]
#[command(name = "quillc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Quill BASIC - run, compile, and inspect .bas programs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile and run a .bas program
    Run {
        /// Input .bas source file
        input: PathBuf,

        /// Compiler configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Compile a .bas program to a bytecode file
    Build {
        /// Input .bas source file
        input: PathBuf,

        /// Output bytecode path (defaults to input with .qbc extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Compiler configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Disassemble a .bas source file or a compiled .qbc file
    Dis {
        /// Input .bas or .qbc file
        input: PathBuf,

        /// Compiler configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { input, config } => run(&input, config.as_deref()),
        Commands::Build {
            input,
            output,
            config,
        } => {
            let output = output.unwrap_or_else(|| input.with_extension("qbc"));
            build(&input, &output, config.as_deref());
        }
        Commands::Dis { input, config } => dis(&input, config.as_deref()),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
        }
    }
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("error: {msg}");
    process::exit(1);
}

fn load_config(path: Option<&Path>) -> CompilerConfig {
    match path {
        Some(path) => CompilerConfig::load(path).unwrap_or_else(|e| fail(e)),
        None => CompilerConfig::default(),
    }
}

fn read_source(path: &Path) -> String {
    std::fs::read_to_string(path)
        .unwrap_or_else(|e| fail(format!("cannot read {}: {e}", path.display())))
}

fn run(input: &Path, config: Option<&Path>) {
    let config = load_config(config);
    let source = read_source(input);
    let bytecode = quillc::compile_source(&source, &config).unwrap_or_else(|e| fail(e));
    let mut vm = Vm::new(StreamEffects::stdout());
    if let Err(e) = vm.run(&bytecode) {
        fail(e);
    }
}

fn build(input: &Path, output: &Path, config: Option<&Path>) {
    let config = load_config(config);
    let source = read_source(input);
    let bytecode = quillc::compile_source(&source, &config).unwrap_or_else(|e| fail(e));
    std::fs::write(output, &bytecode.code)
        .unwrap_or_else(|e| fail(format!("cannot write {}: {e}", output.display())));
    println!("wrote {} ({} bytes)", output.display(), bytecode.code.len());
}

fn dis(input: &Path, config: Option<&Path>) {
    let code = if input.extension().is_some_and(|ext| ext == "qbc") {
        std::fs::read(input)
            .unwrap_or_else(|e| fail(format!("cannot read {}: {e}", input.display())))
    } else {
        let config = load_config(config);
        let source = read_source(input);
        quillc::compile_source(&source, &config)
            .unwrap_or_else(|e| fail(e))
            .code
    };
    match quill_core::disassemble(&code) {
        Ok(text) => print!("{text}"),
        Err(e) => fail(e),
    }
}
