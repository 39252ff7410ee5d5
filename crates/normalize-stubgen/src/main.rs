// Command-line entry point for stubgen.

use clap::Parser;
use normalize_stubgen::{StubOptions, generate_stub};
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "stubgen", version, about = "Generate a test stub for a Go interface")]
struct Cli {
    /// Directory of the Go package declaring the interface
    dir: PathBuf,

    /// Name of the interface to stub
    interface: String,

    /// Write the stub to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip canonical formatting of the generated source
    #[arg(long)]
    no_fmt: bool,

    /// TOML file with generation options
    #[arg(long)]
    config: Option<PathBuf>,
}

fn load_options(cli: &Cli) -> Result<StubOptions, String> {
    let mut options = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
            toml::from_str(&text).map_err(|e| format!("invalid config {}: {}", path.display(), e))?
        }
        None => StubOptions::default(),
    };
    if cli.no_fmt {
        options.format = false;
    }
    Ok(options)
}

fn run(cli: &Cli) -> Result<(), String> {
    let options = load_options(cli)?;
    let source = generate_stub(&cli.dir, &cli.interface, &options).map_err(|e| e.to_string())?;
    match &cli.output {
        Some(path) => {
            fs::write(path, &source)
                .map_err(|e| format!("cannot write {}: {}", path.display(), e))?;
            info!("stubgen: wrote {} bytes to {}", source.len(), path.display());
            println!("Stub generated in {}", path.display());
        }
        None => print!("{}", source),
    }
    Ok(())
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("stubgen: {}", e);
        std::process::exit(1);
    }
}
