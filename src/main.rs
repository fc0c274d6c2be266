use std::error::Error;
use std::io::{self, Read};
use clap::Parser;
use log::{debug, error, info};
use config::{load_config, Config};

mod config;

#[derive(Parser, Debug)]
#[command(name = "simply")]
#[command(about = "Runs programs written in the Simply teaching language.")]
struct Cli {
    /// Program file; the program is read from standard input when omitted.
    #[arg()]
    file: Option<String>,

    #[arg(long)]
    config: Option<String>,

    #[arg(short, long)]
    verbose: bool,

    /// Print the parsed tree instead of running the program.
    #[arg(long)]
    tree: bool,

    #[arg(long)]
    max_call_depth: Option<usize>,

    #[arg(long)]
    log_dir: Option<String>,
}

fn resolve_config(cli: &Cli) -> Result<Config, Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };

    if cli.tree {
        config.run.print_tree = true;
    }
    if let Some(depth) = cli.max_call_depth {
        config.run.max_call_depth = depth;
    }
    if let Some(dir) = &cli.log_dir {
        config.logging.dir = Some(dir.clone());
    }
    if cli.verbose {
        config.logging.console_level = String::from("debug");
    }

    Ok(config)
}

fn init_logger(config: &Config) -> Result<(), Box<dyn Error>> {
    let logging = &config.logging;
    let console_level = simply_logger::parse_level(&logging.console_level)
        .ok_or_else(|| format!("Unknown log level '{}'", logging.console_level))?;
    let file_level = simply_logger::parse_level(&logging.file_level)
        .ok_or_else(|| format!("Unknown log level '{}'", logging.file_level))?;

    simply_logger::init(logging.dir.as_ref(), console_level, file_level)?;
    Ok(())
}

fn read_program(file: Option<&str>) -> Result<String, Box<dyn Error>> {
    match file {
        Some(path) => {
            info!("Loading program from {}", path);
            std::fs::read_to_string(path).map_err(|e| format!("Cannot read '{}': {}", path, e).into())
        }
        None => {
            info!("Reading program from standard input");
            let mut source = String::new();
            io::stdin().read_to_string(&mut source)?;
            Ok(source)
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = resolve_config(&cli)?;
    init_logger(&config)?;
    debug!("Effective configuration: {:?}", config);

    let source = read_program(cli.file.as_deref())?;
    simply_core::execute(&source, &config.run, io::stdin().lock(), io::stdout().lock())?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        println!("{}", e);
        error!("{}", e);
        std::process::exit(1);
    }
}
