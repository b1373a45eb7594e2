mod content;
mod report;

use std::{error::Error, fs, path::PathBuf, process};

use clap::{ArgAction::Set, Parser};
use tracing::{event, span, Level};
use tracing_subscriber::prelude::*;

use assemble::Project;
use content::ContentGenerator;
use report::Reporter;
use ucode::{Content, Report};

const AUTHOR: &str = "John Erickson <john.t.erickson@gmail.com>";

/// Compile the microcode of a CPU into control store ROM images
#[derive(Parser, Debug)]
#[clap(author = AUTHOR, version, about, long_about = None)]
struct Cli {
    /// Directory holding project.txt, input_pins.txt, output_pins.txt and code.txt
    #[clap(action = Set)]
    project: PathBuf,

    /// Directory the reports and images are written to [default: <PROJECT>/target]
    #[clap(action = Set, short = 't', long)]
    target: Option<PathBuf>,
}

fn build(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let span = span!(Level::ERROR, "build", project = ?cli.project);
    let _enter = span.enter();

    let project = Project::load(&cli.project)?;
    let microcode = project.compile()?;

    let target = cli.target.clone().unwrap_or_else(|| cli.project.join("target"));
    fs::create_dir_all(&target)?;
    event!(Level::INFO, target = %target.display(), "writing output");

    let mut reporter = Reporter::new(&target);
    microcode.report(&mut reporter);
    reporter.close()?;

    let mut generator = ContentGenerator::create(&target, &microcode)?;
    microcode.generate(&mut generator)?;
    generator.close()?;

    event!(
        Level::INFO,
        "{} version {}: {} instructions, {} opcodes free",
        project.global().name(),
        project.global().version(),
        microcode.code_map().instructions().len(),
        microcode.code_map().all_valid().iter().filter(|c| microcode.code_map().is_unused(**c)).count());
    Ok(())
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    // RUST_LOG selects which trace messages get printed.
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let filter_layer = match tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
    {
        Err(e) => {
            return Err(Box::new(e));
        }
        Ok(layer) => layer,
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    build(&cli)
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{}", e);
        process::exit(1);
    }
}
