use clap::{Parser, ValueEnum};
use heredity::prelude::*;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// Posterior gene and trait probabilities for every member of a family.
#[derive(Debug, Parser)]
#[command(name = "heredity", version)]
struct Cli {
    /// CSV with columns name,mother,father,trait
    data: PathBuf,

    /// JSON file overriding the built-in probability tables
    #[arg(long, env = "HEREDITY_PROBABILITIES")]
    probabilities: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "text")]
    format: Format,

    /// Worker threads for enumeration (defaults to one per core)
    #[arg(long)]
    threads: Option<usize>,
}

fn write_text<W: Write>(out: &mut W, posteriors: &Posteriors) -> io::Result<()> {
    for posterior in posteriors {
        writeln!(out, "{}:", posterior.name)?;
        writeln!(out, "  Gene:")?;
        for gene in GeneCount::ALL.iter().rev() {
            writeln!(out, "    {}: {:.4}", gene.copies(), posterior.gene.get(*gene))?;
        }
        writeln!(out, "  Trait:")?;
        for has_trait in [true, false].iter() {
            let label = if *has_trait { "True" } else { "False" };
            writeln!(out, "    {}: {:.4}", label, posterior.has_trait.get(*has_trait))?;
        }
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    #[cfg(feature = "parallel")]
    {
        if let Some(threads) = cli.threads {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build_global()?;
        }
    }
    #[cfg(not(feature = "parallel"))]
    {
        if cli.threads.is_some() {
            tracing::warn!("built without the parallel feature, ignoring --threads");
        }
    }

    let probabilities = match &cli.probabilities {
        Some(path) => Probabilities::from_path(path)?,
        None => Probabilities::default(),
    };
    let engine = Engine::new(probabilities)?;

    let family = Family::from_reader(BufReader::new(File::open(&cli.data)?))?;
    let posteriors = engine.infer(&family)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.format {
        Format::Text => write_text(&mut out, &posteriors)?,
        Format::Json => {
            serde_json::to_writer_pretty(&mut out, &posteriors)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
