use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::Parser;
use log::{warn, LevelFilter};
use simple_logger::SimpleLogger;

use midigen_core::model::generator::{MidiGenerator, SourceReport};

#[derive(Debug, Parser)]
#[command(
    name = "midigen",
    version,
    about = "Builds a Markov chain from MIDI files and generates a new one"
)]
struct Cli {
    /// Input .mid files used to build the model
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Number of transitions to walk when generating
    #[arg(long, default_value_t = 1000)]
    iterations: usize,

    /// Output .mid path
    #[arg(short, long, default_value = "markov.mid")]
    out: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    // INFO by default, RUST_LOG overrides
    SimpleLogger::new().with_level(LevelFilter::Info).env().init()?;

    // Open every input up front. A file that cannot be opened is a failed
    // source like any other: skipped, reported, never fatal.
    let mut sources = Vec::new();
    let mut failures = Vec::new();
    for (index, path) in cli.inputs.iter().enumerate() {
        let name = path.display().to_string();
        match File::open(path) {
            Ok(file) => sources.push((name, file)),
            Err(error) => {
                warn!("skipping {name}: {error}");
                failures.push((index, SourceReport { source: name, result: Err(error.into()) }));
            }
        }
    }

    // One thread per readable source, merged into a single model
    let mut generator = MidiGenerator::new();
    let mut reports = generator.ingest_all(sources);

    // Splice the open failures back in so the summary follows the
    // command-line order
    for (index, report) in failures {
        reports.insert(index, report);
    }

    for report in &reports {
        match &report.result {
            Ok(count) => println!("{}: {count} events", report.source),
            Err(error) => println!("{}: skipped ({error})", report.source),
        }
    }

    if reports.iter().all(|report| report.result.is_err()) {
        return Err("no usable input source, nothing to generate from".into());
    }

    let file = File::create(&cli.out)?;
    let mut writer = BufWriter::new(file);
    let generation = generator.write_smf(&mut writer, cli.iterations)?;
    writer.flush()?;

    println!(
        "wrote {} events to {} ({})",
        generation.events.len(),
        cli.out.display(),
        if generation.is_complete() { "complete walk" } else { "walk hit a dead end" }
    );

    Ok(())
}
