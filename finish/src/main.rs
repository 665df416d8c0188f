use std::{env, path::Path, process::ExitCode};

use anyhow::Context;
use icloud_finisher::{Config, ExifTool, Finisher, Summary};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Runs every phase in order. `None` means there was nothing left to do.
fn finish(config: Config) -> anyhow::Result<Option<Summary>> {
    let mut finisher = Finisher::new(config)?;

    // exiftool is required, check for it before doing any real work
    let version = ExifTool::version(&finisher.config().exiftool)?;
    info!(%version, "found exiftool");

    // what the previous run already handled
    finisher.load_completed();
    println!("Already done: {}", finisher.summary().already_done);
    println!(
        "Already skipped (from previous errors): {}",
        finisher.summary().previously_skipped
    );

    // read the catalogs first, it is much cheaper than the folder walk
    finisher.scan_catalogs();
    println!("Remaining to process: {}", finisher.remaining());
    if finisher.remaining() == 0 {
        println!("Nothing left to do.");
        return Ok(None);
    }

    // find only the remaining files
    finisher.locate_files();
    finisher
        .write_duplicates()
        .context("failed to write duplicates ledger")?;

    let mut exiftool = ExifTool::spawn(&finisher.config().exiftool)?;
    finisher.process(&mut exiftool);
    exiftool.close();

    finisher
        .write_ledgers()
        .context("failed to write error ledgers")?;

    Ok(Some(finisher.summary().clone()))
}

fn print_summary(summary: &Summary, output: &Path) {
    println!("\nDONE (finish run)");
    println!("Output: {}", output.display());
    println!("Processed: {}", summary.processed);
    println!("Skipped duplicates among remaining: {}", summary.duplicates);
    println!("Missing: {}", summary.missing);
    println!("Bad date: {}", summary.bad_date);
    println!("Exiftool failed: {}", summary.stamp_failed);

    // print as json using serde_json
    match serde_json::to_string_pretty(summary) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("could not serialise summary: {e}"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let root = match env::current_dir().and_then(|dir| dir.canonicalize()) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("could not resolve working directory: {e}");
            return ExitCode::FAILURE;
        }
    };
    let config = Config::new(root);
    let output = config.finish_root();

    // the run itself is blocking; keep this task free to notice ctrl-c
    let job = tokio::task::spawn_blocking(move || finish(config));

    tokio::select! {
        result = job => match result {
            Ok(Ok(Some(summary))) => {
                print_summary(&summary, &output);
                ExitCode::SUCCESS
            }
            Ok(Ok(None)) => ExitCode::SUCCESS,
            Ok(Err(e)) => {
                eprintln!("{e:#}");
                ExitCode::FAILURE
            }
            Err(e) => {
                eprintln!("finishing run did not complete: {e}");
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            println!("\nInterrupted.");
            // exit now rather than wait on the blocking task
            std::process::exit(130);
        }
    }
}
