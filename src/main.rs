use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use fencedfilter::cli::{CliArgs, RunConfig, RunMode};
use fencedfilter::{FilterConfig, IndexRegistry, RuleLocator, ScannerOptions};

fn main() -> Result<()> {
    let args = CliArgs::parse();
    let config = FilterConfig::load();
    fencedfilter::tracing::init(config.log_to_file);

    let run = args.into_run_config(config);
    tracing::debug!("Running with {:?}", run);

    let mut registry = IndexRegistry::new(RuleLocator::from_config(&run.filter, &run.rules_dirs));
    let options = ScannerOptions::from_config(&run.filter);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match &run.mode {
        RunMode::Filter(path) => filter_file(path, &mut out, &mut registry, options)?,
        RunMode::Dump(languages) => {
            for language in languages {
                registry
                    .write_dump(language, &mut out)
                    .context("Failed to write rule dump")?;
            }
        }
        RunMode::SelfTest => fencedfilter::self_test::run(&mut out, &mut registry, &options)
            .context("Failed to write self-test output")?,
        RunMode::Usage => print_usage(&mut out)?,
    }

    out.flush().context("Failed to flush output")?;
    log_summary(&run, &registry);
    Ok(())
}

fn filter_file<W: Write>(
    path: &Path,
    out: &mut W,
    registry: &mut IndexRegistry,
    options: ScannerOptions,
) -> Result<()> {
    let file =
        File::open(path).with_context(|| format!("Unable to open file \"{}\"", path.display()))?;

    fencedfilter::filter(BufReader::new(file), out, registry, options)
        .with_context(|| format!("Failed to filter {}", path.display()))?;
    Ok(())
}

fn print_usage<W: Write>(out: &mut W) -> Result<()> {
    let help = CliArgs::command().render_help();
    write!(out, "{}", help).context("Failed to write usage")?;
    Ok(())
}

fn log_summary(run: &RunConfig, registry: &IndexRegistry) {
    tracing::debug!(
        "Finished {:?}: {} language(s) requested",
        run.mode,
        registry.len()
    );
}
