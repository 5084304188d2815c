use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::cli::OutputFormat;
use crate::consensus::classifier::vote;
use crate::core::frequency::FrequencyTable;
use crate::parsing::blast::parse_hits_file;

#[derive(Args)]
pub struct SubtypeArgs {
    /// Tabular BLAST output (-outfmt 6) of reads against the subtype panel
    #[arg(required = true)]
    pub hits: PathBuf,

    /// Also write the frequency table as CSV (subject,weight)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute subtype subcommand
///
/// # Errors
///
/// Returns an error if the hit file cannot be parsed or the CSV cannot be written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: SubtypeArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let hits = parse_hits_file(&args.hits)
        .with_context(|| format!("Failed to read hits from {}", args.hits.display()))?;
    let table = vote(&hits);

    if verbose {
        eprintln!("{} hits from {} reads", table.hits, table.queries);
    }

    if let Some(path) = &args.output {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        table.write_csv(std::io::BufWriter::new(file))?;
    }

    match format {
        OutputFormat::Text => print_text_table(&table),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&table)?),
        OutputFormat::Tsv => print_tsv_table(&table),
    }

    Ok(())
}

fn print_text_table(table: &FrequencyTable) {
    if table.is_empty() {
        println!("No reads hit the subtype panel.");
        return;
    }

    println!("Subtype votes from {} reads:", table.queries);
    for (i, entry) in table.entries().iter().enumerate() {
        println!("#{} {:<20} {:>6.2}%", i + 1, entry.subject, entry.weight * 100.0);
    }
}

fn print_tsv_table(table: &FrequencyTable) {
    println!("rank\tsubject\tweight");
    for (i, entry) in table.entries().iter().enumerate() {
        println!("{}\t{}\t{:.4}", i + 1, entry.subject, entry.weight);
    }
}
