//! Command line front end: reads filter list text, writes the content
//! blocker JSON rule set to standard output.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use ab2cb::compiler::CompileOptions;
use ab2cb::optimizer::MergePolicy;
use ab2cb::rules::to_json;
use ab2cb::FilterSet;

#[derive(Parser)]
#[command(name = "ab2cb")]
#[command(about = "Convert Adblock Plus filter lists into WebKit content blocker rules")]
struct Cli {
    /// Filter list files; standard input when none are given
    input: Vec<PathBuf>,

    /// When to merge near-duplicate rules
    #[arg(long, value_enum, default_value_t = MergeArg::Auto)]
    merge: MergeArg,

    /// Pretty-print the generated JSON
    #[arg(long)]
    pretty: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum MergeArg {
    Off,
    Auto,
    All,
}

impl From<MergeArg> for MergePolicy {
    fn from(merge: MergeArg) -> MergePolicy {
        match merge {
            MergeArg::Off => MergePolicy::Off,
            MergeArg::Auto => MergePolicy::Auto,
            MergeArg::All => MergePolicy::All,
        }
    }
}

fn read_lines(reader: impl Read, filters: &mut FilterSet) -> io::Result<()> {
    for line in BufReader::new(reader).lines() {
        let _ = filters.add_filter(&line?);
    }
    Ok(())
}

fn run(cli: Cli) -> io::Result<()> {
    let mut filters = FilterSet::new();

    if cli.input.is_empty() {
        read_lines(io::stdin().lock(), &mut filters)?;
    } else {
        for path in &cli.input {
            let file = File::open(path).map_err(|e| {
                io::Error::new(e.kind(), format!("{}: {}", path.display(), e))
            })?;
            read_lines(file, &mut filters)?;
        }
    }

    let rules = filters.into_content_blocking(CompileOptions {
        merge: cli.merge.into(),
    });

    let rendered = to_json(&rules, cli.pretty)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(rendered.as_bytes())?;
    stdout.write_all(b"\n")?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
