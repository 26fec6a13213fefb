//! Command-line inspector for Source Map v3 files: decode, query, and
//! compose maps from the shell.

use std::fs;
use std::path::PathBuf;
use std::process::exit;

use clap::{Parser, Subcommand};
use colored::*;
use srcmap_core::facade::{PositionResult, PositionResultWithCode};
use srcmap_core::store::Line;
use srcmap_core::{Bias, CodeContextOptions, SourceMap};

#[derive(Parser)]
#[command(name = "srcmap")]
#[command(author, version, about = "Inspect, query, and compose Source Map v3 files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a source map and list its segments
    Decode { file: PathBuf },
    /// Look up a position in a source map
    Lookup {
        file: PathBuf,
        /// Generated position as LINE:COLUMN
        #[arg(long, value_name = "LINE:COLUMN")]
        generated: Option<String>,
        /// Original position as LINE:COLUMN:SOURCE_INDEX
        #[arg(long, value_name = "LINE:COLUMN:SOURCE_INDEX")]
        original: Option<String>,
        #[arg(long, value_enum, default_value_t = BiasArg::Exact)]
        bias: BiasArg,
        /// Include a window of surrounding source lines (generated lookups only)
        #[arg(long)]
        code: bool,
        #[arg(long, default_value_t = 2)]
        lines_before: usize,
        #[arg(long, default_value_t = 2)]
        lines_after: usize,
    },
    /// Concatenate one or more source maps onto a base map
    Concat {
        base: PathBuf,
        others: Vec<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Re-emit a source map's canonical JSON form
    Encode {
        file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum BiasArg {
    Exact,
    Floor,
    Ceil,
}

impl From<BiasArg> for Bias {
    fn from(arg: BiasArg) -> Self {
        match arg {
            BiasArg::Exact => Bias::Exact,
            BiasArg::Floor => Bias::Floor,
            BiasArg::Ceil => Bias::Ceil,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    match cli.command {
        Commands::Decode { file } => decode(&file),
        Commands::Lookup {
            file,
            generated,
            original,
            bias,
            code,
            lines_before,
            lines_after,
        } => lookup(&file, generated, original, bias.into(), code, lines_before, lines_after),
        Commands::Concat { base, others, output } => concat(&base, &others, output),
        Commands::Encode { file, output } => encode(&file, output),
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{} {}", "error:".red().bold(), message);
    exit(1);
}

fn read_map(path: &PathBuf) -> SourceMap {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => fail(&format!("cannot read {}: {e}", path.display())),
    };
    match SourceMap::from_json(&text) {
        Ok(map) => map,
        Err(e) => fail(&format!("{}: {e}", path.display())),
    }
}

fn decode(path: &PathBuf) {
    let map = read_map(path);
    println!(
        "{} {} generated line(s), {} source(s), {} name(s)",
        "source map:".cyan().bold(),
        map.generated_line_count(),
        map.sources().len(),
        map.names().len(),
    );

    for (index, line) in map.store().lines().iter().enumerate() {
        let generated_line = index + 1;
        match line {
            Line::Absent => {
                println!("  {} {}", generated_line.to_string().dimmed(), "(absent)".dimmed());
            }
            Line::Present(segments) => {
                for segment in segments {
                    let source_path = map
                        .sources()
                        .get(segment.source_index as usize)
                        .map(String::as_str)
                        .unwrap_or("?");
                    let name = segment
                        .name_index
                        .and_then(|index| map.names().get(index as usize))
                        .map(String::as_str)
                        .unwrap_or("");
                    let suffix = if name.is_empty() { String::new() } else { format!(" ({name})") };
                    println!(
                        "  {}:{} {} {}:{}{}",
                        generated_line,
                        segment.generated_column,
                        "->".dimmed(),
                        source_path,
                        segment.source_line,
                        suffix,
                    );
                }
            }
        }
    }
}

fn parse_pair(value: &str) -> Option<(u32, u32)> {
    let mut parts = value.splitn(2, ':');
    let a = parts.next()?.parse().ok()?;
    let b = parts.next()?.parse().ok()?;
    Some((a, b))
}

fn parse_triple(value: &str) -> Option<(u32, u32, u32)> {
    let mut parts = value.splitn(3, ':');
    let a = parts.next()?.parse().ok()?;
    let b = parts.next()?.parse().ok()?;
    let c = parts.next()?.parse().ok()?;
    Some((a, b, c))
}

fn lookup(
    path: &PathBuf,
    generated: Option<String>,
    original: Option<String>,
    bias: Bias,
    code: bool,
    lines_before: usize,
    lines_after: usize,
) {
    let map = read_map(path);

    match (generated, original) {
        (Some(_), Some(_)) => fail("pass only one of --generated or --original"),
        (None, None) => fail("one of --generated or --original is required"),
        (Some(value), None) => {
            let Some((line, column)) = parse_pair(&value) else {
                fail("--generated expects LINE:COLUMN");
            };
            if code {
                let options = CodeContextOptions { lines_before, lines_after };
                match map.get_by_generated_with_code(line, column, bias, options) {
                    Some(result) => print_with_code(&result),
                    None => fail("no mapping at that position"),
                }
            } else {
                match map.get_by_generated(line, column, bias) {
                    Some(result) => print_position(&result),
                    None => fail("no mapping at that position"),
                }
            }
        }
        (None, Some(value)) => {
            let Some((line, column, source_index)) = parse_triple(&value) else {
                fail("--original expects LINE:COLUMN:SOURCE_INDEX");
            };
            match map.get_by_original(line, column, source_index, bias) {
                Some(result) => print_position(&result),
                None => fail("no mapping at that position"),
            }
        }
    }
}

fn print_position(result: &PositionResult) {
    println!(
        "{} {}:{} {} {}:{} in {}",
        "generated".cyan(),
        result.generated_line,
        result.generated_column,
        "->".dimmed(),
        result.source_line,
        result.source_column,
        result.source_path,
    );
    if let Some(name) = &result.name {
        println!("  {} {}", "name:".dimmed(), name);
    }
}

fn print_with_code(result: &PositionResultWithCode) {
    print_position(&result.position);
    for line in &result.code_context {
        let marker = if line.line_number == result.position.source_line as usize {
            ">".yellow().bold()
        } else {
            " ".normal()
        };
        println!("  {} {:>4} | {}", marker, line.line_number, line.content);
    }
}

fn concat(base: &PathBuf, others: &[PathBuf], output: Option<PathBuf>) {
    let mut base_map = read_map(base);
    let other_maps: Vec<SourceMap> = others.iter().map(read_map).collect();
    let refs: Vec<&SourceMap> = other_maps.iter().collect();

    if let Err(e) = base_map.concat(&refs) {
        fail(&format!("concat failed: {e}"));
    }

    let json = match base_map.to_json_pretty() {
        Ok(json) => json,
        Err(e) => fail(&format!("cannot serialize result: {e}")),
    };
    write_output(output, &json);
    eprintln!(
        "{} {} generated line(s)",
        "composed:".green().bold(),
        base_map.generated_line_count()
    );
}

fn encode(path: &PathBuf, output: Option<PathBuf>) {
    let map = read_map(path);
    let json = match map.to_json_pretty() {
        Ok(json) => json,
        Err(e) => fail(&format!("cannot serialize: {e}")),
    };
    write_output(output, &json);
}

fn write_output(output: Option<PathBuf>, content: &str) {
    match output {
        Some(path) => {
            if let Err(e) = fs::write(&path, content) {
                fail(&format!("cannot write {}: {e}", path.display()));
            }
            eprintln!("{} {}", "wrote:".green().bold(), path.display());
        }
        None => println!("{content}"),
    }
}
