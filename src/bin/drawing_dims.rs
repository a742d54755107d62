//! CLI tool: read Length, Width, Height and keyword tags from drawing PDFs

use drawing_dimensions::report::render_table;
use drawing_dimensions::{process_drawings, AnalysisConfig, Status};
use std::env;
use std::process;
use std::time::Instant;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut config = AnalysisConfig::default();
    let mut json_output = false;
    let mut files: Vec<&str> = Vec::new();

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--json" => json_output = true,
            "--grain" => config.use_grain_hint = true,
            "--dimension-font-only" => config.restrict_to_dimension_font = true,
            flag if flag.starts_with("--") => {
                eprintln!("Unknown option: {}", flag);
                process::exit(1);
            }
            file => files.push(file),
        }
    }

    if files.is_empty() {
        eprintln!(
            "Usage: {} <pdf_file>... [--json] [--grain] [--dimension-font-only]",
            args.first().map(String::as_str).unwrap_or("drawing-dims")
        );
        eprintln!();
        eprintln!("Reads the dimensions of each drawing from its first page.");
        eprintln!("  --json                 one JSON array of records");
        eprintln!("  --grain                let a GRAIN marker pick the length direction");
        eprintln!("  --dimension-font-only  only group numbers set in the dimension font");
        process::exit(1);
    }

    let start = Instant::now();
    let records = process_drawings(&files, &config);
    let elapsed = start.elapsed();

    if json_output {
        match serde_json::to_string_pretty(&records) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
    } else {
        print!("{}", render_table(&records));
        let recheck = records
            .iter()
            .filter(|r| r.status == Status::Recheck)
            .count();
        eprintln!(
            "{} drawings, {} to recheck, {:.0}ms",
            records.len(),
            recheck,
            elapsed.as_secs_f64() * 1000.0
        );
    }
}
