//! Debug tool: print every number token of a drawing with its group

use drawing_dimensions::report::render_token_table;
use drawing_dimensions::{analyze_drawing, AnalysisConfig};
use std::env;
use std::process;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let Some(path) = args.get(1) else {
        eprintln!("Usage: debug_tokens <pdf_file>");
        process::exit(1);
    };

    let analysis = match analyze_drawing(path, &AnalysisConfig::default()) {
        Ok(analysis) => analysis,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    print!("{}", render_token_table(&analysis.token_rows()));
    println!();

    println!("Groups:");
    for group in &analysis.groups.groups {
        let values: Vec<String> = group
            .members
            .iter()
            .filter_map(|&i| analysis.tokens.get(i))
            .map(|t| t.token.value.to_string())
            .collect();
        println!(
            "  {} score={} mix={} [{}]",
            group.label(),
            group.score,
            group.has_orientation_mix,
            values.join(", ")
        );
    }
    println!();

    println!(
        "Dimension font: {}",
        analysis.dimension_font.as_deref().unwrap_or("-")
    );
    println!("Source: {}", analysis.source_label());
    println!("Line support: {:.2}", analysis.line_support);
    println!(
        "Result: L={} W={} H={} ({})",
        analysis.result.length, analysis.result.width, analysis.result.height, analysis.status
    );
}
