//! lepp detect command - report bad triangles and terminal edges.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use lepp_refine::{Topology, check_angle};
use serde::Serialize;

use crate::commands::build_engine;
use crate::{Cli, EngineKind, OutputFormat, output};

#[derive(Debug, Serialize)]
struct DetectResult {
    path: String,
    engine: String,
    angle_deg: f64,
    triangles: usize,
    bad_triangles: usize,
    terminal_edges: usize,
    border_terminal_edges: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_angle_deg: Option<f64>,
}

pub fn run(input: &Path, angle: f64, engine: EngineKind, cli: &Cli) -> Result<()> {
    check_angle(angle)?;
    let mut topology =
        Topology::load(input).with_context(|| format!("Failed to load mesh from {:?}", input))?;
    topology.validate()?;

    let mut engine = build_engine(engine, None, cli.quiet)?;
    let bad = engine.detect_bad(angle, &mut topology)?;
    let scan = engine.detect_terminal(&mut topology)?;

    let result = DetectResult {
        path: input.display().to_string(),
        engine: engine.name().to_string(),
        angle_deg: angle,
        triangles: topology.triangle_count(),
        bad_triangles: bad,
        terminal_edges: scan.terminal_edges,
        border_terminal_edges: scan.border_edges,
        min_angle_deg: topology.min_angle_deg(),
    };

    match cli.format {
        OutputFormat::Json => {
            output::print(&result, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", "Quality Report".bold().underline());
                println!("  {}: {}", "File".cyan(), input.display());
                println!("  {}: {}", "Engine".cyan(), result.engine);
                println!("  {}: {} deg", "Tolerance".cyan(), result.angle_deg);
                if let Some(min) = result.min_angle_deg {
                    println!("  {}: {:.3} deg", "Min angle".cyan(), min);
                }

                let bad_line = format!("{} of {}", result.bad_triangles, result.triangles);
                if result.bad_triangles == 0 {
                    println!("  {}: {}", "Bad triangles".cyan(), bad_line.green());
                } else {
                    println!("  {}: {}", "Bad triangles".cyan(), bad_line.yellow());
                }
                println!(
                    "  {}: {} ({} on the boundary)",
                    "Terminal edges".cyan(),
                    result.terminal_edges,
                    result.border_terminal_edges
                );
                if scan.has_non_border {
                    output::info("Run `lepp refine` to split interior terminal edges", cli.format, cli.quiet);
                }
            }
        }
    }

    Ok(())
}
