//! lepp validate command - check handles and cross references.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use lepp_refine::Topology;
use serde::Serialize;

use crate::{Cli, OutputFormat, output};

#[derive(Debug, Serialize)]
struct ValidationResult {
    path: String,
    valid: bool,
    vertices: usize,
    edges: usize,
    triangles: usize,
    non_finite_vertices: usize,
    issues: Vec<String>,
}

pub fn run(input: &Path, cli: &Cli) -> Result<()> {
    let topology =
        Topology::load(input).with_context(|| format!("Failed to load mesh from {:?}", input))?;

    let report = topology.report();
    let result = ValidationResult {
        path: input.display().to_string(),
        valid: report.is_valid(),
        vertices: report.vertex_count,
        edges: report.edge_count,
        triangles: report.triangle_count,
        non_finite_vertices: report.non_finite_vertex_count,
        issues: report.issues,
    };

    match cli.format {
        OutputFormat::Json => {
            output::print(&result, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", "Validation Report".bold().underline());
                println!("  {}: {}", "File".cyan(), input.display());
                println!(
                    "  {}: {} vertices, {} edges, {} triangles",
                    "Size".cyan(),
                    result.vertices,
                    result.edges,
                    result.triangles
                );

                if result.valid {
                    println!("  {}: {}", "Status".cyan(), "Valid".green().bold());
                } else {
                    println!("  {}: {}", "Status".cyan(), "Issues found".red().bold());
                }

                if result.non_finite_vertices > 0 {
                    println!(
                        "  {} {} vertices with non-finite coordinates",
                        "✗".red(),
                        result.non_finite_vertices
                    );
                }
                if !result.issues.is_empty() {
                    println!("\n{}", "Issues:".bold());
                    for issue in &result.issues {
                        println!("  {} {}", "✗".red(), issue);
                    }
                }
            }
        }
    }

    // Exit with error code if invalid
    if !result.valid {
        std::process::exit(1);
    }

    Ok(())
}
