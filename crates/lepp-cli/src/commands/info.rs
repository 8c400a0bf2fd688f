//! lepp info command - display mesh statistics.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use lepp_refine::Topology;
use serde::Serialize;

use crate::{Cli, OutputFormat, output};

#[derive(Debug, Serialize)]
struct MeshInfo {
    path: String,
    vertices: usize,
    edges: usize,
    triangles: usize,
    boundary_edges: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_angle_deg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bounds: Option<BoundsInfo>,
}

#[derive(Debug, Serialize)]
struct BoundsInfo {
    min: [f64; 3],
    max: [f64; 3],
    dimensions: [f64; 3],
}

pub fn run(input: &Path, cli: &Cli) -> Result<()> {
    let topology =
        Topology::load(input).with_context(|| format!("Failed to load mesh from {:?}", input))?;

    let bounds = topology.bounds().map(|b| BoundsInfo {
        min: [b.min.x, b.min.y, b.min.z],
        max: [b.max.x, b.max.y, b.max.z],
        dimensions: b.dimensions(),
    });

    let info = MeshInfo {
        path: input.display().to_string(),
        vertices: topology.vertex_count(),
        edges: topology.edge_count(),
        triangles: topology.triangle_count(),
        boundary_edges: topology.edges().iter().filter(|e| e.is_boundary()).count(),
        min_angle_deg: topology.min_angle_deg(),
        bounds,
    };

    match cli.format {
        OutputFormat::Json => {
            output::print(&info, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", "Mesh Information".bold().underline());
                println!("  {}: {}", "File".cyan(), input.display());
                println!("  {}: {}", "Vertices".cyan(), info.vertices);
                println!("  {}: {}", "Edges".cyan(), info.edges);
                println!("  {}: {}", "Triangles".cyan(), info.triangles);
                println!("  {}: {}", "Boundary edges".cyan(), info.boundary_edges);

                if let Some(angle) = info.min_angle_deg {
                    println!("  {}: {:.3} deg", "Min angle".cyan(), angle);
                }
                if let Some(ref b) = info.bounds {
                    println!(
                        "  {}: {:.3} x {:.3} x {:.3}",
                        "Dimensions".cyan(),
                        b.dimensions[0],
                        b.dimensions[1],
                        b.dimensions[2]
                    );
                    println!(
                        "  {}: ({:.3}, {:.3}, {:.3})",
                        "Min bounds".cyan(),
                        b.min[0],
                        b.min[1],
                        b.min[2]
                    );
                    println!(
                        "  {}: ({:.3}, {:.3}, {:.3})",
                        "Max bounds".cyan(),
                        b.max[0],
                        b.max[1],
                        b.max[2]
                    );
                }
            }
        }
    }

    Ok(())
}
