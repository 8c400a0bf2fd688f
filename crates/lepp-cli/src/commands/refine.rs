//! lepp refine command - refine a mesh and save the result.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use lepp_refine::{ImproveReport, ImproveStatus, Model, RefineParams};
use serde::Serialize;

use crate::commands::build_engine;
use crate::{Cli, EngineKind, OutputFormat, output};

/// Options gathered from the command line.
pub struct Options<'a> {
    pub angle: Option<f64>,
    pub max_iterations: Option<usize>,
    pub engine: EngineKind,
    pub threads: Option<usize>,
    pub config: Option<&'a Path>,
}

#[derive(Debug, Serialize)]
struct RefineResult {
    input: String,
    output: String,
    engine: String,
    angle_deg: f64,
    input_vertices: usize,
    input_triangles: usize,
    output_vertices: usize,
    output_triangles: usize,
    output_edges: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_angle_before: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_angle_after: Option<f64>,
    report: ImproveReport,
}

/// Parameters from the config file, if any, with command-line overrides applied.
fn resolve_params(options: &Options<'_>) -> Result<RefineParams> {
    let mut params = match options.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            serde_json::from_str::<RefineParams>(&text)
                .with_context(|| format!("Failed to parse config {:?}", path))?
        }
        None => RefineParams::default(),
    };
    if let Some(angle) = options.angle {
        params.angle_deg = angle;
    }
    if let Some(max_iterations) = options.max_iterations {
        params.max_iterations = max_iterations;
    }
    params.validate()?;
    Ok(params)
}

pub fn run(input: &Path, output_path: &Path, options: &Options<'_>, cli: &Cli) -> Result<()> {
    let params = resolve_params(options)?;

    let mut model =
        Model::load(input).with_context(|| format!("Failed to load mesh from {:?}", input))?;
    model.set_params(params.clone())?;
    model.set_engine(build_engine(options.engine, options.threads, cli.quiet)?);

    let input_vertices = model.vertices().len();
    let input_triangles = model.triangles().len();
    let min_angle_before = model.topology().min_angle_deg();

    output::info(
        &format!(
            "Refining {} triangles to a {} deg minimum angle ({})",
            input_triangles,
            params.angle_deg,
            model.engine_name()
        ),
        cli.format,
        cli.quiet,
    );

    let report = model
        .refine(params.angle_deg)
        .with_context(|| "Refinement failed")?;

    model
        .save(output_path)
        .with_context(|| format!("Failed to save refined mesh to {:?}", output_path))?;

    let result = RefineResult {
        input: input.display().to_string(),
        output: output_path.display().to_string(),
        engine: model.engine_name().to_string(),
        angle_deg: params.angle_deg,
        input_vertices,
        input_triangles,
        output_vertices: model.vertices().len(),
        output_triangles: model.triangles().len(),
        output_edges: model.edges().len(),
        min_angle_before,
        min_angle_after: model.topology().min_angle_deg(),
        report,
    };

    match cli.format {
        OutputFormat::Json => {
            output::print(&result, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                output::success(
                    &format!("Refined mesh saved to {}", output_path.display()),
                    cli.format,
                    cli.quiet,
                );
                println!(
                    "  {}: {} → {} vertices",
                    "Vertices".cyan(),
                    result.input_vertices,
                    result.output_vertices
                );
                println!(
                    "  {}: {} → {} triangles",
                    "Triangles".cyan(),
                    result.input_triangles,
                    result.output_triangles
                );
                if let (Some(before), Some(after)) = (result.min_angle_before, result.min_angle_after) {
                    println!("  {}: {:.3} → {:.3} deg", "Min angle".cyan(), before, after);
                }
                println!(
                    "  {}: {} insertions in {} iterations ({})",
                    "Refinement".green(),
                    result.report.insertions,
                    result.report.iterations,
                    result.report.status
                );
            }
        }
    }

    if result.report.status == ImproveStatus::IterationLimit {
        output::warn(
            &format!(
                "stopped at the iteration cap ({}); interior terminal edges remain",
                params.max_iterations
            ),
            cli.quiet,
        );
    }

    Ok(())
}
