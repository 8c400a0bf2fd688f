//! Mesh file I/O (OFF format).
//!
//! Reads and writes ASCII Object File Format meshes with triangular faces:
//!
//! ```text
//! OFF
//! # comment
//! 4 2 5
//! 0 0 0
//! 4 0 0
//! 2 0.5 0
//! 2 -0.5 0
//! 3 0 1 2
//! 3 0 3 1
//! ```
//!
//! The edge count in the header is ignored on input; edges are rebuilt from
//! the faces.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::error::{RefineError, RefineResult};
use crate::topology::Topology;
use crate::tracing_ext::log_io_operation;
use crate::types::Vertex;

/// Header counts are untrusted; larger inputs grow the buffers as they are read.
const PREALLOCATE_LIMIT: usize = 1 << 16;

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Off,
}

impl MeshFormat {
    /// Detect format from file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .and_then(|ext| match ext.as_str() {
                "off" => Some(MeshFormat::Off),
                _ => None,
            })
    }
}

fn detect_format(path: &Path) -> RefineResult<MeshFormat> {
    MeshFormat::from_path(path).ok_or_else(|| RefineError::UnsupportedFormat {
        extension: path.extension().and_then(|e| e.to_str()).map(String::from),
    })
}

/// Load a topology from a file, detecting the format from its extension.
pub fn load_topology(path: &Path) -> RefineResult<Topology> {
    let format = detect_format(path)?;
    info!("Loading mesh from {:?} (format: {:?})", path, format);

    let result = match format {
        MeshFormat::Off => load_off(path),
    };
    log_io_operation("load", path, result.is_ok());
    result
}

/// Save a topology to a file, detecting the format from its extension.
pub fn save_topology(topology: &Topology, path: &Path) -> RefineResult<()> {
    let format = detect_format(path)?;
    let result = match format {
        MeshFormat::Off => save_off(topology, path),
    };
    log_io_operation("save", path, result.is_ok());
    result
}

/// Load an OFF file.
pub fn load_off(path: &Path) -> RefineResult<Topology> {
    let file = File::open(path).map_err(|e| RefineError::io_read(path, e))?;
    read_off(BufReader::new(file), path)
}

/// Parse OFF data from a reader. `path` is only used in error messages.
pub fn read_off<R: BufRead>(reader: R, path: &Path) -> RefineResult<Topology> {
    let mut lines = OffLines::new(reader, path);

    let (line_no, header) = lines
        .next_content()?
        .ok_or_else(|| RefineError::parse_error(path, None, "file is empty"))?;
    let mut header_tokens = header.split_whitespace();
    if header_tokens.next() != Some("OFF") {
        return Err(RefineError::parse_error(
            path,
            Some(line_no),
            "missing OFF header",
        ));
    }

    // Counts may share the header line.
    let rest: Vec<&str> = header_tokens.collect();
    let (counts_line, counts) = if rest.is_empty() {
        let (n, line) = lines
            .next_content()?
            .ok_or_else(|| RefineError::parse_error(path, None, "missing element counts"))?;
        (n, parse_counts(&line, path, n)?)
    } else {
        (line_no, parse_counts(&rest.join(" "), path, line_no)?)
    };
    let (vertex_count, face_count) = counts;
    debug!(
        line = counts_line,
        vertex_count, face_count, "Parsed OFF header"
    );

    let mut vertices = Vec::with_capacity(vertex_count.min(PREALLOCATE_LIMIT));
    for _ in 0..vertex_count {
        let (n, line) = lines.next_content()?.ok_or_else(|| {
            RefineError::parse_error(
                path,
                None,
                format!("expected {vertex_count} vertices, found {}", vertices.len()),
            )
        })?;
        let coords: Vec<f64> = line
            .split_whitespace()
            .take(3)
            .map(|t| t.parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|e| RefineError::parse_error(path, Some(n), format!("bad coordinate: {e}")))?;
        if coords.len() < 3 {
            return Err(RefineError::parse_error(
                path,
                Some(n),
                "vertex needs three coordinates",
            ));
        }
        vertices.push(Vertex::from_coords(coords[0], coords[1], coords[2]));
    }

    let mut faces = Vec::with_capacity(face_count.min(PREALLOCATE_LIMIT));
    for _ in 0..face_count {
        let (n, line) = lines.next_content()?.ok_or_else(|| {
            RefineError::parse_error(
                path,
                None,
                format!("expected {face_count} faces, found {}", faces.len()),
            )
        })?;
        faces.push(parse_face(&line, path, n)?);
    }

    Topology::from_indexed(vertices, &faces)
}

fn parse_counts(line: &str, path: &Path, line_no: usize) -> RefineResult<(usize, usize)> {
    let counts: Vec<usize> = line
        .split_whitespace()
        .map(|t| t.parse::<usize>())
        .collect::<Result<_, _>>()
        .map_err(|e| RefineError::parse_error(path, Some(line_no), format!("bad count: {e}")))?;
    match counts.as_slice() {
        [v, f, ..] => Ok((*v, *f)),
        _ => Err(RefineError::parse_error(
            path,
            Some(line_no),
            "expected vertex and face counts",
        )),
    }
}

fn parse_face(line: &str, path: &Path, line_no: usize) -> RefineResult<[u32; 3]> {
    let mut tokens = line.split_whitespace();
    let arity: usize = tokens
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| RefineError::parse_error(path, Some(line_no), "bad face arity"))?;
    if arity != 3 {
        return Err(RefineError::parse_error(
            path,
            Some(line_no),
            format!("face has {arity} vertices, only triangles are supported"),
        ));
    }

    let mut face = [0u32; 3];
    for slot in &mut face {
        *slot = tokens
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| RefineError::parse_error(path, Some(line_no), "bad vertex index"))?;
    }
    Ok(face)
}

/// Content lines of an OFF file with comments and blank lines removed.
struct OffLines<'a, R> {
    lines: std::io::Lines<R>,
    line_no: usize,
    path: &'a Path,
}

impl<'a, R: BufRead> OffLines<'a, R> {
    fn new(reader: R, path: &'a Path) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            path,
        }
    }

    /// Next non-empty line with any `#` comment stripped, and its 1-based number.
    fn next_content(&mut self) -> RefineResult<Option<(usize, String)>> {
        for line in self.lines.by_ref() {
            self.line_no += 1;
            let line = line.map_err(|e| RefineError::io_read(self.path, e))?;
            let content = line.split('#').next().unwrap_or("").trim();
            if !content.is_empty() {
                return Ok(Some((self.line_no, content.to_string())));
            }
        }
        Ok(None)
    }
}

/// Save an OFF file.
pub fn save_off(topology: &Topology, path: &Path) -> RefineResult<()> {
    info!("Saving mesh to {:?} (OFF format)", path);
    let file = File::create(path).map_err(|e| RefineError::io_write(path, e))?;
    let mut writer = BufWriter::new(file);
    write_off(topology, &mut writer).map_err(|e| RefineError::io_write(path, e))?;
    writer.flush().map_err(|e| RefineError::io_write(path, e))
}

/// Write OFF data. Coordinates use the shortest representation that reads back exactly.
pub fn write_off<W: Write>(topology: &Topology, writer: &mut W) -> std::io::Result<()> {
    writeln!(writer, "OFF")?;
    writeln!(
        writer,
        "{} {} {}",
        topology.vertex_count(),
        topology.triangle_count(),
        topology.edge_count()
    )?;
    for vertex in topology.vertices() {
        let p = vertex.position;
        writeln!(writer, "{} {} {}", p.x, p.y, p.z)?;
    }
    for triangle in topology.triangles() {
        writeln!(
            writer,
            "3 {} {} {}",
            triangle.v[0], triangle.v[1], triangle.v[2]
        )?;
    }
    Ok(())
}
