//! Error types for refinement operations with rich diagnostics.
//!
//! Every error carries a machine-readable code in the format `LEPP-XXXX`:
//! - `LEPP-1xxx`: I/O errors (file reading, writing, parsing)
//! - `LEPP-2xxx`: Input validation errors (angle, parameters, topology handles)
//! - `LEPP-3xxx`: Compute backend errors (device, kernel build, dispatch)
//! - `LEPP-9xxx`: Internal invariant violations (bugs in surgery bookkeeping)
//!
//! Input validation and backend errors are recoverable: the topology is left
//! as it was before the failing phase. Internal invariant violations indicate a
//! programming error and are reported through [`RefineError::is_recoverable`].
//!
//! # Example
//!
//! ```
//! use lepp_refine::{ErrorCode, RefineError};
//!
//! let err = RefineError::invalid_angle(200.0);
//! assert_eq!(err.code(), ErrorCode::InvalidAngle);
//! assert_eq!(err.code().as_str(), "LEPP-2001");
//! ```

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for refinement operations.
pub type RefineResult<T> = Result<T, RefineError>;

/// Machine-readable error codes for refinement operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // I/O errors (1xxx)
    /// LEPP-1001: Failed to read file
    IoRead = 1001,
    /// LEPP-1002: Failed to write file
    IoWrite = 1002,
    /// LEPP-1003: Failed to parse file format
    ParseError = 1003,
    /// LEPP-1004: Unsupported file format
    UnsupportedFormat = 1004,

    // Validation errors (2xxx)
    /// LEPP-2001: Tolerance angle outside [0, 180)
    InvalidAngle = 2001,
    /// LEPP-2002: Invalid parameter value
    InvalidParameter = 2002,
    /// LEPP-2003: Mesh has no vertices or faces
    EmptyMesh = 2003,
    /// LEPP-2004: Face references invalid vertex index
    InvalidVertexIndex = 2004,
    /// LEPP-2005: Face repeats a vertex
    DegenerateFace = 2005,
    /// LEPP-2006: Edge shared by more than two faces
    NonManifoldEdge = 2006,
    /// LEPP-2007: Edge or triangle handle out of range
    HandleOutOfRange = 2007,
    /// LEPP-2008: Cross references between edges and triangles disagree
    InconsistentTopology = 2008,

    // Backend errors (3xxx)
    /// LEPP-3001: Compute backend failed
    Backend = 3001,

    // Internal errors (9xxx)
    /// LEPP-9001: Internal invariant violated
    InvariantViolation = 9001,
}

impl ErrorCode {
    /// Returns the error code as a string in the format `LEPP-XXXX`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::IoRead => "LEPP-1001",
            ErrorCode::IoWrite => "LEPP-1002",
            ErrorCode::ParseError => "LEPP-1003",
            ErrorCode::UnsupportedFormat => "LEPP-1004",
            ErrorCode::InvalidAngle => "LEPP-2001",
            ErrorCode::InvalidParameter => "LEPP-2002",
            ErrorCode::EmptyMesh => "LEPP-2003",
            ErrorCode::InvalidVertexIndex => "LEPP-2004",
            ErrorCode::DegenerateFace => "LEPP-2005",
            ErrorCode::NonManifoldEdge => "LEPP-2006",
            ErrorCode::HandleOutOfRange => "LEPP-2007",
            ErrorCode::InconsistentTopology => "LEPP-2008",
            ErrorCode::Backend => "LEPP-3001",
            ErrorCode::InvariantViolation => "LEPP-9001",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recovery suggestions for refinement errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Check the source mesh or file for issues.
    CheckSourceMesh { checks: Vec<String> },
    /// Adjust parameters for the operation.
    AdjustParameters { parameters: Vec<(String, String)> },
    /// Switch to another refinement engine.
    UseDifferentEngine { suggested: Vec<String> },
    /// The failure is a bug and should be reported with the input mesh.
    ReportBug,
    /// No automatic recovery available.
    None,
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoverySuggestion::CheckSourceMesh { checks } => {
                write!(f, "Check the source mesh for: {}", checks.join(", "))
            }
            RecoverySuggestion::AdjustParameters { parameters } => {
                let params: Vec<String> = parameters
                    .iter()
                    .map(|(k, v)| format!("{} = {}", k, v))
                    .collect();
                write!(f, "Try adjusting: {}", params.join(", "))
            }
            RecoverySuggestion::UseDifferentEngine { suggested } => {
                write!(f, "Try a different engine: {}", suggested.join(", "))
            }
            RecoverySuggestion::ReportBug => {
                write!(f, "This is an internal error; please report it with the input mesh")
            }
            RecoverySuggestion::None => {
                write!(f, "No automatic recovery available")
            }
        }
    }
}

/// Location information for refinement errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyLocation {
    /// Error at a specific vertex.
    Vertex { index: usize },
    /// Error at a specific triangle.
    Triangle { index: usize },
    /// Error at a specific edge.
    Edge { index: usize },
    /// Error between two vertices (loader edge key).
    VertexPair { vertex_a: u32, vertex_b: u32 },
    /// Error in a file, optionally at a line.
    File { path: PathBuf, line: Option<usize> },
}

impl std::fmt::Display for TopologyLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopologyLocation::Vertex { index } => write!(f, "vertex {}", index),
            TopologyLocation::Triangle { index } => write!(f, "triangle {}", index),
            TopologyLocation::Edge { index } => write!(f, "edge {}", index),
            TopologyLocation::VertexPair { vertex_a, vertex_b } => {
                write!(f, "edge between vertices {} and {}", vertex_a, vertex_b)
            }
            TopologyLocation::File { path, line } => match line {
                Some(l) => write!(f, "{}:{}", path.display(), l),
                None => write!(f, "{}", path.display()),
            },
        }
    }
}

/// The kind of arena entity that owns an out-of-range handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Triangle,
    Edge,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Triangle => write!(f, "triangle"),
            EntityKind::Edge => write!(f, "edge"),
        }
    }
}

/// Errors that can occur during refinement operations.
#[derive(Debug, Error, Diagnostic)]
pub enum RefineError {
    /// Error reading from a file.
    #[error("failed to read mesh from {path}")]
    #[diagnostic(
        code(lepp::io::read),
        help("Check that the file exists and is readable. Try: ls -la {}", path.display())
    )]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error writing to a file.
    #[error("failed to write mesh to {path}")]
    #[diagnostic(
        code(lepp::io::write),
        help("Check that the directory exists and is writable")
    )]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error parsing a mesh file.
    #[error("failed to parse mesh from {path}: {details}")]
    #[diagnostic(
        code(lepp::parse::error),
        help("The file must be an OFF file with triangular faces.")
    )]
    ParseError {
        path: PathBuf,
        line: Option<usize>,
        details: String,
    },

    /// Unsupported file format.
    #[error("unsupported mesh format: {extension:?}")]
    #[diagnostic(code(lepp::format::unsupported), help("Supported formats: OFF"))]
    UnsupportedFormat { extension: Option<String> },

    /// Tolerance angle outside `[0, 180)` or not finite.
    #[error("invalid tolerance angle: {angle} degrees (must be in [0, 180))")]
    #[diagnostic(
        code(lepp::validation::angle),
        help("Typical quality bounds are between 20 and 35 degrees.")
    )]
    InvalidAngle { angle: f64 },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    #[diagnostic(code(lepp::validation::parameter))]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: &'static str,
    },

    /// Empty mesh (no vertices or faces).
    #[error("mesh is empty: {details}")]
    #[diagnostic(
        code(lepp::validation::empty),
        help("The mesh must have at least one vertex and one triangle.")
    )]
    EmptyMesh { details: String },

    /// Face references a vertex that does not exist.
    #[error(
        "invalid vertex index: face {face_index} references vertex {vertex_index}, but mesh only has {vertex_count} vertices"
    )]
    #[diagnostic(code(lepp::validation::vertex_index))]
    InvalidVertexIndex {
        face_index: usize,
        vertex_index: u32,
        vertex_count: usize,
    },

    /// Face uses the same vertex more than once.
    #[error("face {face_index} is degenerate (repeats vertex {vertex_index})")]
    #[diagnostic(code(lepp::validation::degenerate))]
    DegenerateFace { face_index: usize, vertex_index: u32 },

    /// Edge shared by more than two faces.
    #[error("edge ({vertex_a}, {vertex_b}) is non-manifold (shared by more than two faces)")]
    #[diagnostic(
        code(lepp::validation::non_manifold),
        help("Lepp refinement needs a manifold planar triangulation.")
    )]
    NonManifoldEdge { vertex_a: u32, vertex_b: u32 },

    /// Edge or triangle handle out of range.
    #[error("{entity} {index} has {field} = {handle}, but only {len} exist")]
    #[diagnostic(
        code(lepp::validation::handle),
        help("The topology arrays were not produced by a consistent loader.")
    )]
    HandleOutOfRange {
        entity: EntityKind,
        index: usize,
        field: &'static str,
        handle: u32,
        len: usize,
    },

    /// Edge/triangle cross references disagree.
    #[error("inconsistent topology at {location}: {details}")]
    #[diagnostic(code(lepp::validation::topology))]
    InconsistentTopology {
        location: TopologyLocation,
        details: String,
    },

    /// Compute backend setup, build, or dispatch failed.
    #[error("{backend} backend failed: {details}")]
    #[diagnostic(
        code(lepp::backend::failed),
        help("The topology was left unchanged. Retry with the sequential engine.")
    )]
    Backend { backend: String, details: String },

    /// Internal invariant violated during a walk or an insertion.
    #[error("internal invariant violated: {details}")]
    #[diagnostic(code(lepp::internal::invariant))]
    InvariantViolation { details: String },
}

impl RefineError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            RefineError::IoRead { .. } => ErrorCode::IoRead,
            RefineError::IoWrite { .. } => ErrorCode::IoWrite,
            RefineError::ParseError { .. } => ErrorCode::ParseError,
            RefineError::UnsupportedFormat { .. } => ErrorCode::UnsupportedFormat,
            RefineError::InvalidAngle { .. } => ErrorCode::InvalidAngle,
            RefineError::InvalidParameter { .. } => ErrorCode::InvalidParameter,
            RefineError::EmptyMesh { .. } => ErrorCode::EmptyMesh,
            RefineError::InvalidVertexIndex { .. } => ErrorCode::InvalidVertexIndex,
            RefineError::DegenerateFace { .. } => ErrorCode::DegenerateFace,
            RefineError::NonManifoldEdge { .. } => ErrorCode::NonManifoldEdge,
            RefineError::HandleOutOfRange { .. } => ErrorCode::HandleOutOfRange,
            RefineError::InconsistentTopology { .. } => ErrorCode::InconsistentTopology,
            RefineError::Backend { .. } => ErrorCode::Backend,
            RefineError::InvariantViolation { .. } => ErrorCode::InvariantViolation,
        }
    }

    /// Whether the caller can keep using the topology after this error.
    ///
    /// Only internal invariant violations are unrecoverable.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, RefineError::InvariantViolation { .. })
    }

    /// Returns a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self {
            RefineError::IoRead { .. } => RecoverySuggestion::CheckSourceMesh {
                checks: vec!["file exists".into(), "file permissions".into()],
            },
            RefineError::IoWrite { .. } => RecoverySuggestion::CheckSourceMesh {
                checks: vec!["directory exists".into(), "write permissions".into()],
            },
            RefineError::ParseError { .. } | RefineError::UnsupportedFormat { .. } => {
                RecoverySuggestion::CheckSourceMesh {
                    checks: vec!["OFF header".into(), "triangular faces".into()],
                }
            }
            RefineError::InvalidAngle { .. } => RecoverySuggestion::AdjustParameters {
                parameters: vec![("angle".into(), "a value in [0, 180)".into())],
            },
            RefineError::InvalidParameter { name, .. } => RecoverySuggestion::AdjustParameters {
                parameters: vec![((*name).into(), "see the parameter documentation".into())],
            },
            RefineError::EmptyMesh { .. }
            | RefineError::InvalidVertexIndex { .. }
            | RefineError::DegenerateFace { .. }
            | RefineError::NonManifoldEdge { .. }
            | RefineError::HandleOutOfRange { .. }
            | RefineError::InconsistentTopology { .. } => RecoverySuggestion::CheckSourceMesh {
                checks: vec![
                    "face indices".into(),
                    "manifold planar triangulation".into(),
                ],
            },
            RefineError::Backend { .. } => RecoverySuggestion::UseDifferentEngine {
                suggested: vec!["sequential".into(), "parallel".into()],
            },
            RefineError::InvariantViolation { .. } => RecoverySuggestion::ReportBug,
        }
    }

    /// Returns location information if available.
    pub fn location(&self) -> Option<TopologyLocation> {
        match self {
            RefineError::IoRead { path, .. } | RefineError::IoWrite { path, .. } => {
                Some(TopologyLocation::File {
                    path: path.clone(),
                    line: None,
                })
            }
            RefineError::ParseError { path, line, .. } => Some(TopologyLocation::File {
                path: path.clone(),
                line: *line,
            }),
            RefineError::InvalidVertexIndex { face_index, .. }
            | RefineError::DegenerateFace { face_index, .. } => {
                Some(TopologyLocation::Triangle { index: *face_index })
            }
            RefineError::NonManifoldEdge { vertex_a, vertex_b } => {
                Some(TopologyLocation::VertexPair {
                    vertex_a: *vertex_a,
                    vertex_b: *vertex_b,
                })
            }
            RefineError::HandleOutOfRange { entity, index, .. } => Some(match entity {
                EntityKind::Triangle => TopologyLocation::Triangle { index: *index },
                EntityKind::Edge => TopologyLocation::Edge { index: *index },
            }),
            RefineError::InconsistentTopology { location, .. } => Some(location.clone()),
            _ => None,
        }
    }

    // Constructor helpers for common error patterns

    /// Create an IoRead error.
    pub fn io_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RefineError::IoRead {
            path: path.into(),
            source,
        }
    }

    /// Create an IoWrite error.
    pub fn io_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RefineError::IoWrite {
            path: path.into(),
            source,
        }
    }

    /// Create a ParseError at an optional line.
    pub fn parse_error(
        path: impl Into<PathBuf>,
        line: Option<usize>,
        details: impl Into<String>,
    ) -> Self {
        RefineError::ParseError {
            path: path.into(),
            line,
            details: details.into(),
        }
    }

    /// Create an InvalidAngle error.
    pub fn invalid_angle(angle: f64) -> Self {
        RefineError::InvalidAngle { angle }
    }

    /// Create an InvalidParameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        RefineError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Create an EmptyMesh error.
    pub fn empty_mesh(details: impl Into<String>) -> Self {
        RefineError::EmptyMesh {
            details: details.into(),
        }
    }

    /// Create an InconsistentTopology error.
    pub fn inconsistent(location: TopologyLocation, details: impl Into<String>) -> Self {
        RefineError::InconsistentTopology {
            location,
            details: details.into(),
        }
    }

    /// Create a Backend error.
    pub fn backend(backend: impl Into<String>, details: impl Into<String>) -> Self {
        RefineError::Backend {
            backend: backend.into(),
            details: details.into(),
        }
    }

    /// Create an InvariantViolation error.
    pub fn invariant(details: impl Into<String>) -> Self {
        RefineError::InvariantViolation {
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = RefineError::invalid_angle(180.0);
        assert_eq!(err.code(), ErrorCode::InvalidAngle);
        assert_eq!(err.code().as_str(), "LEPP-2001");

        let err = RefineError::backend("wgpu", "no adapter");
        assert_eq!(err.code().to_string(), "LEPP-3001");
    }

    #[test]
    fn test_recoverability() {
        assert!(RefineError::invalid_angle(-1.0).is_recoverable());
        assert!(RefineError::backend("rayon", "boom").is_recoverable());
        assert!(!RefineError::invariant("edge lookup failed").is_recoverable());
    }

    #[test]
    fn test_recovery_suggestions() {
        match RefineError::backend("wgpu", "device lost").recovery_suggestion() {
            RecoverySuggestion::UseDifferentEngine { suggested } => {
                assert!(suggested.contains(&"sequential".to_string()));
            }
            other => panic!("Expected UseDifferentEngine suggestion, got {other:?}"),
        }
        assert_eq!(
            RefineError::invariant("x").recovery_suggestion(),
            RecoverySuggestion::ReportBug
        );
    }

    #[test]
    fn test_location_info() {
        let err = RefineError::HandleOutOfRange {
            entity: EntityKind::Edge,
            index: 7,
            field: "tb",
            handle: 99,
            len: 4,
        };
        match err.location() {
            Some(TopologyLocation::Edge { index }) => assert_eq!(index, 7),
            other => panic!("Expected Edge location, got {other:?}"),
        }
    }

    #[test]
    fn test_error_display() {
        let err = RefineError::HandleOutOfRange {
            entity: EntityKind::Triangle,
            index: 3,
            field: "e[1]",
            handle: 42,
            len: 10,
        };
        let display = format!("{}", err);
        assert!(display.contains("triangle 3"));
        assert!(display.contains("42"));
        assert!(display.contains("only 10 exist"));
    }
}
