//! Error, warning, and validation result types for recipe documents.

use thiserror::Error;

use crate::document::{NodeId, RECIPE_VERSION};

/// Top-level error type for recipe operations.
#[derive(Debug, Error)]
pub enum RecipeError {
    /// Document schema version is newer than this build supports.
    /// Import aborts before any state is built.
    #[error("unsupported recipe version {found} (this build supports <= {supported})")]
    Schema { found: u32, supported: u32 },

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecipeError {
    /// Creates a schema error against the current supported version.
    pub fn unsupported_version(found: u32) -> Self {
        RecipeError::Schema {
            found,
            supported: RECIPE_VERSION,
        }
    }
}

/// Error codes for strict document validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// E001: Unsupported document version.
    UnsupportedVersion,
    /// E002: Duplicate node id.
    DuplicateNodeId,
    /// E003: Node references a parent that does not exist.
    MissingParent,
    /// E004: No root node (every node has a parent).
    NoRoot,
    /// E005: More than one root node.
    MultipleRoots,
    /// E006: Node references a material slot with no materials entry.
    MissingMaterial,
    /// E007: Duplicate material slot id.
    DuplicateSlotId,
    /// E008: Generated material is missing its generator parameters.
    MissingGeneratorParams,
    /// E009: Parent chain contains a cycle.
    ParentCycle,
}

impl ErrorCode {
    /// Returns the error code string (e.g., "E001").
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::UnsupportedVersion => "E001",
            ErrorCode::DuplicateNodeId => "E002",
            ErrorCode::MissingParent => "E003",
            ErrorCode::NoRoot => "E004",
            ErrorCode::MultipleRoots => "E005",
            ErrorCode::MissingMaterial => "E006",
            ErrorCode::DuplicateSlotId => "E007",
            ErrorCode::MissingGeneratorParams => "E008",
            ErrorCode::ParentCycle => "E009",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Warning codes for validation and lenient import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningCode {
    /// W001: Scene has no nodes.
    EmptyScene,
    /// W002: Materials entry is referenced by no node.
    UnusedMaterial,
    /// W003: Node entry did not parse and was skipped.
    MalformedNode,
    /// W004: Materials entry did not parse and was skipped.
    MalformedMaterial,
    /// W005: Node skipped because its parent was missing or skipped.
    OrphanedNode,
    /// W006: Node skipped because its id was already taken.
    SkippedDuplicateNode,
    /// W007: Extra root node skipped.
    ExtraRoot,
    /// W008: Slot reference had no materials entry; slot bound to default.
    DefaultedSlot,
}

impl WarningCode {
    /// Returns the warning code string (e.g., "W001").
    pub fn code(&self) -> &'static str {
        match self {
            WarningCode::EmptyScene => "W001",
            WarningCode::UnusedMaterial => "W002",
            WarningCode::MalformedNode => "W003",
            WarningCode::MalformedMaterial => "W004",
            WarningCode::OrphanedNode => "W005",
            WarningCode::SkippedDuplicateNode => "W006",
            WarningCode::ExtraRoot => "W007",
            WarningCode::DefaultedSlot => "W008",
        }
    }
}

impl std::fmt::Display for WarningCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A validation error with code, message, and the offending node if known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The error code.
    pub code: ErrorCode,
    /// Human-readable error message.
    pub message: String,
    /// Node the error applies to, when node-scoped.
    pub node_id: Option<NodeId>,
}

impl ValidationError {
    /// Creates a new validation error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            node_id: None,
        }
    }

    /// Creates a node-scoped validation error.
    pub fn for_node(code: ErrorCode, message: impl Into<String>, node_id: NodeId) -> Self {
        Self {
            code,
            message: message.into(),
            node_id: Some(node_id),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.node_id {
            Some(id) => write!(f, "{}: {} (node {})", self.code, self.message, id),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

/// A non-fatal condition recorded during validation or lenient import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportWarning {
    /// The warning code.
    pub code: WarningCode,
    /// Human-readable warning message.
    pub message: String,
    /// Node the warning applies to, when node-scoped.
    pub node_id: Option<NodeId>,
}

impl ImportWarning {
    /// Creates a new warning.
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            node_id: None,
        }
    }

    /// Creates a node-scoped warning.
    pub fn for_node(code: WarningCode, message: impl Into<String>, node_id: NodeId) -> Self {
        Self {
            code,
            message: message.into(),
            node_id: Some(node_id),
        }
    }
}

impl std::fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.node_id {
            Some(id) => write!(f, "{}: {} (node {})", self.code, self.message, id),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

/// Result of strict document validation.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// List of validation errors; empty when the document is valid.
    pub errors: Vec<ValidationError>,
    /// List of validation warnings.
    pub warnings: Vec<ImportWarning>,
}

impl ValidationResult {
    /// Creates an empty (passing) result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an error.
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Adds a warning.
    pub fn add_warning(&mut self, warning: ImportWarning) {
        self.warnings.push(warning);
    }

    /// Returns true if there are no errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}
