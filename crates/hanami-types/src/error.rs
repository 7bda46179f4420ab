//! Error types for the hanami engine.
//!
//! All crates return `HanamiResult<T>` from fallible operations.

use thiserror::Error;

/// Unified error type for the hanami engine.
#[derive(Debug, Error)]
pub enum HanamiError {
    /// Mesh data is malformed or inconsistent.
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// A structured buffer declaration could not be laid out.
    #[error("Invalid buffer layout: {0}")]
    InvalidLayout(String),

    /// A structured buffer has no field with this name.
    #[error("Buffer '{buffer}' has no field named '{field}'")]
    UnknownField { buffer: String, field: String },

    /// A structured buffer field was requested with the wrong value type.
    #[error("Field '{field}' is declared as {declared}, requested as {requested}")]
    FieldTypeMismatch {
        field: String,
        declared: &'static str,
        requested: &'static str,
    },

    /// The source hierarchy of a spatial index has more than one root.
    #[error("Multi-root BVHs not supported ({roots} roots)")]
    MultiRootHierarchy { roots: usize },

    /// A topology-mutating call arrived after the solver was baked.
    #[error("Cannot {operation}: solver is already baked")]
    AlreadyBaked { operation: &'static str },

    /// A steady-state call arrived before the solver was baked.
    #[error("Cannot {operation}: solver is not yet baked")]
    NotBaked { operation: &'static str },

    /// An object handle does not refer to a registered object.
    #[error("Unknown object id {0}")]
    UnknownObject(u32),

    /// A vertex handle does not refer to a vertex of the given object.
    #[error("Vertex {vertex} does not belong to object {object}")]
    UnknownVertex { vertex: u32, object: u32 },

    /// Vertices and springs can only be appended to the newest object.
    #[error("Object {0} is closed; only the most recently added object accepts vertices and springs")]
    ObjectClosed(u32),

    /// Configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl HanamiError {
    /// True for errors caused by calling the solver in the wrong state.
    /// These are reported and ignored by the frame loop, never fatal.
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            HanamiError::AlreadyBaked { .. }
                | HanamiError::NotBaked { .. }
                | HanamiError::UnknownObject(_)
                | HanamiError::UnknownVertex { .. }
                | HanamiError::ObjectClosed(_)
        )
    }
}

/// Convenience alias for `Result<T, HanamiError>`.
pub type HanamiResult<T> = Result<T, HanamiError>;
