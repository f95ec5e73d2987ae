use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataTableError {
    /// Two columns registered under the same name
    #[error("There already is a column with name '{0}'")]
    DuplicateColumn(String),

    /// Column lookup by name or index failed
    #[error("There is no column named '{0}'")]
    UnknownColumn(String),

    /// Entity type missing from the metadata provider
    #[error("Unknown entity '{0}'")]
    UnknownEntity(String),

    /// Path segment is neither a field nor an association of the entity
    #[error("Entity '{entity}' has no field '{field}'")]
    UnknownField { entity: String, field: String },

    /// Non-terminal path segment is not an association
    #[error("Entity '{entity}' has no association '{association}'")]
    UnknownAssociation { entity: String, association: String },

    /// Malformed dotted path or alias
    #[error("Invalid path '{0}'")]
    InvalidPath(String),

    /// Entity declares no identifier field
    #[error("Class {0} has no identifiers")]
    NoIdentifier(String),

    /// Filter placeholder left after rewriting
    #[error("Unresolved placeholder '{0}' in filter expression")]
    UnresolvedPlaceholder(String),

    /// Filter expression uses syntax outside the allowed subset
    #[error("Unsupported filter syntax: {0}")]
    UnsafeFilter(String),

    /// Request parameters failed validation
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Batch action name not registered on the table
    #[error("Unknown batch action '{0}'")]
    UnknownBatchAction(String),

    /// Error executing a query
    #[error("Execution error: {0}")]
    Execution(String),

    /// Error mapping data
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Adapter broke its contract; not a runtime condition
    #[error("Contract violation: {0}")]
    Contract(&'static str),

    /// Rusqlite specific errors
    #[cfg(feature = "rusqlite")]
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

impl DataTableError {
    /// Returns true for errors caused by table or request configuration,
    /// raised before any backend call.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DataTableError::DuplicateColumn(_)
                | DataTableError::UnknownColumn(_)
                | DataTableError::UnknownEntity(_)
                | DataTableError::UnknownField { .. }
                | DataTableError::UnknownAssociation { .. }
                | DataTableError::InvalidPath(_)
                | DataTableError::NoIdentifier(_)
                | DataTableError::UnresolvedPlaceholder(_)
                | DataTableError::UnsafeFilter(_)
                | DataTableError::InvalidRequest(_)
                | DataTableError::UnknownBatchAction(_)
        )
    }
}

/// Result type for data table operations
pub type Result<T> = std::result::Result<T, DataTableError>;
