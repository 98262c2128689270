use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapTableError {
    /// A precondition on the cap-table snapshot does not hold. Always raised
    /// before any proceeds are allocated.
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },
}

impl CapTableError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CapTableError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Field path the error is scoped to, e.g. `preferred[1].conversion_ratio`.
    pub fn field(&self) -> &str {
        match self {
            CapTableError::InvalidInput { field, .. } => field,
        }
    }
}
