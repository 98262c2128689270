pub mod decimal_context;
pub mod error;
pub mod types;

#[cfg(feature = "liquidation")]
pub mod liquidation;

#[cfg(feature = "analysis")]
pub mod analysis;

pub use decimal_context::{DecimalContext, RoundingMode};
pub use error::CapTableError;
pub use types::*;

/// Standard result type for all cap-table operations
pub type CapTableResult<T> = Result<T, CapTableError>;
