pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "credit")]
pub mod credit;

#[cfg(feature = "valuation")]
pub mod valuation;

#[cfg(feature = "scenarios")]
pub mod scenarios;

#[cfg(feature = "fundamentals")]
pub mod fundamentals;

pub use error::ValuationError;
pub use types::*;

/// Standard result type for all valuation operations
pub type ValuationResult<T> = Result<T, ValuationError>;
