pub mod fundamentals;
pub mod rating;
pub mod sensitivity;
pub mod valuation;
