pub mod cost_of_capital;
pub mod engine;
