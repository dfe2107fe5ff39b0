pub mod engine;
pub mod models;

#[cfg(test)]
mod tests;

pub use engine::BacktestEngine;
pub use models::*;
