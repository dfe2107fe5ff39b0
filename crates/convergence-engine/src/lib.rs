pub mod engine;
pub mod status;

#[cfg(test)]
mod engine_tests;

pub use engine::*;
pub use status::*;
