pub mod error;
pub mod resample;
pub mod traits;
pub mod types;

pub use error::*;
pub use resample::*;
pub use traits::*;
pub use types::*;
