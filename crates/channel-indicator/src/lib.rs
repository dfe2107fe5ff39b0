pub mod channel;
pub mod volatility;


pub use channel::*;
pub use volatility::*;
