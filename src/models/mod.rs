pub mod filter;
pub mod price;

pub use filter::*;
pub use price::*;
