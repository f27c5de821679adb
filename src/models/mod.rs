pub mod chart;
pub mod quote;
pub mod response;

pub use chart::*;
pub use quote::*;
pub use response::*;
