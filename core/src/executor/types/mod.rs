pub mod config;
pub mod result;
pub mod vertex;

pub use config::*;
pub use result::*;
pub use vertex::*;
