pub mod config;
pub mod error;
pub mod model;

pub use config::*;
pub use error::*;
pub use model::song::*;
