pub mod constants;
pub mod error;
pub mod model;
pub mod types;

pub use constants::*;
pub use error::CoreError;
pub use model::*;
pub use types::*;
