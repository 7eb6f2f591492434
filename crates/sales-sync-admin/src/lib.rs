pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::AdminError;
pub use router::build_router;
pub use state::AppState;
