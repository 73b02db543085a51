pub mod handlers;
pub mod models;
pub mod reconciler;

pub use handlers::*;
pub use models::*;
pub use reconciler::*;
