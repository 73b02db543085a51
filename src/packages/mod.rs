pub mod approval_machine;
pub mod commission;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

pub use approval_machine::*;
pub use commission::*;
pub use error::*;
pub use handlers::*;
pub use models::*;
pub use repository::*;
pub use service::*;
