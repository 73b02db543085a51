pub mod error;
pub mod ledger;
pub mod models;
pub mod repository;
pub mod service;

pub use error::*;
pub use ledger::*;
pub use models::*;
pub use repository::*;
pub use service::*;
