pub mod auth;
pub mod error;
pub mod formats;
pub mod ids;

pub use auth::{ActorRole, User};
pub use error::AppError;
pub use ids::EntityId;
