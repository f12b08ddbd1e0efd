pub mod auth;

pub use auth::{auth_middleware, webhook_middleware, AuthUser};
