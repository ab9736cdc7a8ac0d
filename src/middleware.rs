pub mod auth_middleware;

pub use auth_middleware::{AuthRejection, AuthenticatedUser, auth_middleware};
