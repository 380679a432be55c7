pub mod chat;
pub mod config;
pub mod credentials;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod transcript;
pub mod users;
pub mod youtube;

pub use error::{ApiError, ApiResult};
pub use state::{AppState, AppStateInner};
