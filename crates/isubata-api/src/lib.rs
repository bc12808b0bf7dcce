pub mod admin;
pub mod auth;
pub mod channels;
pub mod error;
pub mod feed;
pub mod history;
pub mod icons;
pub mod messages;
pub mod middleware;
pub mod profile;
pub mod routes;
pub mod state;
pub mod unread;

pub use error::ApiError;
pub use state::{AppState, AppStateInner};
