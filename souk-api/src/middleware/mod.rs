pub mod auth;

pub use auth::CallerId;
