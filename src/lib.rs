//! Signup collection service: records unique email addresses, keeps an
//! approximate signup counter and sends a best-effort welcome email.

pub mod app;
pub mod config;
pub mod errors;
pub mod persistence;
pub mod routes;
pub mod services;
pub mod state;
