pub mod reply;
pub mod signup_routes;
pub mod submission;
pub mod system_routes;
