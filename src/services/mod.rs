pub mod counter;
pub mod mailer;
pub mod signup_service;
pub mod validation;
