pub mod appointments;
pub mod auth;
pub mod health;
pub mod providers;
