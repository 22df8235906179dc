//! # CareBook core
//!
//! Appointment lifecycle and access-control engine: session handling, the
//! role guard, slot availability, the booking workflow and the appointment
//! state machine. Persistence and transport live in other crates and reach
//! the core through the traits in [`store`] and [`session`].

pub mod booking;
pub mod clock;
pub mod errors;
pub mod guard;
pub mod lifecycle;
pub mod models;
pub mod session;
pub mod slots;
pub mod store;
