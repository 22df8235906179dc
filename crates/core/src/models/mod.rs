pub mod appointment;
pub mod principal;
pub mod provider;
pub mod time_slot;
