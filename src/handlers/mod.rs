pub mod appointments;
pub mod auth;
pub mod pets;
pub mod records;
