pub mod budget;
pub mod controller;
pub mod error;
