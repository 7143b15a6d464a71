pub mod auth;
pub mod booking;
pub mod catalog;
pub mod error;
pub mod partition;
pub mod service;
pub mod store;
pub mod utils;
