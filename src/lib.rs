pub mod cache;
pub mod config;
pub mod domains;
pub mod error;
pub mod identity;
pub mod interfaces;
pub mod logging;
pub mod providers;
pub mod read_model;
pub mod scheduler;
pub mod selection;
pub mod services;

pub type Result<T> = std::result::Result<T, error::FitproError>;
