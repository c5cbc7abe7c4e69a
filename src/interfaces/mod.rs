pub mod backend;
pub mod scheduler;
