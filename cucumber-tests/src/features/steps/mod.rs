pub mod access_steps;
pub mod engine_steps;
