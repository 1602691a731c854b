pub mod common;
pub mod env;
pub mod log;
pub mod runner;
pub mod stdlib;
