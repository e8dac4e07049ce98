pub mod config;
pub mod control;
pub mod gesture;
pub mod pose;
