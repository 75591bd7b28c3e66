#![allow(non_snake_case)]

// Declare the modules that form the library's public API.
pub mod annotator;
pub mod config;
pub mod data_model;
pub mod error;
pub mod job_logic;
pub mod orchestrator;
pub mod pipeline;
pub mod utils;
