// src/pipeline/mod.rs

pub mod readers;
pub mod segment;
pub mod writers;
