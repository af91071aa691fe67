// src/lib.rs

pub mod aggregate;
pub mod discover;
pub mod output;
pub mod parse;
pub mod pipeline;

pub use pipeline::{run, RunSummary};
