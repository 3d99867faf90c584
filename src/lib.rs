//! Shape OpenStreetMap XML extracts into JSON documents.

pub mod app;
pub mod audit;
pub mod config;
pub mod element;
pub mod pipeline;
pub mod reader;
pub mod shape;
pub mod sinks;
pub mod utils;
