pub mod config;
pub mod console;
pub mod engine;
pub mod error;
pub mod native;
pub mod node;
pub mod persist;
pub mod prototype;
pub mod signal;

mod arena;
mod graph;
mod library;
