//! Sink implementations

pub mod console;
pub mod memory;
pub mod network;
pub mod rotating_file;

pub use console::ConsoleSink;
pub use memory::MemorySink;
pub use network::NetworkSink;
pub use rotating_file::{PathTemplate, RotatingFileSink};

pub use crate::core::Sink;
