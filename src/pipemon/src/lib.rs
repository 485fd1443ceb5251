pub mod aggregator;
pub mod cli;
pub mod config;
pub mod definition;
pub mod logging;
pub mod probe;
pub mod responder;
pub mod transport;
