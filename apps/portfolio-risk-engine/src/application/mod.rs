//! Application Layer
//!
//! Orchestrates the domain through ports:
//!
//! - **Ports**: interfaces for position sources, snapshot subscribers, order
//!   gateways and the clock
//! - **Services**: the update scheduler, snapshot publisher and order-driven
//!   refresh

pub mod ports;
pub mod services;

pub use ports::*;
pub use services::*;
