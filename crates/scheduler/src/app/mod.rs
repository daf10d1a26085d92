//! Application module
//!
//! Wires the watches, the work queue and the reconciler together and
//! supervises them until shutdown.

pub mod builder;
pub mod core;
pub mod services;
pub mod tasks;

pub use builder::ApplicationBuilder;
pub use core::Application;
pub use services::ApplicationServices;
