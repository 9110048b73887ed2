pub mod config;
pub mod diff;
pub mod dispatch;
pub mod error;
pub mod item;
pub mod partition;
pub mod registry;
pub mod session;

mod strategy;
pub use strategy::*;

mod scheduler;
pub use scheduler::*;

#[cfg(test)]
mod test_support;
