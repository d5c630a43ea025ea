//! Request handlers, one module per endpoint group.

pub mod gif;
pub mod health;
pub mod resize;
pub mod thumbnail;
