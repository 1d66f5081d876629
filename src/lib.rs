pub mod client;
mod error;
pub mod module;
pub mod proto;
pub mod util;

pub use client::{Client, ClientConfig, Endpoint};
pub use error::*;
