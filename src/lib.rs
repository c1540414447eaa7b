//! Atomic swap coordination server.
//!
//! A typed message-passing rendezvous for cross-chain atomic swaps: a
//! single-use capability token gates each step of the swap state
//! machine (`REGISTERED -> INITIATED -> PARTICIPATED -> REDEEMED ->
//! COMPLETED`), and `/get_redeem_token` extracts an initiator's
//! pre-image from its on-chain redeem transaction. See
//! [`coordinator::Coordinator`] for the entry point, [`http::router`]
//! for the HTTP surface.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod hashing;
pub mod http;
pub mod kv;
pub mod model;
pub mod script;
pub mod wire;

pub use coordinator::Coordinator;
pub use error::{Error, Result};
pub use kv::Stores;
