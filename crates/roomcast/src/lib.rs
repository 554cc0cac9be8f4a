//! Top-level facade crate for roomcast.
//!
//! Re-exports core types and the gateway library so users can depend on a
//! single crate.

pub mod core {
    pub use roomcast_core::*;
}

pub mod gateway {
    pub use roomcast_gateway::*;
}
