//! Stream pipelines fanned out from one shared camera chain.
//!
//! Data Flow:
//! ```text
//! configuration ─► loader ─► [StreamDescriptor] ─► builder
//!                                                     │
//! source chain (head ─► ... ─► last) ─┬─► throttle ─► resize ─► compress ─► publish   "wide"
//!                                     └─► throttle ─► resize ─► compress ─► publish   "narrow"
//! ```
//!
//! The supervisor owns the chain: it loads the description, retries unit
//! initialisation, applies device quirks, then lets the builder attach one
//! branch per descriptor. The runtime loop pushes frames until cancelled.

pub mod builder;
pub mod loader;
pub mod quirks;
pub mod runtime;
pub mod supervisor;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;
