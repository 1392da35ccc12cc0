//! Failure primitives, one module per mode. Each primitive performs exactly
//! its own side effect; gating (match, roll, dry-run) belongs to the
//! orchestrator.

pub mod corruption;
pub mod denylist;
pub mod diskspace;
pub mod exception;
pub mod latency;
pub mod statuscode;
pub mod timeout;
