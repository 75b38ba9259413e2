//! heating-machine-core — the sensor-gated work queue plus the canary
//! rollout, safety envelope, and load generation machinery built around it.
//!
//! This crate has no HTTP or CLI surface of its own; those live in
//! `heating-machine-server` and the `heating-machine` binary.

pub mod canary;
pub mod config;
pub mod env;
pub mod loadgen;
pub mod safety;
pub mod security;
pub mod workqueue;

pub use config::MachineConfig;
