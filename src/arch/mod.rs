//! # Architecture Abstraction Layer
//!
//! The hardware boundary of the kernel. Everything above it works on task
//! indices, states and stack offsets; only this layer touches registers,
//! raw stack addresses and inline assembly. Built for ARM targets only, so
//! the rest of the crate can be tested on the host.

#[cfg(target_arch = "arm")]
pub mod cortex_m4;
