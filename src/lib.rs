//! # TickOS — Tick-driven Operating System
//!
//! A preemptive, round-robin multitasking kernel for ARM Cortex-M4
//! microcontrollers. Independent, never-returning task bodies share one
//! core; the SysTick interrupt is the only scheduling trigger.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                    Application Tasks                    │
//! ├────────────────────────────────────────────────────────┤
//! │                 Kernel API (kernel.rs)                  │
//! │     init() · register() · block_current() · start()    │
//! ├───────────────────────────┬────────────────────────────┤
//! │  Scheduler                │  Sync                      │
//! │  scheduler.rs             │  sync.rs                   │
//! │  ─ select_next()          │  ─ critical_section()      │
//! │  ─ switch_context()       │  ─ with()                  │
//! ├───────────────────────────┴────────────────────────────┤
//! │   Task Model (task.rs) · Frames (frame.rs)              │
//! │   Stack Region (stack.rs)                               │
//! ├────────────────────────────────────────────────────────┤
//! │            Arch Port (arch/cortex_m4.rs)                │
//! │    SysTick trap · SysTick setup · Thread-mode entry    │
//! ├────────────────────────────────────────────────────────┤
//! │         ARM Cortex-M4 Hardware (Thumb-2)                │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Scheduling Model
//!
//! - **Round-robin**: runnable tasks run one tick each, in registration order
//! - **Timed blocking**: a task may block itself for N scheduler visits
//! - **Idle fallback**: task 0 runs whenever nothing else can
//!
//! ## Memory Model
//!
//! - **No heap**: all state is statically allocated
//! - **Fixed-size TCB array**: `[TaskControlBlock; MAX_TASKS]`
//! - **One stack arena**: `MAX_TASKS` slabs of `STACK_WORDS` words, handed out
//!   top-down in registration order
//! - **Stack overflow is not detected**

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod arch;
pub mod config;
pub mod error;
pub mod frame;
pub mod kernel;
pub mod scheduler;
pub mod stack;
pub mod sync;
pub mod task;

pub use error::Error;
pub use scheduler::{select_next, Scheduler};
pub use task::{TaskControlBlock, TaskEntry, TaskState};
