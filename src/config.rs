//! # TickOS Configuration
//!
//! Compile-time constants governing the scheduler and system behavior.
//! All limits are fixed at compile time — no dynamic allocation.

/// Maximum number of tasks the registry can hold, idle task included.
/// Each slot reserves `STACK_WORDS` words of RAM whether used or not.
pub const MAX_TASKS: usize = 16;

/// Per-task stack slab size in 32-bit words (1 KiB).
///
/// Must hold the deepest call chain of the task body plus one full
/// saved context (`frame::FRAME_WORDS`). Overflowing a slab is not
/// detected and corrupts the neighbouring slab below it.
pub const STACK_WORDS: usize = 256;

/// Index of the idle task. Registered first, never blocks.
pub const IDLE_TASK: usize = 0;

/// SysTick frequency in Hz. One tick is one scheduling decision, and
/// the unit of `kernel::delay`.
pub const TICK_HZ: u32 = 1000;

/// System clock frequency in Hz (STM32F4 16 MHz HSI after reset).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;

const _: () = assert!(MAX_TASKS >= 1);
const _: () = assert!(STACK_WORDS >= crate::frame::FRAME_WORDS);
const _: () = assert!(STACK_WORDS % 2 == 0, "slabs must keep 8-byte alignment");
