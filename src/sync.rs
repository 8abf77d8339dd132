//! # Synchronization Primitives
//!
//! Interrupt-safe access to the kernel's shared state on a single-core
//! Cortex-M4. Task context and the SysTick trap both reach the scheduler
//! through [`with`], so they can never hold it at the same time.

use core::cell::RefCell;

use cortex_m::interrupt::{self, Mutex};

/// Kernel state shared between task context and the trap.
pub type Shared<T> = Mutex<RefCell<T>>;

/// Execute a closure within a critical section (interrupts disabled).
///
/// Interrupts are disabled on entry and restored on exit. Keep the closure
/// short: it delays the next tick.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(&interrupt::CriticalSection) -> R,
{
    interrupt::free(f)
}

/// Run `f` with exclusive access to `shared`.
///
/// The borrow cannot fail: every borrow happens inside a critical section
/// and none outlives it.
#[inline]
pub fn with<T, R>(shared: &Shared<T>, f: impl FnOnce(&mut T) -> R) -> R {
    critical_section(|cs| f(&mut shared.borrow(cs).borrow_mut()))
}
