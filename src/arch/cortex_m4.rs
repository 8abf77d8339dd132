//! # Cortex-M4 Port Layer
//!
//! Hardware-specific code for the ARM Cortex-M4 (Thumb-2) processor: the
//! SysTick context-switch trap, SysTick arming, fault enablement and the
//! one-time entry into Thread mode on the process stack.
//!
//! ## Context Switch Mechanism
//!
//! The Cortex-M4 uses a split-stack model:
//! - **MSP** (Main Stack Pointer): boot code and interrupt handlers
//! - **PSP** (Process Stack Pointer): tasks in Thread mode
//!
//! On exception entry, the hardware stacks R0–R3, R12, LR, PC and xPSR onto
//! the process stack. The SysTick trap stacks R4–R11 on top of that, which
//! completes the saved context described in [`crate::frame`].
//!
//! This module is the only place that deals in raw stack addresses. The
//! scheduler sees word offsets into its `StackRegion`.
//!
//! Tasks must not use the FPU: only the basic 8-word frame is supported,
//! so the firmware targets `thumbv7em-none-eabi`.

use core::arch::{asm, naked_asm};

use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::{SCB, SYST};

use crate::config::{SYSTEM_CLOCK_HZ, TICK_HZ};
use crate::frame::EXC_RETURN_THREAD_PSP;
use crate::kernel;

/// SHCSR enable bits for MemManage, BusFault and UsageFault.
const SHCSR_MEMFAULTENA: u32 = 1 << 16;
const SHCSR_BUSFAULTENA: u32 = 1 << 17;
const SHCSR_USGFAULTENA: u32 = 1 << 18;

/// CONTROL.SPSEL: Thread mode uses PSP.
const CONTROL_SPSEL_PSP: u32 = 1 << 1;

/// Lowest priority on a 4-bit implementation.
const LOWEST_PRIORITY: u8 = 0xFF;

// ---------------------------------------------------------------------------
// Peripheral setup
// ---------------------------------------------------------------------------

/// Route MemManage, BusFault and UsageFault to their own handlers instead
/// of escalating everything to HardFault.
pub fn enable_faults(scb: &mut SCB) {
    unsafe {
        scb.shcsr
            .modify(|r| r | SHCSR_MEMFAULTENA | SHCSR_BUSFAULTENA | SHCSR_USGFAULTENA);
    }
}

/// Put SysTick at the lowest priority.
///
/// The trap always returns to Thread mode on the process stack, so it must
/// never preempt another handler.
pub fn set_trap_priority(scb: &mut SCB) {
    unsafe {
        scb.set_priority(SystemHandler::SysTick, LOWEST_PRIORITY);
    }
}

/// Configure SysTick to fire at `TICK_HZ` from the processor clock. Each
/// tick enters [`SysTick`].
pub fn configure_systick(syst: &mut SYST) {
    let reload = SYSTEM_CLOCK_HZ / TICK_HZ - 1;
    syst.set_reload(reload);
    syst.clear_current();
    syst.set_clock_source(SystClkSource::Core);
    syst.enable_interrupt();
    syst.enable_counter();
}

// ---------------------------------------------------------------------------
// First task launch
// ---------------------------------------------------------------------------

/// Install `psp` as the process stack, switch Thread mode onto it, enable
/// interrupts and branch to `pc`. Never returns.
///
/// The boot stack (MSP) is abandoned to interrupt handlers from here on.
///
/// # Safety
/// Must be called once, from Thread mode on MSP, with interrupts disabled.
/// `psp` must be the top of a task's slab and `pc` that task's entry point.
pub unsafe fn start_first_task(psp: *mut u32, pc: u32) -> ! {
    asm!(
        "msr psp, {psp}",
        "msr control, {control}",
        "isb",
        "cpsie i",
        "bx {pc}",
        psp = in(reg) psp,
        control = in(reg) CONTROL_SPSEL_PSP,
        // bx needs the Thumb bit back
        pc = in(reg) pc | 1,
        options(noreturn)
    );
}

// ---------------------------------------------------------------------------
// SysTick trap (context switch)
// ---------------------------------------------------------------------------

/// SysTick exception handler — the context-switch trap.
///
/// ## Entry contract
/// - Handler mode on MSP, entered from Thread mode on PSP
/// - PSP points at the hardware frame (R0–R3, R12, LR, PC, xPSR) of the
///   outgoing task; R4–R11 still hold the outgoing task's values
///
/// ## Sequence
/// 1. Push R4–R11 below the hardware frame on PSP
/// 2. Hand that stack pointer to [`switch_context`], which stores it in the
///    outgoing TCB, runs the scheduling policy and returns the incoming
///    task's stack pointer
/// 3. Pop R4–R11 from the incoming stack, install it as PSP
/// 4. Return with EXC_RETURN = Thread/PSP; the hardware unstacks the rest
///
/// ## Exit contract
/// - PSP points at the incoming task's hardware frame
/// - R4–R11 hold the incoming task's values (zero for a fresh task)
///
/// Only R0–R3, R12 and LR are touched before the save and after the
/// restore, since the hardware already preserved them.
///
/// # Safety
/// Naked function bound to the vector table by symbol name. Must not be
/// re-entered; SysTick has a single pending bit and the lowest priority.
#[allow(non_snake_case)]
#[no_mangle]
#[unsafe(naked)]
pub unsafe extern "C" fn SysTick() {
    naked_asm!(
        "mrs r0, psp",
        "stmdb r0!, {{r4-r11}}",
        "bl {switch}",
        "ldmia r0!, {{r4-r11}}",
        "msr psp, r0",
        "ldr lr, ={exc_return}",
        "bx lr",
        switch = sym switch_context,
        exc_return = const EXC_RETURN_THREAD_PSP,
    );
}

/// Save/decide/restore bridge between the trap and the scheduler.
///
/// Translates the outgoing PSP into a stack offset and the incoming offset
/// back into a PSP value.
extern "C" fn switch_context(psp: *mut u32) -> *mut u32 {
    kernel::with_scheduler(|scheduler| {
        let saved = scheduler.stacks().offset_of(psp);
        let next = scheduler.switch_context(saved);
        scheduler.stacks_mut().address_of(next)
    })
}
