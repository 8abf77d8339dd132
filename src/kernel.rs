//! # Kernel
//!
//! The global scheduler instance and the public task API.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset handler (cortex-m-rt)
//!   └─► main()
//!         ├─► kernel::init()      ← register the idle task (index 0)
//!         ├─► kernel::register()  ← register application tasks (×N)
//!         └─► kernel::start()     ← no return
//!               ├─► enable MemManage/BusFault/UsageFault
//!               ├─► SysTick at lowest priority, armed at TICK_HZ
//!               └─► PSP = idle's stack, Thread mode on PSP, branch to idle
//! ```
//!
//! The first context switch happens on the first tick after `start`.

use crate::error::Error;
use crate::scheduler::Scheduler;
use crate::sync::{self, Shared};
use crate::task::TaskEntry;

use core::cell::RefCell;

use cortex_m::interrupt::Mutex;

/// Global scheduler instance, shared by task context and the SysTick trap.
static SCHEDULER: Shared<Scheduler> = Mutex::new(RefCell::new(Scheduler::new()));

/// Run `f` with exclusive access to the global scheduler.
#[inline]
pub fn with_scheduler<R>(f: impl FnOnce(&mut Scheduler) -> R) -> R {
    sync::with(&SCHEDULER, f)
}

/// The idle task: always runnable, does nothing observable.
pub extern "C" fn idle() -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}

/// Register the idle task. Must be the first registration.
pub fn init() -> Result<usize, Error> {
    register(idle)
}

/// Register a task with the scheduler.
///
/// Tasks may be registered before [`start`] or, while the registry has
/// room, from a running task. A new task is first selected on a later tick
/// in round-robin order.
///
/// # Returns
/// - `Ok(index)`: the task's slot in the registry
/// - `Err(Error::CapacityExceeded)`: `MAX_TASKS` reached; nothing changed
///
/// # Example
/// ```ignore
/// kernel::init()?;
/// kernel::register(blink_green)?;
/// ```
pub fn register(entry: TaskEntry) -> Result<usize, Error> {
    with_scheduler(|scheduler| scheduler.register(entry))
}

/// Block the calling task for `ticks` scheduler visits.
///
/// Does not yield: the task keeps running until the next tick switches it
/// out. Use [`sleep`] to stop doing work until the delay is over. Calls
/// with `ticks == 0` or from the idle task are ignored.
pub fn block_current(ticks: u32) {
    with_scheduler(|scheduler| scheduler.block_current(ticks));
}

/// Block the calling task for `ticks` and wait, in low-power sleep, until
/// it has been switched out and resumed.
pub fn sleep(ticks: u32) {
    block_current(ticks);
    while with_scheduler(|scheduler| scheduler.current_is_blocked()) {
        cortex_m::asm::wfi();
    }
}

/// Start the scheduler. **Does not return.**
///
/// Enables fault reporting, arms SysTick and falls into the idle task on
/// its own process stack. Registers the idle task first if [`init`] was
/// never called.
#[cfg(target_arch = "arm")]
pub fn start(mut core_peripherals: cortex_m::Peripherals) -> ! {
    use crate::arch::cortex_m4;

    cortex_m::interrupt::disable();

    cortex_m4::enable_faults(&mut core_peripherals.SCB);
    cortex_m4::set_trap_priority(&mut core_peripherals.SCB);

    let (psp, pc) = with_scheduler(|scheduler| {
        if scheduler.is_empty() {
            // An empty registry cannot fail to take the idle task
            let _ = scheduler.register(idle);
        }
        let (frame, sp) = scheduler.resume_point();
        info!(
            "starting scheduler with {=usize} tasks on task {=usize}",
            scheduler.len(),
            scheduler.current()
        );
        (scheduler.stacks_mut().address_of(sp), frame.pc)
    });

    cortex_m4::configure_systick(&mut core_peripherals.SYST);

    unsafe { cortex_m4::start_first_task(psp, pc) }
}
