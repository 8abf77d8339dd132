//! # Scheduler
//!
//! The task registry, the current-task cursor, the stack arena, and the
//! round-robin policy that runs once per SysTick.
//!
//! ## Scheduling Algorithm
//!
//! At each tick, [`select_next`] walks the application tasks (indices
//! `1..len`) once, circularly, starting just after the outgoing task and
//! ending with the outgoing task itself:
//!
//! 1. A **Runnable** task stops the walk and is selected.
//! 2. A **Blocked** task has its delay decremented. If that brings it to
//!    zero it becomes Runnable and is selected on the spot; otherwise the
//!    walk continues.
//! 3. If the walk finds nothing, the idle task (index 0) is selected.
//!
//! Delays therefore count *visits*, and a blocked task is visited on every
//! tick in which no task ahead of it in the walk is runnable.
//!
//! ## Concurrency
//!
//! The trap is the only writer of the cursor and of other tasks' records.
//! Task context only ever touches its own record through
//! [`Scheduler::block_current`].

use crate::config::{IDLE_TASK, MAX_TASKS};
use crate::error::Error;
use crate::frame::{self, ExceptionFrame};
use crate::stack::StackRegion;
use crate::task::{TaskControlBlock, TaskEntry};

/// Pick the task to run after `current`.
///
/// Applies round-robin order over `tasks[1..]` and counts down blocked tasks
/// as a side effect of visiting them. Never returns a blocked index as long
/// as `tasks[0]` (idle) is runnable.
pub fn select_next(tasks: &mut [TaskControlBlock], current: usize) -> usize {
    if tasks.len() <= 1 {
        return current;
    }

    let ring = tasks.len() - 1;
    // Position in the ring just before the first candidate
    let before = (current + ring - 1) % ring;

    for step in 1..=ring {
        let index = (before + step) % ring + 1;
        if tasks[index].count_down() {
            return index;
        }
    }

    IDLE_TASK
}

/// The central scheduler state, stored as a global in `kernel.rs`.
///
/// - Tasks and their stacks are fixed-size arrays (no heap)
/// - Insertion order is scheduling order
/// - Index 0 is reserved for the idle task
pub struct Scheduler {
    tasks: [TaskControlBlock; MAX_TASKS],
    stacks: StackRegion,
    len: usize,
    current: usize,
    ticks: u64,
}

impl Scheduler {
    /// An empty registry. The first [`register`](Self::register) call must
    /// be the idle task.
    pub const fn new() -> Self {
        Self {
            tasks: [TaskControlBlock::EMPTY; MAX_TASKS],
            stacks: StackRegion::new(),
            len: 0,
            current: IDLE_TASK,
            ticks: 0,
        }
    }

    /// Register a task: claim the next slab, synthesize its first frame and
    /// append it to the registry as Runnable.
    ///
    /// # Returns
    /// - `Ok(index)` — the task's slot, which is also its place in the
    ///   round-robin order
    /// - `Err(Error::CapacityExceeded)` — the registry is full; nothing changed
    pub fn register(&mut self, entry: TaskEntry) -> Result<usize, Error> {
        if self.len >= MAX_TASKS {
            warn!("registry full, task rejected");
            return Err(Error::CapacityExceeded);
        }

        let index = self.len;
        let sp = frame::synthesize(
            self.stacks.words_mut(),
            StackRegion::slab_base(index),
            frame::entry_address(entry),
        );
        self.tasks[index] = TaskControlBlock::new(sp);
        self.len += 1;

        debug!("task {=usize} registered, sp offset {=usize}", index, sp);
        Ok(index)
    }

    /// Block the current task for `ticks` scheduler visits.
    ///
    /// Only records intent: the task keeps running until the next tick.
    /// A zero delay and any request made while idle is current are
    /// ignored, so idle stays runnable.
    pub fn block_current(&mut self, ticks: u32) {
        if ticks == 0 || self.current == IDLE_TASK {
            warn!("ignored block of task {=usize} for {=u32} ticks", self.current, ticks);
            return;
        }
        trace!("task {=usize} blocks for {=u32} ticks", self.current, ticks);
        self.tasks[self.current].block(ticks);
    }

    /// Decide phase of the trap: advance the cursor to the next task.
    pub fn schedule(&mut self) -> usize {
        self.ticks = self.ticks.wrapping_add(1);
        let next = select_next(&mut self.tasks[..self.len], self.current);
        self.current = next;
        next
    }

    /// One full trap: record the outgoing task's saved stack pointer, pick
    /// the next task and return the stack pointer to restore from.
    pub fn switch_context(&mut self, saved_sp: usize) -> usize {
        self.tasks[self.current].set_stack_pointer(saved_sp);
        let next = self.schedule();
        trace!("switch to task {=usize}", next);
        self.tasks[next].stack_pointer()
    }

    /// Registers, entry point and post-return stack pointer the current task
    /// would resume with. Used once at boot to enter the first task without
    /// a trap.
    pub fn resume_point(&self) -> (ExceptionFrame, usize) {
        let (_, frame, sp) =
            frame::unwind(self.stacks.words(), self.tasks[self.current].stack_pointer());
        (frame, sp)
    }

    /// Number of registered tasks, idle included.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index of the task whose context occupies the processor.
    #[inline]
    pub fn current(&self) -> usize {
        self.current
    }

    #[inline]
    pub fn task(&self, index: usize) -> Option<&TaskControlBlock> {
        self.tasks[..self.len].get(index)
    }

    /// Number of scheduling decisions made so far.
    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn stacks(&self) -> &StackRegion {
        &self.stacks
    }

    pub fn stacks_mut(&mut self) -> &mut StackRegion {
        &mut self.stacks
    }

    /// Whether the task in control of the processor is waiting out a delay.
    #[inline]
    pub fn current_is_blocked(&self) -> bool {
        !self.tasks[self.current].is_runnable()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskState;

    extern "C" fn spin() -> ! {
        loop {}
    }

    fn registry(runnable: usize) -> [TaskControlBlock; MAX_TASKS] {
        let mut tasks = [TaskControlBlock::EMPTY; MAX_TASKS];
        for (i, tcb) in tasks.iter_mut().enumerate().take(runnable) {
            *tcb = TaskControlBlock::new(i);
        }
        tasks
    }

    #[test]
    fn test_single_task_resumes_itself() {
        let mut tasks = registry(1);
        for _ in 0..10 {
            assert_eq!(select_next(&mut tasks[..1], 0), 0);
        }
    }

    #[test]
    fn test_round_robin_skips_idle() {
        let mut tasks = registry(4);
        let tasks = &mut tasks[..4];
        assert_eq!(select_next(tasks, 0), 1);
        assert_eq!(select_next(tasks, 1), 2);
        assert_eq!(select_next(tasks, 2), 3);
        assert_eq!(select_next(tasks, 3), 1);
    }

    #[test]
    fn test_blocked_task_skipped_and_counted_down() {
        let mut tasks = registry(3);
        tasks[2].block(4);
        let next = select_next(&mut tasks[..3], 1);

        // Walk visits 2 (blocked), then 1 again
        assert_eq!(next, 1);
        assert_eq!(tasks[2].remaining_delay(), 3);
    }

    #[test]
    fn test_unblocked_task_selected_same_visit() {
        let mut tasks = registry(3);
        tasks[2].block(1);
        assert_eq!(select_next(&mut tasks[..3], 1), 2);
        assert_eq!(tasks[2].state(), TaskState::Runnable);
    }

    #[test]
    fn test_walk_stops_at_first_runnable() {
        let mut tasks = registry(4);
        tasks[3].block(5);
        assert_eq!(select_next(&mut tasks[..4], 1), 2);
        // Task 3 lies beyond the stop point and is not visited
        assert_eq!(tasks[3].remaining_delay(), 5);
    }

    #[test]
    fn test_falls_back_to_idle() {
        let mut tasks = registry(3);
        tasks[1].block(10);
        tasks[2].block(10);
        assert_eq!(select_next(&mut tasks[..3], 2), IDLE_TASK);
        assert_eq!(tasks[1].remaining_delay(), 9);
        assert_eq!(tasks[2].remaining_delay(), 9);
    }

    #[test]
    fn test_register_assigns_slots_in_order() {
        let mut sched = Scheduler::new();
        assert!(sched.is_empty());
        assert_eq!(sched.register(spin), Ok(0));
        assert_eq!(sched.register(spin), Ok(1));
        assert_eq!(sched.len(), 2);

        let sp1 = sched.task(1).unwrap().stack_pointer();
        assert_eq!(sp1, StackRegion::slab_base(1) - frame::FRAME_WORDS);
    }

    #[test]
    fn test_register_rejects_past_capacity() {
        let mut sched = Scheduler::new();
        for i in 0..MAX_TASKS {
            assert_eq!(sched.register(spin), Ok(i));
        }
        assert_eq!(sched.register(spin), Err(Error::CapacityExceeded));
        assert_eq!(sched.len(), MAX_TASKS);
    }

    #[test]
    fn test_block_current_ignored_for_idle_and_zero() {
        let mut sched = Scheduler::new();
        sched.register(spin).unwrap();
        sched.register(spin).unwrap();

        sched.block_current(5);
        assert!(sched.task(0).unwrap().is_runnable());

        sched.schedule();
        assert_eq!(sched.current(), 1);
        sched.block_current(0);
        assert!(sched.task(1).unwrap().is_runnable());
    }

    #[test]
    fn test_switch_context_records_outgoing_sp() {
        let mut sched = Scheduler::new();
        sched.register(spin).unwrap();
        sched.register(spin).unwrap();
        let incoming = sched.task(1).unwrap().stack_pointer();

        let restored = sched.switch_context(1000);
        assert_eq!(sched.task(0).unwrap().stack_pointer(), 1000);
        assert_eq!(restored, incoming);
        assert_eq!(sched.ticks(), 1);
    }

    #[test]
    fn test_resume_point_of_idle() {
        let mut sched = Scheduler::new();
        sched.register(spin).unwrap();
        let (frame, sp) = sched.resume_point();
        assert_eq!(frame.pc, frame::entry_address(spin));
        assert_eq!(sp, StackRegion::slab_base(0));
    }
}
