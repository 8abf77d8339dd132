//! # Task Control Block
//!
//! Per-task bookkeeping: where the task's saved context lives, whether it
//! may run, and how many scheduler visits remain before a blocked task
//! becomes runnable again.
//!
//! ```text
//!   ┌──────────┐   block(ticks > 0)   ┌──────────┐
//!   │ Runnable │ ───────────────────► │ Blocked  │
//!   └──────────┘                      └──────────┘
//!        ▲                                 │
//!        │     count_down() reaches 0      │
//!        └─────────────────────────────────┘
//! ```
//!
//! There is no terminal state: tasks never exit.

/// The function signature for task bodies. Tasks run forever and take no
/// arguments.
pub type TaskEntry = extern "C" fn() -> !;

/// Scheduling state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskState {
    /// Eligible to be selected at the next tick.
    Runnable,
    /// Waiting out `remaining_delay` scheduler visits.
    Blocked,
}

/// Task Control Block (TCB).
///
/// Owned by the scheduler's registry. The stack pointer is a word offset
/// into the scheduler's `StackRegion`; it is only meaningful while the task
/// is switched out.
#[derive(Debug, Clone, Copy)]
pub struct TaskControlBlock {
    stack_pointer: usize,
    state: TaskState,
    remaining_delay: u32,
}

impl TaskControlBlock {
    /// An unused registry slot.
    pub const EMPTY: Self = Self {
        stack_pointer: 0,
        state: TaskState::Runnable,
        remaining_delay: 0,
    };

    /// A freshly registered task whose synthesized frame starts at
    /// `stack_pointer`.
    pub const fn new(stack_pointer: usize) -> Self {
        Self {
            stack_pointer,
            state: TaskState::Runnable,
            remaining_delay: 0,
        }
    }

    #[inline]
    pub fn stack_pointer(&self) -> usize {
        self.stack_pointer
    }

    #[inline]
    pub(crate) fn set_stack_pointer(&mut self, stack_pointer: usize) {
        self.stack_pointer = stack_pointer;
    }

    #[inline]
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Visits left before a blocked task turns runnable; 0 when runnable.
    #[inline]
    pub fn remaining_delay(&self) -> u32 {
        self.remaining_delay
    }

    #[inline]
    pub fn is_runnable(&self) -> bool {
        self.state == TaskState::Runnable
    }

    /// Mark the task blocked for `ticks` scheduler visits.
    ///
    /// `ticks` must be non-zero; a blocked task always has a positive delay.
    pub(crate) fn block(&mut self, ticks: u32) {
        debug_assert!(ticks > 0);
        self.remaining_delay = ticks;
        self.state = TaskState::Blocked;
    }

    /// One scheduler visit of a blocked task. Returns `true` if the task is
    /// runnable afterwards.
    pub(crate) fn count_down(&mut self) -> bool {
        if self.state == TaskState::Blocked {
            self.remaining_delay = self.remaining_delay.saturating_sub(1);
            if self.remaining_delay == 0 {
                self.state = TaskState::Runnable;
            }
        }
        self.is_runnable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_is_runnable() {
        let tcb = TaskControlBlock::new(240);
        assert!(tcb.is_runnable());
        assert_eq!(tcb.stack_pointer(), 240);
        assert_eq!(tcb.remaining_delay(), 0);
    }

    #[test]
    fn test_block_sets_delay() {
        let mut tcb = TaskControlBlock::new(0);
        tcb.block(3);
        assert_eq!(tcb.state(), TaskState::Blocked);
        assert_eq!(tcb.remaining_delay(), 3);
    }

    #[test]
    fn test_count_down_unblocks_on_last_visit() {
        let mut tcb = TaskControlBlock::new(0);
        tcb.block(3);

        assert!(!tcb.count_down());
        assert!(!tcb.count_down());
        assert_eq!(tcb.remaining_delay(), 1);
        assert!(tcb.count_down());
        assert_eq!(tcb.state(), TaskState::Runnable);
        assert_eq!(tcb.remaining_delay(), 0);
    }

    #[test]
    fn test_count_down_leaves_runnable_alone() {
        let mut tcb = TaskControlBlock::new(0);
        assert!(tcb.count_down());
        assert_eq!(tcb.remaining_delay(), 0);
    }
}
