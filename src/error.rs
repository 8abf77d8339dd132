//! Kernel error type.

/// Errors surfaced by the registration API.
///
/// Scheduling itself never fails: starvation falls back to the idle task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The task registry already holds `MAX_TASKS` tasks. Nothing was
    /// modified; the requested task stays unscheduled.
    CapacityExceeded,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::CapacityExceeded => f.write_str("task registry is full"),
        }
    }
}
