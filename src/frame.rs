//! # Exception Return Frame
//!
//! Word-level model of what the Cortex-M4 and the SysTick trap keep on a
//! task's stack while the task is switched out, plus the synthesizer that
//! fakes such a frame for a task that has never run.
//!
//! ## Saved Context Layout (full-descending, low address first)
//!
//! ```text
//!   sp + 0  .. sp + 7    R4–R11        pushed by the trap (stmdb)
//!   sp + 8  .. sp + 12   R0–R3, R12    ┐
//!   sp + 13              LR            │ pushed by the processor on
//!   sp + 14              PC            │ exception entry, popped by
//!   sp + 15              xPSR          ┘ exception return
//! ```
//!
//! The trap's restore phase and the processor's exception return cannot
//! tell a synthesized frame from one left behind by a real switch-out.
//! The push/pop functions below mirror `stmdb`/`ldmia` and the hardware
//! stacking order exactly so that host tests can replay a switch.

use crate::task::TaskEntry;

/// xPSR with only the Thumb bit set: normal thread execution.
pub const XPSR_THUMB: u32 = 0x0100_0000;

/// EXC_RETURN value: return to Thread mode, use the process stack (PSP),
/// basic (non-FPU) frame.
pub const EXC_RETURN_THREAD_PSP: u32 = 0xFFFF_FFFD;

/// Words stacked by the processor on exception entry.
pub const EXCEPTION_FRAME_WORDS: usize = 8;

/// Words stacked by the trap (R4–R11).
pub const CALLEE_SAVED_WORDS: usize = 8;

/// A complete saved context.
pub const FRAME_WORDS: usize = EXCEPTION_FRAME_WORDS + CALLEE_SAVED_WORDS;

/// The registers the processor stacks on exception entry, in memory order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExceptionFrame {
    pub r0: u32,
    pub r1: u32,
    pub r2: u32,
    pub r3: u32,
    pub r12: u32,
    pub lr: u32,
    pub pc: u32,
    pub xpsr: u32,
}

impl ExceptionFrame {
    /// Frame that "returns" into `entry` with clean argument registers.
    pub const fn initial(entry: u32) -> Self {
        Self {
            r0: 0,
            r1: 0,
            r2: 0,
            r3: 0,
            r12: 0,
            lr: EXC_RETURN_THREAD_PSP,
            pc: entry,
            xpsr: XPSR_THUMB,
        }
    }

    fn to_words(self) -> [u32; EXCEPTION_FRAME_WORDS] {
        [
            self.r0, self.r1, self.r2, self.r3, self.r12, self.lr, self.pc, self.xpsr,
        ]
    }

    fn from_words(w: &[u32]) -> Self {
        Self {
            r0: w[0],
            r1: w[1],
            r2: w[2],
            r3: w[3],
            r12: w[4],
            lr: w[5],
            pc: w[6],
            xpsr: w[7],
        }
    }
}

/// R4–R11, the registers the processor leaves to the trap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalleeSaved(pub [u32; CALLEE_SAVED_WORDS]);

impl CalleeSaved {
    pub const ZERO: Self = Self([0; CALLEE_SAVED_WORDS]);
}

/// Address the processor should resume at for `entry`.
///
/// A stacked PC must be halfword aligned; the Thumb bit of the function
/// pointer lives in xPSR instead.
#[inline]
pub fn entry_address(entry: TaskEntry) -> u32 {
    (entry as usize as u32) & !1
}

/// Processor exception entry: stack `frame` below `sp`.
pub fn push_exception_frame(stack: &mut [u32], sp: usize, frame: &ExceptionFrame) -> usize {
    let sp = sp - EXCEPTION_FRAME_WORDS;
    stack[sp..sp + EXCEPTION_FRAME_WORDS].copy_from_slice(&frame.to_words());
    sp
}

/// Processor exception return: unstack the frame at `sp`.
pub fn pop_exception_frame(stack: &[u32], sp: usize) -> (ExceptionFrame, usize) {
    let frame = ExceptionFrame::from_words(&stack[sp..sp + EXCEPTION_FRAME_WORDS]);
    (frame, sp + EXCEPTION_FRAME_WORDS)
}

/// Trap save phase: `stmdb r0!, {r4-r11}`.
pub fn push_callee_saved(stack: &mut [u32], sp: usize, regs: &CalleeSaved) -> usize {
    let sp = sp - CALLEE_SAVED_WORDS;
    stack[sp..sp + CALLEE_SAVED_WORDS].copy_from_slice(&regs.0);
    sp
}

/// Trap restore phase: `ldmia r0!, {r4-r11}`.
pub fn pop_callee_saved(stack: &[u32], sp: usize) -> (CalleeSaved, usize) {
    let mut regs = CalleeSaved::ZERO;
    regs.0.copy_from_slice(&stack[sp..sp + CALLEE_SAVED_WORDS]);
    (regs, sp + CALLEE_SAVED_WORDS)
}

/// Write the initial saved context for a task that has never run.
///
/// Walks down from `slab_base` and returns the lowest written offset,
/// which becomes the task's initial stack pointer.
pub fn synthesize(stack: &mut [u32], slab_base: usize, entry: u32) -> usize {
    let sp = push_exception_frame(stack, slab_base, &ExceptionFrame::initial(entry));
    push_callee_saved(stack, sp, &CalleeSaved::ZERO)
}

/// Inverse of the trap's restore phase followed by exception return:
/// the registers a task resumes with and its stack pointer afterwards.
pub fn unwind(stack: &[u32], sp: usize) -> (CalleeSaved, ExceptionFrame, usize) {
    let (regs, sp) = pop_callee_saved(stack, sp);
    let (frame, sp) = pop_exception_frame(stack, sp);
    (regs, frame, sp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesized_layout() {
        let mut stack = [0xAAAA_AAAAu32; 32];
        let sp = synthesize(&mut stack, 32, 0x0800_1234);

        assert_eq!(sp, 32 - FRAME_WORDS);
        // Highest words first, walking down
        assert_eq!(stack[31], XPSR_THUMB);
        assert_eq!(stack[30], 0x0800_1234);
        assert_eq!(stack[29], EXC_RETURN_THREAD_PSP);
        assert!(stack[sp..29].iter().all(|&w| w == 0));
        // Nothing below the stack pointer is touched
        assert!(stack[..sp].iter().all(|&w| w == 0xAAAA_AAAA));
    }

    #[test]
    fn test_unwind_synthesized_frame() {
        let mut stack = [0u32; 64];
        let sp = synthesize(&mut stack, 48, 0x0800_0100);
        let (regs, frame, sp) = unwind(&stack, sp);

        assert_eq!(regs, CalleeSaved::ZERO);
        assert_eq!(frame, ExceptionFrame::initial(0x0800_0100));
        assert_eq!(sp, 48);
    }

    #[test]
    fn test_callee_saved_order_matches_stmdb() {
        let mut stack = [0u32; 16];
        let regs = CalleeSaved([4, 5, 6, 7, 8, 9, 10, 11]);
        let sp = push_callee_saved(&mut stack, 16, &regs);

        // R4 at the lowest address, R11 at the highest
        assert_eq!(stack[sp], 4);
        assert_eq!(stack[15], 11);
        assert_eq!(pop_callee_saved(&stack, sp), (regs, 16));
    }

    #[test]
    fn test_entry_address_clears_thumb_bit() {
        extern "C" fn body() -> ! {
            loop {}
        }
        let address = entry_address(body);
        assert_eq!(address & 1, 0);
        assert_eq!(address, (body as usize as u32) & !1);
    }
}
