//! # TickOS Example Firmware
//!
//! Blinks the STM32F4-Discovery LEDs on GPIOD from three independent tasks,
//! each sleeping a different number of ticks between toggles:
//!
//! | Task | LED | Period (ticks) |
//! |------|-----|----------------|
//! | idle | —   | —              |
//! | `blink_green` | PD12 | 500 |
//! | `blink_orange` | PD13 | 250 |
//! | `blink_red` | PD14 | 350 |
//!
//! With `TICK_HZ = 1000` a tick is 1 ms. Build with
//! `cargo build --release --target thumbv7em-none-eabi`. Host builds produce
//! an empty binary so that the library tests link.

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(not(target_os = "none"))]
fn main() {}

#[cfg(target_os = "none")]
mod firmware {
    use cortex_m_rt::entry;
    #[cfg(feature = "defmt")]
    use defmt_rtt as _;
    use panic_halt as _;

    use tickos::kernel;

    /// Bare GPIOD register access for the Discovery board LEDs.
    mod board {
        const RCC_AHB1ENR: *mut u32 = 0x4002_3830 as *mut u32;
        const GPIOD_MODER: *mut u32 = 0x4002_0C00 as *mut u32;
        const GPIOD_ODR: *mut u32 = 0x4002_0C14 as *mut u32;
        const RCC_AHB1ENR_GPIODEN: u32 = 1 << 3;

        pub const LED_GREEN: u8 = 12;
        pub const LED_ORANGE: u8 = 13;
        pub const LED_RED: u8 = 14;

        /// Clock GPIOD and make the LED pins general-purpose outputs.
        pub fn init_leds() {
            unsafe {
                let en = core::ptr::read_volatile(RCC_AHB1ENR);
                core::ptr::write_volatile(RCC_AHB1ENR, en | RCC_AHB1ENR_GPIODEN);

                let mut moder = core::ptr::read_volatile(GPIOD_MODER);
                for pin in [LED_GREEN, LED_ORANGE, LED_RED] {
                    moder = (moder & !(0b11 << (2 * pin))) | (0b01 << (2 * pin));
                }
                core::ptr::write_volatile(GPIOD_MODER, moder);
            }
        }

        /// Read-modify-write on ODR. Only ever called by the task owning
        /// `pin`; a preemption between read and write can drop another
        /// task's toggle, which is harmless for blinking.
        pub fn toggle(pin: u8) {
            unsafe {
                let odr = core::ptr::read_volatile(GPIOD_ODR);
                core::ptr::write_volatile(GPIOD_ODR, odr ^ (1 << pin));
            }
        }
    }

    extern "C" fn blink_green() -> ! {
        loop {
            board::toggle(board::LED_GREEN);
            kernel::sleep(500);
        }
    }

    extern "C" fn blink_orange() -> ! {
        loop {
            board::toggle(board::LED_ORANGE);
            kernel::sleep(250);
        }
    }

    extern "C" fn blink_red() -> ! {
        loop {
            board::toggle(board::LED_RED);
            kernel::sleep(350);
        }
    }

    /// Firmware entry point. Registers idle and the blink tasks, then starts
    /// the scheduler. Does not return.
    #[entry]
    fn main() -> ! {
        let cp = cortex_m::Peripherals::take().unwrap();

        board::init_leds();

        kernel::init().expect("failed to register idle task");
        kernel::register(blink_green).expect("failed to create blink_green");
        kernel::register(blink_orange).expect("failed to create blink_orange");
        kernel::register(blink_red).expect("failed to create blink_red");

        kernel::start(cp)
    }
}
