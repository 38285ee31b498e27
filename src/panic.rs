//! Panic handler
//!
//! Library crates embedded in a larger firmware image usually already
//! install their own `#[panic_handler]`; this one is only registered when
//! the `panic-handler` feature is enabled.

use core::panic::PanicInfo;

pub fn timer_core_panic(info: &PanicInfo) -> ! {
    crate::println!("\n!!! SLEEP TIMER CORE PANIC !!!");

    if let Some(location) = info.location() {
        crate::println!("Location: {}:{}", location.file(), location.line());
    }

    let msg = info.message();
    crate::println!("Message: {}", msg);

    crate::println!("Halted.");

    loop {
        core::hint::spin_loop();
    }
}

#[cfg(all(not(test), feature = "panic-handler"))]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    timer_core_panic(info)
}
