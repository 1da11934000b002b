#![no_main]
#![no_std]

use fpca::boot::{self, BootError};
use fpca::uart::{ByteIo, Uart};

// World's cheapest RISC-V "runtime" - only works because we don't use non-stack
// RAM (as ensured by our linker script)
core::arch::global_asm! {
    "
    .pushsection .start,\"ax\",%progbits
    .globl __start
    __start:
        # initialize stack pointer
1:      auipc sp, %pcrel_hi(__stack_start)
        addi sp, sp, %pcrel_lo(1b)
        # No need to fill in a return address, main won't return
        j main

    .popsection
    "
}

#[no_mangle]
pub extern "C" fn main() -> ! {
    // Safety: the UART address comes from the build configuration and
    // nothing else is running.
    let mut uart = unsafe { Uart::new(config::UART_ADDR as usize) };
    // build.rs range-checks the rate, but if the divisor is refused anyway
    // there's no line to talk on: wait for reset.
    if uart.set_baud(config::BAUD).is_ok() {
        load(&mut uart);
    }

    // Wait for reset.
    loop {}
}

fn load(uart: &mut Uart) {
    uart.puts("Bootloader Ready!");

    let window = config::LOAD_START..=config::LOAD_END;
    let result = boot::receive_image(uart, window, |address, byte| unsafe {
        (address as *mut u8).write_volatile(byte);
    });

    match result {
        Ok(_) => {
            uart.puts("ETX Received!");
            uart.puts("Bootloader Done, set SW15 back to 0 and reset!");
        }
        Err(BootError::OutOfBounds { address }) => {
            uart.write_bytes(b"Image outside load window at 0x");
            put_hex(uart, address);
            uart.puts("");
        }
        Err(_) => uart.puts("Image runs past the end of memory!"),
    }
}

/// `ufmt` would do this too, but not in 3 KiB.
fn put_hex(uart: &mut Uart, word: u32) {
    for shift in (0..32).step_by(4).rev() {
        uart.write_byte(b"0123456789abcdef"[(word >> shift) as usize & 0xF]);
    }
}

extern "C" {
    // This function is deliberately not implemented to cause a link error if we
    // include a panic.
    fn panic_handler_should_be_optimized_out() -> !;
}

#[panic_handler]
fn panic(_info: &core::panic::PanicInfo<'_>) -> ! {
    unsafe {
        panic_handler_should_be_optimized_out()
    }
}

mod config {
    include!(concat!(env!("OUT_DIR"), "/config.rs"));
}
