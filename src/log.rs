// Serial logging for the paging core.
//
// Mirrors the teacher kernel's `serial.rs`: a `uart_16550::SerialPort` behind
// a `lazy_static!`-initialized `spin::Mutex`. Under `cfg(test)` the port is
// never touched; `_print` routes to `std::println!` instead so the unit
// suite can run on a host with no serial hardware.

#[cfg(not(test))]
mod backend {
    use lazy_static::lazy_static;
    use spin::Mutex;
    use uart_16550::SerialPort;

    lazy_static! {
        pub static ref SERIAL1: Mutex<SerialPort> = {
            let mut serial_port = unsafe { SerialPort::new(0x3F8) };
            serial_port.init();
            Mutex::new(serial_port)
        };
    }

    #[doc(hidden)]
    pub fn _print(args: core::fmt::Arguments) {
        use core::fmt::Write;
        SERIAL1
            .lock()
            .write_fmt(args)
            .expect("printing to serial failed");
    }
}


#[doc(hidden)]
pub use backend::_print;

#[macro_export]
macro_rules! pg_print {
    ($($arg:tt)*) => ($crate::log::_print(format_args!($($arg)*)));
}

#[macro_export]
macro_rules! pg_println {
    () => ($crate::pg_print!("\n"));
    ($fmt:expr) => ($crate::pg_print!(concat!($fmt, "\n")));
    ($fmt:expr, $($arg:tt)*) => ($crate::pg_print!(
        concat!($fmt, "\n"), $($arg)*));
}
