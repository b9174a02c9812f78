//! Platform-specific serial shims. Currently just Linux RS-485 RTS
//! control via `TIOCSRS485`, which `serialport`'s own portable API has
//! no equivalent for.

#[cfg(all(target_os = "linux", feature = "rs485"))]
mod rs485;

#[cfg(all(target_os = "linux", feature = "rs485"))]
pub use rs485::enable_rs485;
