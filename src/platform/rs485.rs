//! Linux RS-485 half-duplex control: `TIOCSRS485` asks the line
//! discipline to toggle RTS around each transmission itself, instead of
//! the application doing it in software (`serialport`'s
//! `write_request_to_send`, used on every other platform).

use std::os::unix::io::RawFd;

use crate::errors::PlatformError;

const TIOCSRS485: libc::c_ulong = 0x542F;

const SER_RS485_ENABLED: u32 = 1 << 0;
const SER_RS485_RTS_ON_SEND: u32 = 1 << 1;
const SER_RS485_RTS_AFTER_SEND: u32 = 1 << 2;
const SER_RS485_RX_DURING_TX: u32 = 1 << 4;

#[repr(C)]
#[derive(Default)]
struct SerialRs485 {
    flags: u32,
    delay_rts_before_send: u32,
    delay_rts_after_send: u32,
    padding: [u32; 5],
}

/// Puts the port into RS-485 mode: RTS asserted only while transmitting,
/// deasserted immediately after, and the receiver left enabled so it can
/// see its own echo if the bus is wired that way. Takes the port's raw
/// file descriptor directly, since `serialport`'s object-safe
/// `SerialPort` trait doesn't expose one.
pub fn enable_rs485(fd: RawFd, rts_delay_us: u32) -> Result<(), PlatformError> {
    let mut config = SerialRs485 {
        flags: SER_RS485_ENABLED | SER_RS485_RTS_ON_SEND,
        delay_rts_before_send: rts_delay_us,
        delay_rts_after_send: rts_delay_us,
        ..Default::default()
    };
    // RTS_AFTER_SEND and RX_DURING_TX are explicitly left unset: the bus
    // driver should release the line as soon as the frame is sent, and
    // nothing should be received while this node is transmitting.
    config.flags &= !(SER_RS485_RTS_AFTER_SEND | SER_RS485_RX_DURING_TX);

    let result = unsafe { libc::ioctl(fd, TIOCSRS485 as _, &mut config as *mut SerialRs485) };
    if result != 0 {
        return Err(PlatformError::last_os_error("TIOCSRS485 ioctl failed"));
    }
    Ok(())
}
