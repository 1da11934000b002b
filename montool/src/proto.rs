//! Host side of the serial boot protocol.

use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use fpca::boot::{self, BootError, ETX, XON};

/// Builds the complete transfer: header, payload, ETX.
pub fn frame(address: u32, payload: &[u8]) -> Result<Vec<u8>> {
    if let Err(BootError::EtxInPayload { offset }) = boot::check_payload(payload) {
        bail!(
            "image contains ETX ({ETX:#04x}) at offset {offset:#x}, which would \
             end the transfer early; this protocol can't send it"
        );
    }
    let end = u64::from(address) + payload.len() as u64;
    if end > 1 << 32 {
        bail!("image of {} bytes at {address:#x} runs past the end of memory", payload.len());
    }

    let mut out = Vec::with_capacity(payload.len() + 7);
    out.extend_from_slice(&boot::header(address));
    out.extend_from_slice(payload);
    out.push(ETX);
    Ok(out)
}

/// Waits for the bootloader's XON, giving up after `timeout`. Returns whatever
/// the device said before it.
///
/// `port` should have a short read timeout of its own so that we get a chance
/// to check the clock.
pub fn wait_for_xon(port: &mut impl Read, timeout: Duration) -> Result<Vec<u8>> {
    let deadline = Instant::now() + timeout;
    let mut chatter = vec![];
    loop {
        let mut b = [0];
        match port.read(&mut b) {
            Ok(0) => bail!("serial port closed while waiting for XON"),
            Ok(_) if b[0] == XON => return Ok(chatter),
            Ok(_) => chatter.push(b[0]),
            Err(e) if e.kind() == ErrorKind::TimedOut => {}
            Err(e) => return Err(e).context("waiting for XON"),
        }
        if Instant::now() >= deadline {
            bail!(
                "no XON from the bootloader after {timeout:?}; \
                 is SW15 up, and has the board been reset?"
            );
        }
    }
}

/// Copies everything the device sends to `out`, until the port fails.
pub fn echo(port: &mut impl Read, out: &mut impl Write) -> Result<()> {
    loop {
        let mut b = [0];
        match port.read_exact(&mut b) {
            Ok(()) => {
                out.write_all(&b)?;
                out.flush()?;
            }
            Err(e) if e.kind() == ErrorKind::TimedOut => {
                // meh
            }
            Err(e) => return Err(e).context("reading from device"),
        }
    }
}
