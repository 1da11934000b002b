//! SD card in SPI mode.
//!
//! Based on <http://elm-chan.org/docs/mmc/mmc_e.html> and
//! <http://www.rjhcoding.com/avrc-sd-interface-1.php>. Every wait is a bounded
//! number of polls; nothing is retried except ACMD41 during init, which is
//! expected to take a while.

use embedded_hal::delay::DelayNs;
use ufmt::derive::uDebug;

use crate::mbr::SECTOR_SIZE;
use crate::platform::REFCLK_HZ;
use crate::spi::SpiMaster;

/// SPI clock during init must be 100-400 kHz.
const INIT_SPEED_HZ: u32 = 200_000;
const MAX_SPEED_HZ: u32 = REFCLK_HZ / 2;

pub const THROTTLE_INIT: u8 = (MAX_SPEED_HZ / INIT_SPEED_HZ - 1) as u8;
pub const THROTTLE_RUN: u8 = 0;

const CMD0: u8 = 0;
const CMD0_CRC: u8 = 0x94;
const CMD8: u8 = 8;
const CMD8_ARG: u32 = 0x0000_01AA;
const CMD8_CRC: u8 = 0x86;
const CMD17: u8 = 17;
const CMD24: u8 = 24;
const CMD41: u8 = 41;
const CMD41_HCS: u32 = 0x4000_0000;
const CMD55: u8 = 55;
const CMD58: u8 = 58;
/// CRC is only checked for CMD0 and CMD8 in SPI mode.
const DUMMY_CRC: u8 = 0x00;

const DATA_TOKEN: u8 = 0xFE;
const DATA_ACCEPTED: u8 = 0x05;

/// Polls for an R1 before giving up (NCR is at most 8 bytes).
const R1_POLLS: usize = 9;
const INIT_ATTEMPTS: usize = 100;
const INIT_RETRY_MS: u32 = 10;
const TOKEN_POLLS: usize = 4096;
const BUSY_POLLS: usize = 65536;

/// R1 response: the card's status after every command.
#[derive(Copy, Clone, Debug, Eq, PartialEq, uDebug)]
pub struct R1(pub u8);

impl R1 {
    pub const IDLE: u8 = 0x01;
    pub const ERASE_RESET: u8 = 0x02;
    pub const ILLEGAL_COMMAND: u8 = 0x04;
    pub const CRC_ERROR: u8 = 0x08;
    pub const ERASE_SEQUENCE_ERROR: u8 = 0x10;
    pub const ADDRESS_ERROR: u8 = 0x20;
    pub const PARAMETER_ERROR: u8 = 0x40;

    const NAMES: [(u8, &'static str); 7] = [
        (Self::PARAMETER_ERROR, "parameter error"),
        (Self::ADDRESS_ERROR, "address error"),
        (Self::ERASE_SEQUENCE_ERROR, "erase sequence error"),
        (Self::CRC_ERROR, "CRC error"),
        (Self::ILLEGAL_COMMAND, "illegal command"),
        (Self::ERASE_RESET, "erase reset"),
        (Self::IDLE, "in idle state"),
    ];

    /// No flags at all: initialised and happy.
    pub fn is_ready(self) -> bool {
        self.0 == 0
    }

    pub fn is_idle(self) -> bool {
        self.0 & Self::IDLE != 0
    }

    pub fn illegal_command(self) -> bool {
        self.0 & Self::ILLEGAL_COMMAND != 0
    }

    /// Any flag other than idle.
    pub fn has_errors(self) -> bool {
        self.0 & !Self::IDLE != 0
    }

    /// Names of the flags that are set, for diagnostics.
    pub fn flag_names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMES
            .into_iter()
            .filter(move |&(mask, _)| self.0 & mask != 0)
            .map(|(_, name)| name)
    }
}

/// R7 response to CMD8 (SEND_IF_COND).
#[derive(Copy, Clone, Debug, Eq, PartialEq, uDebug)]
pub struct R7 {
    pub r1: R1,
    pub command_version: u8,
    pub voltage_accepted: u8,
    pub echo: u8,
}

impl R7 {
    fn from_bytes(r1: R1, b: [u8; 4]) -> Self {
        Self {
            r1,
            command_version: b[0] >> 4,
            voltage_accepted: b[2] & 0x0F,
            echo: b[3],
        }
    }

    /// Card runs at 2.7-3.6 V and echoed our check pattern.
    pub fn is_valid(&self) -> bool {
        self.voltage_accepted == 0x01 && self.echo == CMD8_ARG as u8
    }
}

/// Operating conditions register, from CMD58.
#[derive(Copy, Clone, Debug, Eq, PartialEq, uDebug)]
pub struct Ocr(pub u32);

impl Ocr {
    /// Card has finished powering up; the other bits are only valid once
    /// this is set.
    pub fn powered_up(self) -> bool {
        self.0 & (1 << 31) != 0
    }

    /// Card capacity status: set for SDHC/SDXC, which are block addressed.
    pub fn high_capacity(self) -> bool {
        self.0 & (1 << 30) != 0
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, uDebug)]
pub enum CardKind {
    /// Version 1 card, byte addressed.
    SdV1,
    /// Version 2 standard capacity, byte addressed.
    SdV2,
    /// Version 2 high capacity, block addressed.
    SdHc,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, uDebug)]
pub enum SdError {
    /// Card never answered.
    Timeout,
    /// Card answered `cmd` with an R1 we didn't want.
    Command { cmd: u8, r1: R1 },
    /// CMD8 came back with the wrong voltage or check pattern.
    InterfaceCondition(R7),
    /// ACMD41 never reported the card ready.
    InitTimeout,
    /// Card claimed to be ready but its OCR disagrees.
    NotPoweredUp,
    /// Block access before `init`.
    NotInitialized,
    /// Block number beyond what a byte-addressed card can reach.
    AddressOutOfRange(u32),
    /// Expected a data token, got this instead.
    BadToken(u8),
    /// Card refused written data; this is its data response.
    WriteRejected(u8),
    /// Card stayed busy after a write.
    BusyTimeout,
}

pub struct SdCard<S, D> {
    spi: S,
    delay: D,
    kind: Option<CardKind>,
}

impl<S: SpiMaster, D: DelayNs> SdCard<S, D> {
    pub fn new(spi: S, delay: D) -> Self {
        Self { spi, delay, kind: None }
    }

    pub fn release(self) -> (S, D) {
        (self.spi, self.delay)
    }

    pub fn kind(&self) -> Option<CardKind> {
        self.kind
    }

    /// Slows the clock and gives the card its 74+ clocks with CS high, which
    /// puts it in native mode ready for CMD0.
    pub fn power_up(&mut self) {
        self.spi.set_throttle(THROTTLE_INIT);
        self.delay.delay_ms(1);
        self.spi.write_byte(0xFF);
        self.spi.deselect();
        self.spi.write_byte(0xFF);
        for _ in 0..10 {
            self.spi.write_byte(0xFF);
        }
    }

    /// Sends a command frame. `crc` is the 7-bit CRC in the top bits; the
    /// stop bit is added here.
    pub fn command(&mut self, cmd: u8, arg: u32, crc: u8) {
        self.spi.write_byte(0x40 | cmd);
        self.spi.write_bytes(&arg.to_be_bytes());
        self.spi.write_byte(crc | 0x01);
    }

    pub fn response_r1(&mut self) -> Result<R1, SdError> {
        for _ in 0..R1_POLLS {
            let b = self.spi.read_byte();
            if b != 0xFF {
                return Ok(R1(b));
            }
        }
        Err(SdError::Timeout)
    }

    /// R1 followed by four more bytes (R3 and R7 share this shape).
    pub fn response_r3r7(&mut self) -> Result<(R1, [u8; 4]), SdError> {
        let r1 = self.response_r1()?;
        let mut rest = [0; 4];
        self.spi.read_bytes(&mut rest);
        Ok((r1, rest))
    }

    /// Runs `body` with CS asserted, padded by a byte of clocks either side so
    /// the card sees the edges. CS is released whatever `body` returns.
    fn framed<T>(&mut self, body: impl FnOnce(&mut Self) -> Result<T, SdError>) -> Result<T, SdError> {
        self.spi.write_byte(0xFF);
        self.spi.select();
        self.spi.write_byte(0xFF);
        let result = body(self);
        self.spi.write_byte(0xFF);
        self.spi.deselect();
        self.spi.write_byte(0xFF);
        result
    }

    /// CMD0: software reset into SPI mode.
    pub fn go_idle_state(&mut self) -> Result<R1, SdError> {
        self.framed(|c| {
            c.command(CMD0, 0, CMD0_CRC);
            c.response_r1()
        })
    }

    /// CMD8: tell the card our voltage range; only v2 cards understand it.
    pub fn send_interface_condition(&mut self) -> Result<R7, SdError> {
        self.framed(|c| {
            c.command(CMD8, CMD8_ARG, CMD8_CRC);
            let (r1, rest) = c.response_r3r7()?;
            Ok(R7::from_bytes(r1, rest))
        })
    }

    /// CMD58: read the OCR.
    pub fn read_ocr(&mut self) -> Result<(R1, Ocr), SdError> {
        self.framed(|c| {
            c.command(CMD58, 0, DUMMY_CRC);
            let (r1, rest) = c.response_r3r7()?;
            Ok((r1, Ocr(u32::from_be_bytes(rest))))
        })
    }

    /// CMD55: the next command is application specific.
    pub fn app_cmd(&mut self) -> Result<R1, SdError> {
        self.framed(|c| {
            c.command(CMD55, 0, DUMMY_CRC);
            c.response_r1()
        })
    }

    /// ACMD41: start initialisation, optionally announcing that we can handle
    /// high capacity cards.
    pub fn send_op_cond(&mut self, high_capacity: bool) -> Result<R1, SdError> {
        let r1 = self.app_cmd()?;
        if r1.has_errors() {
            return Err(SdError::Command { cmd: CMD55, r1 });
        }
        let arg = if high_capacity { CMD41_HCS } else { 0 };
        self.framed(|c| {
            c.command(CMD41, arg, DUMMY_CRC);
            c.response_r1()
        })
    }

    /// The whole bring-up sequence. On success the clock is at full speed and
    /// block I/O is available.
    pub fn init(&mut self) -> Result<CardKind, SdError> {
        self.kind = None;
        self.power_up();

        let r1 = self.go_idle_state()?;
        if r1 != R1(R1::IDLE) {
            return Err(SdError::Command { cmd: CMD0, r1 });
        }

        let r7 = self.send_interface_condition()?;
        let v1 = r7.r1.illegal_command();
        if !v1 && !r7.is_valid() {
            return Err(SdError::InterfaceCondition(r7));
        }

        let mut ready = false;
        for _ in 0..INIT_ATTEMPTS {
            let r1 = self.send_op_cond(!v1)?;
            if r1.is_ready() {
                ready = true;
                break;
            }
            if r1.has_errors() {
                return Err(SdError::Command { cmd: CMD41, r1 });
            }
            self.delay.delay_ms(INIT_RETRY_MS);
        }
        if !ready {
            return Err(SdError::InitTimeout);
        }

        let kind = if v1 {
            CardKind::SdV1
        } else {
            let (r1, ocr) = self.read_ocr()?;
            if r1.has_errors() {
                return Err(SdError::Command { cmd: CMD58, r1 });
            }
            if !ocr.powered_up() {
                return Err(SdError::NotPoweredUp);
            }
            if ocr.high_capacity() {
                CardKind::SdHc
            } else {
                CardKind::SdV2
            }
        };

        self.spi.set_throttle(THROTTLE_RUN);
        self.kind = Some(kind);
        Ok(kind)
    }

    fn block_address(&self, lba: u32) -> Result<u32, SdError> {
        match self.kind {
            None => Err(SdError::NotInitialized),
            Some(CardKind::SdHc) => Ok(lba),
            Some(_) => lba
                .checked_mul(SECTOR_SIZE as u32)
                .ok_or(SdError::AddressOutOfRange(lba)),
        }
    }

    fn expect_ready(&mut self, cmd: u8) -> Result<(), SdError> {
        let r1 = self.response_r1()?;
        if r1.is_ready() {
            Ok(())
        } else {
            Err(SdError::Command { cmd, r1 })
        }
    }

    /// First byte other than `0xFF`, within `polls` reads.
    fn poll_not_ff(&mut self, polls: usize) -> Option<u8> {
        (0..polls).map(|_| self.spi.read_byte()).find(|&b| b != 0xFF)
    }

    /// CMD17: read one 512-byte block.
    pub fn read_block(&mut self, lba: u32, buf: &mut [u8; SECTOR_SIZE]) -> Result<(), SdError> {
        let addr = self.block_address(lba)?;
        self.framed(|c| {
            c.command(CMD17, addr, DUMMY_CRC);
            c.expect_ready(CMD17)?;
            match c.poll_not_ff(TOKEN_POLLS) {
                Some(DATA_TOKEN) => {}
                Some(token) => return Err(SdError::BadToken(token)),
                None => return Err(SdError::Timeout),
            }
            c.spi.read_bytes(buf);
            // CRC, unchecked.
            let mut crc = [0; 2];
            c.spi.read_bytes(&mut crc);
            Ok(())
        })
    }

    /// CMD24: write one 512-byte block and wait for the card to finish.
    pub fn write_block(&mut self, lba: u32, data: &[u8; SECTOR_SIZE]) -> Result<(), SdError> {
        let addr = self.block_address(lba)?;
        self.framed(|c| {
            c.command(CMD24, addr, DUMMY_CRC);
            c.expect_ready(CMD24)?;
            c.spi.write_byte(0xFF);
            c.spi.write_byte(DATA_TOKEN);
            c.spi.write_bytes(data);
            c.spi.write_bytes(&[0xFF, 0xFF]);

            let response = c.poll_not_ff(TOKEN_POLLS).ok_or(SdError::Timeout)?;
            if response & 0x1F != DATA_ACCEPTED {
                return Err(SdError::WriteRejected(response));
            }
            // Card holds MISO low while it programs.
            for _ in 0..BUSY_POLLS {
                if c.spi.read_byte() != 0x00 {
                    return Ok(());
                }
            }
            Err(SdError::BusyTimeout)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i2c::testing::NoDelay;
    use crate::spi::testing::{Event, ScriptedSpi};

    /// Replies for a successful SDHC init, answering ACMD41 on the second try.
    const SDHC_INIT: &[u8] = &[
        0xFF, 0x01, // CMD0, after one idle byte
        0x01, 0x00, 0x00, 0x01, 0xAA, // CMD8
        0x01, 0x01, // CMD55, ACMD41: still idle
        0x01, 0x00, // CMD55, ACMD41: ready
        0x00, 0xC0, 0xFF, 0x80, 0x00, // CMD58
    ];

    fn card(replies: &[u8]) -> SdCard<ScriptedSpi, NoDelay> {
        SdCard::new(ScriptedSpi::replying(replies), NoDelay)
    }

    fn initialised(kind_replies: &[u8]) -> SdCard<ScriptedSpi, NoDelay> {
        let mut c = card(kind_replies);
        c.init().unwrap();
        c.spi.log.clear();
        c
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn throttle_for_init() {
        assert_eq!(THROTTLE_INIT, 124);
    }

    #[test]
    fn sdhc_init_sequence() {
        let mut c = card(SDHC_INIT);
        assert_eq!(c.init(), Ok(CardKind::SdHc));
        assert_eq!(c.kind(), Some(CardKind::SdHc));

        let spi = c.release().0;
        assert_eq!(spi.log.first(), Some(&Event::Throttle(THROTTLE_INIT)));
        assert_eq!(spi.log.last(), Some(&Event::Throttle(THROTTLE_RUN)));
        assert!(spi.replies.is_empty());

        let w = spi.written();
        assert!(contains(&w, &[0x40, 0, 0, 0, 0, 0x95]));
        assert!(contains(&w, &[0x48, 0, 0, 0x01, 0xAA, 0x87]));
        assert!(contains(&w, &[0x69, 0x40, 0, 0, 0, 0x01]));
        assert!(contains(&w, &[0x7A, 0, 0, 0, 0, 0x01]));
        // 74+ clocks with CS high before anything else.
        let selected_at = spi.log.iter().position(|e| *e == Event::Select).unwrap();
        let clocks = spi.log[..selected_at]
            .iter()
            .filter(|e| **e == Event::Write(0xFF))
            .count();
        assert!(clocks * 8 >= 74);
    }

    #[test]
    fn v1_card_skips_ocr() {
        let mut c = card(&[0x01, 0x05, 0, 0, 0, 0, 0x01, 0x00]);
        assert_eq!(c.init(), Ok(CardKind::SdV1));
        // No HCS bit for a v1 card.
        assert!(contains(&c.release().0.written(), &[0x69, 0, 0, 0, 0, 0x01]));
    }

    #[test]
    fn no_card_times_out() {
        let mut c = card(&[]);
        assert_eq!(c.init(), Err(SdError::Timeout));
        let spi = c.release().0;
        let reads = spi.log.iter().filter(|e| matches!(e, Event::Read(_))).count();
        assert_eq!(reads, R1_POLLS);
        assert_eq!(spi.log.last(), Some(&Event::Write(0xFF)));
        assert!(spi.log.contains(&Event::Deselect));
    }

    #[test]
    fn bad_voltage_is_reported() {
        let mut c = card(&[0x01, 0x01, 0x00, 0x00, 0x02, 0xAA]);
        match c.init() {
            Err(SdError::InterfaceCondition(r7)) => assert_eq!(r7.voltage_accepted, 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn acmd41_gives_up() {
        let mut replies = SDHC_INIT[..7].to_vec();
        for _ in 0..INIT_ATTEMPTS {
            replies.extend_from_slice(&[0x01, 0x01]);
        }
        let mut c = card(&replies);
        assert_eq!(c.init(), Err(SdError::InitTimeout));
        assert_eq!(c.kind(), None);
    }

    #[test]
    fn read_block_sdhc() {
        let mut replies = SDHC_INIT.to_vec();
        replies.extend_from_slice(&[0x00, 0xFF, 0xFF, DATA_TOKEN]);
        replies.extend((0..SECTOR_SIZE).map(|i| i as u8));
        replies.extend_from_slice(&[0x12, 0x34]);
        let mut c = initialised(&replies);

        let mut buf = [0; SECTOR_SIZE];
        c.read_block(5, &mut buf).unwrap();
        assert_eq!(buf[0], 0);
        assert_eq!(buf[511], 255);
        let spi = c.release().0;
        assert!(contains(&spi.written(), &[0x51, 0, 0, 0, 5, 0x01]));
        assert!(spi.replies.is_empty());
    }

    #[test]
    fn standard_capacity_uses_byte_addresses() {
        let mut replies = SDHC_INIT.to_vec();
        // OCR without CCS.
        replies[12] = 0x80;
        replies.extend_from_slice(&[0x00, DATA_TOKEN]);
        let mut c = initialised(&replies);
        assert_eq!(c.kind(), Some(CardKind::SdV2));
        let mut buf = [0; SECTOR_SIZE];
        c.read_block(5, &mut buf).unwrap();
        assert!(contains(&c.release().0.written(), &[0x51, 0, 0, 0x0A, 0x00, 0x01]));
    }

    #[test]
    fn byte_addressed_card_past_4gib() {
        let mut replies = SDHC_INIT.to_vec();
        replies[12] = 0x80;
        let mut c = initialised(&replies);
        let mut buf = [0; SECTOR_SIZE];
        assert_eq!(
            c.read_block(0x0080_0000, &mut buf),
            Err(SdError::AddressOutOfRange(0x0080_0000))
        );
        assert_eq!(
            c.write_block(0xFFFF_FFFF, &buf),
            Err(SdError::AddressOutOfRange(0xFFFF_FFFF))
        );
        // Last reachable block still goes out.
        assert!(c.read_block(0x007F_FFFF, &mut buf).is_err());
        assert!(contains(&c.release().0.written(), &[0x51, 0xFF, 0xFF, 0xFE, 0x00, 0x01]));
    }

    #[test]
    fn read_error_token_releases_card() {
        let mut replies = SDHC_INIT.to_vec();
        replies.extend_from_slice(&[0x00, 0x08]);
        let mut c = initialised(&replies);
        let mut buf = [0; SECTOR_SIZE];
        assert_eq!(c.read_block(0, &mut buf), Err(SdError::BadToken(0x08)));
        let log = c.release().0.log;
        assert_eq!(log[log.len() - 2], Event::Deselect);
    }

    #[test]
    fn block_io_needs_init() {
        let mut c = card(&[]);
        let mut buf = [0; SECTOR_SIZE];
        assert_eq!(c.read_block(0, &mut buf), Err(SdError::NotInitialized));
        assert_eq!(c.write_block(0, &buf), Err(SdError::NotInitialized));
        assert!(c.release().0.log.is_empty());
    }

    #[test]
    fn write_block_waits_for_busy() {
        let mut replies = SDHC_INIT.to_vec();
        replies.extend_from_slice(&[0x00, 0xFF, 0xE5, 0x00, 0x00, 0xFF]);
        let mut c = initialised(&replies);
        let data = [0xA5; SECTOR_SIZE];
        assert_eq!(c.write_block(7, &data), Ok(()));
        let spi = c.release().0;
        let w = spi.written();
        assert!(contains(&w, &[0x58, 0, 0, 0, 7, 0x01]));
        assert!(contains(&w, &[DATA_TOKEN, 0xA5, 0xA5]));
        assert!(spi.replies.is_empty());
    }

    #[test]
    fn write_rejected() {
        let mut replies = SDHC_INIT.to_vec();
        replies.extend_from_slice(&[0x00, 0x0B]);
        let mut c = initialised(&replies);
        assert_eq!(c.write_block(0, &[0; SECTOR_SIZE]), Err(SdError::WriteRejected(0x0B)));
    }

    #[test]
    fn r1_flags() {
        let names: Vec<_> = R1(0x05).flag_names().collect();
        assert_eq!(names, ["illegal command", "in idle state"]);
        assert!(R1(0x01).is_idle() && !R1(0x01).has_errors());
        assert!(R1(0x00).is_ready());
        assert!(R1(0x41).has_errors());
    }
}
