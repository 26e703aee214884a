use crate::{
    DS2482_DEFAULT_ADDR, Ds2482, Ds2482Error, Ds2482Result,
    timing::{BUSY_TIMEOUT_MS, PollTimer, RESET_TIMEOUT_MS},
};
use bitfield_struct::bitfield;
use embedded_hal::{
    delay::DelayNs,
    i2c::{I2c, SevenBitAddress},
};
use embedded_onewire::OneWireStatus;
use log::warn;

pub(crate) const READ_PTR_CMD: u8 = 0xe1; // Set the read pointer
pub(crate) const DEVICE_RST_CMD: u8 = 0xf0; // Reset the device
pub(crate) const WRITE_CONFIG_CMD: u8 = 0xd2; // Write the device configuration

/// Registers selectable with the Set Read Pointer command.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    /// Status register, see [`DeviceStatus`].
    Status = 0xf0,
    /// Read data register, holds the result of a 1-Wire Read Byte.
    Data = 0xe1,
    /// Channel selection register (DS2482-800 only).
    Channel = 0xd2,
    /// Device configuration register, see [`DeviceConfiguration`].
    Config = 0xc3,
}

/// Builder for creating a [`Ds2482`] instance with custom configuration.
#[derive(Debug)]
pub struct Ds2482Builder {
    addr: u8,
    busy_timeout: u32,
    reset_timeout: u32,
    config: DeviceConfiguration,
}

impl Default for Ds2482Builder {
    fn default() -> Self {
        Ds2482Builder {
            addr: DS2482_DEFAULT_ADDR,
            busy_timeout: BUSY_TIMEOUT_MS,
            reset_timeout: RESET_TIMEOUT_MS,
            config: DeviceConfiguration::new().with_active_pullup(true),
        }
    }
}

impl Ds2482Builder {
    /// Sets the 7-bit I2C address of the device.
    pub fn with_address(mut self, addr: u8) -> Self {
        self.addr = addr;
        self
    }

    /// Sets the busy-wait budget in milliseconds.
    ///
    /// Every command waits at most this long for the 1-Wire busy flag to clear.
    pub fn with_busy_timeout(mut self, ms: u32) -> Self {
        self.busy_timeout = ms;
        self
    }

    /// Sets the budget in milliseconds for the presence pulse after a 1-Wire reset.
    pub fn with_reset_timeout(mut self, ms: u32) -> Self {
        self.reset_timeout = ms;
        self
    }

    /// Sets the device configuration.
    pub fn with_config(mut self, config: DeviceConfiguration) -> Self {
        self.config = config;
        self
    }

    /// Builds a new `Ds2482` instance: resets the device and writes the configuration.
    pub fn build<I: I2c<SevenBitAddress>, D: DelayNs>(
        self,
        i2c: I,
        delay: D,
    ) -> Ds2482Result<Ds2482<I, D>, I::Error> {
        let mut dev = Ds2482 {
            i2c,
            addr: self.addr,
            delay,
            busy_timeout: self.busy_timeout,
            reset_timeout: self.reset_timeout,
            config: DeviceConfiguration::new(),
        };
        dev.device_reset()?;
        dev.write_config(self.config)?;
        Ok(dev)
    }
}

impl<I: I2c<SevenBitAddress>, D: DelayNs> Ds2482<I, D> {
    /// Get the status of the device.
    pub fn status(&mut self) -> Ds2482Result<DeviceStatus, I::Error> {
        self.read_register(Register::Status).map(DeviceStatus::from_bits)
    }

    /// Reads a register through the read pointer.
    ///
    /// Waits for the 1-Wire line to go idle first, unless the status register is read.
    pub fn read_register(&mut self, reg: Register) -> Ds2482Result<u8, I::Error> {
        if reg != Register::Status {
            self.busy_wait()?;
        }
        let mut val = [0; 1];
        self.i2c
            .write_read(self.addr, &[READ_PTR_CMD, reg as u8], &mut val)?;
        Ok(val[0])
    }

    /// Reset the device.
    ///
    /// Performs a global reset of device state machine logic. Terminates any ongoing 1-Wire
    /// communication. The configuration returns to its all-zero power-on value.
    pub fn device_reset(&mut self) -> Ds2482Result<DeviceStatus, I::Error> {
        self.i2c.write(self.addr, &[DEVICE_RST_CMD])?;
        self.config = DeviceConfiguration::new();
        let mut timer = PollTimer::start();
        match self.poll(&mut timer, self.busy_timeout, |s| s.device_reset())? {
            (status, true) => Ok(status),
            (_, false) => {
                warn!("DS2482 reset not acknowledged after {} ms", timer.elapsed());
                Err(Ds2482Error::Timeout)
            }
        }
    }

    /// Writes the device configuration and verifies the value read back.
    ///
    /// # Errors
    /// [`Ds2482Error::ConfigMismatch`] if the flags read back differ from the written ones.
    pub fn write_config(&mut self, config: DeviceConfiguration) -> Ds2482Result<(), I::Error> {
        self.busy_wait()?;
        let written = config.encode();
        let mut read = [0; 1];
        self.i2c
            .write_read(self.addr, &[WRITE_CONFIG_CMD, written], &mut read)?;
        if !config.matches(read[0]) {
            warn!(
                "DS2482 configuration mismatch: wrote {written:#04x}, read {:#04x}",
                read[0]
            );
            return Err(Ds2482Error::ConfigMismatch {
                written,
                read: read[0],
            });
        }
        // SPU returns to its inactive state on its own
        self.config = config.with_strong_pullup(false);
        Ok(())
    }

    /// Waits for the 1-Wire busy flag to clear.
    ///
    /// Moves the read pointer to the status register and polls it for at most the busy
    /// budget. Returns the last status read.
    pub(crate) fn busy_wait(&mut self) -> Ds2482Result<DeviceStatus, I::Error> {
        self.i2c
            .write(self.addr, &[READ_PTR_CMD, Register::Status as u8])?;
        let mut timer = PollTimer::start();
        match self.poll(&mut timer, self.busy_timeout, |s| !s.busy())? {
            (status, true) => Ok(status),
            (_, false) => {
                warn!("1-Wire busy timeout after {} ms", timer.elapsed());
                Err(Ds2482Error::Timeout)
            }
        }
    }

    /// Reads the status register until `ready` holds or `budget` ticks have elapsed on `timer`.
    ///
    /// The read pointer must already be at the status register. Returns the last status
    /// and whether `ready` was met.
    pub(crate) fn poll(
        &mut self,
        timer: &mut PollTimer,
        budget: u32,
        ready: impl Fn(DeviceStatus) -> bool,
    ) -> Ds2482Result<(DeviceStatus, bool), I::Error> {
        loop {
            let mut val = [0; 1];
            self.i2c.read(self.addr, &mut val)?;
            let status = DeviceStatus::from_bits(val[0]);
            if ready(status) {
                return Ok((status, true));
            }
            if !timer.tick(&mut self.delay, budget) {
                return Ok((status, false));
            }
        }
    }
}

/// Status register for DS2482
///
/// The read-only Status register reports bit-type data from the 1-Wire side, the
/// 1-Wire busy state and the device's own reset state. Every 1-Wire command and the
/// Device Reset command leave the read pointer at this register.
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct DeviceStatus {
    /// 1WB: a 1-Wire command is in progress.
    pub onewire_busy: bool,
    /// PPD: a presence pulse was detected during the last 1-Wire reset.
    pub presence_pulse_detect: bool,
    /// SD: a short was detected during the last 1-Wire reset.
    pub short_detect: bool,
    /// LL: logic level of the 1-Wire line, sampled at every status read.
    pub logic_level: bool,
    /// RST: the device went through an internal reset and awaits its configuration.
    pub device_reset: bool,
    /// SBR: first bit read by a triplet (or the bit of a single-bit command).
    pub single_bit_result: bool,
    /// TSB: second bit read by a triplet.
    pub triplet_second_bit: bool,
    /// DIR: direction written by the third time slot of a triplet.
    pub branch_dir_taken: bool,
}

impl OneWireStatus for DeviceStatus {
    fn presence(&self) -> bool {
        self.presence_pulse_detect()
    }

    fn busy(&self) -> bool {
        self.onewire_busy()
    }

    fn id_bit(&self) -> bool {
        self.single_bit_result()
    }

    fn complement_bit(&self) -> bool {
        self.triplet_second_bit()
    }

    fn direction(&self) -> bool {
        self.branch_dir_taken()
    }
}

/// # Device configuration register
///
/// Three 1-Wire features are selected through this register:
/// - Active Pullup (APU)
/// - Strong Pullup (SPU)
/// - 1-Wire Speed (1WS)
///
/// When written, the upper nibble must carry the complement of the lower nibble,
/// so the register checks its own integrity. On read-back only the lower nibble is
/// significant. SPU returns to its inactive state as soon as the strong pullup has
/// ended. After a device reset the register reads 00h.
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct DeviceConfiguration {
    /// Drive the 1-Wire line high with an active pullup instead of the resistor.
    pub active_pullup: bool,
    __reserved: bool,
    /// Apply the strong pullup after the next 1-Wire byte or bit command.
    pub strong_pullup: bool,
    /// Overdrive speed when set, standard speed otherwise.
    pub onewire_speed: bool,
    #[bits(4)]
    __complement: u8,
}

impl DeviceConfiguration {
    const FLAGS: u8 = 0b0000_1101;

    /// Register byte to write: flags in the lower nibble, their complements in the
    /// upper nibble. The reserved bit is written as 0 and its complement as 1.
    pub const fn encode(self) -> u8 {
        let low = self.into_bits() & Self::FLAGS;
        low | (!low << 4)
    }

    /// Decodes a register byte read back from the device.
    pub const fn decode(byte: u8) -> Self {
        Self::from_bits(byte & 0x0f)
    }

    /// Whether a read-back byte carries exactly these flags and a cleared reserved bit.
    pub const fn matches(self, read: u8) -> bool {
        Self::decode(read).into_bits() == self.into_bits() & Self::FLAGS
    }
}
