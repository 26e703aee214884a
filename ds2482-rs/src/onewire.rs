use crate::{
    Ds2482, Ds2482Error,
    registers::{DeviceStatus, Register},
    timing::PollTimer,
};
use embedded_hal::{
    delay::DelayNs,
    i2c::{I2c, SevenBitAddress},
};
use embedded_onewire::{OneWire, OneWireResult, OneWireStatus};
use log::{debug, warn};

pub(crate) const ONEWIRE_RESET_CMD: u8 = 0xb4;
pub(crate) const ONEWIRE_WRITE_BYTE: u8 = 0xa5;
pub(crate) const ONEWIRE_READ_BYTE: u8 = 0x96;
pub(crate) const ONEWIRE_TRIPLET: u8 = 0x78;

impl<I2C: I2c<SevenBitAddress>, D: DelayNs> OneWire for Ds2482<I2C, D> {
    type Status = DeviceStatus;

    type BusError = Ds2482Error<I2C::Error>;

    /// Issues a 1-Wire reset and reports the presence pulse.
    ///
    /// Waits for the presence pulse within the reset budget and for the reset cycle to
    /// end within the busy budget, both counted from the reset command.
    ///
    /// The presence reported is the PPD bit of the last status read, once the bus is idle.
    /// A presence pulse that shows up after the reset budget but before the cycle ends
    /// still counts; the reset budget only bounds how long presence is waited for.
    fn reset(&mut self) -> OneWireResult<bool, Self::BusError> {
        match self.busy_wait() {
            Ok(_) => {}
            Err(Ds2482Error::Timeout) => return Ok(false),
            Err(e) => return Err(e.into()),
        }
        self.i2c
            .write(self.addr, &[ONEWIRE_RESET_CMD])
            .map_err(Ds2482Error::I2c)?;
        let mut timer = PollTimer::start();
        let (_, presence) = self.poll(&mut timer, self.reset_timeout, |s| {
            s.presence_pulse_detect()
        })?;
        let (status, idle) = self.poll(&mut timer, self.busy_timeout, |s| !s.busy())?;
        if !idle {
            warn!("1-Wire reset still busy after {} ms", timer.elapsed());
            return Ok(false);
        }
        if !presence {
            debug!("No presence pulse within {} ms", self.reset_timeout);
        }
        Ok(status.presence_pulse_detect())
    }

    /// Repeats whole reset cycles, one tick apart, until a presence pulse is seen or
    /// the reset budget has elapsed between attempts.
    fn reset_wait(&mut self) -> OneWireResult<bool, Self::BusError> {
        let mut timer = PollTimer::start();
        loop {
            if self.reset()? {
                return Ok(true);
            }
            if !timer.tick(&mut self.delay, self.reset_timeout) {
                warn!("No presence after {} reset attempts", timer.elapsed() + 1);
                return Ok(false);
            }
        }
    }

    fn write_byte(&mut self, byte: u8) -> OneWireResult<(), Self::BusError> {
        self.busy_wait()?;
        self.i2c
            .write(self.addr, &[ONEWIRE_WRITE_BYTE, byte])
            .map_err(Ds2482Error::I2c)?;
        Ok(())
    }

    fn read_byte(&mut self) -> OneWireResult<u8, Self::BusError> {
        self.busy_wait()?;
        self.i2c
            .write(self.addr, &[ONEWIRE_READ_BYTE])
            .map_err(Ds2482Error::I2c)?;
        Ok(self.read_register(Register::Data)?)
    }

    fn triplet(&mut self, direction: bool) -> OneWireResult<Self::Status, Self::BusError> {
        self.busy_wait()?;
        self.i2c
            .write(
                self.addr,
                &[ONEWIRE_TRIPLET, { if direction { 0x80 } else { 0x0 } }],
            )
            .map_err(Ds2482Error::I2c)?;
        Ok(self.busy_wait()?)
    }

    fn strong_pullup(&mut self) -> OneWireResult<(), Self::BusError> {
        let config = self.config.with_strong_pullup(true);
        self.write_config(config)?;
        Ok(())
    }
}
