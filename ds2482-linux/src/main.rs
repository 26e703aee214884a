use std::{thread::sleep, time::Duration};

use clap::Parser;
use ds2482::{DeviceConfiguration, Ds2482Builder};
use ds18b20::{Ds18b20Group, ReadoutResolution};

/// Reads every DS18B20 sensor behind a DS2482 bridge
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to I2C bus (e.g., /dev/i2c-1)
    #[arg(short, long)]
    path: String,
    /// 7-bit I2C address of the bridge
    #[arg(short, long, default_value_t = ds2482::DS2482_DEFAULT_ADDR, value_parser = parse_addr)]
    address: u8,
    /// Busy wait budget, in milliseconds
    #[arg(long, default_value_t = 10)]
    busy_timeout: u32,
    /// Presence pulse wait budget, in milliseconds
    #[arg(long, default_value_t = 5)]
    reset_timeout: u32,
    /// Readout resolution in bits (9 to 12)
    #[arg(short, long, default_value_t = 9, value_parser = clap::value_parser!(u8).range(9..=12))]
    resolution: u8,
    /// Pause between two read cycles, in milliseconds
    #[arg(short, long, default_value_t = 1000)]
    interval: u64,
}

fn parse_addr(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x") {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| e.to_string())
}

fn main() {
    // Initialize the logger
    env_logger::init();
    // Parse command line arguments
    let args = Args::parse();
    // Open the I2C bus
    let i2c = linux_embedded_hal::I2cdev::new(&args.path).expect("Failed to open I2C device");
    // Create a DS2482 instance
    let mut ds2482 = Ds2482Builder::default()
        .with_address(args.address)
        .with_busy_timeout(args.busy_timeout)
        .with_reset_timeout(args.reset_timeout)
        .with_config(DeviceConfiguration::new().with_active_pullup(true))
        .build(i2c, linux_embedded_hal::Delay)
        .expect("Failed to create DS2482 instance");
    // Create a DS18B20 temperature sensor group
    let resolution =
        ReadoutResolution::try_from(args.resolution).expect("Invalid readout resolution");
    let mut sensors = Ds18b20Group::<16>::default().with_resolution(resolution);
    let mut delay = linux_embedded_hal::Delay;
    let mut discover = true;
    loop {
        if discover {
            // Enumerate devices on the 1-Wire bus
            match sensors.enumerate(&mut ds2482, &mut delay) {
                Ok(devices) => {
                    log::info!("Configured {devices} sensors");
                    discover = devices == 0;
                }
                Err(e) => log::error!("Failed to configure sensors: {e:?}"),
            }
        }
        if !discover {
            match sensors
                .read_temperatures(&mut ds2482, &mut delay)
                .map(<[u16]>::to_vec)
            {
                Ok(temps) => {
                    for (rom, temp) in sensors.ids().iter().zip(temps) {
                        log::info!("ROM: {rom:016X}, Temperature: {temp} °C");
                    }
                }
                Err(e) => {
                    log::error!("Failed to read temperatures: {e:?}");
                    discover = true;
                }
            }
        }
        sleep(Duration::from_millis(args.interval));
    }
}
