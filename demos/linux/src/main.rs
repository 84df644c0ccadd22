//! # AHT20 on a Linux I2C bus.
//!
//! Prints a temperature and humidity reading every 5 seconds.
//!
//! Run with `cargo run -- [BUS]`, where `BUS` is the N in `/dev/i2c-N`. Defaults to 1, the bus on
//! the Raspberry Pi header.
use std::{env, process};

use aht20_session::{Aht20, Config, LinuxBus, Rounding};
use embedded_hal::delay::DelayNs;
use linux_embedded_hal::Delay;

fn main() {
    let bus = match env::args().nth(1).map(|arg| arg.parse::<u8>()) {
        None => 1,
        Some(Ok(bus)) => bus,
        Some(Err(_)) => {
            eprintln!("usage: aht20_linux_demo [BUS]");
            process::exit(1);
        }
    };

    let mut delay = Delay;
    let mut aht20 = Aht20::new(LinuxBus, Config::new(bus));
    if let Err(err) = aht20.init(&mut delay) {
        eprintln!("Couldn't initialize aht20 on /dev/i2c-{}: {}", bus, err);
        process::exit(1);
    }

    loop {
        let temperature = match aht20.get_temperature(&mut delay) {
            Ok(reading) => reading,
            Err(err) => {
                eprintln!("error reading aht20: {}", err);
                process::exit(1);
            }
        };
        if !temperature.is_valid() {
            println!("CRC failed while getting temperature");
        }

        let humidity = match aht20.get_humidity(&mut delay) {
            Ok(reading) => reading,
            Err(err) => {
                eprintln!("error reading aht20: {}", err);
                process::exit(1);
            }
        };
        if !humidity.is_valid() {
            println!("CRC failed while getting humidity");
        }

        let celsius = temperature.value;
        println!(
            "Temp: {}C {}F",
            Rounding::Truncate.apply(celsius),
            Rounding::Truncate.apply(aht20_session::celsius_to_fahrenheit(celsius))
        );
        println!("Relative Humidity: {:.2}%", humidity.value);

        delay.delay_ms(5_000);
    }
}
