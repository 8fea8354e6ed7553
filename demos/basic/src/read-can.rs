/*
 * Copyright (C) 2015-2023 IoT.bzh Company
 * Author: Fulup Ar Foll <fulup@iot.bzh>
 *
 * Redpesk samples code/config use MIT License and can be freely copy/modified even within proprietary code
 * License: $RP_BEGIN_LICENSE$ SPDX:MIT https://opensource.org/licenses/MIT $RP_END_LICENSE$
 *
 * Reads trace lines ("<hex-id>#<hex-payload>") from stdin, injects them
 * into a loopback driver and logs the frames passing the optional filter
 * given as first argument (e.g. "123:7FF" or "100-200").
 */
extern crate canif;
use canif::prelude::*;
use env_logger::Env;
use std::io::BufRead;

fn main() -> Result<(), String> {
    let env = Env::default().default_filter_or("info");
    let _ = env_logger::Builder::from_env(env).format_timestamp_millis().try_init();

    let driver = LoopbackDriver::new();
    if !driver.init("loop0", false) {
        return Err("fail opening loopback driver".to_string());
    }

    let _listener = match std::env::args().nth(1) {
        Some(spec) => {
            let filter = filter_from_spec(&spec)
                .map_err(|error| format!("invalid filter '{spec}' {error}"))?;
            log::info!("listening with filter {spec}");
            driver.subscribe_filtered(
                filter,
                Box::new(|frame| log::info!("matched frame {frame}")),
            )
        }
        None => driver.subscribe(Box::new(|frame| log::info!("received frame {frame}"))),
    };

    log::info!("Waiting for trace lines on stdin");
    for line in std::io::stdin().lock().lines() {
        let line = line.map_err(|error| format!("fail reading stdin {error}"))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let frame = frame_from_string(line);
        if !frame.is_valid() {
            log::warn!("ignoring invalid trace line '{line}'");
            continue;
        }
        driver.inject_frame(&frame);
    }

    driver.shutdown();
    Ok(())
}
