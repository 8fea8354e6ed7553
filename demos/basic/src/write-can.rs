/*
 * Copyright (C) 2015-2023 IoT.bzh Company
 * Author: Fulup Ar Foll <fulup@iot.bzh>
 *
 * Redpesk samples code/config use MIT License and can be freely copy/modified even within proprietary code
 * License: $RP_BEGIN_LICENSE$ SPDX:MIT https://opensource.org/licenses/MIT $RP_END_LICENSE$
 *
 * Sends every trace line given as argument through a loopback driver and
 * logs the echoed frames.
 */
extern crate canif;
use canif::prelude::*;
use env_logger::Env;

fn main() -> Result<(), String> {
    let env = Env::default().default_filter_or("info");
    let _ = env_logger::Builder::from_env(env).format_timestamp_millis().try_init();

    let driver = LoopbackDriver::new();
    if !driver.init("loop0", true) {
        return Err("fail opening loopback driver".to_string());
    }

    let _state_listener = driver.subscribe_state(Box::new(|state| {
        log::info!("driver state {:?} errno:{:?}", state.driver_state, state.error_code)
    }));
    let _echo_listener =
        driver.subscribe(Box::new(|frame| log::info!("echoed frame {frame}")));

    for text in std::env::args().skip(1) {
        let frame = frame_from_string(&text);
        if !frame.is_valid() {
            log::warn!("skipping invalid trace text '{text}'");
            continue;
        }
        if !driver.send(&frame) {
            return Err(format!("driver rejected frame '{text}'"));
        }
    }

    driver.shutdown();
    Ok(())
}
