/*
 * Copyright (C) 2015-2023 IoT.bzh Company
 * Author: Fulup Ar Foll <fulup@iot.bzh>
 *
 * Redpesk interface code/config use MIT License and can be freely copy/modified even within proprietary code
 * License: $RP_BEGIN_LICENSE$ SPDX:MIT https://opensource.org/licenses/MIT $RP_END_LICENSE$
 *
 * Concurrency contract of the dispatch registry: one producer thread
 * publishing while consumer threads subscribe and release handles.
*/
use canif::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

#[test]
fn release_during_publish_stops_delivery() {
    let driver = Arc::new(LoopbackDriver::new());
    driver.init("loop0", false);

    let frame = frame_from_string("123#deadbeef");
    let stop = Arc::new(AtomicBool::new(false));

    let producer = {
        let driver = Arc::clone(&driver);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            while !stop.load(Ordering::SeqCst) {
                driver.inject_frame(&frame);
            }
        })
    };

    // subscribers come and go while frames keep flowing; after a handle
    // drop returns its counter must never move again
    for _ in 0..100 {
        let counter = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&counter);
        let handle = driver.subscribe(Box::new(move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
        }));
        thread::yield_now();
        drop(handle);

        let frozen = counter.load(Ordering::SeqCst);
        for _ in 0..50 {
            thread::yield_now();
        }
        assert_eq!(counter.load(Ordering::SeqCst), frozen);
    }

    stop.store(true, Ordering::SeqCst);
    producer.join().unwrap();
}

#[test]
fn concurrent_subscribers_each_see_their_frames() {
    let driver = Arc::new(LoopbackDriver::new());
    driver.init("loop0", true);

    let mut consumers = Vec::new();
    for id in 0x100u32..0x108 {
        let driver = Arc::clone(&driver);
        consumers.push(thread::spawn(move || {
            let counter = Arc::new(AtomicUsize::new(0));
            let sink = Arc::clone(&counter);
            let _handle = driver.subscribe_filtered(
                filter_from_id(id),
                Box::new(move |_| {
                    sink.fetch_add(1, Ordering::SeqCst);
                }),
            );

            let frame = CanFrame::with_data(CanHeader::standard(id, false), &[1, 2]);
            for _ in 0..20 {
                assert!(driver.send(&frame));
            }
            counter.load(Ordering::SeqCst)
        }));
    }

    for consumer in consumers {
        // every consumer saw at least its own 20 sends
        assert!(consumer.join().unwrap() >= 20);
    }
}
