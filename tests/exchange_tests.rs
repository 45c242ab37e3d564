// SPDX-License-Identifier: GPL-3.0-only

//! Concurrency tests for the latest-wins frame exchange

use edge_viewer::pipeline::FrameBufferExchange;
use edge_viewer::processing::ProcessedFrame;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Every byte of the frame encodes its sequence; size varies with it too
fn frame(sequence: u64) -> ProcessedFrame {
    let width = 8 + (sequence % 3) as u32 * 8;
    let height = 4 + (sequence % 2) as u32 * 4;
    let value = (sequence % 251) as u8;
    ProcessedFrame::new(
        width,
        height,
        vec![value; (width * height * 4) as usize],
        sequence,
    )
    .unwrap()
}

#[test]
fn test_reader_never_sees_torn_frame() {
    const FRAMES: u64 = 2_000;
    let exchange = FrameBufferExchange::new();
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let exchange = exchange.clone();
        let done = done.clone();
        thread::spawn(move || {
            for sequence in 0..FRAMES {
                exchange.publish(frame(sequence));
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let reader = {
        let exchange = exchange.clone();
        let done = done.clone();
        thread::spawn(move || {
            let mut last_generation = 0;
            let mut reads = 0u64;
            while !done.load(Ordering::SeqCst) || reads == 0 {
                let Some(current) = exchange.latest() else {
                    continue;
                };
                reads += 1;

                // Generations never go backwards
                assert!(current.generation >= last_generation);
                last_generation = current.generation;

                // Buffer, width and height belong to the same publish
                let expected = frame(current.frame.sequence);
                assert_eq!(current.width(), expected.width);
                assert_eq!(current.height(), expected.height);
                assert_eq!(current.pixels(), expected.pixels.as_slice());
            }
            reads
        })
    };

    writer.join().unwrap();
    let reads = reader.join().unwrap();
    assert!(reads > 0);

    let stats = exchange.stats();
    assert_eq!(stats.published, FRAMES);
    assert_eq!(exchange.latest().unwrap().frame.sequence, FRAMES - 1);
    assert!(stats.consumed <= FRAMES);
}

#[test]
fn test_slow_reader_only_sees_latest() {
    let exchange = FrameBufferExchange::new();
    for sequence in 0..10 {
        exchange.publish(frame(sequence));
    }

    let current = exchange.latest().unwrap();
    assert_eq!(current.frame.sequence, 9);
    assert_eq!(current.generation, 10);

    let stats = exchange.stats();
    assert_eq!(stats.overwritten_unread, 9);
    assert_eq!(stats.consumed, 1);
}

#[test]
fn test_generation_unique_per_publish() {
    let exchange = FrameBufferExchange::new();
    let writers: Vec<_> = (0..4)
        .map(|t| {
            let exchange = exchange.clone();
            thread::spawn(move || {
                (0..100)
                    .map(|i| exchange.publish(frame(t * 100 + i)).0)
                    .collect::<Vec<u64>>()
            })
        })
        .collect();

    let mut generations: Vec<u64> = writers
        .into_iter()
        .flat_map(|w| w.join().unwrap())
        .collect();
    generations.sort_unstable();
    generations.dedup();
    assert_eq!(generations.len(), 400);
    assert_eq!(exchange.current_generation(), Some(400));
}

#[test]
fn test_each_generation_counted_once_under_contention() {
    const FRAMES: u64 = 5_000;
    let exchange = FrameBufferExchange::new();
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..2)
        .map(|_| {
            let exchange = exchange.clone();
            let done = done.clone();
            thread::spawn(move || {
                while !done.load(Ordering::SeqCst) {
                    exchange.latest();
                }
            })
        })
        .collect();

    for sequence in 0..FRAMES {
        exchange.publish(frame(sequence));
    }
    done.store(true, Ordering::SeqCst);
    for reader in readers {
        reader.join().unwrap();
    }
    exchange.latest();

    // A generation is either seen by a reader or replaced unseen, never both
    let stats = exchange.stats();
    assert_eq!(stats.published, FRAMES);
    assert_eq!(stats.consumed + stats.overwritten_unread, FRAMES);
}
