// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! - Listing available cameras
//! - Running the pipeline without a window

use edge_viewer::backends::camera::{PermissionStatus, create_backend};
use edge_viewer::config::Config;
use edge_viewer::constants::timing;
use edge_viewer::pipeline::{
    FrameBufferExchange, FrameRateCounter, NoticeKind, PipelineController, PipelineEvent,
    PipelineState,
};
use edge_viewer::snapshot;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

/// List all available cameras
pub fn list_cameras(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let backend = create_backend(config);
    let cameras = backend.enumerate_cameras();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras ({}):", backend.name());
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        println!("  [{}] {}", index, camera.name);
        println!("      Path: {}", camera.path);
        if let Some(location) = camera.location.as_deref() {
            println!("      Location: {}", location);
        }
        if backend.check_permission(camera) == PermissionStatus::Denied {
            println!("      Permission denied");
        }
        println!();
    }

    Ok(())
}

/// Run capture and processing for `duration` seconds with a simulated
/// display reading the exchange at the display rate
pub fn headless(
    config: &Config,
    duration: u64,
    snapshot_on_exit: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let (sender, receiver) = mpsc::channel::<PipelineEvent>();
    let exchange = FrameBufferExchange::new();
    let mut controller =
        PipelineController::from_config(config, exchange.clone(), Arc::new(sender));

    println!(
        "Running {} for {}s (Ctrl+C to stop)...",
        config.processor.display_name(),
        duration
    );
    controller.surface_created();

    let start = Instant::now();
    let limit = Duration::from_secs(duration);
    let mut next_draw = start;
    let mut last_drawn: Option<u64> = None;
    let mut frames_ready = 0u64;
    let mut draws = 0u64;
    let mut uploads = 0u64;
    let mut processed_fps = FrameRateCounter::default();
    let mut failure: Option<String> = None;

    while running.load(Ordering::SeqCst) && start.elapsed() < limit {
        while let Ok(event) = receiver.try_recv() {
            controller.handle_event(&event);
            match event {
                PipelineEvent::FrameReady { .. } => {
                    frames_ready += 1;
                    if let Some(rate) = processed_fps.tick(Instant::now()) {
                        print!("\rProcessing at {:.1} fps   ", rate);
                        let _ = std::io::stdout().flush();
                    }
                }
                PipelineEvent::Notice(notice) => match notice.kind {
                    NoticeKind::Info => println!("\n{}", notice.message),
                    NoticeKind::Error => {
                        eprintln!("\nError: {}", notice.message);
                        failure = Some(notice.message);
                    }
                },
                PipelineEvent::SessionConfigured { .. } | PipelineEvent::SessionFailed { .. } => {}
            }
        }

        if failure.is_some() && controller.state() == PipelineState::Stopped {
            break;
        }

        let now = Instant::now();
        if now >= next_draw {
            draws += 1;
            let current = exchange.latest().map(|d| d.generation);
            if current.is_some() && current != last_drawn {
                uploads += 1;
                last_drawn = current;
            }
            next_draw += timing::HEADLESS_DRAW_INTERVAL;
        }
        std::thread::sleep(Duration::from_millis(2));
    }

    let elapsed = start.elapsed().as_secs_f32();
    let latest = exchange.latest();
    controller.pause();

    let stats = exchange.stats();
    println!();
    println!("Ran for {:.1}s", elapsed);
    println!("  Frames processed: {}", stats.published);
    println!("  Frames never drawn: {}", stats.overwritten_unread);
    println!("  Redraw requests: {}", frames_ready);
    println!("  Draw ticks: {} ({} uploads)", draws, uploads);
    if elapsed > 0.0 {
        println!(
            "  Average processing rate: {:.1} fps",
            stats.published as f32 / elapsed
        );
    }

    if snapshot_on_exit {
        match latest {
            Some(current) => {
                let path = snapshot::save_png(&current.frame, &config.snapshot_dir())?;
                println!("Snapshot saved: {}", path.display());
            }
            None => println!("No frame to save."),
        }
    }

    controller.shutdown();

    match failure {
        Some(message) => Err(message.into()),
        None => Ok(()),
    }
}
