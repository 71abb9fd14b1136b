//! Scrolls through a simulated Z-stack with prefetching
//!
//! Run with `RUST_LOG=plane_cache=debug` to see cache decisions.

use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar};
use plane_cache::{CacheConfig, PlaneCoord, PlaneImage, StackDims, TransportError, ViewerSession};
use plane_reporters::FetchProgress;
use plane_tasks::{CommandProcessor, ProcessorConfig};
use tokio::runtime::Handle;

/// Renders a flat gray plane after a simulated network delay
fn render(coord: &PlaneCoord) -> Result<PlaneImage, TransportError> {
    std::thread::sleep(Duration::from_millis(80));
    if coord.z == 13 {
        return Err(TransportError::unavailable("tile server timed out"));
    }
    let value = (coord.z * 8) as u8;
    Ok(PlaneImage::new(*coord, 64, 64, vec![value; 64 * 64]))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Navigating a 24-plane Z-stack ===\n");

    let multi_progress = MultiProgress::new();
    let anchor = multi_progress.add(ProgressBar::hidden());
    let processor =
        CommandProcessor::with_config(ProcessorConfig::for_viewer(), Some(Handle::current()))?
            .with_reporter(FetchProgress::new(multi_progress, anchor));

    let session = ViewerSession::new(
        render,
        StackDims::new(24, 1),
        CacheConfig::from_memory_budget(6 * 64 * 64, 64 * 64)?,
        processor,
    )?;

    for z in 8..16 {
        let coord = PlaneCoord::xy(z, 0);
        let lookup = session.navigate_to(coord);
        let cached = lookup.is_ready();
        let prefetched = session.prefetch(3);

        match lookup.wait().await {
            Ok(image) => println!(
                "{} {} ({} bytes), prefetching {:?}",
                if cached { "hit " } else { "miss" },
                coord,
                image.byte_len(),
                prefetched.iter().map(ToString::to_string).collect::<Vec<_>>()
            ),
            Err(err) => println!("fail {}: {}", coord, err),
        }
    }

    println!("\nReversing direction");
    for z in (4..8).rev() {
        let coord = PlaneCoord::xy(z, 0);
        let lookup = session.navigate_to(coord);
        session.prefetch(2);
        if let Ok(image) = lookup.wait().await {
            println!("{} ready, first pixel {}", coord, image.pixels[0]);
        }
    }

    let stats = session.cache_stats();
    println!(
        "\nCache: {} hits, {} misses, {} evictions, {} cancelled fetches",
        stats.hits, stats.misses, stats.evictions, stats.cancellations
    );
    println!("Resident planes: {:?}", session.cached_planes());

    session.shutdown();
    Ok(())
}
