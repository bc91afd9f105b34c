//! Replay onto a real vcan interface with can-utils.
//!
//! Requires passwordless sudo, the vcan module, canplayer and candump;
//! skipped otherwise.

mod common;

use std::time::Duration;

use vcan_harness::FrameCapture;
use vcan_sim::{Iterations, SimulateOptions, VirtualizeOptions, simulate_can, virtualize_can};

#[tokio::test]
async fn test_default_log_replays_onto_target_interface() {
    if common::skip_without_replay() {
        return;
    }

    let iface = common::claim_iface("vcr");
    virtualize_can(Some(&iface.name), &VirtualizeOptions::default())
        .await
        .expect("virtualize");

    let capture = FrameCapture::start(&iface.name).expect("start candump");
    // candump needs a moment to bind before frames go out.
    tokio::time::sleep(Duration::from_millis(300)).await;

    let options = SimulateOptions {
        interface: iface.name.clone(),
        iterations: Iterations::Unbounded,
        ..Default::default()
    };
    let instance = simulate_can(None, &options).await.expect("start replay");
    assert_eq!(instance.interface(), iface.name);

    // Recorded timing is kept; the sample log spans well under two seconds.
    tokio::time::sleep(Duration::from_secs(2)).await;
    instance.stop().await.expect("graceful stop");

    let frames = capture.finish();
    assert!(!frames.is_empty(), "no frames captured on {}", iface.name);
    assert!(
        frames.iter().all(|line| line.contains(&iface.name)),
        "frames not written to {}: {frames:?}",
        iface.name
    );
}

#[tokio::test]
async fn test_single_pass_finishes_on_its_own() {
    if common::skip_without_replay() {
        return;
    }

    let iface = common::claim_iface("vcr");
    virtualize_can(Some(&iface.name), &VirtualizeOptions::default())
        .await
        .expect("virtualize");

    let options = SimulateOptions {
        interface: iface.name.clone(),
        iterations: Iterations::once(),
        simulate_time: false,
        ..Default::default()
    };
    let instance = simulate_can(None, &options).await.expect("start replay");

    let record = tokio::time::timeout(Duration::from_secs(10), instance.wait())
        .await
        .expect("single pass should finish")
        .expect("wait");
    assert_eq!(record.code, Some(0));

    // Finished already: stop is a no-op.
    instance.stop().await.expect("stop after finish");
}
