mod common;

use common::{executor, standard_descriptors};
use log::LevelFilter;
use root_mcp_core::executors::ExecutorSettings;
use root_mcp_core::ExecutionDispatcher;
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;

/// Log straight to descriptor 2, the way a logger does before the server
/// moves it onto a private duplicate.
fn log_to_descriptor_two() {
    let _ = env_logger::Builder::new()
        .filter_level(LevelFilter::Debug)
        .target(env_logger::Target::Stderr)
        .try_init();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial(descriptors)]
async fn test_queued_request_logs_stay_out_of_running_capture() {
    log_to_descriptor_two();
    let before = standard_descriptors();
    let dispatcher = Arc::new(ExecutionDispatcher::new(Arc::new(executor(
        "fake_cling_logging",
        ExecutorSettings::default(),
    ))));

    let running = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move { dispatcher.run_cpp("int fine = 1; //slow\n".to_string()).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The listing of this fragment contains an error marker.
    let queued = dispatcher
        .run_cpp("void report() { std::cerr << \"Error: none\"; }".to_string())
        .await;
    let running = running.await.unwrap();

    assert!(running.ok, "{:?}", running);
    assert_eq!(running.stderr, "");
    assert!(queued.ok, "{:?}", queued);
    assert_eq!(queued.stderr, "");
    assert_eq!(standard_descriptors(), before);
}
