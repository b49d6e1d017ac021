//! S6: graceful shutdown runs priority groups in order, isolating failures.

use courier_daemon::shutdown::{ShutdownManager, ShutdownMode};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test]
async fn graceful_shutdown_ordering_with_failures() {
    let manager = Arc::new(ShutdownManager::new());
    let spans: Arc<Mutex<Vec<(&'static str, Instant, Instant)>>> = Arc::new(Mutex::new(Vec::new()));

    let record = |name: &'static str, delay_ms: u64| {
        let spans = Arc::clone(&spans);
        move |_mode| {
            let spans = Arc::clone(&spans);
            async move {
                let start = Instant::now();
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                spans.lock().push((name, start, Instant::now()));
                Ok(())
            }
        }
    };

    manager.register("a", 10, record("a", 50));
    manager.register("b", 10, record("b", 10));
    manager.register("d", 10, |_mode| async {
        Err("handler d exploded".to_string())
    });
    manager.register("c", 20, record("c", 10));

    assert!(!manager.is_shutting_down());
    manager.execute(ShutdownMode::Graceful).await;
    assert!(manager.is_shutting_down());

    let spans = spans.lock();
    let find = |name: &str| {
        spans
            .iter()
            .find(|(n, _, _)| *n == name)
            .copied()
            .unwrap_or_else(|| panic!("{name} never ran"))
    };
    let (_, _, a_end) = find("a");
    let (_, _, b_end) = find("b");
    let (_, c_start, _) = find("c");

    // d failing must not keep a, b, or c from running; c starts only after
    // the whole priority-10 group finished.
    assert!(a_end <= c_start, "a must finish before c starts");
    assert!(b_end <= c_start, "b must finish before c starts");
}

#[tokio::test]
async fn hard_shutdown_bounds_each_priority_group() {
    let manager = ShutdownManager::with_priority_timeout(Duration::from_millis(50));
    let finished = Arc::new(Mutex::new(Vec::new()));

    let f = Arc::clone(&finished);
    manager.register("stuck", 0, move |_mode| {
        let f = Arc::clone(&f);
        async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            f.lock().push("stuck");
            Ok(())
        }
    });
    let f = Arc::clone(&finished);
    manager.register("quick", 10, move |_mode| {
        let f = Arc::clone(&f);
        async move {
            f.lock().push("quick");
            Ok(())
        }
    });

    let start = Instant::now();
    manager.execute(ShutdownMode::Hard).await;

    assert!(start.elapsed() < Duration::from_millis(150));
    let finished = finished.lock();
    assert!(!finished.contains(&"stuck"));
    assert!(finished.contains(&"quick"));
}
