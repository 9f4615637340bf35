/*!
 * MCS Queue Lock - Demo Entry Point
 *
 * Runs the shared-array workload twice:
 * - Without any lock, to show the atomicity check can fail
 * - Through the MCS queue lock, where it must always pass
 */

use anyhow::{bail, Result};
use tracing::info;

use mcs_queue_lock::{init_tracing, DemoConfig, McsLock};

fn main() -> Result<()> {
    // Initialize structured tracing
    init_tracing();

    let config = DemoConfig::from_env()?;
    let driver = config.driver;
    info!(
        workers = driver.workers,
        iterations = driver.iterations,
        len = driver.len,
        strategy = ?config.spin.strategy,
        "MCS queue lock demo starting"
    );

    info!("Starting {} unsafe threads ...", driver.workers);
    let unguarded = driver.run_unguarded()?;
    info!("Critical section was atomic? {}", unguarded.atomic);

    let lock = McsLock::with_config(config.spin);
    info!("Starting {} safe threads ...", driver.workers);
    let guarded = driver.run_guarded(&lock)?;
    info!("Critical section was atomic? {}", guarded.atomic);

    let stats = lock.stats();
    info!(
        acquisitions = stats.acquisitions,
        contended = stats.contended,
        handoffs = stats.handoffs,
        successor_waits = stats.successor_waits,
        registered_threads = lock.registered_threads(),
        "Lock statistics"
    );

    if config.json {
        let summary = serde_json::json!({
            "unguarded": unguarded,
            "guarded": guarded,
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    if !guarded.atomic {
        bail!(
            "critical sections overlapped under the queue lock (first mismatch at {:?})",
            guarded.first_mismatch
        );
    }
    Ok(())
}
