//! The concurrent scan pipeline.
//!
//! One dispatcher task feeds addresses into a bounded queue, a fixed pool
//! of workers probes them over SNMP, and the collector (the caller's task)
//! drains the bounded result queue. The collector owns termination: once it
//! has seen one result per enumerated address it broadcasts a stop token
//! that every worker observes exactly once.
//!
//! All coordination is message passing; the only shared state is the
//! single-consumer address receiver behind an async mutex.

use std::net::Ipv4Addr;
use std::sync::Arc;

use tokio::sync::{Mutex, broadcast, mpsc};
use tracing::{debug, trace, warn};

use snmpr_common::config::ScanConfig;
use snmpr_common::network::range::Ipv4Range;
use snmpr_protocols::snmp::{SYS_DESCR_OID, SnmpClient, SnmpError};

use crate::report::{Outcome, ReportSink, ScanResult};

/// Capacity of the address queue. Small on purpose: the dispatcher blocks
/// when workers fall behind, bounding memory and lead-time.
const ADDR_QUEUE_CAP: usize = 10;
const RESULT_QUEUE_CAP: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    /// Addresses enumerated and probed.
    pub addresses: usize,
    /// Lines handed to the sink (suppressed failures are not).
    pub reported: usize,
}

/// Runs one full scan: enumerate, dispatch, probe, collect, shut down.
///
/// Returns once every address has produced a result and all workers have
/// exited. Per-address failures never abort the run; the only fatal input
/// error (an unparseable CIDR) is rejected before this is called.
pub async fn run_scan<S: ReportSink>(
    cfg: ScanConfig,
    range: Ipv4Range,
    client: Arc<dyn SnmpClient>,
    sink: &mut S,
) -> anyhow::Result<ScanSummary> {
    let addresses = range.enumerate();
    let total = addresses.len();
    let cfg = Arc::new(cfg);
    debug!(
        "scanning {total} addresses ({} - {}) with {} workers",
        range.start_addr, range.end_addr, cfg.concurrency
    );

    let (addr_tx, addr_rx) = mpsc::channel::<Ipv4Addr>(ADDR_QUEUE_CAP);
    let (result_tx, mut result_rx) = mpsc::channel::<ScanResult>(RESULT_QUEUE_CAP);
    let (stop_tx, _) = broadcast::channel::<()>(1);

    // Dispatcher: ascending order, blocking on a full queue.
    let dispatcher = tokio::spawn(async move {
        for addr in addresses {
            if addr_tx.send(addr).await.is_err() {
                break;
            }
        }
    });

    let queue = Arc::new(Mutex::new(addr_rx));
    let mut workers = Vec::with_capacity(cfg.concurrency);
    for _ in 0..cfg.concurrency {
        workers.push(tokio::spawn(worker_loop(
            Arc::clone(&cfg),
            Arc::clone(&client),
            Arc::clone(&queue),
            result_tx.clone(),
            stop_tx.subscribe(),
        )));
    }
    drop(result_tx);

    // Collector: the driving loop. Completion is inferred from the result
    // count alone, never from queue closure.
    let mut received = 0usize;
    let mut reported = 0usize;
    while received < total {
        let Some(result) = result_rx.recv().await else {
            // Every worker is gone without delivering all results. Should
            // be unreachable; surface it rather than spin.
            warn!("result channel closed after {received}/{total} results");
            break;
        };
        received += 1;
        trace!("{}/{} {:?}", received, total, result.addr);
        if let Some(line) = result.render() {
            sink.report(&line);
            reported += 1;
        }
    }

    // One token per worker, delivered exactly once each.
    let _ = stop_tx.send(());
    let _ = dispatcher.await;
    for worker in workers {
        let _ = worker.await;
    }

    Ok(ScanSummary {
        addresses: total,
        reported,
    })
}

/// One worker: pull an address or a stop token, whichever is ready first.
async fn worker_loop(
    cfg: Arc<ScanConfig>,
    client: Arc<dyn SnmpClient>,
    queue: Arc<Mutex<mpsc::Receiver<Ipv4Addr>>>,
    results: mpsc::Sender<ScanResult>,
    mut stop: broadcast::Receiver<()>,
) {
    loop {
        let next = tokio::select! {
            _ = stop.recv() => return,
            addr = next_addr(&queue) => addr,
        };

        let Some(addr) = next else {
            // Dispatcher is done and the queue is drained. The collector
            // still owes us a stop token; wait for it so shutdown stays
            // exactly-once per worker.
            let _ = stop.recv().await;
            return;
        };

        // Committed: a stop token no longer preempts this probe.
        let result = probe(addr, &cfg, client.as_ref()).await;
        if results.send(result).await.is_err() {
            return;
        }
    }
}

async fn next_addr(queue: &Mutex<mpsc::Receiver<Ipv4Addr>>) -> Option<Ipv4Addr> {
    queue.lock().await.recv().await
}

async fn probe(addr: Ipv4Addr, cfg: &ScanConfig, client: &dyn SnmpClient) -> ScanResult {
    let outcome = match query_host(addr, cfg, client).await {
        Ok(value) => Outcome::Success(value),
        Err(err) if cfg.verbose => Outcome::Failure(err.to_string()),
        Err(_) => Outcome::Suppressed,
    };
    ScanResult { addr, outcome }
}

async fn query_host(
    addr: Ipv4Addr,
    cfg: &ScanConfig,
    client: &dyn SnmpClient,
) -> Result<String, SnmpError> {
    let mut session = client.connect(addr, cfg).await?;
    let bindings = session.get(SYS_DESCR_OID).await?;

    // Agents answer a single GET with a single varbind, but when several
    // come back the last one wins.
    Ok(bindings
        .into_iter()
        .last()
        .map(|binding| binding.value)
        .unwrap_or_default())
}
