//! Bounded TCP connectivity check
//!
//! A connection attempt runs as a task on a private runtime and reports its
//! progress as [`ConnectionState`] events. The caller blocks until the first
//! terminal state or the timeout, whichever comes first, then cancels the
//! task. Cancellation happens on every path, so no socket outlives the check.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{lookup_host, TcpStream};
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::observability::{log_event, Event, ObservationScope, Timer};

use super::endpoint::ServerEndpoint;

/// How long a reachability check may take
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on waiting for a cancelled attempt to release its socket
const CANCEL_GRACE: Duration = Duration::from_millis(250);

/// Progress of one connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Setup,
    Preparing,
    /// Not terminal: the attempt continues
    Waiting(String),
    Ready,
    Failed(String),
    Cancelled,
}

impl ConnectionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConnectionState::Ready | ConnectionState::Failed(_) | ConnectionState::Cancelled
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConnectionState::Setup => "setup",
            ConnectionState::Preparing => "preparing",
            ConnectionState::Waiting(_) => "waiting",
            ConnectionState::Ready => "ready",
            ConnectionState::Failed(_) => "failed",
            ConnectionState::Cancelled => "cancelled",
        }
    }

    fn reason(&self) -> Option<&str> {
        match self {
            ConnectionState::Waiting(reason) | ConnectionState::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

fn log_state(state: &ConnectionState) {
    match state.reason() {
        Some(reason) => log_event(
            Event::ConnectionState,
            &[("state", state.name()), ("reason", reason)],
        ),
        None => log_event(Event::ConnectionState, &[("state", state.name())]),
    }
}

type StateSender = mpsc::UnboundedSender<ConnectionState>;

/// A running connection attempt.
struct Connection {
    events: mpsc::UnboundedReceiver<ConnectionState>,
    task: Option<JoinHandle<()>>,
}

impl Connection {
    fn start<D, F>(runtime: &Runtime, driver: D) -> Self
    where
        D: FnOnce(StateSender) -> F,
        F: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = runtime.spawn(driver(tx));
        Self {
            events: rx,
            task: Some(task),
        }
    }

    /// First terminal state; anything after it is never read.
    async fn first_terminal(&mut self) -> ConnectionState {
        while let Some(state) = self.events.recv().await {
            log_state(&state);
            if state.is_terminal() {
                return state;
            }
        }
        // Driver went away without a verdict
        ConnectionState::Cancelled
    }

    /// Abort the attempt and wait briefly for its socket to be dropped.
    fn cancel(&mut self, runtime: &Runtime) {
        let Some(task) = self.task.take() else {
            return;
        };
        task.abort();
        self.events.close();
        let _ = runtime.block_on(async { tokio::time::timeout(CANCEL_GRACE, task).await });
        log_state(&ConnectionState::Cancelled);
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Whether a TCP connection to `endpoint` completes within `timeout`.
///
/// Blocks the calling thread. Must not be called from inside an async
/// runtime.
pub fn is_reachable(endpoint: &ServerEndpoint, timeout: Duration) -> bool {
    let target = endpoint.clone();
    probe(endpoint, timeout, move |events| connect(target, events))
}

fn probe<D, F>(endpoint: &ServerEndpoint, timeout: Duration, driver: D) -> bool
where
    D: FnOnce(StateSender) -> F,
    F: Future<Output = ()> + Send + 'static,
{
    let target = endpoint.to_string();
    let timeout_ms = timeout.as_millis().to_string();
    let scope = ObservationScope::with_fields(
        "REACHABILITY_CHECK",
        &[("endpoint", &target), ("timeout_ms", &timeout_ms)],
    );
    let timer = Timer::new();

    let runtime = match Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("reachability")
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            scope.fail(&format!("runtime unavailable: {}", e));
            return false;
        }
    };

    let mut connection = Connection::start(&runtime, driver);
    let outcome = runtime.block_on(async {
        tokio::time::timeout(timeout, connection.first_terminal()).await
    });
    connection.cancel(&runtime);
    drop(connection);
    // Name resolution may still be parked on a blocking thread
    runtime.shutdown_timeout(CANCEL_GRACE);

    let reachable = match outcome {
        Ok(ConnectionState::Ready) => true,
        Ok(_) => false,
        Err(_) => {
            log_event(
                Event::ReachabilityTimeout,
                &[("endpoint", &target), ("timeout_ms", &timeout_ms)],
            );
            false
        }
    };

    scope.complete_with_fields(&[
        ("reachable", if reachable { "true" } else { "false" }),
        ("elapsed_ms", &timer.elapsed_ms()),
    ]);
    reachable
}

/// Resolve the endpoint and try each address in turn.
///
/// A failed address with more to try is reported as `Waiting`.
async fn connect(endpoint: ServerEndpoint, events: StateSender) {
    let _ = events.send(ConnectionState::Setup);
    let _ = events.send(ConnectionState::Preparing);

    let addrs: Vec<SocketAddr> = match lookup_host((endpoint.fqdn.as_str(), endpoint.port)).await {
        Ok(addrs) => addrs.collect(),
        Err(e) => {
            let _ = events.send(ConnectionState::Failed(format!(
                "name resolution failed: {}",
                e
            )));
            return;
        }
    };
    if addrs.is_empty() {
        let _ = events.send(ConnectionState::Failed(
            "name resolved to no addresses".to_string(),
        ));
        return;
    }

    let last = addrs.len() - 1;
    for (index, addr) in addrs.into_iter().enumerate() {
        match TcpStream::connect(addr).await {
            Ok(_stream) => {
                let _ = events.send(ConnectionState::Ready);
                return;
            }
            Err(e) if index < last => {
                let _ = events.send(ConnectionState::Waiting(format!("{}: {}", addr, e)));
            }
            Err(e) => {
                let _ = events.send(ConnectionState::Failed(format!("{}: {}", addr, e)));
            }
        }
    }
}
