//! Test utilities for the listings client.
//!
//! Shared doubles for unit tests (in `src/`) and integration tests (in
//! `tests/`). Compiled for `cfg(test)` and behind the `test-support` feature.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;
use tokio::sync::{Notify, mpsc};

use crate::domain::credential::BearerCredential;
use crate::domain::dispatcher::RetrySleeper;
use crate::domain::operation::{Operation, OperationOutput};
use crate::domain::ports::{
    DataSource, DataSourceError, HttpTransport, SlotStorage, SlotStorageError, TransportError,
    TransportRequest, TransportResponse,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(_) => panic!("test double mutex poisoned"),
    }
}

/// Clock that only moves when told to.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, delta: Duration) {
        let delta = match TimeDelta::from_std(delta) {
            Ok(delta) => delta,
            Err(error) => {
                panic!("failed to convert Duration to TimeDelta: {error}; delta={delta:?}",)
            }
        };
        *lock(&self.0) += delta;
    }

    pub fn advance_seconds(&self, seconds: i64) {
        *lock(&self.0) += TimeDelta::seconds(seconds);
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.0)
    }
}

/// Sleeper that returns immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateSleeper;

#[async_trait]
impl RetrySleeper for ImmediateSleeper {
    async fn sleep(&self, _duration: Duration) {}
}

/// Sleeper that records every requested delay and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper(pub Mutex<Vec<Duration>>);

impl RecordingSleeper {
    pub fn recorded(&self) -> Vec<Duration> {
        lock(&self.0).clone()
    }
}

#[async_trait]
impl RetrySleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        lock(&self.0).push(duration);
    }
}

/// Build a transport response carrying a JSON body.
pub fn json_response(status: u16, body: serde_json::Value) -> TransportResponse {
    TransportResponse {
        status,
        status_text: reason_phrase(status).to_owned(),
        body: body.to_string().into_bytes(),
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "",
    }
}

/// Entry/release hooks that hold a call open until the test lets it go.
pub struct Gate {
    entered: mpsc::UnboundedSender<usize>,
    release: Arc<Notify>,
}

impl Gate {
    pub fn new(entered: mpsc::UnboundedSender<usize>, release: Arc<Notify>) -> Self {
        Self { entered, release }
    }

    async fn pass(&self, call: usize) {
        if self.entered.send(call).is_err() {
            panic!("gate receiver dropped");
        }
        self.release.notified().await;
    }
}

/// Transport that replays scripted results in order.
///
/// Once the script runs out every call fails with a connection error.
pub struct ScriptedTransport {
    scripted: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
    requests: Mutex<Vec<TransportRequest>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(scripted: Vec<Result<TransportResponse, TransportError>>) -> Self {
        Self {
            scripted: Mutex::new(scripted.into()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Queue another result.
    pub fn push(&self, result: Result<TransportResponse, TransportError>) {
        lock(&self.scripted).push_back(result);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.requests).push(request);
        lock(&self.scripted)
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::connect("script exhausted")))
    }
}

/// Data source that replays scripted results in order, optionally holding
/// each call at a [`Gate`].
pub struct ScriptedSource {
    scripted: Mutex<VecDeque<Result<OperationOutput, DataSourceError>>>,
    operations: Mutex<Vec<&'static str>>,
    bearers: Mutex<Vec<Option<BearerCredential>>>,
    calls: AtomicUsize,
    gate: Option<Gate>,
}

impl ScriptedSource {
    pub fn new(scripted: Vec<Result<OperationOutput, DataSourceError>>) -> Self {
        Self {
            scripted: Mutex::new(scripted.into()),
            operations: Mutex::new(Vec::new()),
            bearers: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn gated(scripted: Vec<Result<OperationOutput, DataSourceError>>, gate: Gate) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(scripted)
        }
    }

    pub fn push(&self, result: Result<OperationOutput, DataSourceError>) {
        lock(&self.scripted).push_back(result);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Names of the operations executed so far.
    pub fn operations(&self) -> Vec<&'static str> {
        lock(&self.operations).clone()
    }

    /// Bearer credentials attached to each call.
    pub fn bearers(&self) -> Vec<Option<BearerCredential>> {
        lock(&self.bearers).clone()
    }
}

#[async_trait]
impl DataSource for ScriptedSource {
    async fn execute(
        &self,
        operation: &Operation,
        bearer: Option<BearerCredential>,
    ) -> Result<OperationOutput, DataSourceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        lock(&self.operations).push(operation.name());
        lock(&self.bearers).push(bearer);
        if let Some(gate) = &self.gate {
            gate.pass(call).await;
        }
        lock(&self.scripted)
            .pop_front()
            .unwrap_or_else(|| Err(DataSourceError::fault("script exhausted")))
    }
}

/// Slot storage whose every call fails.
#[derive(Debug, Default)]
pub struct FailingSlotStorage {
    attempts: AtomicUsize,
}

impl FailingSlotStorage {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn fail(&self) -> SlotStorageError {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        SlotStorageError::io("storage unavailable")
    }
}

impl SlotStorage for FailingSlotStorage {
    fn read(&self, _slot: &str) -> Result<Option<String>, SlotStorageError> {
        Err(self.fail())
    }

    fn write(&self, _slot: &str, _contents: &str) -> Result<(), SlotStorageError> {
        Err(self.fail())
    }

    fn remove(&self, _slot: &str) -> Result<(), SlotStorageError> {
        Err(self.fail())
    }
}

pub mod storage {
    //! Temporary directories for file-backed slot storage.

    use tempfile::TempDir;

    use crate::outbound::storage::CapFsSlotStorage;

    /// A temporary directory plus a slot storage rooted in it.
    ///
    /// The directory is deleted when this value drops.
    pub struct TempSlotDir {
        dir: TempDir,
    }

    impl TempSlotDir {
        pub fn new() -> std::io::Result<Self> {
            Ok(Self {
                dir: tempfile::tempdir()?,
            })
        }

        pub fn path(&self) -> &std::path::Path {
            self.dir.path()
        }

        /// Open a fresh storage handle on the directory.
        pub fn open(&self) -> std::io::Result<CapFsSlotStorage> {
            CapFsSlotStorage::open(self.dir.path())
        }
    }
}
