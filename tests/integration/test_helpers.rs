//! Shared test helpers for channel and dispatcher integration tests.
//!
//! Provides unique endpoint names so tests can bind in parallel, short
//! channel timeouts, and a recording action handler double.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use zxtouch_ipc::ipc::channel::ChannelOptions;
use zxtouch_ipc::ipc::server::Dispatcher;
use zxtouch_ipc::models::endpoint::EndpointName;
use zxtouch_ipc::protocol::handler::ActionHandler;
use zxtouch_ipc::{AppError, Result};

static NEXT_ENDPOINT: AtomicUsize = AtomicUsize::new(0);

/// Endpoint name unique to this process and call.
pub fn unique_endpoint(tag: &str) -> EndpointName {
    let n = NEXT_ENDPOINT.fetch_add(1, Ordering::SeqCst);
    EndpointName::new(format!(
        "zxtouch-ipc-test-{tag}-{}-{n}",
        std::process::id()
    ))
    .expect("valid endpoint name")
}

/// Channel options with short bounded waits for tests.
pub fn test_options() -> ChannelOptions {
    ChannelOptions {
        connect_timeout: Duration::from_secs(2),
        request_timeout: Duration::from_secs(5),
        max_message_bytes: 64 * 1024,
    }
}

/// Outcome the recording handler returns for every task.
#[derive(Debug, Clone)]
pub enum TaskBehavior {
    Ack,
    Data(Vec<u8>),
    Fail(String),
    Panic,
}

/// Action handler double that records every call.
#[derive(Debug)]
pub struct RecordingHandler {
    behavior: TaskBehavior,
    home_calls: AtomicUsize,
    tasks: Mutex<Vec<Vec<u8>>>,
}

impl RecordingHandler {
    pub fn new(behavior: TaskBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            home_calls: AtomicUsize::new(0),
            tasks: Mutex::new(Vec::new()),
        })
    }

    pub fn home_calls(&self) -> usize {
        self.home_calls.load(Ordering::SeqCst)
    }

    pub fn tasks(&self) -> Vec<Vec<u8>> {
        self.tasks.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.home_calls() + self.tasks().len()
    }
}

impl ActionHandler for RecordingHandler {
    fn handle_home(&self) -> Result<()> {
        self.home_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn handle_task(&self, payload: &[u8]) -> Result<Option<Vec<u8>>> {
        self.tasks.lock().unwrap().push(payload.to_vec());
        match &self.behavior {
            TaskBehavior::Ack => Ok(None),
            TaskBehavior::Data(data) => Ok(Some(data.clone())),
            TaskBehavior::Fail(message) => Err(AppError::Handler(message.clone())),
            TaskBehavior::Panic => panic!("task handler exploded"),
        }
    }
}

/// Bind a dispatcher on a fresh endpoint and run it in the background.
pub fn start_dispatcher(
    tag: &str,
    options: &ChannelOptions,
    handler: Arc<RecordingHandler>,
) -> (EndpointName, CancellationToken, JoinHandle<Result<()>>) {
    let endpoint = unique_endpoint(tag);
    let dispatcher = Dispatcher::bind(&endpoint, options, handler).expect("dispatcher binds");
    let cancel = CancellationToken::new();
    let handle = dispatcher.spawn(cancel.clone());
    (endpoint, cancel, handle)
}
