//! In-memory switch for driver tests
//!
//! A [`FakeSwitch`] hands out a [`TransportFactory`] whose sessions record
//! every command batch and play back scripted outcomes, one script per
//! session in the order sessions are opened. Sessions with no script left
//! succeed with an empty `data` reply.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use nexus_cfgmgr_common::{
    Response, Session, SwitchTarget, Transport, TransportError, TransportFactory, TransportResult,
};

/// Outcome of one scripted session
#[derive(Debug, Clone)]
pub enum SessionScript {
    /// Execute returns the response; close succeeds
    Reply(Response),
    /// Connect is refused
    ConnectFailure(String),
    /// Execute fails with an RPC error; close succeeds
    ExecuteFailure(String),
    /// Execute returns the response; close fails
    CloseFailure(Response),
    /// Execute fails with an RPC error and close fails too
    ExecuteAndCloseFailure(String),
}

impl SessionScript {
    fn execute_result(&self) -> TransportResult<Response> {
        match self {
            SessionScript::Reply(resp) | SessionScript::CloseFailure(resp) => Ok(resp.clone()),
            SessionScript::ExecuteFailure(message)
            | SessionScript::ExecuteAndCloseFailure(message) => Err(TransportError::Rpc {
                tag: "operation-failed".to_string(),
                message: message.clone(),
            }),
            SessionScript::ConnectFailure(_) => Err(TransportError::Closed),
        }
    }

    fn close_result(&self) -> TransportResult<()> {
        match self {
            SessionScript::CloseFailure(_) | SessionScript::ExecuteAndCloseFailure(_) => {
                Err(TransportError::Protocol("close-session not acknowledged".to_string()))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
struct SwitchState {
    scripts: VecDeque<SessionScript>,
    batches: Vec<Vec<String>>,
    hosts: Vec<String>,
    transports_created: usize,
    connect_attempts: usize,
    sessions_opened: usize,
    sessions_closed: usize,
}

/// Recording fake switch
#[derive(Debug, Clone, Default)]
pub struct FakeSwitch {
    state: Arc<Mutex<SwitchState>>,
}

impl FakeSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SwitchState> {
        self.state.lock().expect("fake switch state poisoned")
    }

    /// Queue the outcome of the next unscripted session
    pub fn script(&self, script: SessionScript) -> &Self {
        self.state().scripts.push_back(script);
        self
    }

    /// Queue a successful session replying with a single `data` element
    pub fn reply_with(&self, text: &str) -> &Self {
        self.script(SessionScript::Reply(Response::with_data(text)))
    }

    pub fn fail_connect(&self, message: &str) -> &Self {
        self.script(SessionScript::ConnectFailure(message.to_string()))
    }

    pub fn fail_execute(&self, message: &str) -> &Self {
        self.script(SessionScript::ExecuteFailure(message.to_string()))
    }

    /// Factory to inject into a driver
    pub fn factory(&self) -> Arc<FakeSwitchFactory> {
        Arc::new(FakeSwitchFactory {
            state: Arc::clone(&self.state),
        })
    }

    /// Batches received, in order
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.state().batches.clone()
    }

    /// Hosts connected to, in order
    pub fn hosts(&self) -> Vec<String> {
        self.state().hosts.clone()
    }

    pub fn transports_created(&self) -> usize {
        self.state().transports_created
    }

    pub fn connect_attempts(&self) -> usize {
        self.state().connect_attempts
    }

    pub fn sessions_opened(&self) -> usize {
        self.state().sessions_opened
    }

    pub fn sessions_closed(&self) -> usize {
        self.state().sessions_closed
    }
}

/// [`TransportFactory`] backed by a [`FakeSwitch`]
#[derive(Debug)]
pub struct FakeSwitchFactory {
    state: Arc<Mutex<SwitchState>>,
}

impl TransportFactory for FakeSwitchFactory {
    fn create(&self) -> TransportResult<Arc<dyn Transport>> {
        let mut state = self.state.lock().expect("fake switch state poisoned");
        state.transports_created += 1;
        Ok(Arc::new(FakeTransport {
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeTransport {
    state: Arc<Mutex<SwitchState>>,
}

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(&self, target: &SwitchTarget) -> TransportResult<Box<dyn Session>> {
        let mut state = self.state.lock().expect("fake switch state poisoned");
        state.connect_attempts += 1;
        state.hosts.push(target.host.clone());

        let script = state
            .scripts
            .pop_front()
            .unwrap_or_else(|| SessionScript::Reply(Response::with_data("")));
        if let SessionScript::ConnectFailure(message) = script {
            return Err(TransportError::Connect(message));
        }

        state.sessions_opened += 1;
        debug!(host = %target.host, "Fake session opened");
        Ok(Box::new(FakeSession {
            state: Arc::clone(&self.state),
            script,
            closed: false,
        }))
    }
}

struct FakeSession {
    state: Arc<Mutex<SwitchState>>,
    script: SessionScript,
    closed: bool,
}

#[async_trait]
impl Session for FakeSession {
    async fn execute(&mut self, commands: &[String]) -> TransportResult<Response> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.state
            .lock()
            .expect("fake switch state poisoned")
            .batches
            .push(commands.to_vec());
        self.script.execute_result()
    }

    async fn close(&mut self) -> TransportResult<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.closed = true;
        self.state
            .lock()
            .expect("fake switch state poisoned")
            .sessions_closed += 1;
        self.script.close_result()
    }
}
