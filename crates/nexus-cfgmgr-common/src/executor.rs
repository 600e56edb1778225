//! Command batch execution against a switch.
//!
//! The executor owns the connect → execute → close lifecycle for one batch.
//! It never reuses a session across batches, and it never opens a session
//! for an empty batch or in dry-run mode.
//!
//! # Example
//!
//! ```ignore
//! use nexus_cfgmgr_common::{SessionExecutor, SwitchTarget};
//!
//! let executor = SessionExecutor::new(factory, false);
//! let target = SwitchTarget::new("10.0.0.1", "admin", "secret");
//! let reply = executor
//!     .run(&target, &["show running-config interface ethernet 1/20".to_string()])
//!     .await?;
//! ```

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::{CfgMgrError, CfgMgrResult, TransportStage};
use crate::transport::{Response, SwitchTarget, Transport, TransportFactory};

/// Runs command batches against switches.
pub struct SessionExecutor {
    factory: Arc<dyn TransportFactory>,
    transport: OnceCell<Arc<dyn Transport>>,
    dry_run: bool,
}

impl SessionExecutor {
    /// Creates an executor. The transport is built on first use.
    pub fn new(factory: Arc<dyn TransportFactory>, dry_run: bool) -> Self {
        Self {
            factory,
            transport: OnceCell::new(),
            dry_run,
        }
    }

    /// Returns true if batches are logged but never sent.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Returns the transport, building it on first call.
    ///
    /// Concurrent first calls build it once.
    fn transport(&self, host: &str) -> CfgMgrResult<&Arc<dyn Transport>> {
        self.transport
            .get_or_try_init(|| {
                debug!("Initializing switch transport");
                self.factory.create()
            })
            .map_err(|e| CfgMgrError::transport(host, TransportStage::Init, e))
    }

    /// Runs one command batch against `target`.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(response))` - The batch ran and the device replied
    /// * `Ok(None)` - Nothing was sent (empty batch or dry-run)
    /// * `Err(CfgMgrError::Transport)` - Connect, execute or close failed
    ///
    /// The session is closed on every path once it has been opened. If both
    /// the batch and the close fail, the batch failure is returned and the
    /// close failure is attached as `cleanup`.
    pub async fn run(
        &self,
        target: &SwitchTarget,
        commands: &[String],
    ) -> CfgMgrResult<Option<Response>> {
        if commands.is_empty() {
            debug!(host = %target.host, "No commands to run");
            return Ok(None);
        }

        info!(
            host = %target.host,
            commands = ?commands,
            "Switch host {} executing commands",
            target.host
        );

        if self.dry_run {
            info!(host = %target.host, "Dry run is enabled, skipping");
            return Ok(None);
        }

        let transport = self.transport(&target.host)?;
        let mut session = transport
            .connect(target)
            .await
            .map_err(|e| CfgMgrError::transport(&target.host, TransportStage::Connect, e))?;

        let executed = session.execute(commands).await;
        let closed = session.close().await;

        match (executed, closed) {
            (Ok(response), Ok(())) => Ok(Some(response)),
            (Ok(_), Err(close_err)) => {
                warn!(
                    host = %target.host,
                    error = %close_err,
                    "Batch applied but session close failed"
                );
                Err(CfgMgrError::transport(
                    &target.host,
                    TransportStage::Close,
                    close_err,
                ))
            }
            (Err(exec_err), Ok(())) => Err(CfgMgrError::transport(
                &target.host,
                TransportStage::Execute,
                exec_err,
            )),
            (Err(exec_err), Err(close_err)) => {
                warn!(
                    host = %target.host,
                    error = %close_err,
                    "Session close failed after batch failure"
                );
                Err(CfgMgrError::Transport {
                    host: target.host.clone(),
                    stage: TransportStage::Execute,
                    source: exec_err,
                    cleanup: Some(close_err),
                })
            }
        }
    }
}

impl fmt::Debug for SessionExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionExecutor")
            .field("dry_run", &self.dry_run)
            .field("transport_ready", &self.transport.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockSession, MockTransport, TransportError, TransportResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Hands out a prepared transport and counts how often it was asked.
    struct CountingFactory {
        transport: Mutex<Option<Arc<dyn Transport>>>,
        calls: AtomicUsize,
    }

    impl CountingFactory {
        fn new(transport: MockTransport) -> Arc<Self> {
            Arc::new(Self {
                transport: Mutex::new(Some(Arc::new(transport))),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TransportFactory for CountingFactory {
        fn create(&self) -> TransportResult<Arc<dyn Transport>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.transport
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| TransportError::Connect("factory exhausted".to_string()))
        }
    }

    fn target() -> SwitchTarget {
        SwitchTarget::new("10.0.0.1", "admin", "secret")
    }

    fn batch() -> Vec<String> {
        vec![
            "configure terminal".to_string(),
            "interface ethernet 1/20".to_string(),
            "shutdown".to_string(),
        ]
    }

    fn transport_with_session(session: MockSession) -> MockTransport {
        let mut transport = MockTransport::new();
        transport
            .expect_connect()
            .times(1)
            .return_once(move |_| Ok(Box::new(session)));
        transport
    }

    #[tokio::test]
    async fn test_empty_batch_opens_no_session() {
        for dry_run in [false, true] {
            let mut transport = MockTransport::new();
            transport.expect_connect().never();
            let factory = CountingFactory::new(transport);
            let executor = SessionExecutor::new(factory.clone(), dry_run);

            let result = executor.run(&target(), &[]).await.unwrap();
            assert!(result.is_none());
            assert_eq!(factory.calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_dry_run_opens_no_session() {
        let mut transport = MockTransport::new();
        transport.expect_connect().never();
        let factory = CountingFactory::new(transport);
        let executor = SessionExecutor::new(factory.clone(), true);

        let result = executor.run(&target(), &batch()).await.unwrap();
        assert!(result.is_none());
        assert!(executor.is_dry_run());
        assert_eq!(factory.calls(), 0);
    }

    #[tokio::test]
    async fn test_run_returns_reply_and_closes() {
        let mut session = MockSession::new();
        session
            .expect_execute()
            .withf(|cmds: &[String]| cmds.len() == 3 && cmds[2] == "shutdown")
            .times(1)
            .returning(|_| Ok(Response::with_data("ok")));
        session.expect_close().times(1).returning(|| Ok(()));

        let factory = CountingFactory::new(transport_with_session(session));
        let executor = SessionExecutor::new(factory, false);

        let response = executor.run(&target(), &batch()).await.unwrap();
        assert_eq!(response.unwrap().payload().unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_connect_failure_is_wrapped() {
        let mut transport = MockTransport::new();
        transport
            .expect_connect()
            .times(1)
            .returning(|_| Err(TransportError::Connect("Connection refused".to_string())));
        let executor = SessionExecutor::new(CountingFactory::new(transport), false);

        let err = executor.run(&target(), &batch()).await.unwrap_err();
        assert_eq!(err.stage(), Some(TransportStage::Connect));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("Connection refused"));
    }

    #[tokio::test]
    async fn test_execute_failure_still_closes() {
        let mut session = MockSession::new();
        session
            .expect_execute()
            .times(1)
            .returning(|_| Err(TransportError::Protocol("unexpected eof".to_string())));
        session.expect_close().times(1).returning(|| Ok(()));

        let executor =
            SessionExecutor::new(CountingFactory::new(transport_with_session(session)), false);

        let err = executor.run(&target(), &batch()).await.unwrap_err();
        match err {
            CfgMgrError::Transport {
                stage, cleanup, ..
            } => {
                assert_eq!(stage, TransportStage::Execute);
                assert!(cleanup.is_none());
            }
            other => panic!("Expected Transport error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_close_failure_after_success_surfaces() {
        let mut session = MockSession::new();
        session
            .expect_execute()
            .times(1)
            .returning(|_| Ok(Response::with_data("")));
        session
            .expect_close()
            .times(1)
            .returning(|| Err(TransportError::Closed));

        let executor =
            SessionExecutor::new(CountingFactory::new(transport_with_session(session)), false);

        let err = executor.run(&target(), &batch()).await.unwrap_err();
        assert_eq!(err.stage(), Some(TransportStage::Close));
    }

    #[tokio::test]
    async fn test_execute_failure_takes_priority_over_close_failure() {
        let mut session = MockSession::new();
        session.expect_execute().times(1).returning(|_| {
            Err(TransportError::Rpc {
                tag: "operation-failed".to_string(),
                message: "Invalid command".to_string(),
            })
        });
        session
            .expect_close()
            .times(1)
            .returning(|| Err(TransportError::Closed));

        let executor =
            SessionExecutor::new(CountingFactory::new(transport_with_session(session)), false);

        let err = executor.run(&target(), &batch()).await.unwrap_err();
        match err {
            CfgMgrError::Transport {
                stage,
                source,
                cleanup,
                ..
            } => {
                assert_eq!(stage, TransportStage::Execute);
                assert!(matches!(source, TransportError::Rpc { .. }));
                assert!(matches!(cleanup, Some(TransportError::Closed)));
            }
            other => panic!("Expected Transport error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_initialized_once() {
        let mut transport = MockTransport::new();
        transport.expect_connect().times(3).returning(|_| {
            let mut session = MockSession::new();
            session
                .expect_execute()
                .returning(|_| Ok(Response::with_data("")));
            session.expect_close().returning(|| Ok(()));
            Ok(Box::new(session))
        });
        let factory = CountingFactory::new(transport);
        let executor = SessionExecutor::new(factory.clone(), false);

        for _ in 0..3 {
            executor.run(&target(), &batch()).await.unwrap();
        }
        assert_eq!(factory.calls(), 1);
    }

    #[tokio::test]
    async fn test_factory_failure_is_init_stage() {
        struct FailingFactory;
        impl TransportFactory for FailingFactory {
            fn create(&self) -> TransportResult<Arc<dyn Transport>> {
                Err(TransportError::Connect("ssh client not found".to_string()))
            }
        }

        let executor = SessionExecutor::new(Arc::new(FailingFactory), false);
        let err = executor.run(&target(), &batch()).await.unwrap_err();
        assert_eq!(err.stage(), Some(TransportStage::Init));
        assert!(format!("{:?}", executor).contains("transport_ready: false"));
    }
}
