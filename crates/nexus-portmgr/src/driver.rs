//! Switch-port driver
//!
//! `NexusDriver` is the entry point callers use. Each operation synthesizes
//! one command batch and runs it through the [`SessionExecutor`]; `delete` and
//! `clear` run two batches in sequence.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{error, info, instrument};

use nexus_cfgmgr_common::{
    CfgMgrError, CfgMgrResult, Port, Response, SessionExecutor, Settings, TransportFactory,
};

use crate::commands;
use crate::filter;
use crate::negate::{IgnoreList, NegationEngine};
use crate::types::{InterfaceKind, PortExt};

/// Port operations the driver exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Show,
    Create,
    Attach,
    Detach,
    Delete,
    Clear,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Show => "show",
            Operation::Create => "create",
            Operation::Attach => "attach",
            Operation::Detach => "detach",
            Operation::Delete => "delete",
            Operation::Clear => "clear",
        }
    }

    /// Synthesize the batches this operation would send, without a switch
    ///
    /// A clear plan lists no negations since those come from the device.
    pub fn plan(&self, port: &Port) -> CfgMgrResult<Vec<String>> {
        match self {
            Operation::Show => Ok(commands::show_interface_configuration(
                InterfaceKind::Ethernet,
                &port.interface_id()?,
            )),
            Operation::Create => commands::create_port(port),
            Operation::Attach => commands::add_vlan(port),
            Operation::Detach => commands::remove_vlan(port),
            Operation::Delete => commands::delete_port(port),
            Operation::Clear => Ok(commands::clear_interface(
                &port.interface_id()?,
                Vec::new(),
            )),
        }
    }
}

impl FromStr for Operation {
    type Err = CfgMgrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "show" => Ok(Operation::Show),
            "create" => Ok(Operation::Create),
            "attach" => Ok(Operation::Attach),
            "detach" => Ok(Operation::Detach),
            "delete" => Ok(Operation::Delete),
            "clear" => Ok(Operation::Clear),
            other => Err(CfgMgrError::validation(
                "operation",
                format!("unknown operation '{}'", other),
            )),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configures switch ports on Nexus switches
pub struct NexusDriver {
    executor: SessionExecutor,
    negation: NegationEngine,
    ssh_port: u16,
}

impl NexusDriver {
    /// Creates a driver using the dry-run, SSH and ignore-list settings
    pub fn new(factory: Arc<dyn TransportFactory>, settings: &Settings) -> Self {
        Self::builder(factory, settings).build()
    }

    /// Starts a builder seeded from `settings`
    pub fn builder(factory: Arc<dyn TransportFactory>, settings: &Settings) -> NexusDriverBuilder {
        NexusDriverBuilder {
            factory,
            dry_run: settings.dry_run,
            ignore: IgnoreList::from_settings(settings),
            ssh_port: settings.ssh.port,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.executor.is_dry_run()
    }

    async fn run(&self, port: &Port, batch: &[String]) -> CfgMgrResult<Option<Response>> {
        self.executor.run(&port.target(self.ssh_port), batch).await
    }

    /// Reads the running configuration of the port's ethernet interface
    pub async fn show(&self, port: &Port) -> CfgMgrResult<Vec<String>> {
        self.show_kind(port, InterfaceKind::Ethernet).await
    }

    /// Reads the running configuration of one interface context
    ///
    /// Returns an empty list when nothing was sent (dry-run).
    #[instrument(skip(self, port), fields(host = %port.switch_host, interface = %port.interface))]
    pub async fn show_kind(&self, port: &Port, kind: InterfaceKind) -> CfgMgrResult<Vec<String>> {
        let interface = port.interface_id()?;
        let batch = commands::show_interface_configuration(kind, &interface);

        match self.run(port, &batch).await? {
            Some(response) => filter::interface_config(&response),
            None => Ok(Vec::new()),
        }
    }

    #[instrument(skip(self, port), fields(host = %port.switch_host, interface = %port.interface))]
    pub async fn create(&self, port: &Port) -> CfgMgrResult<Option<Response>> {
        let batch = commands::create_port(port)?;
        self.run(port, &batch).await
    }

    #[instrument(skip(self, port), fields(host = %port.switch_host, interface = %port.interface))]
    pub async fn attach(&self, port: &Port) -> CfgMgrResult<Option<Response>> {
        let batch = commands::add_vlan(port)?;
        self.run(port, &batch).await
    }

    #[instrument(skip(self, port), fields(host = %port.switch_host, interface = %port.interface))]
    pub async fn detach(&self, port: &Port) -> CfgMgrResult<Option<Response>> {
        let batch = commands::remove_vlan(port)?;
        self.run(port, &batch).await
    }

    /// Detaches the VLAN, then tears the port down
    ///
    /// A failed detach aborts before the teardown batch is sent and is
    /// returned as is.
    #[instrument(skip(self, port), fields(host = %port.switch_host, interface = %port.interface))]
    pub async fn delete(&self, port: &Port) -> CfgMgrResult<Option<Response>> {
        let teardown = commands::remove_port(port)?;
        self.detach(port).await?;
        self.run(port, &teardown).await
    }

    /// Undoes every configuration line on the port's ethernet interface
    ///
    /// The interface is shut down and its port-channel removed even when it
    /// carries no configuration.
    #[instrument(skip(self, port), fields(host = %port.switch_host, interface = %port.interface))]
    pub async fn clear(&self, port: &Port) -> CfgMgrResult<Option<Response>> {
        let interface = port.interface_id()?;
        let lines = self.show(port).await?;
        let negations = self.negation.negate(&lines);
        info!(
            "Clearing {} configuration lines from {}",
            negations.len(),
            interface.ethernet_name()
        );

        let batch = commands::clear_interface(&interface, negations);
        self.run(port, &batch).await.map_err(|e| {
            error!(
                host = %port.switch_host,
                error = %e,
                "Clear failed after reading configuration, interface {} may be partially cleared",
                interface
            );
            CfgMgrError::ClearIncomplete {
                interface: interface.to_string(),
                source: Box::new(e),
            }
        })
    }
}

impl fmt::Debug for NexusDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NexusDriver")
            .field("executor", &self.executor)
            .field("ignore", self.negation.ignore_list())
            .field("ssh_port", &self.ssh_port)
            .finish()
    }
}

/// Per-instance overrides for a [`NexusDriver`]
pub struct NexusDriverBuilder {
    factory: Arc<dyn TransportFactory>,
    dry_run: bool,
    ignore: IgnoreList,
    ssh_port: u16,
}

impl NexusDriverBuilder {
    /// Overrides dry-run; `None` keeps the settings value
    pub fn dry_run(mut self, dry_run: Option<bool>) -> Self {
        if let Some(dry_run) = dry_run {
            self.dry_run = dry_run;
        }
        self
    }

    pub fn ignore_list(mut self, ignore: IgnoreList) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn ssh_port(mut self, port: u16) -> Self {
        self.ssh_port = port;
        self
    }

    pub fn build(self) -> NexusDriver {
        NexusDriver {
            executor: SessionExecutor::new(self.factory, self.dry_run),
            negation: NegationEngine::new(self.ignore),
            ssh_port: self.ssh_port,
        }
    }
}
