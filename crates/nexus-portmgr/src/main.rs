//! nexus-portmgr - Switch-port configuration manager
//!
//! Entry point for the nexus-portmgr command line.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use nexus_cfgmgr_common::Response;
use nexus_netconf::NetconfTransportFactory;
use nexus_portmgr::{InterfaceKind, NexusDriver, Operation, PortFile, Settings};

/// Cisco Nexus switch-port configuration manager
#[derive(Parser, Debug)]
#[command(name = "nexus-portmgr")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (TOML)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Log command batches without contacting the switch
    #[arg(long, global = true)]
    dry_run: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the running configuration of the port's interface
    Show {
        /// Interface context to read (ethernet or port-channel)
        #[arg(long, default_value = "ethernet")]
        kind: InterfaceKind,

        /// Print lines as a JSON array
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        port: PortArgs,
    },
    /// Provision the port with its VLAN
    Create(PortArgs),
    /// Add the port's VLAN
    Attach(PortArgs),
    /// Remove the port's VLAN
    Detach(PortArgs),
    /// Remove the VLAN, then tear the port down
    Delete(PortArgs),
    /// Undo every configuration line on the interface
    Clear(PortArgs),
    /// Print the batch an operation would send, without connecting
    Plan {
        /// show, create, attach, detach, delete or clear
        operation: Operation,

        #[command(flatten)]
        port: PortArgs,
    },
}

#[derive(Args, Debug)]
struct PortArgs {
    /// Port record file (TOML, or JSON with a .json extension)
    #[arg(long)]
    port_file: Option<PathBuf>,

    /// Physical interface, e.g. 1/20
    #[arg(long)]
    interface: Option<String>,

    #[arg(long)]
    vlan: Option<u16>,

    #[arg(long)]
    hardware_id: Option<String>,

    /// Host IP for the static source binding
    #[arg(long)]
    ip: Option<String>,

    /// Host MAC for the static source binding
    #[arg(long)]
    mac: Option<String>,

    /// Configure a trunk port-channel instead of an access port
    #[arg(long, overrides_with = "no_trunked")]
    trunked: bool,

    /// Configure an access port even if the port file says trunked
    #[arg(long, overrides_with = "trunked")]
    no_trunked: bool,

    #[arg(long)]
    switch_host: Option<String>,

    #[arg(long)]
    switch_username: Option<String>,

    #[arg(long, env = "NEXUS_SWITCH_PASSWORD", hide_env_values = true)]
    switch_password: Option<String>,
}

impl PortArgs {
    fn overrides(&self) -> PortFile {
        PortFile {
            interface: self.interface.clone(),
            hardware_id: self.hardware_id.clone(),
            vlan_id: self.vlan,
            ip: self.ip.clone(),
            mac_address: self.mac.clone(),
            trunked: self.trunked_override(),
            switch_host: self.switch_host.clone(),
            switch_username: self.switch_username.clone(),
            switch_password: self.switch_password.clone(),
        }
    }

    /// The last of `--trunked`/`--no-trunked` wins; neither keeps the file's value
    fn trunked_override(&self) -> Option<bool> {
        if self.trunked {
            Some(true)
        } else if self.no_trunked {
            Some(false)
        } else {
            None
        }
    }

    fn resolve(&self) -> anyhow::Result<nexus_portmgr::Port> {
        PortFile::resolve(self.port_file.as_deref(), &self.overrides())
            .context("Failed to read port")
    }
}

/// Initializes tracing/logging subsystem
///
/// `RUST_LOG` takes precedence over `--log-level`. Logs go to stderr so
/// command output stays clean.
fn init_logging(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

fn print_reply(reply: Option<Response>) {
    match reply.as_ref().map(Response::payload) {
        Some(Ok(payload)) if !payload.trim().is_empty() => println!("{}", payload.trim_end()),
        Some(Err(e)) => debug!("Reply has no single payload: {}", e),
        _ => {}
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    let factory = Arc::new(NetconfTransportFactory::new(settings.ssh.clone()));
    let driver = NexusDriver::builder(factory, &settings)
        .dry_run(cli.dry_run.then_some(true))
        .build();

    match cli.command {
        Command::Show { kind, json, port } => {
            let lines = driver.show_kind(&port.resolve()?, kind).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&lines)?);
            } else {
                for line in lines {
                    println!("{}", line);
                }
            }
        }
        Command::Create(port) => print_reply(driver.create(&port.resolve()?).await?),
        Command::Attach(port) => print_reply(driver.attach(&port.resolve()?).await?),
        Command::Detach(port) => print_reply(driver.detach(&port.resolve()?).await?),
        Command::Delete(port) => print_reply(driver.delete(&port.resolve()?).await?),
        Command::Clear(port) => print_reply(driver.clear(&port.resolve()?).await?),
        Command::Plan { operation, port } => {
            for cmd in operation.plan(&port.resolve()?)? {
                println!("{}", cmd);
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli.log_level) {
        eprintln!("{:#}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port_args(args: &[&str]) -> PortArgs {
        let argv = ["nexus-portmgr", "create"].iter().chain(args).copied();
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Create(port) => port,
            other => panic!("Expected create, got {:?}", other),
        }
    }

    #[test]
    fn test_trunked_flags() {
        assert_eq!(port_args(&[]).overrides().trunked, None);
        assert_eq!(port_args(&["--trunked"]).overrides().trunked, Some(true));
        assert_eq!(port_args(&["--no-trunked"]).overrides().trunked, Some(false));
        assert_eq!(
            port_args(&["--trunked", "--no-trunked"]).overrides().trunked,
            Some(false)
        );
    }

    #[test]
    fn test_no_trunked_overrides_port_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        std::io::Write::write_all(
            &mut file,
            b"interface = \"1/20\"\nvlan_id = 100\ntrunked = true\nswitch_host = \"10.0.0.1\"\nswitch_username = \"admin\"\n",
        )
        .unwrap();
        let path = file.path().to_string_lossy().into_owned();

        assert!(port_args(&["--port-file", &path]).resolve().unwrap().trunked);
        assert!(
            !port_args(&["--port-file", &path, "--no-trunked"])
                .resolve()
                .unwrap()
                .trunked
        );
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
