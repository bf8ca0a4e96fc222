//! Service discovery: registrar, reporter and the coordination seam.

use std::{
    collections::HashMap,
    io,
    sync::atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use log::{debug, info};
use parking_lot::Mutex;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};

use wire::{
    msg::Msg,
    specs::registry::{RegistryMsg, ReportBody, ServiceNode},
};

use crate::error::{Result, TrainErr};

/// The coordination-service contract.
///
/// Ephemeral lifetime (nodes vanishing with their session) is the
/// external service's concern; this seam only names the operations the
/// trainer uses.
#[async_trait]
pub trait Coordinator: Send + Sync {
    /// Creates a sequence-suffixed ephemeral node and returns its actual
    /// path.
    async fn create_ephemeral(&self, path: &str, node: &ServiceNode) -> Result<String>;

    async fn get(&self, path: &str) -> Result<ServiceNode>;

    async fn set(&self, path: &str, node: &ServiceNode) -> Result<()>;

    /// The nodes registered under `path`.
    async fn children(&self, path: &str) -> Result<Vec<ServiceNode>>;
}

/// Keeps one ephemeral service node registered and up to date.
pub struct Registrar<C> {
    coordinator: C,
    service_path: String,
    node: ServiceNode,
    node_path: Mutex<Option<String>>,
}

impl<C: Coordinator> Registrar<C> {
    pub fn new(coordinator: C, service_path: impl Into<String>, node: ServiceNode) -> Self {
        Self {
            coordinator,
            service_path: service_path.into(),
            node,
            node_path: Mutex::new(None),
        }
    }

    pub fn service_path(&self) -> &str {
        &self.service_path
    }

    pub fn coordinator(&self) -> &C {
        &self.coordinator
    }

    /// Registers the service node, remembering its actual path.
    ///
    /// There is no explicit deregistration; the node disappears with the
    /// coordination session.
    pub async fn register(&self) -> Result<()> {
        let path = self
            .coordinator
            .create_ephemeral(&format!("{}/service", self.service_path), &self.node)
            .await?;

        info!("registered service node at {path}");
        *self.node_path.lock() = Some(path);
        Ok(())
    }

    /// Read-modify-writes the node's availability flag.
    ///
    /// Advisory only; a dispatcher may still race a job to a node that
    /// just flipped to busy.
    pub async fn set_availability(&self, state: bool) -> Result<()> {
        let path = self
            .node_path
            .lock()
            .clone()
            .ok_or(TrainErr::NotRegistered)?;

        let mut node = self.coordinator.get(&path).await?;
        node.available = state;
        self.coordinator.set(&path, &node).await?;

        debug!("availability of {path} set to {state}");
        Ok(())
    }
}

/// Posts call reports to a monitor discovered once at construction.
pub struct Reporter {
    monitors: Vec<ServiceNode>,
}

impl Reporter {
    /// Lists the monitor nodes under `monitor_path` once and keeps them.
    pub async fn discover<C: Coordinator>(coordinator: &C, monitor_path: &str) -> Result<Self> {
        let monitors = coordinator.children(monitor_path).await?;
        info!("discovered {} monitor(s)", monitors.len());

        Ok(Self { monitors })
    }

    /// Posts one report to the first discovered monitor over a fresh
    /// connection. No failover.
    pub async fn report(&self, body: &ReportBody) -> Result<()> {
        let monitor = self.monitors.first().ok_or(TrainErr::NoMonitor)?;

        let stream = TcpStream::connect((monitor.host.as_str(), monitor.port))
            .await
            .map_err(TrainErr::Coordination)?;
        let (rx, tx) = stream.into_split();

        Self::report_over(rx, tx, body).await
    }

    /// The report protocol over already-connected halves.
    pub async fn report_over<R, W>(rx: R, tx: W, body: &ReportBody) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let (mut rx, mut tx) = wire::channel(rx, tx);

        tx.send(&Msg::Registry(RegistryMsg::Report(body.clone())))
            .await
            .map_err(TrainErr::Coordination)?;

        let msg: Msg = rx.recv().await.map_err(TrainErr::Coordination)?;
        match msg {
            Msg::Registry(RegistryMsg::Done) => Ok(()),
            other => Err(TrainErr::Coordination(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("monitor answered with {other:?}"),
            ))),
        }
    }
}

/// An in-memory coordinator for tests and single-process runs.
///
/// Nodes never expire; ephemerality is exercised only against a real
/// coordination service.
#[derive(Debug, Default)]
pub struct MemCoordinator {
    nodes: Mutex<HashMap<String, ServiceNode>>,
    sequence: AtomicU64,
}

impl MemCoordinator {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Coordinator for MemCoordinator {
    async fn create_ephemeral(&self, path: &str, node: &ServiceNode) -> Result<String> {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let real_path = format!("{path}{seq:010}");

        self.nodes.lock().insert(real_path.clone(), node.clone());
        Ok(real_path)
    }

    async fn get(&self, path: &str) -> Result<ServiceNode> {
        self.nodes.lock().get(path).cloned().ok_or_else(|| {
            TrainErr::Coordination(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no node at {path}"),
            ))
        })
    }

    async fn set(&self, path: &str, node: &ServiceNode) -> Result<()> {
        let mut nodes = self.nodes.lock();
        if !nodes.contains_key(path) {
            return Err(TrainErr::Coordination(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no node at {path}"),
            )));
        }

        nodes.insert(path.to_string(), node.clone());
        Ok(())
    }

    async fn children(&self, path: &str) -> Result<Vec<ServiceNode>> {
        let prefix = format!("{path}/");
        let mut entries: Vec<(String, ServiceNode)> = self
            .nodes
            .lock()
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(key, node)| (key.clone(), node.clone()))
            .collect();

        // Sequence order, like the real service lists them.
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries.into_iter().map(|(_, node)| node).collect())
    }
}

/// A coordinator client speaking the framed protocol to a coordination
/// bridge, one fresh connection per operation.
pub struct WireCoordinator {
    addr: String,
}

impl WireCoordinator {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    async fn exchange(&self, request: RegistryMsg) -> Result<RegistryMsg> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(TrainErr::Coordination)?;
        let (rx, tx) = stream.into_split();
        let (mut rx, mut tx) = wire::channel(rx, tx);

        tx.send(&Msg::Registry(request))
            .await
            .map_err(TrainErr::Coordination)?;

        let msg: Msg = rx.recv().await.map_err(TrainErr::Coordination)?;
        match msg {
            Msg::Registry(reply) => Ok(reply),
            other => Err(Self::protocol_error(&other)),
        }
    }

    fn protocol_error(got: &impl std::fmt::Debug) -> TrainErr {
        TrainErr::Coordination(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unexpected coordination reply: {got:?}"),
        ))
    }
}

#[async_trait]
impl Coordinator for WireCoordinator {
    async fn create_ephemeral(&self, path: &str, node: &ServiceNode) -> Result<String> {
        let request = RegistryMsg::Register {
            path: path.to_string(),
            node: node.clone(),
        };

        match self.exchange(request).await? {
            RegistryMsg::Registered { path } => Ok(path),
            other => Err(Self::protocol_error(&other)),
        }
    }

    async fn get(&self, path: &str) -> Result<ServiceNode> {
        let request = RegistryMsg::Get {
            path: path.to_string(),
        };

        match self.exchange(request).await? {
            RegistryMsg::Node { node } => Ok(node),
            RegistryMsg::Missing { path } => Err(TrainErr::Coordination(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no node at {path}"),
            ))),
            other => Err(Self::protocol_error(&other)),
        }
    }

    async fn set(&self, path: &str, node: &ServiceNode) -> Result<()> {
        let request = RegistryMsg::Set {
            path: path.to_string(),
            node: node.clone(),
        };

        match self.exchange(request).await? {
            RegistryMsg::Done => Ok(()),
            other => Err(Self::protocol_error(&other)),
        }
    }

    async fn children(&self, path: &str) -> Result<Vec<ServiceNode>> {
        let request = RegistryMsg::Children {
            path: path.to_string(),
        };

        match self.exchange(request).await? {
            RegistryMsg::Nodes { nodes } => Ok(nodes),
            other => Err(Self::protocol_error(&other)),
        }
    }
}
