use serde::{Deserialize, Serialize};

/// The payload stored in one ephemeral registration node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceNode {
    pub host: String,
    pub port: u16,
    pub gpu: bool,
    pub available: bool,
}

/// One call-telemetry record as filed with a monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportBody {
    pub uid: i64,
    pub service: String,
    pub timestamp: String,
    pub duration: String,
    pub info: String,
}

/// Coordination and monitor messages.
///
/// `Register`/`Get`/`Set`/`Children` speak to the coordination service;
/// `Report`/`Query` speak to a monitor located through it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryMsg {
    Register { path: String, node: ServiceNode },
    Registered { path: String },
    Get { path: String },
    Node { node: ServiceNode },
    Set { path: String, node: ServiceNode },
    Children { path: String },
    Nodes { nodes: Vec<ServiceNode> },
    Missing { path: String },
    Report(ReportBody),
    Query { uid: i64 },
    Records(Vec<ReportBody>),
    Done,
}
