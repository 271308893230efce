use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::platform::PlatformKind;

/// Managed compute service specification handed to the provisioning engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    pub kind: PlatformKind,
    pub name: String,
    pub template: Template,
    pub ingress: String,
    pub deletion_protection: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traffic: Vec<TrafficTarget>,
}

/// Revision template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub containers: Vec<Container>,
    pub scaling: Scaling,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_zonal_redundancy_disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub image: String,
    pub resources: Resources,
    pub ports: ContainerPort,
    pub startup_probe: StartupProbe,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<VolumeMount>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub envs: Vec<EnvVar>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resources {
    pub limits: ResourceQuantity,
    /// Kubernetes schedules on requests; Cloud Run has none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests: Option<ResourceQuantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_idle: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup_cpu_boost: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceQuantity {
    pub cpu: String,
    pub memory: String,
    #[serde(
        rename = "nvidia.com/gpu",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub gpu: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    pub container_port: u16,
}

/// TCP startup probe; tolerates long cold starts before traffic is routed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartupProbe {
    pub initial_delay_seconds: u32,
    pub timeout_seconds: u32,
    pub period_seconds: u32,
    pub failure_threshold: u32,
    pub tcp_socket: TcpSocket,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TcpSocket {
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scaling {
    pub min_instance_count: u32,
    pub max_instance_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub name: String,
    pub gcs: GcsVolumeSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcsVolumeSource {
    pub bucket: String,
    pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficTarget {
    #[serde(rename = "type")]
    pub allocation_type: String,
    pub percent: u32,
}

/// Object storage bucket backing a service volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketSpec {
    pub name: String,
    pub location: String,
    pub force_destroy: bool,
    pub uniform_bucket_level_access: bool,
}

/// IAM binding that lets the listed members invoke a service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokerBindingSpec {
    pub service: String,
    pub location: String,
    pub role: String,
    pub members: Vec<String>,
}

/// Kubernetes namespace holding every workload of a stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceSpec {
    pub name: String,
}

/// Anything the orchestrator submits to a provisioning engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resource", rename_all = "camelCase")]
pub enum Resource {
    Namespace(NamespaceSpec),
    Bucket(BucketSpec),
    Service(ResourceSpec),
    InvokerBinding(InvokerBindingSpec),
}

impl Resource {
    /// Stable identifier used for logging and manifest file names
    pub fn id(&self) -> String {
        match self {
            Resource::Namespace(n) => format!("namespace-{}", n.name),
            Resource::Bucket(b) => format!("bucket-{}", b.name),
            Resource::Service(s) => format!("service-{}", s.name),
            Resource::InvokerBinding(b) => format!("binding-{}", b.service),
        }
    }
}

impl ResourceSpec {
    /// sha256 of the canonical JSON form; equal specs have equal fingerprints
    pub fn fingerprint(&self) -> anyhow::Result<String> {
        let canonical = serde_json::to_vec(&serde_json::to_value(self)?)?;
        Ok(sha256::digest(&canonical))
    }

    /// The single container of the template
    pub fn container(&self) -> Option<&Container> {
        self.template.containers.first()
    }
}
