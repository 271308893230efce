//! Deployment targets
//!
//! The spec builder is shared across targets; everything that differs between
//! a managed serverless platform and an orchestrated cluster is behind the
//! [`Platform`] trait.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{access, gpu, naming};
use crate::naming::shorten;


/// Supported deployment targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PlatformKind {
    /// Google Cloud Run services
    CloudRun,
    /// GKE Autopilot workloads
    Gke,
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformKind::CloudRun => write!(f, "cloud-run"),
            PlatformKind::Gke => write!(f, "gke"),
        }
    }
}

/// CPU allocation flags for platforms that throttle idle instances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTuning {
    pub cpu_idle: bool,
    pub startup_cpu_boost: bool,
}

/// Where a stack is deployed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub project: Option<String>,
    pub region: String,
    pub namespace: String,
}

/// Capabilities that vary between deployment targets
pub trait Platform: Send + Sync {
    fn kind(&self) -> PlatformKind;

    /// Suffix appended to the logical service name
    fn name_suffix(&self) -> &'static str;

    fn max_name_length(&self) -> usize {
        naming::MAX_SERVICE_NAME_LENGTH
    }

    /// Node selector key naming the accelerator class
    fn accelerator_selector_key(&self) -> &'static str;

    fn ingress(&self) -> &'static str;

    fn cpu_tuning(&self) -> Option<CpuTuning>;

    /// Whether resource requests repeat the limits
    fn mirrors_requests(&self) -> bool;

    /// Whether the latest revision is pinned to all traffic
    fn pins_latest_revision(&self) -> bool {
        false
    }

    /// Whether the service needs an explicit public invoker binding
    fn needs_invoker_binding(&self) -> bool {
        false
    }

    /// Whether workloads live in a namespace that must be declared first
    fn needs_namespace(&self) -> bool {
        false
    }

    /// Normalized platform name for a logical service name
    fn service_name(&self, logical_name: &str) -> String {
        shorten(
            &format!("{}{}", logical_name, self.name_suffix()),
            self.max_name_length(),
        )
    }

    /// Address the service becomes reachable at once provisioned
    fn service_address(&self, service_name: &str, port: u16, location: &Location) -> String;
}

/// Google Cloud Run
#[derive(Debug, Clone, Copy, Default)]
pub struct CloudRun;

impl Platform for CloudRun {
    fn kind(&self) -> PlatformKind {
        PlatformKind::CloudRun
    }

    fn name_suffix(&self) -> &'static str {
        naming::CLOUD_RUN_SUFFIX
    }

    fn accelerator_selector_key(&self) -> &'static str {
        gpu::CLOUD_RUN_SELECTOR_KEY
    }

    fn ingress(&self) -> &'static str {
        access::CLOUD_RUN_INGRESS
    }

    fn cpu_tuning(&self) -> Option<CpuTuning> {
        // Favor fast cold starts over idle-cost savings
        Some(CpuTuning {
            cpu_idle: false,
            startup_cpu_boost: true,
        })
    }

    fn mirrors_requests(&self) -> bool {
        false
    }

    fn pins_latest_revision(&self) -> bool {
        true
    }

    fn needs_invoker_binding(&self) -> bool {
        true
    }

    fn service_address(&self, service_name: &str, _port: u16, location: &Location) -> String {
        let project = location.project.as_deref().unwrap_or("default");
        let hash = sha256::digest(project);
        format!(
            "https://{}-{}.{}.run.app",
            service_name,
            &hash[..8],
            location.region
        )
    }
}

/// GKE Autopilot cluster
#[derive(Debug, Clone, Copy, Default)]
pub struct Gke;

impl Platform for Gke {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Gke
    }

    fn name_suffix(&self) -> &'static str {
        naming::GKE_SUFFIX
    }

    fn accelerator_selector_key(&self) -> &'static str {
        gpu::GKE_SELECTOR_KEY
    }

    fn ingress(&self) -> &'static str {
        access::GKE_INGRESS
    }

    fn cpu_tuning(&self) -> Option<CpuTuning> {
        None
    }

    fn mirrors_requests(&self) -> bool {
        true
    }

    fn needs_namespace(&self) -> bool {
        true
    }

    fn service_address(&self, service_name: &str, port: u16, location: &Location) -> String {
        format!(
            "http://{}.{}.svc.cluster.local:{}",
            service_name, location.namespace, port
        )
    }
}

impl PlatformKind {
    pub fn platform(self) -> Box<dyn Platform> {
        match self {
            PlatformKind::CloudRun => Box::new(CloudRun),
            PlatformKind::Gke => Box::new(Gke),
        }
    }
}
