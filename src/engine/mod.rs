//! Provisioning engines
//!
//! The engine is the boundary to whatever actually creates cloud resources.
//! Local engines predict addresses from the platform instead of asking a
//! cloud API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

use crate::platform::{Location, Platform, PlatformKind};
use crate::resource::Resource;


/// What an engine reports back after applying a resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    pub id: String,
    /// Reachable address, for services
    pub address: Option<String>,
    /// Whether the address was reported by live infrastructure rather than
    /// predicted from the platform's naming scheme
    pub observed: bool,
}

/// Narrow interface to the external provisioning engine
#[async_trait]
pub trait ProvisioningEngine: Send + Sync {
    /// Create or update a resource and wait until it is observable
    async fn apply(&self, resource: Resource) -> Result<Provisioned>;
}

/// Address a service resource will be reachable at
fn predicted(resource: &Resource, location: &Location) -> Provisioned {
    let address = match resource {
        Resource::Service(spec) => {
            let platform = spec.kind.platform();
            let port = spec
                .container()
                .map(|c| c.ports.container_port)
                .unwrap_or_default();
            Some(platform.service_address(&spec.name, port, location))
        }
        _ => None,
    };
    Provisioned {
        id: resource.id(),
        address,
        observed: false,
    }
}

/// Keeps applied resources in memory; used for plans and tests
pub struct RecordingEngine {
    location: Location,
    applied: Mutex<Vec<Resource>>,
}

impl RecordingEngine {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            applied: Mutex::new(Vec::new()),
        }
    }

    /// Resources in the order they were applied
    pub fn applied(&self) -> Vec<Resource> {
        self.applied
            .lock()
            .map(|applied| applied.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProvisioningEngine for RecordingEngine {
    async fn apply(&self, resource: Resource) -> Result<Provisioned> {
        let provisioned = predicted(&resource, &self.location);
        debug!("Recorded {}", provisioned.id);
        self.applied
            .lock()
            .map_err(|_| anyhow::anyhow!("Recording engine lock poisoned"))?
            .push(resource);
        Ok(provisioned)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ManifestDocument<'a> {
    generated_at: String,
    platform: PlatformKind,
    #[serde(flatten)]
    resource: &'a Resource,
}

/// Writes each applied resource as a JSON document into a directory
pub struct ManifestEngine {
    out_dir: PathBuf,
    platform: PlatformKind,
    location: Location,
}

impl ManifestEngine {
    pub fn new(out_dir: impl AsRef<Path>, platform: &dyn Platform, location: Location) -> Result<Self> {
        let out_dir = out_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&out_dir).with_context(|| {
            format!("Failed to create output directory: {}", out_dir.display())
        })?;
        Ok(Self {
            out_dir,
            platform: platform.kind(),
            location,
        })
    }

    pub fn manifest_path(&self, id: &str) -> PathBuf {
        self.out_dir.join(format!("{}.json", id))
    }
}

#[async_trait]
impl ProvisioningEngine for ManifestEngine {
    async fn apply(&self, resource: Resource) -> Result<Provisioned> {
        let provisioned = predicted(&resource, &self.location);
        let document = ManifestDocument {
            generated_at: chrono::Utc::now().to_rfc3339(),
            platform: self.platform,
            resource: &resource,
        };
        let content = serde_json::to_string_pretty(&document)?;
        let path = self.manifest_path(&provisioned.id);

        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write manifest: {}", path.display()))?;

        info!("Wrote {}", path.display());
        Ok(provisioned)
    }
}
