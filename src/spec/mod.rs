//! Normalized deployment parameters for a single service

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::constants::probe::DEFAULT_FAILURE_THRESHOLD;
use crate::error::ValidationError;
use crate::resource::EnvVar;


/// Everything needed to derive a resource specification for one service.
///
/// Built once from configuration (with dependency addresses already
/// substituted) and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentSpec {
    /// Logical service name, before platform suffix and shortening
    pub name: String,
    pub image: String,
    pub cpu: String,
    pub memory: String,
    pub gpu_count: Option<u32>,
    /// Accelerator class for GPU placement, e.g. `nvidia-l4`
    pub accelerator: Option<String>,
    pub container_port: u16,
    pub storage_bucket: Option<String>,
    pub mount_path: Option<String>,
    pub env: Vec<EnvVar>,
    pub startup_failure_threshold: u32,
}

impl DeploymentSpec {
    pub fn new(
        name: impl Into<String>,
        image: impl Into<String>,
        cpu: impl Into<String>,
        memory: impl Into<String>,
        container_port: u16,
    ) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            cpu: cpu.into(),
            memory: memory.into(),
            gpu_count: None,
            accelerator: None,
            container_port,
            storage_bucket: None,
            mount_path: None,
            env: Vec::new(),
            startup_failure_threshold: DEFAULT_FAILURE_THRESHOLD,
        }
    }

    pub fn with_gpus(mut self, count: u32, accelerator: impl Into<String>) -> Self {
        self.gpu_count = Some(count);
        self.accelerator = Some(accelerator.into());
        self
    }

    pub fn with_storage(mut self, bucket: impl Into<String>, mount_path: impl Into<String>) -> Self {
        self.storage_bucket = Some(bucket.into());
        self.mount_path = Some(mount_path.into());
        self
    }

    pub fn with_env(mut self, env: Vec<EnvVar>) -> Self {
        self.env = env;
        self
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.startup_failure_threshold = threshold;
        self
    }

    /// GPU count when at least one GPU is requested
    pub fn gpus(&self) -> Option<u32> {
        self.gpu_count.filter(|&n| n > 0)
    }

    /// Check every invariant the builder relies on
    pub fn validate(&self) -> Result<(), ValidationError> {
        let service = || self.name.clone();

        if self.name.trim().is_empty() {
            return Err(ValidationError::empty(service(), "name"));
        }
        if self.image.trim().is_empty() {
            return Err(ValidationError::empty(service(), "image"));
        }
        if self.cpu.trim().is_empty() {
            return Err(ValidationError::empty(service(), "cpu"));
        }
        if self.memory.trim().is_empty() {
            return Err(ValidationError::empty(service(), "memory"));
        }
        if self.container_port == 0 {
            return Err(ValidationError::InvalidPort { service: service() });
        }
        if self.startup_failure_threshold == 0 {
            return Err(ValidationError::InvalidFailureThreshold { service: service() });
        }

        if self
            .storage_bucket
            .as_deref()
            .is_some_and(|b| b.trim().is_empty())
        {
            return Err(ValidationError::empty(service(), "storage_bucket"));
        }

        match (&self.storage_bucket, &self.mount_path) {
            (Some(bucket), mount) if mount.as_deref().is_none_or(|m| m.trim().is_empty()) => {
                return Err(ValidationError::MissingMountPath {
                    service: service(),
                    bucket: bucket.clone(),
                });
            }
            (None, Some(mount_path)) => {
                return Err(ValidationError::MountPathWithoutBucket {
                    service: service(),
                    mount_path: mount_path.clone(),
                });
            }
            _ => {}
        }

        if let Some(count) = self.gpus() {
            if self
                .accelerator
                .as_deref()
                .is_none_or(|a| a.trim().is_empty())
            {
                return Err(ValidationError::MissingAccelerator {
                    service: service(),
                    count,
                });
            }
        }

        let mut seen = HashSet::new();
        for var in &self.env {
            if var.name.trim().is_empty() {
                return Err(ValidationError::EmptyEnvName { service: service() });
            }
            if !seen.insert(var.name.as_str()) {
                return Err(ValidationError::DuplicateEnvVar {
                    service: service(),
                    name: var.name.clone(),
                });
            }
        }

        Ok(())
    }
}
