//! Deployment orchestration
//!
//! Provisions the services of a stack in dependency waves, feeding each
//! service's address into the services that reference it.

use anyhow::Result;
use futures_util::future::join_all;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{error, info, warn};

use crate::{
    builder::ServiceSpecBuilder,
    config::{ServiceConfig, StackConfig},
    constants::access,
    engine::ProvisioningEngine,
    error::ValidationError,
    platform::Platform,
    preload::{preload_with_retry, ModelPreloader, PreloadOutcome, RetryPolicy},
    resolve::{dependencies, dependency_waves, resolve_env},
    resource::{BucketSpec, InvokerBindingSpec, NamespaceSpec, Resource},
    spec::DeploymentSpec,
};

/// A service that failed to provision
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceFailure {
    pub service: String,
    pub error: String,
}

/// Result of provisioning a stack
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeploymentOutcome {
    /// Logical service name to reachable address
    pub addresses: BTreeMap<String, String>,
    pub failed: Vec<ServiceFailure>,
    /// Services not attempted because a dependency failed
    pub skipped: Vec<String>,
    /// Services whose address was predicted by the engine, not observed
    pub predicted: BTreeSet<String>,
}

impl DeploymentOutcome {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    /// Named values exported at program completion
    pub fn exports(&self, model: &str) -> BTreeMap<String, String> {
        let mut exports = BTreeMap::new();
        exports.insert("model".to_string(), model.to_string());
        for (service, address) in &self.addresses {
            exports.insert(format!("{}_url", service), address.clone());
        }
        exports
    }
}

/// Turn a service declaration into deployment parameters, with every
/// `service://` reference replaced by the resolved address
pub fn deployment_spec(
    stack: &StackConfig,
    service: &ServiceConfig,
    addresses: &HashMap<String, String>,
) -> Result<DeploymentSpec, ValidationError> {
    let env = resolve_env(&service.name, &service.env, addresses)?;

    let spec = DeploymentSpec {
        name: service.name.clone(),
        image: service.image.clone(),
        cpu: service.cpu.to_string(),
        memory: service.memory.clone(),
        gpu_count: service.gpu_count,
        accelerator: service
            .accelerator
            .clone()
            .or_else(|| Some(stack.accelerator.clone())),
        container_port: service.port,
        storage_bucket: service.storage_bucket.clone(),
        mount_path: service.mount_path.clone(),
        env,
        startup_failure_threshold: service.startup_failure_threshold,
    };
    spec.validate()?;
    Ok(spec)
}

/// Drives a stack through a provisioning engine
pub struct DeploymentOrchestrator<'a> {
    stack: &'a StackConfig,
    platform: &'a dyn Platform,
    engine: &'a dyn ProvisioningEngine,
}

impl<'a> DeploymentOrchestrator<'a> {
    pub fn new(
        stack: &'a StackConfig,
        platform: &'a dyn Platform,
        engine: &'a dyn ProvisioningEngine,
    ) -> Self {
        Self {
            stack,
            platform,
            engine,
        }
    }

    /// Validate everything that can be checked without addresses, so bad
    /// declarations fail before anything is submitted
    pub fn preflight(&self) -> Result<Vec<Vec<String>>, ValidationError> {
        self.stack.validate()?;
        self.check_platform_names()?;
        let waves = dependency_waves(self.stack)?;

        // Placeholder addresses let reference-carrying specs validate too
        let placeholders: HashMap<String, String> = self
            .stack
            .services
            .iter()
            .map(|s| (s.name.clone(), format!("https://{}.invalid", s.name)))
            .collect();
        let builder = ServiceSpecBuilder::new(self.platform);
        for service in &self.stack.services {
            let spec = deployment_spec(self.stack, service, &placeholders)?;
            builder.build(&spec)?;
        }

        Ok(waves)
    }

    /// Distinct logical names must stay distinct once shortened, or two
    /// services would share one resource and one address
    fn check_platform_names(&self) -> Result<(), ValidationError> {
        let mut seen: HashMap<String, &str> = HashMap::new();
        for service in &self.stack.services {
            let name = self.platform.service_name(&service.name);
            if let Some(first) = seen.insert(name.clone(), &service.name) {
                return Err(ValidationError::ServiceNameCollision {
                    first: first.to_string(),
                    second: service.name.clone(),
                    name,
                });
            }
        }
        Ok(())
    }

    /// Provision every service. Failures are collected, not propagated:
    /// dependents of a failed service are skipped, independent services
    /// still proceed, and nothing already applied is rolled back.
    pub async fn deploy(&self) -> Result<DeploymentOutcome> {
        let waves = self.preflight()?;
        let mut outcome = DeploymentOutcome::default();
        let mut addresses: HashMap<String, String> = HashMap::new();
        let mut unavailable: HashSet<String> = HashSet::new();

        if let Err(message) = self.declare_namespace().await {
            for service in &self.stack.services {
                outcome.failed.push(ServiceFailure {
                    service: service.name.clone(),
                    error: message.clone(),
                });
            }
            return Ok(outcome);
        }

        let failed_buckets = self.declare_buckets().await;

        for (index, wave) in waves.iter().enumerate() {
            let mut runnable = Vec::new();
            for name in wave {
                let Some(service) = self.stack.service(name) else {
                    continue;
                };
                if let Some(message) = service
                    .storage_bucket
                    .as_ref()
                    .and_then(|b| failed_buckets.get(b))
                {
                    unavailable.insert(name.clone());
                    outcome.failed.push(ServiceFailure {
                        service: name.clone(),
                        error: message.clone(),
                    });
                    continue;
                }
                let blocked: Vec<String> = dependencies(service)
                    .into_iter()
                    .filter(|d| unavailable.contains(d))
                    .collect();
                if blocked.is_empty() {
                    runnable.push(service);
                } else {
                    warn!(
                        service = %name,
                        blocked_on = ?blocked,
                        "Skipping service because a dependency failed"
                    );
                    unavailable.insert(name.clone());
                    outcome.skipped.push(name.clone());
                }
            }

            info!(
                wave = index + 1,
                services = ?runnable.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
                "Provisioning wave"
            );

            let results = join_all(
                runnable
                    .iter()
                    .map(|service| self.provision_service(service, &addresses)),
            )
            .await;

            for (service, result) in runnable.iter().zip(results) {
                match result {
                    Ok((address, observed)) => {
                        info!(service = %service.name, address = %address, observed, "Service provisioned");
                        if !observed {
                            outcome.predicted.insert(service.name.clone());
                        }
                        addresses.insert(service.name.clone(), address.clone());
                        outcome.addresses.insert(service.name.clone(), address);
                    }
                    Err(e) => {
                        let message = format!("{:#}", e);
                        error!(service = %service.name, error = %message, "Service failed");
                        unavailable.insert(service.name.clone());
                        outcome.failed.push(ServiceFailure {
                            service: service.name.clone(),
                            error: message,
                        });
                    }
                }
            }
        }

        Ok(outcome)
    }

    /// Declare the stack namespace on platforms that scope workloads by one
    async fn declare_namespace(&self) -> Result<(), String> {
        if !self.platform.needs_namespace() {
            return Ok(());
        }
        let name = self.stack.location().namespace;
        self.engine
            .apply(Resource::Namespace(NamespaceSpec { name: name.clone() }))
            .await
            .map(|_| ())
            .map_err(|e| {
                let message = format!("Failed to provision namespace {}: {:#}", name, e);
                error!(namespace = %name, error = %message, "Namespace failed");
                message
            })
    }

    /// Declare each distinct storage bucket once, before any service mounts
    /// it. Returns the buckets that failed, with their errors.
    async fn declare_buckets(&self) -> HashMap<String, String> {
        let mut declared = HashSet::new();
        let mut failed = HashMap::new();
        for bucket in self
            .stack
            .services
            .iter()
            .filter_map(|s| s.storage_bucket.as_ref())
        {
            if !declared.insert(bucket) {
                continue;
            }
            let result = self
                .engine
                .apply(Resource::Bucket(BucketSpec {
                    name: bucket.clone(),
                    location: self.stack.region.clone(),
                    force_destroy: true,
                    uniform_bucket_level_access: true,
                }))
                .await;
            if let Err(e) = result {
                let message = format!("Failed to provision bucket {}: {:#}", bucket, e);
                error!(bucket = %bucket, error = %message, "Bucket failed");
                failed.insert(bucket.clone(), message);
            }
        }
        failed
    }

    async fn provision_service(
        &self,
        service: &ServiceConfig,
        addresses: &HashMap<String, String>,
    ) -> Result<(String, bool)> {
        let spec = deployment_spec(self.stack, service, addresses)?;
        let resource = ServiceSpecBuilder::new(self.platform).build(&spec)?;
        let service_name = resource.name.clone();

        let provisioned = self
            .engine
            .apply(Resource::Service(resource))
            .await
            .map_err(|e| e.context(format!("Failed to provision service {}", service.name)))?;

        let address = provisioned.address.ok_or_else(|| {
            anyhow::anyhow!("Engine returned no address for service {}", service.name)
        })?;

        if self.platform.needs_invoker_binding() {
            self.engine
                .apply(Resource::InvokerBinding(InvokerBindingSpec {
                    service: service_name,
                    location: self.stack.region.clone(),
                    role: access::INVOKER_ROLE.to_string(),
                    members: vec![access::ALL_USERS.to_string()],
                }))
                .await
                .map_err(|e| {
                    e.context(format!("Failed to bind invoker for service {}", service.name))
                })?;
        }

        Ok((address, provisioned.observed))
    }
}

/// Ask the model server to pull the configured model. Runs only when preload
/// is enabled and the model server was provisioned at an observed address.
pub async fn preload_model(
    stack: &StackConfig,
    outcome: &DeploymentOutcome,
    preloader: &dyn ModelPreloader,
    policy: &RetryPolicy,
) -> Option<PreloadOutcome> {
    if !stack.model.preload {
        return None;
    }
    let Some(address) = outcome.addresses.get(&stack.model.server) else {
        warn!(
            server = %stack.model.server,
            "Model server was not provisioned, skipping preload"
        );
        return None;
    };
    if outcome.predicted.contains(&stack.model.server) {
        info!(
            server = %stack.model.server,
            address = %address,
            "Model server address is predicted, not live; skipping preload"
        );
        return None;
    }

    info!(model = %stack.model.name, server = %address, "Preloading model");
    Some(preload_with_retry(preloader, address, &stack.model.name, policy).await)
}
