use std::collections::BTreeMap;
use tracing::debug;

use crate::constants::{access, probe, scaling};
use crate::error::ValidationError;
use crate::platform::Platform;
use crate::resource::{
    Container, ContainerPort, GcsVolumeSource, ResourceQuantity, ResourceSpec, Resources, Scaling,
    StartupProbe, TcpSocket, Template, TrafficTarget, Volume, VolumeMount,
};
use crate::spec::DeploymentSpec;

#[cfg(test)]
mod tests;

/// Derives platform resource specifications from deployment parameters.
///
/// Building is pure: the same [`DeploymentSpec`] always yields the same
/// [`ResourceSpec`], and nothing outside the spec and the platform is read.
pub struct ServiceSpecBuilder<'a> {
    platform: &'a dyn Platform,
}

/// Node placement for GPU workloads
struct GpuPlacement {
    node_selector: BTreeMap<String, String>,
    zonal_redundancy_disabled: bool,
}

/// Bucket volume and the matching container mount
struct Storage {
    volume: Volume,
    mount: VolumeMount,
}

impl<'a> ServiceSpecBuilder<'a> {
    pub fn new(platform: &'a dyn Platform) -> Self {
        Self { platform }
    }

    pub fn build(&self, spec: &DeploymentSpec) -> Result<ResourceSpec, ValidationError> {
        spec.validate()?;

        let limits = Self::limits(spec);
        let placement = self.gpu_placement(spec);
        let storage = Self::storage(spec);

        let tuning = self.platform.cpu_tuning();
        let resources = Resources {
            requests: self.platform.mirrors_requests().then(|| limits.clone()),
            limits,
            cpu_idle: tuning.map(|t| t.cpu_idle),
            startup_cpu_boost: tuning.map(|t| t.startup_cpu_boost),
        };

        let container = Container {
            image: spec.image.clone(),
            resources,
            ports: ContainerPort {
                container_port: spec.container_port,
            },
            startup_probe: Self::startup_probe(spec),
            volume_mounts: storage.iter().map(|s| s.mount.clone()).collect(),
            envs: spec.env.clone(),
        };

        let (node_selector, gpu_zonal_redundancy_disabled) = match placement {
            Some(p) => (p.node_selector, Some(p.zonal_redundancy_disabled)),
            None => (BTreeMap::new(), None),
        };

        let template = Template {
            containers: vec![container],
            scaling: Scaling {
                min_instance_count: scaling::MIN_INSTANCES,
                max_instance_count: scaling::MAX_INSTANCES,
            },
            node_selector,
            gpu_zonal_redundancy_disabled,
            volumes: storage.into_iter().map(|s| s.volume).collect(),
        };

        let traffic = if self.platform.pins_latest_revision() {
            vec![TrafficTarget {
                allocation_type: access::LATEST_REVISION.to_string(),
                percent: 100,
            }]
        } else {
            Vec::new()
        };

        let name = self.platform.service_name(&spec.name);
        debug!(service = %spec.name, name = %name, platform = %self.platform.kind(), "Built resource spec");

        Ok(ResourceSpec {
            kind: self.platform.kind(),
            name,
            template,
            ingress: self.platform.ingress().to_string(),
            deletion_protection: false,
            traffic,
        })
    }

    fn limits(spec: &DeploymentSpec) -> ResourceQuantity {
        ResourceQuantity {
            cpu: spec.cpu.clone(),
            memory: spec.memory.clone(),
            gpu: spec.gpus(),
        }
    }

    fn startup_probe(spec: &DeploymentSpec) -> StartupProbe {
        StartupProbe {
            initial_delay_seconds: probe::INITIAL_DELAY_SECONDS,
            timeout_seconds: probe::TIMEOUT_SECONDS,
            period_seconds: probe::PERIOD_SECONDS,
            failure_threshold: spec.startup_failure_threshold,
            tcp_socket: TcpSocket {
                port: spec.container_port,
            },
        }
    }

    fn gpu_placement(&self, spec: &DeploymentSpec) -> Option<GpuPlacement> {
        spec.gpus()?;
        // validate() guarantees an accelerator whenever GPUs are requested
        let accelerator = spec.accelerator.clone()?;

        let mut node_selector = BTreeMap::new();
        node_selector.insert(
            self.platform.accelerator_selector_key().to_string(),
            accelerator,
        );
        Some(GpuPlacement {
            node_selector,
            zonal_redundancy_disabled: true,
        })
    }

    fn storage(spec: &DeploymentSpec) -> Option<Storage> {
        let bucket = spec.storage_bucket.clone()?;
        let mount_path = spec.mount_path.clone()?;

        Some(Storage {
            volume: Volume {
                name: bucket.clone(),
                gcs: GcsVolumeSource {
                    bucket: bucket.clone(),
                    read_only: false,
                },
            },
            mount: VolumeMount {
                name: bucket,
                mount_path,
            },
        })
    }
}
