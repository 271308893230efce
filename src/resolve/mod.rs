use std::collections::{BTreeSet, HashMap, HashSet};

use crate::config::{EnvEntry, ServiceConfig, StackConfig};
use crate::constants::SERVICE_REF_PREFIX;
use crate::error::ValidationError;
use crate::resource::EnvVar;

/// Service name and trailing path of a `service://<name>[/path]` value
pub fn service_reference(value: &str) -> Option<(&str, &str)> {
    let reference = value.strip_prefix(SERVICE_REF_PREFIX)?;
    Some(match reference.find('/') {
        Some(index) => reference.split_at(index),
        None => (reference, ""),
    })
}

/// All services a service must wait for: explicit `depends_on` entries plus
/// every `service://` reference in its environment
pub fn dependencies(service: &ServiceConfig) -> BTreeSet<String> {
    let mut deps: BTreeSet<String> = service.depends_on.iter().cloned().collect();
    for entry in &service.env {
        if let Some((name, _)) = service_reference(&entry.value) {
            deps.insert(name.to_string());
        }
    }
    deps
}

/// Group services into waves. Every service's dependencies sit in earlier
/// waves; declaration order is kept within a wave.
pub fn dependency_waves(config: &StackConfig) -> Result<Vec<Vec<String>>, ValidationError> {
    let declared: HashSet<&str> = config.services.iter().map(|s| s.name.as_str()).collect();

    let mut pending: Vec<(&str, BTreeSet<String>)> = Vec::new();
    for service in &config.services {
        let deps = dependencies(service);
        for dep in &deps {
            if !declared.contains(dep.as_str()) {
                return Err(ValidationError::UnknownDependency {
                    service: service.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
        pending.push((service.name.as_str(), deps));
    }

    let mut done: HashSet<String> = HashSet::new();
    let mut waves = Vec::new();

    while !pending.is_empty() {
        let (ready, blocked): (Vec<_>, Vec<_>) = pending
            .into_iter()
            .partition(|(_, deps)| deps.iter().all(|d| done.contains(d)));

        if ready.is_empty() {
            let mut cycle: Vec<String> = blocked.iter().map(|(n, _)| n.to_string()).collect();
            cycle.sort();
            return Err(ValidationError::DependencyCycle(cycle));
        }

        let wave: Vec<String> = ready.iter().map(|(n, _)| n.to_string()).collect();
        done.extend(wave.iter().cloned());
        waves.push(wave);
        pending = blocked;
    }

    Ok(waves)
}

/// Replace `service://` references with resolved addresses, keeping any path
pub fn resolve_env(
    service: &str,
    env: &[EnvEntry],
    addresses: &HashMap<String, String>,
) -> Result<Vec<EnvVar>, ValidationError> {
    env.iter()
        .map(|entry| {
            let value = match service_reference(&entry.value) {
                Some((target, path)) => {
                    let address = addresses.get(target).ok_or_else(|| {
                        ValidationError::UnknownDependency {
                            service: service.to_string(),
                            dependency: target.to_string(),
                        }
                    })?;
                    format!("{}{}", address.trim_end_matches('/'), path)
                }
                None => entry.value.clone(),
            };
            Ok(EnvVar::new(entry.name.clone(), value))
        })
        .collect()
}
