//! Error types for stack validation

use thiserror::Error;

/// A deployment parameter or stack declaration that cannot produce a valid
/// resource specification. Raised before anything is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("service '{service}': {field} must not be empty")]
    EmptyField {
        service: String,
        field: &'static str,
    },

    #[error("service '{service}': container port must be positive")]
    InvalidPort { service: String },

    #[error("service '{service}': startup failure threshold must be positive")]
    InvalidFailureThreshold { service: String },

    #[error("service '{service}': storage bucket '{bucket}' requires a non-empty mount path")]
    MissingMountPath { service: String, bucket: String },

    #[error("service '{service}': mount path '{mount_path}' is set without a storage bucket")]
    MountPathWithoutBucket { service: String, mount_path: String },

    #[error("service '{service}': {count} GPU(s) requested but no accelerator class is configured")]
    MissingAccelerator { service: String, count: u32 },

    #[error("service '{service}': environment variable name must not be empty")]
    EmptyEnvName { service: String },

    #[error("service '{service}': environment variable '{name}' is declared more than once")]
    DuplicateEnvVar { service: String, name: String },

    #[error("service '{0}' is declared more than once")]
    DuplicateService(String),

    #[error("services '{first}' and '{second}' both map to platform name '{name}'")]
    ServiceNameCollision {
        first: String,
        second: String,
        name: String,
    },

    #[error("service '{service}' depends on unknown service '{dependency}'")]
    UnknownDependency { service: String, dependency: String },

    #[error("dependency cycle between services: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),

    #[error("model server '{0}' is not a declared service")]
    UnknownModelServer(String),
}

impl ValidationError {
    pub fn empty(service: impl Into<String>, field: &'static str) -> Self {
        Self::EmptyField {
            service: service.into(),
            field,
        }
    }
}
