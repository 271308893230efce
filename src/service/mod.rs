//! Service layer for deployment orchestration
//!
//! Sits between the CLI and the builder: turns a stack declaration into
//! provisioned services.

pub mod deploy;

pub use deploy::{
    deployment_spec, preload_model, DeploymentOrchestrator, DeploymentOutcome, ServiceFailure,
};
