use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tracing::debug;

use crate::constants::{defaults, gpu, probe, SERVICE_REF_PREFIX};
use crate::error::ValidationError;
use crate::platform::{Location, PlatformKind};

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackConfig {
    /// Prefix for every named resource in the stack
    #[serde(default = "default_base_name")]
    pub base_name: String,

    /// Deployment target
    #[serde(default = "default_platform")]
    pub platform: PlatformKind,

    /// Cloud project id
    pub project: Option<String>,

    /// Region for services and buckets
    #[serde(default = "default_region")]
    pub region: String,

    /// Kubernetes namespace (GKE only); defaults to the base name
    pub namespace: Option<String>,

    /// Accelerator class for services that request GPUs
    #[serde(default = "default_accelerator")]
    pub accelerator: String,

    /// Model served by the stack
    #[serde(default)]
    pub model: ModelConfig,

    /// Image of the agent service; the default stack includes the agent
    /// only when this is set
    pub agent_image: Option<String>,

    /// Services in declaration order; the default LLM stack when empty
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier, e.g. `gemma3:latest`
    #[serde(default = "default_model")]
    pub name: String,

    /// Service that serves the model and accepts pull requests
    #[serde(default = "default_model_server")]
    pub server: String,

    /// Ask the model server to pull the model after it is provisioned
    #[serde(default = "default_true")]
    pub preload: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub image: String,

    #[serde(default = "default_cpu")]
    pub cpu: Quantity,

    #[serde(default = "default_memory")]
    pub memory: String,

    pub gpu_count: Option<u32>,

    /// Overrides the stack accelerator
    pub accelerator: Option<String>,

    pub port: u16,

    pub storage_bucket: Option<String>,

    pub mount_path: Option<String>,

    /// Values of the form `service://<name>` resolve to that service's
    /// address; `service://<name>/<path>` appends the path to it
    #[serde(default)]
    pub env: Vec<EnvEntry>,

    /// Services that must be provisioned first
    #[serde(default)]
    pub depends_on: Vec<String>,

    #[serde(default = "default_failure_threshold")]
    pub startup_failure_threshold: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvEntry {
    pub name: String,
    pub value: String,
}

/// CPU quantity; TOML may give it as a string or an integer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Count(u64),
    Text(String),
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantity::Count(n) => write!(f, "{}", n),
            Quantity::Text(s) => write!(f, "{}", s),
        }
    }
}

fn default_base_name() -> String {
    defaults::BASE_NAME.to_string()
}

fn default_platform() -> PlatformKind {
    PlatformKind::CloudRun
}

fn default_region() -> String {
    defaults::REGION.to_string()
}

fn default_accelerator() -> String {
    gpu::DEFAULT_ACCELERATOR.to_string()
}

fn default_model() -> String {
    defaults::MODEL.to_string()
}

fn default_model_server() -> String {
    defaults::MODEL_SERVER.to_string()
}

fn default_true() -> bool {
    true
}

fn default_cpu() -> Quantity {
    Quantity::Text(defaults::CPU.to_string())
}

fn default_memory() -> String {
    defaults::MEMORY.to_string()
}

fn default_failure_threshold() -> u32 {
    probe::DEFAULT_FAILURE_THRESHOLD
}

fn env(name: &str, value: impl Into<String>) -> EnvEntry {
    EnvEntry {
        name: name.to_string(),
        value: value.into(),
    }
}

/// Inference engine, chat UI wired to it, and the agent when its image is
/// configured
pub fn llm_services(stack: &StackConfig) -> Vec<ServiceConfig> {
    let ollama_ref = format!("{}ollama", SERVICE_REF_PREFIX);

    let mut services = vec![
        ServiceConfig {
            name: "ollama".to_string(),
            image: defaults::OLLAMA_IMAGE.to_string(),
            cpu: default_cpu(),
            memory: default_memory(),
            gpu_count: Some(1),
            accelerator: None,
            port: defaults::OLLAMA_PORT,
            storage_bucket: Some(format!("{}-llm-bucket", stack.base_name)),
            mount_path: Some(defaults::OLLAMA_MOUNT_PATH.to_string()),
            env: Vec::new(),
            depends_on: Vec::new(),
            startup_failure_threshold: probe::DEFAULT_FAILURE_THRESHOLD,
        },
        ServiceConfig {
            name: "openwebui".to_string(),
            image: defaults::OPENWEBUI_IMAGE.to_string(),
            cpu: default_cpu(),
            memory: default_memory(),
            gpu_count: None,
            accelerator: None,
            port: defaults::OPENWEBUI_PORT,
            storage_bucket: None,
            mount_path: None,
            env: vec![
                env("OLLAMA_BASE_URL", ollama_ref.clone()),
                env("WEBUI_AUTH", "false"),
            ],
            depends_on: Vec::new(),
            startup_failure_threshold: probe::UI_FAILURE_THRESHOLD,
        },
    ];

    if let Some(image) = &stack.agent_image {
        services.push(ServiceConfig {
            name: "agent".to_string(),
            image: image.clone(),
            cpu: default_cpu(),
            memory: defaults::AGENT_MEMORY.to_string(),
            gpu_count: None,
            accelerator: None,
            port: defaults::AGENT_PORT,
            storage_bucket: None,
            mount_path: None,
            env: vec![
                env("GOOGLE_CLOUD_PROJECT", stack.project.clone().unwrap_or_default()),
                env("GOOGLE_CLOUD_LOCATION", stack.region.clone()),
                env("MODEL_NAME", stack.model.name.clone()),
                env("OLLAMA_API_BASE", ollama_ref),
            ],
            depends_on: Vec::new(),
            startup_failure_threshold: probe::DEFAULT_FAILURE_THRESHOLD,
        });
    }

    services
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            server: default_model_server(),
            preload: true,
        }
    }
}

impl Default for StackConfig {
    fn default() -> Self {
        let mut config = Self {
            base_name: default_base_name(),
            platform: default_platform(),
            project: None,
            region: default_region(),
            namespace: None,
            accelerator: default_accelerator(),
            model: ModelConfig::default(),
            agent_image: None,
            services: Vec::new(),
        };
        config.services = llm_services(&config);
        config
    }
}

impl StackConfig {
    /// Load from an explicit path, else the user config dir, else defaults
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("llmstack").join("config.toml");
            if config_path.exists() {
                return Self::from_file(&config_path);
            }
        }
        debug!("No config file found, using defaults");
        Ok(StackConfig::default())
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let mut config: StackConfig = toml::from_str(content)?;
        if config.services.is_empty() {
            config.services = llm_services(&config);
        }
        Ok(config)
    }

    pub fn location(&self) -> Location {
        Location {
            project: self.project.clone(),
            region: self.region.clone(),
            namespace: self
                .namespace
                .clone()
                .unwrap_or_else(|| self.base_name.clone()),
        }
    }

    pub fn service(&self, name: &str) -> Option<&ServiceConfig> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Stack-level checks; per-service invariants are checked when each
    /// deployment spec is constructed
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_name.trim().is_empty() {
            return Err(ValidationError::empty("<stack>", "base_name"));
        }
        if self.region.trim().is_empty() {
            return Err(ValidationError::empty("<stack>", "region"));
        }

        let mut names = HashSet::new();
        for service in &self.services {
            if service.name.trim().is_empty() {
                return Err(ValidationError::empty("<stack>", "service name"));
            }
            if !names.insert(service.name.as_str()) {
                return Err(ValidationError::DuplicateService(service.name.clone()));
            }
        }

        if self.model.preload && self.service(&self.model.server).is_none() {
            return Err(ValidationError::UnknownModelServer(
                self.model.server.clone(),
            ));
        }

        Ok(())
    }
}
