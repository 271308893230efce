/// Service naming constants
pub mod naming {
    /// Cloud Run rejects service names longer than this
    pub const MAX_SERVICE_NAME_LENGTH: usize = 50;

    /// Suffix appended to logical names for Cloud Run services
    pub const CLOUD_RUN_SUFFIX: &str = "-cr-service";

    /// Suffix appended to logical names for GKE workloads
    pub const GKE_SUFFIX: &str = "-svc";
}

/// Startup probe constants
pub mod probe {
    /// Seconds before the first probe
    pub const INITIAL_DELAY_SECONDS: u32 = 0;

    /// Seconds between probes
    pub const PERIOD_SECONDS: u32 = 1;

    /// Seconds before a single probe times out
    pub const TIMEOUT_SECONDS: u32 = 1;

    /// Default failure threshold, enough for a model download on cold start
    pub const DEFAULT_FAILURE_THRESHOLD: u32 = 360;

    /// Failure threshold used by the chat UI, which migrates its database on boot
    pub const UI_FAILURE_THRESHOLD: u32 = 1800;
}

/// Scaling policy constants
pub mod scaling {
    /// Always keep one warm instance
    pub const MIN_INSTANCES: u32 = 1;

    /// Burst ceiling
    pub const MAX_INSTANCES: u32 = 3;
}

/// Accelerator constants
pub mod gpu {
    /// Resource name used for GPU limits
    pub const RESOURCE_NAME: &str = "nvidia.com/gpu";

    /// Default accelerator class
    pub const DEFAULT_ACCELERATOR: &str = "nvidia-l4";

    /// Cloud Run node selector key
    pub const CLOUD_RUN_SELECTOR_KEY: &str = "accelerator";

    /// GKE Autopilot node selector key
    pub const GKE_SELECTOR_KEY: &str = "cloud.google.com/gke-accelerator";
}

/// Ingress and access constants
pub mod access {
    /// Cloud Run ingress allowing all traffic
    pub const CLOUD_RUN_INGRESS: &str = "INGRESS_TRAFFIC_ALL";

    /// GKE service type that allocates an external address
    pub const GKE_INGRESS: &str = "LoadBalancer";

    /// Role granting permission to invoke a Cloud Run service
    pub const INVOKER_ROLE: &str = "roles/run.invoker";

    /// Member string for unauthenticated access
    pub const ALL_USERS: &str = "allUsers";

    /// Traffic allocation type pinning all traffic to the newest revision
    pub const LATEST_REVISION: &str = "TRAFFIC_TARGET_ALLOCATION_TYPE_LATEST";
}

/// Defaults for the LLM stack
pub mod defaults {
    pub const BASE_NAME: &str = "llm-stack";
    pub const REGION: &str = "us-central1";
    pub const MODEL: &str = "gemma3:latest";
    pub const MODEL_SERVER: &str = "ollama";

    pub const OLLAMA_IMAGE: &str = "docker.io/ollama/ollama:latest";
    pub const OLLAMA_PORT: u16 = 11434;
    pub const OLLAMA_MOUNT_PATH: &str = "/root/.ollama/";

    pub const OPENWEBUI_IMAGE: &str = "ghcr.io/open-webui/open-webui:main";
    pub const OPENWEBUI_PORT: u16 = 8080;

    pub const AGENT_PORT: u16 = 8080;
    pub const AGENT_MEMORY: &str = "5Gi";

    pub const CPU: &str = "8";
    pub const MEMORY: &str = "16Gi";
}

/// Prefix marking an environment value as another service's address
pub const SERVICE_REF_PREFIX: &str = "service://";
