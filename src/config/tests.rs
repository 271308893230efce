#[cfg(test)]
mod tests {
    use super::super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = StackConfig::default();
        assert_eq!(config.base_name, "llm-stack");
        assert_eq!(config.platform, PlatformKind::CloudRun);
        assert_eq!(config.region, "us-central1");
        assert_eq!(config.accelerator, "nvidia-l4");
        assert_eq!(config.model.name, "gemma3:latest");
        assert!(config.model.preload);
        assert_eq!(config.services.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_services() {
        let config = StackConfig::default();
        let ollama = config.service("ollama").unwrap();
        assert_eq!(ollama.port, 11434);
        assert_eq!(ollama.gpu_count, Some(1));
        assert_eq!(ollama.storage_bucket.as_deref(), Some("llm-stack-llm-bucket"));

        let ui = config.service("openwebui").unwrap();
        assert_eq!(ui.startup_failure_threshold, 1800);
        assert_eq!(ui.env[0].value, "service://ollama");

        assert!(config.service("agent").is_none());
    }

    #[test]
    fn test_agent_joins_default_stack_when_image_set() {
        let config = StackConfig::from_toml(
            r#"
project = "demo-project"
region = "europe-west4"
agent_image = "repo/agent:1"

[model]
name = "llama3:8b"
"#,
        )
        .unwrap();

        assert_eq!(config.services.len(), 3);
        let agent = config.service("agent").unwrap();
        assert_eq!(agent.image, "repo/agent:1");
        assert_eq!(agent.port, 8080);
        assert_eq!(agent.memory, "5Gi");

        let env: Vec<(&str, &str)> = agent
            .env
            .iter()
            .map(|e| (e.name.as_str(), e.value.as_str()))
            .collect();
        assert_eq!(
            env,
            vec![
                ("GOOGLE_CLOUD_PROJECT", "demo-project"),
                ("GOOGLE_CLOUD_LOCATION", "europe-west4"),
                ("MODEL_NAME", "llama3:8b"),
                ("OLLAMA_API_BASE", "service://ollama"),
            ]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let config = StackConfig::from_toml(
            r#"
base_name = "demo"
platform = "gke"
project = "my-project"
region = "europe-west4"

[model]
name = "llama3:8b"
server = "engine"

[[services]]
name = "engine"
image = "repo/ollama:1"
cpu = 4
memory = "16Gi"
gpu_count = 1
port = 11434

[[services]]
name = "agent"
image = "repo/agent:1"
cpu = "2"
port = 8080
env = [{ name = "OLLAMA_API_BASE", value = "service://engine" }]
depends_on = ["engine"]
"#,
        )
        .unwrap();

        assert_eq!(config.platform, PlatformKind::Gke);
        assert_eq!(config.model.name, "llama3:8b");
        assert!(config.model.preload);
        assert_eq!(config.services.len(), 2);
        assert_eq!(config.services[0].cpu.to_string(), "4");
        assert_eq!(config.services[1].cpu.to_string(), "2");
        assert_eq!(config.services[1].memory, "16Gi");
        assert_eq!(config.services[1].startup_failure_threshold, 360);
        assert_eq!(config.services[1].depends_on, vec!["engine"]);
        assert_eq!(config.location().namespace, "demo");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_invalid_platform() {
        assert!(StackConfig::from_toml(r#"platform = "lambda""#).is_err());
    }

    #[test]
    fn test_duplicate_service_rejected() {
        let mut config = StackConfig::default();
        let dup = config.services[0].clone();
        config.services.push(dup);
        assert_eq!(
            config.validate(),
            Err(ValidationError::DuplicateService("ollama".to_string()))
        );
    }

    #[test]
    fn test_unknown_model_server_rejected() {
        let mut config = StackConfig::default();
        config.model.server = "vllm".to_string();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::UnknownModelServer(_))
        ));

        config.model.preload = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stack.toml");
        fs::write(&path, "base_name = \"filetest\"\n").unwrap();

        let config = StackConfig::load(Some(&path)).unwrap();
        assert_eq!(config.base_name, "filetest");
        // services fall back to the default stack
        assert_eq!(config.services.len(), 2);
        assert_eq!(
            config.services[0].storage_bucket.as_deref(),
            Some("filetest-llm-bucket")
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let result = StackConfig::load(Some(&dir.path().join("missing.toml")));
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to read config"));
    }
}
