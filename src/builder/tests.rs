#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::platform::{CloudRun, Gke, PlatformKind};
    use crate::resource::EnvVar;

    fn ollama() -> DeploymentSpec {
        DeploymentSpec::new("ollama", "repo/ollama:latest", "8", "16Gi", 11434)
            .with_gpus(1, "nvidia-l4")
            .with_storage("llm-bucket", "/root/.ollama/")
    }

    fn webui() -> DeploymentSpec {
        DeploymentSpec::new("openwebui", "repo/openwebui:latest", "8", "16Gi", 8080)
            .with_failure_threshold(1800)
            .with_env(vec![
                EnvVar::new("OLLAMA_BASE_URL", "https://ollama.example"),
                EnvVar::new("WEBUI_AUTH", "false"),
            ])
    }

    #[test]
    fn test_ollama_scenario() {
        let spec = ServiceSpecBuilder::new(&CloudRun).build(&ollama()).unwrap();

        assert_eq!(spec.kind, PlatformKind::CloudRun);
        assert_eq!(spec.name, "ollama-cr-service");
        assert_eq!(spec.ingress, "INGRESS_TRAFFIC_ALL");
        assert!(!spec.deletion_protection);

        let container = spec.container().unwrap();
        assert_eq!(container.image, "repo/ollama:latest");
        assert_eq!(container.resources.limits.cpu, "8");
        assert_eq!(container.resources.limits.memory, "16Gi");
        assert_eq!(container.resources.limits.gpu, Some(1));
        assert_eq!(container.resources.cpu_idle, Some(false));
        assert_eq!(container.resources.startup_cpu_boost, Some(true));
        assert!(container.resources.requests.is_none());

        assert_eq!(container.ports.container_port, 11434);
        assert_eq!(container.startup_probe.tcp_socket.port, 11434);
        assert!(container.startup_probe.failure_threshold >= 360);
        assert_eq!(container.startup_probe.initial_delay_seconds, 0);
        assert_eq!(container.startup_probe.period_seconds, 1);
        assert_eq!(container.startup_probe.timeout_seconds, 1);

        assert_eq!(spec.template.volumes.len(), 1);
        assert_eq!(spec.template.volumes[0].name, "llm-bucket");
        assert_eq!(spec.template.volumes[0].gcs.bucket, "llm-bucket");
        assert!(!spec.template.volumes[0].gcs.read_only);
        assert_eq!(container.volume_mounts.len(), 1);
        assert_eq!(container.volume_mounts[0].name, "llm-bucket");
        assert_eq!(container.volume_mounts[0].mount_path, "/root/.ollama/");

        assert_eq!(spec.template.scaling.min_instance_count, 1);
        assert_eq!(spec.template.scaling.max_instance_count, 3);

        assert_eq!(
            spec.template.node_selector.get("accelerator").map(String::as_str),
            Some("nvidia-l4")
        );
        assert_eq!(spec.template.gpu_zonal_redundancy_disabled, Some(true));
    }

    #[test]
    fn test_no_gpu_means_no_placement() {
        for gpu_count in [None, Some(0)] {
            let mut spec = webui();
            spec.gpu_count = gpu_count;
            let built = ServiceSpecBuilder::new(&CloudRun).build(&spec).unwrap();

            assert!(built.container().unwrap().resources.limits.gpu.is_none());
            assert!(built.template.node_selector.is_empty());
            assert!(built.template.gpu_zonal_redundancy_disabled.is_none());
        }
    }

    #[test]
    fn test_gpu_count_carried_through() {
        let spec = ollama().with_gpus(4, "nvidia-l4");
        let built = ServiceSpecBuilder::new(&CloudRun).build(&spec).unwrap();
        assert_eq!(built.container().unwrap().resources.limits.gpu, Some(4));
    }

    #[test]
    fn test_no_storage_means_no_volumes() {
        let built = ServiceSpecBuilder::new(&CloudRun).build(&webui()).unwrap();
        assert!(built.template.volumes.is_empty());
        assert!(built.container().unwrap().volume_mounts.is_empty());
    }

    #[test]
    fn test_env_attached_in_order() {
        let built = ServiceSpecBuilder::new(&CloudRun).build(&webui()).unwrap();
        let envs = &built.container().unwrap().envs;
        assert_eq!(envs.len(), 2);
        assert_eq!(envs[0].name, "OLLAMA_BASE_URL");
        assert_eq!(envs[1], EnvVar::new("WEBUI_AUTH", "false"));
        assert_eq!(
            built.container().unwrap().startup_probe.failure_threshold,
            1800
        );
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = ServiceSpecBuilder::new(&CloudRun);
        let first = builder.build(&ollama()).unwrap();
        let second = builder.build(&ollama()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.fingerprint().unwrap(), second.fingerprint().unwrap());
    }

    #[test]
    fn test_invalid_spec_rejected() {
        let mut spec = ollama();
        spec.mount_path = None;
        let err = ServiceSpecBuilder::new(&CloudRun).build(&spec).unwrap_err();
        assert!(matches!(err, ValidationError::MissingMountPath { .. }));
    }

    #[test]
    fn test_long_name_normalized() {
        let mut spec = webui();
        spec.name = format!("{}-openwebui", "x".repeat(45));
        let built = ServiceSpecBuilder::new(&CloudRun).build(&spec).unwrap();
        assert!(built.name.chars().count() <= 50);
        assert!(built.name.chars().last().unwrap().is_alphanumeric());
    }

    #[test]
    fn test_gke_variant() {
        let built = ServiceSpecBuilder::new(&Gke).build(&ollama()).unwrap();

        assert_eq!(built.kind, PlatformKind::Gke);
        assert_eq!(built.name, "ollama-svc");
        assert_eq!(built.ingress, "LoadBalancer");
        assert!(built.traffic.is_empty());

        let resources = &built.container().unwrap().resources;
        assert_eq!(resources.requests.as_ref(), Some(&resources.limits));
        assert!(resources.cpu_idle.is_none());
        assert_eq!(
            built
                .template
                .node_selector
                .get("cloud.google.com/gke-accelerator")
                .map(String::as_str),
            Some("nvidia-l4")
        );
    }

    #[test]
    fn test_serialized_shape() {
        let built = ServiceSpecBuilder::new(&CloudRun).build(&ollama()).unwrap();
        let json = serde_json::to_value(&built).unwrap();

        assert_eq!(json["kind"], "cloud-run");
        assert_eq!(json["deletionProtection"], false);
        let container = &json["template"]["containers"][0];
        assert_eq!(container["resources"]["limits"]["nvidia.com/gpu"], 1);
        assert_eq!(container["resources"]["cpuIdle"], false);
        assert_eq!(container["startupProbe"]["tcpSocket"]["port"], 11434);
        assert_eq!(json["template"]["gpuZonalRedundancyDisabled"], true);
        assert_eq!(json["traffic"][0]["percent"], 100);
    }
}
