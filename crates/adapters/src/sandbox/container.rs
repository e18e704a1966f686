// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Docker-backed sandbox, built on `bollard`.

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, RemoveContainerOptions, StartContainerOptions,
    StopContainerOptions,
};
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::Docker;
use fleetops_core::{Sandbox, SandboxBackendKind, SandboxId, SandboxState, SystemClock};
use futures::StreamExt;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use super::{ExecOutput, SandboxBackend, SandboxSpec};
use crate::error::AdapterError;

/// Root directory under which per-sandbox secret files are written.
const SECRETS_ROOT: &str = "/tmp/fleetops-secrets";

/// In-container mount point for the secrets directory.
const SECRETS_MOUNT: &str = "/run/fleetops/secrets";

pub struct ContainerBackend {
    docker: Docker,
}

impl ContainerBackend {
    /// Connect to the local Docker daemon using the standard environment
    /// (`DOCKER_HOST`, TLS certs, etc).
    pub fn connect() -> Result<Self, AdapterError> {
        let docker =
            Docker::connect_with_local_defaults().map_err(|e| AdapterError::SandboxCreate(e.to_string()))?;
        Ok(Self { docker })
    }

    fn write_secrets(&self, id: &str, secrets: &std::collections::HashMap<String, String>) -> Result<Option<PathBuf>, AdapterError> {
        if secrets.is_empty() {
            return Ok(None);
        }
        let dir = PathBuf::from(SECRETS_ROOT).join(id);
        std::fs::create_dir_all(&dir).map_err(|e| AdapterError::SandboxCreate(e.to_string()))?;
        std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))
            .map_err(|e| AdapterError::SandboxCreate(e.to_string()))?;
        for (key, value) in secrets {
            let path = dir.join(key);
            let mut file = std::fs::File::create(&path).map_err(|e| AdapterError::SandboxCreate(e.to_string()))?;
            file.write_all(value.as_bytes())
                .map_err(|e| AdapterError::SandboxCreate(e.to_string()))?;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o400))
                .map_err(|e| AdapterError::SandboxCreate(e.to_string()))?;
        }
        Ok(Some(dir))
    }
}

#[async_trait]
impl SandboxBackend for ContainerBackend {
    fn kind(&self) -> SandboxBackendKind {
        SandboxBackendKind::Container
    }

    async fn create(&self, spec: &SandboxSpec) -> Result<Sandbox, AdapterError> {
        let id = format!("fleetops-{}", Uuid::new_v4());
        let secrets_dir = self.write_secrets(&id, &spec.secrets)?;

        let env: Vec<String> = spec
            .env
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();

        let host_config = bollard::models::HostConfig {
            memory: Some((spec.memory_mb as i64) * 1024 * 1024),
            nano_cpus: Some((spec.vcpus as i64) * 1_000_000_000),
            security_opt: Some(vec!["no-new-privileges".to_string()]),
            cap_drop: Some(vec!["ALL".to_string()]),
            binds: secrets_dir.as_ref().map(|dir| {
                vec![format!("{}:{}:ro", dir.display(), SECRETS_MOUNT)]
            }),
            ..Default::default()
        };

        let config = Config {
            image: Some(spec.image.clone()),
            env: Some(env),
            host_config: Some(host_config),
            tty: Some(true),
            ..Default::default()
        };

        self.docker
            .create_container(Some(CreateContainerOptions { name: id.clone(), platform: None }), config)
            .await
            .map_err(|e| AdapterError::SandboxCreate(e.to_string()))?;

        self.docker
            .start_container(&id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| AdapterError::SandboxCreate(e.to_string()))?;

        let clock = SystemClock;
        let mut sandbox = Sandbox::new(SandboxId::new(id.clone()), SandboxBackendKind::Container, spec.memory_mb, spec.vcpus, &clock);
        sandbox.handle = Some(id);
        sandbox.secrets_dir = secrets_dir;
        Ok(sandbox)
    }

    async fn warm(&self, sandbox: &mut Sandbox) -> Result<(), AdapterError> {
        sandbox.state = SandboxState::Warming;
        self.health_check(sandbox).await?;
        sandbox.state = SandboxState::Ready;
        Ok(())
    }

    async fn destroy(&self, sandbox: &Sandbox) -> Result<(), AdapterError> {
        let Some(handle) = &sandbox.handle else {
            return Ok(());
        };
        let stop_result = self
            .docker
            .stop_container(handle, Some(StopContainerOptions { t: 5 }))
            .await;
        if let Err(e) = stop_result {
            tracing::warn!(sandbox = %handle, error = %e, "stop_container failed, forcing removal");
        }
        self.docker
            .remove_container(
                handle,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| AdapterError::SandboxDestroy(handle.clone(), e.to_string()))?;

        if let Some(dir) = &sandbox.secrets_dir {
            if let Err(e) = std::fs::remove_dir_all(dir) {
                tracing::warn!(path = %dir.display(), error = %e, "failed to remove secrets dir");
            }
        }
        Ok(())
    }

    async fn exec(&self, sandbox: &Sandbox, command: &str, timeout: Duration) -> ExecOutput {
        let Some(handle) = &sandbox.handle else {
            return ExecOutput {
                exit_code: 127,
                stdout: String::new(),
                stderr: "sandbox has no backend handle".to_string(),
            };
        };

        let run = async {
            let exec = self
                .docker
                .create_exec(
                    handle,
                    CreateExecOptions {
                        cmd: Some(vec!["/bin/sh", "-lc", command]),
                        attach_stdout: Some(true),
                        attach_stderr: Some(true),
                        ..Default::default()
                    },
                )
                .await
                .map_err(|e| e.to_string())?;

            let mut stdout = String::new();
            let mut stderr = String::new();
            if let StartExecResults::Attached { mut output, .. } =
                self.docker.start_exec(&exec.id, None).await.map_err(|e| e.to_string())?
            {
                while let Some(Ok(msg)) = output.next().await {
                    match msg {
                        bollard::container::LogOutput::StdOut { message } => {
                            stdout.push_str(&String::from_utf8_lossy(&message));
                        }
                        bollard::container::LogOutput::StdErr { message } => {
                            stderr.push_str(&String::from_utf8_lossy(&message));
                        }
                        _ => {}
                    }
                }
            }

            let inspect = self
                .docker
                .inspect_exec(&exec.id)
                .await
                .map_err(|e| e.to_string())?;
            let exit_code = inspect.exit_code.unwrap_or(-1) as i32;
            Ok::<ExecOutput, String>(ExecOutput {
                exit_code,
                stdout,
                stderr,
            })
        };

        match tokio::time::timeout(timeout, run).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => ExecOutput {
                exit_code: -1,
                stdout: String::new(),
                stderr: e,
            },
            Err(_elapsed) => ExecOutput {
                exit_code: 124,
                stdout: String::new(),
                stderr: "timeout".to_string(),
            },
        }
    }

    async fn health_check(&self, sandbox: &Sandbox) -> Result<(), AdapterError> {
        let Some(handle) = &sandbox.handle else {
            return Err(AdapterError::SandboxUnhealthy(
                sandbox.id.to_string(),
                "no backend handle".to_string(),
            ));
        };
        self.docker
            .inspect_container(handle, None)
            .await
            .map(|_| ())
            .map_err(|e| AdapterError::SandboxUnhealthy(handle.clone(), e.to_string()))
    }
}
