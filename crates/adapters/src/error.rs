// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kinds for the external collaborator adapters.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("sandbox backend failed to create sandbox: {0}")]
    SandboxCreate(String),
    #[error("sandbox backend failed to warm sandbox {0}")]
    SandboxWarm(String),
    #[error("sandbox backend failed to destroy sandbox {0}: {1}")]
    SandboxDestroy(String, String),
    #[error("sandbox health check failed for {0}: {1}")]
    SandboxUnhealthy(String, String),

    #[error("source control request failed: {0}")]
    SourceControl(String),
    #[error("repository url could not be parsed: {0}")]
    #[allow(dead_code)]
    InvalidRepoUrl(#[from] fleetops_core::RepoUrlError),

    #[error("unknown agent engine: {0}")]
    UnknownEngine(String),
    #[error("agent engine failed to start: {0}")]
    EngineStart(String),
    #[error("agent engine prompt execution failed: {0}")]
    EnginePrompt(String),
}
