// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Source-control provider contract: the boundary between the pipeline
//! driver and a concrete forge (GitHub, Bitbucket, ...).

pub mod github;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::AdapterError;

pub use github::GitHubProvider;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeSourceProvider;

/// Result of opening a pull request.
#[derive(Debug, Clone)]
pub struct PrResult {
    pub url: String,
    pub number: u64,
}

/// Source-control provider contract. Credentials never appear embedded in
/// a clone URL; `get_credentials` returns them out of band.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// The HTTPS clone URL for `owner/repo`, free of embedded credentials.
    fn get_clone_url(&self, owner: &str, repo: &str) -> String;

    /// Out-of-band credentials (e.g. `{"username": ..., "token": ...}`)
    /// for cloning/pushing. Never logged or stored on a `Task`.
    async fn get_credentials(&self) -> HashMap<String, String>;

    async fn create_branch(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        from: &str,
    ) -> Result<(), AdapterError>;

    async fn create_pull_request(
        &self,
        owner: &str,
        repo: &str,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> Result<PrResult, AdapterError>;
}
