// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository URL parsing and construction.
//!
//! Supports the two forms seen from source-control providers:
//! `https://host/owner/repo[.git]` and `git@host:owner/repo[.git]`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GitProvider {
    GitHub,
    Bitbucket,
}

impl GitProvider {
    pub fn default_host(&self) -> &'static str {
        match self {
            Self::GitHub => "github.com",
            Self::Bitbucket => "bitbucket.org",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepoUrlError {
    #[error("url is not a recognized https or ssh git remote: {0}")]
    UnrecognizedForm(String),
}

/// The `(owner, repo)` pair extracted from a repository URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub host: String,
    pub owner: String,
    pub repo: String,
}

/// Parse `https://host/owner/repo[.git]` or `git@host:owner/repo[.git]`.
pub fn parse_repo_url(url: &str) -> Result<RepoRef, RepoUrlError> {
    let trimmed = url.trim();

    if let Some(rest) = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
    {
        let mut parts = rest.splitn(2, '/');
        let host = parts.next().unwrap_or_default();
        let path = parts.next().unwrap_or_default();
        return parse_owner_repo(host, path, trimmed);
    }

    if let Some(rest) = trimmed.strip_prefix("git@") {
        if let Some((host, path)) = rest.split_once(':') {
            return parse_owner_repo(host, path, trimmed);
        }
    }

    Err(RepoUrlError::UnrecognizedForm(trimmed.to_string()))
}

fn parse_owner_repo(host: &str, path: &str, original: &str) -> Result<RepoRef, RepoUrlError> {
    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let mut segments = path.splitn(2, '/');
    let owner = segments.next().unwrap_or_default();
    let repo = segments.next().unwrap_or_default();
    if host.is_empty() || owner.is_empty() || repo.is_empty() {
        return Err(RepoUrlError::UnrecognizedForm(original.to_string()));
    }
    Ok(RepoRef {
        host: host.to_string(),
        owner: owner.to_string(),
        repo: repo.to_string(),
    })
}

/// Build the canonical HTTPS clone URL for a provider/owner/repo triple.
pub fn build_repo_url(provider: GitProvider, owner: &str, repo: &str) -> String {
    format!("https://{}/{owner}/{repo}.git", provider.default_host())
}

#[cfg(test)]
#[path = "repo_url_tests.rs"]
mod tests;
