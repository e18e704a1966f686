// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! GitHub source-control provider, built on the REST API via `reqwest`.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

use super::{PrResult, SourceProvider};
use crate::error::AdapterError;

const API_BASE: &str = "https://api.github.com";

/// Label injected onto every pull request this system opens, so humans can
/// spot agent-authored PRs at a glance.
const GENERATED_LABEL: &str = "fleetops-generated";

pub struct GitHubProvider {
    client: reqwest::Client,
    token: String,
}

#[derive(Deserialize)]
struct CreatePrResponse {
    html_url: String,
    number: u64,
}

#[derive(Deserialize)]
struct RefResponse {
    object: RefObject,
}

#[derive(Deserialize)]
struct RefObject {
    sha: String,
}

impl GitHubProvider {
    pub fn new(token: impl Into<String>) -> Result<Self, AdapterError> {
        let client = reqwest::Client::builder()
            .user_agent("fleetops")
            .build()
            .map_err(|e| AdapterError::SourceControl(e.to_string()))?;
        Ok(Self {
            client,
            token: token.into(),
        })
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

#[async_trait]
impl SourceProvider for GitHubProvider {
    fn get_clone_url(&self, owner: &str, repo: &str) -> String {
        fleetops_core::build_repo_url(fleetops_core::GitProvider::GitHub, owner, repo)
    }

    async fn get_credentials(&self) -> HashMap<String, String> {
        let mut creds = HashMap::new();
        creds.insert("username".to_string(), "x-access-token".to_string());
        creds.insert("password".to_string(), self.token.clone());
        creds
    }

    async fn create_branch(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        from: &str,
    ) -> Result<(), AdapterError> {
        let base_ref: RefResponse = self
            .client
            .get(format!("{API_BASE}/repos/{owner}/{repo}/git/ref/heads/{from}"))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| AdapterError::SourceControl(e.to_string()))?
            .error_for_status()
            .map_err(|e| AdapterError::SourceControl(e.to_string()))?
            .json()
            .await
            .map_err(|e| AdapterError::SourceControl(e.to_string()))?;

        self.client
            .post(format!("{API_BASE}/repos/{owner}/{repo}/git/refs"))
            .header("Authorization", self.auth_header())
            .json(&serde_json::json!({
                "ref": format!("refs/heads/{branch}"),
                "sha": base_ref.object.sha,
            }))
            .send()
            .await
            .map_err(|e| AdapterError::SourceControl(e.to_string()))?
            .error_for_status()
            .map_err(|e| AdapterError::SourceControl(e.to_string()))?;

        Ok(())
    }

    async fn create_pull_request(
        &self,
        owner: &str,
        repo: &str,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> Result<PrResult, AdapterError> {
        let response: CreatePrResponse = self
            .client
            .post(format!("{API_BASE}/repos/{owner}/{repo}/pulls"))
            .header("Authorization", self.auth_header())
            .json(&serde_json::json!({
                "title": title,
                "head": head,
                "base": base,
                "body": body,
            }))
            .send()
            .await
            .map_err(|e| AdapterError::SourceControl(e.to_string()))?
            .error_for_status()
            .map_err(|e| AdapterError::SourceControl(e.to_string()))?
            .json()
            .await
            .map_err(|e| AdapterError::SourceControl(e.to_string()))?;

        let mut pr_labels: Vec<&str> = vec![GENERATED_LABEL];
        pr_labels.extend(labels.iter().map(String::as_str));

        if let Err(e) = self
            .client
            .post(format!(
                "{API_BASE}/repos/{owner}/{repo}/issues/{}/labels",
                response.number
            ))
            .header("Authorization", self.auth_header())
            .json(&serde_json::json!({ "labels": pr_labels }))
            .send()
            .await
        {
            tracing::warn!(pr = response.number, error = %e, "failed to label generated PR");
        }

        Ok(PrResult {
            url: response.html_url,
            number: response.number,
        })
    }
}
