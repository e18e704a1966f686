// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory source-control provider for tests: no network.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{PrResult, SourceProvider};
use crate::error::AdapterError;

#[derive(Debug, Clone)]
pub struct BranchCall {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub from: String,
}

#[derive(Default)]
pub struct FakeSourceProvider {
    next_pr_number: AtomicU64,
    branches: Mutex<Vec<BranchCall>>,
    fail_create_branch: std::sync::atomic::AtomicBool,
}

impl FakeSourceProvider {
    pub fn new() -> Self {
        Self {
            next_pr_number: AtomicU64::new(1),
            ..Default::default()
        }
    }

    pub fn set_fail_create_branch(&self, fail: bool) {
        self.fail_create_branch.store(fail, Ordering::SeqCst);
    }

    pub fn branch_calls(&self) -> Vec<BranchCall> {
        self.branches.lock().clone()
    }
}

#[async_trait]
impl SourceProvider for FakeSourceProvider {
    fn get_clone_url(&self, owner: &str, repo: &str) -> String {
        format!("https://github.com/{owner}/{repo}.git")
    }

    async fn get_credentials(&self) -> HashMap<String, String> {
        let mut creds = HashMap::new();
        creds.insert("username".to_string(), "fake".to_string());
        creds.insert("password".to_string(), "fake-token".to_string());
        creds
    }

    async fn create_branch(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        from: &str,
    ) -> Result<(), AdapterError> {
        if self.fail_create_branch.load(Ordering::SeqCst) {
            return Err(AdapterError::SourceControl("injected failure".to_string()));
        }
        self.branches.lock().push(BranchCall {
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch: branch.to_string(),
            from: from.to_string(),
        });
        Ok(())
    }

    async fn create_pull_request(
        &self,
        owner: &str,
        repo: &str,
        head: &str,
        _base: &str,
        _title: &str,
        _body: &str,
        _labels: &[String],
    ) -> Result<PrResult, AdapterError> {
        let number = self.next_pr_number.fetch_add(1, Ordering::SeqCst);
        Ok(PrResult {
            url: format!("https://github.com/{owner}/{repo}/pull/{number}?head={head}"),
            number,
        })
    }
}
