//! In-memory Key Manager service for testing.

use crate::traits::{
    AclDetails, AclRef, AclSetOpt, KeyManagerService, SecretAcl, ServiceError, ServiceResult,
    ACL_TYPE_READ,
};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Timelike, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

const MOCK_ENDPOINT: &str = "http://barbican.mock:9311/v1";

#[derive(Debug, Default)]
struct MockState {
    /// Secrets by id; `None` means no explicit ACL is set.
    secrets: BTreeMap<String, Option<SecretAcl>>,
    failures: HashMap<String, ServiceError>,
    calls: Vec<String>,
}

impl MockState {
    fn record(&mut self, operation: &str) -> ServiceResult<()> {
        self.calls.push(operation.to_string());
        match self.failures.remove(operation) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn secret_mut(&mut self, secret_id: &str) -> ServiceResult<&mut Option<SecretAcl>> {
        self.secrets
            .get_mut(secret_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Secret not found: {}", secret_id)))
    }
}

fn acl_ref(secret_id: &str) -> AclRef {
    AclRef {
        acl_ref: format!("{}/secrets/{}/acl", MOCK_ENDPOINT, secret_id),
    }
}

fn default_acl() -> SecretAcl {
    let mut acl = SecretAcl::new();
    acl.insert(ACL_TYPE_READ.to_string(), AclDetails::default());
    acl
}

fn now() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Mock Key Manager service.
#[derive(Clone, Default)]
pub struct MockKeyManagerService {
    state: Arc<RwLock<MockState>>,
}

impl MockKeyManagerService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a secret with no explicit ACL.
    pub async fn add_secret(&self, secret_id: &str) {
        self.state
            .write()
            .await
            .secrets
            .insert(secret_id.to_string(), None);
    }

    /// Removes a secret behind the caller's back.
    pub async fn remove_secret(&self, secret_id: &str) {
        self.state.write().await.secrets.remove(secret_id);
    }

    /// Makes the next call of `operation` fail with `error`.
    pub async fn fail_next(&self, operation: &str, error: ServiceError) {
        self.state
            .write()
            .await
            .failures
            .insert(operation.to_string(), error);
    }

    /// Operations called so far, in order.
    pub async fn calls(&self) -> Vec<String> {
        self.state.read().await.calls.clone()
    }
}

#[async_trait]
impl KeyManagerService for MockKeyManagerService {
    async fn get_secret_acl(&self, secret_id: &str) -> ServiceResult<SecretAcl> {
        let mut state = self.state.write().await;
        state.record("get_secret_acl")?;
        let acl = state.secret_mut(secret_id)?;
        Ok(acl.clone().unwrap_or_else(default_acl))
    }

    async fn set_secret_acl(&self, secret_id: &str, opts: &[AclSetOpt]) -> ServiceResult<AclRef> {
        let mut state = self.state.write().await;
        state.record("set_secret_acl")?;
        let acl = state.secret_mut(secret_id)?;

        let stamp = now();
        let replaced: SecretAcl = opts
            .iter()
            .map(|opt| {
                let created = acl
                    .as_ref()
                    .and_then(|a| a.get(&opt.acl_type))
                    .and_then(|d| d.created)
                    .unwrap_or(stamp);
                (
                    opt.acl_type.clone(),
                    AclDetails {
                        project_access: opt.project_access.unwrap_or(true),
                        users: opt.users.clone().unwrap_or_default(),
                        created: Some(created),
                        updated: Some(stamp),
                    },
                )
            })
            .collect();
        *acl = Some(replaced);
        Ok(acl_ref(secret_id))
    }

    async fn update_secret_acl(
        &self,
        secret_id: &str,
        opts: &[AclSetOpt],
    ) -> ServiceResult<AclRef> {
        let mut state = self.state.write().await;
        state.record("update_secret_acl")?;
        let acl = state.secret_mut(secret_id)?;

        let stamp = now();
        let current = acl.get_or_insert_with(SecretAcl::new);
        for opt in opts {
            let entry = current.entry(opt.acl_type.clone()).or_insert_with(|| AclDetails {
                created: Some(stamp),
                ..AclDetails::default()
            });
            if let Some(users) = &opt.users {
                entry.users = users.clone();
            }
            if let Some(project_access) = opt.project_access {
                entry.project_access = project_access;
            }
            entry.updated = Some(stamp);
        }
        Ok(acl_ref(secret_id))
    }

    async fn delete_secret_acl(&self, secret_id: &str) -> ServiceResult<()> {
        let mut state = self.state.write().await;
        state.record("delete_secret_acl")?;
        *state.secret_mut(secret_id)? = None;
        Ok(())
    }
}
