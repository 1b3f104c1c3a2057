//! Test helpers shared by the client and provider crates.

use crate::traits::{AclDetails, Inventory, ResourceProvider, ServiceConfig};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Creates a service config with test defaults.
pub fn test_service_config(service_type: &str, base_url: &str) -> ServiceConfig {
    ServiceConfig {
        service_type: service_type.to_string(),
        base_url: base_url.to_string(),
        timeout_secs: 30,
        verify_tls: true,
        microversion: None,
        headers: HashMap::new(),
    }
}

/// An inventory of `total` units with the usual defaults.
pub fn sample_inventory(total: i64) -> Inventory {
    Inventory {
        allocation_ratio: 1.0,
        max_unit: total,
        min_unit: 1,
        reserved: 0,
        step_size: 1,
        total,
    }
}

/// A root resource provider.
pub fn sample_resource_provider(uuid: &str, name: &str) -> ResourceProvider {
    ResourceProvider {
        uuid: uuid.to_string(),
        name: name.to_string(),
        generation: 0,
        parent_provider_uuid: None,
        root_provider_uuid: Some(uuid.to_string()),
        links: Vec::new(),
    }
}

/// A read ACL restricted to `users`, with fixed timestamps.
pub fn sample_acl_details(users: &[&str]) -> AclDetails {
    let stamp = NaiveDate::from_ymd_opt(2024, 3, 1).and_then(|d| d.and_hms_opt(12, 30, 0));
    AclDetails {
        project_access: false,
        users: users.iter().map(|u| u.to_string()).collect(),
        created: stamp,
        updated: stamp,
    }
}
