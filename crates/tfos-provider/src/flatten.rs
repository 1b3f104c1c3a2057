//! Conversions between service objects and attribute values.

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tfos_client::{acl_timestamp, AclDetails, AclSetOpt, AclSetOpts, Inventory, Link, ACL_TYPE_READ};

pub fn flatten_links(links: &[Link]) -> Value {
    links
        .iter()
        .map(|link| json!({"href": link.href, "rel": link.rel}))
        .collect()
}

pub fn flatten_inventories(inventories: &BTreeMap<String, Inventory>) -> Value {
    let map: Map<String, Value> = inventories
        .iter()
        .map(|(class, inv)| {
            (
                class.clone(),
                json!({
                    "allocation_ratio": inv.allocation_ratio,
                    "max_unit": inv.max_unit,
                    "min_unit": inv.min_unit,
                    "reserved": inv.reserved,
                    "step_size": inv.step_size,
                    "total": inv.total,
                }),
            )
        })
        .collect();
    Value::Object(map)
}

/// Reads the `inventories` map of blocks.
pub fn expand_inventories(value: Option<&Value>) -> BTreeMap<String, Inventory> {
    let Some(Value::Object(map)) = value else {
        return BTreeMap::new();
    };
    map.iter()
        .map(|(class, raw)| {
            let int = |key: &str, default: i64| raw.get(key).and_then(Value::as_i64).unwrap_or(default);
            (
                class.clone(),
                Inventory {
                    allocation_ratio: raw
                        .get("allocation_ratio")
                        .and_then(Value::as_f64)
                        .unwrap_or(1.0),
                    max_unit: int("max_unit", 0),
                    min_unit: int("min_unit", 1),
                    reserved: int("reserved", 0),
                    step_size: int("step_size", 1),
                    total: int("total", 0),
                },
            )
        })
        .collect()
}

pub fn flatten_usages(usages: &BTreeMap<String, i64>) -> Value {
    json!(usages)
}

/// Renders the `read` ACL as a one-element block list.
///
/// Missing timestamps render as empty strings.
pub fn flatten_acl_read(details: &AclDetails) -> Value {
    let stamp = |t: &Option<chrono::NaiveDateTime>| {
        t.as_ref().map(acl_timestamp::format).unwrap_or_default()
    };
    let mut users = details.users.clone();
    users.sort();
    json!([{
        "project_access": details.project_access,
        "users": users,
        "created": stamp(&details.created),
        "updated": stamp(&details.updated),
    }])
}

/// Builds ACL set options from the `read` block list.
///
/// Both fields are always sent so the request fully describes the ACL.
pub fn expand_acl_read(value: Option<&Value>) -> AclSetOpts {
    let Some(block) = value
        .and_then(Value::as_array)
        .and_then(|items| items.first())
    else {
        return Vec::new();
    };

    let project_access = block
        .get("project_access")
        .and_then(Value::as_bool)
        .unwrap_or(true);
    let mut users: Vec<String> = block
        .get("users")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    users.sort();
    users.dedup();

    vec![AclSetOpt {
        acl_type: ACL_TYPE_READ.to_string(),
        users: Some(users),
        project_access: Some(project_access),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfos_client::testing::{sample_acl_details, sample_inventory};

    #[test]
    fn test_inventories_round_trip_through_attributes() {
        let mut inventories = BTreeMap::new();
        inventories.insert("VCPU".to_string(), sample_inventory(8));
        let value = flatten_inventories(&inventories);
        assert_eq!(value["VCPU"]["step_size"], json!(1));
        assert_eq!(expand_inventories(Some(&value)), inventories);
    }

    #[test]
    fn test_expand_inventories_applies_missing_defaults() {
        let value = json!({"DISK_GB": {"allocation_ratio": 1.5, "max_unit": 100, "total": 500}});
        let inventories = expand_inventories(Some(&value));
        let disk = &inventories["DISK_GB"];
        assert_eq!(disk.min_unit, 1);
        assert_eq!(disk.reserved, 0);
        assert_eq!(disk.step_size, 1);
        assert_eq!(disk.allocation_ratio, 1.5);
        assert!(expand_inventories(None).is_empty());
    }

    #[test]
    fn test_flatten_acl_read_formats_timestamps() {
        let value = flatten_acl_read(&sample_acl_details(&["u2", "u1"]));
        assert_eq!(value[0]["created"], json!("2024-03-01T12:30:00"));
        assert_eq!(value[0]["users"], json!(["u1", "u2"]));
        assert_eq!(value[0]["project_access"], json!(false));

        let value = flatten_acl_read(&AclDetails::default());
        assert_eq!(value[0]["created"], json!(""));
    }

    #[test]
    fn test_expand_acl_read() {
        let opts = expand_acl_read(Some(&json!([{"project_access": false, "users": ["b", "a"]}])));
        assert_eq!(opts.len(), 1);
        assert_eq!(opts[0].acl_type, "read");
        assert_eq!(opts[0].users, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(opts[0].project_access, Some(false));

        let opts = expand_acl_read(Some(&json!([{}])));
        assert_eq!(opts[0].users, Some(vec![]));
        assert_eq!(opts[0].project_access, Some(true));

        assert!(expand_acl_read(Some(&json!([]))).is_empty());
    }

    #[test]
    fn test_flatten_links() {
        let links = vec![Link {
            href: "/resource_providers/x".into(),
            rel: "self".into(),
        }];
        assert_eq!(
            flatten_links(&links),
            json!([{"href": "/resource_providers/x", "rel": "self"}])
        );
    }
}
