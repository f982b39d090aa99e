use aws_sdk_ec2 as ec2;
use aws_sdk_ec2::operation::describe_instances::DescribeInstancesOutput;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::filters::{InstanceFilter, WireQuery};
use super::records::{InstanceRecord, InstanceState, InstanceTag, VALUE_PLACEHOLDER};
use super::sdk_errors::{call_timeout, categorize_remote_failure, ConsoleError};

/// Safety cap on accumulated records, bounding the pagination loop against a
/// misbehaving endpoint that keeps returning continuation tokens.
pub const MAX_RECORDS: usize = 200;

/// Bound on any single remote call; expiry surfaces as `RemoteUnavailable`.
pub const REMOTE_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetch all instances matching `filter`, flattening reservation groups
/// across pages in page order. Read-only; never retries.
pub async fn fetch_instances(
    client: &ec2::Client,
    filter: &InstanceFilter,
) -> Result<Vec<InstanceRecord>, ConsoleError> {
    let query = filter.wire_query();
    let mut records = Vec::new();
    let mut next_token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let mut request = client.describe_instances();
        if !query.instance_ids.is_empty() {
            request = request.set_instance_ids(Some(query.instance_ids.clone()));
        }
        let filters = sdk_filters(&query);
        if !filters.is_empty() {
            request = request.set_filters(Some(filters));
        }
        request = request.set_next_token(next_token.take());

        let response = tokio::time::timeout(REMOTE_CALL_TIMEOUT, request.send())
            .await
            .map_err(|_| call_timeout("DescribeInstances", REMOTE_CALL_TIMEOUT))?
            .map_err(|e| categorize_remote_failure(&format!("{:?}", e), "DescribeInstances"))?;

        pages += 1;
        next_token = collect_page(response, &mut records, MAX_RECORDS);
        if next_token.is_none() {
            break;
        }
    }

    debug!(pages, records = records.len(), "inventory fetch complete");
    Ok(records)
}

/// Flatten one response page into `records` and return the continuation
/// token when another page should be fetched. Stops at `cap` accumulated
/// records regardless of remaining tokens.
pub fn collect_page(
    response: DescribeInstancesOutput,
    records: &mut Vec<InstanceRecord>,
    cap: usize,
) -> Option<String> {
    let next_token = response.next_token.filter(|token| !token.is_empty());

    for reservation in response.reservations.unwrap_or_default() {
        for instance in reservation.instances.unwrap_or_default() {
            records.push(normalize_instance(&instance));
        }
    }

    if records.len() >= cap {
        if next_token.is_some() {
            warn!(cap, "record cap reached, remaining pages not fetched");
        }
        return None;
    }

    next_token
}

/// Convert the SDK-free query filters into wire filters.
pub fn sdk_filters(query: &WireQuery) -> Vec<ec2::types::Filter> {
    query
        .filters
        .iter()
        .map(|(name, values)| {
            ec2::types::Filter::builder()
                .name(name.clone())
                .set_values(Some(values.clone()))
                .build()
        })
        .collect()
}

/// Map one wire instance to the normalized local record shape.
pub fn normalize_instance(instance: &ec2::types::Instance) -> InstanceRecord {
    let id = instance
        .instance_id
        .clone()
        .unwrap_or_else(|| "unknown-instance".to_string());

    let tags: Vec<InstanceTag> = instance
        .tags
        .clone()
        .unwrap_or_default()
        .into_iter()
        .filter_map(|tag| match (tag.key, tag.value) {
            (Some(key), Some(value)) => Some(InstanceTag { key, value }),
            _ => None,
        })
        .collect();

    let name = tags
        .iter()
        .find(|tag| tag.key == "Name")
        .map(|tag| tag.value.clone())
        .unwrap_or_else(|| VALUE_PLACEHOLDER.to_string());

    let state = instance
        .state
        .as_ref()
        .and_then(|state| state.name.as_ref())
        .map(|name| InstanceState::from_wire(name.as_str()))
        .unwrap_or(InstanceState::Unknown);

    let instance_type = instance
        .instance_type
        .as_ref()
        .map(|t| t.as_str().to_string())
        .unwrap_or_else(|| VALUE_PLACEHOLDER.to_string());

    let availability_zone = instance
        .placement
        .as_ref()
        .and_then(|placement| placement.availability_zone.clone())
        .unwrap_or_else(|| VALUE_PLACEHOLDER.to_string());

    InstanceRecord {
        id,
        name,
        instance_type,
        state,
        public_ip: instance.public_ip_address.clone(),
        private_ip: instance.private_ip_address.clone(),
        availability_zone,
        launch_time: instance.launch_time.as_ref().and_then(to_chrono),
        tags,
    }
}

fn to_chrono(timestamp: &aws_smithy_types::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp.secs(), timestamp.subsec_nanos())
}

/// Extended view returned by the single-instance describe operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceDetail {
    #[serde(flatten)]
    pub record: InstanceRecord,
    pub vpc_id: Option<String>,
    pub subnet_id: Option<String>,
    pub image_id: Option<String>,
    pub key_name: Option<String>,
    pub architecture: Option<String>,
    pub platform_details: Option<String>,
    pub security_groups: Vec<SecurityGroupRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityGroupRef {
    pub id: String,
    pub name: String,
}

/// Describe one instance by id; an empty result is `NotFound`.
pub async fn describe_instance(
    client: &ec2::Client,
    instance_id: &str,
) -> Result<InstanceDetail, ConsoleError> {
    if instance_id.trim().is_empty() {
        return Err(ConsoleError::Validation("instance id is required".to_string()));
    }

    let request = client.describe_instances().instance_ids(instance_id);
    let response = tokio::time::timeout(REMOTE_CALL_TIMEOUT, request.send())
        .await
        .map_err(|_| call_timeout("DescribeInstances", REMOTE_CALL_TIMEOUT))?
        .map_err(|e| categorize_remote_failure(&format!("{:?}", e), "DescribeInstances"))?;

    let instance = response
        .reservations
        .unwrap_or_default()
        .into_iter()
        .flat_map(|reservation| reservation.instances.unwrap_or_default())
        .next()
        .ok_or_else(|| ConsoleError::NotFound(format!("instance {} not found", instance_id)))?;

    Ok(instance_detail(&instance))
}

/// Build the extended detail view for one wire instance.
pub fn instance_detail(instance: &ec2::types::Instance) -> InstanceDetail {
    let security_groups = instance
        .security_groups
        .clone()
        .unwrap_or_default()
        .into_iter()
        .map(|group| SecurityGroupRef {
            id: group.group_id.unwrap_or_default(),
            name: group.group_name.unwrap_or_default(),
        })
        .collect();

    InstanceDetail {
        record: normalize_instance(instance),
        vpc_id: instance.vpc_id.clone(),
        subnet_id: instance.subnet_id.clone(),
        image_id: instance.image_id.clone(),
        key_name: instance.key_name.clone(),
        architecture: instance
            .architecture
            .as_ref()
            .map(|arch| arch.as_str().to_string()),
        platform_details: instance.platform_details.clone(),
        security_groups,
    }
}
