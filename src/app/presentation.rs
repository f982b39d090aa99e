use chrono::{DateTime, Utc};
use serde::Serialize;

use super::records::{InstanceRecord, InstanceState, InstanceTag, VALUE_PLACEHOLDER};

/// Non-Name tags shown inline before the overflow marker.
const META_TAG_LIMIT: usize = 2;

/// Presentation view of one record: formatted fields plus the action
/// enablement flags for the row's start/stop controls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceRow {
    pub id: String,
    pub name: String,
    pub instance_type: String,
    pub state: InstanceState,
    pub availability_zone: String,
    pub launch_time: String,
    /// Compact summary line: leading non-Name tags, overflow count, public IP.
    pub meta: String,
    pub can_start: bool,
    pub can_stop: bool,
}

pub fn render_rows(records: &[InstanceRecord]) -> Vec<InstanceRow> {
    records.iter().map(render_row).collect()
}

/// Enablement is recomputed from the record's current state on every render,
/// never carried over from a prior pass.
pub fn render_row(record: &InstanceRecord) -> InstanceRow {
    InstanceRow {
        id: record.id.clone(),
        name: record.name.clone(),
        instance_type: record.instance_type.clone(),
        state: record.state,
        availability_zone: record.availability_zone.clone(),
        launch_time: record
            .launch_time
            .map(format_launch_time)
            .unwrap_or_else(|| VALUE_PLACEHOLDER.to_string()),
        meta: meta_summary(record),
        can_start: record.can_start(),
        can_stop: record.can_stop(),
    }
}

fn format_launch_time(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn meta_summary(record: &InstanceRecord) -> String {
    let other_tags: Vec<&InstanceTag> = record
        .tags
        .iter()
        .filter(|tag| tag.key != "Name")
        .collect();

    let mut fragments: Vec<String> = other_tags
        .iter()
        .take(META_TAG_LIMIT)
        .map(|tag| format!("{}={}", tag.key, tag.value))
        .collect();
    if other_tags.len() > META_TAG_LIMIT {
        fragments.push(format!("+{} tags", other_tags.len() - META_TAG_LIMIT));
    }

    let mut parts = Vec::new();
    if !fragments.is_empty() {
        parts.push(fragments.join(" · "));
    }
    if let Some(ip) = &record.public_ip {
        parts.push(format!("IP {}", ip));
    }

    parts.join(" · ")
}
