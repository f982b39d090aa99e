use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Placeholder rendered for values the remote did not report (name, IPs, zone).
pub const VALUE_PLACEHOLDER: &str = "—";

/// Lifecycle state of a remote instance, lower-cased on ingest.
///
/// Anything the wire reports that is not one of the six known states maps to
/// [`InstanceState::Unknown`] rather than failing the whole fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceState {
    Pending,
    Running,
    Stopping,
    Stopped,
    ShuttingDown,
    Terminated,
    Unknown,
}

impl InstanceState {
    /// Parse a known state name, case-insensitively. Returns `None` for
    /// anything unrecognized so callers can decide between warning and
    /// degrading to [`InstanceState::Unknown`].
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "stopping" => Some(Self::Stopping),
            "stopped" => Some(Self::Stopped),
            "shutting-down" => Some(Self::ShuttingDown),
            "terminated" => Some(Self::Terminated),
            _ => None,
        }
    }

    /// Map a wire state name to a state, degrading to `Unknown`.
    pub fn from_wire(raw: &str) -> Self {
        Self::parse(raw).unwrap_or(Self::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::ShuttingDown => "shutting-down",
            Self::Terminated => "terminated",
            Self::Unknown => "unknown",
        }
    }

    /// Sort rank: active states first, terminal states last.
    pub fn priority(&self) -> u8 {
        match self {
            Self::Running => 0,
            Self::Pending => 1,
            Self::Stopping => 2,
            Self::Stopped => 3,
            Self::ShuttingDown => 4,
            Self::Terminated => 5,
            Self::Unknown => 6,
        }
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceTag {
    pub key: String,
    pub value: String,
}

/// Normalized local view of one remote instance.
///
/// Records are value objects: reconstructed fresh on every fetch, never
/// tracked across render cycles, identified only by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub id: String,
    /// Resolved from the `Name` tag, else [`VALUE_PLACEHOLDER`].
    pub name: String,
    pub instance_type: String,
    pub state: InstanceState,
    pub public_ip: Option<String>,
    pub private_ip: Option<String>,
    pub availability_zone: String,
    pub launch_time: Option<DateTime<Utc>>,
    pub tags: Vec<InstanceTag>,
}

impl InstanceRecord {
    pub fn can_start(&self) -> bool {
        self.state == InstanceState::Stopped
    }

    pub fn can_stop(&self) -> bool {
        self.state == InstanceState::Running
    }
}

/// Total order over records: state priority, then name (case-insensitive),
/// then id. The id tie-break keeps the order total even for identical names.
pub fn compare_records(a: &InstanceRecord, b: &InstanceRecord) -> Ordering {
    a.state
        .priority()
        .cmp(&b.state.priority())
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn sort_records(records: &mut [InstanceRecord]) {
    records.sort_by(compare_records);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, name: &str, state: InstanceState) -> InstanceRecord {
        InstanceRecord {
            id: id.to_string(),
            name: name.to_string(),
            instance_type: "t3.micro".to_string(),
            state,
            public_ip: None,
            private_ip: None,
            availability_zone: "us-east-1a".to_string(),
            launch_time: None,
            tags: Vec::new(),
        }
    }

    #[test]
    fn test_state_parse_round_trip() {
        for name in [
            "pending",
            "running",
            "stopping",
            "stopped",
            "shutting-down",
            "terminated",
        ] {
            let state = InstanceState::parse(name).expect(name);
            assert_eq!(state.as_str(), name);
        }
        assert_eq!(InstanceState::parse("Running"), Some(InstanceState::Running));
        assert_eq!(InstanceState::parse("rebooting"), None);
        assert_eq!(InstanceState::from_wire("rebooting"), InstanceState::Unknown);
    }

    #[test]
    fn test_state_priority_order() {
        let ordered = [
            InstanceState::Running,
            InstanceState::Pending,
            InstanceState::Stopping,
            InstanceState::Stopped,
            InstanceState::ShuttingDown,
            InstanceState::Terminated,
            InstanceState::Unknown,
        ];
        for (rank, state) in ordered.iter().enumerate() {
            assert_eq!(state.priority() as usize, rank);
        }
    }

    #[test]
    fn test_state_priority_dominates_name() {
        // A running instance sorts before a stopped one regardless of names.
        let a = record("i-2", "zzz", InstanceState::Running);
        let b = record("i-1", "aaa", InstanceState::Stopped);
        assert_eq!(compare_records(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_sort_ties_break_on_id() {
        let mut records = vec![
            record("i-b", "web", InstanceState::Running),
            record("i-a", "web", InstanceState::Running),
        ];
        sort_records(&mut records);
        assert_eq!(records[0].id, "i-a");
        assert_eq!(records[1].id, "i-b");
    }

    #[test]
    fn test_sort_is_idempotent() {
        let mut once = vec![
            record("i-3", "db", InstanceState::Stopped),
            record("i-1", "web", InstanceState::Running),
            record("i-2", "Web", InstanceState::Running),
            record("i-4", "cache", InstanceState::Terminated),
        ];
        sort_records(&mut once);
        let mut twice = once.clone();
        sort_records(&mut twice);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_action_enablement_matrix() {
        // Both actions are simultaneously false for exactly the non-stopped,
        // non-running states.
        for state in [
            InstanceState::Pending,
            InstanceState::Stopping,
            InstanceState::ShuttingDown,
            InstanceState::Terminated,
            InstanceState::Unknown,
        ] {
            let r = record("i-x", "n", state);
            assert!(!r.can_start(), "{} should not allow start", state);
            assert!(!r.can_stop(), "{} should not allow stop", state);
        }

        let stopped = record("i-x", "n", InstanceState::Stopped);
        assert!(stopped.can_start() && !stopped.can_stop());

        let running = record("i-x", "n", InstanceState::Running);
        assert!(running.can_stop() && !running.can_start());
    }
}
