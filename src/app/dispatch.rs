use aws_sdk_ec2 as ec2;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use super::inventory::REMOTE_CALL_TIMEOUT;
use super::records::InstanceState;
use super::sdk_errors::{call_timeout, categorize_remote_failure, ConsoleError};

/// Mutating command targeting exactly one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceAction {
    Start,
    Stop,
    Reboot,
}

impl InstanceAction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "start" => Some(Self::Start),
            "stop" => Some(Self::Stop),
            "reboot" => Some(Self::Reboot),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Reboot => "reboot",
        }
    }

    /// Remote operation name, used in error messages.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Start => "StartInstances",
            Self::Stop => "StopInstances",
            Self::Reboot => "RebootInstances",
        }
    }
}

impl fmt::Display for InstanceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote acknowledgement of a dispatched command. The remote confirms
/// receipt, not the eventual state transition; reboot reports no state
/// change at all.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionAck {
    pub instance_id: String,
    pub action: InstanceAction,
    pub previous_state: Option<InstanceState>,
    pub current_state: Option<InstanceState>,
}

impl ActionAck {
    /// User-facing confirmation line.
    pub fn message(&self) -> String {
        match (&self.previous_state, &self.current_state) {
            (Some(previous), Some(current)) => format!(
                "{} command sent to {} ({} -> {})",
                self.action.operation(),
                self.instance_id,
                previous,
                current
            ),
            _ => format!(
                "{} command sent to {}",
                self.action.operation(),
                self.instance_id
            ),
        }
    }
}

/// Send exactly one mutating command for one instance id. No batching, no
/// retry; the caller is responsible for the follow-up inventory re-fetch.
///
/// The current remote state is not re-validated before sending: it may have
/// changed since the last fetch, and an action invalid at execution time
/// surfaces as a remote-side error.
pub async fn dispatch_action(
    client: &ec2::Client,
    action: InstanceAction,
    instance_id: &str,
) -> Result<ActionAck, ConsoleError> {
    if instance_id.trim().is_empty() {
        return Err(ConsoleError::Validation("instance id is required".to_string()));
    }

    info!(action = action.as_str(), instance_id, "dispatching instance command");

    let (previous_state, current_state) = match action {
        InstanceAction::Start => {
            let request = client.start_instances().instance_ids(instance_id);
            let response = tokio::time::timeout(REMOTE_CALL_TIMEOUT, request.send())
                .await
                .map_err(|_| call_timeout(action.operation(), REMOTE_CALL_TIMEOUT))?
                .map_err(|e| categorize_remote_failure(&format!("{:?}", e), action.operation()))?;
            state_change(response.starting_instances)
        }
        InstanceAction::Stop => {
            let request = client.stop_instances().instance_ids(instance_id);
            let response = tokio::time::timeout(REMOTE_CALL_TIMEOUT, request.send())
                .await
                .map_err(|_| call_timeout(action.operation(), REMOTE_CALL_TIMEOUT))?
                .map_err(|e| categorize_remote_failure(&format!("{:?}", e), action.operation()))?;
            state_change(response.stopping_instances)
        }
        InstanceAction::Reboot => {
            let request = client.reboot_instances().instance_ids(instance_id);
            tokio::time::timeout(REMOTE_CALL_TIMEOUT, request.send())
                .await
                .map_err(|_| call_timeout(action.operation(), REMOTE_CALL_TIMEOUT))?
                .map_err(|e| categorize_remote_failure(&format!("{:?}", e), action.operation()))?;
            (None, None)
        }
    };

    Ok(ActionAck {
        instance_id: instance_id.to_string(),
        action,
        previous_state,
        current_state,
    })
}

/// Extract the (previous, current) state pair from the acknowledgement's
/// state-change list.
pub fn state_change(
    changes: Option<Vec<ec2::types::InstanceStateChange>>,
) -> (Option<InstanceState>, Option<InstanceState>) {
    match changes.unwrap_or_default().into_iter().next() {
        Some(change) => (
            change
                .previous_state
                .and_then(|state| state.name)
                .map(|name| InstanceState::from_wire(name.as_str())),
            change
                .current_state
                .and_then(|state| state.name)
                .map(|name| InstanceState::from_wire(name.as_str())),
        ),
        None => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parse() {
        assert_eq!(InstanceAction::parse("start"), Some(InstanceAction::Start));
        assert_eq!(InstanceAction::parse(" Stop "), Some(InstanceAction::Stop));
        assert_eq!(InstanceAction::parse("reboot"), Some(InstanceAction::Reboot));
        assert_eq!(InstanceAction::parse("terminate"), None);
    }

    #[test]
    fn test_ack_message_with_states() {
        let ack = ActionAck {
            instance_id: "i-abc".to_string(),
            action: InstanceAction::Start,
            previous_state: Some(InstanceState::Stopped),
            current_state: Some(InstanceState::Pending),
        };
        assert_eq!(
            ack.message(),
            "StartInstances command sent to i-abc (stopped -> pending)"
        );
    }

    #[test]
    fn test_ack_message_without_states() {
        let ack = ActionAck {
            instance_id: "i-abc".to_string(),
            action: InstanceAction::Reboot,
            previous_state: None,
            current_state: None,
        };
        assert_eq!(ack.message(), "RebootInstances command sent to i-abc");
    }

    #[test]
    fn test_state_change_extraction() {
        let change = ec2::types::InstanceStateChange::builder()
            .instance_id("i-abc")
            .previous_state(
                ec2::types::InstanceState::builder()
                    .name(ec2::types::InstanceStateName::Stopped)
                    .build(),
            )
            .current_state(
                ec2::types::InstanceState::builder()
                    .name(ec2::types::InstanceStateName::Pending)
                    .build(),
            )
            .build();

        let (previous, current) = state_change(Some(vec![change]));
        assert_eq!(previous, Some(InstanceState::Stopped));
        assert_eq!(current, Some(InstanceState::Pending));

        assert_eq!(state_change(None), (None, None));
    }
}
