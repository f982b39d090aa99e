use ec2dash::app::presentation::{render_row, render_rows};
use ec2dash::app::records::{InstanceRecord, InstanceState};
use pretty_assertions::assert_eq;

fn record(id: &str, name: &str, state: InstanceState) -> InstanceRecord {
    InstanceRecord {
        id: id.to_string(),
        name: name.to_string(),
        instance_type: "t3.micro".to_string(),
        state,
        public_ip: None,
        private_ip: None,
        availability_zone: "eu-west-3a".to_string(),
        launch_time: None,
        tags: Vec::new(),
    }
}

#[test]
fn test_stopped_then_pending_render_cycle() {
    // First fetch: the instance is stopped, so Start is the only enabled
    // action.
    let fetched = record("i-abc", "Web", InstanceState::Stopped);
    let row = render_row(&fetched);
    assert!(row.can_start);
    assert!(!row.can_stop);

    // The start command is acknowledged and the triggered re-fetch sees the
    // instance pending: the fresh render must disable both actions. The
    // record is rebuilt, never patched in place.
    let refetched = record("i-abc", "Web", InstanceState::Pending);
    let row = render_row(&refetched);
    assert!(!row.can_start);
    assert!(!row.can_stop);
}

#[test]
fn test_enablement_is_recomputed_per_render() {
    let mut r = record("i-1", "db", InstanceState::Running);
    let first = render_row(&r);
    assert!(first.can_stop);

    // Same record value, new state: a later render pass must reflect the new
    // state rather than anything cached from the first pass.
    r.state = InstanceState::Stopping;
    let second = render_row(&r);
    assert!(!second.can_stop);
    assert!(!second.can_start);
}

#[test]
fn test_rows_preserve_input_order() {
    let records = vec![
        record("i-1", "web", InstanceState::Running),
        record("i-2", "db", InstanceState::Stopped),
    ];
    let rows = render_rows(&records);
    let ids: Vec<&str> = rows.iter().map(|row| row.id.as_str()).collect();
    assert_eq!(ids, vec!["i-1", "i-2"]);
}
