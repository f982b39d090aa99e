use aws_sdk_ec2::operation::describe_instances::DescribeInstancesOutput;
use aws_sdk_ec2::types::{
    GroupIdentifier, Instance, InstanceState as WireState, InstanceStateName, InstanceType,
    Placement, Reservation, Tag,
};
use ec2dash::app::filters::{normalize, RawFilter};
use ec2dash::app::inventory::{
    collect_page, instance_detail, normalize_instance, sdk_filters, MAX_RECORDS,
};
use ec2dash::app::records::{InstanceState, VALUE_PLACEHOLDER};
use pretty_assertions::assert_eq;

fn wire_instance(id: &str, name: Option<&str>, state: InstanceStateName) -> Instance {
    let mut builder = Instance::builder()
        .instance_id(id)
        .instance_type(InstanceType::T3Micro)
        .state(WireState::builder().name(state).build())
        .placement(Placement::builder().availability_zone("eu-west-3a").build());
    if let Some(name) = name {
        builder = builder.tags(Tag::builder().key("Name").value(name).build());
    }
    builder.build()
}

fn page(instances: Vec<Instance>, next_token: Option<&str>) -> DescribeInstancesOutput {
    let mut reservation = Reservation::builder();
    for instance in instances {
        reservation = reservation.instances(instance);
    }
    let mut builder = DescribeInstancesOutput::builder().reservations(reservation.build());
    if let Some(token) = next_token {
        builder = builder.next_token(token);
    }
    builder.build()
}

#[test]
fn test_three_pages_concatenate_in_page_order() {
    // Pages of 2, 2 and 1 records; tokens on the first two, absent on the
    // last. The fetch must yield exactly 5 records, concatenated.
    let pages = vec![
        page(
            vec![
                wire_instance("i-1", Some("a"), InstanceStateName::Running),
                wire_instance("i-2", Some("b"), InstanceStateName::Running),
            ],
            Some("token-1"),
        ),
        page(
            vec![
                wire_instance("i-3", Some("c"), InstanceStateName::Stopped),
                wire_instance("i-4", Some("d"), InstanceStateName::Stopped),
            ],
            Some("token-2"),
        ),
        page(
            vec![wire_instance("i-5", Some("e"), InstanceStateName::Pending)],
            None,
        ),
    ];

    let mut records = Vec::new();
    let mut token: Option<String> = None;
    for (index, output) in pages.into_iter().enumerate() {
        token = collect_page(output, &mut records, MAX_RECORDS);
        let expect_more = index < 2;
        assert_eq!(token.is_some(), expect_more, "page {}", index);
    }
    assert!(token.is_none());

    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["i-1", "i-2", "i-3", "i-4", "i-5"]);
}

#[test]
fn test_record_cap_stops_pagination() {
    let instances: Vec<Instance> = (0..3)
        .map(|n| wire_instance(&format!("i-{}", n), None, InstanceStateName::Running))
        .collect();
    let output = page(instances, Some("more"));

    let mut records = Vec::new();
    let token = collect_page(output, &mut records, 3);
    assert_eq!(records.len(), 3);
    // Token present on the wire, but the cap ends the loop.
    assert!(token.is_none());
}

#[test]
fn test_empty_continuation_token_ends_the_loop() {
    let output = page(
        vec![wire_instance("i-1", None, InstanceStateName::Running)],
        Some(""),
    );
    let mut records = Vec::new();
    assert!(collect_page(output, &mut records, MAX_RECORDS).is_none());
}

#[test]
fn test_multiple_reservations_flatten_in_order() {
    let output = DescribeInstancesOutput::builder()
        .reservations(
            Reservation::builder()
                .instances(wire_instance("i-1", None, InstanceStateName::Running))
                .instances(wire_instance("i-2", None, InstanceStateName::Running))
                .build(),
        )
        .reservations(
            Reservation::builder()
                .instances(wire_instance("i-3", None, InstanceStateName::Running))
                .build(),
        )
        .build();

    let mut records = Vec::new();
    collect_page(output, &mut records, MAX_RECORDS);
    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["i-1", "i-2", "i-3"]);
}

#[test]
fn test_normalization_resolves_name_and_state() {
    let instance = Instance::builder()
        .instance_id("i-abc")
        .instance_type(InstanceType::M5Large)
        .state(
            WireState::builder()
                .name(InstanceStateName::ShuttingDown)
                .build(),
        )
        .placement(Placement::builder().availability_zone("eu-west-3c").build())
        .tags(Tag::builder().key("Env").value("prod").build())
        .tags(Tag::builder().key("Name").value("Web").build())
        .private_ip_address("10.0.0.5")
        .build();

    let record = normalize_instance(&instance);
    assert_eq!(record.id, "i-abc");
    assert_eq!(record.name, "Web");
    assert_eq!(record.state, InstanceState::ShuttingDown);
    assert_eq!(record.instance_type, "m5.large");
    assert_eq!(record.availability_zone, "eu-west-3c");
    assert_eq!(record.public_ip, None);
    assert_eq!(record.private_ip, Some("10.0.0.5".to_string()));
    assert_eq!(record.tags.len(), 2);
}

#[test]
fn test_normalization_defaults_for_sparse_instances() {
    let record = normalize_instance(&Instance::builder().instance_id("i-bare").build());
    assert_eq!(record.name, VALUE_PLACEHOLDER);
    assert_eq!(record.instance_type, VALUE_PLACEHOLDER);
    assert_eq!(record.availability_zone, VALUE_PLACEHOLDER);
    assert_eq!(record.state, InstanceState::Unknown);
    assert_eq!(record.launch_time, None);
    assert!(record.tags.is_empty());
}

#[test]
fn test_detail_extends_the_record() {
    let instance = Instance::builder()
        .instance_id("i-abc")
        .state(WireState::builder().name(InstanceStateName::Running).build())
        .vpc_id("vpc-1")
        .subnet_id("subnet-2")
        .image_id("ami-3")
        .key_name("ops-key")
        .security_groups(
            GroupIdentifier::builder()
                .group_id("sg-1")
                .group_name("web-sg")
                .build(),
        )
        .build();

    let detail = instance_detail(&instance);
    assert_eq!(detail.record.id, "i-abc");
    assert_eq!(detail.vpc_id, Some("vpc-1".to_string()));
    assert_eq!(detail.subnet_id, Some("subnet-2".to_string()));
    assert_eq!(detail.image_id, Some("ami-3".to_string()));
    assert_eq!(detail.key_name, Some("ops-key".to_string()));
    assert_eq!(detail.security_groups.len(), 1);
    assert_eq!(detail.security_groups[0].id, "sg-1");
    assert_eq!(detail.security_groups[0].name, "web-sg");
}

#[test]
fn test_wire_filters_built_from_normalized_query() {
    let normalized = normalize(&RawFilter {
        instance_ids: String::new(),
        tags: "Team=infra|ops".to_string(),
        state: "running".to_string(),
    });
    let filters = sdk_filters(&normalized.filter.wire_query());

    assert_eq!(filters.len(), 2);
    assert_eq!(filters[0].name, Some("tag:Team".to_string()));
    assert_eq!(
        filters[0].values,
        Some(vec!["infra".to_string(), "ops".to_string()])
    );
    assert_eq!(filters[1].name, Some("instance-state-name".to_string()));
    assert_eq!(filters[1].values, Some(vec!["running".to_string()]));
}
