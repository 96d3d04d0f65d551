use groups_reconciler_core::{GroupSettings, GroupSpec};
use groups_test::{group, init_tracing, reconciler, Call, FakeDirectory};
use maplit::{btreemap, convert_args};
use pretty_assertions::assert_eq;

fn current() -> GroupSettings {
    let mut settings = GroupSettings::defaults();
    settings.allow_web_posting = Some("true".to_string());
    settings.other = convert_args!(
        keys = String::from,
        btreemap!(
            "email" => serde_json::json!("g@x.com"),
            "customFooterText" => serde_json::json!("hello"),
        )
    );
    settings
}

#[tokio::test(flavor = "current_thread")]
async fn patches_overrides_and_keeps_other_fields() {
    let _tracing = init_tracing();
    let directory = FakeDirectory::default()
        .with_group("g@x.com", "", "")
        .with_settings("g@x.com", current());

    let group = GroupSpec {
        settings: convert_args!(btreemap!(
            "WhoCanJoin" => "ALL_IN_DOMAIN_CAN_JOIN",
            "AllowWebPosting" => "false",
            "Unrecognized" => "ignored",
        )),
        ..group("g@x.com")
    };
    reconciler(&directory, true)
        .settings()
        .update_group_settings(&group)
        .await
        .expect("settings update must succeed");

    let mut expected = current();
    expected.who_can_join = Some("ALL_IN_DOMAIN_CAN_JOIN".to_string());
    expected.allow_web_posting = Some("false".to_string());
    assert_eq!(
        directory.calls(),
        vec![Call::PatchSettings("g@x.com".to_string(), expected.clone())]
    );
    assert_eq!(directory.settings("g@x.com"), Some(expected));
}

#[tokio::test(flavor = "current_thread")]
async fn drifted_fields_are_reset_to_defaults() {
    let _tracing = init_tracing();
    let mut drifted = current();
    drifted.who_can_view_group = Some("ANYONE_CAN_VIEW".to_string());
    let directory = FakeDirectory::default()
        .with_group("g@x.com", "", "")
        .with_settings("g@x.com", drifted);

    reconciler(&directory, true)
        .settings()
        .update_group_settings(&group("g@x.com"))
        .await
        .expect("settings update must succeed");

    assert_eq!(directory.settings("g@x.com"), Some(current()));
}

#[tokio::test(flavor = "current_thread")]
async fn matching_settings_are_not_patched() {
    let _tracing = init_tracing();
    let directory = FakeDirectory::default()
        .with_group("g@x.com", "", "")
        .with_settings("g@x.com", current());

    let group = GroupSpec {
        settings: convert_args!(btreemap!(
            "AllowWebPosting" => "true",
            "ReconcileMembers" => "true",
        )),
        ..group("g@x.com")
    };
    reconciler(&directory, true)
        .settings()
        .update_group_settings(&group)
        .await
        .expect("settings update must succeed");

    assert_eq!(directory.calls(), Vec::<Call>::new());
}

#[tokio::test(flavor = "current_thread")]
async fn dry_run_does_not_patch() {
    let _tracing = init_tracing();
    let directory = FakeDirectory::default().with_group("g@x.com", "", "");

    let settings = reconciler(&directory, false).settings().clone();
    settings
        .update_group_settings(&group("g@x.com"))
        .await
        .expect("dry run must succeed");
    settings
        .update_group_settings(&group("missing@x.com"))
        .await
        .expect("a missing group must be skipped");

    assert_eq!(directory.calls(), Vec::<Call>::new());
    assert_eq!(
        directory.settings("g@x.com"),
        Some(GroupSettings::default())
    );
}
