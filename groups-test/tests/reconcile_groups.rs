use groups_reconciler_core::{Error, GroupSettings, GroupSpec, RemoteGroup, RemoteMember, Role};
use groups_test::{
    emails, group, init_tracing, reconciled_group, reconciler, Call, FakeDirectory,
};
use pretty_assertions::assert_eq;

#[tokio::test(flavor = "current_thread")]
async fn creates_a_group_in_an_empty_directory() {
    let _tracing = init_tracing();
    let directory = FakeDirectory::default();

    let groups = vec![GroupSpec {
        members: emails(&["a@x.com"]),
        ..group("g@x.com")
    }];
    reconciler(&directory, true)
        .reconcile_groups(&groups)
        .await
        .expect("reconciliation must succeed");

    assert_eq!(
        directory.calls(),
        vec![
            Call::InsertGroup(RemoteGroup {
                email: "g@x.com".to_string(),
                ..Default::default()
            }),
            Call::PatchSettings("g@x.com".to_string(), GroupSettings::defaults()),
            Call::InsertMember(
                "g@x.com".to_string(),
                RemoteMember::new("a@x.com", Role::Member)
            ),
        ]
    );
    assert_eq!(
        directory.members("g@x.com"),
        vec![("a@x.com".to_string(), Role::Member)]
    );
}

#[tokio::test(flavor = "current_thread")]
async fn second_run_makes_no_calls() {
    let _tracing = init_tracing();
    let directory = FakeDirectory::default();

    let groups = vec![
        GroupSpec {
            name: "Group G".to_string(),
            description: "The G team".to_string(),
            owners: emails(&["o@x.com"]),
            managers: emails(&["m@x.com"]),
            members: emails(&["a@x.com", "b@x.com"]),
            ..group("g@x.com")
        },
        GroupSpec {
            members: emails(&["a@x.com"]),
            ..reconciled_group("h@x.com")
        },
    ];
    let reconciler = reconciler(&directory, true);
    reconciler
        .reconcile_groups(&groups)
        .await
        .expect("first run must succeed");
    assert!(!directory.take_calls().is_empty());

    reconciler
        .reconcile_groups(&groups)
        .await
        .expect("second run must succeed");
    assert_eq!(directory.calls(), Vec::<Call>::new());
}

#[tokio::test(flavor = "current_thread")]
async fn updates_name_and_description() {
    let _tracing = init_tracing();
    let directory = FakeDirectory::default()
        .with_group("g@x.com", "old", "kept")
        .with_settings("g@x.com", GroupSettings::defaults());

    let groups = vec![GroupSpec {
        name: "new".to_string(),
        ..group("g@x.com")
    }];
    reconciler(&directory, true)
        .reconcile_groups(&groups)
        .await
        .expect("reconciliation must succeed");

    assert_eq!(
        directory.calls(),
        vec![Call::UpdateGroup(
            "g@x.com".to_string(),
            RemoteGroup {
                email: "g@x.com".to_string(),
                name: "new".to_string(),
                ..Default::default()
            }
        )]
    );
    let remote = directory.group("g@x.com").expect("group must exist");
    assert_eq!(remote.name, "new");
    assert_eq!(remote.description, "kept");
}

#[tokio::test(flavor = "current_thread")]
async fn deletes_orphans_after_every_group() {
    let _tracing = init_tracing();
    let directory = FakeDirectory::default()
        .with_group("a@x.com", "", "")
        .with_group("b@x.com", "", "")
        .with_group("orphan@x.com", "", "");

    let groups = vec![group("a@x.com"), group("b@x.com"), group("c@x.com")];
    reconciler(&directory, true)
        .with_workers(2)
        .reconcile_groups(&groups)
        .await
        .expect("reconciliation must succeed");

    let calls = directory.calls();
    assert_eq!(
        calls.last(),
        Some(&Call::DeleteGroup("orphan@x.com".to_string()))
    );
    assert_eq!(
        calls
            .iter()
            .filter(|c| matches!(c, Call::DeleteGroup(_)))
            .count(),
        1
    );
    assert_eq!(
        directory.group_emails(),
        vec!["a@x.com", "b@x.com", "c@x.com"]
    );
}

#[tokio::test(flavor = "current_thread")]
async fn orphans_are_matched_by_equivalent_address() {
    let _tracing = init_tracing();
    let directory = FakeDirectory::default()
        .with_group("Team@x.com", "", "")
        .with_group("other@x.com", "", "");

    reconciler(&directory, true)
        .admin()
        .delete_orphan_groups(&[group("te.am@X.com")])
        .await
        .expect("orphan deletion must succeed");

    assert_eq!(
        directory.calls(),
        vec![Call::DeleteGroup("other@x.com".to_string())]
    );
}

#[tokio::test(flavor = "current_thread")]
async fn an_empty_desired_list_removes_every_group() {
    let _tracing = init_tracing();
    let directory = FakeDirectory::default()
        .with_group("a@x.com", "", "")
        .with_group("b@x.com", "", "");

    reconciler(&directory, false)
        .reconcile_groups(&[])
        .await
        .expect("dry run must succeed");
    assert_eq!(directory.calls(), Vec::<Call>::new());

    reconciler(&directory, true)
        .reconcile_groups(&[])
        .await
        .expect("reconciliation must succeed");
    assert_eq!(directory.group_emails(), Vec::<String>::new());
}

#[tokio::test(flavor = "current_thread")]
async fn dry_run_makes_no_calls() {
    let _tracing = init_tracing();
    let directory = FakeDirectory::default()
        .with_group("existing@x.com", "old", "")
        .with_member("existing@x.com", "gone@x.com", Role::Owner)
        .with_group("orphan@x.com", "", "");

    let groups = vec![
        GroupSpec {
            owners: emails(&["o@x.com"]),
            members: emails(&["a@x.com"]),
            ..group("new@x.com")
        },
        GroupSpec {
            name: "new".to_string(),
            members: emails(&["a@x.com"]),
            ..group("existing@x.com")
        },
    ];
    reconciler(&directory, false)
        .reconcile_groups(&groups)
        .await
        .expect("dry run must tolerate groups that do not exist yet");

    assert_eq!(directory.calls(), Vec::<Call>::new());
    assert_eq!(
        directory.group_emails(),
        vec!["existing@x.com", "orphan@x.com"]
    );
}

#[tokio::test(flavor = "current_thread")]
async fn groups_without_an_email_id_are_reported() {
    let _tracing = init_tracing();
    let directory = FakeDirectory::default();

    let groups = vec![
        GroupSpec {
            name: "nameless".to_string(),
            ..Default::default()
        },
        group("g@x.com"),
    ];
    let errors = reconciler(&directory, true)
        .reconcile_groups(&groups)
        .await
        .expect_err("a group without an email-id must fail");

    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors.errors()[0].downcast_ref::<Error>(),
        Some(&Error::MissingEmailId {
            name: "nameless".to_string()
        })
    );
    assert!(directory.group("g@x.com").is_some());
}

#[tokio::test(flavor = "current_thread")]
async fn many_groups_on_few_workers() {
    let _tracing = init_tracing();
    let directory = FakeDirectory::default();

    let groups = (0..20)
        .map(|i| GroupSpec {
            members: emails(&["a@x.com"]),
            ..group(&format!("g{i:02}@x.com"))
        })
        .collect::<Vec<_>>();
    reconciler(&directory, true)
        .with_workers(3)
        .reconcile_groups(&groups)
        .await
        .expect("reconciliation must succeed");

    assert_eq!(
        directory.group_emails(),
        groups.iter().map(|g| g.email_id.clone()).collect::<Vec<_>>()
    );
    for group in &groups {
        assert_eq!(
            directory.members(&group.email_id),
            vec![("a@x.com".to_string(), Role::Member)]
        );
    }
}

#[tokio::test(flavor = "current_thread")]
async fn group_lookup_failures_do_not_stop_member_steps() {
    let _tracing = init_tracing();
    let directory = FakeDirectory::default()
        .with_group("g@x.com", "", "")
        .with_failing_group("g@x.com");

    let groups = vec![GroupSpec {
        members: emails(&["a@x.com"]),
        ..group("g@x.com")
    }];
    let errors = reconciler(&directory, true)
        .reconcile_groups(&groups)
        .await
        .expect_err("failed lookups must be reported");

    assert_eq!(
        errors
            .errors()
            .iter()
            .map(|e| format!("{e:#}"))
            .collect::<Vec<_>>(),
        vec![
            "unable to fetch group \"g@x.com\": injected failure for g@x.com",
            "unable to retrieve group settings for \"g@x.com\": injected failure for g@x.com",
        ]
    );
    assert_eq!(
        directory.members("g@x.com"),
        vec![("a@x.com".to_string(), Role::Member)]
    );
}

#[tokio::test(flavor = "current_thread")]
async fn list_failures_are_reported_with_group_errors() {
    let _tracing = init_tracing();
    let directory = FakeDirectory::default().with_failing_list();

    let groups = vec![
        GroupSpec {
            name: "nameless".to_string(),
            ..Default::default()
        },
        group("g@x.com"),
    ];
    let errors = reconciler(&directory, true)
        .reconcile_groups(&groups)
        .await
        .expect_err("a failed listing must be reported");

    assert_eq!(errors.len(), 2);
    assert_eq!(
        errors.errors()[0].downcast_ref::<Error>(),
        Some(&Error::MissingEmailId {
            name: "nameless".to_string()
        })
    );
    assert_eq!(
        format!("{:#}", errors.errors()[1]),
        "unable to list groups: injected failure listing groups"
    );
    assert!(directory.group("g@x.com").is_some());
}

#[tokio::test(flavor = "current_thread")]
async fn equivalent_groups_are_reconciled_once() {
    let _tracing = init_tracing();
    let directory = FakeDirectory::default();

    let groups = vec![
        GroupSpec {
            members: emails(&["a@x.com"]),
            ..group("g@x.com")
        },
        group("G@X.com"),
    ];
    reconciler(&directory, true)
        .reconcile_groups(&groups)
        .await
        .expect("reconciliation must succeed");

    let inserts = directory
        .calls()
        .into_iter()
        .filter(|call| matches!(call, Call::InsertGroup(_)))
        .count();
    assert_eq!(inserts, 1);
    assert_eq!(directory.group_emails(), vec!["g@x.com"]);
    assert_eq!(
        directory.members("g@x.com"),
        vec![("a@x.com".to_string(), Role::Member)]
    );
}
