//! Provisioning walk against the in-memory platform.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use quicklab_core::access::AccessLevel;
use quicklab_core::node::{Node, Project, DEFAULT_REPO, SUBTYPE_STUDENT, SUBTYPE_TA};
use quicklab_core::project_settings::{ImportKind, ProjectDefaults};
use quicklab_gitlab::platform::{MemberTarget, ProjectSource};
use quicklab_gitlab::{PlatformError, ProvisionError, Provisioner};

use common::{course, fast_retry, group, user, FakePlatform, WEB_URL};

fn project(id: &str, members: Vec<Node>) -> Node {
    let mut project = Project::new(id, DEFAULT_REPO);
    project.children = members;
    Node::Project(project)
}

fn provisioner(fake: &Arc<FakePlatform>) -> Provisioner {
    Provisioner::new(fake.clone(), fast_retry())
}

// ---------------------------------------------------------------------------
// Test: creation and idempotency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_creates_groups_users_and_memberships() {
    let fake = Arc::new(FakePlatform::new());
    let tree = course(vec![group("g1", vec![user("alice", SUBTYPE_TA)])]);

    let url = provisioner(&fake)
        .provision(&tree, &ProjectDefaults::default())
        .await
        .unwrap();

    assert_eq!(url, format!("{WEB_URL}/CS101/2024"));
    {
        let state = fake.state.lock().unwrap();
        assert_eq!(state.created_groups, ["CS101", "CS101/2024", "CS101/2024/g1"]);
        assert_eq!(state.created_users, ["alice"]);
    }

    let g1 = fake.group_id("CS101/2024/g1").unwrap();
    let alice = fake.user_id("alice").unwrap();
    assert_eq!(
        fake.member_level(MemberTarget::Group(g1), alice),
        Some(AccessLevel::Maintainer)
    );
}

#[tokio::test]
async fn test_second_run_creates_nothing() {
    let fake = Arc::new(FakePlatform::new());
    let tree = course(vec![
        group("g1", vec![user("alice", SUBTYPE_TA), project("lab", vec![])]),
        group("g2", vec![user("bob", SUBTYPE_STUDENT)]),
    ]);
    let provisioner = provisioner(&fake);
    let defaults = ProjectDefaults::default();

    let first = provisioner.provision(&tree, &defaults).await.unwrap();
    let after_first = fake.counts();
    let second = provisioner.provision(&tree, &defaults).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(fake.counts(), after_first);
    assert_eq!(after_first, (4, 1, 2, 2));
    assert_eq!(fake.state.lock().unwrap().membership_conflicts, 2);
}

#[tokio::test]
async fn test_existing_account_is_found_by_email() {
    let fake = Arc::new(FakePlatform::new());
    let existing = fake.seed_user("alice.smith", "alice@example.org");
    let tree = course(vec![group("g1", vec![user("alice", SUBTYPE_STUDENT)])]);

    provisioner(&fake)
        .provision(&tree, &ProjectDefaults::default())
        .await
        .unwrap();

    assert!(fake.state.lock().unwrap().created_users.is_empty());
    let g1 = fake.group_id("CS101/2024/g1").unwrap();
    assert_eq!(
        fake.member_level(MemberTarget::Group(g1), existing),
        Some(AccessLevel::Developer)
    );
}

#[tokio::test]
async fn test_remote_names_use_underscores() {
    let fake = Arc::new(FakePlatform::new());
    let tree = course(vec![group("Team A", vec![project("lab one", vec![])])]);

    provisioner(&fake)
        .provision(&tree, &ProjectDefaults::default())
        .await
        .unwrap();

    assert!(fake.group_id("CS101/2024/Team_A").is_some());
    assert!(fake.project_id("CS101/2024/Team_A/lab_one").is_some());
}

#[tokio::test]
async fn test_root_url_without_edition() {
    let fake = Arc::new(FakePlatform::new());
    let tree = Node::course("CS101", "Intro", vec![]);

    let url = provisioner(&fake)
        .provision(&tree, &ProjectDefaults::default())
        .await
        .unwrap();
    assert_eq!(url, format!("{WEB_URL}/CS101"));
}

// ---------------------------------------------------------------------------
// Test: projects
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_project_members_and_push_rules() {
    let fake = Arc::new(FakePlatform::new());
    let tree = course(vec![group(
        "g1",
        vec![project("lab", vec![user("carol", SUBTYPE_STUDENT)])],
    )]);
    let defaults = ProjectDefaults {
        import_kind: ImportKind::Url,
        import_url: Some("https://example.org/template.git".into()),
        ..ProjectDefaults::default()
    };

    provisioner(&fake).provision(&tree, &defaults).await.unwrap();

    let lab = fake.project_id("CS101/2024/g1/lab").unwrap();
    let carol = fake.user_id("carol").unwrap();
    assert_eq!(
        fake.member_level(MemberTarget::Project(lab), carol),
        Some(AccessLevel::Developer)
    );

    let state = fake.state.lock().unwrap();
    assert_eq!(state.push_rules, [lab]);
    assert_eq!(
        state.project_sources,
        [ProjectSource::Url("https://example.org/template.git".into())]
    );
}

#[tokio::test]
async fn test_push_rule_failure_is_not_fatal() {
    let fake = Arc::new(FakePlatform::new().without_push_rules());
    let tree = course(vec![project("lab", vec![])]);

    let result = provisioner(&fake)
        .provision(&tree, &ProjectDefaults::default())
        .await;

    assert!(result.is_ok());
    assert!(fake.project_id("CS101/2024/lab").is_some());
}

#[tokio::test]
async fn test_project_create_conflict_resolves_to_existing() {
    let fake = Arc::new(FakePlatform::new());
    let tree = course(vec![group("g1", vec![project("lab", vec![])])]);
    let provisioner = provisioner(&fake);
    let defaults = ProjectDefaults::default();

    provisioner.provision(&tree, &defaults).await.unwrap();
    let lab = fake.project_id("CS101/2024/g1/lab").unwrap();

    // The lookup misses a project that already exists, so creation conflicts.
    fake.set_stale_project_lookups(1);
    provisioner.provision(&tree, &defaults).await.unwrap();

    let state = fake.state.lock().unwrap();
    assert_eq!(state.stale_project_lookups, 0);
    assert_eq!(state.created_projects, ["CS101/2024/g1/lab"]);
    assert_eq!(state.push_rules, [lab]);
}

#[tokio::test]
async fn test_archive_defaults_upload_file_contents() {
    let dir = std::env::temp_dir().join(format!("quicklab-archive-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let archive = dir.join("template.tar.gz");
    std::fs::write(&archive, b"archive-bytes").unwrap();

    let fake = Arc::new(FakePlatform::new());
    let tree = course(vec![project("lab", vec![])]);
    let defaults = ProjectDefaults {
        import_kind: ImportKind::Archive,
        import_url: Some(archive.to_string_lossy().into_owned()),
        ..ProjectDefaults::default()
    };

    provisioner(&fake).provision(&tree, &defaults).await.unwrap();

    let state = fake.state.lock().unwrap();
    assert_matches!(
        &state.project_sources[..],
        [ProjectSource::Archive { file_name, data }]
            if file_name == "template.tar.gz" && &data[..] == b"archive-bytes"
    );
    drop(state);
    std::fs::remove_dir_all(&dir).unwrap();
}

// ---------------------------------------------------------------------------
// Test: failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let fake = Arc::new(FakePlatform::new().with_transient_failures(2));
    let tree = course(vec![group("g1", vec![])]);

    provisioner(&fake)
        .provision(&tree, &ProjectDefaults::default())
        .await
        .unwrap();

    assert!(fake.group_id("CS101/2024/g1").is_some());
}

#[tokio::test]
async fn test_persistent_outage_exhausts_retries() {
    let fake = Arc::new(FakePlatform::new().always_unavailable());
    let tree = course(vec![]);

    let err = provisioner(&fake)
        .provision(&tree, &ProjectDefaults::default())
        .await
        .unwrap_err();

    assert_matches!(
        err,
        ProvisionError::RetriesExhausted { ref resource, attempts: 3 } if resource == "group CS101"
    );
}

#[tokio::test]
async fn test_permanent_failure_aborts_subtree() {
    let fake = Arc::new(FakePlatform::new().deny("CS101/2024/g2"));
    let tree = course(vec![
        group("g1", vec![]),
        group("g2", vec![group("inner", vec![]), user("dave", SUBTYPE_STUDENT)]),
    ]);

    let err = provisioner(&fake)
        .provision(&tree, &ProjectDefaults::default())
        .await
        .unwrap_err();

    assert_matches!(
        err,
        ProvisionError::Platform {
            ref resource,
            source: PlatformError::PermissionDenied { status: 403, .. },
        } if resource == "group CS101/2024/g2"
    );
    assert!(fake.group_id("CS101/2024/g2/inner").is_none());
    assert!(fake.user_id("dave").is_none());
}

#[tokio::test]
async fn test_fork_defaults_are_refused_before_any_call() {
    let fake = Arc::new(FakePlatform::new());
    let defaults = ProjectDefaults {
        import_kind: ImportKind::Fork,
        import_url: Some("https://example.org/upstream.git".into()),
        ..ProjectDefaults::default()
    };

    let err = provisioner(&fake)
        .provision(&course(vec![]), &defaults)
        .await
        .unwrap_err();

    assert_matches!(err, ProvisionError::Invalid(_));
    assert_eq!(fake.counts(), (0, 0, 0, 0));
}

#[tokio::test]
async fn test_user_root_is_invalid() {
    let fake = Arc::new(FakePlatform::new());
    let err = provisioner(&fake)
        .provision(&user("alice", SUBTYPE_STUDENT), &ProjectDefaults::default())
        .await
        .unwrap_err();
    assert_matches!(err, ProvisionError::Invalid(_));
}
