// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn create_records_the_call_and_returns_a_ready_container() {
    let fake = FakeContainerCollaborator::new();
    let container = fake
        .create(CreateContainerRequest {
            name: "sandbox-a".into(),
            source: String::new(),
            environment: HashMap::new(),
        })
        .await
        .expect("create");
    assert_eq!(container.status, ContainerStatus::Ready);
    assert_eq!(
        fake.calls(),
        vec![ContainerCall::Create {
            name: "sandbox-a".into()
        }]
    );
}

#[tokio::test]
async fn forced_create_failure_is_surfaced() {
    let fake = FakeContainerCollaborator::new();
    fake.set_fail_create(true);
    assert!(fake.create(CreateContainerRequest::default()).await.is_err());
}

#[tokio::test]
async fn forced_destroy_failure_leaves_container_tracked() {
    let fake = FakeContainerCollaborator::new();
    let container = fake
        .create(CreateContainerRequest::default())
        .await
        .expect("create");
    fake.set_fail_destroy(true);
    assert!(fake.destroy(container.id.as_str()).await.is_err());
    assert!(fake.tracked_ids().contains(&container.id.as_str().to_string()));
}

#[tokio::test]
async fn destroy_of_unknown_container_is_not_found() {
    let fake = FakeContainerCollaborator::new();
    assert!(matches!(
        fake.destroy("nope").await,
        Err(CollaboratorError::NotFound(_))
    ));
}
