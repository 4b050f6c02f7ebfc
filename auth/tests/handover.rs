// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Behavior tests for the handover coordinator
//!
//! These run the real coordinator against the in-memory store, a fake
//! project-management service, and a fake resource adapter that records
//! every call it receives.

use assert_matches::assert_matches;
use chrono::TimeZone;
use chrono::Utc;
use conveyor_auth::authz::AuthorizationCoordinator;
use conveyor_auth::authz::HandoverAdapter;
use conveyor_auth::authz::HandoverCandidate;
use conveyor_auth::authz::HandoverChannel;
use conveyor_auth::authz::HandoverCondition;
use conveyor_auth::authz::HandoverResult;
use conveyor_auth::authz::HandoverStatus;
use conveyor_auth::authz::ResourceAuthorization;
use conveyor_auth::config::AuthConfig;
use conveyor_auth::context::OpContext;
use conveyor_auth::project::ProjectAccess;
use conveyor_auth::storage::AuthorizationFilter;
use conveyor_auth::storage::InMemoryStorage;
use conveyor_auth::storage::Storage;
use conveyor_common::api::external::Error;
use conveyor_common::api::external::Page;
use conveyor_common::api::external::PageParams;
use conveyor_common::api::external::ResourceType;
use conveyor_test_utils::dev::test_setup_log;
use std::collections::BTreeSet;
use std::num::NonZeroU32;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

/// Storage wrapper that counts writes so tests can assert "the store was
/// never touched"
struct RecordingStorage {
    inner: InMemoryStorage,
    batch_updates: AtomicUsize,
}

impl RecordingStorage {
    fn new() -> RecordingStorage {
        RecordingStorage {
            inner: InMemoryStorage::new(),
            batch_updates: AtomicUsize::new(0),
        }
    }

    fn batch_update_count(&self) -> usize {
        self.batch_updates.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Storage for RecordingStorage {
    async fn authorization_get(
        &self,
        opctx: &OpContext,
        project_code: &str,
        resource_type: ResourceType,
        resource_code: &str,
    ) -> Result<ResourceAuthorization, Error> {
        self.inner
            .authorization_get(opctx, project_code, resource_type, resource_code)
            .await
    }

    async fn authorization_list(
        &self,
        opctx: &OpContext,
        filter: &AuthorizationFilter,
        pagparams: &PageParams,
    ) -> Result<Page<ResourceAuthorization>, Error> {
        self.inner.authorization_list(opctx, filter, pagparams).await
    }

    async fn authorization_batch_add_or_update(
        &self,
        opctx: &OpContext,
        records: Vec<ResourceAuthorization>,
    ) -> Result<(), Error> {
        self.inner.authorization_batch_add_or_update(opctx, records).await
    }

    async fn authorization_batch_update(
        &self,
        opctx: &OpContext,
        project_code: &str,
        handovers: &[HandoverCandidate],
    ) -> Result<(), Error> {
        self.batch_updates.fetch_add(1, Ordering::SeqCst);
        self.inner
            .authorization_batch_update(opctx, project_code, handovers)
            .await
    }

    async fn authorization_delete(
        &self,
        opctx: &OpContext,
        project_code: &str,
        resource_type: ResourceType,
        resource_code: &str,
    ) -> Result<(), Error> {
        self.inner
            .authorization_delete(
                opctx,
                project_code,
                resource_type,
                resource_code,
            )
            .await
    }
}

struct FixedManagers {
    managers: BTreeSet<&'static str>,
}

#[async_trait::async_trait]
impl ProjectAccess for FixedManagers {
    async fn check_project_manager(
        &self,
        _opctx: &OpContext,
        user: &str,
        _project_code: &str,
    ) -> Result<bool, Error> {
        Ok(self.managers.contains(user))
    }
}

/// Adapter that records every call and decides outcomes from fixed sets
struct FakeAdapter {
    /// resource codes whose receiver is eligible
    eligible: BTreeSet<&'static str>,
    /// resource codes whose callbacks fail operationally
    broken: BTreeSet<&'static str>,
    /// whether single-resource validation passes
    operator_allowed: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeAdapter {
    fn new(eligible: &[&'static str]) -> FakeAdapter {
        FakeAdapter {
            eligible: eligible.iter().copied().collect(),
            broken: BTreeSet::new(),
            operator_allowed: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn handover(&self, candidate: &HandoverCandidate) -> Result<HandoverResult, Error> {
        let code = candidate.authorization.resource_code.as_str();
        if self.broken.contains(code) {
            return Err(Error::unavail("IAM backend timed out"));
        }
        if self.eligible.contains(code) {
            Ok(HandoverResult::success())
        } else {
            Ok(HandoverResult::failed(format!(
                "user {} is not eligible to receive {}",
                candidate.handover_to, code,
            )))
        }
    }
}

#[async_trait::async_trait]
impl HandoverAdapter for FakeAdapter {
    fn resource_type(&self) -> ResourceType {
        ResourceType::Pipeline
    }

    async fn validate_single_resource_permission(
        &self,
        _opctx: &OpContext,
        operator: &str,
        _project_code: &str,
        resource_code: &str,
    ) -> Result<(), Error> {
        self.calls.lock().unwrap().push(format!("validate:{}", resource_code));
        if self.operator_allowed {
            Ok(())
        } else {
            Err(Error::forbidden(&format!(
                "user {} may not manage {}",
                operator, resource_code,
            )))
        }
    }

    async fn check_eligibility(
        &self,
        _opctx: &OpContext,
        candidate: &HandoverCandidate,
    ) -> Result<HandoverResult, Error> {
        self.calls.lock().unwrap().push(format!(
            "check:{}",
            candidate.authorization.resource_code
        ));
        self.handover(candidate)
    }

    async fn commit_handover(
        &self,
        _opctx: &OpContext,
        candidate: &HandoverCandidate,
    ) -> Result<HandoverResult, Error> {
        self.calls.lock().unwrap().push(format!(
            "commit:{}",
            candidate.authorization.resource_code
        ));
        self.handover(candidate)
    }
}

fn pipeline_record(code: &str, owner: &str) -> ResourceAuthorization {
    ResourceAuthorization {
        project_code: String::from("proj1"),
        resource_type: ResourceType::Pipeline,
        resource_code: code.to_owned(),
        resource_name: format!("pipeline {}", code),
        handover_from: owner.to_owned(),
        handover_time: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
    }
}

fn manager_condition(handover_to: &str) -> HandoverCondition {
    HandoverCondition {
        project_code: String::from("proj1"),
        channel: HandoverChannel::Manager,
        handover_to: handover_to.to_owned(),
        full_selection: true,
        authorizations: Vec::new(),
        pre_check: false,
        resource_type: ResourceType::Pipeline,
        resource_name: None,
        handover_from: None,
    }
}

fn resource_condition(
    authorization: ResourceAuthorization,
    handover_to: &str,
) -> HandoverCondition {
    HandoverCondition {
        project_code: String::from("proj1"),
        channel: HandoverChannel::Resource,
        handover_to: handover_to.to_owned(),
        full_selection: false,
        authorizations: vec![authorization],
        pre_check: false,
        resource_type: ResourceType::Pipeline,
        resource_name: None,
        handover_from: None,
    }
}

struct TestContext {
    opctx: OpContext,
    storage: Arc<RecordingStorage>,
    coordinator: AuthorizationCoordinator,
}

async fn test_context(
    log: &slog::Logger,
    records: Vec<ResourceAuthorization>,
) -> TestContext {
    let opctx = OpContext::for_tests(log.clone());
    let storage = Arc::new(RecordingStorage::new());
    storage
        .authorization_batch_add_or_update(&opctx, records)
        .await
        .unwrap();
    let coordinator = AuthorizationCoordinator::new(
        Arc::clone(&storage) as Arc<dyn Storage>,
        Arc::new(FixedManagers { managers: ["admin"].into_iter().collect() }),
        AuthConfig {
            // Scan with a tiny batch so multi-page resolution gets covered.
            scan_batch_size: NonZeroU32::new(1).unwrap(),
            ..AuthConfig::default()
        },
    );
    TestContext { opctx, storage, coordinator }
}

async fn owner_of(context: &TestContext, code: &str) -> String {
    context
        .storage
        .authorization_get(
            &context.opctx,
            "proj1",
            ResourceType::Pipeline,
            code,
        )
        .await
        .unwrap()
        .handover_from
}

// Bulk handover from the management console where the receiver is eligible
// for only one of two pipelines: the eligible one transfers, the other is
// reported, and nothing is lost.
#[tokio::test]
async fn test_manager_full_selection_partial_success() {
    let logctx = test_setup_log("test_manager_full_selection_partial_success");
    let context = test_context(
        &logctx.log,
        vec![pipeline_record("p-1", "alice"), pipeline_record("p-2", "alice")],
    )
    .await;
    let adapter = FakeAdapter::new(&["p-1"]);

    let outcome = context
        .coordinator
        .reset_resource_authorization(
            &context.opctx,
            "admin",
            "proj1",
            &manager_condition("bob"),
            &adapter,
        )
        .await
        .unwrap();

    let successes = &outcome[&HandoverStatus::Success];
    let failures = &outcome[&HandoverStatus::Failed];
    assert_eq!(successes.len(), 1);
    assert_eq!(successes[0].authorization.resource_code, "p-1");
    assert_eq!(successes[0].failed_message, None);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].authorization.resource_code, "p-2");
    assert!(failures[0].failed_message.as_ref().unwrap().contains("bob"));

    assert_eq!(owner_of(&context, "p-1").await, "bob");
    assert_eq!(owner_of(&context, "p-2").await, "alice");
    assert_eq!(context.storage.batch_update_count(), 1);
    // Full selection went through the commit path for both candidates.
    assert_eq!(adapter.calls(), vec!["commit:p-1", "commit:p-2"]);

    logctx.cleanup_successful();
}

// Same request as above with pre_check set: identical per-candidate
// outcomes, but the store is never written.
#[tokio::test]
async fn test_precheck_reports_without_writing() {
    let logctx = test_setup_log("test_precheck_reports_without_writing");
    let context = test_context(
        &logctx.log,
        vec![pipeline_record("p-1", "alice"), pipeline_record("p-2", "alice")],
    )
    .await;
    let adapter = FakeAdapter::new(&["p-1"]);

    let condition =
        HandoverCondition { pre_check: true, ..manager_condition("bob") };
    let outcome = context
        .coordinator
        .reset_resource_authorization(
            &context.opctx,
            "admin",
            "proj1",
            &condition,
            &adapter,
        )
        .await
        .unwrap();

    assert_eq!(outcome[&HandoverStatus::Success].len(), 1);
    assert_eq!(outcome[&HandoverStatus::Failed].len(), 1);
    assert_eq!(owner_of(&context, "p-1").await, "alice");
    assert_eq!(owner_of(&context, "p-2").await, "alice");
    assert_eq!(context.storage.batch_update_count(), 0);
    // Precheck runs the read-only eligibility path.
    assert_eq!(adapter.calls(), vec!["check:p-1", "check:p-2"]);

    logctx.cleanup_successful();
}

#[tokio::test]
async fn test_manager_channel_requires_project_manager() {
    let logctx =
        test_setup_log("test_manager_channel_requires_project_manager");
    let context =
        test_context(&logctx.log, vec![pipeline_record("p-1", "alice")]).await;
    let adapter = FakeAdapter::new(&["p-1"]);

    let error = context
        .coordinator
        .reset_resource_authorization(
            &context.opctx,
            "mallory",
            "proj1",
            &manager_condition("bob"),
            &adapter,
        )
        .await
        .unwrap_err();

    assert_matches!(error, Error::Forbidden { .. });
    assert!(adapter.calls().is_empty());
    assert_eq!(owner_of(&context, "p-1").await, "alice");
    assert_eq!(context.storage.batch_update_count(), 0);

    logctx.cleanup_successful();
}

// Resource-channel requests check the operator against the one named
// resource before any handover callback runs.
#[tokio::test]
async fn test_resource_channel_validates_operator_first() {
    let logctx =
        test_setup_log("test_resource_channel_validates_operator_first");
    let context =
        test_context(&logctx.log, vec![pipeline_record("p-1", "alice")]).await;
    let adapter = FakeAdapter::new(&["p-1"]);

    let outcome = context
        .coordinator
        .reset_resource_authorization(
            &context.opctx,
            // Not a project manager; the resource channel doesn't care.
            "alice",
            "proj1",
            &resource_condition(pipeline_record("p-1", "alice"), "bob"),
            &adapter,
        )
        .await
        .unwrap();

    assert_eq!(outcome[&HandoverStatus::Success].len(), 1);
    assert_eq!(outcome[&HandoverStatus::Failed].len(), 0);
    assert_eq!(adapter.calls(), vec!["validate:p-1", "commit:p-1"]);
    assert_eq!(owner_of(&context, "p-1").await, "bob");

    logctx.cleanup_successful();
}

// A rejected operator aborts the whole request before any candidate is
// processed.
#[tokio::test]
async fn test_resource_channel_forbidden_operator_aborts() {
    let logctx =
        test_setup_log("test_resource_channel_forbidden_operator_aborts");
    let context =
        test_context(&logctx.log, vec![pipeline_record("p-1", "alice")]).await;
    let mut adapter = FakeAdapter::new(&["p-1"]);
    adapter.operator_allowed = false;

    let error = context
        .coordinator
        .reset_resource_authorization(
            &context.opctx,
            "mallory",
            "proj1",
            &resource_condition(pipeline_record("p-1", "alice"), "bob"),
            &adapter,
        )
        .await
        .unwrap_err();

    assert_matches!(error, Error::Forbidden { .. });
    assert_eq!(adapter.calls(), vec!["validate:p-1"]);
    assert_eq!(owner_of(&context, "p-1").await, "alice");
    assert_eq!(context.storage.batch_update_count(), 0);

    logctx.cleanup_successful();
}

#[tokio::test]
async fn test_resource_channel_requires_exactly_one_record() {
    let logctx =
        test_setup_log("test_resource_channel_requires_exactly_one_record");
    let context =
        test_context(&logctx.log, vec![pipeline_record("p-1", "alice")]).await;
    let adapter = FakeAdapter::new(&["p-1"]);

    let mut condition =
        resource_condition(pipeline_record("p-1", "alice"), "bob");
    condition.authorizations.push(pipeline_record("p-2", "alice"));
    let error = context
        .coordinator
        .reset_resource_authorization(
            &context.opctx,
            "alice",
            "proj1",
            &condition,
            &adapter,
        )
        .await
        .unwrap_err();

    assert_matches!(error, Error::InvalidRequest { .. });
    assert!(adapter.calls().is_empty());

    logctx.cleanup_successful();
}

// One candidate's callback failing operationally must not abort the batch:
// every candidate still comes back in exactly one bucket.
#[tokio::test]
async fn test_candidate_failure_is_isolated() {
    let logctx = test_setup_log("test_candidate_failure_is_isolated");
    let context = test_context(
        &logctx.log,
        vec![
            pipeline_record("p-1", "alice"),
            pipeline_record("p-2", "alice"),
            pipeline_record("p-3", "alice"),
        ],
    )
    .await;
    let mut adapter = FakeAdapter::new(&["p-1", "p-3"]);
    adapter.broken = ["p-2"].into_iter().collect();

    let outcome = context
        .coordinator
        .reset_resource_authorization(
            &context.opctx,
            "admin",
            "proj1",
            &manager_condition("bob"),
            &adapter,
        )
        .await
        .unwrap();

    let successes = &outcome[&HandoverStatus::Success];
    let failures = &outcome[&HandoverStatus::Failed];
    assert_eq!(successes.len() + failures.len(), 3);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].authorization.resource_code, "p-2");
    // The operational error's text is preserved for the caller.
    assert!(failures[0]
        .failed_message
        .as_ref()
        .unwrap()
        .contains("IAM backend timed out"));

    assert_eq!(owner_of(&context, "p-1").await, "bob");
    assert_eq!(owner_of(&context, "p-2").await, "alice");
    assert_eq!(owner_of(&context, "p-3").await, "bob");

    logctx.cleanup_successful();
}

// Handing a record over a second time transfers from the new owner rather
// than failing.
#[tokio::test]
async fn test_repeat_handover_is_idempotent() {
    let logctx = test_setup_log("test_repeat_handover_is_idempotent");
    let context =
        test_context(&logctx.log, vec![pipeline_record("p-1", "alice")]).await;
    let adapter = FakeAdapter::new(&["p-1"]);

    for _ in 0..2 {
        let outcome = context
            .coordinator
            .reset_resource_authorization(
                &context.opctx,
                "admin",
                "proj1",
                &manager_condition("bob"),
                &adapter,
            )
            .await
            .unwrap();
        assert_eq!(outcome[&HandoverStatus::Success].len(), 1);
        assert_eq!(outcome[&HandoverStatus::Failed].len(), 0);
        assert_eq!(owner_of(&context, "p-1").await, "bob");
    }

    logctx.cleanup_successful();
}

// The name filter narrows a full-selection handover to matching records.
#[tokio::test]
async fn test_full_selection_honors_name_filter() {
    let logctx = test_setup_log("test_full_selection_honors_name_filter");
    let mut records = vec![
        pipeline_record("p-1", "alice"),
        pipeline_record("p-2", "alice"),
    ];
    records[0].resource_name = String::from("nightly deploy");
    let context = test_context(&logctx.log, records).await;
    let adapter = FakeAdapter::new(&["p-1", "p-2"]);

    let condition = HandoverCondition {
        resource_name: Some(String::from("nightly")),
        ..manager_condition("bob")
    };
    let outcome = context
        .coordinator
        .reset_resource_authorization(
            &context.opctx,
            "admin",
            "proj1",
            &condition,
            &adapter,
        )
        .await
        .unwrap();

    assert_eq!(outcome[&HandoverStatus::Success].len(), 1);
    assert_eq!(owner_of(&context, "p-1").await, "bob");
    assert_eq!(owner_of(&context, "p-2").await, "alice");

    logctx.cleanup_successful();
}

#[tokio::test]
async fn test_listing_requires_project_manager() {
    let logctx = test_setup_log("test_listing_requires_project_manager");
    let context = test_context(
        &logctx.log,
        vec![pipeline_record("p-1", "alice"), pipeline_record("p-2", "alice")],
    )
    .await;

    let filter = AuthorizationFilter::for_project("proj1");
    let pagparams =
        PageParams { offset: 0, limit: NonZeroU32::new(10).unwrap() };

    let error = context
        .coordinator
        .list_resource_authorizations(
            &context.opctx,
            "mallory",
            &filter,
            &pagparams,
        )
        .await
        .unwrap_err();
    assert_matches!(error, Error::Forbidden { .. });

    let page = context
        .coordinator
        .list_resource_authorizations(
            &context.opctx,
            "admin",
            &filter,
            &pagparams,
        )
        .await
        .unwrap();
    assert_eq!(page.count, 2);
    assert_eq!(page.items.len(), 2);

    logctx.cleanup_successful();
}
