// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interface a resource kind implements to take part in handovers

use super::HandoverCandidate;
use super::HandoverResult;
use crate::context::OpContext;
use conveyor_common::api::external::Error;
use conveyor_common::api::external::ResourceType;

/// Domain-side hooks for handing over one kind of resource
///
/// The coordinator is generic across resource kinds; everything that
/// depends on a kind's own data model comes in through this interface.
/// Implementations live with their domain (see `conveyor-pipeline` and
/// friends) and typically wrap that domain's permission service.
///
/// Contract notes that apply to every implementation:
///
/// - [`check_eligibility`](Self::check_eligibility) must not mutate
///   anything; it is what a precheck (dry-run) request runs.
/// - [`commit_handover`](Self::commit_handover) performs the same
///   eligibility check and, on success, applies whatever domain-side
///   ownership change the kind requires before reporting success.
/// - An ineligible receiver is a *result* (`HandoverResult::failed`), not
///   an `Err`.  `Err` is for the operational failures of the checks
///   themselves (a remote call failed, a record was missing); the
///   coordinator folds those into the candidate's failure too, so a bad
///   candidate never aborts its batch.
#[async_trait::async_trait]
pub trait HandoverAdapter: Send + Sync {
    /// The resource kind this adapter manages
    fn resource_type(&self) -> ResourceType;

    /// Verify that `operator` may initiate a handover of this one resource
    /// from the resource's own management surface
    ///
    /// Only [`HandoverChannel::Resource`](super::HandoverChannel::Resource)
    /// requests use this; an error here aborts the whole request before any
    /// candidate is processed.
    async fn validate_single_resource_permission(
        &self,
        opctx: &OpContext,
        operator: &str,
        project_code: &str,
        resource_code: &str,
    ) -> Result<(), Error>;

    /// Check whether the candidate's receiver is eligible for the grant,
    /// without changing anything
    async fn check_eligibility(
        &self,
        opctx: &OpContext,
        candidate: &HandoverCandidate,
    ) -> Result<HandoverResult, Error>;

    /// Check eligibility and, on success, apply the domain-side ownership
    /// change
    async fn commit_handover(
        &self,
        opctx: &OpContext,
        candidate: &HandoverCandidate,
    ) -> Result<HandoverResult, Error>;
}
