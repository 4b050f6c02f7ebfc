// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Generic algorithm for transferring resource authorizations between users
//!
//! See the module documentation in [`crate::authz`] for the big picture.

use super::HandoverAdapter;
use super::HandoverCandidate;
use super::HandoverChannel;
use super::HandoverCondition;
use super::HandoverResult;
use super::HandoverStatus;
use super::ResourceAuthorization;
use crate::config::AuthConfig;
use crate::context::OpContext;
use crate::project::ProjectAccess;
use crate::storage::AuthorizationFilter;
use crate::storage::Storage;
use conveyor_common::api::external::Error;
use conveyor_common::api::external::Page;
use conveyor_common::api::external::PageParams;
use conveyor_common::api::external::ResourceType;
use slog::info;
use slog::trace;
use slog::warn;
use slog_error_chain::InlineErrorChain;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Orchestrates handover requests and owns all access to the authorization
/// store
///
/// Resource domains each hold a reference to the one coordinator and call
/// it with their own [`HandoverAdapter`].  The coordinator is the only
/// writer to [`Storage`].
pub struct AuthorizationCoordinator {
    storage: Arc<dyn Storage>,
    projects: Arc<dyn ProjectAccess>,
    config: AuthConfig,
}

impl AuthorizationCoordinator {
    pub fn new(
        storage: Arc<dyn Storage>,
        projects: Arc<dyn ProjectAccess>,
        config: AuthConfig,
    ) -> AuthorizationCoordinator {
        AuthorizationCoordinator { storage, projects, config }
    }

    /// Transfer ownership of one or many resource authorizations to a new
    /// user
    ///
    /// Runs the handover protocol described in [`crate::authz`]: authority
    /// check, candidate resolution, per-candidate eligibility/commit via
    /// `adapter`, and batch persistence of the successful subset.  When
    /// `condition.pre_check` is set, candidates are validated but nothing
    /// is written anywhere.
    ///
    /// The returned map always contains both [`HandoverStatus::Success`]
    /// and [`HandoverStatus::Failed`] keys.  Failed candidates carry a
    /// `failed_message` saying why; successful candidates are returned as
    /// submitted (their record's new owner and timestamp are written by
    /// the persistence step, not reflected in the returned value).
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Forbidden`] when the operator lacks the
    /// authority the request's channel requires; no candidate is processed
    /// in that case.  A failure to persist the successful subset also
    /// propagates; domain-side changes for those candidates have already
    /// been applied, so callers should retry (re-running a handover is
    /// safe).  Individual candidates' failures never surface here -- they
    /// come back in the `Failed` bucket.
    pub async fn reset_resource_authorization(
        &self,
        opctx: &OpContext,
        operator: &str,
        project_code: &str,
        condition: &HandoverCondition,
        adapter: &dyn HandoverAdapter,
    ) -> Result<BTreeMap<HandoverStatus, Vec<HandoverCandidate>>, Error> {
        info!(opctx.log, "reset resource authorization";
            "operator" => operator,
            "project_code" => project_code,
            "resource_type" => %adapter.resource_type(),
            "channel" => ?condition.channel,
            "full_selection" => condition.full_selection,
            "pre_check" => condition.pre_check,
        );

        if operator.is_empty() {
            return Err(Error::invalid_request("operator must not be empty"));
        }
        if condition.handover_to.is_empty() {
            return Err(Error::invalid_request(
                "handover target must not be empty",
            ));
        }

        self.validate_operator_permission(
            opctx,
            operator,
            project_code,
            condition,
            adapter,
        )
        .await?;

        let candidates = self.resolve_candidates(opctx, condition).await?;

        let mut success_list = Vec::new();
        let mut failed_list = Vec::new();
        for candidate in candidates {
            let callback_result = if condition.pre_check {
                adapter.check_eligibility(opctx, &candidate).await
            } else {
                adapter.commit_handover(opctx, &candidate).await
            };
            let result = callback_result.unwrap_or_else(|error| {
                // A candidate's failure must never abort the batch; fold
                // the error into that candidate's result.
                warn!(opctx.log, "handover callback failed";
                    "resource_code" =>
                        candidate.authorization.resource_code.as_str(),
                    "error" => %InlineErrorChain::new(&error),
                );
                HandoverResult::failed(error.to_string())
            });
            match result.status {
                HandoverStatus::Success => success_list.push(candidate),
                HandoverStatus::Failed => {
                    let message = result
                        .message
                        .unwrap_or_else(|| String::from("handover failed"));
                    failed_list.push(candidate.with_failure(message));
                }
            }
        }

        if !success_list.is_empty() && !condition.pre_check {
            info!(opctx.log, "batch modify handover from";
                "project_code" => project_code,
                "handover_to" => condition.handover_to.as_str(),
                "count" => success_list.len(),
            );
            self.storage
                .authorization_batch_update(opctx, project_code, &success_list)
                .await?;
        }

        Ok(BTreeMap::from([
            (HandoverStatus::Success, success_list),
            (HandoverStatus::Failed, failed_list),
        ]))
    }

    /// Register resources under permission management
    ///
    /// Called by a resource domain when a resource is created (or
    /// re-registered after repair); replaces any existing record with the
    /// same key.
    pub async fn add_resource_authorizations(
        &self,
        opctx: &OpContext,
        records: Vec<ResourceAuthorization>,
    ) -> Result<(), Error> {
        info!(opctx.log, "add resource authorizations";
            "count" => records.len(),
        );
        self.storage.authorization_batch_add_or_update(opctx, records).await
    }

    /// Fetch the authorization record for one resource
    pub async fn get_resource_authorization(
        &self,
        opctx: &OpContext,
        project_code: &str,
        resource_type: ResourceType,
        resource_code: &str,
    ) -> Result<ResourceAuthorization, Error> {
        self.storage
            .authorization_get(opctx, project_code, resource_type, resource_code)
            .await
    }

    /// List authorization records for a project's management console
    ///
    /// Only project managers may enumerate a project's records, so this
    /// checks `operator` before touching the store.  The requested page
    /// size is clamped to the configured maximum.
    pub async fn list_resource_authorizations(
        &self,
        opctx: &OpContext,
        operator: &str,
        filter: &AuthorizationFilter,
        pagparams: &PageParams,
    ) -> Result<Page<ResourceAuthorization>, Error> {
        self.verify_project_manager(opctx, operator, &filter.project_code)
            .await?;
        let pagparams = PageParams {
            offset: pagparams.offset,
            limit: pagparams.limit.min(self.config.max_page_size),
        };
        self.storage.authorization_list(opctx, filter, &pagparams).await
    }

    /// Rewrite the owner of the given records directly
    ///
    /// This is the escape hatch used by domain surfaces after an
    /// out-of-band migration has already moved the underlying grants; it
    /// skips eligibility checks entirely.
    pub async fn batch_modify_handover_from(
        &self,
        opctx: &OpContext,
        project_code: &str,
        handovers: &[HandoverCandidate],
    ) -> Result<(), Error> {
        info!(opctx.log, "batch modify handover from";
            "project_code" => project_code,
            "count" => handovers.len(),
        );
        self.storage
            .authorization_batch_update(opctx, project_code, handovers)
            .await
    }

    /// Remove the record for a resource that is being deleted
    pub async fn delete_resource_authorization(
        &self,
        opctx: &OpContext,
        project_code: &str,
        resource_type: ResourceType,
        resource_code: &str,
    ) -> Result<(), Error> {
        info!(opctx.log, "delete resource authorization";
            "project_code" => project_code,
            "resource_type" => %resource_type,
            "resource_code" => resource_code,
        );
        self.storage
            .authorization_delete(
                opctx,
                project_code,
                resource_type,
                resource_code,
            )
            .await
    }

    /// Check the operator's authority to make this request at all
    ///
    /// Manager-channel requests need project-manage on the whole project.
    /// Resource-channel requests defer to the adapter, which checks the
    /// domain-appropriate right on the single named resource.
    async fn validate_operator_permission(
        &self,
        opctx: &OpContext,
        operator: &str,
        project_code: &str,
        condition: &HandoverCondition,
        adapter: &dyn HandoverAdapter,
    ) -> Result<(), Error> {
        match condition.channel {
            HandoverChannel::Manager => {
                let is_manager = self
                    .projects
                    .check_project_manager(opctx, operator, project_code)
                    .await?;
                if !is_manager {
                    return Err(Error::forbidden(
                        "handing over authorizations from the management \
                         console requires project-manage permission",
                    ));
                }
                Ok(())
            }
            HandoverChannel::Resource => {
                let authorization = condition.single_authorization()?;
                adapter
                    .validate_single_resource_permission(
                        opctx,
                        operator,
                        project_code,
                        &authorization.resource_code,
                    )
                    .await
            }
        }
    }

    /// Determine which records the request applies to
    async fn resolve_candidates(
        &self,
        opctx: &OpContext,
        condition: &HandoverCondition,
    ) -> Result<Vec<HandoverCandidate>, Error> {
        let authorizations = if condition.full_selection {
            let filter = AuthorizationFilter {
                project_code: condition.project_code.clone(),
                resource_type: Some(condition.resource_type),
                resource_name: condition.resource_name.clone(),
                handover_from: condition.handover_from.clone(),
            };
            let limit = self.config.scan_batch_size;
            let mut offset = 0;
            let mut authorizations = Vec::new();
            loop {
                let page = self
                    .storage
                    .authorization_list(
                        opctx,
                        &filter,
                        &PageParams { offset, limit },
                    )
                    .await?;
                let fetched = page.items.len();
                authorizations.extend(page.items);
                if fetched < limit.get() as usize {
                    break;
                }
                offset += limit.get();
            }
            authorizations
        } else {
            condition.authorizations.clone()
        };

        trace!(opctx.log, "resolved handover candidates";
            "count" => authorizations.len(),
        );
        Ok(authorizations
            .into_iter()
            .map(|authorization| {
                HandoverCandidate::new(
                    authorization,
                    condition.handover_to.clone(),
                )
            })
            .collect())
    }

    async fn verify_project_manager(
        &self,
        opctx: &OpContext,
        operator: &str,
        project_code: &str,
    ) -> Result<(), Error> {
        let is_manager = self
            .projects
            .check_project_manager(opctx, operator, project_code)
            .await?;
        if !is_manager {
            return Err(Error::forbidden(
                "listing a project's authorizations requires project-manage \
                 permission",
            ));
        }
        Ok(())
    }
}
