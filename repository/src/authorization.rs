// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Handover of repository authorizations

use crate::RepositoryDirectory;
use crate::RepositoryPermissions;
use crate::RepositoryUsers;
use crate::ScmTokenStore;
use crate::ScmType;
use conveyor_auth::authz::AuthorizationCoordinator;
use conveyor_auth::authz::HandoverAdapter;
use conveyor_auth::authz::HandoverCandidate;
use conveyor_auth::authz::HandoverCondition;
use conveyor_auth::authz::HandoverResult;
use conveyor_auth::authz::HandoverStatus;
use conveyor_auth::authz::ResourceAuthorization;
use conveyor_auth::context::OpContext;
use conveyor_common::api::external::Error;
use conveyor_common::api::external::Permission;
use conveyor_common::api::external::ResourceType;
use slog::info;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Repository-facing surface of the handover protocol
pub struct RepositoryAuthorizationService {
    coordinator: Arc<AuthorizationCoordinator>,
    permissions: Arc<dyn RepositoryPermissions>,
    directory: Arc<dyn RepositoryDirectory>,
    tokens: Arc<dyn ScmTokenStore>,
    users: Arc<dyn RepositoryUsers>,
}

impl RepositoryAuthorizationService {
    pub fn new(
        coordinator: Arc<AuthorizationCoordinator>,
        permissions: Arc<dyn RepositoryPermissions>,
        directory: Arc<dyn RepositoryDirectory>,
        tokens: Arc<dyn ScmTokenStore>,
        users: Arc<dyn RepositoryUsers>,
    ) -> RepositoryAuthorizationService {
        RepositoryAuthorizationService {
            coordinator,
            permissions,
            directory,
            tokens,
            users,
        }
    }

    /// Register newly created repositories under permission management
    pub async fn add_resource_authorizations(
        &self,
        opctx: &OpContext,
        records: Vec<ResourceAuthorization>,
    ) -> Result<(), Error> {
        self.coordinator.add_resource_authorizations(opctx, records).await
    }

    /// Rewrite record owners directly after an out-of-band migration
    pub async fn batch_modify_handover_from(
        &self,
        opctx: &OpContext,
        project_code: &str,
        handovers: &[HandoverCandidate],
    ) -> Result<(), Error> {
        self.coordinator
            .batch_modify_handover_from(opctx, project_code, handovers)
            .await
    }

    /// Transfer repository authorizations as described by `condition`
    pub async fn reset_repository_authorization(
        &self,
        opctx: &OpContext,
        operator: &str,
        project_code: &str,
        condition: &HandoverCondition,
    ) -> Result<BTreeMap<HandoverStatus, Vec<HandoverCandidate>>, Error> {
        info!(opctx.log, "reset repository authorization";
            "operator" => operator,
            "project_code" => project_code,
        );
        self.coordinator
            .reset_resource_authorization(
                opctx,
                operator,
                project_code,
                condition,
                self,
            )
            .await
    }

    async fn validate_edit_permission(
        &self,
        opctx: &OpContext,
        user: &str,
        project_code: &str,
        repository_code: &str,
    ) -> Result<(), Error> {
        let allowed = self
            .permissions
            .check_repository_permission(
                opctx,
                user,
                project_code,
                repository_code,
                Permission::Edit,
            )
            .await?;
        if allowed {
            Ok(())
        } else {
            Err(Error::forbidden(&format!(
                "user {} needs {} permission on repository {}",
                user,
                Permission::Edit,
                repository_code,
            )))
        }
    }
}

#[async_trait::async_trait]
impl HandoverAdapter for RepositoryAuthorizationService {
    fn resource_type(&self) -> ResourceType {
        ResourceType::Repository
    }

    async fn validate_single_resource_permission(
        &self,
        opctx: &OpContext,
        operator: &str,
        project_code: &str,
        resource_code: &str,
    ) -> Result<(), Error> {
        self.validate_edit_permission(
            opctx,
            operator,
            project_code,
            resource_code,
        )
        .await
    }

    async fn check_eligibility(
        &self,
        opctx: &OpContext,
        candidate: &HandoverCandidate,
    ) -> Result<HandoverResult, Error> {
        let project_code = &candidate.authorization.project_code;
        let repository_code = &candidate.authorization.resource_code;

        // The receiver needs the same edit right the operator needed.  An
        // ineligible receiver is a per-candidate failure, not an error.
        match self
            .validate_edit_permission(
                opctx,
                &candidate.handover_to,
                project_code,
                repository_code,
            )
            .await
        {
            Ok(()) => (),
            Err(Error::Forbidden { message }) => {
                return Ok(HandoverResult::failed(message));
            }
            Err(error) => return Err(error),
        }

        // Only hosts we can mint OAuth tokens for are eligible, and the
        // receiver must already have completed the linkage.
        let scm_type = self
            .directory
            .scm_type(opctx, project_code, repository_code)
            .await?;
        let linked = match scm_type {
            ScmType::Github | ScmType::Git => {
                self.tokens
                    .has_access_token(opctx, &candidate.handover_to, scm_type)
                    .await?
            }
            _ => false,
        };
        if !linked {
            return Ok(HandoverResult::failed(format!(
                "user {} has no active OAuth authorization with the {} host \
                 backing repository {}",
                candidate.handover_to, scm_type, repository_code,
            )));
        }
        Ok(HandoverResult::success())
    }

    async fn commit_handover(
        &self,
        opctx: &OpContext,
        candidate: &HandoverCandidate,
    ) -> Result<HandoverResult, Error> {
        let result = self.check_eligibility(opctx, candidate).await?;
        if result.status == HandoverStatus::Success {
            self.users
                .update_repository_user(
                    opctx,
                    &candidate.authorization.project_code,
                    &candidate.authorization.resource_code,
                    &candidate.handover_to,
                )
                .await?;
        }
        Ok(result)
    }
}
