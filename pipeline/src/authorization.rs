// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Handover of pipeline authorizations

use crate::PipelinePermissions;
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

/// Pipeline-facing surface of the handover protocol
pub struct PipelineAuthorizationService {
    coordinator: Arc<AuthorizationCoordinator>,
    permissions: Arc<dyn PipelinePermissions>,
}

impl PipelineAuthorizationService {
    pub fn new(
        coordinator: Arc<AuthorizationCoordinator>,
        permissions: Arc<dyn PipelinePermissions>,
    ) -> PipelineAuthorizationService {
        PipelineAuthorizationService { coordinator, permissions }
    }

    /// Register newly created pipelines under permission management
    pub async fn add_resource_authorizations(
        &self,
        opctx: &OpContext,
        records: Vec<ResourceAuthorization>,
    ) -> Result<(), Error> {
        self.coordinator.add_resource_authorizations(opctx, records).await
    }

    /// Transfer pipeline authorizations as described by `condition`
    pub async fn reset_pipeline_authorization(
        &self,
        opctx: &OpContext,
        operator: &str,
        project_code: &str,
        condition: &HandoverCondition,
    ) -> Result<BTreeMap<HandoverStatus, Vec<HandoverCandidate>>, Error> {
        info!(opctx.log, "reset pipeline authorization";
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
}

#[async_trait::async_trait]
impl HandoverAdapter for PipelineAuthorizationService {
    fn resource_type(&self) -> ResourceType {
        ResourceType::Pipeline
    }

    async fn validate_single_resource_permission(
        &self,
        opctx: &OpContext,
        operator: &str,
        project_code: &str,
        resource_code: &str,
    ) -> Result<(), Error> {
        self.permissions
            .validate_pipeline_permission(
                opctx,
                operator,
                project_code,
                resource_code,
                Permission::Manage,
            )
            .await
    }

    async fn check_eligibility(
        &self,
        opctx: &OpContext,
        candidate: &HandoverCandidate,
    ) -> Result<HandoverResult, Error> {
        let eligible = self
            .permissions
            .check_pipeline_permission(
                opctx,
                &candidate.handover_to,
                &candidate.authorization.project_code,
                &candidate.authorization.resource_code,
                Permission::Execute,
            )
            .await?;
        if eligible {
            Ok(HandoverResult::success())
        } else {
            Ok(HandoverResult::failed(format!(
                "user {} needs {} permission on pipeline {}",
                candidate.handover_to,
                Permission::Execute,
                candidate.authorization.resource_code,
            )))
        }
    }

    async fn commit_handover(
        &self,
        opctx: &OpContext,
        candidate: &HandoverCandidate,
    ) -> Result<HandoverResult, Error> {
        // A pipeline's backing identity lives only in the authorization
        // record, so there is no domain-side mutation beyond the record
        // update the coordinator performs.
        self.check_eligibility(opctx, candidate).await
    }
}
