// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pipeline-domain integration with the authorization subsystem
//!
//! A pipeline's authorization record names the user on whose behalf the
//! pipeline runs.  This crate supplies the pipeline side of the handover
//! protocol: the eligibility rule (the receiver must be allowed to execute
//! the pipeline) and the authority rule for single-resource requests (the
//! operator must hold manage on that pipeline).

pub mod authorization;

use conveyor_auth::context::OpContext;
use conveyor_common::api::external::Error;
use conveyor_common::api::external::Permission;

/// Permission checks answered by the pipeline domain
///
/// Backed by the platform's IAM in a full deployment; the test suite
/// substitutes a fake.
#[async_trait::async_trait]
pub trait PipelinePermissions: Send + Sync {
    /// Returns whether `user` holds `permission` on the given pipeline
    async fn check_pipeline_permission(
        &self,
        opctx: &OpContext,
        user: &str,
        project_code: &str,
        pipeline_id: &str,
        permission: Permission,
    ) -> Result<bool, Error>;

    /// Like [`check_pipeline_permission`](Self::check_pipeline_permission),
    /// but fails with [`Error::Forbidden`] when the permission is missing
    async fn validate_pipeline_permission(
        &self,
        opctx: &OpContext,
        user: &str,
        project_code: &str,
        pipeline_id: &str,
        permission: Permission,
    ) -> Result<(), Error>;
}
