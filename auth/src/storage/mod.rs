// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interfaces for accessing the durable authorization store
//!
//! Authorization records for every resource kind live in one shared table,
//! keyed by `(project code, resource type, resource code)`.  The
//! [`AuthorizationCoordinator`](crate::authz::AuthorizationCoordinator) is
//! the only component that writes to it; resource domains never touch the
//! store directly.  Keeping all access behind this one interface keeps
//! persistence ordering and locking centralized.
//!
//! Deployments implement [`Storage`] against their database.  The
//! [`InMemoryStorage`] implementation backs the test suite and
//! single-process deployments.

mod in_memory;

pub use in_memory::InMemoryStorage;

use crate::authz::HandoverCandidate;
use crate::authz::ResourceAuthorization;
use crate::context::OpContext;
use conveyor_common::api::external::Error;
use conveyor_common::api::external::Page;
use conveyor_common::api::external::PageParams;
use conveyor_common::api::external::ResourceType;

/// Selects which authorization records a list operation returns
///
/// All fields other than `project_code` are optional; an empty filter
/// matches every record in the project.
#[derive(Clone, Debug)]
pub struct AuthorizationFilter {
    pub project_code: String,
    pub resource_type: Option<ResourceType>,
    /// match resource names containing this substring
    pub resource_name: Option<String>,
    /// match records currently owned by this user
    pub handover_from: Option<String>,
}

impl AuthorizationFilter {
    /// Returns a filter matching every record in `project_code`
    pub fn for_project(project_code: &str) -> AuthorizationFilter {
        AuthorizationFilter {
            project_code: project_code.to_owned(),
            resource_type: None,
            resource_name: None,
            handover_from: None,
        }
    }

    pub fn matches(&self, record: &ResourceAuthorization) -> bool {
        record.project_code == self.project_code
            && self
                .resource_type
                .map_or(true, |rtype| record.resource_type == rtype)
            && self.resource_name.as_ref().map_or(true, |fragment| {
                record.resource_name.contains(fragment.as_str())
            })
            && self
                .handover_from
                .as_ref()
                .map_or(true, |user| record.handover_from == *user)
    }
}

/// Durable storage for authorization records
///
/// Writes must be at least last-writer-wins per record key: concurrent
/// handovers of the same resource are not deduplicated above this layer,
/// so implementations serialize updates per key (row-level locking, or one
/// lock across the batch) to avoid lost updates.
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// Fetch the authorization record for one resource
    async fn authorization_get(
        &self,
        opctx: &OpContext,
        project_code: &str,
        resource_type: ResourceType,
        resource_code: &str,
    ) -> Result<ResourceAuthorization, Error>;

    /// List authorization records matching `filter`, ordered by resource
    /// code
    async fn authorization_list(
        &self,
        opctx: &OpContext,
        filter: &AuthorizationFilter,
        pagparams: &PageParams,
    ) -> Result<Page<ResourceAuthorization>, Error>;

    /// Insert records, replacing any that already exist for the same key
    ///
    /// This is how a resource is first registered under permission
    /// management, and how registration is repaired if it runs twice.
    async fn authorization_batch_add_or_update(
        &self,
        opctx: &OpContext,
        records: Vec<ResourceAuthorization>,
    ) -> Result<(), Error>;

    /// Rewrite each record's owner to the candidate's receiver and stamp a
    /// new handover time
    ///
    /// Candidates whose record no longer exists are skipped, matching the
    /// semantics of an SQL UPDATE by key.
    async fn authorization_batch_update(
        &self,
        opctx: &OpContext,
        project_code: &str,
        handovers: &[HandoverCandidate],
    ) -> Result<(), Error>;

    /// Remove the record for one resource
    async fn authorization_delete(
        &self,
        opctx: &OpContext,
        project_code: &str,
        resource_type: ResourceType,
        resource_code: &str,
    ) -> Result<(), Error>;
}
