// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Client interface to the project-management service

use crate::context::OpContext;
use conveyor_common::api::external::Error;

/// Membership checks answered by the project-management service
///
/// In a full deployment this is a call to another service, with the latency
/// and failure modes that implies.  It is an explicit interface rather than
/// a direct function call so that implementations can attach their own
/// timeout and retry policy, and so the test suite can substitute a fake.
#[async_trait::async_trait]
pub trait ProjectAccess: Send + Sync {
    /// Returns whether `user` holds the project-manage grant on the project
    async fn check_project_manager(
        &self,
        opctx: &OpContext,
        user: &str,
        project_code: &str,
    ) -> Result<bool, Error>;
}
