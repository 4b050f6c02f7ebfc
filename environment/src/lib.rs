// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Environment-domain integration with the authorization subsystem
//!
//! An environment node's authorization record names the user recorded as
//! the node's creator, which is who agent installs and maintenance run as.
//! Only the node's registered operators (the primary and backup contacts
//! on the underlying machine record) may hold that position, so both the
//! authority rule and the eligibility rule here reduce to the same
//! operator check.

pub mod authorization;

use conveyor_auth::context::OpContext;
use conveyor_common::api::external::Error;

/// Node-record checks and mutations answered by the environment domain
#[async_trait::async_trait]
pub trait NodeOperators: Send + Sync {
    /// Verify that `user` is a registered primary or backup operator of
    /// the node, failing with [`Error::Forbidden`] otherwise
    async fn check_node_operator(
        &self,
        opctx: &OpContext,
        user: &str,
        project_code: &str,
        node_code: &str,
    ) -> Result<(), Error>;

    /// Record `user` as the node's creator
    async fn change_created_user(
        &self,
        opctx: &OpContext,
        user: &str,
        project_code: &str,
        node_code: &str,
    ) -> Result<(), Error>;
}
