// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Repository-domain integration with the authorization subsystem
//!
//! A repository's authorization record names the user whose SCM credentials
//! back clone and webhook traffic for it.  Handing a repository over is the
//! most constrained case: besides holding edit permission, the receiver
//! must have an active OAuth linkage with the SCM host backing the
//! repository, and only hosts we can mint tokens for are eligible at all.

pub mod authorization;

use conveyor_auth::context::OpContext;
use conveyor_common::api::external::Error;
use conveyor_common::api::external::Permission;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FormatResult;

/// Kind of source-control host backing a repository
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ScmType {
    Github,
    /// the platform's internal Git host
    Git,
    Svn,
}

impl Display for ScmType {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        write!(
            f,
            "{}",
            match self {
                ScmType::Github => "github",
                ScmType::Git => "git",
                ScmType::Svn => "svn",
            }
        )
    }
}

/// Permission checks answered by the repository domain
#[async_trait::async_trait]
pub trait RepositoryPermissions: Send + Sync {
    /// Returns whether `user` holds `permission` on the given repository
    async fn check_repository_permission(
        &self,
        opctx: &OpContext,
        user: &str,
        project_code: &str,
        repository_code: &str,
        permission: Permission,
    ) -> Result<bool, Error>;
}

/// Lookup of repository metadata
#[async_trait::async_trait]
pub trait RepositoryDirectory: Send + Sync {
    /// Returns the kind of SCM host backing the repository
    async fn scm_type(
        &self,
        opctx: &OpContext,
        project_code: &str,
        repository_code: &str,
    ) -> Result<ScmType, Error>;
}

/// OAuth linkages between platform users and SCM hosts
#[async_trait::async_trait]
pub trait ScmTokenStore: Send + Sync {
    /// Returns whether `user` has an active OAuth token for the host kind
    async fn has_access_token(
        &self,
        opctx: &OpContext,
        user: &str,
        scm_type: ScmType,
    ) -> Result<bool, Error>;
}

/// Repository-side account records
#[async_trait::async_trait]
pub trait RepositoryUsers: Send + Sync {
    /// Record `user` as the account backing the repository's SCM operations
    async fn update_repository_user(
        &self,
        opctx: &OpContext,
        project_code: &str,
        repository_code: &str,
        user: &str,
    ) -> Result<(), Error>;
}
