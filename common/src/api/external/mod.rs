// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Data structures and related facilities for representing resources in the
//! API
//!
//! The contents here are all HTTP-agnostic.  An `Error` generated deep in a
//! service is converted into a transport-level error as one of the last
//! steps in processing a request, which lets most of the system remain
//! agnostic to how it communicates with clients.

mod error;

pub use error::Error;
pub use error::LookupType;

use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FormatResult;
use std::num::NonZeroU32;

/// Identifies a type of API resource
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    JsonSchema,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Project,
    Pipeline,
    Repository,
    EnvironmentNode,
    Credential,
}

impl Display for ResourceType {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        write!(
            f,
            "{}",
            match self {
                ResourceType::Project => "project",
                ResourceType::Pipeline => "pipeline",
                ResourceType::Repository => "repository",
                ResourceType::EnvironmentNode => "environment node",
                ResourceType::Credential => "credential",
            }
        )
    }
}

/// A permission a user may hold on a resource
///
/// The set of permissions is fixed by the system.  Each resource domain
/// decides which permissions are meaningful for its resources (e.g., a
/// pipeline can be executed, a repository cannot).
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    JsonSchema,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    View,
    Edit,
    Execute,
    Delete,
    Manage,
}

impl Display for Permission {
    fn fmt(&self, f: &mut Formatter) -> FormatResult {
        write!(
            f,
            "{}",
            match self {
                Permission::View => "view",
                Permission::Edit => "edit",
                Permission::Execute => "execute",
                Permission::Delete => "delete",
                Permission::Manage => "manage",
            }
        )
    }
}

/// Parameters used to request a specific page of results when listing a
/// collection of objects
///
/// This is HTTP-agnostic.  By the time this struct is constructed, the
/// transport layer has already validated whatever the client sent, so
/// backends can use these values directly.
#[derive(Clone, Copy, Debug)]
pub struct PageParams {
    /// how many matching results to skip before the first one returned
    pub offset: u32,

    /// how many results to return on this page
    ///
    /// Backend implementations must provide this many results unless we're
    /// at the end of the scan.  Callers assume that if we provide fewer
    /// results than this number, then we're done with the scan.
    pub limit: NonZeroU32,
}

/// A single page of results from a list operation, along with the total
/// number of records matching the caller's filter
#[derive(Clone, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub items: Vec<T>,
}

#[cfg(test)]
mod test {
    use super::Permission;
    use super::ResourceType;

    #[test]
    fn test_display_names() {
        assert_eq!(ResourceType::EnvironmentNode.to_string(), "environment node");
        assert_eq!(Permission::Manage.to_string(), "manage");
    }

    #[test]
    fn test_serialized_forms() {
        assert_eq!(
            serde_json::to_string(&ResourceType::EnvironmentNode).unwrap(),
            "\"environment_node\""
        );
        assert_eq!(
            serde_json::to_string(&Permission::Execute).unwrap(),
            "\"execute\""
        );
    }
}
