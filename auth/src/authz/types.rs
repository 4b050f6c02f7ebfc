// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Data model for authorization records and handover requests

use chrono::DateTime;
use chrono::Utc;
use conveyor_common::api::external::Error;
use conveyor_common::api::external::ResourceType;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

/// Current authorization state of one managed resource
///
/// Rows are created when a resource is first registered under permission
/// management, rewritten by the coordinator when the grant changes hands,
/// and removed when the owning resource is deleted.  The triple
/// `(project_code, resource_type, resource_code)` is the unique key.
#[derive(Clone, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
pub struct ResourceAuthorization {
    pub project_code: String,
    pub resource_type: ResourceType,
    pub resource_code: String,
    pub resource_name: String,
    /// user whose grant currently backs operations on the resource
    pub handover_from: String,
    /// when the grant last changed hands
    pub handover_time: DateTime<Utc>,
}

/// One authorization under consideration for handover within a request
#[derive(Clone, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
pub struct HandoverCandidate {
    pub authorization: ResourceAuthorization,
    /// user who would receive the grant
    pub handover_to: String,
    /// why this candidate failed, set only within the batch that failed it
    ///
    /// Never persisted: the store only ever sees candidates from the
    /// success set, whose `failed_message` is `None`.
    pub failed_message: Option<String>,
}

impl HandoverCandidate {
    pub fn new(
        authorization: ResourceAuthorization,
        handover_to: String,
    ) -> HandoverCandidate {
        HandoverCandidate { authorization, handover_to, failed_message: None }
    }

    /// Returns this candidate annotated with its failure message
    pub(crate) fn with_failure(mut self, message: String) -> HandoverCandidate {
        self.failed_message = Some(message);
        self
    }
}

/// Where a handover request was initiated from
///
/// The channel determines how the operator's authority is checked; see the
/// module documentation.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum HandoverChannel {
    /// the project-wide authorization management console
    Manager,
    /// a single resource's own management surface
    Resource,
}

/// Describes one handover request
#[derive(Clone, Debug, Deserialize, JsonSchema, Serialize)]
pub struct HandoverCondition {
    pub project_code: String,
    pub channel: HandoverChannel,
    /// user who should receive the selected grants
    pub handover_to: String,
    /// select every record matching the filter fields below, rather than
    /// the explicit `authorizations` list
    pub full_selection: bool,
    /// explicit records to hand over; ignored when `full_selection` is set
    pub authorizations: Vec<ResourceAuthorization>,
    /// validate only; nothing is persisted and no domain state changes
    pub pre_check: bool,

    // Filter fields used when `full_selection` is set.
    pub resource_type: ResourceType,
    pub resource_name: Option<String>,
    pub handover_from: Option<String>,
}

impl HandoverCondition {
    /// Returns the one explicit record of a resource-channel request
    ///
    /// Resource-channel requests originate from a single resource's own
    /// management page and never carry more than one record.
    pub fn single_authorization(&self) -> Result<&ResourceAuthorization, Error> {
        match self.authorizations.as_slice() {
            [authorization] => Ok(authorization),
            _ => Err(Error::invalid_request(
                "a resource-channel handover must name exactly one \
                 authorization record",
            )),
        }
    }
}

/// Outcome of one candidate's handover attempt
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
pub enum HandoverStatus {
    Success,
    Failed,
}

/// Result returned by an adapter for one candidate
#[derive(Clone, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
pub struct HandoverResult {
    pub status: HandoverStatus,
    pub message: Option<String>,
}

impl HandoverResult {
    pub fn success() -> HandoverResult {
        HandoverResult { status: HandoverStatus::Success, message: None }
    }

    pub fn failed<S: Into<String>>(message: S) -> HandoverResult {
        HandoverResult {
            status: HandoverStatus::Failed,
            message: Some(message.into()),
        }
    }
}
