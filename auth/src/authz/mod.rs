// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Resource-authorization handover
//!
//! ## Background
//!
//! Every manageable resource in the platform carries an *authorization
//! record*: a row saying which user's grant currently backs operations on
//! that resource.  When a pipeline runs on someone's behalf, or a
//! repository is polled with someone's OAuth token, that someone is the
//! record's `handover_from` user.  When that user leaves a project (or
//! just shouldn't be the backing identity anymore), their records have to
//! be *handed over* to someone else.
//!
//! A handover sounds simple -- rewrite one column -- but three things make
//! it the interesting part of this subsystem:
//!
//! - **Resource kinds differ.**  Whether a user is *eligible* to receive a
//!   pipeline is a different question from whether they can receive a
//!   repository (the latter needs an OAuth linkage with the backing SCM
//!   host).  Some kinds also need a domain-side mutation applied when the
//!   transfer happens.  The generic algorithm here stays ignorant of all
//!   of that: each kind plugs in through [`HandoverAdapter`].
//!
//! - **Batches fail partially.**  A project administrator hands over
//!   everything a departing user owned in one request.  One ineligible
//!   receiver must not abort the rest, so per-candidate outcomes are
//!   explicit values, partitioned into a success set (persisted) and a
//!   failure set (reported back with messages).
//!
//! - **Where the request came from changes who may make it.**  A bulk
//!   request from the admin console ([`HandoverChannel::Manager`])
//!   requires the operator to hold project-manage.  A request from a
//!   single resource's own management page ([`HandoverChannel::Resource`])
//!   instead defers to the resource kind's own notion of authority (e.g.,
//!   manage on that one pipeline) -- and always names exactly one record.
//!
//! ## Control flow
//!
//! [`AuthorizationCoordinator::reset_resource_authorization`] runs one
//! request end to end:
//!
//! 1. check the operator's authority for the request's channel;
//! 2. resolve candidates -- either everything matching the condition's
//!    filter (full selection) or the explicit records in the request;
//! 3. run the adapter's eligibility check (dry run) or commit hook per
//!    candidate, folding any error into that candidate's failure;
//! 4. partition into successes and failures;
//! 5. persist the successes' new owner in one batch -- unless this is a
//!    precheck, which never writes;
//! 6. return both buckets to the caller.
//!
//! Nothing here is transactional across the batch: partial success is an
//! expected, reported outcome, and a retry of the failed subset is safe
//! because a handover from whichever user currently owns the record is
//! just another handover.

mod adapter;
mod coordinator;
mod types;

pub use adapter::HandoverAdapter;
pub use coordinator::AuthorizationCoordinator;
pub use types::HandoverCandidate;
pub use types::HandoverChannel;
pub use types::HandoverCondition;
pub use types::HandoverResult;
pub use types::HandoverStatus;
pub use types::ResourceAuthorization;
