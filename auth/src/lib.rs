// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Authorization-management subsystem for the conveyor control plane
//!
//! Every manageable entity in the platform (a pipeline, a repository, an
//! environment node, ...) carries an authorization record naming the user
//! whose grant currently backs operations on it.  This crate implements the
//! generic machinery for managing those records, most importantly the
//! handover protocol that transfers them between users.  See the [`authz`]
//! module documentation for the full picture.
//!
//! The crate deliberately knows nothing about any particular resource kind.
//! Resource domains (the `conveyor-pipeline`, `conveyor-repository`, and
//! `conveyor-environment` crates) plug in through the
//! [`authz::HandoverAdapter`] interface, and deployments supply durable
//! storage through the [`storage::Storage`] interface.

pub mod authz;
pub mod config;
pub mod context;
pub mod project;
pub mod storage;
