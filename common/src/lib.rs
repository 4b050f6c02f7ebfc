// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Conveyor Control Plane
//!
//! Conveyor is a multi-tenant CI/delivery platform.  This crate implements
//! common facilities used across the platform's services.  Other top-level
//! crates implement individual pieces of the platform (e.g.,
//! `conveyor-auth` for the authorization subsystem).
//!
//! Since this crate doesn't provide externally-consumable interfaces, the
//! rustdoc (generated with `--document-private-items`) is intended primarily
//! for engineers working on this crate.

pub mod api;
