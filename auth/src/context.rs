// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared facilities used by all operations in the subsystem

use slog::Logger;

/// Provides general facilities for any operation in the authorization
/// subsystem
///
/// Every operation takes an `OpContext`.  It carries the logger for
/// recording what the operation did, pre-decorated with whatever context
/// the caller attached (request ids and the like).  Operations that are not
/// associated with a request at all (background maintenance, tests) still
/// carry one.
pub struct OpContext {
    pub log: Logger,
}

impl OpContext {
    pub fn new(log: &Logger) -> OpContext {
        OpContext { log: log.clone() }
    }

    /// Returns a context suitable for automated tests
    pub fn for_tests(log: Logger) -> OpContext {
        OpContext { log }
    }
}
