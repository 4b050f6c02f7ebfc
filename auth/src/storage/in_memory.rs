// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory implementation of the [`Storage`] interface

use super::AuthorizationFilter;
use super::Storage;
use crate::authz::HandoverCandidate;
use crate::authz::ResourceAuthorization;
use crate::context::OpContext;
use chrono::Utc;
use conveyor_common::api::external::Error;
use conveyor_common::api::external::Page;
use conveyor_common::api::external::PageParams;
use conveyor_common::api::external::ResourceType;
use slog::trace;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

type RecordKey = (String, ResourceType, String);

fn record_key(record: &ResourceAuthorization) -> RecordKey {
    (
        record.project_code.clone(),
        record.resource_type,
        record.resource_code.clone(),
    )
}

/// Authorization storage backed by a process-local map
///
/// One lock is held across each batch operation, which serializes writes
/// per key the way a database implementation would with row locks.
pub struct InMemoryStorage {
    records: Mutex<BTreeMap<RecordKey, ResourceAuthorization>>,
}

impl InMemoryStorage {
    pub fn new() -> InMemoryStorage {
        InMemoryStorage { records: Mutex::new(BTreeMap::new()) }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Storage for InMemoryStorage {
    async fn authorization_get(
        &self,
        _opctx: &OpContext,
        project_code: &str,
        resource_type: ResourceType,
        resource_code: &str,
    ) -> Result<ResourceAuthorization, Error> {
        let records = self.records.lock().await;
        let key = (
            project_code.to_owned(),
            resource_type,
            resource_code.to_owned(),
        );
        records.get(&key).cloned().ok_or_else(|| {
            Error::not_found_by_code(resource_type, resource_code)
        })
    }

    async fn authorization_list(
        &self,
        _opctx: &OpContext,
        filter: &AuthorizationFilter,
        pagparams: &PageParams,
    ) -> Result<Page<ResourceAuthorization>, Error> {
        let records = self.records.lock().await;
        // The BTreeMap is ordered by key, so matches come out ordered by
        // resource code within a project and type.
        let matches: Vec<&ResourceAuthorization> =
            records.values().filter(|record| filter.matches(record)).collect();
        let count = matches.len() as u64;
        let items = matches
            .into_iter()
            .skip(pagparams.offset as usize)
            .take(pagparams.limit.get() as usize)
            .cloned()
            .collect();
        Ok(Page { count, items })
    }

    async fn authorization_batch_add_or_update(
        &self,
        opctx: &OpContext,
        new_records: Vec<ResourceAuthorization>,
    ) -> Result<(), Error> {
        let mut records = self.records.lock().await;
        for record in new_records {
            trace!(opctx.log, "storing authorization record";
                "resource_type" => %record.resource_type,
                "resource_code" => record.resource_code.as_str(),
            );
            records.insert(record_key(&record), record);
        }
        Ok(())
    }

    async fn authorization_batch_update(
        &self,
        opctx: &OpContext,
        project_code: &str,
        handovers: &[HandoverCandidate],
    ) -> Result<(), Error> {
        let mut records = self.records.lock().await;
        let now = Utc::now();
        for candidate in handovers {
            let key = (
                project_code.to_owned(),
                candidate.authorization.resource_type,
                candidate.authorization.resource_code.clone(),
            );
            match records.get_mut(&key) {
                Some(record) => {
                    record.handover_from = candidate.handover_to.clone();
                    record.handover_time = now;
                }
                None => {
                    // The resource was deleted while the handover was in
                    // flight.  An UPDATE by key matches nothing; same here.
                    trace!(opctx.log, "skipping update of missing record";
                        "resource_code" =>
                            candidate.authorization.resource_code.as_str(),
                    );
                }
            }
        }
        Ok(())
    }

    async fn authorization_delete(
        &self,
        _opctx: &OpContext,
        project_code: &str,
        resource_type: ResourceType,
        resource_code: &str,
    ) -> Result<(), Error> {
        let mut records = self.records.lock().await;
        let key = (
            project_code.to_owned(),
            resource_type,
            resource_code.to_owned(),
        );
        records.remove(&key).map(|_| ()).ok_or_else(|| {
            Error::not_found_by_code(resource_type, resource_code)
        })
    }
}
