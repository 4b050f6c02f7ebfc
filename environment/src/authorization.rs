// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Handover of environment-node authorizations

use crate::NodeOperators;
use conveyor_auth::authz::AuthorizationCoordinator;
use conveyor_auth::authz::HandoverAdapter;
use conveyor_auth::authz::HandoverCandidate;
use conveyor_auth::authz::HandoverCondition;
use conveyor_auth::authz::HandoverResult;
use conveyor_auth::authz::HandoverStatus;
use conveyor_auth::authz::ResourceAuthorization;
use conveyor_auth::context::OpContext;
use conveyor_common::api::external::Error;
use conveyor_common::api::external::ResourceType;
use slog::info;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Environment-facing surface of the handover protocol
pub struct EnvironmentAuthorizationService {
    coordinator: Arc<AuthorizationCoordinator>,
    nodes: Arc<dyn NodeOperators>,
}

impl EnvironmentAuthorizationService {
    pub fn new(
        coordinator: Arc<AuthorizationCoordinator>,
        nodes: Arc<dyn NodeOperators>,
    ) -> EnvironmentAuthorizationService {
        EnvironmentAuthorizationService { coordinator, nodes }
    }

    /// Register newly imported nodes under permission management
    pub async fn add_resource_authorizations(
        &self,
        opctx: &OpContext,
        records: Vec<ResourceAuthorization>,
    ) -> Result<(), Error> {
        self.coordinator.add_resource_authorizations(opctx, records).await
    }

    /// Rewrite record owners directly after an out-of-band migration
    pub async fn batch_modify_handover_from(
        &self,
        opctx: &OpContext,
        project_code: &str,
        handovers: &[HandoverCandidate],
    ) -> Result<(), Error> {
        self.coordinator
            .batch_modify_handover_from(opctx, project_code, handovers)
            .await
    }

    /// Transfer node authorizations as described by `condition`
    pub async fn reset_env_node_authorization(
        &self,
        opctx: &OpContext,
        operator: &str,
        project_code: &str,
        condition: &HandoverCondition,
    ) -> Result<BTreeMap<HandoverStatus, Vec<HandoverCandidate>>, Error> {
        info!(opctx.log, "reset environment node authorization";
            "operator" => operator,
            "project_code" => project_code,
        );
        self.coordinator
            .reset_resource_authorization(
                opctx,
                operator,
                project_code,
                condition,
                self,
            )
            .await
    }
}

#[async_trait::async_trait]
impl HandoverAdapter for EnvironmentAuthorizationService {
    fn resource_type(&self) -> ResourceType {
        ResourceType::EnvironmentNode
    }

    async fn validate_single_resource_permission(
        &self,
        opctx: &OpContext,
        operator: &str,
        project_code: &str,
        resource_code: &str,
    ) -> Result<(), Error> {
        // Operating a single node from its own page is allowed for the
        // node's registered operators, not for project managers at large.
        self.nodes
            .check_node_operator(opctx, operator, project_code, resource_code)
            .await
    }

    async fn check_eligibility(
        &self,
        opctx: &OpContext,
        candidate: &HandoverCandidate,
    ) -> Result<HandoverResult, Error> {
        match self
            .nodes
            .check_node_operator(
                opctx,
                &candidate.handover_to,
                &candidate.authorization.project_code,
                &candidate.authorization.resource_code,
            )
            .await
        {
            Ok(()) => Ok(HandoverResult::success()),
            Err(Error::Forbidden { message }) => {
                Ok(HandoverResult::failed(message))
            }
            Err(error) => Err(error),
        }
    }

    async fn commit_handover(
        &self,
        opctx: &OpContext,
        candidate: &HandoverCandidate,
    ) -> Result<HandoverResult, Error> {
        let result = self.check_eligibility(opctx, candidate).await?;
        if result.status == HandoverStatus::Success {
            self.nodes
                .change_created_user(
                    opctx,
                    &candidate.handover_to,
                    &candidate.authorization.project_code,
                    &candidate.authorization.resource_code,
                )
                .await?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod test {
    use super::EnvironmentAuthorizationService;
    use crate::NodeOperators;
    use chrono::Utc;
    use conveyor_auth::authz::AuthorizationCoordinator;
    use conveyor_auth::authz::HandoverAdapter;
    use conveyor_auth::authz::HandoverCandidate;
    use conveyor_auth::authz::HandoverStatus;
    use conveyor_auth::authz::ResourceAuthorization;
    use conveyor_auth::config::AuthConfig;
    use conveyor_auth::context::OpContext;
    use conveyor_auth::project::ProjectAccess;
    use conveyor_auth::storage::InMemoryStorage;
    use conveyor_common::api::external::Error;
    use conveyor_common::api::external::ResourceType;
    use conveyor_test_utils::dev::test_setup_log;
    use std::sync::Arc;
    use std::sync::Mutex;

    /// Node record whose only operators are "alice" and "bob"
    #[derive(Default)]
    struct FakeNodes {
        created_user_changes: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl NodeOperators for FakeNodes {
        async fn check_node_operator(
            &self,
            _opctx: &OpContext,
            user: &str,
            _project_code: &str,
            node_code: &str,
        ) -> Result<(), Error> {
            if user == "alice" || user == "bob" {
                Ok(())
            } else {
                Err(Error::forbidden(&format!(
                    "user {} is not a registered operator of node {}",
                    user, node_code,
                )))
            }
        }

        async fn change_created_user(
            &self,
            _opctx: &OpContext,
            user: &str,
            _project_code: &str,
            node_code: &str,
        ) -> Result<(), Error> {
            self.created_user_changes
                .lock()
                .unwrap()
                .push(format!("{}:{}", node_code, user));
            Ok(())
        }
    }

    struct NoManagers;

    #[async_trait::async_trait]
    impl ProjectAccess for NoManagers {
        async fn check_project_manager(
            &self,
            _opctx: &OpContext,
            _user: &str,
            _project_code: &str,
        ) -> Result<bool, Error> {
            Ok(false)
        }
    }

    fn service(nodes: Arc<FakeNodes>) -> EnvironmentAuthorizationService {
        let coordinator = Arc::new(AuthorizationCoordinator::new(
            Arc::new(InMemoryStorage::new()),
            Arc::new(NoManagers),
            AuthConfig::default(),
        ));
        EnvironmentAuthorizationService::new(coordinator, nodes)
    }

    fn candidate(handover_to: &str) -> HandoverCandidate {
        HandoverCandidate::new(
            ResourceAuthorization {
                project_code: String::from("proj1"),
                resource_type: ResourceType::EnvironmentNode,
                resource_code: String::from("n-33ab"),
                resource_name: String::from("build host 3"),
                handover_from: String::from("alice"),
                handover_time: Utc::now(),
            },
            handover_to.to_owned(),
        )
    }

    #[tokio::test]
    async fn test_eligibility_requires_operator() {
        let logctx = test_setup_log("test_eligibility_requires_operator");
        let opctx = OpContext::for_tests(logctx.log.clone());
        let nodes = Arc::new(FakeNodes::default());
        let service = service(Arc::clone(&nodes));

        let result = service
            .check_eligibility(&opctx, &candidate("bob"))
            .await
            .unwrap();
        assert_eq!(result.status, HandoverStatus::Success);
        // The dry-run check must not have touched the node record.
        assert!(nodes.created_user_changes.lock().unwrap().is_empty());

        let result = service
            .check_eligibility(&opctx, &candidate("mallory"))
            .await
            .unwrap();
        assert_eq!(result.status, HandoverStatus::Failed);
        assert!(result.message.unwrap().contains("not a registered operator"));

        logctx.cleanup_successful();
    }

    #[tokio::test]
    async fn test_commit_changes_created_user() {
        let logctx = test_setup_log("test_commit_changes_created_user");
        let opctx = OpContext::for_tests(logctx.log.clone());
        let nodes = Arc::new(FakeNodes::default());
        let service = service(Arc::clone(&nodes));

        let result = service
            .commit_handover(&opctx, &candidate("bob"))
            .await
            .unwrap();
        assert_eq!(result.status, HandoverStatus::Success);
        assert_eq!(
            *nodes.created_user_changes.lock().unwrap(),
            vec!["n-33ab:bob"]
        );

        let result = service
            .commit_handover(&opctx, &candidate("mallory"))
            .await
            .unwrap();
        assert_eq!(result.status, HandoverStatus::Failed);
        assert_eq!(nodes.created_user_changes.lock().unwrap().len(), 1);

        logctx.cleanup_successful();
    }
}
