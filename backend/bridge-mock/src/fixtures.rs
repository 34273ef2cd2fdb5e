//! Seeded studio data and the stateful mock of every studio operation.

use crate::engine::MockEngine;
use crate::entry::MockEntry;
use crate::error::MockError;
use crate::scenarios::{EMPTY, NETWORK_ERROR, NOT_FOUND, SERVER_ERROR};
use crate::simulate;

use bridge_core::error::CallError;
use bridge_core::registry::OperationRegistry;
use bridge_core::registry::operations::{
    DeleteApiV1BetaGroupsByName, DeleteApiV1BetaWorkloadsByName, GetApiV1BetaDiscoveryClients,
    GetApiV1BetaGroups, GetApiV1BetaGroupsByName, GetApiV1BetaSecretsDefaultKeys,
    GetApiV1BetaVersion, GetApiV1BetaWorkloads, GetApiV1BetaWorkloadsByName,
    GetApiV1BetaWorkloadsByNameStatus, GetHealth, PostApiV1BetaGroups, PostApiV1BetaWorkloads,
    PostApiV1BetaWorkloadsByNameRestart, PostApiV1BetaWorkloadsByNameStop,
};

use common::HttpStatusCode;

pub use models::DEFAULT_GROUP;
use models::{
    ClientStatus, ClientStatusList, CreateWorkloadResponse, Group, GroupList, ModelError,
    SecretKey, SecretKeyList, Version, Workload, WorkloadBuilder, WorkloadList, WorkloadStatus,
    WorkloadStatusResponse,
};

use serde_json::json;

pub const FIXTURE_VERSION: &str = "v0.1.0";

const FIRST_FREE_PORT: u16 = 50000;
const FIXTURE_CREATED_AT: &str = "2025-06-10T09:00:00+02:00";

/// Mutable backend state behind the studio mocks.
#[derive(Debug, Clone, PartialEq)]
pub struct StudioFixtures {
    pub version: String,
    pub groups: Vec<Group>,
    pub workloads: Vec<Workload>,
    pub clients: Vec<ClientStatus>,
    pub secret_keys: Vec<SecretKey>,
}

impl Default for StudioFixtures {
    fn default() -> Self {
        Self::seeded()
    }
}

impl StudioFixtures {
    pub fn seeded() -> Self {
        Self {
            version: FIXTURE_VERSION.to_string(),
            groups: vec![
                Group::new(DEFAULT_GROUP),
                Group::new("research"),
                Group::new("archive"),
            ],
            workloads: vec![
                seed_workload(
                    "postgres-db",
                    "ghcr.io/postgres/postgres-mcp-server:latest",
                    28135,
                    WorkloadStatus::Stopped,
                    "Exited (0) 30 minutes ago",
                    "2025-06-09T15:35:15+02:00",
                    DEFAULT_GROUP,
                ),
                seed_workload(
                    "vscode-server",
                    "ghcr.io/vscode/vscode-mcp-server:latest",
                    28136,
                    WorkloadStatus::Running,
                    "Up 45 minutes",
                    "2025-06-09T15:30:15+02:00",
                    DEFAULT_GROUP,
                ),
                seed_workload(
                    "github",
                    "ghcr.io/github/github-mcp-server:latest",
                    28134,
                    WorkloadStatus::Stopped,
                    "Exited (0) 49 minutes ago",
                    "2025-06-09T15:33:15+02:00",
                    "research",
                ),
                seed_workload(
                    "fetch",
                    "mcp/fetch:latest",
                    34215,
                    WorkloadStatus::Stopped,
                    "Exited (137) 4 hours ago",
                    "2025-06-06T14:53:43+02:00",
                    "research",
                ),
                seed_workload(
                    "osv-2",
                    "ghcr.io/stacklok/osv-mcp/server:latest",
                    58766,
                    WorkloadStatus::Running,
                    "Up 54 minutes",
                    "2025-06-06T17:57:36+02:00",
                    DEFAULT_GROUP,
                ),
                seed_workload(
                    "osv",
                    "ghcr.io/stacklok/osv-mcp/server:latest",
                    41317,
                    WorkloadStatus::Running,
                    "Up 54 minutes",
                    "2025-06-06T17:21:14+02:00",
                    DEFAULT_GROUP,
                ),
            ],
            clients: vec![
                seed_client("vscode", true, true),
                seed_client("cursor", true, false),
                seed_client("claude-code", false, false),
            ],
            secret_keys: vec![
                SecretKey {
                    key: "GITHUB_PERSONAL_ACCESS_TOKEN".to_string(),
                    description: Some("Used by the github server".to_string()),
                },
                SecretKey {
                    key: "POSTGRES_PASSWORD".to_string(),
                    description: None,
                },
            ],
        }
    }

    pub fn workload(&self, name: &str) -> Option<&Workload> {
        self.workloads.iter().find(|w| w.name == name)
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    fn workload_mut(&mut self, name: &str) -> Result<&mut Workload, CallError> {
        self.workloads
            .iter_mut()
            .find(|w| w.name == name)
            .ok_or_else(simulate::not_found)
    }

    fn port_in_use(&self, port: u16) -> bool {
        self.workloads.iter().any(|w| w.port == port)
    }

    /// One past the highest allocated port, starting at [`FIRST_FREE_PORT`].
    /// `None` once the port range is exhausted.
    fn next_free_port(&self) -> Option<u16> {
        self.workloads
            .iter()
            .map(|w| w.port)
            .filter(|port| *port >= FIRST_FREE_PORT)
            .max()
            .map_or(Some(FIRST_FREE_PORT), |port| port.checked_add(1))
    }
}

fn seed_workload(
    name: &str,
    package: &str,
    port: u16,
    status: WorkloadStatus,
    status_context: &str,
    created_at: &str,
    group: &str,
) -> Workload {
    Workload {
        name: name.to_string(),
        package: package.to_string(),
        url: Workload::local_url(port, name),
        port,
        status,
        status_context: status_context.to_string(),
        created_at: created_at.to_string(),
        group: group.to_string(),
    }
}

fn seed_client(client_type: &str, installed: bool, registered: bool) -> ClientStatus {
    ClientStatus {
        client_type: client_type.to_string(),
        installed,
        registered,
    }
}

fn bad_request(message: &str) -> CallError {
    simulate::status(HttpStatusCode::BAD_REQUEST, message)
}

fn conflict(message: &str) -> CallError {
    simulate::status(HttpStatusCode::CONFLICT, message)
}

type Entry<O> = MockEntry<O, StudioFixtures>;

/// Every studio operation mocked over a seeded [`StudioFixtures`].
///
/// Handlers mutate the fixture state, so e.g. a created group shows up in the
/// next group listing and a stopped workload reports `stopped`.
///
/// # Errors
///
/// Only fails if the builtin registry lost one of the studio operations.
pub fn studio_engine() -> Result<MockEngine<StudioFixtures>, MockError> {
    MockEngine::builder(OperationRegistry::builtin().clone(), StudioFixtures::seeded)
        .register(
            Entry::<GetHealth>::handler(|_request, _state| Ok(()))
                .scenario_failure(NETWORK_ERROR, simulate::network_error),
        )
        .register(
            Entry::<GetApiV1BetaVersion>::handler(|_request, state| {
                Ok(Version {
                    version: state.version.clone(),
                })
            })
            .scenario_failure(SERVER_ERROR, simulate::server_error),
        )
        .register(
            Entry::<GetApiV1BetaGroups>::handler(|_request, state| {
                Ok(GroupList {
                    groups: state.groups.clone(),
                })
            })
            .scenario_failure(SERVER_ERROR, simulate::server_error),
        )
        .register(Entry::<PostApiV1BetaGroups>::handler(|request, state| {
            let name = request.body.name.trim();
            if name.is_empty() {
                return Err(bad_request("Group name is required"));
            }
            if state.group(name).is_some() {
                return Err(conflict("Group already exists"));
            }

            let group = Group::new(name);
            state.groups.push(group.clone());
            Ok(group)
        }))
        .register(Entry::<GetApiV1BetaGroupsByName>::handler(
            |request, state| {
                state.group(&request.path.name).cloned().ok_or_else(|| {
                    simulate::status(HttpStatusCode::NOT_FOUND, "Group not found")
                })
            },
        ))
        .register(Entry::<DeleteApiV1BetaGroupsByName>::handler(
            |request, state| {
                if request.path.name == DEFAULT_GROUP {
                    return Err(bad_request("Cannot delete the default group"));
                }

                let before = state.groups.len();
                state.groups.retain(|g| g.name != request.path.name);
                if state.groups.len() == before {
                    return Err(simulate::status(
                        HttpStatusCode::NOT_FOUND,
                        "Group not found",
                    ));
                }

                for workload in state
                    .workloads
                    .iter_mut()
                    .filter(|w| w.group == request.path.name)
                {
                    workload.group = DEFAULT_GROUP.to_string();
                }
                Ok(())
            },
        ))
        .register(
            Entry::<GetApiV1BetaWorkloads>::handler(|request, state| {
                let query = &request.query;
                let group = query.group.as_deref().unwrap_or(DEFAULT_GROUP);
                let all = query.all.unwrap_or(false);

                let workloads = state
                    .workloads
                    .iter()
                    .filter(|w| all || w.group == group)
                    .cloned()
                    .collect();
                Ok(WorkloadList { workloads })
            })
            .scenario_fixture(EMPTY, WorkloadList::default()),
        )
        .register(Entry::<PostApiV1BetaWorkloads>::handler(|request, state| {
            let body = &request.body;
            let name = body.name.trim();
            if state.workload(name).is_some() {
                return Err(conflict("Workload already exists"));
            }

            let group = body.group.as_deref().unwrap_or(DEFAULT_GROUP);
            if state.group(group).is_none() {
                return Err(simulate::status(
                    HttpStatusCode::NOT_FOUND,
                    json!({ "error": "Group not found", "group": group }),
                ));
            }

            let port = match body.target_port {
                Some(port) if state.port_in_use(port) => {
                    return Err(conflict(&format!("Port {port} is already in use")));
                }
                Some(port) => port,
                None => state
                    .next_free_port()
                    .ok_or_else(|| conflict("No free port available"))?,
            };

            let workload = WorkloadBuilder::default()
                .with_name(name)
                .with_package(body.image.trim())
                .with_port(port)
                .with_status(WorkloadStatus::Running)
                .with_status_context("Up Less than a second")
                .with_created_at(FIXTURE_CREATED_AT)
                .with_group(group)
                .build()
                .map_err(|e| match e {
                    ModelError::Validation { message, .. } => bad_request(&message),
                })?;

            let created = CreateWorkloadResponse {
                name: workload.name.clone(),
                port,
            };
            state.workloads.push(workload);
            Ok(created)
        }))
        .register(
            Entry::<GetApiV1BetaWorkloadsByName>::handler(|request, state| {
                state
                    .workload(&request.path.name)
                    .cloned()
                    .ok_or_else(simulate::not_found)
            })
            .scenario_failure(NOT_FOUND, simulate::not_found),
        )
        .register(Entry::<DeleteApiV1BetaWorkloadsByName>::handler(
            |request, state| {
                let before = state.workloads.len();
                state.workloads.retain(|w| w.name != request.path.name);
                if state.workloads.len() == before {
                    return Err(simulate::not_found());
                }
                Ok(())
            },
        ))
        .register(Entry::<PostApiV1BetaWorkloadsByNameStop>::handler(
            |request, state| {
                let workload = state.workload_mut(&request.path.name)?;
                workload.status = WorkloadStatus::Stopped;
                workload.status_context = "Exited (0) Less than a second ago".to_string();
                Ok(())
            },
        ))
        .register(
            Entry::<PostApiV1BetaWorkloadsByNameRestart>::handler(|request, state| {
                let workload = state.workload_mut(&request.path.name)?;
                workload.status = WorkloadStatus::Running;
                workload.status_context = "Up Less than a second".to_string();
                Ok(())
            })
            .scenario_failure(NOT_FOUND, simulate::not_found),
        )
        .register(Entry::<GetApiV1BetaWorkloadsByNameStatus>::handler(
            |request, state| {
                state
                    .workload(&request.path.name)
                    .map(|w| WorkloadStatusResponse { status: w.status })
                    .ok_or_else(simulate::not_found)
            },
        ))
        .register(Entry::<GetApiV1BetaDiscoveryClients>::handler(
            |_request, state| {
                Ok(ClientStatusList {
                    clients: state.clients.clone(),
                })
            },
        ))
        .register(
            Entry::<GetApiV1BetaSecretsDefaultKeys>::handler(|_request, state| {
                Ok(SecretKeyList {
                    keys: state.secret_keys.clone(),
                })
            })
            .scenario_failure(SERVER_ERROR, simulate::server_error),
        )
        .build()
}
