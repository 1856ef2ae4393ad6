//! Worker container state machine (§4.5.1).

use bollard::Docker;

use crate::error::Result;

/// The state of a role's worker container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// No container with this name exists.
    Absent,
    /// The container exists and is running.
    Running,
}

/// The fixed container name for a role, `worker-<role>`.
pub fn container_name(role_name: &str) -> String {
    format!("worker-{role_name}")
}

/// Inspects the daemon for a container named `worker-<role>` and reports its
/// state. A container that exists but is stopped is treated as `Absent` for
/// orchestration purposes — only a running container can serve phases.
pub async fn inspect(docker: &Docker, role_name: &str) -> Result<WorkerState> {
    let name = container_name(role_name);
    match docker.inspect_container(&name, None).await {
        Ok(details) => {
            let running = details
                .state
                .and_then(|s| s.running)
                .unwrap_or(false);
            Ok(if running {
                WorkerState::Running
            } else {
                WorkerState::Absent
            })
        }
        Err(bollard::errors::Error::DockerResponseServerError {
            status_code: 404, ..
        }) => Ok(WorkerState::Absent),
        Err(e) => Err(crate::error::Error::ContainerStart(e.to_string())),
    }
}
