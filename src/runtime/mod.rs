//! Tokio spawner and the request/response surface for collaborators.

pub mod api;
pub mod tokio_spawner;

pub use api::{
    health, register_resource, request_allocation, submit_task, task_status, OrchestratorHealth,
    ResourceRegistration, TaskStatusResponse, TaskSubmission,
};
pub use tokio_spawner::TokioSpawner;
