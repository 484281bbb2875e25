//! Transfer service: endpoint and task listings.

use std::sync::Arc;

use serde::Serialize;

use crate::client::paginated::{PaginatedRequest, PaginatedStream, PagingStrategy};
use crate::client::ClientInner;
use crate::models::{
    Endpoint, EndpointId, OperationResult, Service, SuccessfulTransfer, Task, TaskId,
};
use crate::Result;

/// Service for Globus Transfer operations.
///
/// List operations return a [`PaginatedStream`] whose first page has
/// already been fetched; `num_results` caps how many items it yields.
///
/// # Example
///
/// ```no_run
/// use futures_util::StreamExt;
/// use globus_sdk::api::EndpointSearchQuery;
///
/// # async fn example(client: globus_sdk::GlobusClient) -> globus_sdk::Result<()> {
/// let query = EndpointSearchQuery {
///     filter_fulltext: Some("tutorial".into()),
///     ..Default::default()
/// };
///
/// let mut endpoints = client.transfer().endpoint_search(Some(query), Some(25)).await?;
/// while let Some(endpoint) = endpoints.next().await {
///     let endpoint = endpoint?;
///     println!("{} {:?}", endpoint.id, endpoint.display_name);
/// }
/// # Ok(())
/// # }
/// ```
pub struct TransferService {
    inner: Arc<ClientInner>,
}

/// Filters for endpoint search.
#[derive(Debug, Default, Clone, Serialize)]
pub struct EndpointSearchQuery {
    /// Free-text match against names and descriptions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_fulltext: Option<String>,
    /// Scope such as `my-endpoints`, `shared-with-me` or `all`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_scope: Option<String>,
    /// Restrict to endpoints owned by this identity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_owner_id: Option<String>,
}

/// Filters for the caller's task list.
#[derive(Debug, Default, Clone, Serialize)]
pub struct TaskListQuery {
    /// Transfer filter expression, e.g. `status:ACTIVE,INACTIVE`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Sort order, e.g. `request_time DESC`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orderby: Option<String>,
}

/// Filters for the endpoint-manager task list.
#[derive(Debug, Default, Clone, Serialize)]
pub struct EndpointManagerTaskListQuery {
    /// Comma-separated task statuses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_status: Option<String>,
    /// Restrict to tasks touching this endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_endpoint: Option<EndpointId>,
    /// Restrict to tasks owned by this identity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_owner_id: Option<String>,
}

impl TransferService {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// Get one endpoint.
    pub async fn get_endpoint(&self, endpoint_id: &EndpointId) -> Result<Endpoint> {
        self.inner
            .get(Service::Transfer, &format!("endpoint/{}", endpoint_id))
            .await
    }

    /// Get one task.
    pub async fn get_task(&self, task_id: &TaskId) -> Result<Task> {
        self.inner
            .get(Service::Transfer, &format!("task/{}", task_id))
            .await
    }

    /// Search endpoints. Transfer serves at most 1000 search results.
    pub async fn endpoint_search(
        &self,
        query: Option<EndpointSearchQuery>,
        num_results: Option<u64>,
    ) -> Result<PaginatedStream<Endpoint>> {
        PaginatedRequest::new(
            self.inner.clone(),
            Service::Transfer,
            "endpoint_search",
            PagingStrategy::HasNextPage,
        )
        .max_results_per_call(100)
        .max_total_results(1000)
        .num_results(num_results)
        .build_with_query(query)
        .start()
        .await
    }

    /// List the caller's tasks, most recent first unless `orderby` says otherwise.
    pub async fn task_list(
        &self,
        query: Option<TaskListQuery>,
        num_results: Option<u64>,
    ) -> Result<PaginatedStream<Task>> {
        PaginatedRequest::new(
            self.inner.clone(),
            Service::Transfer,
            "task_list",
            PagingStrategy::Total,
        )
        .max_results_per_call(1000)
        .num_results(num_results)
        .build_with_query(query)
        .start()
        .await
    }

    /// List tasks on endpoints the caller manages.
    pub async fn endpoint_manager_task_list(
        &self,
        query: Option<EndpointManagerTaskListQuery>,
        num_results: Option<u64>,
    ) -> Result<PaginatedStream<Task>> {
        PaginatedRequest::new(
            self.inner.clone(),
            Service::Transfer,
            "endpoint_manager/task_list",
            PagingStrategy::LastKey,
        )
        .max_results_per_call(1000)
        .num_results(num_results)
        .build_with_query(query)
        .start()
        .await
    }

    /// List the files a task has moved so far.
    pub async fn task_successful_transfers(
        &self,
        task_id: &TaskId,
        num_results: Option<u64>,
    ) -> Result<PaginatedStream<SuccessfulTransfer>> {
        PaginatedRequest::new(
            self.inner.clone(),
            Service::Transfer,
            format!("task/{}/successful_transfers", task_id),
            PagingStrategy::Marker,
        )
        .max_results_per_call(1000)
        .num_results(num_results)
        .build_with_query(None::<()>)
        .start()
        .await
    }

    /// Cancel a task.
    pub async fn cancel_task(&self, task_id: &TaskId) -> Result<OperationResult> {
        self.inner
            .post(
                Service::Transfer,
                &format!("task/{}/cancel", task_id),
                &serde_json::json!({}),
            )
            .await
    }

    /// Change a task's label.
    pub async fn update_task_label(
        &self,
        task_id: &TaskId,
        label: impl Into<String>,
    ) -> Result<OperationResult> {
        let body = serde_json::json!({
            "DATA_TYPE": "task",
            "label": label.into(),
        });
        self.inner
            .put(Service::Transfer, &format!("task/{}", task_id), &body)
            .await
    }

    /// Delete a bookmark.
    pub async fn delete_bookmark(&self, bookmark_id: &str) -> Result<OperationResult> {
        self.inner
            .delete(Service::Transfer, &format!("bookmark/{}", bookmark_id))
            .await
    }
}
