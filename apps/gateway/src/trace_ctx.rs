//! Task-local request context for web requests.
//!
//! Gives error rendering and log helpers access to the current request's
//! correlation id without threading it through every call. `RequestTrace`
//! establishes the scope; everything awaited inside it sees the id.

use std::cell::RefCell;

use tokio::task_local;

task_local! {
    static REQUEST_ID: RefCell<Option<String>>;
}

/// Get the request id for the current task.
/// Returns "unknown" outside of a request scope.
pub fn request_id() -> String {
    REQUEST_ID
        .try_with(|cell| {
            cell.borrow()
                .as_ref()
                .cloned()
                .unwrap_or_else(|| "unknown".to_string())
        })
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Run a future within a request-id scope.
pub async fn with_request_id<F, R>(request_id: String, future: F) -> R
where
    F: std::future::Future<Output = R>,
{
    REQUEST_ID.scope(RefCell::new(Some(request_id)), future).await
}

/// Run a synchronous closure within a request-id scope.
pub fn sync_with_request_id<F, R>(request_id: String, f: F) -> R
where
    F: FnOnce() -> R,
{
    REQUEST_ID.sync_scope(RefCell::new(Some(request_id)), f)
}
