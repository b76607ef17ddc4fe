//! Conditional static asset mounts.
//!
//! A directory is served only when it exists at startup. A missing directory
//! is not an error: the router is returned unchanged and requests under the
//! prefix fall through to the normal 404.

use axum::Router;
use std::path::Path;
use tower_http::services::ServeDir;
use tracing::{debug, info};

/// Serve `dir` under `prefix` when `dir` is an existing directory.
///
/// Returns the (possibly extended) router and whether the mount was created.
/// The existence check happens once, here; a directory created later is not
/// picked up.
///
/// # Example
///
/// ```ignore
/// let (router, mounted) = mount_if_present(router, "/images", "./images");
/// ```
pub fn mount_if_present<S>(
    router: Router<S>,
    prefix: &str,
    dir: impl AsRef<Path>,
) -> (Router<S>, bool)
where
    S: Clone + Send + Sync + 'static,
{
    let dir = dir.as_ref();

    if !dir.is_dir() {
        debug!(prefix, dir = %dir.display(), "Static directory absent, skipping mount");
        return (router, false);
    }

    info!(prefix, dir = %dir.display(), "Mounting static directory");
    (router.nest_service(prefix, ServeDir::new(dir)), true)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get};
    use axum_test::TestServer;

    fn base() -> Router {
        Router::new().route("/", get(|| async { "root" }))
    }

    #[tokio::test]
    async fn test_existing_directory_is_served() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mug.svg"), "<svg>mug</svg>").unwrap();

        let (router, mounted) = mount_if_present(base(), "/images", dir.path());
        assert!(mounted);

        let server = TestServer::new(router).unwrap();
        let response = server.get("/images/mug.svg").await;

        response.assert_status_ok();
        assert_eq!(response.text(), "<svg>mug</svg>");
    }

    #[tokio::test]
    async fn test_missing_file_in_existing_directory_is_404() {
        let dir = tempfile::tempdir().unwrap();

        let (router, _) = mount_if_present(base(), "/images", dir.path());
        let server = TestServer::new(router).unwrap();

        server
            .get("/images/nope.png")
            .expect_failure()
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_absent_directory_is_not_mounted() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("images");

        let (router, mounted) = mount_if_present(base(), "/images", &missing);
        assert!(!mounted);

        let server = TestServer::new(router).unwrap();
        server
            .get("/images/mug.svg")
            .expect_failure()
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server.get("/").await.assert_text("root");
    }

    #[tokio::test]
    async fn test_regular_file_is_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("images");
        std::fs::write(&file, "not a dir").unwrap();

        let (_, mounted) = mount_if_present(base(), "/images", &file);
        assert!(!mounted);
    }
}
