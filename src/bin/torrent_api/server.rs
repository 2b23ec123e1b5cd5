//! Directory listing HTTP routes.

use std::io;
use std::path::Path;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::ACCESS_CONTROL_ALLOW_ORIGIN;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use torrent_adder::library::{PathResponse, TvShowsResponse};
use torrent_adder::{os_str_to_string, print_verbose};

/// Media library directories served by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryDirectories {
    pub movies: String,
    #[serde(rename = "tvshows")]
    pub tv_shows: String,
    pub downloads: String,
}

#[derive(Debug, Serialize)]
struct DirectoriesResponse {
    directories: LibraryDirectories,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Failure to list the TV show directory.
struct ApiError(io::Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        json_error(StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string())
    }
}

impl From<io::Error> for ApiError {
    fn from(error: io::Error) -> Self {
        Self(error)
    }
}

/// Create the API router.
pub fn create_router(directories: LibraryDirectories, verbose: bool) -> Router {
    let router = Router::new()
        .route("/", get(root))
        .route("/movies", get(movies))
        .route("/downloads", get(downloads))
        .route("/tvshows", get(tv_shows))
        .fallback(not_found)
        .with_state(Arc::new(directories))
        .layer(middleware::map_response(allow_any_origin));

    if verbose {
        router.layer(middleware::from_fn(log_request))
    } else {
        router
    }
}

async fn root(State(directories): State<Arc<LibraryDirectories>>) -> Json<DirectoriesResponse> {
    Json(DirectoriesResponse {
        directories: directories.as_ref().clone(),
    })
}

async fn movies(State(directories): State<Arc<LibraryDirectories>>) -> Json<PathResponse> {
    Json(PathResponse {
        path: directories.movies.clone(),
    })
}

async fn downloads(State(directories): State<Arc<LibraryDirectories>>) -> Json<PathResponse> {
    Json(PathResponse {
        path: directories.downloads.clone(),
    })
}

async fn tv_shows(State(directories): State<Arc<LibraryDirectories>>) -> Result<Json<TvShowsResponse>, ApiError> {
    let base = directories.tv_shows.trim_end_matches('/');
    let shows = list_subdirectories(Path::new(base)).await?;
    let paths = shows.iter().map(|show| format!("{base}/{show}")).collect();

    Ok(Json(TvShowsResponse {
        base: directories.tv_shows.clone(),
        shows,
        paths,
    }))
}

async fn not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "Not found")
}

async fn allow_any_origin(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    print_verbose!("{method} {path} {}", response.status());
    response
}

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: message.into() })).into_response()
}

/// Sorted names of the directories directly under `path`.
///
/// Symlinks to directories are included.
async fn list_subdirectories(path: &Path) -> io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(path).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let is_dir = tokio::fs::metadata(entry.path())
            .await
            .is_ok_and(|metadata| metadata.is_dir());
        if is_dir {
            names.push(os_str_to_string(&entry.file_name()));
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod router_tests {
    use super::*;

    use std::fs;

    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tempfile::tempdir;
    use tower::ServiceExt;

    fn directories(tv_shows: &Path) -> LibraryDirectories {
        LibraryDirectories {
            movies: "/media/Movies".to_string(),
            tv_shows: tv_shows.to_str().expect("utf-8 path").to_string(),
            downloads: "/media/Downloads".to_string(),
        }
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Option<HeaderValue>, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).expect("should build request");
        let response = router.oneshot(request).await.expect("should respond");
        let status = response.status();
        let origin = response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).cloned();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("should read body")
            .to_bytes();
        let body = serde_json::from_slice(&bytes).expect("should be json");
        (status, origin, body)
    }

    #[tokio::test]
    async fn lists_sorted_show_directories() {
        let dir = tempdir().expect("should create temp dir");
        fs::create_dir(dir.path().join("Severance")).expect("should create dir");
        fs::create_dir(dir.path().join("Andor")).expect("should create dir");
        fs::write(dir.path().join("notes.txt"), "not a show").expect("should write file");

        let base = dir.path().to_str().expect("utf-8 path");
        let (status, origin, body) = get_json(create_router(directories(dir.path()), false), "/tvshows").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(origin, Some(HeaderValue::from_static("*")));
        assert_eq!(
            body,
            json!({
                "base": base,
                "shows": ["Andor", "Severance"],
                "paths": [format!("{base}/Andor"), format!("{base}/Severance")]
            })
        );
    }

    #[tokio::test]
    async fn missing_tv_directory_is_server_error() {
        let dir = tempdir().expect("should create temp dir");
        let missing = dir.path().join("missing");

        let (status, origin, body) = get_json(create_router(directories(&missing), false), "/tvshows").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(origin, Some(HeaderValue::from_static("*")));
        assert!(body["error"].as_str().is_some_and(|error| !error.is_empty()));
    }

    #[tokio::test]
    async fn movies_and_downloads_paths() {
        let dir = tempdir().expect("should create temp dir");
        let router = create_router(directories(dir.path()), false);

        let (status, _, body) = get_json(router.clone(), "/movies").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"path": "/media/Movies"}));

        let (status, _, body) = get_json(router, "/downloads").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"path": "/media/Downloads"}));
    }

    #[tokio::test]
    async fn root_lists_all_directories() {
        let dir = tempdir().expect("should create temp dir");
        let base = dir.path().to_str().expect("utf-8 path");

        let (status, _, body) = get_json(create_router(directories(dir.path()), true), "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "directories": {
                    "movies": "/media/Movies",
                    "tvshows": base,
                    "downloads": "/media/Downloads"
                }
            })
        );
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let dir = tempdir().expect("should create temp dir");

        let (status, origin, body) = get_json(create_router(directories(dir.path()), false), "/shows").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(origin, Some(HeaderValue::from_static("*")));
        assert_eq!(body, json!({"error": "Not found"}));
    }

    #[tokio::test]
    async fn response_is_readable_by_library_client_types() {
        let dir = tempdir().expect("should create temp dir");
        fs::create_dir(dir.path().join("The Office")).expect("should create dir");

        let (_, _, body) = get_json(create_router(directories(dir.path()), false), "/tvshows").await;
        let response: TvShowsResponse = serde_json::from_value(body).expect("should deserialize");
        assert_eq!(response.shows, vec!["The Office"]);
    }
}
