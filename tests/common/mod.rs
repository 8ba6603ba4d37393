#![allow(dead_code)]

use actionwire::axum::body::{Body, to_bytes};
use actionwire::axum::http::{Request, StatusCode};
use actionwire::axum::{Router, response::Response};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tower::ServiceExt;

/// An application root on disk.
pub struct AppDir {
    dir: TempDir,
}

impl AppDir {
    pub fn new() -> Self {
        let app = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        app.touch("main.rs", "");
        app
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn root_file(&self) -> PathBuf {
        self.path().join("main.rs")
    }

    pub fn touch(&self, relative: &str, contents: &str) -> &Self {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
        self
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response: Response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

pub async fn get(router: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    send(router, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn get_json(router: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, body) = get(router, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}
