mod common;

use actionwire::config::{ConfigFile, RateLimitOptions, StaticService};
use actionwire::prelude::*;
use common::{AppDir, get, get_json, send};
use std::convert::Infallible;
use tower::util::BoxCloneSyncService;

fn site() -> AppDir {
    let app = AppDir::new();
    app.touch("public/index.html", "public home")
        .touch("public/app.js", "console.log('public')")
        .touch("admin/index.html", "admin home")
        .touch("cdn/logo.svg", "<svg/>");
    app
}

async fn serve(configuration: Configuration) -> Router {
    Application::builder()
        .configuration(configuration)
        .registry(MetadataRegistry::new())
        .loader(ModuleCatalog::new())
        .build()
        .await
        .unwrap()
        .into_router()
}

fn builder(app: &AppDir) -> actionwire::ConfigurationBuilder {
    Configuration::builder()
        .root_file(app.root_file())
        .api_prefix("/api")
        .debug_log(|_| {})
        .debug_error(|_| {})
}

fn on_host(uri: &str, host: &str) -> Request<Body> {
    Request::get(uri).header("host", host).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_most_specific_subdomain_wins() {
    let app = site();
    let router = serve(
        builder(&app)
            .static_files(StaticFiles::new("/", ["public"]))
            .static_files(StaticFiles::new("/", ["admin"]).subdomain("admin.app"))
            .build()
            .unwrap(),
    )
    .await;

    let (status, body) = send(&router, on_host("/", "admin.app.example.com")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"admin home");

    let (status, body) = send(&router, on_host("/", "www.example.com")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"public home");
}

#[tokio::test]
async fn test_index_file_answers_unknown_paths() {
    let app = site();
    let router = serve(
        builder(&app)
            .static_files(StaticFiles::new("/", ["public"]))
            .build()
            .unwrap(),
    )
    .await;

    let (status, body) = get(&router, "/app.js").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"console.log('public')");

    let (status, body) = get(&router, "/settings/profile").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"public home");

    // The api prefix keeps its own not-found answer.
    let (status, json) = get_json(&router, "/api/nothing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["message"], "Route not found");
}

#[tokio::test]
async fn test_disabled_index_router_falls_through() {
    let app = site();
    let router = serve(
        builder(&app)
            .static_files(StaticFiles::new("/assets", ["cdn"]).disable_index_router())
            .build()
            .unwrap(),
    )
    .await;

    let (status, body) = get(&router, "/assets/logo.svg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"<svg/>");

    let (status, json) = get_json(&router, "/assets/missing.svg").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["message"], "Route not found");

    let (status, _) = get(&router, "/other").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_disabled_index_router_may_live_under_the_api_prefix() {
    let app = site();
    let router = serve(
        builder(&app)
            .static_files(StaticFiles::new("/api/assets", ["cdn"]).disable_index_router())
            .build()
            .unwrap(),
    )
    .await;

    // The api router owns the prefix, so the rule is never reached.
    let (status, json) = get_json(&router, "/api/assets/logo.svg").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_only_get_and_head_reach_static_rules() {
    let app = site();
    let router = serve(
        builder(&app)
            .static_files(StaticFiles::new("/", ["public"]))
            .build()
            .unwrap(),
    )
    .await;

    let request = Request::post("/app.js").body(Body::empty()).unwrap();
    let (status, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rate_limited_rule_answers_429() {
    let app = site();
    let router = serve(
        builder(&app)
            .static_files(StaticFiles::new("/", ["public"]).rate_limit(RateLimitOptions::new(0.001, 1)))
            .build()
            .unwrap(),
    )
    .await;

    let (status, _) = get(&router, "/app.js").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(&router, "/app.js").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["message"], "Too many requests");
}

#[tokio::test]
async fn test_rotating_forwarded_header_does_not_reset_the_limit() {
    let app = site();
    let router = serve(
        builder(&app)
            .static_files(StaticFiles::new("/", ["public"]).rate_limit(RateLimitOptions::new(0.0, 1)))
            .build()
            .unwrap(),
    )
    .await;

    let from = |client: usize| {
        Request::get("/index.html")
            .header("x-forwarded-for", format!("198.51.100.{client}"))
            .body(Body::empty())
            .unwrap()
    };

    let (status, _) = send(&router, from(0)).await;
    assert_eq!(status, StatusCode::OK);
    for client in 1..5 {
        let (status, _) = send(&router, from(client)).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }
}

#[tokio::test]
async fn test_trusted_forwarded_header_keys_each_client() {
    let app = site();
    let limit = RateLimitOptions::new(0.0, 1).trust_forwarded_for();
    let router = serve(
        builder(&app)
            .static_files(StaticFiles::new("/", ["public"]).rate_limit(limit))
            .build()
            .unwrap(),
    )
    .await;

    let from = |client: &str| {
        Request::get("/app.js")
            .header("x-forwarded-for", client)
            .body(Body::empty())
            .unwrap()
    };

    assert_eq!(send(&router, from("203.0.113.1")).await.0, StatusCode::OK);
    assert_eq!(send(&router, from("203.0.113.2")).await.0, StatusCode::OK);
    assert_eq!(
        send(&router, from("203.0.113.1")).await.0,
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[tokio::test]
async fn test_custom_static_handler_replaces_directory_server() {
    let app = site();
    let rule = StaticFiles::new("/files", ["public"]).custom_static_handler(|directory| {
        let name = directory
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let service: StaticService =
            BoxCloneSyncService::new(tower::service_fn(move |request: Request<Body>| {
                let answer = format!("{} {}", name, request.uri().path());
                async move { Ok::<_, Infallible>(answer.into_response()) }
            }));
        service
    });

    let router = serve(builder(&app).static_files(rule).build().unwrap()).await;

    let (status, body) = get(&router, "/files/report.pdf").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"public /report.pdf");
}

#[tokio::test]
async fn test_configuration_from_toml() {
    let app = site();
    let source = format!(
        r#"
        root_file = '{}'
        api_prefix = "/api"

        [[static_files]]
        path = "/"
        directory = ["public"]

        [[static_files]]
        path = "/"
        directory = ["admin"]
        subdomain = "admin"
        "#,
        app.root_file().display()
    );

    let configuration = ConfigFile::from_toml_str(&source)
        .unwrap()
        .with_overrides(|_| None)
        .into_builder()
        .debug_log(|_| {})
        .build()
        .unwrap();
    assert_eq!(configuration.static_files().len(), 2);

    let router = serve(configuration).await;

    let (_, body) = send(&router, on_host("/", "admin.example.com")).await;
    assert_eq!(body, b"admin home");

    let (_, body) = send(&router, on_host("/", "example.com")).await;
    assert_eq!(body, b"public home");
}
