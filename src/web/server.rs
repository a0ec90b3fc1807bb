use std::net::SocketAddr;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use super::api::{AppState, create_api_router};
use crate::config::WebConfig;
use crate::tracker_service::TrackerClient;

/// `/api` routes, the optional static directory at `/`, open CORS
pub fn build_app(tracker: TrackerClient, config: &WebConfig) -> Router {
    let app = Router::new().nest("/api", create_api_router(AppState { tracker }));
    let app = match &config.static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    };
    app.layer(ServiceBuilder::new().layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)))
}

pub async fn start_web_server(tracker: TrackerClient, config: WebConfig) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_app(tracker, &config);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Journey API listening on http://{}/api", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PermissionConfig;
    use crate::journey_tracker::JourneyTracker;
    use crate::sources::{ConfiguredPermissions, SimulatedSource};
    use crate::tracker_service::TrackerService;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        let tracker = JourneyTracker::new(
            Arc::new(SimulatedSource::new(45.0, 9.0, 5.0, 0.0)),
            Arc::new(ConfiguredPermissions::new(&PermissionConfig::default())),
        );
        let (service, client) = TrackerService::new(tracker, std::time::Duration::from_secs(60));
        tokio::spawn(service.run(std::future::pending::<()>()));
        build_app(client, &WebConfig::default())
    }

    async fn call(app: Router, request: Request<Body>) -> serde_json::Value {
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_journey_start_and_stop() {
        let app = app();

        let idle = call(app.clone(), Request::get("/api/journey").body(Body::empty()).unwrap()).await;
        assert_eq!(idle["status"], "ok");
        assert_eq!(idle["data"]["is_active"], false);

        let start = Request::post("/api/journey/start")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"frequency":"10hz"}"#))
            .unwrap();
        assert_eq!(call(app.clone(), start).await["status"], "ok");

        let active = call(app.clone(), Request::get("/api/journey").body(Body::empty()).unwrap()).await;
        assert_eq!(active["data"]["is_active"], true);

        let stop = call(app.clone(), Request::post("/api/journey/stop").body(Body::empty()).unwrap()).await;
        assert_eq!(stop["data"], true);
        let stop = call(app, Request::post("/api/journey/stop").body(Body::empty()).unwrap()).await;
        assert_eq!(stop["data"], false);
    }

    #[tokio::test]
    async fn test_location_and_permission() {
        let app = app();

        let fix = call(app.clone(), Request::post("/api/location").body(Body::empty()).unwrap()).await;
        assert_eq!(fix["data"]["latitude"], 45.0);

        let permission = call(app.clone(), Request::get("/api/permission").body(Body::empty()).unwrap()).await;
        assert_eq!(permission["data"]["permission"], "undetermined");
        let granted = call(app, Request::post("/api/permission/request").body(Body::empty()).unwrap()).await;
        assert_eq!(granted["data"]["permission"], "granted");
    }
}
