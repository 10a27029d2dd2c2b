pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::auth::require_bearer;
use crate::ranking::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // Ranking API: bearer token required before any pipeline work.
    let ranking = Router::new()
        .route("/api/v1/rank", post(handlers::handle_rank))
        .route(
            "/api/v1/rank/upload",
            post(handlers::handle_rank_upload)
                .layer(DefaultBodyLimit::max(handlers::MAX_UPLOAD_BYTES)),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer,
        ));

    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        .merge(ranking)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::extraction::testing::{FakeLauncher, PageBehaviour};
    use crate::extraction::ContentExtractor;
    use crate::ranking::inference::testing::ScriptedGenerator;
    use crate::ranking::inference::InferenceClient;
    use crate::ranking::service::RankingService;

    const SECRET: &str = "test-secret-token";
    const POSTING: &str = "Globex Corporation is hiring a Data Engineer. Required: Spark, Airflow.";
    const REPLY: &str = "```json\n{\"companyName\":\"Globex Corporation\",\"positionTitle\":\"Data Engineer\",\"rank\":0.8,\"feedback\":\"Mention Airflow DAG ownership.\"}\n```";

    struct Harness {
        app: Router,
        launcher: Arc<FakeLauncher>,
        generator: Arc<ScriptedGenerator>,
    }

    fn harness(behaviour: PageBehaviour) -> Harness {
        let launcher = Arc::new(FakeLauncher::new(behaviour));
        let generator = Arc::new(ScriptedGenerator::replying(REPLY));
        let ranking = RankingService::new(
            ContentExtractor::new(launcher.clone(), Duration::from_secs(10)),
            InferenceClient::new(generator.clone(), 256, Duration::from_secs(60), 1),
            1,
        );
        let state = AppState {
            ranking: Arc::new(ranking),
            api_key: Arc::from(SECRET),
        };
        Harness {
            app: build_router(state),
            launcher,
            generator,
        }
    }

    fn rank_request(auth: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/v1/rank")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn valid_body() -> Value {
        json!({
            "url": "https://globex.example.com/careers/data-engineer",
            "resume": "Data engineer with 3 years of Spark and Airflow."
        })
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let h = harness(PageBehaviour::Ready(POSTING.into()));
        let response = h
            .app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_rank_returns_exactly_four_fields() {
        let h = harness(PageBehaviour::Ready(POSTING.into()));
        let auth = format!("Bearer {SECRET}");
        let response = h
            .app
            .oneshot(rank_request(Some(&auth), valid_body()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(
            body,
            json!({
                "companyName": "Globex Corporation",
                "positionTitle": "Data Engineer",
                "rank": 0.8,
                "feedback": "Mention Airflow DAG ownership."
            })
        );
        assert_eq!(h.launcher.counters.closed(), 1);
    }

    #[tokio::test]
    async fn test_missing_token_rejected_before_pipeline() {
        let h = harness(PageBehaviour::Ready(POSTING.into()));
        let response = h.app.oneshot(rank_request(None, valid_body())).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"]["code"], "AUTHORIZATION_ERROR");
        assert_eq!(h.launcher.counters.opened(), 0);
        assert_eq!(h.generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_wrong_token_rejected_before_pipeline() {
        let h = harness(PageBehaviour::Ready(POSTING.into()));
        let response = h
            .app
            .oneshot(rank_request(Some("Bearer not-the-secret"), valid_body()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(h.launcher.counters.opened(), 0);
        assert_eq!(h.generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_url_is_validation_error() {
        let h = harness(PageBehaviour::Ready(POSTING.into()));
        let auth = format!("Bearer {SECRET}");
        let response = h
            .app
            .oneshot(rank_request(
                Some(&auth),
                json!({"url": "careers page", "resume": "Data engineer"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(h.launcher.counters.opened(), 0);
    }

    #[tokio::test]
    async fn test_missing_resume_field_is_json_validation_error() {
        let h = harness(PageBehaviour::Ready(POSTING.into()));
        let auth = format!("Bearer {SECRET}");
        let response = h
            .app
            .oneshot(rank_request(
                Some(&auth),
                json!({"url": "https://globex.example.com/careers/data-engineer"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["error"]["message"].as_str().unwrap().contains("resume"));
        assert_eq!(h.launcher.counters.opened(), 0);
        assert_eq!(h.generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_body_is_json_validation_error() {
        let h = harness(PageBehaviour::Ready(POSTING.into()));
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/rank")
            .header(header::AUTHORIZATION, format!("Bearer {SECRET}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"url\": "))
            .unwrap();

        let response = h.app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_resume_reaches_prompt_verbatim() {
        let h = harness(PageBehaviour::Ready(POSTING.into()));
        let auth = format!("Bearer {SECRET}");
        let resume = "Data engineer\n\n\n  - Spark   (3 years)\n  - Airflow";
        let response = h
            .app
            .oneshot(rank_request(
                Some(&auth),
                json!({"url": "https://globex.example.com/careers/data-engineer", "resume": resume}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let user = h.generator.last_user.lock().unwrap().clone().unwrap();
        assert!(user.contains(resume));
    }

    #[tokio::test(start_paused = true)]
    async fn test_extraction_timeout_maps_to_gateway_timeout() {
        let h = harness(PageBehaviour::NeverReady);
        let auth = format!("Bearer {SECRET}");
        let response = h
            .app
            .oneshot(rank_request(Some(&auth), valid_body()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(json_body(response).await["error"]["code"], "EXTRACTION_TIMEOUT");
        assert_eq!(h.launcher.counters.closed(), 1);
        assert_eq!(h.generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_upload_with_text_resume() {
        let h = harness(PageBehaviour::Ready(POSTING.into()));
        let boundary = "jobfit-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"url\"\r\n\r\n\
             https://globex.example.com/careers/data-engineer\r\n\
             --{boundary}\r\n\
             Content-Disposition: form-data; name=\"resume\"; filename=\"resume.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             Data engineer,   Spark and Airflow.\r\n\
             --{boundary}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/rank/upload")
            .header(header::AUTHORIZATION, format!("Bearer {SECRET}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = h.app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["companyName"], "Globex Corporation");
        let user = h.generator.last_user.lock().unwrap().clone().unwrap();
        assert!(user.contains("Data engineer,   Spark and Airflow."));
    }

    #[tokio::test]
    async fn test_upload_without_url_is_validation_error() {
        let h = harness(PageBehaviour::Ready(POSTING.into()));
        let boundary = "jobfit-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"resume\"\r\n\r\n\
             Data engineer\r\n\
             --{boundary}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/rank/upload")
            .header(header::AUTHORIZATION, format!("Bearer {SECRET}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = h.app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(h.generator.calls(), 0);
    }
}
