pub mod health;

use axum::{routing::get, Router};

use crate::jobs::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/",
            get(handlers::handle_index).post(handlers::handle_command_post),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::test_pool;
    use crate::session::{SessionStore, SESSION_COOKIE};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    /// Minimal browser: remembers the session cookie and the CSRF token.
    struct Browser {
        app: Router,
        cookie: Option<String>,
        csrf: Option<String>,
    }

    impl Browser {
        async fn new() -> Self {
            let state = AppState {
                db: test_pool().await,
                config: Config {
                    database_url: "sqlite::memory:".into(),
                    port: 0,
                    rust_log: "debug".into(),
                    display_tz: chrono_tz::UTC,
                },
                sessions: SessionStore::default(),
            };
            Browser {
                app: build_router(state),
                cookie: None,
                csrf: None,
            }
        }

        async fn send(&mut self, request: Request<Body>) -> Response {
            let response = self.app.clone().oneshot(request).await.unwrap();
            if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
                let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
                self.cookie = Some(pair.to_string());
            }
            response
        }

        async fn get(&mut self, uri: &str) -> Response {
            let mut request = Request::get(uri);
            if let Some(cookie) = &self.cookie {
                request = request.header(header::COOKIE, cookie);
            }
            self.send(request.body(Body::empty()).unwrap()).await
        }

        async fn page(&mut self, uri: &str) -> Value {
            let response = self.get(uri).await;
            assert_eq!(response.status(), StatusCode::OK);
            let page = json_body(response).await;
            self.csrf = page["csrf_token"].as_str().map(str::to_string);
            page
        }

        async fn post(&mut self, uri: &str, pairs: &[(&str, &str)]) -> Response {
            let mut fields = pairs.to_vec();
            if let Some(csrf) = &self.csrf {
                fields.push(("csrf", csrf.as_str()));
            }
            let body = serde_urlencoded::to_string(&fields).unwrap();
            let mut request = Request::post(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
            if let Some(cookie) = &self.cookie {
                request = request.header(header::COOKIE, cookie);
            }
            self.send(request.body(Body::from(body)).unwrap()).await
        }
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn text_body(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn job_titles(page: &Value) -> Vec<String> {
        page["jobs"]
            .as_array()
            .unwrap()
            .iter()
            .map(|j| j["title"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_health() {
        let mut browser = Browser::new().await;
        let response = browser.get("/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_first_visit_issues_session_and_token() {
        let mut browser = Browser::new().await;
        let page = browser.page("/").await;

        assert!(browser.cookie.as_deref().unwrap().starts_with(SESSION_COOKIE));
        assert_eq!(page["csrf_token"].as_str().unwrap().len(), 64);
        assert_eq!(page["filter_status"], "all");
        assert_eq!(
            page["statuses"],
            serde_json::json!(["Applied", "Screening", "Interviewing", "Offer", "Rejected"])
        );
        assert!(page["flash"].is_null());

        let token = page["csrf_token"].clone();
        let again = browser.page("/").await;
        assert_eq!(again["csrf_token"], token);
    }

    #[tokio::test]
    async fn test_post_without_session_is_forbidden() {
        let mut browser = Browser::new().await;
        let response = browser
            .post("/", &[("action", "create"), ("title", "Dev"), ("company", "Acme")])
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            json_body(response).await["error"]["message"],
            "Invalid CSRF token."
        );
    }

    #[tokio::test]
    async fn test_post_with_wrong_token_changes_nothing() {
        let mut browser = Browser::new().await;
        browser.page("/").await;
        browser.csrf = Some("0".repeat(64));

        let response = browser
            .post("/", &[("action", "create"), ("title", "Dev"), ("company", "Acme")])
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let page = browser.page("/").await;
        assert!(job_titles(&page).is_empty());
    }

    #[tokio::test]
    async fn test_validation_failure_still_renders_listing() {
        let mut browser = Browser::new().await;
        browser.page("/").await;
        browser
            .post("/", &[("action", "create"), ("title", "Existing"), ("company", "Acme")])
            .await;

        let response = browser
            .post(
                "/",
                &[
                    ("action", "create"),
                    ("title", "Dev"),
                    ("company", "Acme"),
                    ("next_action_date", "2024-02-30"),
                ],
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let page = json_body(response).await;
        assert_eq!(page["flash"]["kind"], "error");
        assert_eq!(
            page["flash"]["message"],
            "Invalid follow-up date (use YYYY-MM-DD)."
        );
        assert_eq!(job_titles(&page), vec!["Existing"]);
    }

    #[tokio::test]
    async fn test_search_by_company_only() {
        let mut browser = Browser::new().await;
        browser.page("/").await;
        for (title, company, location) in [
            ("Platform Engineer", "Initech", "Remote"),
            ("Data Engineer", "Umbrella Corp", "Berlin"),
        ] {
            browser
                .post(
                    "/",
                    &[
                        ("action", "create"),
                        ("title", title),
                        ("company", company),
                        ("location", location),
                    ],
                )
                .await;
        }

        let page = browser.page("/?status=all&q=umbrella").await;
        assert_eq!(job_titles(&page), vec!["Data Engineer"]);
        assert_eq!(page["q"], "umbrella");
    }

    #[tokio::test]
    async fn test_reserved_characters_in_form_values_are_stored_verbatim() {
        let mut browser = Browser::new().await;
        browser.page("/").await;
        let notes = "C++ & Rust = 100% fun; a+b=c?\nnext line";
        let response = browser
            .post(
                "/",
                &[
                    ("action", "create"),
                    ("title", "Dev & Ops"),
                    ("company", "Société Générale"),
                    ("url", "https://example.com/jobs?id=7&ref=a b"),
                    ("notes", notes),
                ],
            )
            .await;
        let page = json_body(response).await;
        assert_eq!(page["flash"]["kind"], "ok");

        let job = &page["jobs"][0];
        assert_eq!(job["title"], "Dev & Ops");
        assert_eq!(job["company"], "Société Générale");
        assert_eq!(job["url"], "https://example.com/jobs?id=7&ref=a b");
        assert_eq!(job["notes"], notes);

        let found = browser.page("/?q=SOCI%C3%89T%C3%89").await;
        assert_eq!(job_titles(&found), vec!["Dev & Ops"]);
    }

    #[tokio::test]
    async fn test_unknown_status_filter_lists_everything() {
        let mut browser = Browser::new().await;
        browser.page("/").await;
        browser
            .post("/", &[("action", "create"), ("title", "Dev"), ("company", "Acme")])
            .await;

        let page = browser.page("/?status=Hired").await;
        assert_eq!(page["filter_status"], "all");
        assert_eq!(job_titles(&page), vec!["Dev"]);
    }

    #[tokio::test]
    async fn test_lifecycle_scenario() {
        let mut browser = Browser::new().await;
        browser.page("/").await;

        let response = browser
            .post(
                "/",
                &[
                    ("action", "create"),
                    ("title", "Backend Engineer"),
                    ("company", "Acme"),
                    ("status", "Applied"),
                ],
            )
            .await;
        let page = json_body(response).await;
        assert_eq!(page["flash"]["kind"], "ok");
        assert_eq!(page["flash"]["message"], "Application added!");

        let page = browser.page("/?status=all").await;
        let first = &page["jobs"][0];
        assert_eq!(first["title"], "Backend Engineer");
        assert_eq!(first["status"], "Applied");
        let id = first["id"].as_i64().unwrap().to_string();

        let response = browser
            .post(
                "/",
                &[("action", "update_status"), ("id", id.as_str()), ("status", "Offer")],
            )
            .await;
        assert_eq!(json_body(response).await["flash"]["message"], "Status updated.");

        let offers = browser.page("/?status=Offer").await;
        assert_eq!(offers["jobs"].as_array().unwrap().len(), 1);
        assert_eq!(offers["jobs"][0]["id"].as_i64().unwrap().to_string(), id);

        let response = browser.post("/", &[("action", "delete"), ("id", id.as_str())]).await;
        assert_eq!(
            json_body(response).await["flash"]["message"],
            "Application removed."
        );

        for filter in ["all", "Applied", "Screening", "Interviewing", "Offer", "Rejected"] {
            let page = browser.page(&format!("/?status={filter}")).await;
            assert!(job_titles(&page).is_empty(), "{filter}");
        }

        let response = browser.post("/", &[("action", "delete"), ("id", id.as_str())]).await;
        let page = json_body(response).await;
        assert_eq!(page["flash"]["kind"], "ok");
        assert_eq!(page["flash"]["message"], "Application removed.");
    }

    #[tokio::test]
    async fn test_post_listing_honours_query_filters() {
        let mut browser = Browser::new().await;
        browser.page("/").await;
        browser
            .post("/", &[("action", "create"), ("title", "Kept"), ("company", "A"), ("status", "Offer")])
            .await;

        let response = browser
            .post(
                "/?status=Offer",
                &[("action", "create"), ("title", "Hidden"), ("company", "B")],
            )
            .await;
        let page = json_body(response).await;
        assert_eq!(page["filter_status"], "Offer");
        assert_eq!(job_titles(&page), vec!["Kept"]);
    }

    #[tokio::test]
    async fn test_csv_export_ignores_filters() {
        let mut browser = Browser::new().await;
        browser.page("/").await;
        browser
            .post("/", &[("action", "create"), ("title", "Old"), ("company", "A")])
            .await;
        browser
            .post(
                "/",
                &[("action", "create"), ("title", "New"), ("company", "B, Ltd"), ("status", "Offer")],
            )
            .await;

        let response = browser.get("/?export=csv&status=Rejected&q=zzz").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"jobtrackr_export_"));
        assert!(disposition.ends_with(".csv\""));

        let body = text_body(response).await;
        let mut reader = csv::Reader::from_reader(body.as_bytes());
        let titles: Vec<String> = reader
            .records()
            .map(|r| r.unwrap()[1].to_string())
            .collect();
        assert_eq!(titles, vec!["New", "Old"]);
        assert!(body.contains("\"B, Ltd\""));
    }

    #[tokio::test]
    async fn test_ics_export_contains_only_dated_jobs() {
        let mut browser = Browser::new().await;
        browser.page("/").await;
        for (title, date) in [("Later", "2025-06-01"), ("Undated", ""), ("Sooner", "2025-01-15")] {
            browser
                .post(
                    "/",
                    &[
                        ("action", "create"),
                        ("title", title),
                        ("company", "Acme"),
                        ("next_action_date", date),
                    ],
                )
                .await;
        }

        let response = browser.get("/?export=ics").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/calendar; charset=utf-8"
        );
        let body = text_body(response).await;
        assert_eq!(body.matches("BEGIN:VEVENT\r\n").count(), 2);
        let sooner = body.find("SUMMARY:Follow-up: Sooner @ Acme").unwrap();
        let later = body.find("SUMMARY:Follow-up: Later @ Acme").unwrap();
        assert!(sooner < later);
        assert!(!body.contains("Undated"));
    }
}
