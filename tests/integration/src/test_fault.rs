//! Fault rendering integration tests.

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use http::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
    use rested_core::MuxConfig;

    use crate::{TestServer, client};

    fn header(response: &reqwest::Response, name: http::HeaderName) -> Option<String> {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned)
    }

    #[tokio::test]
    async fn test_should_render_html_404_for_unknown_route() {
        let config = MuxConfig::builder()
            .headers(vec![("X-Served-By".to_owned(), "rested".to_owned())])
            .build();
        let server = TestServer::sample(config).await;

        let response = client()
            .get(server.url("/missing"))
            .send()
            .await
            .expect("get");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            header(&response, CONTENT_TYPE).as_deref(),
            Some("text/html; charset=utf-8")
        );
        assert_eq!(
            header(&response, http::HeaderName::from_static("x-served-by")).as_deref(),
            Some("rested")
        );
        assert!(response.headers().get(CACHE_CONTROL).is_none());
        assert!(response.text().await.expect("body").contains("404 Not Found"));
    }

    #[tokio::test]
    async fn test_should_redact_recovered_panics() {
        let server = TestServer::sample(MuxConfig::default()).await;

        let response = client()
            .get(server.url("/crash"))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .expect("get");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            header(&response, CACHE_CONTROL).as_deref(),
            Some("no-cache, no-store, must-revalidate")
        );
        let body = response.text().await.expect("body");
        assert!(!body.contains("storage backend unavailable"));
        assert!(!body.contains("stack"));
    }

    #[tokio::test]
    async fn test_should_expose_panics_in_debug_mode() {
        let server = TestServer::sample(MuxConfig::builder().debug(true).build()).await;

        let response = client()
            .get(server.url("/crash"))
            .header(ACCEPT, "text/plain")
            .send()
            .await
            .expect("get");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.text().await.expect("body");
        assert!(body.starts_with("500 (Internal Server Error)"));
        assert!(body.contains("storage backend unavailable"));
    }

    #[tokio::test]
    async fn test_should_render_json_faults() {
        let server = TestServer::sample(MuxConfig::default()).await;

        let response = client()
            .get(server.url("/notes/999"))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .expect("get");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let fault: serde_json::Value = response.json().await.expect("json");
        assert_eq!(fault["message"], "Not Found");
    }
}
