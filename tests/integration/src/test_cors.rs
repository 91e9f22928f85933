//! CORS integration tests.

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use http::header::{
        ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
        ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS,
        ACCESS_CONTROL_MAX_AGE, ACCESS_CONTROL_REQUEST_HEADERS, ACCESS_CONTROL_REQUEST_METHOD,
        ORIGIN, VARY,
    };
    use rested_core::{AccessControlResponse, AccessList, CorsPreset, MuxConfig};
    use rested_http::Mux;

    use crate::{TestServer, client, sample_router};

    fn header(response: &reqwest::Response, name: http::HeaderName) -> Option<String> {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned)
    }

    #[tokio::test]
    async fn test_should_answer_permissive_preflight() {
        let server =
            TestServer::sample(MuxConfig::builder().cors(CorsPreset::Permissive).build()).await;

        let response = client()
            .request(http::Method::OPTIONS, server.url("/notes"))
            .header(ORIGIN, "http://example.com")
            .header(ACCESS_CONTROL_REQUEST_METHOD, "HEAD")
            .header(ACCESS_CONTROL_REQUEST_HEADERS, "x-requested-with, content-type")
            .send()
            .await
            .expect("options");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(header(&response, ACCESS_CONTROL_ALLOW_ORIGIN).as_deref(), Some("*"));
        assert_eq!(
            header(&response, ACCESS_CONTROL_ALLOW_METHODS).as_deref(),
            Some("HEAD, GET, POST")
        );
        assert_eq!(
            header(&response, ACCESS_CONTROL_ALLOW_HEADERS).as_deref(),
            Some("X-Requested-With, Content-Type")
        );
        assert_eq!(
            header(&response, ACCESS_CONTROL_ALLOW_CREDENTIALS).as_deref(),
            Some("true")
        );
        assert_eq!(
            header(&response, ACCESS_CONTROL_MAX_AGE).as_deref(),
            Some("86400")
        );
    }

    #[tokio::test]
    async fn test_should_limit_default_preflight() {
        let server =
            TestServer::sample(MuxConfig::builder().cors(CorsPreset::Default).build()).await;

        let response = client()
            .request(http::Method::OPTIONS, server.url("/notes"))
            .header(ORIGIN, "http://example.com")
            .header(ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .send()
            .await
            .expect("options");
        assert_eq!(header(&response, ACCESS_CONTROL_ALLOW_ORIGIN).as_deref(), Some("*"));
        assert!(response.headers().get(ACCESS_CONTROL_ALLOW_METHODS).is_none());
    }

    #[tokio::test]
    async fn test_should_decorate_simple_requests() {
        let policy = AccessControlResponse::builder()
            .origin("http://example.com")
            .methods(AccessList::of(["GET"]))
            .expose_headers(vec!["ETag".to_owned()])
            .credentials(false)
            .build();
        let server = TestServer::start(Mux::new(sample_router(), MuxConfig::default()).with_cors(policy))
            .await
            .expect("start");

        let response = client()
            .get(server.url("/notes/1"))
            .header(ORIGIN, "http://example.com")
            .send()
            .await
            .expect("get");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            header(&response, ACCESS_CONTROL_ALLOW_ORIGIN).as_deref(),
            Some("http://example.com")
        );
        assert_eq!(
            header(&response, ACCESS_CONTROL_ALLOW_CREDENTIALS).as_deref(),
            Some("false")
        );
        assert_eq!(
            header(&response, ACCESS_CONTROL_EXPOSE_HEADERS).as_deref(),
            Some("ETag")
        );
        assert!(response.headers().get(ACCESS_CONTROL_MAX_AGE).is_none());
        let vary: Vec<&str> = response
            .headers()
            .get_all(VARY)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        assert!(vary.contains(&"Origin"));
    }

    #[tokio::test]
    async fn test_should_skip_cors_when_disabled() {
        let server = TestServer::sample(MuxConfig::default()).await;

        let response = client()
            .get(server.url("/notes/1"))
            .header(ORIGIN, "http://example.com")
            .send()
            .await
            .expect("get");
        assert!(response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }
}
