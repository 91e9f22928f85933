//! Per-verb dispatch integration tests.

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use http::header::{ALLOW, CONTENT_LENGTH, CONTENT_TYPE, LOCATION, TRANSFER_ENCODING};
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
    async fn test_should_answer_head_without_body() {
        let server = TestServer::sample(MuxConfig::default()).await;

        let get = client()
            .get(server.url("/notes/1"))
            .send()
            .await
            .expect("get");
        let length = get.bytes().await.expect("body").len();

        let head = client()
            .head(server.url("/notes/1"))
            .send()
            .await
            .expect("head");
        assert_eq!(head.status(), StatusCode::OK);
        assert_eq!(header(&head, CONTENT_LENGTH), Some(length.to_string()));
        assert!(head.bytes().await.expect("body").is_empty());
    }

    #[tokio::test]
    async fn test_should_list_methods_on_options() {
        let server = TestServer::sample(MuxConfig::default()).await;

        let response = client()
            .request(http::Method::OPTIONS, server.url("/notes/1"))
            .send()
            .await
            .expect("options");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            header(&response, ALLOW).as_deref(),
            Some("HEAD, GET, PUT, DELETE")
        );
        assert!(
            header(&response, CONTENT_TYPE)
                .is_some_and(|types| types.starts_with("application/json"))
        );
    }

    #[tokio::test]
    async fn test_should_answer_405_for_missing_capability() {
        let server = TestServer::sample(MuxConfig::default()).await;

        let response = client()
            .patch(server.url("/notes/1"))
            .send()
            .await
            .expect("patch");
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            header(&response, ALLOW).as_deref(),
            Some("HEAD, GET, PUT, DELETE")
        );
    }

    #[tokio::test]
    async fn test_should_create_with_location() {
        let server = TestServer::sample(MuxConfig::default()).await;

        let response = client()
            .post(server.url("/notes"))
            .header(CONTENT_TYPE, "application/json")
            .body(r#"{"text":"created"}"#)
            .send()
            .await
            .expect("post");
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(header(&response, LOCATION).as_deref(), Some("/notes/100"));
    }

    #[tokio::test]
    async fn test_should_reject_unsupported_media_type() {
        let server = TestServer::sample(MuxConfig::default()).await;

        let response = client()
            .post(server.url("/notes"))
            .header(CONTENT_TYPE, "text/csv")
            .body("text\ncreated\n")
            .send()
            .await
            .expect("post");
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_should_answer_200_on_put_and_204_on_delete() {
        let server = TestServer::sample(MuxConfig::default()).await;

        let response = client()
            .put(server.url("/notes/4"))
            .send()
            .await
            .expect("put");
        assert_eq!(response.status(), StatusCode::OK);

        let response = client()
            .delete(server.url("/notes/4"))
            .send()
            .await
            .expect("delete");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = client()
            .delete(server.url("/notes/400"))
            .send()
            .await
            .expect("delete");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_should_answer_204_without_resource() {
        let server = TestServer::sample(MuxConfig::default()).await;

        let response = client()
            .get(server.url("/empty"))
            .send()
            .await
            .expect("get");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_should_stream_raw_bodies() {
        let server = TestServer::sample(MuxConfig::default()).await;

        let response = client()
            .get(server.url("/ticks"))
            .send()
            .await
            .expect("get");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header(&response, TRANSFER_ENCODING).as_deref(), Some("chunked"));
        assert_eq!(
            response.text().await.expect("body"),
            "tick 1\ntick 2\ntick 3\n"
        );
    }
}
