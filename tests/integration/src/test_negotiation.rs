//! Content negotiation integration tests.

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use http::header::{ACCEPT, CONTENT_TYPE, VARY};
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
    async fn test_should_encode_json_by_default() {
        let server = TestServer::sample(MuxConfig::default()).await;

        let response = client()
            .get(server.url("/notes/1"))
            .send()
            .await
            .expect("get");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            header(&response, CONTENT_TYPE).as_deref(),
            Some("application/json; charset=utf-8")
        );
        assert_eq!(header(&response, VARY).as_deref(), Some("Accept"));
        assert_eq!(
            response.text().await.expect("body"),
            r#"{"id":1,"text":"note number 1"}"#
        );
    }

    #[tokio::test]
    async fn test_should_encode_xml_when_preferred() {
        let server = TestServer::sample(MuxConfig::default()).await;

        let response = client()
            .get(server.url("/notes/2"))
            .header(ACCEPT, "application/json;q=0.5, application/xml")
            .send()
            .await
            .expect("get");
        assert_eq!(
            header(&response, CONTENT_TYPE).as_deref(),
            Some("application/xml; charset=utf-8")
        );
        let body = response.text().await.expect("body");
        assert!(body.starts_with("<?xml"));
        assert!(body.contains("<Note>"));
        assert!(body.contains("<text>note number 2</text>"));
    }

    #[tokio::test]
    async fn test_should_encode_text_when_requested() {
        let server = TestServer::sample(MuxConfig::default()).await;

        let response = client()
            .get(server.url("/notes/3"))
            .header(ACCEPT, "text/plain")
            .send()
            .await
            .expect("get");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.text().await.expect("body"), "note number 3");
    }

    #[tokio::test]
    async fn test_should_answer_406_without_acceptable_type() {
        let server = TestServer::sample(MuxConfig::default()).await;

        let response = client()
            .get(server.url("/notes/1"))
            .header(ACCEPT, "image/png")
            .send()
            .await
            .expect("get");
        assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
        assert!(response.headers().get(http::header::ETAG).is_none());
    }

    #[tokio::test]
    async fn test_should_refuse_zero_quality_types() {
        let server = TestServer::sample(MuxConfig::default()).await;

        let response = client()
            .get(server.url("/notes/1"))
            .header(ACCEPT, "application/json;q=0, text/xml")
            .send()
            .await
            .expect("get");
        assert_eq!(
            header(&response, CONTENT_TYPE).as_deref(),
            Some("application/xml; charset=utf-8")
        );
    }
}
