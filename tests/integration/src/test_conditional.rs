//! Conditional request integration tests.

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use http::header::{ETAG, EXPIRES, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
    use rested_core::MuxConfig;
    use rested_core::headers::format_http_date;

    use crate::{TestServer, client, modified};

    #[tokio::test]
    async fn test_should_answer_304_for_repeated_etag() {
        let server = TestServer::sample(MuxConfig::default()).await;

        let first = client()
            .get(server.url("/notes/5"))
            .send()
            .await
            .expect("get");
        assert_eq!(first.status(), StatusCode::OK);
        let etag = first
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned)
            .expect("etag");
        assert_eq!(etag, "note-5");
        assert!(first.headers().get(EXPIRES).is_some());

        let second = client()
            .get(server.url("/notes/5"))
            .header(IF_NONE_MATCH, format!("\"other\", \"{etag}\""))
            .send()
            .await
            .expect("get");
        assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(
            second.headers().get(ETAG).and_then(|v| v.to_str().ok()),
            Some("note-5")
        );
        assert!(second.bytes().await.expect("body").is_empty());
    }

    #[tokio::test]
    async fn test_should_answer_304_for_unchanged_date() {
        let server = TestServer::sample(MuxConfig::default()).await;

        let response = client()
            .get(server.url("/notes/5"))
            .header(IF_MODIFIED_SINCE, format_http_date(modified()))
            .send()
            .await
            .expect("get");
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(
            response
                .headers()
                .get(LAST_MODIFIED)
                .and_then(|v| v.to_str().ok()),
            Some("Mon, 14 Apr 2014 10:00:00 GMT")
        );
    }

    #[tokio::test]
    async fn test_should_serve_when_modified_after_date() {
        let server = TestServer::sample(MuxConfig::default()).await;

        let earlier = modified() - chrono::Duration::hours(1);
        let response = client()
            .get(server.url("/notes/5"))
            .header(IF_MODIFIED_SINCE, format_http_date(earlier))
            .send()
            .await
            .expect("get");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_should_match_wildcard_etag() {
        let server = TestServer::sample(MuxConfig::default()).await;

        let response = client()
            .get(server.url("/notes"))
            .header(IF_NONE_MATCH, "*")
            .send()
            .await
            .expect("get");
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    }
}
