//! Response compression integration tests.

#[cfg(test)]
mod tests {
    use std::io::Read;

    use flate2::read::{GzDecoder, ZlibDecoder};
    use http::StatusCode;
    use http::header::{ACCEPT_ENCODING, CONTENT_ENCODING, VARY};
    use rested_core::MuxConfig;

    use crate::{TestServer, client};

    fn vary(response: &reqwest::Response) -> Vec<String> {
        response
            .headers()
            .get_all(VARY)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(ToOwned::to_owned)
            .collect()
    }

    fn note_count(json: &str) -> usize {
        let value: serde_json::Value = serde_json::from_str(json).expect("json");
        value.as_array().map_or(0, Vec::len)
    }

    #[tokio::test]
    async fn test_should_gzip_large_bodies() {
        let server = TestServer::sample(MuxConfig::default()).await;

        let response = client()
            .get(server.url("/notes"))
            .header(ACCEPT_ENCODING, "gzip, deflate")
            .send()
            .await
            .expect("get");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(CONTENT_ENCODING)
                .and_then(|v| v.to_str().ok()),
            Some("gzip")
        );
        assert!(vary(&response).contains(&"Accept-Encoding".to_owned()));

        let compressed = response.bytes().await.expect("body");
        let mut json = String::new();
        GzDecoder::new(compressed.as_ref())
            .read_to_string(&mut json)
            .expect("gunzip");
        assert_eq!(note_count(&json), 100);
    }

    #[tokio::test]
    async fn test_should_deflate_when_only_deflate_accepted() {
        let server = TestServer::sample(MuxConfig::default()).await;

        let response = client()
            .get(server.url("/notes"))
            .header(ACCEPT_ENCODING, "gzip;q=0, deflate")
            .send()
            .await
            .expect("get");
        assert_eq!(
            response
                .headers()
                .get(CONTENT_ENCODING)
                .and_then(|v| v.to_str().ok()),
            Some("deflate")
        );

        let compressed = response.bytes().await.expect("body");
        let mut json = String::new();
        ZlibDecoder::new(compressed.as_ref())
            .read_to_string(&mut json)
            .expect("inflate");
        assert_eq!(note_count(&json), 100);
    }

    #[tokio::test]
    async fn test_should_not_compress_small_bodies() {
        let server = TestServer::sample(MuxConfig::default()).await;

        let response = client()
            .get(server.url("/notes/1"))
            .header(ACCEPT_ENCODING, "gzip")
            .send()
            .await
            .expect("get");
        assert!(response.headers().get(CONTENT_ENCODING).is_none());
    }

    #[tokio::test]
    async fn test_should_honor_configured_threshold() {
        let server =
            TestServer::sample(MuxConfig::builder().compression_threshold(usize::MAX).build())
                .await;

        let response = client()
            .get(server.url("/notes"))
            .header(ACCEPT_ENCODING, "gzip")
            .send()
            .await
            .expect("get");
        assert!(response.headers().get(CONTENT_ENCODING).is_none());
    }
}
