//! Range request integration tests.

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use http::header::{ACCEPT_RANGES, CONTENT_RANGE, IF_RANGE, RANGE, VARY};
    use rested_core::MuxConfig;

    use crate::{TestServer, client};

    fn header(response: &reqwest::Response, name: http::HeaderName) -> Option<String> {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned)
    }

    fn vary(response: &reqwest::Response) -> Vec<String> {
        response
            .headers()
            .get_all(VARY)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(ToOwned::to_owned)
            .collect()
    }

    async fn ids(response: reqwest::Response) -> Vec<u64> {
        let notes: serde_json::Value = response.json().await.expect("json");
        notes
            .as_array()
            .expect("array")
            .iter()
            .filter_map(|n| n["id"].as_u64())
            .collect()
    }

    #[tokio::test]
    async fn test_should_serve_partial_content() {
        let server = TestServer::sample(MuxConfig::default()).await;

        let response = client()
            .get(server.url("/notes"))
            .header(RANGE, "notes=0-39")
            .send()
            .await
            .expect("get");
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            header(&response, CONTENT_RANGE).as_deref(),
            Some("notes 0-39/100")
        );
        assert_eq!(header(&response, ACCEPT_RANGES).as_deref(), Some("notes"));
        assert!(vary(&response).contains(&"Range".to_owned()));
        assert_eq!(ids(response).await, (0..40).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn test_should_clamp_open_ended_range() {
        let server = TestServer::sample(MuxConfig::default()).await;

        let response = client()
            .get(server.url("/notes"))
            .header(RANGE, "notes=95-")
            .send()
            .await
            .expect("get");
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            header(&response, CONTENT_RANGE).as_deref(),
            Some("notes 95-99/100")
        );
        assert_eq!(ids(response).await, vec![95, 96, 97, 98, 99]);
    }

    #[tokio::test]
    async fn test_should_answer_416_past_the_extent() {
        let server = TestServer::sample(MuxConfig::default()).await;

        let response = client()
            .get(server.url("/notes"))
            .header(RANGE, "notes=150-")
            .send()
            .await
            .expect("get");
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(header(&response, CONTENT_RANGE).as_deref(), Some("*/100"));
    }

    #[tokio::test]
    async fn test_should_ignore_unusable_ranges() {
        let server = TestServer::sample(MuxConfig::default()).await;

        for range in ["bytes=0-10", "notes=10-2", "notes=abc"] {
            let response = client()
                .get(server.url("/notes"))
                .header(RANGE, range)
                .send()
                .await
                .expect("get");
            assert_eq!(response.status(), StatusCode::OK, "range {range}");
            assert!(response.headers().get(CONTENT_RANGE).is_none());
            assert_eq!(ids(response).await.len(), 100);
        }
    }

    #[tokio::test]
    async fn test_should_serve_full_resource_when_if_range_differs() {
        let server = TestServer::sample(MuxConfig::default()).await;

        let response = client()
            .get(server.url("/notes"))
            .header(RANGE, "notes=0-9")
            .header(IF_RANGE, "\"notebook-99\"")
            .send()
            .await
            .expect("get");
        assert_eq!(response.status(), StatusCode::OK);

        let response = client()
            .get(server.url("/notes"))
            .header(RANGE, "notes=0-9")
            .header(IF_RANGE, "notebook-100")
            .send()
            .await
            .expect("get");
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    }

    #[tokio::test]
    async fn test_should_not_advertise_ranges_on_plain_resources() {
        let server = TestServer::sample(MuxConfig::default()).await;

        let response = client()
            .get(server.url("/notes/1"))
            .header(RANGE, "notes=0-1")
            .send()
            .await
            .expect("get");
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(ACCEPT_RANGES).is_none());
    }
}
