//! End-to-end tests for rested.
//!
//! Every test starts a [`TestServer`] serving a [`Mux`] on an ephemeral local
//! port and talks to it over real TCP connections with `reqwest`.
//!
//! Run them with:
//! ```text
//! cargo test -p rested-integration
//! ```

use std::io;
use std::sync::Once;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use futures::StreamExt;
use rested_core::{
    ContentRange, Fault, MuxConfig, Range, RangeError, Ranger, RawBody, RawHandler, Resource,
};
use rested_http::{Created, Endpoint, Mux, PatternRouter};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// A server running on an ephemeral port until dropped.
#[derive(Debug)]
pub struct TestServer {
    base: String,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    /// Bind `127.0.0.1:0` and serve `mux` in the background.
    pub async fn start(mux: Mux) -> anyhow::Result<Self> {
        init_tracing();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (tx, rx) = oneshot::channel::<()>();

        tokio::spawn(rested_http::serve(listener, mux, async {
            rx.await.ok();
        }));

        Ok(Self {
            base: format!("http://{addr}"),
            shutdown: Some(tx),
        })
    }

    /// Start a server for [`sample_router`] with `config`.
    pub async fn sample(config: MuxConfig) -> Self {
        Self::start(Mux::new(sample_router(), config))
            .await
            .expect("start test server")
    }

    /// Absolute URL of `path` on this server.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// An HTTP client without proxies, automatic decompression or redirects.
#[must_use]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("build reqwest client")
}

/// Modification time of every sample resource.
#[must_use]
pub fn modified() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2014, 4, 14, 10, 0, 0)
        .single()
        .expect("valid date")
}

/// A single note.
#[derive(Debug, Clone, Serialize)]
pub struct Note {
    /// Identifier.
    pub id: u32,
    /// Content.
    pub text: String,
}

impl Note {
    /// Create a note.
    #[must_use]
    pub fn new(id: u32, text: &str) -> Self {
        Self {
            id,
            text: text.to_owned(),
        }
    }
}

impl Resource for Note {
    fn etag(&self) -> String {
        format!("note-{}", self.id)
    }

    fn last_modified(&self) -> DateTime<Utc> {
        modified()
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(60)
    }

    fn text(&self) -> Option<String> {
        Some(self.text.clone())
    }
}

/// A collection of notes served in `notes` ranges.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct Notebook(pub Vec<Note>);

impl Notebook {
    /// A notebook of `count` notes numbered from zero.
    #[must_use]
    pub fn generate(count: u32) -> Self {
        Self((0..count).map(|i| Note::new(i, &format!("note number {i}"))).collect())
    }
}

impl Resource for Notebook {
    fn etag(&self) -> String {
        format!("notebook-{}", self.0.len())
    }

    fn last_modified(&self) -> DateTime<Utc> {
        modified()
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(60)
    }

    fn as_ranger(&self) -> Option<&dyn Ranger> {
        Some(self)
    }
}

impl Ranger for Notebook {
    fn units(&self) -> &[&str] {
        &["notes"]
    }

    fn count(&self) -> u64 {
        self.0.len() as u64
    }

    fn range(&self, range: &Range) -> Result<(ContentRange, Box<dyn Resource>), RangeError> {
        let from = usize::try_from(range.from).unwrap_or(usize::MAX);
        let to = usize::try_from(range.to).unwrap_or(usize::MAX);
        let slice = self.0.get(from..=to).unwrap_or_default().to_vec();
        Ok((
            ContentRange::new(range.clone(), self.count()),
            Box::new(Notebook(slice)),
        ))
    }
}

/// A resource streaming three lines in separate chunks.
#[derive(Debug, Serialize)]
pub struct Ticker;

impl Resource for Ticker {
    fn etag(&self) -> String {
        String::new()
    }

    fn last_modified(&self) -> DateTime<Utc> {
        modified()
    }

    fn ttl(&self) -> Duration {
        Duration::ZERO
    }

    fn as_raw_handler(&self) -> Option<&dyn RawHandler> {
        Some(self)
    }
}

impl RawHandler for Ticker {
    fn serve_raw(
        &self,
        _request: &http::request::Parts,
        response: &mut http::response::Parts,
    ) -> Result<RawBody, Fault> {
        response.headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("text/plain"),
        );
        let chunks: Vec<Result<Bytes, io::Error>> = (1..=3)
            .map(|i| Ok(Bytes::from(format!("tick {i}\n"))))
            .collect();
        Ok(RawBody::Stream(futures::stream::iter(chunks).boxed()))
    }
}

/// Routes shared by the tests:
///
/// | Route | Behavior |
/// |-------|----------|
/// | `/notes` | GET a 100 note [`Notebook`]; POST JSON creates note 100 |
/// | `/notes/{id}` | GET, PUT, DELETE a note below 100, else 404 |
/// | `/empty` | GET answers no resource |
/// | `/ticks` | GET streams a [`Ticker`] |
/// | `/crash` | GET panics |
#[must_use]
pub fn sample_router() -> PatternRouter {
    fn note(id: Option<&str>) -> Result<Note, Fault> {
        id.and_then(|raw| raw.parse::<u32>().ok())
            .filter(|id| *id < 100)
            .map(|id| Note::new(id, &format!("note number {id}")))
            .ok_or_else(Fault::not_found)
    }

    PatternRouter::new()
        .with_route(
            "/notes",
            Endpoint::new()
                .get_fn(|_| Ok(Some(Box::new(Notebook::generate(100)))))
                .post_fn(|ctx| {
                    ctx.require_content_type(&["application/json"])?;
                    Ok(Created::new(Note::new(100, "created")).with_location("/notes/100"))
                }),
        )
        .and_then(|router| {
            router.with_route(
                "/notes/{id:[0-9]+}",
                Endpoint::new()
                    .get_fn(|ctx| Ok(Some(Box::new(note(ctx.var("id"))?))))
                    .put_fn(|ctx| Ok(Some(Box::new(note(ctx.var("id"))?))))
                    .delete_fn(|ctx| note(ctx.var("id")).map(|_| ())),
            )
        })
        .and_then(|router| router.with_route("/empty", Endpoint::new().get_fn(|_| Ok(None))))
        .and_then(|router| {
            router.with_route("/ticks", Endpoint::new().get_fn(|_| Ok(Some(Box::new(Ticker)))))
        })
        .and_then(|router| {
            router.with_route(
                "/crash",
                Endpoint::new().get_fn(|_| panic!("storage backend unavailable")),
            )
        })
        .expect("valid sample routes")
}

mod test_compression;
mod test_conditional;
mod test_cors;
mod test_dispatch;
mod test_fault;
mod test_negotiation;
mod test_range;
