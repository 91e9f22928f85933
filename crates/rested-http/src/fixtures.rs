//! Resources shared by the unit tests of this crate.

use std::io;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use futures::StreamExt;
use rested_core::{
    ContentRange, Fault, Range, RangeError, Ranger, RawBody, RawHandler, Resource,
};
use serde::Serialize;

pub(crate) fn modified() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2014, 4, 14, 10, 0, 0)
        .single()
        .expect("valid date")
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Person {
    pub id: u32,
    pub name: String,
}

impl Person {
    pub(crate) fn new(id: u32, name: &str) -> Self {
        Self {
            id,
            name: name.to_owned(),
        }
    }
}

impl Resource for Person {
    fn etag(&self) -> String {
        format!("p{}-123", self.id)
    }

    fn last_modified(&self) -> DateTime<Utc> {
        modified()
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(30)
    }

    fn text(&self) -> Option<String> {
        Some(self.name.clone())
    }
}

/// A collection served in `resources` ranges.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub(crate) struct People(pub Vec<Person>);

impl People {
    pub(crate) fn generate(count: u32) -> Self {
        Self((0..count).map(|i| Person::new(i, &format!("person {i}"))).collect())
    }
}

impl Resource for People {
    fn etag(&self) -> String {
        format!("people-{}", self.0.len())
    }

    fn last_modified(&self) -> DateTime<Utc> {
        modified()
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(30)
    }

    fn as_ranger(&self) -> Option<&dyn Ranger> {
        Some(self)
    }
}

impl Ranger for People {
    fn units(&self) -> &[&str] {
        &["resources"]
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
            Box::new(People(slice)),
        ))
    }
}

/// A resource that writes its own streamed body.
#[derive(Debug, Serialize)]
pub(crate) struct Ticker;

impl Resource for Ticker {
    fn etag(&self) -> String {
        "ticker".to_owned()
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
        let chunks: Vec<Result<Bytes, io::Error>> =
            (1..=3).map(|i| Ok(Bytes::from(format!("tick {i}\n")))).collect();
        Ok(RawBody::Stream(futures::stream::iter(chunks).boxed()))
    }
}
