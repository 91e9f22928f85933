//! An in-memory people collection served over rested.
//!
//! | Route | Methods |
//! |-------|---------|
//! | `/people` | HEAD, GET (ranges in `people` units), POST |
//! | `/people/{id}` | HEAD, GET, PATCH, PUT, DELETE |

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rested_core::{
    ContentRange, Fault, Range, RangeError, Ranger, Resource, validate_conditions,
};
use rested_http::{
    Created, Deleter, Getter, Patcher, Poster, Putter, RequestContext, ResourceResult,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Content types accepted for request bodies.
const JSON_BODY: &[&str] = &["application/json"];

/// How long clients may cache a person.
const PERSON_TTL: Duration = Duration::from_secs(30);

/// A stored person.
#[derive(Debug, Clone, Serialize)]
pub struct Person {
    /// Identifier assigned on creation.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Contact address, possibly empty.
    pub email: String,
    #[serde(skip)]
    version: u64,
    #[serde(skip)]
    updated: DateTime<Utc>,
}

impl Resource for Person {
    fn etag(&self) -> String {
        format!("person-{}-v{}", self.id, self.version)
    }

    fn last_modified(&self) -> DateTime<Utc> {
        self.updated
    }

    fn ttl(&self) -> Duration {
        PERSON_TTL
    }

    fn text(&self) -> Option<String> {
        if self.email.is_empty() {
            Some(self.name.clone())
        } else {
            Some(format!("{} <{}>", self.name, self.email))
        }
    }
}

/// The whole collection, or a slice of it.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct PersonList {
    people: Vec<Person>,
    #[serde(skip)]
    total: u64,
    #[serde(skip)]
    revision: u64,
    #[serde(skip)]
    updated: DateTime<Utc>,
}

impl Resource for PersonList {
    fn etag(&self) -> String {
        format!("people-r{}-{}", self.revision, self.people.len())
    }

    fn last_modified(&self) -> DateTime<Utc> {
        self.updated
    }

    fn ttl(&self) -> Duration {
        Duration::ZERO
    }

    fn as_ranger(&self) -> Option<&dyn Ranger> {
        Some(self)
    }
}

impl Ranger for PersonList {
    fn units(&self) -> &[&str] {
        &["people"]
    }

    fn count(&self) -> u64 {
        self.total
    }

    fn range(&self, range: &Range) -> Result<(ContentRange, Box<dyn Resource>), RangeError> {
        let from = usize::try_from(range.from).unwrap_or(usize::MAX);
        let to = usize::try_from(range.to).unwrap_or(usize::MAX);
        let slice = PersonList {
            people: self.people.get(from..=to).unwrap_or_default().to_vec(),
            total: self.total,
            revision: self.revision,
            updated: self.updated,
        };
        Ok((ContentRange::new(range.clone(), self.total), Box::new(slice)))
    }
}

/// Body of POST and PUT requests.
#[derive(Debug, Deserialize)]
struct PersonInput {
    name: String,
    #[serde(default)]
    email: String,
}

/// Body of PATCH requests.
#[derive(Debug, Deserialize)]
struct PersonPatch {
    name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    people: BTreeMap<u64, Person>,
    next_id: u64,
    revision: u64,
    updated: DateTime<Utc>,
}

impl State {
    fn touch(&mut self) -> DateTime<Utc> {
        self.revision += 1;
        self.updated = Utc::now();
        self.updated
    }
}

/// Thread-safe storage for people.
#[derive(Debug, Default)]
pub struct PeopleStore {
    state: RwLock<State>,
}

impl PeopleStore {
    /// A store holding `count` generated people.
    #[must_use]
    pub fn seeded(count: u64) -> Self {
        let store = Self::default();
        for i in 1..=count {
            store.create(format!("Person {i}"), format!("person{i}@example.com"));
        }
        store
    }

    /// Snapshot of the collection.
    #[must_use]
    pub fn list(&self) -> PersonList {
        let state = self.state.read();
        PersonList {
            people: state.people.values().cloned().collect(),
            total: state.people.len() as u64,
            revision: state.revision,
            updated: state.updated,
        }
    }

    /// Look up a person.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<Person> {
        self.state.read().people.get(&id).cloned()
    }

    /// Add a person and return it.
    pub fn create(&self, name: String, email: String) -> Person {
        let mut state = self.state.write();
        state.next_id += 1;
        let person = Person {
            id: state.next_id,
            name,
            email,
            version: 1,
            updated: state.touch(),
        };
        state.people.insert(person.id, person.clone());
        person
    }

    /// Apply `change` to a person after checking the request preconditions
    /// against its current state.
    fn modify<F>(&self, id: u64, ctx: &RequestContext, change: F) -> Result<Person, Fault>
    where
        F: FnOnce(&mut Person),
    {
        let mut state = self.state.write();
        let current = state.people.get(&id).ok_or_else(Fault::not_found)?;
        if validate_conditions(current, ctx.headers()) {
            return Err(Fault::precondition_failed());
        }
        let updated = state.touch();
        let person = state.people.get_mut(&id).ok_or_else(Fault::not_found)?;
        change(person);
        person.version += 1;
        person.updated = updated;
        Ok(person.clone())
    }

    /// Remove a person; false when it did not exist.
    pub fn remove(&self, id: u64) -> bool {
        let mut state = self.state.write();
        let removed = state.people.remove(&id).is_some();
        if removed {
            state.touch();
        }
        removed
    }
}

fn person_id(ctx: &RequestContext) -> Result<u64, Fault> {
    ctx.var("id")
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(Fault::not_found)
}

fn parse_body<'a, T: Deserialize<'a>>(ctx: &'a RequestContext) -> Result<T, Fault> {
    ctx.require_content_type(JSON_BODY)?;
    serde_json::from_slice(&ctx.body)
        .map_err(|e| Fault::bad_request("Invalid JSON body", &e.to_string()))
}

/// `/people`
#[derive(Debug, Clone)]
pub struct PeopleCollection(pub Arc<PeopleStore>);

impl Getter for PeopleCollection {
    fn get(&self, _ctx: &RequestContext) -> ResourceResult {
        Ok(Some(Box::new(self.0.list())))
    }
}

impl Poster for PeopleCollection {
    fn post(&self, ctx: &RequestContext) -> Result<Created, Fault> {
        let input: PersonInput = parse_body(ctx)?;
        if input.name.trim().is_empty() {
            return Err(Fault::bad_request("Missing name", "A person needs a non-empty name."));
        }
        let person = self.0.create(input.name, input.email);
        info!(id = person.id, "person created");
        let location = format!("/people/{}", person.id);
        Ok(Created::new(person).with_location(location))
    }
}

/// `/people/{id}`
#[derive(Debug, Clone)]
pub struct PersonItem(pub Arc<PeopleStore>);

impl Getter for PersonItem {
    fn get(&self, ctx: &RequestContext) -> ResourceResult {
        let person = self.0.get(person_id(ctx)?).ok_or_else(Fault::not_found)?;
        Ok(Some(Box::new(person)))
    }
}

impl Putter for PersonItem {
    fn put(&self, ctx: &RequestContext) -> ResourceResult {
        let id = person_id(ctx)?;
        let input: PersonInput = parse_body(ctx)?;
        let person = self.0.modify(id, ctx, |person| {
            person.name = input.name;
            person.email = input.email;
        })?;
        Ok(Some(Box::new(person)))
    }
}

impl Patcher for PersonItem {
    fn patch(&self, ctx: &RequestContext) -> ResourceResult {
        let id = person_id(ctx)?;
        let patch: PersonPatch = parse_body(ctx)?;
        let person = self.0.modify(id, ctx, |person| {
            if let Some(name) = patch.name {
                person.name = name;
            }
            if let Some(email) = patch.email {
                person.email = email;
            }
        })?;
        Ok(Some(Box::new(person)))
    }
}

impl Deleter for PersonItem {
    fn delete(&self, ctx: &RequestContext) -> Result<(), Fault> {
        let id = person_id(ctx)?;
        if self.0.remove(id) {
            info!(id, "person deleted");
            Ok(())
        } else {
            Err(Fault::not_found())
        }
    }
}
