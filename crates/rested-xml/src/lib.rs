//! XML encoding for `rested`.
//!
//! This crate provides the XML layer used by the content negotiator when a
//! client asks for `application/xml` or `text/xml`. Any `serde::Serialize`
//! value can be encoded; the output is always a complete document.
//!
//! # Key components
//!
//! - [`to_xml`] for encoding resources, including bare sequences
//! - [`fault_to_xml`] for formatting fault responses as XML
//!
//! # Conventions
//!
//! - XML declaration: `<?xml version="1.0" encoding="UTF-8"?>`
//! - Structs are rooted at their type name
//! - Bare sequences are wrapped in a synthesized `<ItemList>` root, with one
//!   `<Item>` element per entry

pub mod error;
pub mod serialize;

pub use error::{XmlError, fault_to_xml};
pub use serialize::{XML_DECLARATION, sequence_item_name, short_type_name, to_xml};
