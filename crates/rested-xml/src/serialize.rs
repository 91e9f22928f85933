//! XML serialization: converting resources to well-formed XML documents.
//!
//! Resources are encoded with quick-xml's serde support. Two gaps of generic
//! XML encoding are closed here:
//!
//! - The XML declaration is always present.
//! - A bare sequence has no legal root element, so one is synthesized from the
//!   element type name: a `Vec<Person>` becomes `<PersonList><Person>...</Person></PersonList>`.
//!   Newtypes over a sequence get the same treatment; whether a value is a
//!   sequence is decided by how it serializes, not by its type name.

use serde::Serialize;
use serde::ser::{self, Impossible, SerializeMap};

use crate::error::XmlError;

/// The XML declaration prepended to every encoded document.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Container types whose serde representation is a sequence.
const SEQUENCE_TYPES: &[&str] = &[
    "Vec",
    "VecDeque",
    "LinkedList",
    "BTreeSet",
    "HashSet",
    "BinaryHeap",
];

/// Wrapper types whose serde representation is that of their first type
/// argument.
const TRANSPARENT_TYPES: &[&str] = &["Box", "Arc", "Rc", "Cow", "Envelope"];

/// Serialize a value as a complete XML document.
///
/// Structs are rooted at their own type name. Anything that serializes as a
/// sequence, including newtypes over a `Vec`, is wrapped in a `<{Item}List>`
/// root. Any other value without an intrinsic element name (maps,
/// primitives) is rooted at its short type name.
///
/// The item name comes from the static element type when the type itself is
/// a sequence, else from the struct name of the first entry, else `Item`.
///
/// # Errors
///
/// Returns `XmlError::Serialize` if quick-xml rejects the value.
pub fn to_xml<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, XmlError> {
    let type_name = std::any::type_name::<T>();

    let body = if let Shape::Sequence(first) = Shape::of(value) {
        let item = sequence_item_name(type_name)
            .or_else(|| first.map(str::to_owned))
            .unwrap_or_else(|| "Item".to_owned());
        let root = format!("{item}List");
        let wrapper = SequenceRoot {
            item: &item,
            items: value,
        };
        quick_xml::se::to_string_with_root(&root, &wrapper)
    } else {
        quick_xml::se::to_string(value).or_else(|_| {
            quick_xml::se::to_string_with_root(&short_type_name(type_name), value)
        })
    }
    .map_err(|e| XmlError::Serialize(e.to_string()))?;

    Ok(with_declaration(body).into_bytes())
}

fn with_declaration(body: String) -> String {
    if body.trim_start().starts_with("<?xml") {
        return body;
    }
    let mut doc = String::with_capacity(XML_DECLARATION.len() + body.len());
    doc.push_str(XML_DECLARATION);
    doc.push_str(&body);
    doc
}

/// A single-entry map `{item: items}`, which quick-xml writes as one `<item>`
/// element per sequence entry.
struct SequenceRoot<'a, T: ?Sized> {
    item: &'a str,
    items: &'a T,
}

impl<T: Serialize + ?Sized> Serialize for SequenceRoot<'_, T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.item, self.items)?;
        map.end()
    }
}

/// How a value presents itself to serde, as far as choosing a root goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    /// A sequence, with the struct name of its first entry when it has one.
    Sequence(Option<&'static str>),
    /// A named struct.
    Struct(&'static str),
    /// Anything else.
    Other,
}

impl Shape {
    /// Inspect `value` without encoding it. Only the outer layers and the
    /// first sequence entry are visited.
    fn of<T: Serialize + ?Sized>(value: &T) -> Self {
        value.serialize(ShapeInspector).unwrap_or(Self::Other)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct InspectError(String);

impl ser::Error for InspectError {
    fn custom<M: std::fmt::Display>(msg: M) -> Self {
        Self(msg.to_string())
    }
}

impl InspectError {
    fn unsupported() -> Self {
        Self("no sequence or struct shape".to_owned())
    }
}

/// A serializer that only reports the [`Shape`] of a value. Newtypes and
/// options are looked through, the way quick-xml encodes them.
#[derive(Debug)]
struct ShapeInspector;

macro_rules! other_shape {
    ($($method:ident($ty:ty)),* $(,)?) => {
        $(
            fn $method(self, _: $ty) -> Result<Shape, InspectError> {
                Ok(Shape::Other)
            }
        )*
    };
}

impl ser::Serializer for ShapeInspector {
    type Ok = Shape;
    type Error = InspectError;
    type SerializeSeq = SequenceInspector;
    type SerializeTuple = SequenceInspector;
    type SerializeTupleStruct = Impossible<Shape, InspectError>;
    type SerializeTupleVariant = Impossible<Shape, InspectError>;
    type SerializeMap = Impossible<Shape, InspectError>;
    type SerializeStruct = StructInspector;
    type SerializeStructVariant = Impossible<Shape, InspectError>;

    other_shape! {
        serialize_bool(bool),
        serialize_i8(i8),
        serialize_i16(i16),
        serialize_i32(i32),
        serialize_i64(i64),
        serialize_u8(u8),
        serialize_u16(u16),
        serialize_u32(u32),
        serialize_u64(u64),
        serialize_f32(f32),
        serialize_f64(f64),
        serialize_char(char),
        serialize_str(&str),
        serialize_bytes(&[u8]),
        serialize_unit_struct(&'static str),
    }

    fn serialize_none(self) -> Result<Shape, InspectError> {
        Ok(Shape::Other)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Shape, InspectError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Shape, InspectError> {
        Ok(Shape::Other)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
    ) -> Result<Shape, InspectError> {
        Ok(Shape::Other)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Shape, InspectError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Shape, InspectError> {
        Ok(Shape::Other)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<SequenceInspector, InspectError> {
        Ok(SequenceInspector::default())
    }

    fn serialize_tuple(self, _len: usize) -> Result<SequenceInspector, InspectError> {
        Ok(SequenceInspector::default())
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, InspectError> {
        Err(InspectError::unsupported())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, InspectError> {
        Err(InspectError::unsupported())
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, InspectError> {
        Err(InspectError::unsupported())
    }

    fn serialize_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<StructInspector, InspectError> {
        Ok(StructInspector(name))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, InspectError> {
        Err(InspectError::unsupported())
    }
}

/// Records the struct name of the first entry and skips the rest.
#[derive(Debug, Default)]
struct SequenceInspector {
    seen: bool,
    first: Option<&'static str>,
}

impl SequenceInspector {
    fn visit<T: Serialize + ?Sized>(&mut self, value: &T) {
        if !self.seen {
            self.seen = true;
            if let Shape::Struct(name) = Shape::of(value) {
                self.first = Some(name);
            }
        }
    }

    fn finish(self) -> Shape {
        Shape::Sequence(self.first)
    }
}

impl ser::SerializeSeq for SequenceInspector {
    type Ok = Shape;
    type Error = InspectError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), InspectError> {
        self.visit(value);
        Ok(())
    }

    fn end(self) -> Result<Shape, InspectError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTuple for SequenceInspector {
    type Ok = Shape;
    type Error = InspectError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), InspectError> {
        self.visit(value);
        Ok(())
    }

    fn end(self) -> Result<Shape, InspectError> {
        Ok(self.finish())
    }
}

#[derive(Debug)]
struct StructInspector(&'static str);

impl ser::SerializeStruct for StructInspector {
    type Ok = Shape;
    type Error = InspectError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _key: &'static str,
        _value: &T,
    ) -> Result<(), InspectError> {
        Ok(())
    }

    fn end(self) -> Result<Shape, InspectError> {
        Ok(Shape::Struct(self.0))
    }
}

/// Return the element name for the items of a sequence type, or `None` if
/// `type_name` does not name a sequence.
///
/// # Examples
///
/// ```
/// use rested_xml::sequence_item_name;
///
/// assert_eq!(
///     sequence_item_name("alloc::vec::Vec<app::Person>").as_deref(),
///     Some("Person")
/// );
/// assert_eq!(sequence_item_name("[app::Person; 3]").as_deref(), Some("Person"));
/// assert_eq!(sequence_item_name("app::Person"), None);
/// ```
#[must_use]
pub fn sequence_item_name(type_name: &str) -> Option<String> {
    let name = strip_reference(type_name);

    if let Some(inner) = name.strip_prefix('[') {
        let inner = inner.strip_suffix(']')?;
        return Some(short_type_name(split_top_level(inner, ';').trim()));
    }

    let (head, args) = split_generic(name);
    let segment = last_segment(head);
    if TRANSPARENT_TYPES.contains(&segment) {
        return sequence_item_name(split_top_level(args?, ','));
    }
    if SEQUENCE_TYPES.contains(&segment) {
        return Some(short_type_name(split_top_level(args?, ',')));
    }
    None
}

/// Return the unqualified name of a type, without module path or generic
/// arguments. Transparent pointers resolve to their pointee.
///
/// # Examples
///
/// ```
/// use rested_xml::short_type_name;
///
/// assert_eq!(short_type_name("app::model::Person"), "Person");
/// assert_eq!(short_type_name("alloc::sync::Arc<app::Person>"), "Person");
/// assert_eq!(short_type_name("app::Page<app::Person>"), "Page");
/// ```
#[must_use]
pub fn short_type_name(type_name: &str) -> String {
    let name = strip_reference(type_name).trim();
    if name.starts_with('[') || name.starts_with('(') {
        return "Item".to_owned();
    }

    let (head, args) = split_generic(name);
    let segment = last_segment(head);
    if let Some(args) = args {
        if TRANSPARENT_TYPES.contains(&segment) {
            return short_type_name(split_top_level(args, ','));
        }
    }
    segment.to_owned()
}

fn strip_reference(name: &str) -> &str {
    let name = name.trim_start_matches('&');
    name.strip_prefix("mut ").unwrap_or(name)
}

fn split_generic(name: &str) -> (&str, Option<&str>) {
    match name.find('<') {
        Some(start) if name.ends_with('>') => (&name[..start], Some(&name[start + 1..name.len() - 1])),
        _ => (name, None),
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// Return the prefix of `s` before the first `sep` that is not nested inside
/// brackets.
fn split_top_level(s: &str, sep: char) -> &str {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '<' | '[' | '(' => depth += 1,
            '>' | ']' | ')' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => return s[..i].trim(),
            _ => {}
        }
    }
    s.trim()
}
