//! XML error types and fault formatting.
//!
//! This module provides the `XmlError` type for XML encoding failures and the
//! `fault_to_xml` function for formatting fault responses.

use std::io;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesText, Event};

/// Errors that can occur while encoding XML.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    /// An I/O error during XML writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The serde serializer rejected the value.
    #[error("XML serialization error: {0}")]
    Serialize(String),

    /// The encoded document is not valid UTF-8.
    #[error("XML output is not valid UTF-8")]
    Utf8,
}

/// Format a fault as XML.
///
/// # Example output
///
/// ```xml
/// <?xml version="1.0" encoding="UTF-8"?>
/// <Error>
///   <Message>Not Found</Message>
///   <Description>No resource could be found at the requested URI.</Description>
/// </Error>
/// ```
///
/// `Description` is omitted when empty and `Stack` only appears when frames
/// were captured.
pub fn fault_to_xml(message: &str, description: &str, stack: &[String]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);
    // Writing to Vec<u8> is infallible; if this fails it means a logic error.
    if let Err(e) = write_fault_xml(&mut buf, message, description, stack) {
        tracing::error!(error = %e, "failed to serialize fault XML");
        buf.clear();
    }
    buf
}

fn write_fault_xml(
    buf: &mut Vec<u8>,
    message: &str,
    description: &str,
    stack: &[String],
) -> io::Result<()> {
    let mut writer = Writer::new(buf);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    writer.create_element("Error").write_inner_content(|w| {
        w.create_element("Message")
            .write_text_content(BytesText::new(message))?;
        if !description.is_empty() {
            w.create_element("Description")
                .write_text_content(BytesText::new(description))?;
        }
        if !stack.is_empty() {
            w.create_element("Stack").write_inner_content(|s| {
                for frame in stack {
                    s.create_element("Frame")
                        .write_text_content(BytesText::new(frame))?;
                }
                Ok(())
            })?;
        }
        Ok(())
    })?;

    Ok(())
}
