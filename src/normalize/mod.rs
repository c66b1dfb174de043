//! Field normalization -- turn one raw message string into a typed,
//! partially-populated structured view for display.
//!
//! The normalizer is a pure, total function: it never errors, falling back
//! to [`StructuredView::Generic`] on any ambiguity. Two incompatible log
//! shapes are recognized: comma-delimited web access lines and
//! dictionary-shaped Windows security events.

mod web;
mod windows;

use serde::Serialize;

/// The structured interpretation of a raw log message. Derived per render,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum StructuredView {
    WebAccess {
        ip: Option<String>,
        method: Option<String>,
        status: Option<String>,
        country: Option<String>,
    },
    WindowsEvent {
        event_id: String,
        description: String,
        raw_text: String,
    },
    Generic,
}

/// Classify a message into its structured view.
///
/// Detection order: web access line, then Windows event dictionary, then
/// generic. A web-access candidate with none of ip/method/status falls
/// through to the next detector rather than producing an empty view.
pub fn structure(message: &str) -> StructuredView {
    if message.contains(',') {
        if let Some(view) = web::parse(message) {
            return view;
        }
    }
    if let Some(view) = windows::parse(message) {
        return view;
    }
    StructuredView::Generic
}
