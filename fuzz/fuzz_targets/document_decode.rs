//! Fuzz target for typed record decoding.
//!
//! Documents arrive from a shared remote collection, so any JSON object
//! shape can show up. Decoding into every record type must return an error
//! for bad shapes, never panic.

#![no_main]

use hearth_proto::{
    from_document, Document, MessageDoc, PresenceDoc, RoomDoc, SignalDoc, TypingDoc,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    let serde_json::Value::Object(doc) = value else {
        return;
    };
    let doc: Document = doc;

    let _ = from_document::<RoomDoc>(&doc);
    let _ = from_document::<MessageDoc>(&doc);
    let _ = from_document::<TypingDoc>(&doc);
    let _ = from_document::<PresenceDoc>(&doc);
    let _ = from_document::<SignalDoc>(&doc);
});
