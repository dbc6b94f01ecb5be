//! Static HTML served by the map server.
//!
//! Pages are `&'static str` templates with `__PLACEHOLDER__` slots filled at
//! request time, so the binary needs no asset directory.

pub mod page;

/// Serializes `value` for embedding inside a `<script>` element.
pub fn json_for_script<T: serde::Serialize>(value: &T) -> serde_json::Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}
