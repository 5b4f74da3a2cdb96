#![forbid(unsafe_code)]

/// Decodes a JSON id-array column. A missing, empty or corrupt value reads
/// as the empty set; a read must never abort on bad stored JSON.
pub(in crate::store) fn parse_id_array(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    if raw.trim().is_empty() {
        return Vec::new();
    }
    serde_json::from_str::<Vec<String>>(raw).unwrap_or_default()
}

pub(in crate::store) fn encode_id_array(ids: &[String]) -> String {
    serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string())
}

/// Opaque caller-defined metadata; corrupt stored JSON reads as absent.
pub(in crate::store) fn parse_metadata(raw: Option<&str>) -> Option<serde_json::Value> {
    let raw = raw?;
    serde_json::from_str(raw).ok()
}
