use database::services::FieldPatch;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginationMeta {
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(page: u64, per_page: u64, total_items: u64) -> Self {
        let total_pages = total_items.div_ceil(per_page.max(1));
        Self {
            page,
            per_page,
            total_pages,
            total_items,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: u64,

    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

/// Deserializer for fields where an omitted key, an explicit `null` and a
/// value all mean different things. Pair with `#[serde(default)]`: an absent
/// field stays `None`, `null` becomes `Some(None)`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Maps the wire tri-state onto the service layer's patch type.
pub fn patch<T>(value: Option<Option<T>>) -> FieldPatch<T> {
    match value {
        None => FieldPatch::Keep,
        Some(None) => FieldPatch::Clear,
        Some(Some(inner)) => FieldPatch::Set(inner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Payload {
        #[serde(default, deserialize_with = "double_option")]
        description: Option<Option<String>>,
    }

    #[test]
    fn omitted_null_and_value_stay_distinct() {
        let omitted: Payload = serde_json::from_str("{}").unwrap();
        assert!(patch(omitted.description).is_keep());

        let cleared: Payload = serde_json::from_str(r#"{"description":null}"#).unwrap();
        assert_eq!(patch(cleared.description), FieldPatch::<String>::Clear);

        let set: Payload = serde_json::from_str(r#"{"description":"x"}"#).unwrap();
        assert_eq!(patch(set.description), FieldPatch::Set("x".to_string()));
    }

    #[test]
    fn pagination_meta_handles_edges() {
        let meta = PaginationMeta::new(1, 20, 0);
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.has_next && !meta.has_prev);

        let meta = PaginationMeta::new(2, 20, 41);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next && meta.has_prev);
    }
}
