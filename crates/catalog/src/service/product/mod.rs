mod command;
mod query;

#[cfg(test)]
pub(crate) mod testing;

pub use self::command::ProductCommandService;
pub use self::query::ProductQueryService;

use serde::Serialize;

pub(crate) const PRODUCT_CACHE_PREFIX: &str = "product:";
pub(crate) const LIST_CACHE_PREFIX: &str = "products:list:";

#[derive(Serialize)]
struct ListKey<'a> {
    limit: i64,
    cursor: &'a str,
    category: &'a str,
    search: &'a str,
}

// Fixed field order keeps the key canonical: equal queries, equal keys.
pub(crate) fn list_cache_key(
    limit: i64,
    cursor: Option<&str>,
    category: Option<&str>,
    search: Option<&str>,
) -> String {
    let key = ListKey {
        limit,
        cursor: cursor.unwrap_or(""),
        category: category.unwrap_or(""),
        search: search.unwrap_or(""),
    };

    let encoded = serde_json::to_string(&key).unwrap_or_default();
    format!("{LIST_CACHE_PREFIX}{encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_queries_share_a_key() {
        assert_eq!(
            list_cache_key(20, None, Some("books"), None),
            list_cache_key(20, None, Some("books"), None)
        );
    }

    #[test]
    fn distinct_queries_get_distinct_keys() {
        let base = list_cache_key(20, None, None, None);
        assert_ne!(base, list_cache_key(21, None, None, None));
        assert_ne!(base, list_cache_key(20, Some("c"), None, None));
        assert_ne!(base, list_cache_key(20, None, Some("books"), None));
        assert_ne!(base, list_cache_key(20, None, None, Some("mug")));
        assert!(base.starts_with(LIST_CACHE_PREFIX));
    }
}
