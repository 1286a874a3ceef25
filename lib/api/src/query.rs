//! Query strings to raw filter maps

use leadx_core::RawFilters;
use serde_json::Value;
use url::form_urlencoded;

/// Reserved for pagination, never treated as a filter
pub const PAGE_KEY: &str = "page";

/// Decode `application/x-www-form-urlencoded` pairs into filters and a page.
///
/// `key[]=a&key[]=b` and repeated `key=a&key=b` both yield an array. The
/// page defaults to 1 when absent or not a positive integer.
pub fn parse_filters(query: &str) -> (RawFilters, usize) {
    let mut filters = RawFilters::new();
    let mut page = 1;

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if key == PAGE_KEY {
            page = value.trim().parse::<usize>().ok().filter(|p| *p > 0).unwrap_or(1);
            continue;
        }

        let (key, is_list) = match key.strip_suffix("[]") {
            Some(base) => (base.to_string(), true),
            None => (key.to_string(), false),
        };
        if key.is_empty() {
            continue;
        }

        let value = Value::String(value.into_owned());
        match filters.get_mut(&key) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None if is_list => {
                filters.insert(key, Value::Array(vec![value]));
            }
            None => {
                filters.insert(key, value);
            }
        }
    }

    (filters, page)
}
