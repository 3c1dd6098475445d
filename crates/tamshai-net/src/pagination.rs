use serde_json::Value;
use tamshai_types::prelude::{PaginationMetadata, ResponseEnvelope};

/// Accumulates cursor pages of one query into a single array result.
///
/// Only success envelopes whose `data` is an array and that carry pagination
/// metadata start a walk; anything else is returned to the caller untouched.
#[derive(Clone, Debug)]
pub struct PageWalk {
    items: Vec<Value>,
    last: PaginationMetadata,
    pages: u32,
}

impl PageWalk {
    pub fn begin(first: &Value) -> Option<Self> {
        let envelope = ResponseEnvelope::from_value(first)?;
        let ResponseEnvelope::Success { data, .. } = &envelope else {
            return None;
        };
        let items = data.as_array()?.clone();
        let last = envelope.pagination()?.clone();
        Some(Self {
            items,
            last,
            pages: 1,
        })
    }

    pub fn pages(&self) -> u32 {
        self.pages
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Cursor to fetch next, or `None` once upstream has no more pages, the
    /// cursor is missing, or `max_pages` have been read.
    pub fn next_cursor(&self, max_pages: u32) -> Option<String> {
        if self.pages >= max_pages {
            return None;
        }
        self.last.next_page().map(str::to_string)
    }

    /// Folds in a follow-up page. Returns `false` (leaving the walk as it
    /// was) when the page is not an array success.
    pub fn absorb(&mut self, page: &Value) -> bool {
        let Some(envelope) = ResponseEnvelope::from_value(page) else {
            return false;
        };
        let ResponseEnvelope::Success { data, .. } = &envelope else {
            return false;
        };
        let Some(items) = data.as_array() else {
            return false;
        };
        self.items.extend(items.iter().cloned());
        self.last = envelope.pagination().cloned().unwrap_or_default();
        self.pages += 1;
        true
    }

    pub fn finish(self) -> Value {
        let next_cursor = self.last.next_page().map(str::to_string);
        let has_more = self.last.has_more;
        let returned_count = self.items.len();
        let hint = match (&self.last.hint, has_more) {
            (Some(hint), _) => Some(hint.clone()),
            (None, true) => Some(format!(
                "Showing {returned_count} records from {} page(s). More records exist; ask for the next page or narrow the query.",
                self.pages
            )),
            (None, false) => None,
        };
        let metadata = PaginationMetadata {
            has_more,
            next_cursor,
            returned_count,
            total_estimate: self.last.total_estimate,
            hint,
            pages_retrieved: Some(self.pages),
        };
        ResponseEnvelope::paginated(Value::Array(self.items), metadata).to_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(ids: std::ops::Range<u32>, cursor: Option<&str>) -> Value {
        let data: Vec<Value> = ids.map(|id| json!({ "id": id })).collect();
        let count = data.len();
        json!({
            "status": "success",
            "data": data,
            "metadata": {
                "hasMore": cursor.is_some(),
                "nextCursor": cursor,
                "returnedCount": count,
            }
        })
    }

    #[test]
    fn walk_requires_paginated_array_success() {
        assert!(PageWalk::begin(&json!({"status": "success", "data": {"id": 1}})).is_none());
        assert!(PageWalk::begin(&json!({"status": "success", "data": []})).is_none());
        assert!(PageWalk::begin(&json!({"status": "error", "code": "X", "message": "m"})).is_none());
        assert!(PageWalk::begin(&json!([1, 2, 3])).is_none());
        assert!(PageWalk::begin(&page(0..2, None)).is_some());
    }

    #[test]
    fn cap_stops_walk_and_keeps_cursor() {
        let mut walk = PageWalk::begin(&page(0..20, Some("c2"))).unwrap();
        assert_eq!(walk.next_cursor(2).as_deref(), Some("c2"));
        assert!(walk.absorb(&page(20..40, Some("c3"))));
        assert_eq!(walk.next_cursor(2), None);

        let done = ResponseEnvelope::from_value(&walk.finish()).unwrap();
        let meta = done.pagination().unwrap();
        assert!(meta.has_more);
        assert_eq!(meta.next_cursor.as_deref(), Some("c3"));
        assert_eq!(meta.returned_count, 40);
        assert_eq!(meta.pages_retrieved, Some(2));
        assert!(meta.hint.is_some());
    }

    #[test]
    fn upstream_has_more_survives_without_cursor() {
        let first = json!({
            "status": "success",
            "data": [1, 2],
            "metadata": { "hasMore": true, "returnedCount": 2 }
        });
        let walk = PageWalk::begin(&first).unwrap();
        assert_eq!(walk.next_cursor(10), None);

        let done = ResponseEnvelope::from_value(&walk.finish()).unwrap();
        let meta = done.pagination().unwrap();
        assert!(meta.has_more);
        assert_eq!(meta.next_cursor, None);
        assert_eq!(meta.pages_retrieved, Some(1));
        assert!(meta.hint.is_some());
    }

    #[test]
    fn rejected_page_leaves_walk_untouched() {
        let mut walk = PageWalk::begin(&page(0..5, Some("c2"))).unwrap();
        assert!(!walk.absorb(&json!({"status": "error", "code": "X", "message": "m"})));
        assert_eq!((walk.len(), walk.pages()), (5, 1));
        assert_eq!(walk.next_cursor(10).as_deref(), Some("c2"));
    }
}
