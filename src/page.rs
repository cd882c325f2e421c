//! Defines [`Page`], one slice of a paginated sequence, and [`paginate`] which
//! splits a list of items into pages.

use gtmpl_value::Value;
use std::collections::HashMap;

/// One page of a longer sequence. The indexer itself only reads `current` and
/// `is_first`; the remaining fields are passed through to templates.
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    /// The 1-based page number.
    pub current: usize,

    /// True for the first page in the sequence.
    pub is_first: bool,

    /// True for the last page in the sequence.
    pub is_last: bool,

    /// The total number of pages in the sequence.
    pub total: usize,

    /// The items on this page.
    pub items: Vec<Value>,

    /// The number of the previous page, if any.
    pub prev: Option<usize>,

    /// The number of the next page, if any.
    pub next: Option<usize>,
}

impl Page {
    /// Creates a bare page descriptor with no items. `total` is set to
    /// `current`, so the page is also the last one until told otherwise.
    pub fn new(current: usize, is_first: bool) -> Page {
        Page {
            current,
            is_first,
            is_last: true,
            total: current,
            items: Vec::new(),
            prev: None,
            next: None,
        }
    }
}

impl From<&Page> for Value {
    /// Converts a [`Page`] into a [`Value::Object`] with fields `current`,
    /// `is_first`, `is_last`, `total`, `items`, `prev`, and `next`.
    fn from(page: &Page) -> Value {
        let number = |n: Option<usize>| match n {
            Some(n) => Value::from(n as u64),
            None => Value::Nil,
        };

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("current".to_owned(), Value::from(page.current as u64));
        m.insert("is_first".to_owned(), Value::from(page.is_first));
        m.insert("is_last".to_owned(), Value::from(page.is_last));
        m.insert("total".to_owned(), Value::from(page.total as u64));
        m.insert("items".to_owned(), Value::Array(page.items.clone()));
        m.insert("prev".to_owned(), number(page.prev));
        m.insert("next".to_owned(), number(page.next));
        Value::Object(m)
    }
}

/// Splits `items` into pages of at most `limit` items each. Pages are
/// numbered from 1. A `limit` of zero is treated as one.
pub fn paginate(items: Vec<Value>, limit: usize) -> Vec<Page> {
    let limit = limit.max(1);
    let total = match items.len() % limit {
        0 => items.len() / limit,
        _ => items.len() / limit + 1,
    };

    items
        .chunks(limit)
        .enumerate()
        .map(|(i, chunk)| {
            let current = i + 1;
            Page {
                current,
                is_first: i == 0,
                is_last: current == total,
                total,
                items: chunk.to_vec(),
                prev: match i {
                    0 => None,
                    _ => Some(current - 1),
                },
                next: match current < total {
                    false => None,
                    true => Some(current + 1),
                },
            }
        })
        .collect()
}
