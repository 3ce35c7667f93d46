#![forbid(unsafe_code)]

//! Lower-bound binary search used by every positional lookup in the engine:
//! index-of-value in a sorted column, time-delay lookups, and locating a
//! best-average window start in a delta series.

/// Clamp an optional `[start, end)` restriction into `[0, len]`, swapping a
/// reversed range.
#[must_use]
pub fn normalize_range(start: Option<usize>, end: Option<usize>, len: usize) -> (usize, usize) {
    let start = start.unwrap_or(0).min(len);
    let end = end.unwrap_or(len).min(len);
    if start > end { (end, start) } else { (start, end) }
}

/// Insertion index that keeps `items[start..end)` sorted under `le`.
///
/// `le(query, element)` must mean "query sorts at or before element".
/// Returns the leftmost index in the range whose element satisfies `le`,
/// `end` when the query sorts after every element, and `start` for an empty
/// range. O(log n), no side effects.
pub fn insertion_point<T, Q, F>(
    items: &[T],
    query: &Q,
    start: Option<usize>,
    end: Option<usize>,
    le: F,
) -> usize
where
    F: Fn(&Q, &T) -> bool,
{
    let (mut lo, mut hi) = normalize_range(start, end, items.len());
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if le(query, &items[mid]) {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

/// Keyed variant: elements are projected through `key` before comparison.
pub fn insertion_point_by_key<T, K, P, F>(
    items: &[T],
    query: &K,
    start: Option<usize>,
    end: Option<usize>,
    key: P,
    le: F,
) -> usize
where
    P: Fn(&T) -> K,
    F: Fn(&K, &K) -> bool,
{
    insertion_point(items, query, start, end, |q, item| le(q, &key(item)))
}
