//! Bounded worker fan-out over independent entities.

use std::thread;

/// Apply `f` to every item, on up to `workers` scoped threads.
///
/// Items are split into disjoint contiguous chunks, one per thread, so an
/// item is only ever touched by a single worker. Returns after every item
/// has been processed.
pub(crate) fn for_each_mut<T, F>(items: &mut [T], workers: usize, f: F)
where
    T: Send,
    F: Fn(&mut T) + Sync,
{
    if workers <= 1 || items.len() <= 1 {
        items.iter_mut().for_each(f);
        return;
    }
    let chunk_len = items.len().div_ceil(workers);
    let f = &f;
    thread::scope(|scope| {
        for chunk in items.chunks_mut(chunk_len) {
            scope.spawn(move || chunk.iter_mut().for_each(f));
        }
    });
}
