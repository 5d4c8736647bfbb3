//! Kernel cache implementation
//!
//! LRU cache for kernel matrix values over one set of training examples.
//! Kernel matrices are symmetric, so only K(i,j) with i <= j is stored. The
//! diagonal is computed up front and never evicted. Caching never changes a
//! returned value; a cache of size zero recomputes every entry.

use crate::data::TrainingExamples;
use crate::kernel::Kernel;
use log::debug;
use lru::LruCache;
use std::num::NonZeroUsize;

/// Bytes accounted per cached entry (key + value + overhead)
const BYTES_PER_ENTRY: usize = 16;

/// Cache key for kernel values, normalized so that i <= j
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    i: usize,
    j: usize,
}

impl CacheKey {
    /// Create a normalized cache key where i <= j
    fn new(i: usize, j: usize) -> Self {
        if i <= j {
            Self { i, j }
        } else {
            Self { i: j, j: i }
        }
    }
}

/// Memoized kernel matrix over a borrowed example set
pub struct KernelCache<'a, K: Kernel + ?Sized> {
    examples: &'a TrainingExamples,
    kernel: &'a K,
    cache: Option<LruCache<CacheKey, f64>>,
    diagonal: Vec<f64>,
    hits: u64,
    misses: u64,
}

impl<'a, K: Kernel + ?Sized> KernelCache<'a, K> {
    /// Create a cache holding at most `capacity` off-diagonal entries
    pub fn new(examples: &'a TrainingExamples, kernel: &'a K, capacity: usize) -> Self {
        let diagonal = examples.rows().map(|x| kernel.compute_diag(x)).collect();
        Self {
            examples,
            kernel,
            cache: NonZeroUsize::new(capacity).map(LruCache::new),
            diagonal,
            hits: 0,
            misses: 0,
        }
    }

    /// Create a kernel cache with capacity based on memory size in bytes
    pub fn with_memory_limit(examples: &'a TrainingExamples, kernel: &'a K, memory_bytes: usize) -> Self {
        // Never reserve more slots than the matrix has entries.
        let n = examples.len();
        let entries = n.saturating_mul(n + 1) / 2;
        let capacity = (memory_bytes / BYTES_PER_ENTRY).min(entries);
        debug!("Kernel cache: {memory_bytes} bytes, {capacity} entries for {n} examples");
        Self::new(examples, kernel, capacity)
    }

    /// A cache that stores nothing
    pub fn disabled(examples: &'a TrainingExamples, kernel: &'a K) -> Self {
        Self::new(examples, kernel, 0)
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn examples(&self) -> &'a TrainingExamples {
        self.examples
    }

    /// K(x_i, x_j)
    pub fn get(&mut self, i: usize, j: usize) -> f64 {
        if i == j {
            return self.diagonal[i];
        }
        let key = CacheKey::new(i, j);
        let Some(cache) = self.cache.as_mut() else {
            self.misses += 1;
            return self
                .kernel
                .compute(self.examples.row(key.i), self.examples.row(key.j));
        };
        if let Some(&value) = cache.get(&key) {
            self.hits += 1;
            return value;
        }
        self.misses += 1;
        let value = self
            .kernel
            .compute(self.examples.row(key.i), self.examples.row(key.j));
        cache.put(key, value);
        value
    }

    /// K(x_i, x_i)
    pub fn diag(&self, i: usize) -> f64 {
        self.diagonal[i]
    }

    /// Fill `out` with row `i` of the kernel matrix
    pub fn row_into(&mut self, i: usize, out: &mut [f64]) {
        for (j, slot) in out.iter_mut().enumerate() {
            *slot = self.get(i, j);
        }
    }

    /// Get cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            capacity: self.cache.as_ref().map_or(0, |c| c.cap().get()),
            size: self.cache.as_ref().map_or(0, |c| c.len()),
        }
    }

    /// Drop every stored entry and reset the counters
    pub fn clear(&mut self) {
        if let Some(cache) = self.cache.as_mut() {
            cache.clear();
        }
        self.hits = 0;
        self.misses = 0;
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub capacity: usize,
    pub size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::KernelFunction;

    fn examples() -> TrainingExamples {
        TrainingExamples::new(
            vec![vec![1.0, 0.0], vec![0.0, 2.0], vec![1.0, 1.0], vec![3.0, -1.0]],
            vec![1.0, -1.0, 1.0, -1.0],
            None,
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_cache_key_normalization() {
        let key1 = CacheKey::new(1, 5);
        let key2 = CacheKey::new(5, 1);
        assert_eq!(key1, key2);
        assert_eq!(key1.i, 1);
        assert_eq!(key1.j, 5);
    }

    #[test]
    fn test_cached_values_match_kernel() {
        let ex = examples();
        let kernel = KernelFunction::radial(0.5).unwrap();
        let mut cached = KernelCache::new(&ex, &kernel, 100);
        let mut uncached = KernelCache::disabled(&ex, &kernel);

        for _ in 0..2 {
            for i in 0..ex.len() {
                for j in 0..ex.len() {
                    let direct = kernel.evaluate(ex.row(i), ex.row(j));
                    assert_eq!(cached.get(i, j), direct);
                    assert_eq!(uncached.get(i, j), direct);
                }
            }
        }
        assert!(cached.stats().hits > 0);
        assert_eq!(uncached.stats().hits, 0);
        assert_eq!(uncached.stats().capacity, 0);
    }

    #[test]
    fn test_symmetric_access_hits() {
        let ex = examples();
        let kernel = KernelFunction::Dot;
        let mut cache = KernelCache::new(&ex, &kernel, 10);

        assert_eq!(cache.get(0, 2), 1.0);
        assert_eq!(cache.stats().misses, 1);
        assert_eq!(cache.get(2, 0), 1.0);
        assert_eq!(cache.stats().hits, 1);
        // diagonal is not counted
        assert_eq!(cache.get(1, 1), 4.0);
        assert_eq!(cache.stats().hits + cache.stats().misses, 2);
    }

    #[test]
    fn test_lru_eviction() {
        let ex = examples();
        let kernel = KernelFunction::Dot;
        let mut cache = KernelCache::new(&ex, &kernel, 2);

        cache.get(0, 1);
        cache.get(1, 2);
        cache.get(2, 3); // evicts (0,1)
        assert_eq!(cache.stats().size, 2);

        cache.get(0, 1);
        assert_eq!(cache.stats().hits, 0);
        assert_eq!(cache.stats().misses, 4);
    }

    #[test]
    fn test_memory_limit_and_row() {
        let ex = examples();
        let kernel = KernelFunction::Dot;
        let mut cache = KernelCache::with_memory_limit(&ex, &kernel, 1 << 20);
        // 4 examples -> at most 10 distinct entries
        assert_eq!(cache.stats().capacity, 10);

        let mut row = vec![0.0; 4];
        cache.row_into(3, &mut row);
        assert_eq!(row, vec![3.0, -2.0, 2.0, 10.0]);
    }

    #[test]
    fn test_hit_rate_and_clear() {
        let ex = examples();
        let kernel = KernelFunction::Dot;
        let mut cache = KernelCache::new(&ex, &kernel, 10);
        assert_eq!(cache.hit_rate(), 0.0);

        cache.get(0, 1);
        cache.get(0, 1);
        assert_eq!(cache.hit_rate(), 0.5);

        cache.clear();
        assert_eq!(cache.stats(), CacheStats { hits: 0, misses: 0, capacity: 10, size: 0 });
    }
}
