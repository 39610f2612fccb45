//! Annotation factory
//!
//! The single choke point for annotation lookups. `create` and `has` answer
//! single-name queries cache-first; `create_all` materializes every
//! occurrence of a comment in encounter order. Parsing runs at most once per
//! (comment, target) pair per process — repeated lookups for different
//! annotation names on the same declaration reuse the memoized parse.

use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashMap, FxHasher};

use super::cache::AnnotationCache;
use super::parser::{self, ParsedComment, RawAnnotation};
use super::{Annotation, AnnotationError, Annotations};

/// Creates [`Annotation`]s from doc comments, backed by the process-wide
/// [`AnnotationCache`] and a per-comment parse memo.
pub struct AnnotationFactory {
    cache: AnnotationCache,
    parsed: FxHashMap<u64, ParsedComment>,
    parse_count: usize,
}

impl Default for AnnotationFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationFactory {
    /// Create a factory with an empty, non-persistent cache.
    pub fn new() -> Self {
        Self::with_cache(AnnotationCache::new())
    }

    /// Create a factory around a pre-configured cache.
    pub fn with_cache(cache: AnnotationCache) -> Self {
        Self {
            cache,
            parsed: FxHashMap::default(),
            parse_count: 0,
        }
    }

    /// The annotation of the given name on the given declaration.
    ///
    /// Cache hit returns the cached value; a recorded absence fails without
    /// re-parsing. On a miss the comment is parsed (memoized), the **last**
    /// occurrence of the name wins, and the result — present or absent — is
    /// recorded in the cache.
    pub fn create(
        &mut self,
        comment: &str,
        name: &str,
        target: &str,
    ) -> Result<Annotation, AnnotationError> {
        if self.cache.has(target, name) {
            if let Some(cached) = self.cache.get(target, name) {
                return Ok(cached.clone());
            }
        }

        if self.cache.has_not(target, name) {
            return Err(AnnotationError::NotFound {
                name: name.to_string(),
                target: target.to_string(),
            });
        }

        let raw = self.parse_memoized(comment, target).last(name).cloned();
        match raw {
            Some(raw) => {
                let annotation = build(&raw, target);
                self.cache.put(target, name, Some(annotation.clone()));
                Ok(annotation)
            }
            None => {
                // record that the annotation does not exist
                self.cache.put(target, name, None);
                Err(AnnotationError::NotFound {
                    name: name.to_string(),
                    target: target.to_string(),
                })
            }
        }
    }

    /// Whether the declaration carries the given annotation.
    pub fn has(&mut self, comment: &str, name: &str, target: &str) -> bool {
        self.create(comment, name, target).is_ok()
    }

    /// Every annotation of the declaration, duplicates preserved in
    /// encounter order.
    ///
    /// The single-name cache is seeded with the last occurrence per name so
    /// later [`create`](Self::create) calls agree with the last-wins rule.
    pub fn create_all(&mut self, comment: &str, target: &str) -> Annotations {
        let raws: Vec<RawAnnotation> = self.parse_memoized(comment, target).all().to_vec();

        let mut all = Annotations::new();
        for raw in &raws {
            let annotation = build(raw, target);
            self.cache.put(target, &raw.name, Some(annotation.clone()));
            all.push(annotation);
        }
        all
    }

    /// How many comments have actually been parsed (memo misses).
    pub fn parse_count(&self) -> usize {
        self.parse_count
    }

    /// The underlying cache, e.g. for configuring persistence.
    pub fn cache_mut(&mut self) -> &mut AnnotationCache {
        &mut self.cache
    }

    /// Clear the cache, the parse memo, and all counters.
    pub fn stop(&mut self) {
        self.cache.stop();
        self.parsed.clear();
        self.parse_count = 0;
    }

    fn parse_memoized(&mut self, comment: &str, target: &str) -> &ParsedComment {
        let key = memo_key(comment, target);
        if !self.parsed.contains_key(&key) {
            self.parsed.insert(key, parser::parse(comment));
            self.parse_count += 1;
        }
        &self.parsed[&key]
    }
}

fn memo_key(comment: &str, target: &str) -> u64 {
    let mut hasher = FxHasher::default();
    comment.hash(&mut hasher);
    target.hash(&mut hasher);
    hasher.finish()
}

fn build(raw: &RawAnnotation, target: &str) -> Annotation {
    let mut annotation = Annotation::new(raw.name.clone(), target);
    if let Some(value) = &raw.value {
        annotation = annotation.with_value(value.clone());
    }
    for (key, value) in &raw.params {
        annotation = annotation.with_param(key.clone(), value.clone());
    }
    annotation
}
