//! Per-frame render cache.

use super::{DisplayMode, Rendered, Renderer};
use crate::data::{Path, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Renderings of the current frame, one per mode.
///
/// The cache knows nothing about frames; whoever changes the frame must
/// [`clear`](RenderCache::clear) it.
#[derive(Debug, Default)]
pub struct RenderCache {
    entries: HashMap<DisplayMode, Arc<Rendered>>,
    recomputations: usize,
    cache_errors: bool,
}

impl RenderCache {
    /// Create an empty cache. With `cache_errors`, placeholders are kept too.
    pub fn new(cache_errors: bool) -> Self {
        Self {
            cache_errors,
            ..Self::default()
        }
    }

    /// The cached rendering for `mode`, rendering it on a miss.
    pub fn get_or_render(
        &mut self,
        renderer: &Renderer,
        value: &Value,
        path: &Path,
        mode: DisplayMode,
    ) -> Arc<Rendered> {
        if let Some(hit) = self.entries.get(&mode) {
            return Arc::clone(hit);
        }

        self.recomputations += 1;
        tracing::debug!("Rendering {} in {} mode", path, mode);
        match renderer.try_render(value, path, mode) {
            Ok(rendered) => {
                let rendered = Arc::new(rendered);
                self.entries.insert(mode, Arc::clone(&rendered));
                rendered
            },
            Err(e) => {
                tracing::warn!("Render of {} in {} mode failed: {}", path, mode, e);
                let placeholder = Arc::new(renderer.placeholder(&e, value));
                if self.cache_errors {
                    self.entries.insert(mode, Arc::clone(&placeholder));
                }
                placeholder
            },
        }
    }

    /// Drop every cached mode.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// How many renders ran instead of hitting the cache.
    pub fn recomputations(&self) -> usize {
        self.recomputations
    }

    /// Number of cached modes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_render_is_a_hit() {
        let mut cache = RenderCache::default();
        let renderer = Renderer::default();
        let value = Value::list(vec![Value::Int(1)]);

        let first = cache.get_or_render(&renderer, &value, &Path::root(), DisplayMode::Text);
        let second = cache.get_or_render(&renderer, &value, &Path::root(), DisplayMode::Text);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.recomputations(), 1);

        cache.get_or_render(&renderer, &value, &Path::root(), DisplayMode::Table);
        assert_eq!(cache.recomputations(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn clear_drops_all_modes() {
        let mut cache = RenderCache::default();
        let renderer = Renderer::default();
        let value = Value::Int(3);
        for mode in DisplayMode::ALL {
            cache.get_or_render(&renderer, &value, &Path::root(), mode);
        }
        cache.clear();
        assert!(cache.is_empty());
        cache.get_or_render(&renderer, &value, &Path::root(), DisplayMode::Raw);
        assert_eq!(cache.recomputations(), 4);
    }

    #[test]
    fn placeholders_are_not_cached_by_default() {
        let renderer = Renderer::default();
        let value = Value::unavailable("char", "not decoded");

        let mut cache = RenderCache::default();
        cache.get_or_render(&renderer, &value, &Path::root(), DisplayMode::Text);
        cache.get_or_render(&renderer, &value, &Path::root(), DisplayMode::Text);
        assert!(cache.is_empty());
        assert_eq!(cache.recomputations(), 2);

        let mut debugging = RenderCache::new(true);
        debugging.get_or_render(&renderer, &value, &Path::root(), DisplayMode::Text);
        assert_eq!(debugging.len(), 1);
    }
}
