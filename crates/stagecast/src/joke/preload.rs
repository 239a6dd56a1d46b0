use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::JokeSet;

/// A fetched joke asset. Images and gifs are decoded (first frame) so the
/// native audience window can upload them without touching the network.
#[derive(Debug, Clone)]
pub struct PreloadedAsset {
    pub size_bytes: usize,
    pub image: Option<Arc<image::RgbaImage>>,
}

impl PreloadedAsset {
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.image.as_ref().map(|img| img.dimensions())
    }
}

#[derive(Debug, Default)]
struct PreloadState {
    assets: HashMap<String, PreloadedAsset>,
    in_flight: HashSet<String>,
}

/// Best-effort background fetcher for joke media.
#[derive(Debug, Clone, Default)]
pub struct Preloader {
    state: Arc<Mutex<PreloadState>>,
}

impl Preloader {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, PreloadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start fetching every media asset referenced by `jokes` and return
    /// immediately. Nothing waits on the result; failures are dropped.
    pub fn preload(&self, jokes: &JokeSet) {
        for joke in &jokes.jokes {
            let Some(src) = joke.content.media_src() else {
                continue;
            };
            {
                let mut state = self.state();
                if state.assets.contains_key(src) || !state.in_flight.insert(src.to_string()) {
                    continue;
                }
            }

            let src = src.to_string();
            let decode = joke.content.is_image();
            let state = Arc::clone(&self.state);
            rayon::spawn(move || {
                let result = fetch(&src).map(|bytes| PreloadedAsset {
                    size_bytes: bytes.len(),
                    image: decode
                        .then(|| image::load_from_memory(&bytes).ok())
                        .flatten()
                        .map(|img| Arc::new(img.into_rgba8())),
                });
                let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
                state.in_flight.remove(&src);
                match result {
                    Ok(asset) => {
                        tracing::debug!("preloaded {src} ({} bytes)", asset.size_bytes);
                        state.assets.insert(src, asset);
                    }
                    Err(e) => tracing::debug!("preload of {src} failed: {e}"),
                }
            });
        }
    }

    pub fn preloaded_count(&self) -> usize {
        self.state().assets.len()
    }

    /// Fetches started but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.state().in_flight.len()
    }

    pub fn get(&self, src: &str) -> Option<PreloadedAsset> {
        self.state().assets.get(src).cloned()
    }
}

fn fetch(src: &str) -> Result<Vec<u8>, String> {
    if src.starts_with("http://") || src.starts_with("https://") {
        let mut response = ureq::get(src).call().map_err(|e| e.to_string())?;
        return response.body_mut().read_to_vec().map_err(|e| e.to_string());
    }
    let path = src.strip_prefix("file://").unwrap_or(src);
    std::fs::read(path).map_err(|e| e.to_string())
}
