//! crates/memory_wall_core/src/backdrop.rs
//!
//! Decorative photo rotation shown behind the introduction.

use std::time::Duration;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

const REUNION_IMAGES: [u32; 36] = [
    1, 2, 3, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 27,
    28, 30, 31, 32, 33, 34, 36, 37, 38, 40, 43,
];

/// A cyclic cursor over image paths.
#[derive(Debug, Clone)]
pub struct Backdrop {
    images: Vec<String>,
    index: usize,
}

impl Backdrop {
    /// Returns `None` for an empty image list.
    pub fn new(images: Vec<String>) -> Option<Self> {
        if images.is_empty() {
            None
        } else {
            Some(Self { images, index: 0 })
        }
    }

    pub fn reunion() -> Self {
        let images = REUNION_IMAGES
            .iter()
            .map(|n| format!("/image{}.jpeg", n))
            .collect();
        Self { images, index: 0 }
    }

    pub fn current(&self) -> (usize, &str) {
        (self.index, &self.images[self.index])
    }

    /// Moves to the next image, wrapping around at the end.
    pub fn tick(&mut self) -> (usize, &str) {
        self.index = (self.index + 1) % self.images.len();
        self.current()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
