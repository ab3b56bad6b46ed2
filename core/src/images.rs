//! Pet image lists and gallery selection.
//!
//! The backend stores a pet's images as one comma-delimited string of
//! filenames. This is split into an ordered list on read; empty entries are
//! dropped, so `split_images(&join_images(&names)) == names` for any list of
//! non-empty, comma-free names.

use crate::config::ClientConfig;
use crate::types::Pet;

pub fn split_images(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_images(names: &[String]) -> String {
    names.join(",")
}

/// Gallery view over a pet's images, tracking which image is displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gallery {
    images: Vec<String>,
    selected: usize,
}

impl Gallery {
    pub fn new(images: Vec<String>) -> Self {
        Self {
            images,
            selected: 0,
        }
    }

    pub fn for_pet(pet: &Pet) -> Self {
        Self::new(pet.images.clone())
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    /// First image of the list.
    pub fn main(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    pub fn selected(&self) -> Option<&str> {
        self.images.get(self.selected).map(String::as_str)
    }

    /// Show the image at `index`. Out-of-range indexes are ignored.
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.images.len() {
            self.selected = index;
            true
        } else {
            false
        }
    }

    pub fn main_url(&self, config: &ClientConfig) -> Option<String> {
        self.main().map(|name| config.upload_url(name))
    }

    pub fn selected_url(&self, config: &ClientConfig) -> Option<String> {
        self.selected().map(|name| config.upload_url(name))
    }

    pub fn urls(&self, config: &ClientConfig) -> Vec<String> {
        self.images
            .iter()
            .map(|name| config.upload_url(name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_drops_empty_entries() {
        assert_eq!(split_images("a.jpg,,b.jpg,"), vec!["a.jpg", "b.jpg"]);
        assert!(split_images("").is_empty());
    }

    #[test]
    fn gallery_from_two_images() {
        let config = ClientConfig::new("http://localhost:3000");
        let gallery = Gallery::new(split_images("a.jpg,b.jpg"));
        assert_eq!(gallery.images(), ["a.jpg", "b.jpg"]);
        assert_eq!(
            gallery.main_url(&config).as_deref(),
            Some("http://localhost:3000/uploads/a.jpg")
        );
        assert_eq!(gallery.urls(&config).len(), 2);
    }

    #[test]
    fn select_moves_within_bounds() {
        let mut gallery = Gallery::new(split_images("a.jpg,b.jpg"));
        assert!(gallery.select(1));
        assert_eq!(gallery.selected(), Some("b.jpg"));
        assert!(!gallery.select(2));
        assert_eq!(gallery.selected(), Some("b.jpg"));
        assert_eq!(gallery.main(), Some("a.jpg"));
    }

    #[test]
    fn empty_gallery_has_no_main_image() {
        let gallery = Gallery::new(Vec::new());
        assert!(gallery.main().is_none());
        assert!(gallery.selected().is_none());
    }
}
