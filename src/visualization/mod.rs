//! Visualization module: rendered chart images.
//!
//! Every chart is drawn by [`charts`] onto its own SVG surface and returned
//! as bytes; nothing is shared between two renders.

pub mod charts;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Encoding of a rendered chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Svg,
}

impl ImageFormat {
    pub fn media_type(&self) -> &'static str {
        match self {
            ImageFormat::Svg => "image/svg+xml",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Svg => "svg",
        }
    }
}

/// A named chart image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visualization {
    pub name: String,
    pub format: ImageFormat,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl Visualization {
    pub fn svg(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            format: ImageFormat::Svg,
            bytes,
        }
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// `data:` URI suitable for an `<img src>`
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.format.media_type(), self.to_base64())
    }
}

/// Insertion-ordered set of charts keyed by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Visualizations {
    images: IndexMap<String, Visualization>,
}

impl Visualizations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an image; an existing image with the same name is replaced
    pub fn insert(&mut self, image: Visualization) {
        self.images.insert(image.name.clone(), image);
    }

    pub fn get(&self, name: &str) -> Option<&Visualization> {
        self.images.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.images.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.images.keys().map(|k| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Visualization> {
        self.images.values()
    }

    /// Merge another set, keeping this set's order first
    pub fn extend(&mut self, other: Visualizations) {
        for (_, image) in other.images {
            self.insert(image);
        }
    }

    /// name -> base64 string, the shape report templates consume
    pub fn to_base64_map(&self) -> IndexMap<String, String> {
        self.images
            .iter()
            .map(|(name, image)| (name.clone(), image.to_base64()))
            .collect()
    }
}

impl IntoIterator for Visualizations {
    type Item = Visualization;
    type IntoIter = indexmap::map::IntoValues<String, Visualization>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.into_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_uri() {
        let image = Visualization::svg("x_distribution", b"<svg/>".to_vec());
        assert_eq!(image.to_base64(), "PHN2Zy8+");
        assert_eq!(image.data_uri(), "data:image/svg+xml;base64,PHN2Zy8+");
    }

    #[test]
    fn test_insertion_order_and_replace() {
        let mut set = Visualizations::new();
        set.insert(Visualization::svg("b", vec![1]));
        set.insert(Visualization::svg("a", vec![2]));
        set.insert(Visualization::svg("b", vec![3]));

        assert_eq!(set.names(), vec!["b", "a"]);
        assert_eq!(set.get("b").unwrap().bytes, vec![3]);
        assert_eq!(set.len(), 2);
    }
}
