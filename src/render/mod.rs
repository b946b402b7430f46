pub mod charts;
pub mod font;
pub mod wordcloud;

pub use font::{Font, FontError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    pub max_words: usize,
    pub min_font: u32,
    pub max_font: u32,
    pub seed: u64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 400,
            max_words: 200,
            min_font: 10,
            max_font: 96,
            seed: 42,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_font_path() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/DejaVuSansMono-Oblique.ttf")
}
