use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use ab_glyph::FontRef;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use plotters::style::{register_font, FontStyle};

#[derive(Debug, Clone, thiserror::Error)]
pub enum FontError {
    #[error("font file not found: {}", .0.display())]
    Missing(PathBuf),
    #[error("failed to read font {}: {message}", path.display())]
    Read { path: PathBuf, message: String },
    #[error("malformed font {}: {message}", path.display())]
    Invalid { path: PathBuf, message: String },
}

/// A font registered with the plotting backend under its own family name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Font {
    family: String,
    path: PathBuf,
}

impl Font {
    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// DejaVu Sans Mono, used when the configured font file is absent. It has no
/// Hangul coverage.
const BUNDLED_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSansMono.ttf");
const BUNDLED_FAMILY: &str = "ytcl-bundled";
const BUNDLED_PATH: &str = "<bundled DejaVu Sans Mono>";

static BUNDLED: Lazy<Result<Font, FontError>> = Lazy::new(|| {
    let path = Path::new(BUNDLED_PATH);
    validate(BUNDLED_FONT, path)?;
    register_bytes(BUNDLED_FONT, BUNDLED_FAMILY.to_string(), path)
});

pub fn bundled() -> Result<Font, FontError> {
    (*BUNDLED).clone()
}

// Registration leaks the font bytes, so each path is loaded at most once per
// process and the outcome (including failure) is remembered.
static REGISTRY: Lazy<Mutex<HashMap<PathBuf, Result<Font, FontError>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

pub fn load(path: &Path) -> Result<Font, FontError> {
    let mut registry = REGISTRY.lock();
    if let Some(outcome) = registry.get(path) {
        return outcome.clone();
    }
    let family = format!("ytcl-font-{}", registry.len());
    let outcome = register(path, family);
    registry.insert(path.to_path_buf(), outcome.clone());
    outcome
}

fn register(path: &Path, family: String) -> Result<Font, FontError> {
    if !path.is_file() {
        return Err(FontError::Missing(path.to_path_buf()));
    }
    let bytes = fs::read(path).map_err(|err| FontError::Read {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    validate(&bytes, path)?;
    register_bytes(Box::leak(bytes.into_boxed_slice()), family, path)
}

fn validate(bytes: &[u8], path: &Path) -> Result<(), FontError> {
    FontRef::try_from_slice(bytes)
        .map(|_| ())
        .map_err(|err| FontError::Invalid {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
}

fn register_bytes(bytes: &'static [u8], family: String, path: &Path) -> Result<Font, FontError> {
    register_font(&family, FontStyle::Normal, bytes).map_err(|_| FontError::Invalid {
        path: path.to_path_buf(),
        message: "rejected by the plotting backend".to_string(),
    })?;
    Ok(Font {
        family,
        path: path.to_path_buf(),
    })
}
