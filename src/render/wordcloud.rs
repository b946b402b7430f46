use std::f64::consts::TAU;
use std::path::Path;

use anyhow::{Context, Result};
use image::RgbImage;
use plotters::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::frequency::RankedEntry;
use crate::render::font::Font;
use crate::render::RenderOptions;

const PALETTE: [RGBColor; 8] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(23, 190, 207),
];

const SPIRAL_STEP: f64 = 0.15;
const SPIRAL_SPACING: f64 = 5.0;
const PADDING: i32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub token: String,
    pub count: u64,
    pub font_size: u32,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Placement {
    fn overlaps(&self, x: i32, y: i32, width: u32, height: u32) -> bool {
        let (ax0, ay0) = (self.x - PADDING, self.y - PADDING);
        let (ax1, ay1) = (
            self.x + self.width as i32 + PADDING,
            self.y + self.height as i32 + PADDING,
        );
        let (bx1, by1) = (x + width as i32, y + height as i32);
        ax0 < bx1 && x < ax1 && ay0 < by1 && y < ay1
    }
}

/// Scales a count to a glyph size between `min_font` and `max_font`.
pub fn font_size_for(count: u64, max_count: u64, options: &RenderOptions) -> u32 {
    if max_count == 0 {
        return options.min_font;
    }
    let ratio = count as f64 / max_count as f64;
    let span = options.max_font.saturating_sub(options.min_font) as f64;
    options.min_font + (span * ratio).round() as u32
}

/// Places words largest first along an outward spiral from the canvas centre.
/// Words that do not fit even at the minimum size are dropped. `measure`
/// returns the pixel box of a word at a given size.
pub fn layout<M>(entries: &[RankedEntry], options: &RenderOptions, mut measure: M) -> Vec<Placement>
where
    M: FnMut(&str, u32) -> Option<(u32, u32)>,
{
    let mut rng = StdRng::seed_from_u64(options.seed);
    let max_count = entries.iter().map(|e| e.count).max().unwrap_or(0);
    let (width, height) = (options.width as i32, options.height as i32);
    let (cx, cy) = (width as f64 / 2.0, height as f64 / 2.0);
    let max_radius = (cx * cx + cy * cy).sqrt();
    let aspect = width as f64 / height.max(1) as f64;

    let mut placed: Vec<Placement> = Vec::new();
    for entry in entries.iter().take(options.max_words) {
        let mut size = font_size_for(entry.count, max_count, options);
        let start = rng.gen_range(0.0..TAU);
        'sizes: while size >= options.min_font {
            let Some((w, h)) = measure(&entry.token, size) else {
                break;
            };
            if w as i32 <= width && h as i32 <= height {
                let mut theta = 0.0;
                loop {
                    let radius = SPIRAL_SPACING * theta / TAU;
                    if radius > max_radius {
                        break;
                    }
                    let angle = start + theta;
                    let x = (cx + radius * angle.cos() * aspect.sqrt() - w as f64 / 2.0) as i32;
                    let y = (cy + radius * angle.sin() / aspect.sqrt() - h as f64 / 2.0) as i32;
                    let inside = x >= 0 && y >= 0 && x + w as i32 <= width && y + h as i32 <= height;
                    if inside && !placed.iter().any(|p| p.overlaps(x, y, w, h)) {
                        placed.push(Placement {
                            token: entry.token.clone(),
                            count: entry.count,
                            font_size: size,
                            x,
                            y,
                            width: w,
                            height: h,
                        });
                        break 'sizes;
                    }
                    theta += SPIRAL_STEP;
                }
            }
            size = (size * 3 / 4).min(size.saturating_sub(1));
        }
    }
    placed
}

/// Draws the word cloud to a PNG at `path`. Returns the number of words drawn;
/// an empty table draws nothing and writes no file.
pub fn render(entries: &[RankedEntry], font: &Font, options: &RenderOptions, path: &Path) -> Result<usize> {
    if entries.is_empty() {
        return Ok(0);
    }
    let (width, height) = (options.width, options.height);
    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    let placed = {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;

        let placed = layout(entries, options, |word, size| {
            let style = TextStyle::from((font.family(), size).into_font());
            root.estimate_text_size(word, &style).ok()
        });

        let mut rng = StdRng::seed_from_u64(options.seed.wrapping_add(1));
        for placement in &placed {
            let color = PALETTE[rng.gen_range(0..PALETTE.len())];
            let style = (font.family(), placement.font_size).into_font().color(&color);
            root.draw(&Text::new(
                placement.token.clone(),
                (placement.x, placement.y),
                style,
            ))?;
        }
        root.present()?;
        placed
    };

    let image = RgbImage::from_raw(width, height, buffer).context("wordcloud: image buffer size")?;
    image
        .save(path)
        .with_context(|| format!("wordcloud: write {}", path.display()))?;
    Ok(placed.len())
}
