use std::path::Path;

use anyhow::Result;
use plotters::prelude::*;

use crate::frequency::RankedEntry;
use crate::render::font::Font;
use crate::timeline::HourHistogram;

struct BarSpec<'a> {
    title: &'a str,
    x_desc: &'a str,
    y_desc: &'a str,
    color: RGBColor,
}

/// Bar chart of the ranked tokens, in ranked order. Returns false and writes
/// nothing when there are no entries.
pub fn top_words(
    entries: &[RankedEntry],
    font: Option<&Font>,
    size: (u32, u32),
    path: &Path,
) -> Result<bool> {
    let labels: Vec<String> = entries.iter().map(|e| e.token.clone()).collect();
    let values: Vec<u64> = entries.iter().map(|e| e.count).collect();
    let spec = BarSpec {
        title: "Top words",
        x_desc: "word",
        y_desc: "count",
        color: RGBColor(31, 119, 180),
    };
    bar_chart(&labels, &values, font, &spec, size, path)
}

/// Comments per hour of day, all 24 hours shown, so a file is always written.
pub fn hourly(
    histogram: &HourHistogram,
    font: Option<&Font>,
    size: (u32, u32),
    path: &Path,
) -> Result<()> {
    let hours = histogram.hours();
    let labels: Vec<String> = hours.iter().map(|h| h.hour.to_string()).collect();
    let values: Vec<u64> = hours.iter().map(|h| h.count).collect();
    let spec = BarSpec {
        title: "Comments by hour (UTC)",
        x_desc: "hour",
        y_desc: "comments",
        color: RGBColor(255, 127, 14),
    };
    bar_chart(&labels, &values, font, &spec, size, path)?;
    Ok(())
}

// Without a font only the bars are drawn: captions, tick labels and axis
// descriptions all need glyphs.
fn bar_chart(
    labels: &[String],
    values: &[u64],
    font: Option<&Font>,
    spec: &BarSpec<'_>,
    size: (u32, u32),
    path: &Path,
) -> Result<bool> {
    if values.is_empty() {
        return Ok(false);
    }
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let n = values.len() as i32;
    let peak = values.iter().copied().max().unwrap_or(0);
    let y_max = peak + (peak / 10).max(1);

    let mut builder = ChartBuilder::on(&root);
    builder.margin(20);
    if let Some(font) = font {
        builder
            .caption(spec.title, (font.family(), 24))
            .x_label_area_size(40)
            .y_label_area_size(50);
    }
    let mut chart = builder.build_cartesian_2d((0..n).into_segmented(), 0u64..y_max)?;

    if let Some(font) = font {
        let formatter = |value: &SegmentValue<i32>| match value {
            SegmentValue::CenterOf(i) => labels.get(*i as usize).cloned().unwrap_or_default(),
            _ => String::new(),
        };
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(labels.len())
            .x_label_formatter(&formatter)
            .label_style((font.family(), 13))
            .axis_desc_style((font.family(), 15))
            .x_desc(spec.x_desc)
            .y_desc(spec.y_desc)
            .draw()?;
    }

    chart.draw_series(values.iter().enumerate().map(|(i, value)| {
        let i = i as i32;
        Rectangle::new(
            [(SegmentValue::Exact(i), 0), (SegmentValue::Exact(i + 1), *value)],
            spec.color.filled(),
        )
    }))?;
    root.present()?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    #[test]
    fn empty_ranking_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("top_words.png");
        assert!(!top_words(&[], None, (640, 320), &path).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn renders_bars_without_font() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("top_words.png");
        let entries = vec![
            RankedEntry {
                token: "맛집".into(),
                count: 2,
            },
            RankedEntry {
                token: "좋다".into(),
                count: 3,
            },
        ];
        assert!(top_words(&entries, None, (640, 320), &path).unwrap());
        let image = image::open(&path).unwrap();
        assert_eq!((image.width(), image.height()), (640, 320));
    }

    #[test]
    fn renders_hourly_without_font() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hourly.png");
        let stamps = [
            Utc.with_ymd_and_hms(2024, 1, 1, 3, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 3, 30, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 22, 0, 0).unwrap(),
        ];
        let histogram = HourHistogram::from_timestamps(&stamps);
        hourly(&histogram, None, (800, 400), &path).unwrap();
        let rgb = image::open(&path).unwrap().to_rgb8();
        assert!(rgb.pixels().any(|p| p.0 != [255, 255, 255]));
    }

    #[test]
    fn hourly_writes_a_file_for_an_empty_histogram() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hourly.png");
        hourly(&HourHistogram::default(), None, (400, 200), &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn labels_top_words_with_a_font() {
        let dir = tempdir().unwrap();
        let bare = dir.path().join("bare.png");
        let labelled = dir.path().join("labelled.png");
        let font = crate::render::font::load(&crate::render::test_font_path()).unwrap();
        let entries = vec![
            RankedEntry {
                token: "rust".into(),
                count: 4,
            },
            RankedEntry {
                token: "video".into(),
                count: 1,
            },
        ];
        assert!(top_words(&entries, None, (640, 320), &bare).unwrap());
        assert!(top_words(&entries, Some(&font), (640, 320), &labelled).unwrap());

        let ink = |path: &Path| {
            image::open(path)
                .unwrap()
                .to_rgb8()
                .pixels()
                .filter(|p| p.0 != [255, 255, 255])
                .count()
        };
        assert!(ink(&labelled) > 0);
        assert_ne!(ink(&labelled), ink(&bare));
    }
}
