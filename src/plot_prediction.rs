use std::path::Path;

use image::{GrayImage, Rgb, RgbImage};
use palette::{Hsv, IntoColor, Srgb};
use plotters::prelude::*;

use crate::error::{Result, ReviewError};
use crate::imaging::RoiCrops;
use crate::inference::{Assessment, AttentionMap};

pub const BAR_CHART_SIZE: (u32, u32) = (480, 320);
const HEATMAP_OPACITY: f32 = 0.45;

fn chart_err(err: impl std::fmt::Display) -> ReviewError {
    ReviewError::Chart(err.to_string())
}

/// Draws the grade probabilities as vertical bars, most probable grade
/// highlighted, and writes the chart to `path` as PNG.
pub fn render_bar_chart(assessment: &Assessment, path: &Path) -> Result<()> {
    let (width, height) = BAR_CHART_SIZE;
    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let margin = 24i32;
    let plot_w = width as i32 - 2 * margin;
    let plot_h = height as i32 - 2 * margin;
    let baseline = margin + plot_h;

    let count = assessment.probabilities.len().max(1) as i32;
    let slot = plot_w / count;
    let gap = (slot / 5).max(2);
    let best = assessment.grade();

    for (grade, &probability) in assessment.probabilities.iter().enumerate() {
        let p = probability.clamp(0.0, 1.0);
        let bar_h = (p * plot_h as f32).round() as i32;
        let x0 = margin + grade as i32 * slot + gap / 2;
        let x1 = x0 + slot - gap;
        let color = if Some(grade) == best {
            RGBColor(214, 72, 48)
        } else {
            RGBColor(70, 110, 180)
        };
        root.draw(&Rectangle::new([(x0, baseline - bar_h), (x1, baseline)], color.filled()))
            .map_err(chart_err)?;
    }

    let axis = RGBColor(60, 60, 60);
    root.draw(&PathElement::new([(margin, baseline), (margin + plot_w, baseline)], axis))
        .map_err(chart_err)?;
    root.draw(&PathElement::new([(margin, margin), (margin, baseline)], axis))
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}

/// Jet-style ramp: 0 is blue, 1 is red.
fn attention_color(value: f32) -> Rgb<u8> {
    let hue = (1.0 - value.clamp(0.0, 1.0)) * 240.0;
    let rgb: Srgb = Hsv::new(hue, 1.0, 1.0).into_color();
    let rgb: Srgb<u8> = rgb.into_format();
    Rgb([rgb.red, rgb.green, rgb.blue])
}

/// Bilinear sample of the attention grid at normalized `(u, v)`.
fn sample_attention(map: &AttentionMap, u: f32, v: f32) -> f32 {
    let fx = (u * map.width as f32 - 0.5).max(0.0);
    let fy = (v * map.height as f32 - 0.5).max(0.0);
    let x0 = fx.floor() as u32;
    let y0 = fy.floor() as u32;
    let tx = fx - x0 as f32;
    let ty = fy - y0 as f32;

    let top = map.at(x0, y0) * (1.0 - tx) + map.at(x0 + 1, y0) * tx;
    let bottom = map.at(x0, y0 + 1) * (1.0 - tx) + map.at(x0 + 1, y0 + 1) * tx;
    top * (1.0 - ty) + bottom * ty
}

/// Lateral crop and mirrored medial crop side by side.
pub fn crop_pair_strip(crops: &RoiCrops) -> GrayImage {
    let width = crops.lateral.width() + crops.medial.width();
    let height = crops.lateral.height().max(crops.medial.height());
    let mut strip = GrayImage::new(width, height);
    image::imageops::replace(&mut strip, &crops.lateral, 0, 0);
    image::imageops::replace(&mut strip, &crops.medial, crops.lateral.width() as i64, 0);
    strip
}

/// Blends the assessment's attention grid over the crop strip. Without an
/// attention grid the plain strip is returned in color space.
pub fn heatmap_image(crops: &RoiCrops, assessment: &Assessment) -> RgbImage {
    let strip = crop_pair_strip(crops);
    let (width, height) = strip.dimensions();

    RgbImage::from_fn(width, height, |x, y| {
        let gray = strip.get_pixel(x, y)[0];
        let Some(map) = &assessment.attention else {
            return Rgb([gray, gray, gray]);
        };
        let u = (x as f32 + 0.5) / width as f32;
        let v = (y as f32 + 0.5) / height as f32;
        let heat = attention_color(sample_attention(map, u, v));
        let mix = |channel: u8| {
            (gray as f32 * (1.0 - HEATMAP_OPACITY) + channel as f32 * HEATMAP_OPACITY).round() as u8
        };
        Rgb([mix(heat[0]), mix(heat[1]), mix(heat[2])])
    })
}

pub fn render_heatmap(crops: &RoiCrops, assessment: &Assessment, path: &Path) -> Result<()> {
    heatmap_image(crops, assessment).save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crops() -> RoiCrops {
        RoiCrops {
            lateral: GrayImage::from_pixel(6, 6, image::Luma([100])),
            medial: GrayImage::from_pixel(6, 6, image::Luma([200])),
        }
    }

    #[test]
    fn color_ramp_ends() {
        assert_eq!(attention_color(0.0), Rgb([0, 0, 255]));
        assert_eq!(attention_color(1.0), Rgb([255, 0, 0]));
    }

    #[test]
    fn uniform_attention_samples_uniformly() {
        let map = AttentionMap {
            width: 3,
            height: 2,
            values: vec![0.5; 6],
        };
        for &(u, v) in &[(0.0, 0.0), (0.5, 0.5), (0.99, 0.99)] {
            assert!((sample_attention(&map, u, v) - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn strip_places_lateral_then_medial() {
        let strip = crop_pair_strip(&crops());
        assert_eq!(strip.dimensions(), (12, 6));
        assert_eq!(strip.get_pixel(0, 0)[0], 100);
        assert_eq!(strip.get_pixel(11, 5)[0], 200);
    }

    #[test]
    fn heatmap_without_attention_is_grayscale() {
        let assessment = Assessment {
            id: "R".into(),
            probabilities: vec![1.0],
            attention: None,
        };
        let image = heatmap_image(&crops(), &assessment);
        assert_eq!(image.get_pixel(0, 0), &Rgb([100, 100, 100]));
    }

    #[test]
    fn bar_chart_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("R_bar.png");
        let assessment = Assessment {
            id: "R".into(),
            probabilities: vec![0.05, 0.1, 0.6, 0.2, 0.05],
            attention: None,
        };
        render_bar_chart(&assessment, &path).unwrap();
        let chart = image::open(&path).unwrap();
        assert_eq!((chart.width(), chart.height()), BAR_CHART_SIZE);
    }
}
