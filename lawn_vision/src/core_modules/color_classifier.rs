// THEORY:
// The `ColorClassifier` turns a `PixelBuffer` into a `ColorAnalysis`: what share of
// the image falls into each of eleven named HSV buckets, plus the ten most frequent
// exact RGB values.
//
// The buckets are axis-aligned HSV boxes and they overlap (dark green and very dark
// green share most of their hue range, for example). A pixel lands in the FIRST box
// that contains it, or in none. `HSV_RANGES` is therefore an ordered slice, not a map:
// reordering it changes results. Because a pixel can miss every box, the eleven
// percentages are not expected to sum to 100.

use crate::core_modules::pixel::pixel::{Hsv, PixelBuffer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const DOMINANT_COLOR_LIMIT: usize = 10;

/// The eleven color classes, in the order they are tested. The discriminant doubles
/// as the index into `HSV_RANGES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorClass {
    HealthyGreen,
    StressedYellow,
    DeadBrown,
    DarkGreen,
    OrangeRust,
    BluishGray,
    BrightYellowFlowers,
    WhiteFlowers,
    PurpleFlowers,
    LightGreenWeeds,
    VeryDarkGreen,
}

/// Inclusive bounds on hue (degrees), saturation and value (percent).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HsvRange {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl HsvRange {
    const fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, hsv: &Hsv) -> bool {
        hsv.hue >= self.min[0]
            && hsv.hue <= self.max[0]
            && hsv.saturation >= self.min[1]
            && hsv.saturation <= self.max[1]
            && hsv.value >= self.min[2]
            && hsv.value <= self.max[2]
    }
}

/// First match wins. Do not reorder.
pub const HSV_RANGES: [(ColorClass, HsvRange); 11] = [
    (ColorClass::HealthyGreen, HsvRange::new([35.0, 40.0, 40.0], [85.0, 100.0, 80.0])),
    (ColorClass::StressedYellow, HsvRange::new([15.0, 50.0, 50.0], [35.0, 100.0, 90.0])),
    (ColorClass::DeadBrown, HsvRange::new([8.0, 30.0, 20.0], [25.0, 80.0, 60.0])),
    (ColorClass::DarkGreen, HsvRange::new([35.0, 60.0, 60.0], [85.0, 100.0, 100.0])),
    (ColorClass::OrangeRust, HsvRange::new([5.0, 70.0, 70.0], [15.0, 100.0, 100.0])),
    (ColorClass::BluishGray, HsvRange::new([90.0, 20.0, 30.0], [130.0, 60.0, 70.0])),
    (ColorClass::BrightYellowFlowers, HsvRange::new([20.0, 80.0, 80.0], [30.0, 100.0, 100.0])),
    (ColorClass::WhiteFlowers, HsvRange::new([0.0, 0.0, 80.0], [360.0, 20.0, 100.0])),
    (ColorClass::PurpleFlowers, HsvRange::new([120.0, 60.0, 60.0], [140.0, 100.0, 100.0])),
    (ColorClass::LightGreenWeeds, HsvRange::new([40.0, 20.0, 60.0], [80.0, 60.0, 90.0])),
    (ColorClass::VeryDarkGreen, HsvRange::new([35.0, 80.0, 80.0], [85.0, 100.0, 100.0])),
];

/// Named reference colors for the dominant-color report.
const NAMED_COLORS: [(&str, &str); 6] = [
    ("#008000", "Green"),
    ("#ffff00", "Yellow"),
    ("#a52a2a", "Brown"),
    ("#ffa500", "Orange"),
    ("#800080", "Purple"),
    ("#ffffff", "White"),
];

/// One of the most frequent exact colors in the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DominantColor {
    /// A reference name, or "Mixed" when the hex is not one of the named colors.
    pub color: String,
    pub percentage: f64,
    pub hex: String,
}

/// Percentage of pixels in each color class, plus the dominant exact colors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorAnalysis {
    pub healthy_green: f64,
    pub stressed_yellow: f64,
    pub dead_brown: f64,
    pub dark_green: f64,
    pub orange_rust: f64,
    pub bluish_gray: f64,
    pub bright_yellow_flowers: f64,
    pub white_flowers: f64,
    pub purple_flowers: f64,
    pub light_green_weeds: f64,
    pub very_dark_green: f64,
    pub dominant_colors: Vec<DominantColor>,
}

impl ColorAnalysis {
    /// The percentage recorded for one class.
    pub fn percentage(&self, class: ColorClass) -> f64 {
        match class {
            ColorClass::HealthyGreen => self.healthy_green,
            ColorClass::StressedYellow => self.stressed_yellow,
            ColorClass::DeadBrown => self.dead_brown,
            ColorClass::DarkGreen => self.dark_green,
            ColorClass::OrangeRust => self.orange_rust,
            ColorClass::BluishGray => self.bluish_gray,
            ColorClass::BrightYellowFlowers => self.bright_yellow_flowers,
            ColorClass::WhiteFlowers => self.white_flowers,
            ColorClass::PurpleFlowers => self.purple_flowers,
            ColorClass::LightGreenWeeds => self.light_green_weeds,
            ColorClass::VeryDarkGreen => self.very_dark_green,
        }
    }
}

/// Returns the first class whose range contains `hsv`.
pub fn classify(hsv: &Hsv) -> Option<ColorClass> {
    HSV_RANGES
        .iter()
        .find(|(_, range)| range.contains(hsv))
        .map(|(class, _)| *class)
}

/// Looks up a reference name for a hex string, ignoring case.
pub fn color_name(hex: &str) -> &'static str {
    NAMED_COLORS
        .iter()
        .find(|(named_hex, _)| named_hex.eq_ignore_ascii_case(hex))
        .map(|(_, name)| *name)
        .unwrap_or("Mixed")
}

pub fn analyze_colors(buffer: &PixelBuffer) -> ColorAnalysis {
    let total_pixels = buffer.pixel_count() as f64;
    let mut class_counts = [0usize; HSV_RANGES.len()];
    // key -> (count, first-seen order)
    let mut color_counts: HashMap<u32, (usize, usize)> = HashMap::new();

    for pixel in buffer.pixels() {
        if let Some(class) = classify(&pixel.hsv()) {
            class_counts[class as usize] += 1;
        }

        let next_order = color_counts.len();
        color_counts.entry(pixel.rgb_key()).or_insert((0, next_order)).0 += 1;
    }

    let mut ranked: Vec<(u32, usize, usize)> = color_counts
        .into_iter()
        .map(|(key, (count, order))| (key, count, order))
        .collect();
    // Highest count first; ties keep first-seen order.
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    let dominant_colors = ranked
        .into_iter()
        .take(DOMINANT_COLOR_LIMIT)
        .map(|(key, count, _)| {
            let hex = format!("#{:06x}", key);
            DominantColor {
                color: color_name(&hex).to_string(),
                percentage: count as f64 / total_pixels * 100.0,
                hex,
            }
        })
        .collect();

    let percent = |class: ColorClass| class_counts[class as usize] as f64 / total_pixels * 100.0;

    ColorAnalysis {
        healthy_green: percent(ColorClass::HealthyGreen),
        stressed_yellow: percent(ColorClass::StressedYellow),
        dead_brown: percent(ColorClass::DeadBrown),
        dark_green: percent(ColorClass::DarkGreen),
        orange_rust: percent(ColorClass::OrangeRust),
        bluish_gray: percent(ColorClass::BluishGray),
        bright_yellow_flowers: percent(ColorClass::BrightYellowFlowers),
        white_flowers: percent(ColorClass::WhiteFlowers),
        purple_flowers: percent(ColorClass::PurpleFlowers),
        light_green_weeds: percent(ColorClass::LightGreenWeeds),
        very_dark_green: percent(ColorClass::VeryDarkGreen),
        dominant_colors,
    }
}
