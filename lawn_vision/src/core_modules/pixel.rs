// THEORY:
// The `pixel` module is the bottom layer of the scorer. It holds two things:
//
// 1.  **Pixel**: a "dumb" RGBA value with single-pixel heuristics only (HSV, luma,
//     hex). Nothing here reads a neighbor. Anything spatial lives in `edge_map`,
//     `pattern_detector` or `texture`.
// 2.  **PixelBuffer**: the validated, immutable RGBA8 grid every analyzer reads
//     from. It is built once per analysis and never mutated, so the color, edge and
//     texture passes can borrow it side by side.
//
// HSV here follows the classic max/min/delta formula on gamma-encoded channels:
// hue in degrees [0, 360), saturation and value in percent [0, 100]. The color
// classifier's range table is written in those units, so they must not change.

pub mod pixel {
    use crate::error::{AnalysisError, Result};

    pub type Channel = u8;
    pub type Hue = f64;
    pub type Saturation = f64;
    pub type Value = f64;
    pub type Luma = f64;

    pub const CHANNELS: usize = 4;

    /// A single RGBA pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
        /// The alpha channel value (0-255). Carried through, never scored.
        pub alpha: Channel,
    }

    /// Hue in degrees, saturation and value in percent.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Hsv {
        pub hue: Hue,
        pub saturation: Saturation,
        pub value: Value,
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
            Self {
                red,
                green,
                blue,
                alpha,
            }
        }

        pub fn rgb(red: Channel, green: Channel, blue: Channel) -> Self {
            Self::new(red, green, blue, 255)
        }

        /// Rec. 601 luma on the 0..255 scale.
        pub fn luma(&self) -> Luma {
            0.299 * self.red as f64 + 0.587 * self.green as f64 + 0.114 * self.blue as f64
        }

        /// Luma rounded to the nearest integer level, the form every grayscale pass uses.
        pub fn gray_level(&self) -> u8 {
            self.luma().round().clamp(0.0, 255.0) as u8
        }

        /// HSV via max/min/delta on normalized sRGB channels.
        ///
        /// Ties between channels resolve red, then green, then blue. The branch taken
        /// decides the hue sector, so the order matters at exact ties. The hue is built
        /// as a fraction of a turn and scaled to degrees last; the range table's
        /// inclusive bounds are sensitive to that rounding (65,110,2 lands just past 85).
        pub fn hsv(&self) -> Hsv {
            let red = self.red as f64 / 255.0;
            let green = self.green as f64 / 255.0;
            let blue = self.blue as f64 / 255.0;

            let maximum_channel = red.max(green.max(blue));
            let minimum_channel = red.min(green.min(blue));
            let chroma = maximum_channel - minimum_channel;

            let saturation = if maximum_channel == 0.0 {
                0.0
            } else {
                chroma / maximum_channel
            };

            let mut turn = 0.0;
            if chroma != 0.0 {
                turn = if maximum_channel == red {
                    let wrap = if green < blue { 6.0 } else { 0.0 };
                    ((green - blue) / chroma + wrap) / 6.0
                } else if maximum_channel == green {
                    ((blue - red) / chroma + 2.0) / 6.0
                } else {
                    ((red - green) / chroma + 4.0) / 6.0
                };
            }
            let hue_degrees = turn * 360.0;

            Hsv {
                hue: hue_degrees,
                saturation: saturation * 100.0,
                value: maximum_channel * 100.0,
            }
        }

        /// Packed 0xRRGGBB key, used for exact-color frequency counting.
        pub fn rgb_key(&self) -> u32 {
            ((self.red as u32) << 16) | ((self.green as u32) << 8) | self.blue as u32
        }

        /// Lowercase `#rrggbb`.
        pub fn hex(&self) -> String {
            format!("#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
        }
    }

    impl From<&[u8]> for Pixel {
        fn from(bytes: &[u8]) -> Self {
            Pixel::new(bytes[0], bytes[1], bytes[2], bytes[3])
        }
    }

    /// A validated, row-major RGBA8 image.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct PixelBuffer {
        width: u32,
        height: u32,
        data: Vec<u8>,
    }

    impl PixelBuffer {
        /// Wraps raw RGBA8 bytes. Rejects empty images and length mismatches.
        pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
            let pixel_count = width as usize * height as usize;
            if pixel_count == 0 {
                return Err(AnalysisError::EmptyImage);
            }
            let expected = pixel_count * CHANNELS;
            if data.len() != expected {
                return Err(AnalysisError::BufferSize {
                    width,
                    height,
                    expected,
                    actual: data.len(),
                });
            }
            Ok(Self {
                width,
                height,
                data,
            })
        }

        /// Builds a buffer by evaluating `f(x, y)` for every pixel.
        pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Result<Self>
        where
            F: FnMut(u32, u32) -> Pixel,
        {
            let mut data = Vec::with_capacity(width as usize * height as usize * CHANNELS);
            for y in 0..height {
                for x in 0..width {
                    let pixel = f(x, y);
                    data.extend_from_slice(&[pixel.red, pixel.green, pixel.blue, pixel.alpha]);
                }
            }
            Self::new(width, height, data)
        }

        /// A buffer filled with one color.
        pub fn uniform(width: u32, height: u32, pixel: Pixel) -> Result<Self> {
            Self::from_fn(width, height, |_, _| pixel)
        }

        pub fn width(&self) -> u32 {
            self.width
        }

        pub fn height(&self) -> u32 {
            self.height
        }

        pub fn pixel_count(&self) -> usize {
            self.width as usize * self.height as usize
        }

        pub fn as_bytes(&self) -> &[u8] {
            &self.data
        }

        pub fn pixel(&self, x: u32, y: u32) -> Pixel {
            let offset = (y as usize * self.width as usize + x as usize) * CHANNELS;
            Pixel::from(&self.data[offset..offset + CHANNELS])
        }

        /// All pixels in row-major order.
        pub fn pixels(&self) -> impl Iterator<Item = Pixel> + '_ {
            self.data.chunks_exact(CHANNELS).map(Pixel::from)
        }
    }
}
