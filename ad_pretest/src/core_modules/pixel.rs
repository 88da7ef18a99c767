// THEORY (1D Pixel Heuristics):
// The `Pixel` module is the smallest unit of the pretest engine. It holds a single RGBA
// pixel and the two brightness measures the rest of the pipeline needs, both computed
// from this pixel alone with no knowledge of its neighbours:
//
// - Luma (Rec. 601): `0.299R + 0.587G + 0.114B` on the raw 0..255 channels. This is the
//   signal the edge detector convolves and the external heatmap is read through.
// - Relative luminance (WCAG): sRGB channels gamma-decoded to linear light and combined
//   as `0.2126R + 0.7152G + 0.0722B`. This is what contrast ratios are built from.
//
// Alpha is carried but ignored by both measures.
//
// The sRGB→linear transfer uses the WCAG 2.0 threshold (0.03928) and is served from a
// 256-entry `OnceLock` table, so the hot path is a lookup rather than a `powf`.

pub mod pixel {
    use std::sync::OnceLock;

    pub type Channel = u8;
    pub type Luma = f64;
    pub type RelativeLuminance = f64;

    pub const CHANNELS: usize = 4;

    const LUMA_RED: f64 = 0.299;
    const LUMA_GREEN: f64 = 0.587;
    const LUMA_BLUE: f64 = 0.114;

    const LUMINANCE_RED: f64 = 0.2126;
    const LUMINANCE_GREEN: f64 = 0.7152;
    const LUMINANCE_BLUE: f64 = 0.0722;

    const SRGB_LINEAR_THRESHOLD: f64 = 0.03928;

    static SRGB_TO_LINEAR_LUT: OnceLock<[f64; 256]> = OnceLock::new();

    /// A "dumb" data container representing a single RGBA pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
        /// The alpha (transparency) channel value (0-255).
        pub alpha: Channel,
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

        #[inline]
        fn srgb_to_linear(value: Channel) -> f64 {
            let table = SRGB_TO_LINEAR_LUT.get_or_init(|| {
                let mut table = [0.0f64; 256];
                for (i, slot) in table.iter_mut().enumerate() {
                    let normalized = i as f64 / 255.0;
                    *slot = if normalized <= SRGB_LINEAR_THRESHOLD {
                        normalized / 12.92
                    } else {
                        ((normalized + 0.055) / 1.055).powf(2.4)
                    };
                }
                table
            });
            table[value as usize]
        }

        /// Rec. 601 luma on the 0..255 scale, full precision.
        pub fn luma(&self) -> Luma {
            LUMA_RED * self.red as f64 + LUMA_GREEN * self.green as f64 + LUMA_BLUE * self.blue as f64
        }

        /// Rec. 601 luma truncated toward zero, as stored in a grayscale buffer.
        pub fn luma_byte(&self) -> u8 {
            // The weights sum to 1.0, so the value never exceeds 255.
            self.luma() as u8
        }

        /// WCAG relative luminance in [0, 1].
        pub fn relative_luminance(&self) -> RelativeLuminance {
            LUMINANCE_RED * Self::srgb_to_linear(self.red)
                + LUMINANCE_GREEN * Self::srgb_to_linear(self.green)
                + LUMINANCE_BLUE * Self::srgb_to_linear(self.blue)
        }
    }

    impl From<&[u8]> for Pixel {
        /// Reads the first four bytes as R, G, B, A. Missing bytes read as zero.
        fn from(bytes: &[u8]) -> Self {
            let at = |i: usize| bytes.get(i).copied().unwrap_or_default();
            Pixel::new(at(0), at(1), at(2), at(3))
        }
    }

    impl From<Pixel> for [u8; CHANNELS] {
        fn from(pixel: Pixel) -> Self {
            [pixel.red, pixel.green, pixel.blue, pixel.alpha]
        }
    }
}
