// THEORY:
// The `PixelBuffer` is the decoded creative: a flat, row-major RGBA byte buffer with a
// known width and height. It is a "dumb", immutable container owned by the caller; every
// stage of the pipeline only reads it.
//
// Decoding and encoding are not implemented here. The `image` crate does both, and this
// module only adapts its types at the edges: `decode` for callers holding an encoded
// file, `to_png` for the OCR collaborator that expects an encoded image.

pub mod pixel_buffer {
    use crate::core_modules::pixel::pixel::{CHANNELS, Pixel};
    use crate::error::PretestError;
    use image::{ExtendedColorType, ImageEncoder, RgbaImage};

    /// An immutable `width × height` grid of RGBA byte quadruples.
    #[derive(Debug, Clone, PartialEq)]
    pub struct PixelBuffer {
        width: u32,
        height: u32,
        data: Vec<u8>,
    }

    impl PixelBuffer {
        /// Wraps a raw RGBA buffer, checking that it holds exactly `width × height` pixels.
        pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, PretestError> {
            if width == 0 || height == 0 || data.is_empty() {
                return Err(PretestError::InputMissing);
            }
            let expected = width as usize * height as usize * CHANNELS;
            if data.len() != expected {
                return Err(PretestError::InvalidBuffer {
                    width,
                    height,
                    len: data.len(),
                });
            }
            Ok(Self {
                width,
                height,
                data,
            })
        }

        /// Builds a buffer where every pixel has the same colour.
        pub fn filled(width: u32, height: u32, pixel: Pixel) -> Result<Self, PretestError> {
            let quad: [u8; CHANNELS] = pixel.into();
            let data = quad.repeat(width as usize * height as usize);
            Self::new(width, height, data)
        }

        /// Decodes an encoded image (PNG, JPEG, ...) into RGBA.
        pub fn decode(bytes: &[u8]) -> Result<Self, PretestError> {
            if bytes.is_empty() {
                return Err(PretestError::InputMissing);
            }
            let image = image::load_from_memory(bytes)?;
            Self::from_rgba_image(image.to_rgba8())
        }

        /// Like `decode`, but refuses images above `max_pixels` before allocating them.
        pub fn decode_within(bytes: &[u8], max_pixels: u64) -> Result<Self, PretestError> {
            if bytes.is_empty() {
                return Err(PretestError::InputMissing);
            }
            let (width, height) = image::ImageReader::new(std::io::Cursor::new(bytes))
                .with_guessed_format()
                .map_err(image::ImageError::IoError)?
                .into_dimensions()?;
            if u64::from(width) * u64::from(height) > max_pixels {
                return Err(PretestError::TooLarge {
                    width,
                    height,
                    max_pixels,
                });
            }
            Self::decode(bytes)
        }

        pub fn from_rgba_image(image: RgbaImage) -> Result<Self, PretestError> {
            let (width, height) = image.dimensions();
            Self::new(width, height, image.into_raw())
        }

        pub fn width(&self) -> u32 {
            self.width
        }

        pub fn height(&self) -> u32 {
            self.height
        }

        pub fn len(&self) -> usize {
            self.width as usize * self.height as usize
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        pub fn as_bytes(&self) -> &[u8] {
            &self.data
        }

        /// The pixel at column `x`, row `y`.
        pub fn pixel(&self, x: u32, y: u32) -> Pixel {
            let start = (y as usize * self.width as usize + x as usize) * CHANNELS;
            Pixel::from(&self.data[start..start + CHANNELS])
        }

        /// All pixels in row-major order.
        pub fn pixels(&self) -> impl Iterator<Item = Pixel> + '_ {
            self.data.chunks_exact(CHANNELS).map(Pixel::from)
        }

        /// Encodes the buffer as PNG.
        pub fn to_png(&self) -> Result<Vec<u8>, PretestError> {
            encode_png(self.width, self.height, &self.data)
        }

        /// The `"<width>x<height>"` label used in exported reports.
        pub fn format_label(&self) -> String {
            format!("{}x{}", self.width, self.height)
        }
    }

    /// Encodes a raw RGBA buffer as PNG bytes.
    pub fn encode_png(width: u32, height: u32, rgba: &[u8]) -> Result<Vec<u8>, PretestError> {
        let mut encoded = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut encoded);
        encoder.write_image(rgba, width, height, ExtendedColorType::Rgba8)?;
        Ok(encoded)
    }
}
