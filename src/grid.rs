use geoptimize_common::EngineError;
use image::DynamicImage;

/// Read-only accessor over a 2-D raster of non-negative population
/// weights. Shared by reference across every fitness evaluation; the
/// engine never mutates it, which permits lock-free concurrent reads.
#[derive(Debug, Clone)]
pub struct GridData {
    width: u32,
    height: u32,
    weights: Vec<f32>,
}

impl GridData {
    /// Builds a grid from raw weights in row-major order.
    pub fn from_weights(width: u32, height: u32, weights: Vec<f32>) -> Result<Self, EngineError> {
        if weights.len() != (width as usize) * (height as usize) {
            return Err(EngineError::Configuration(format!(
                "weight buffer length {} does not match raster dimensions {}x{}",
                weights.len(),
                width,
                height
            )));
        }
        Ok(GridData { width, height, weights })
    }

    /// Builds a grid from a decoded raster image. Integer-typed pixel data
    /// is converted to grayscale and each pixel's luminance becomes the
    /// population weight; floating-point encodings cannot be interpreted
    /// as scalar weights and are rejected.
    pub fn from_image(img: &DynamicImage) -> Result<Self, EngineError> {
        match img {
            DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
                Err(EngineError::InvalidRasterFormat(
                    "raster pixel data must be integer typed".to_string(),
                ))
            }
            _ => {
                let luma = img.to_luma8();
                let (width, height) = luma.dimensions();
                let weights = luma.pixels().map(|p| p.0[0] as f32).collect();
                GridData::from_weights(width, height, weights)
            }
        }
    }

    /// Pure lookup of the population weight at a pixel. Coordinates
    /// outside the raster extent contribute zero rather than erroring.
    pub fn get(&self, x: i32, y: i32) -> f32 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return 0.0;
        }
        self.weights[y as usize * self.width as usize + x as usize]
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}
