//! The background image texture.

use crate::gpu::{Filter, Gpu, GpuError, Sampling, Wrap};

/// Side of the transparent placeholder texture.
pub const PLACEHOLDER_SIZE: u32 = 32;

#[derive(Debug)]
pub struct BackgroundSurface<G: Gpu> {
    texture: G::Texture,
    width: u32,
    height: u32,
    has_image: bool,
}

impl<G: Gpu> BackgroundSurface<G> {
    /// Creates the texture holding the transparent placeholder.
    pub fn new(gpu: &mut G) -> Result<Self, GpuError> {
        let texture = gpu.create_texture()?;
        let mut surface = Self {
            texture,
            width: 0,
            height: 0,
            has_image: false,
        };
        if let Err(err) = surface.clear(gpu) {
            gpu.delete_texture(&surface.texture);
            return Err(err);
        }
        Ok(surface)
    }

    /// Drops the image and goes back to the transparent placeholder.
    pub fn clear(&mut self, gpu: &mut G) -> Result<(), GpuError> {
        let pixels = vec![0u8; (PLACEHOLDER_SIZE * PLACEHOLDER_SIZE * 4) as usize];
        gpu.configure_texture(&self.texture, sampling_for(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE));
        gpu.upload_pixels(&self.texture, PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, &pixels)?;
        self.width = PLACEHOLDER_SIZE;
        self.height = PLACEHOLDER_SIZE;
        self.has_image = false;
        Ok(())
    }

    pub fn upload(&mut self, gpu: &mut G, image: &G::Image) -> Result<(), GpuError> {
        let (width, height) = gpu.image_size(image);
        gpu.configure_texture(&self.texture, sampling_for(width, height));
        gpu.upload_image(&self.texture, image)?;
        self.width = width;
        self.height = height;
        self.has_image = true;
        Ok(())
    }

    pub fn texture(&self) -> &G::Texture {
        &self.texture
    }

    /// Natural size of the current image.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn has_image(&self) -> bool {
        self.has_image
    }

    pub fn release(self, gpu: &mut G) {
        gpu.delete_texture(&self.texture);
    }
}

/// WebGL 1 only repeats power-of-two textures.
fn sampling_for(width: u32, height: u32) -> Sampling {
    let wrap = if width.is_power_of_two() && height.is_power_of_two() {
        Wrap::Repeat
    } else {
        Wrap::ClampToEdge
    };
    Sampling {
        filter: Filter::Linear,
        wrap,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::headless::HeadlessImage;
    use crate::gpu::HeadlessGpu;

    #[test]
    fn starts_transparent() {
        let mut gpu = HeadlessGpu::default();
        let bg = BackgroundSurface::new(&mut gpu).unwrap();
        assert_eq!(bg.size(), (32, 32));
        assert!(!bg.has_image());
        assert_eq!(gpu.read_texel(*bg.texture(), 5, 5), Some([0.0; 4]));
    }

    #[test]
    fn wrap_depends_on_power_of_two() {
        let mut gpu = HeadlessGpu::default();
        let mut bg = BackgroundSurface::new(&mut gpu).unwrap();
        bg.upload(&mut gpu, &HeadlessImage::solid(64, 128, [255; 4])).unwrap();
        assert_eq!(gpu.texture_sampling(*bg.texture()).unwrap().wrap, Wrap::Repeat);
        bg.upload(&mut gpu, &HeadlessImage::solid(100, 50, [255; 4])).unwrap();
        assert_eq!(gpu.texture_sampling(*bg.texture()).unwrap().wrap, Wrap::ClampToEdge);
        assert_eq!(bg.size(), (100, 50));
        assert!(bg.has_image());
    }
}
