//! Double-buffered height field and the diffusion step.
//!
//! Texel R holds height, G holds velocity. Every pass reads the readable
//! surface, renders into the writable one, then swaps the two roles.

use crate::capability::Capabilities;
use crate::gpu::{Filter, FullscreenQuad, Gpu, GpuError, Sampling, Wrap};
use crate::program::ShaderProgram;

/// A texture paired with the framebuffer that renders into it.
#[derive(Debug)]
pub struct Surface<G: Gpu> {
    pub texture: G::Texture,
    pub framebuffer: G::Framebuffer,
}

impl<G: Gpu> Surface<G> {
    fn new(gpu: &mut G, resolution: u32, caps: &Capabilities) -> Result<Self, GpuError> {
        let sampling = Sampling {
            filter: if caps.linear_filterable {
                Filter::Linear
            } else {
                Filter::Nearest
            },
            wrap: Wrap::ClampToEdge,
        };
        let texture = gpu.create_texture()?;
        gpu.configure_texture(&texture, sampling);
        if let Err(err) =
            gpu.allocate_texture(&texture, resolution, resolution, caps.format.texel_type())
        {
            gpu.delete_texture(&texture);
            return Err(err);
        }
        let framebuffer = match gpu.create_framebuffer() {
            Ok(fb) => fb,
            Err(err) => {
                gpu.delete_texture(&texture);
                return Err(err);
            }
        };
        gpu.attach_color(&framebuffer, &texture);
        Ok(Self {
            texture,
            framebuffer,
        })
    }

    fn release(self, gpu: &mut G) {
        gpu.delete_framebuffer(&self.framebuffer);
        gpu.delete_texture(&self.texture);
    }
}

#[derive(Debug)]
pub struct HeightField<G: Gpu> {
    surfaces: [Surface<G>; 2],
    write: usize,
    read: usize,
    resolution: u32,
}

impl<G: Gpu> HeightField<G> {
    /// Allocates both zeroed surfaces at `resolution × resolution`.
    pub fn new(gpu: &mut G, caps: &Capabilities, resolution: u32) -> Result<Self, GpuError> {
        let first = Surface::new(gpu, resolution, caps)?;
        let second = match Surface::new(gpu, resolution, caps) {
            Ok(surface) => surface,
            Err(err) => {
                first.release(gpu);
                return Err(err);
            }
        };
        gpu.bind_framebuffer(None);
        Ok(Self {
            surfaces: [first, second],
            write: 0,
            read: 1,
            resolution,
        })
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn read_index(&self) -> usize {
        self.read
    }

    pub fn write_index(&self) -> usize {
        self.write
    }

    /// The surface holding the latest simulation state.
    pub fn readable(&self) -> &G::Texture {
        &self.surfaces[self.read].texture
    }

    pub fn texture(&self, index: usize) -> Option<&G::Texture> {
        self.surfaces.get(index).map(|s| &s.texture)
    }

    pub fn swap(&mut self) {
        std::mem::swap(&mut self.write, &mut self.read);
    }

    /// Advances the wave simulation by one tick.
    pub fn step(
        &mut self,
        gpu: &mut G,
        diffuse: &ShaderProgram<G>,
        quad: &FullscreenQuad<G>,
    ) {
        self.run_pass(gpu, diffuse, quad);
    }

    /// Draws `program` from the readable into the writable surface and swaps.
    pub(crate) fn run_pass(&mut self, gpu: &mut G, program: &ShaderProgram<G>, quad: &FullscreenQuad<G>) {
        let target = &self.surfaces[self.write];
        gpu.bind_framebuffer(Some(&target.framebuffer));
        gpu.viewport(self.resolution, self.resolution);
        gpu.bind_texture(0, Some(&self.surfaces[self.read].texture));
        program.activate(gpu);
        quad.draw(gpu);
        self.swap();
    }

    pub fn release(self, gpu: &mut G) {
        let [first, second] = self.surfaces;
        first.release(gpu);
        second.release(gpu);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::probe;
    use crate::gpu::{HeadlessGpu, HeadlessProfile};
    use crate::program::Programs;

    fn setup(resolution: u32) -> (HeadlessGpu, HeightField<HeadlessGpu>, Programs<HeadlessGpu>, FullscreenQuad<HeadlessGpu>) {
        let mut gpu = HeadlessGpu::default();
        let caps = probe(&mut gpu).unwrap();
        let field = HeightField::new(&mut gpu, &caps, resolution).unwrap();
        let programs = Programs::compile_all(&mut gpu, resolution).unwrap();
        let quad = FullscreenQuad::new(&mut gpu).unwrap();
        (gpu, field, programs, quad)
    }

    #[test]
    fn starts_writing_to_first_surface() {
        let (_, field, _, _) = setup(8);
        assert_eq!((field.write_index(), field.read_index()), (0, 1));
    }

    #[test]
    fn step_alternates_roles() {
        let (mut gpu, mut field, programs, quad) = setup(8);
        for n in 1..=5 {
            field.step(&mut gpu, &programs.diffuse, &quad);
            assert_ne!(field.read_index(), field.write_index());
            assert_eq!(field.read_index(), if n % 2 == 1 { 0 } else { 1 });
        }
        assert_eq!(gpu.feedback_loops(), 0);
    }

    #[test]
    fn surfaces_use_linear_only_when_supported() {
        let mut gpu = HeadlessGpu::new(HeadlessProfile::full().without_linear());
        let caps = probe(&mut gpu).unwrap();
        let field = HeightField::new(&mut gpu, &caps, 4).unwrap();
        let sampling = gpu.texture_sampling(*field.readable()).unwrap();
        assert_eq!(sampling.filter, Filter::Nearest);
        assert_eq!(sampling.wrap, Wrap::ClampToEdge);
    }

    #[test]
    fn raised_texel_spreads_to_neighbours() {
        let (mut gpu, mut field, programs, quad) = setup(8);
        gpu.write_texel(*field.readable(), 4, 4, [0.5, 0.0, 0.0, 0.0]);
        field.step(&mut gpu, &programs.diffuse, &quad);

        let center = gpu.read_texel(*field.readable(), 4, 4).unwrap();
        let neighbour = gpu.read_texel(*field.readable(), 5, 4).unwrap();
        // velocity = (0 - 0.5) * 2 * 0.995, height = 0.5 + velocity
        assert!((center[1] - (-0.995)).abs() < 1e-6);
        assert!((center[0] - (0.5 - 0.995)).abs() < 1e-6);
        assert!(neighbour[0] > 0.0);
    }

    #[test]
    fn values_stay_clamped() {
        let (mut gpu, mut field, programs, quad) = setup(4);
        gpu.write_texel(*field.readable(), 1, 1, [1.0, 1.0, 0.0, 0.0]);
        for _ in 0..20 {
            field.step(&mut gpu, &programs.diffuse, &quad);
        }
        for y in 0..4 {
            for x in 0..4 {
                let texel = gpu.read_texel(*field.readable(), x, y).unwrap();
                assert!((-1.0..=1.0).contains(&texel[0]));
                assert!((-1.0..=1.0).contains(&texel[1]));
            }
        }
    }

    #[test]
    fn release_frees_both_surfaces() {
        let mut gpu = HeadlessGpu::default();
        let caps = probe(&mut gpu).unwrap();
        let field = HeightField::new(&mut gpu, &caps, 4).unwrap();
        field.release(&mut gpu);
        assert_eq!(gpu.stats().live(), 0);
    }
}
