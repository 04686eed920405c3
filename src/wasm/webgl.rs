use js_sys::Float32Array;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    HtmlCanvasElement, HtmlImageElement, WebGlBuffer, WebGlFramebuffer, WebGlProgram,
    WebGlRenderingContext as GL, WebGlShader, WebGlTexture, WebGlUniformLocation,
};

use crate::gpu::{Extension, Filter, Gpu, GpuError, Sampling, ShaderStage, TexelType, UniformValue, Wrap};
use crate::shaders::VERTEX_ATTRIBUTE;

/// `OES_texture_half_float` type constant; WebGL 1 has no core enum for it.
const HALF_FLOAT_OES: u32 = 0x8D61;

/// [`Gpu`] over a WebGL 1 context.
#[derive(Debug, Clone)]
pub struct WebGlGpu {
    gl: GL,
}

impl WebGlGpu {
    /// Gets a `webgl` context, falling back to `experimental-webgl`.
    pub fn from_canvas(canvas: &HtmlCanvasElement) -> Result<Option<Self>, JsValue> {
        let context = match canvas.get_context("webgl")? {
            Some(ctx) => Some(ctx),
            None => canvas.get_context("experimental-webgl")?,
        };
        context
            .map(|ctx| ctx.dyn_into::<GL>().map(|gl| Self { gl }))
            .transpose()
            .map_err(JsValue::from)
    }

    fn texel(texel: TexelType) -> u32 {
        match texel {
            TexelType::UnsignedByte => GL::UNSIGNED_BYTE,
            TexelType::Float => GL::FLOAT,
            TexelType::HalfFloat => HALF_FLOAT_OES,
        }
    }

    fn bind_unit0(&self, texture: &WebGlTexture) {
        self.gl.active_texture(GL::TEXTURE0);
        self.gl.bind_texture(GL::TEXTURE_2D, Some(texture));
    }
}

impl Gpu for WebGlGpu {
    type Texture = WebGlTexture;
    type Framebuffer = WebGlFramebuffer;
    type Shader = WebGlShader;
    type Program = WebGlProgram;
    type Buffer = WebGlBuffer;
    type UniformLocation = WebGlUniformLocation;
    type Image = HtmlImageElement;

    fn enable_extension(&mut self, ext: Extension) -> bool {
        matches!(self.gl.get_extension(ext.name()), Ok(Some(_)))
    }

    fn create_texture(&mut self) -> Result<WebGlTexture, GpuError> {
        self.gl
            .create_texture()
            .ok_or(GpuError::ResourceCreation("texture"))
    }

    fn delete_texture(&mut self, texture: &WebGlTexture) {
        self.gl.delete_texture(Some(texture));
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<&WebGlTexture>) {
        self.gl.active_texture(GL::TEXTURE0 + unit);
        self.gl.bind_texture(GL::TEXTURE_2D, texture);
    }

    fn configure_texture(&mut self, texture: &WebGlTexture, sampling: Sampling) {
        self.bind_unit0(texture);
        let filter = match sampling.filter {
            Filter::Nearest => GL::NEAREST,
            Filter::Linear => GL::LINEAR,
        } as i32;
        let wrap = match sampling.wrap {
            Wrap::ClampToEdge => GL::CLAMP_TO_EDGE,
            Wrap::Repeat => GL::REPEAT,
        } as i32;
        self.gl.tex_parameteri(GL::TEXTURE_2D, GL::TEXTURE_MIN_FILTER, filter);
        self.gl.tex_parameteri(GL::TEXTURE_2D, GL::TEXTURE_MAG_FILTER, filter);
        self.gl.tex_parameteri(GL::TEXTURE_2D, GL::TEXTURE_WRAP_S, wrap);
        self.gl.tex_parameteri(GL::TEXTURE_2D, GL::TEXTURE_WRAP_T, wrap);
    }

    fn allocate_texture(
        &mut self,
        texture: &WebGlTexture,
        width: u32,
        height: u32,
        texel: TexelType,
    ) -> Result<(), GpuError> {
        self.bind_unit0(texture);
        let failure = GpuError::Allocation {
            width,
            height,
            texel,
        };
        self.gl
            .tex_image_2d_with_i32_and_i32_and_i32_and_format_and_type_and_opt_u8_array(
                GL::TEXTURE_2D,
                0,
                GL::RGBA as i32,
                width as i32,
                height as i32,
                0,
                GL::RGBA,
                Self::texel(texel),
                None,
            )
            .map_err(|_| failure.clone())?;
        if self.gl.get_error() != GL::NO_ERROR {
            return Err(failure);
        }
        Ok(())
    }

    fn upload_pixels(
        &mut self,
        texture: &WebGlTexture,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<(), GpuError> {
        self.bind_unit0(texture);
        self.gl
            .tex_image_2d_with_i32_and_i32_and_i32_and_format_and_type_and_opt_u8_array(
                GL::TEXTURE_2D,
                0,
                GL::RGBA as i32,
                width as i32,
                height as i32,
                0,
                GL::RGBA,
                GL::UNSIGNED_BYTE,
                Some(pixels),
            )
            .map_err(|e| GpuError::Upload(format!("{e:?}")))
    }

    fn upload_image(&mut self, texture: &WebGlTexture, image: &HtmlImageElement) -> Result<(), GpuError> {
        self.bind_unit0(texture);
        self.gl.pixel_storei(GL::UNPACK_FLIP_Y_WEBGL, 1);
        let result = self
            .gl
            .tex_image_2d_with_u32_and_u32_and_image(
                GL::TEXTURE_2D,
                0,
                GL::RGBA as i32,
                GL::RGBA,
                GL::UNSIGNED_BYTE,
                image,
            )
            .map_err(|e| GpuError::Upload(format!("{e:?}")));
        self.gl.pixel_storei(GL::UNPACK_FLIP_Y_WEBGL, 0);
        result
    }

    fn image_size(&self, image: &HtmlImageElement) -> (u32, u32) {
        (image.natural_width(), image.natural_height())
    }

    fn create_framebuffer(&mut self) -> Result<WebGlFramebuffer, GpuError> {
        self.gl
            .create_framebuffer()
            .ok_or(GpuError::ResourceCreation("framebuffer"))
    }

    fn delete_framebuffer(&mut self, framebuffer: &WebGlFramebuffer) {
        self.gl.delete_framebuffer(Some(framebuffer));
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<&WebGlFramebuffer>) {
        self.gl.bind_framebuffer(GL::FRAMEBUFFER, framebuffer);
    }

    fn attach_color(&mut self, framebuffer: &WebGlFramebuffer, texture: &WebGlTexture) {
        self.gl.bind_framebuffer(GL::FRAMEBUFFER, Some(framebuffer));
        self.gl.framebuffer_texture_2d(
            GL::FRAMEBUFFER,
            GL::COLOR_ATTACHMENT0,
            GL::TEXTURE_2D,
            Some(texture),
            0,
        );
    }

    fn framebuffer_complete(&mut self) -> bool {
        self.gl.check_framebuffer_status(GL::FRAMEBUFFER) == GL::FRAMEBUFFER_COMPLETE
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<WebGlShader, String> {
        let kind = match stage {
            ShaderStage::Vertex => GL::VERTEX_SHADER,
            ShaderStage::Fragment => GL::FRAGMENT_SHADER,
        };
        let shader = self
            .gl
            .create_shader(kind)
            .ok_or_else(|| String::from("unable to create shader object"))?;
        self.gl.shader_source(&shader, source);
        self.gl.compile_shader(&shader);
        let compiled = self
            .gl
            .get_shader_parameter(&shader, GL::COMPILE_STATUS)
            .as_bool()
            .unwrap_or(false);
        if compiled {
            Ok(shader)
        } else {
            let log = self.gl.get_shader_info_log(&shader).unwrap_or_default();
            self.gl.delete_shader(Some(&shader));
            Err(log)
        }
    }

    fn delete_shader(&mut self, shader: WebGlShader) {
        self.gl.delete_shader(Some(&shader));
    }

    fn link_program(
        &mut self,
        _label: &str,
        vertex: &WebGlShader,
        fragment: &WebGlShader,
    ) -> Result<WebGlProgram, String> {
        let program = self
            .gl
            .create_program()
            .ok_or_else(|| String::from("unable to create program object"))?;
        self.gl.attach_shader(&program, vertex);
        self.gl.attach_shader(&program, fragment);
        self.gl
            .bind_attrib_location(&program, crate::gpu::VERTEX_ATTRIBUTE_INDEX, VERTEX_ATTRIBUTE);
        self.gl.link_program(&program);
        let linked = self
            .gl
            .get_program_parameter(&program, GL::LINK_STATUS)
            .as_bool()
            .unwrap_or(false);
        if linked {
            Ok(program)
        } else {
            let log = self.gl.get_program_info_log(&program).unwrap_or_default();
            self.gl.delete_program(Some(&program));
            Err(log)
        }
    }

    fn delete_program(&mut self, program: &WebGlProgram) {
        self.gl.delete_program(Some(program));
    }

    fn use_program(&mut self, program: &WebGlProgram) {
        self.gl.use_program(Some(program));
    }

    fn uniform_location(&mut self, program: &WebGlProgram, name: &str) -> Option<WebGlUniformLocation> {
        self.gl.get_uniform_location(program, name)
    }

    fn set_uniform(&mut self, location: &WebGlUniformLocation, value: UniformValue) {
        match value {
            UniformValue::Float(v) => self.gl.uniform1f(Some(location), v),
            UniformValue::Vec2([x, y]) => self.gl.uniform2f(Some(location), x, y),
            UniformValue::Sampler(unit) => self.gl.uniform1i(Some(location), unit),
        }
    }

    fn create_vertex_buffer(&mut self, data: &[f32]) -> Result<WebGlBuffer, GpuError> {
        let buffer = self
            .gl
            .create_buffer()
            .ok_or(GpuError::ResourceCreation("buffer"))?;
        self.gl.bind_buffer(GL::ARRAY_BUFFER, Some(&buffer));
        let array = Float32Array::from(data);
        self.gl
            .buffer_data_with_array_buffer_view(GL::ARRAY_BUFFER, &array, GL::STATIC_DRAW);
        Ok(buffer)
    }

    fn delete_buffer(&mut self, buffer: &WebGlBuffer) {
        self.gl.delete_buffer(Some(buffer));
    }

    fn enable_vertex_attribute(&mut self, index: u32) {
        self.gl.enable_vertex_attrib_array(index);
    }

    fn vertex_attribute_pointer(&mut self, buffer: &WebGlBuffer, index: u32, components: i32) {
        self.gl.bind_buffer(GL::ARRAY_BUFFER, Some(buffer));
        self.gl
            .vertex_attrib_pointer_with_i32(index, components, GL::FLOAT, false, 0, 0);
    }

    fn draw_quad(&mut self) {
        self.gl.draw_arrays(GL::TRIANGLE_FAN, 0, 4);
    }

    fn viewport(&mut self, width: u32, height: u32) {
        self.gl.viewport(0, 0, width as i32, height as i32);
    }

    fn set_blending(&mut self, enabled: bool) {
        if enabled {
            self.gl.enable(GL::BLEND);
            self.gl.blend_func(GL::SRC_ALPHA, GL::ONE_MINUS_SRC_ALPHA);
        } else {
            self.gl.disable(GL::BLEND);
        }
    }

    fn clear(&mut self) {
        self.gl.clear_color(0.0, 0.0, 0.0, 0.0);
        self.gl.clear(GL::COLOR_BUFFER_BIT | GL::DEPTH_BUFFER_BIT);
    }
}
