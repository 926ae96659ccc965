use std::f32::consts::TAU;

use anyhow::{anyhow, Result};
use glam::{Mat4, Vec3, Vec4};
use js_sys::{Object, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    HtmlCanvasElement, WebGl2RenderingContext as Gl, WebGlBuffer, WebGlProgram, WebGlShader,
    WebGlUniformLocation, WebGlVertexArrayObject, XrWebGlLayer,
};

use super::js_error;
use crate::error::ViewerError;
use crate::frame::SceneRenderer;
use crate::scene::{ActiveLight, Lighting, Reticle, Scene};

const VERTEX_SHADER: &str = r#"#version 300 es
layout(location = 0) in vec3 position;
uniform mat4 u_mvp;
void main() {
    gl_Position = u_mvp * vec4(position, 1.0);
}
"#;

const FRAGMENT_SHADER: &str = r#"#version 300 es
precision mediump float;
uniform vec4 u_color;
out vec4 frag_color;
void main() {
    frag_color = u_color;
}
"#;

const RING_SEGMENTS: usize = 32;
const RETICLE_COLOR: Vec4 = Vec4::new(1.0, 1.0, 1.0, 1.0);
const OBJECT_COLOR: Vec3 = Vec3::new(0.85, 0.65, 0.45);

/// Line-mode WebGL2 renderer: the reticle ring and a bounding box per placed
/// object, drawn into the XR layer for every view.
pub(crate) struct WebGlRenderer {
    gl: Gl,
    canvas: HtmlCanvasElement,
    program: WebGlProgram,
    _vertex_buffer: WebGlBuffer,
    vao: WebGlVertexArrayObject,
    mvp: WebGlUniformLocation,
    color: WebGlUniformLocation,
    ring: DrawRange,
    cube: DrawRange,
    layer: Option<XrWebGlLayer>,
}

#[derive(Clone, Copy)]
struct DrawRange {
    first: i32,
    count: i32,
}

impl WebGlRenderer {
    pub(crate) fn new(canvas: HtmlCanvasElement) -> Result<Self> {
        let gl = xr_compatible_context(&canvas)?;
        let program = link_program(&gl)?;
        let mvp = gl
            .get_uniform_location(&program, "u_mvp")
            .ok_or_else(|| anyhow!("u_mvp uniform missing"))?;
        let color = gl
            .get_uniform_location(&program, "u_color")
            .ok_or_else(|| anyhow!("u_color uniform missing"))?;

        let mut vertices = Vec::new();
        let ring = push_ring(&mut vertices);
        let cube = push_cube(&mut vertices);

        let vao = gl
            .create_vertex_array()
            .ok_or_else(|| anyhow!("failed to create vertex array"))?;
        gl.bind_vertex_array(Some(&vao));
        let vertex_buffer = gl
            .create_buffer()
            .ok_or_else(|| anyhow!("failed to create vertex buffer"))?;
        gl.bind_buffer(Gl::ARRAY_BUFFER, Some(&vertex_buffer));
        gl.buffer_data_with_u8_array(
            Gl::ARRAY_BUFFER,
            bytemuck::cast_slice(&vertices),
            Gl::STATIC_DRAW,
        );
        gl.enable_vertex_attrib_array(0);
        gl.vertex_attrib_pointer_with_i32(0, 3, Gl::FLOAT, false, 12, 0);
        gl.bind_vertex_array(None);

        Ok(Self {
            gl,
            canvas,
            program,
            _vertex_buffer: vertex_buffer,
            vao,
            mvp,
            color,
            ring,
            cube,
            layer: None,
        })
    }

    pub(crate) fn context(&self) -> &Gl {
        &self.gl
    }

    pub(crate) fn attach_layer(&mut self, layer: XrWebGlLayer) {
        self.layer = Some(layer);
    }

    pub(crate) fn detach_layer(&mut self) {
        self.layer = None;
    }

    pub(crate) fn resize(&mut self, width: u32, height: u32) {
        let ratio = web_sys::window()
            .map(|window| window.device_pixel_ratio())
            .unwrap_or(1.0);
        self.canvas.set_width((width as f64 * ratio) as u32);
        self.canvas.set_height((height as f64 * ratio) as u32);
    }

    fn draw(&self, mvp: Mat4, color: Vec4, range: DrawRange) {
        self.gl
            .uniform_matrix4fv_with_f32_array(Some(&self.mvp), false, &mvp.to_cols_array());
        self.gl
            .uniform4f(Some(&self.color), color.x, color.y, color.z, color.w);
        self.gl.draw_arrays(Gl::LINES, range.first, range.count);
    }
}

impl SceneRenderer for WebGlRenderer {
    fn render(&mut self, scene: &Scene) -> Result<()> {
        // Outside a session the page shows the DOM only.
        let Some(layer) = &self.layer else {
            return Ok(());
        };
        let gl = &self.gl;
        gl.bind_framebuffer(Gl::FRAMEBUFFER, layer.framebuffer().as_ref());
        gl.clear_color(0.0, 0.0, 0.0, 0.0);
        gl.clear(Gl::COLOR_BUFFER_BIT | Gl::DEPTH_BUFFER_BIT);
        gl.enable(Gl::DEPTH_TEST);
        gl.use_program(Some(&self.program));
        gl.bind_vertex_array(Some(&self.vao));

        let object_color = lit_color(&scene.lighting);
        for view in &scene.camera.views {
            let rect = view.viewport;
            gl.viewport(rect.x, rect.y, rect.width, rect.height);
            let view_proj = view.projection * view.view;

            if scene.reticle.visible {
                self.draw(
                    view_proj * scene.reticle.transform.matrix(),
                    RETICLE_COLOR,
                    self.ring,
                );
            }
            for object in &scene.objects {
                let size = object.bounds.max - object.bounds.min;
                let model = object.transform.matrix()
                    * Mat4::from_translation(object.bounds.min)
                    * Mat4::from_scale(size.max(Vec3::splat(f32::EPSILON)));
                self.draw(view_proj * model, object_color, self.cube);
            }
        }

        gl.bind_vertex_array(None);
        Ok(())
    }
}

/// Object tint under the active light: hemisphere by default, the platform's
/// primary light once estimation is running.
fn lit_color(lighting: &Lighting) -> Vec4 {
    let light = match lighting.active() {
        ActiveLight::Hemisphere(hemisphere) => {
            (hemisphere.sky_color + hemisphere.ground_color) * 0.5 * hemisphere.intensity
        }
        ActiveLight::Estimated(estimated) => estimated.intensity,
    };
    (OBJECT_COLOR * light.clamp(Vec3::splat(0.2), Vec3::ONE)).extend(1.0)
}

/// Inner and outer circles of the reticle in the XZ plane.
fn push_ring(vertices: &mut Vec<[f32; 3]>) -> DrawRange {
    let first = vertices.len() as i32;
    for radius in [Reticle::INNER_RADIUS, Reticle::OUTER_RADIUS] {
        for segment in 0..RING_SEGMENTS {
            for step in [segment, segment + 1] {
                let angle = step as f32 / RING_SEGMENTS as f32 * TAU;
                vertices.push([radius * angle.cos(), 0.0, radius * angle.sin()]);
            }
        }
    }
    DrawRange {
        first,
        count: vertices.len() as i32 - first,
    }
}

/// The twelve edges of the unit cube.
fn push_cube(vertices: &mut Vec<[f32; 3]>) -> DrawRange {
    let first = vertices.len() as i32;
    for a in 0..8u8 {
        for axis in 0..3 {
            let bit = 1u8 << axis;
            if a & bit == 0 {
                let b = a | bit;
                vertices.push(unit_corner(a));
                vertices.push(unit_corner(b));
            }
        }
    }
    DrawRange {
        first,
        count: vertices.len() as i32 - first,
    }
}

fn unit_corner(bits: u8) -> [f32; 3] {
    [
        f32::from(bits & 1),
        f32::from((bits >> 1) & 1),
        f32::from((bits >> 2) & 1),
    ]
}

fn xr_compatible_context(canvas: &HtmlCanvasElement) -> Result<Gl> {
    let options = Object::new();
    for (key, value) in [("xrCompatible", true), ("alpha", true), ("antialias", true)] {
        Reflect::set(&options, &JsValue::from_str(key), &JsValue::from_bool(value))
            .map_err(|err| anyhow!("failed to build context options: {}", js_error(&err)))?;
    }
    let context = canvas
        .get_context_with_context_options("webgl2", &options)
        .map_err(|err| ViewerError::GraphicsContext(js_error(&err)))?
        .ok_or_else(|| ViewerError::GraphicsContext("webgl2 is unavailable".into()))?
        .dyn_into::<Gl>()
        .map_err(|_| ViewerError::GraphicsContext("context is not WebGL2".into()))?;
    Ok(context)
}

fn link_program(gl: &Gl) -> Result<WebGlProgram> {
    let vertex = compile_shader(gl, Gl::VERTEX_SHADER, VERTEX_SHADER)?;
    let fragment = compile_shader(gl, Gl::FRAGMENT_SHADER, FRAGMENT_SHADER)?;
    let program = gl
        .create_program()
        .ok_or_else(|| anyhow!("failed to create program"))?;
    gl.attach_shader(&program, &vertex);
    gl.attach_shader(&program, &fragment);
    gl.link_program(&program);
    let linked = gl
        .get_program_parameter(&program, Gl::LINK_STATUS)
        .as_bool()
        .unwrap_or(false);
    if !linked {
        let log = gl.get_program_info_log(&program).unwrap_or_default();
        return Err(anyhow!("failed to link program: {log}"));
    }
    Ok(program)
}

fn compile_shader(gl: &Gl, kind: u32, source: &str) -> Result<WebGlShader> {
    let shader = gl
        .create_shader(kind)
        .ok_or_else(|| anyhow!("failed to create shader"))?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);
    let compiled = gl
        .get_shader_parameter(&shader, Gl::COMPILE_STATUS)
        .as_bool()
        .unwrap_or(false);
    if !compiled {
        let log = gl.get_shader_info_log(&shader).unwrap_or_default();
        return Err(anyhow!("failed to compile shader: {log}"));
    }
    Ok(shader)
}
