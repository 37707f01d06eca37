//! SDF-based wgpu render pipeline
//!
//! Renders the entire corridor in a fragment shader using signed distance
//! fields. A second pipeline evaluates obstacle distances at the player and
//! projectile into a 1x1 target whose pixel is read back synchronously.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::{FrameUniforms, Renderer, clamp_to_capacity};
use crate::consts::*;
use crate::error::{GameError, Result};
use crate::platform::ShaderBundle;
use crate::settings::QualityPreset;
use crate::sim::scene::{DirectionalLight, Light, Material};
use crate::sim::state::Obstacle;

const COLLISION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

// ============================================================================
// GPU DATA STRUCTURES (must match scene.wgsl)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct GpuGlobals {
    resolution: [f32; 2],        // offset 0
    time: f32,                   // offset 8
    win_position: f32,           // offset 12
    camera_pos: [f32; 4],        // offset 16
    view_to_world: [[f32; 4]; 3], // offset 32, mat3x3 columns padded to vec4
    player: [f32; 4],            // offset 80 - xyz + roll
    projectile: [f32; 4],        // offset 96 - xyz + live flag
    counts: [u32; 4],            // offset 112
    march: [u32; 4],             // offset 128
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct GpuPointLight {
    pos_falloff: [f32; 4],
    colour_intensity: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct GpuDirectionalLight {
    direction: [f32; 4],
    colour_intensity: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct GpuMaterial {
    diffuse: [f32; 4],
    specular_shininess: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct GpuObstacle {
    pos_angle: [f32; 4],
    info: [u32; 4], // shape, material, exists, destroyable
}

impl From<&Light> for GpuPointLight {
    fn from(l: &Light) -> Self {
        Self {
            pos_falloff: l.pos.extend(l.reciprocal_range_squared()).to_array(),
            colour_intensity: l.colour.extend(l.intensity).to_array(),
        }
    }
}

impl From<&DirectionalLight> for GpuDirectionalLight {
    fn from(l: &DirectionalLight) -> Self {
        Self {
            direction: l.direction.extend(0.0).to_array(),
            colour_intensity: l.colour.extend(l.intensity).to_array(),
        }
    }
}

impl From<&Material> for GpuMaterial {
    fn from(m: &Material) -> Self {
        Self {
            diffuse: m.diffuse.extend(1.0).to_array(),
            specular_shininess: m.specular.extend(m.shininess).to_array(),
        }
    }
}

impl From<&Obstacle> for GpuObstacle {
    fn from(o: &Obstacle) -> Self {
        Self {
            pos_angle: o.pos.extend(o.angle).to_array(),
            info: [
                o.shape.id(),
                o.material,
                o.exists as u32,
                o.destroyable as u32,
            ],
        }
    }
}

/// Pack a slice into a fixed-size uniform array, zero-filling the tail
fn pack<'a, S: 'a, G, const N: usize>(items: &'a [S], what: &str) -> (u32, [G; N])
where
    G: Pod + From<&'a S>,
{
    let items = clamp_to_capacity(items, N, what);
    let mut out = [G::zeroed(); N];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = G::from(item);
    }
    (items.len() as u32, out)
}

fn uniform_buffer(device: &wgpu::Device, label: &str, size: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: size as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn renderer_error(e: impl std::fmt::Display) -> GameError {
    GameError::Renderer(e.to_string())
}

/// Result of a buffer map after polling. Anything but a delivered `Ok`
/// leaves the buffer unusable until the map is aborted.
fn map_outcome<E: std::fmt::Display>(
    received: std::result::Result<std::result::Result<(), E>, std::sync::mpsc::TryRecvError>,
) -> Result<()> {
    match received {
        Ok(result) => result.map_err(renderer_error),
        Err(_) => Err(GameError::Renderer(
            "collision readback did not complete".into(),
        )),
    }
}

// ============================================================================
// SDF RENDER STATE
// ============================================================================

pub struct SdfRenderState {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    collision_pipeline: wgpu::RenderPipeline,

    // Uniform buffers
    globals_buffer: wgpu::Buffer,
    lights_buffer: wgpu::Buffer,
    directional_buffer: wgpu::Buffer,
    materials_buffer: wgpu::Buffer,
    obstacles_buffer: wgpu::Buffer,

    bind_group: wgpu::BindGroup,

    // Collision target and its readback staging buffer
    collision_texture: wgpu::Texture,
    collision_view: wgpu::TextureView,
    readback_buffer: wgpu::Buffer,

    globals: GpuGlobals,
    /// Obstacle buffer must be rewritten on the next push regardless of
    /// `FrameUniforms::obstacles_changed`
    obstacles_stale: bool,
    pub size: (u32, u32),
    ready: bool,
}

impl SdfRenderState {
    pub async fn new(
        surface: wgpu::Surface<'static>,
        adapter: &wgpu::Adapter,
        width: u32,
        height: u32,
        shaders: &ShaderBundle,
        quality: QualityPreset,
    ) -> Result<Self> {
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("sdf-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults(),
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            })
            .await
            .map_err(|e| GameError::Init(format!("failed to create device: {}", e)))?;

        let surface_caps = surface.get_capabilities(adapter);
        log::info!("Surface formats: {:?}", surface_caps.formats);

        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| GameError::Init("surface reports no formats".into()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        log::info!("Using surface format: {:?}", surface_format);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("vertex_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders.vertex.as_str().into()),
        });
        let scene_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders.fragment.as_str().into()),
        });
        log::info!("Shader modules created");

        let globals = GpuGlobals {
            resolution: [config.width as f32, config.height as f32],
            time: 0.0,
            win_position: 0.0,
            camera_pos: [0.0; 4],
            view_to_world: [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]],
            player: [0.0; 4],
            projectile: [0.0; 4],
            counts: [0; 4],
            march: [quality.march_steps(), quality.shadow_steps(), 0, 0],
        };
        let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("globals"),
            contents: bytemuck::bytes_of(&globals),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let lights_buffer = uniform_buffer(
            &device,
            "lights",
            std::mem::size_of::<[GpuPointLight; MAX_LIGHTS]>(),
        );
        let directional_buffer = uniform_buffer(
            &device,
            "directional_lights",
            std::mem::size_of::<[GpuDirectionalLight; MAX_DIRECTIONAL_LIGHTS]>(),
        );
        let materials_buffer = uniform_buffer(
            &device,
            "materials",
            std::mem::size_of::<[GpuMaterial; MAX_MATERIALS]>(),
        );
        let obstacles_buffer = uniform_buffer(
            &device,
            "obstacles",
            std::mem::size_of::<[GpuObstacle; MAX_OBSTACLES]>(),
        );

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sdf_bind_group_layout"),
            entries: &[
                uniform_entry(0),
                uniform_entry(1),
                uniform_entry(2),
                uniform_entry(3),
                uniform_entry(4),
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sdf_bind_group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lights_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: directional_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: materials_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: obstacles_buffer.as_entire_binding(),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sdf_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let make_pipeline = |label: &str, entry_point: &str, format: wgpu::TextureFormat| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vertex_module,
                    entry_point: Some("vs_main"),
                    buffers: &[], // No vertex buffers - fullscreen triangle
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &scene_module,
                    entry_point: Some(entry_point),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
        };
        let pipeline = make_pipeline("sdf_pipeline", "fs_main", config.format);
        let collision_pipeline = make_pipeline("collision_pipeline", "fs_collision", COLLISION_FORMAT);

        let collision_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("collision_target"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLLISION_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let collision_view = collision_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let readback_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("collision_readback"),
            size: wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Ok(Self {
            surface,
            device,
            queue,
            config,
            pipeline,
            collision_pipeline,
            globals_buffer,
            lights_buffer,
            directional_buffer,
            materials_buffer,
            obstacles_buffer,
            bind_group,
            collision_texture,
            collision_view,
            readback_buffer,
            globals,
            obstacles_stale: true,
            size: (width, height),
            ready: true,
        })
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        if new_width > 0 && new_height > 0 {
            self.size = (new_width, new_height);
            self.config.width = new_width;
            self.config.height = new_height;
            self.surface.configure(&self.device, &self.config);
            self.globals.resolution = [new_width as f32, new_height as f32];
        }
    }

    /// Mark the backend lost or restored (e.g. WebGL context events)
    pub fn set_ready(&mut self, ready: bool) {
        if ready && !self.ready {
            self.surface.configure(&self.device, &self.config);
            self.obstacles_stale = true;
        }
        self.ready = ready;
    }

    pub fn set_quality(&mut self, quality: QualityPreset) {
        self.globals.march[0] = quality.march_steps();
        self.globals.march[1] = quality.shadow_steps();
    }

    fn draw_visible(&mut self) -> Result<()> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                // Skip this frame; the next one draws into the fresh surface
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(e) => return Err(renderer_error(e)),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("sdf_encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("sdf_render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.bind_group, &[]);
            render_pass.draw(0..3, 0..1); // Fullscreen triangle
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn draw_collision(&mut self) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("collision_encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("collision_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.collision_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::WHITE),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            render_pass.set_pipeline(&self.collision_pipeline);
            render_pass.set_bind_group(0, &self.bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.collision_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.readback_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT),
                    rows_per_image: Some(1),
                },
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );

        self.queue.submit(std::iter::once(encoder.finish()));
    }
}

impl Renderer for SdfRenderState {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn push_entity_uniforms(&mut self, frame: &FrameUniforms<'_>) {
        let (light_count, lights) =
            pack::<Light, GpuPointLight, MAX_LIGHTS>(frame.lights, "lights");
        let (directional_count, directional) = pack::<DirectionalLight, GpuDirectionalLight, MAX_DIRECTIONAL_LIGHTS>(
            frame.directional_lights,
            "directional lights",
        );
        let (material_count, materials) =
            pack::<Material, GpuMaterial, MAX_MATERIALS>(frame.materials, "materials");
        let obstacle_count = frame.obstacles.len().min(MAX_OBSTACLES) as u32;

        let m = frame.view_to_world;
        self.globals.time = frame.sim_time_secs;
        self.globals.win_position = frame.win_position;
        self.globals.camera_pos = frame.camera.pos.extend(0.0).to_array();
        self.globals.view_to_world = [
            m.x_axis.extend(0.0).to_array(),
            m.y_axis.extend(0.0).to_array(),
            m.z_axis.extend(0.0).to_array(),
        ];
        self.globals.player = frame.player.pos.extend(frame.player.rotation).to_array();
        self.globals.projectile = frame
            .projectile
            .pos
            .extend(if frame.projectile.exists { 1.0 } else { 0.0 })
            .to_array();
        self.globals.counts = [light_count, directional_count, material_count, obstacle_count];

        self.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&self.globals));
        self.queue
            .write_buffer(&self.lights_buffer, 0, bytemuck::cast_slice(&lights));
        self.queue
            .write_buffer(&self.directional_buffer, 0, bytemuck::cast_slice(&directional));
        self.queue
            .write_buffer(&self.materials_buffer, 0, bytemuck::cast_slice(&materials));
        if frame.obstacles_changed || self.obstacles_stale {
            let (_, obstacles) =
                pack::<Obstacle, GpuObstacle, MAX_OBSTACLES>(frame.obstacles, "obstacles");
            self.queue
                .write_buffer(&self.obstacles_buffer, 0, bytemuck::cast_slice(&obstacles));
            self.obstacles_stale = false;
        }
    }

    fn draw_frame(&mut self, collision_pass: bool) -> Result<()> {
        if !self.ready {
            return Err(GameError::RendererUnavailable);
        }
        if collision_pass {
            self.draw_collision();
            Ok(())
        } else {
            self.draw_visible()
        }
    }

    fn query_collision_pixel(&mut self) -> Result<[u8; 2]> {
        if !self.ready {
            return Err(GameError::RendererUnavailable);
        }

        let slice = self.readback_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        // Blocks until the collision pass and copy have finished. Only the
        // GL and native backends can wait here; the callback must have run
        // by the time poll returns.
        let mapped = self
            .device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(renderer_error)
            .and_then(|_| map_outcome(rx.try_recv()));
        if let Err(e) = mapped {
            // Abort the outstanding map so the next query can map again
            self.readback_buffer.unmap();
            return Err(e);
        }

        let pixel = {
            let data = slice.get_mapped_range();
            [data[0], data[1]]
        };
        self.readback_buffer.unmap();
        Ok(pixel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::ObstacleShape;
    use glam::Vec3;

    #[test]
    fn test_globals_layout_matches_shader() {
        assert_eq!(std::mem::size_of::<GpuGlobals>(), 144);
        assert_eq!(std::mem::size_of::<GpuPointLight>(), 32);
        assert_eq!(std::mem::size_of::<GpuObstacle>(), 32);
    }

    #[test]
    fn test_map_outcome_pending_is_an_error() {
        let (tx, rx) = std::sync::mpsc::channel::<std::result::Result<(), String>>();
        assert!(matches!(map_outcome(rx.try_recv()), Err(GameError::Renderer(_))));

        tx.send(Err("device lost".into())).expect("send");
        let err = map_outcome(rx.try_recv()).expect_err("failed map");
        assert!(err.to_string().contains("device lost"));

        tx.send(Ok(())).expect("send");
        assert!(map_outcome(rx.try_recv()).is_ok());

        drop(tx);
        assert!(map_outcome(rx.try_recv()).is_err());
    }

    #[test]
    fn test_pack_zero_fills_and_clamps() {
        let mut obstacles: Vec<Obstacle> = (0..MAX_OBSTACLES + 3)
            .map(|i| Obstacle::new(Vec3::new(0.0, 0.0, -(i as f32)), 0.5, ObstacleShape::Arch, 7, true, false))
            .collect();
        obstacles[1].tombstone();

        let (count, packed) = pack::<Obstacle, GpuObstacle, MAX_OBSTACLES>(&obstacles, "obstacles");
        assert_eq!(count as usize, MAX_OBSTACLES);
        assert_eq!(packed[0].info, [2, 7, 1, 1]);
        assert_eq!(packed[1].info[2], 0);
        assert_eq!(packed[2].pos_angle, [0.0, 0.0, -2.0, 0.5]);

        let (count, packed) = pack::<Obstacle, GpuObstacle, MAX_OBSTACLES>(&obstacles[..2], "obstacles");
        assert_eq!(count, 2);
        assert_eq!(packed[5].info, [0; 4]);
    }
}
