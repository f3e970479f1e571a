use crate::mesh::{Vertex, cube_mesh, plane_mesh};
use crate::shaders;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use spincube_common::{CubePose, Viewport};
use spincube_render::{PerspectiveCamera, RenderError, Rgb, SceneDesc, SceneHandle};
use wgpu::util::DeviceExt;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Globals {
    view_proj: [[f32; 4]; 4],
    light_view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    ambient: [f32; 4],
    sun_dir: [f32; 4],
    sun_color: [f32; 4],
    point_pos: [f32; 4],
    point_color: [f32; 4],
    env_low: [f32; 4],
    env_high: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct NodeUniforms {
    model: [[f32; 4]; 4],
    color: [f32; 4],
    material: [f32; 4],
    flags: [f32; 4],
}

fn scaled(color: Rgb, intensity: f32) -> [f32; 4] {
    let [r, g, b] = color.to_linear();
    [r * intensity, g * intensity, b * intensity, 1.0]
}

fn opaque(color: Rgb) -> [f32; 4] {
    scaled(color, 1.0)
}

/// GPU mesh: vertex and index buffers plus the node uniforms it is drawn with.
struct MeshBuffers {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
    uniforms: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl MeshBuffers {
    fn new(
        device: &wgpu::Device,
        label: &str,
        layout: &wgpu::BindGroupLayout,
        (vertices, indices): (Vec<Vertex>, Vec<u16>),
        node: NodeUniforms,
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}_vertex_buffer")),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}_index_buffer")),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}_uniforms")),
            contents: bytemuck::bytes_of(&node),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label}_bind_group")),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.as_entire_binding(),
            }],
        });
        Self {
            vertices: vertex_buffer,
            indices: index_buffer,
            index_count: indices.len() as u32,
            uniforms,
            bind_group,
        }
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_bind_group(1, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertices.slice(..));
        pass.set_index_buffer(self.indices.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }

    fn destroy(&self) {
        self.vertices.destroy();
        self.indices.destroy();
        self.uniforms.destroy();
    }
}

/// Size-dependent render targets.
struct Targets {
    viewport: Viewport,
    depth: wgpu::Texture,
    depth_view: wgpu::TextureView,
    msaa: Option<(wgpu::Texture, wgpu::TextureView)>,
}

impl Targets {
    fn new(
        device: &wgpu::Device,
        viewport: Viewport,
        format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: viewport.width.max(1),
            height: viewport.height.max(1),
            depth_or_array_layers: 1,
        };
        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size,
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth_view = depth.create_view(&Default::default());

        let msaa = (sample_count > 1).then(|| {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("msaa_color_texture"),
                size,
                mip_level_count: 1,
                sample_count,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            });
            let view = texture.create_view(&Default::default());
            (texture, view)
        });

        Self {
            viewport,
            depth,
            depth_view,
            msaa,
        }
    }

    fn destroy(&self) {
        self.depth.destroy();
        if let Some((texture, _)) = &self.msaa {
            texture.destroy();
        }
    }
}

/// The widget's scene on the GPU: cube, floor, lights and shadow map.
///
/// `submit` and `resize` only stage state; `render` uploads it and records
/// the passes, so the host keeps control of surface acquisition and
/// presentation.
pub struct WgpuScene {
    desc: SceneDesc,
    camera: PerspectiveCamera,
    surface_format: wgpu::TextureFormat,
    sample_count: u32,
    staged_pose: Option<CubePose>,
    pending_viewport: Option<Viewport>,

    cube_pipeline: wgpu::RenderPipeline,
    ground_pipeline: wgpu::RenderPipeline,
    shadow_pipeline: wgpu::RenderPipeline,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    shadow_globals_bind_group: wgpu::BindGroup,
    cube: MeshBuffers,
    ground: MeshBuffers,
    shadow_map: wgpu::Texture,
    shadow_view: wgpu::TextureView,
    targets: Targets,
}

impl WgpuScene {
    /// Build every GPU object the scene needs. Runs once per mount.
    pub fn new(
        device: &wgpu::Device,
        desc: &SceneDesc,
        viewport: Viewport,
        surface_format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Result<Self, RenderError> {
        if viewport.is_empty() {
            return Err(RenderError::EmptyViewport);
        }
        let sample_count = if desc.antialias { sample_count.max(1) } else { 1 };

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("globals_buffer"),
            size: std::mem::size_of::<Globals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let shadow_globals_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("shadow_globals_layout"),
                entries: &[uniform_entry(0)],
            });
        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("globals_layout"),
            entries: &[
                uniform_entry(0),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });
        let node_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("node_layout"),
            entries: &[uniform_entry(0)],
        });

        // Shadow map
        let shadow_size = desc.directional.shadow.map(|s| s.map_size).unwrap_or(1).max(1);
        let shadow_map = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("shadow_map"),
            size: wgpu::Extent3d {
                width: shadow_size,
                height: shadow_size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let shadow_view = shadow_map.create_view(&Default::default());
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("globals_bind_group"),
            layout: &globals_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&shadow_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&shadow_sampler),
                },
            ],
        });
        let shadow_globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shadow_globals_bind_group"),
            layout: &shadow_globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![
                0 => Float32x3,
                1 => Float32x3,
            ],
        };
        let position_only_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![0 => Float32x3],
        };

        // Shadow pipeline
        let shadow_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("shadow_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::shadow_shader().into()),
        });
        let shadow_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("shadow_pipeline_layout"),
            bind_group_layouts: &[&shadow_globals_layout, &node_layout],
            push_constant_ranges: &[],
        });
        let shadow_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("shadow_pipeline"),
            layout: Some(&shadow_layout),
            vertex: wgpu::VertexState {
                module: &shadow_shader,
                entry_point: Some("vs_shadow"),
                compilation_options: Default::default(),
                buffers: &[position_only_layout],
            },
            fragment: None,
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: Default::default(),
                bias: wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                },
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        // Cube and ground pipelines
        let scene_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::scene_shader().into()),
        });
        let scene_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_pipeline_layout"),
            bind_group_layouts: &[&globals_layout, &node_layout],
            push_constant_ranges: &[],
        });
        let multisample = wgpu::MultisampleState {
            count: sample_count,
            ..Default::default()
        };

        let cube_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("cube_pipeline"),
            layout: Some(&scene_layout),
            vertex: wgpu::VertexState {
                module: &scene_shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[vertex_layout.clone()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &scene_shader,
                entry_point: Some("fs_cube"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample,
            multiview: None,
            cache: None,
        });

        let ground_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("ground_pipeline"),
            layout: Some(&scene_layout),
            vertex: wgpu::VertexState {
                module: &scene_shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[vertex_layout],
            },
            fragment: Some(wgpu::FragmentState {
                module: &scene_shader,
                entry_point: Some("fs_ground"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample,
            multiview: None,
            cache: None,
        });

        let material = desc.cube.material;
        let cube = MeshBuffers::new(
            device,
            "cube",
            &node_layout,
            cube_mesh(desc.cube.size),
            NodeUniforms {
                model: Mat4::IDENTITY.to_cols_array_2d(),
                color: opaque(material.color),
                material: [material.metalness, material.roughness, material.env_intensity, 0.0],
                flags: [f32::from(u8::from(desc.cube.receive_shadow)), 0.0, 0.0, 0.0],
            },
        );
        let ground = MeshBuffers::new(
            device,
            "ground",
            &node_layout,
            plane_mesh(desc.ground.width, desc.ground.depth),
            NodeUniforms {
                model: desc.ground.transform().to_cols_array_2d(),
                color: [0.0, 0.0, 0.0, 1.0],
                material: [0.0, 1.0, 0.0, desc.ground.shadow_opacity],
                flags: [1.0, 0.0, 0.0, 0.0],
            },
        );

        let targets = Targets::new(device, viewport, surface_format, sample_count);
        let mut camera = desc.camera;
        camera.set_viewport(viewport);

        tracing::debug!(
            width = viewport.width,
            height = viewport.height,
            sample_count,
            shadow_size,
            "gpu scene created"
        );

        Ok(Self {
            desc: *desc,
            camera,
            surface_format,
            sample_count,
            staged_pose: None,
            pending_viewport: None,
            cube_pipeline,
            ground_pipeline,
            shadow_pipeline,
            globals_buffer,
            globals_bind_group,
            shadow_globals_bind_group,
            cube,
            ground,
            shadow_map,
            shadow_view,
            targets,
        })
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Pixel size the next draw will use.
    pub fn viewport(&self) -> Viewport {
        self.pending_viewport.unwrap_or(self.targets.viewport)
    }

    fn globals(&self) -> Globals {
        let light_view_proj = self
            .desc
            .directional
            .shadow_view_projection()
            .unwrap_or(Mat4::IDENTITY);
        let sun_dir = self.desc.directional.position.normalize_or(Vec3::Y);
        let point = &self.desc.point;
        let (env_low, env_high) = self.desc.cube.material.env_gradient;

        Globals {
            view_proj: self.camera.view_projection().to_cols_array_2d(),
            light_view_proj: light_view_proj.to_cols_array_2d(),
            camera_pos: self.camera.position.extend(1.0).to_array(),
            ambient: scaled(self.desc.ambient.color, self.desc.ambient.intensity),
            sun_dir: sun_dir.extend(0.0).to_array(),
            sun_color: scaled(self.desc.directional.color, self.desc.directional.intensity),
            point_pos: point.position.extend(point.distance).to_array(),
            point_color: scaled(point.color, point.intensity),
            env_low: opaque(env_low),
            env_high: opaque(env_high),
        }
    }

    /// Upload staged state and record the shadow and main passes into
    /// `target`. Clears to the background even before the first `submit`.
    pub fn render(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, target: &wgpu::TextureView) {
        if let Some(viewport) = self.pending_viewport.take() {
            self.targets.destroy();
            self.targets = Targets::new(device, viewport, self.surface_format, self.sample_count);
            tracing::debug!(width = viewport.width, height = viewport.height, "render targets resized");
        }

        queue.write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&self.globals()));

        let pose = self.staged_pose;
        if let Some(pose) = &pose {
            let model = self.desc.cube_transform(pose);
            queue.write_buffer(&self.cube.uniforms, 0, bytemuck::bytes_of(&model.to_cols_array_2d()));
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("scene_encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("shadow_pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            let casts = self.desc.cube.cast_shadow && self.desc.directional.shadow.is_some();
            if pose.is_some() && casts {
                pass.set_pipeline(&self.shadow_pipeline);
                pass.set_bind_group(0, &self.shadow_globals_bind_group, &[]);
                self.cube.draw(&mut pass);
            }
        }

        {
            let [r, g, b] = self.desc.background.to_linear();
            let (view, resolve_target) = match &self.targets.msaa {
                Some((_, msaa_view)) => (msaa_view, Some(target)),
                None => (target, None),
            };
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            if pose.is_some() {
                pass.set_bind_group(0, &self.globals_bind_group, &[]);
                pass.set_pipeline(&self.cube_pipeline);
                self.cube.draw(&mut pass);
                pass.set_pipeline(&self.ground_pipeline);
                self.ground.draw(&mut pass);
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
    }
}

impl SceneHandle for WgpuScene {
    fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    fn resize(&mut self, viewport: Viewport) {
        if viewport.is_empty() {
            return;
        }
        self.camera.set_viewport(viewport);
        self.pending_viewport = Some(viewport);
    }

    fn submit(&mut self, pose: &CubePose) {
        self.staged_pose = Some(*pose);
    }
}

impl Drop for WgpuScene {
    fn drop(&mut self) {
        self.cube.destroy();
        self.ground.destroy();
        self.globals_buffer.destroy();
        self.shadow_map.destroy();
        self.targets.destroy();
        tracing::debug!("gpu scene released");
    }
}
