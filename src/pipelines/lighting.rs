use wgpu::util::DeviceExt;

use crate::lighting::LightingBlock;

/// The shared lighting group: fog (binding 0), sun (binding 1) and
/// flashlight (binding 2), rewritten once per frame before any draw.
#[derive(Debug)]
pub struct LightingResources {
    pub fog_buffer: wgpu::Buffer,
    pub sun_buffer: wgpu::Buffer,
    pub flashlight_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

fn mk_buffer<T: bytemuck::Pod>(device: &wgpu::Device, label: &str, value: &T) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::bytes_of(value),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let entry = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[entry(0), entry(1), entry(2)],
        label: Some("lighting_bind_group_layout"),
    })
}

impl LightingResources {
    pub fn new(device: &wgpu::Device, block: &LightingBlock) -> Self {
        let fog_buffer = mk_buffer(device, "Fog Buffer", &block.fog);
        let sun_buffer = mk_buffer(device, "Sun Buffer", &block.sun);
        let flashlight_buffer = mk_buffer(device, "Flashlight Buffer", &block.flashlight);
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: fog_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: sun_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: flashlight_buffer.as_entire_binding(),
                },
            ],
            label: Some("lighting_bind_group"),
        });
        Self {
            fog_buffer,
            sun_buffer,
            flashlight_buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn write(&self, queue: &wgpu::Queue, block: &LightingBlock) {
        queue.write_buffer(&self.fog_buffer, 0, bytemuck::bytes_of(&block.fog));
        queue.write_buffer(&self.sun_buffer, 0, bytemuck::bytes_of(&block.sun));
        queue.write_buffer(&self.flashlight_buffer, 0, bytemuck::bytes_of(&block.flashlight));
    }
}
