//! Transforms and per-instance GPU records.
//!
//! [`Trs`] is the translation/rotation/scale triple used by the glTF node
//! hierarchy and by model placement. [`InstanceRaw`] is what actually lands
//! in an instance buffer: a single model matrix consumed at vertex
//! locations 3..6.

use cgmath::{One, Point3};

use crate::data_structures::model;

/// Translation, rotation (unit quaternion) and scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Trs {
    pub translation: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Trs {
    /// Identity transformation (no move, rotate, or scale).
    pub fn identity() -> Self {
        Self {
            translation: cgmath::Vector3::new(0.0, 0.0, 0.0),
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    /// Build from glTF's decomposed layout: rotation is stored `[x, y, z, w]`.
    pub fn from_gltf(translation: [f32; 3], rotation: [f32; 4], scale: [f32; 3]) -> Self {
        Self {
            translation: translation.into(),
            rotation: cgmath::Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]),
            scale: scale.into(),
        }
    }

    /// `T * R * S`
    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.translation)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

impl Default for Trs {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<cgmath::Vector3<f32>> for Trs {
    fn from(translation: cgmath::Vector3<f32>) -> Self {
        Trs {
            translation,
            ..Default::default()
        }
    }
}

/**
 * The raw instance is the actual data stored on the GPU: one model matrix,
 * column-major, exactly `size_of::<mat4>()` bytes per instance.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
}

impl InstanceRaw {
    /// Model matrix of a rigid instance: `translate(position)`.
    pub fn from_position(position: Point3<f32>) -> Self {
        Self {
            model: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [position.x, position.y, position.z, 1.0],
            ],
        }
    }

    pub fn translation(&self) -> Point3<f32> {
        Point3::new(self.model[3][0], self.model[3][1], self.model[3][2])
    }
}

/**
 * Instance attributes occupy locations 3..6: a mat4 takes four vertex slots
 * as it is technically four vec4s, and the step mode advances once per
 * instance (divisor 1).
 */
impl model::Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// A per-frame vertex/instance stream. The buffer grows geometrically and is
/// rewritten in place with `Queue::write_buffer`; contents are only valid for
/// the frame that uploaded them.
#[derive(Debug)]
pub struct DynamicBuffer {
    label: String,
    buffer: Option<wgpu::Buffer>,
    capacity: wgpu::BufferAddress,
    len: u32,
}

impl DynamicBuffer {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            buffer: None,
            capacity: 0,
            len: 0,
        }
    }

    /// Upload `items`, replacing the previous contents. Empty uploads keep the
    /// allocation and set the length to zero.
    pub fn upload<T: bytemuck::Pod>(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, items: &[T]) {
        self.len = items.len() as u32;
        if items.is_empty() {
            return;
        }
        let bytes: &[u8] = bytemuck::cast_slice(items);
        let needed = bytes.len() as wgpu::BufferAddress;
        if self.buffer.is_none() || needed > self.capacity {
            self.destroy();
            let capacity = needed.next_power_of_two().max(wgpu::COPY_BUFFER_ALIGNMENT * 64);
            self.buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&self.label),
                size: capacity,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.capacity = capacity;
            self.len = items.len() as u32;
        }
        if let Some(buffer) = &self.buffer {
            queue.write_buffer(buffer, 0, bytes);
        }
    }

    /// Element count of the last upload.
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn buffer(&self) -> Option<&wgpu::Buffer> {
        self.buffer.as_ref()
    }

    /// Release the GPU allocation. The buffer is taken out first, so a second
    /// call is a no-op.
    pub fn destroy(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            buffer.destroy();
        }
        self.capacity = 0;
        self.len = 0;
    }
}

impl Drop for DynamicBuffer {
    fn drop(&mut self) {
        self.destroy();
    }
}
