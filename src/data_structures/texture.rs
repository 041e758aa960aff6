//! GPU textures.
//!
//! Every texture the viewer binds is one of four kinds: the depth buffer,
//! the two overlay ping-pong targets, 1x1 fallbacks for missing material
//! maps, and decoded images (ground, snowflake, glTF materials). Samplers
//! are created per bind group from a [`SamplerKind`].

use anyhow::{Result, bail};
use image::{ImageFormat, RgbaImage};

#[derive(Clone, Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

/// How a bind group samples its textures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SamplerKind {
    /// Tiling material and particle textures.
    Repeat,
    /// Screen-space targets; advection must not wrap content around.
    Clamp,
}

pub fn create_sampler(device: &wgpu::Device, kind: SamplerKind) -> wgpu::Sampler {
    let (address_mode, mipmap_filter, label) = match kind {
        SamplerKind::Repeat => (wgpu::AddressMode::Repeat, wgpu::FilterMode::Linear, "repeat_sampler"),
        SamplerKind::Clamp => (wgpu::AddressMode::ClampToEdge, wgpu::FilterMode::Nearest, "clamp_sampler"),
    };
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter,
        ..Default::default()
    })
}

fn extent([width, height]: [u32; 2]) -> wgpu::Extent3d {
    // A minimised window still needs a valid attachment.
    wgpu::Extent3d {
        width: width.max(1),
        height: height.max(1),
        depth_or_array_layers: 1,
    }
}

/// sRGB for color data, linear for data textures (normals, roughness).
fn color_format(linear: bool) -> wgpu::TextureFormat {
    if linear {
        wgpu::TextureFormat::Rgba8Unorm
    } else {
        wgpu::TextureFormat::Rgba8UnormSrgb
    }
}

impl Texture {
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
    /// Overlay targets keep decaying trails without 8-bit banding.
    pub const ACCUMULATION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

    fn allocate(
        device: &wgpu::Device,
        label: &str,
        size: [u32; 2],
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// Depth attachment of the main pass, recreated on every resize.
    pub fn depth(device: &wgpu::Device, size: [u32; 2]) -> Self {
        Self::allocate(
            device,
            "depth_texture",
            size,
            Self::DEPTH_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        )
    }

    /// A color target that is rendered into on one frame and sampled on
    /// the next.
    pub fn render_target(device: &wgpu::Device, size: [u32; 2], format: wgpu::TextureFormat, label: &str) -> Self {
        Self::allocate(
            device,
            label,
            size,
            format,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_SRC,
        )
    }

    /// A 1x1 texture holding `rgba`, bound in place of a missing map.
    pub fn solid(device: &wgpu::Device, queue: &wgpu::Queue, rgba: [u8; 4], linear: bool, label: &str) -> Self {
        Self::upload(device, queue, &rgba, [1, 1], linear, label)
    }

    /// Decode `bytes`; `hint` is a file extension, without it the decoder
    /// guesses the format.
    pub fn from_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bytes: &[u8],
        label: &str,
        hint: Option<&str>,
        linear: bool,
    ) -> Result<Self> {
        let decoded = match hint {
            None => image::load_from_memory(bytes)?,
            Some(ext) => match ImageFormat::from_extension(ext) {
                Some(format) => image::load_from_memory_with_format(bytes, format)?,
                None => bail!("unknown image format `{ext}` for {label}"),
            },
        };
        Self::from_rgba_image(device, queue, &decoded.to_rgba8(), label, linear)
    }

    pub fn from_rgba_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &RgbaImage,
        label: &str,
        linear: bool,
    ) -> Result<Self> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            bail!("image {label} is empty");
        }
        Ok(Self::upload(device, queue, image.as_raw(), [width, height], linear, label))
    }

    fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: &[u8],
        [width, height]: [u32; 2],
        linear: bool,
        label: &str,
    ) -> Self {
        let texture = Self::allocate(
            device,
            label,
            [width, height],
            color_format(linear),
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            extent([width, height]),
        );
        texture
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sizes_are_bumped_to_one_pixel() {
        let size = extent([0, 720]);
        assert_eq!((size.width, size.height), (1, 720));
    }

    #[test]
    fn data_textures_skip_srgb() {
        assert_eq!(color_format(true), wgpu::TextureFormat::Rgba8Unorm);
        assert!(color_format(false).is_srgb());
    }
}
