use std::path::Path;

use anyhow::Result;

use crate::data_structures::texture::Texture;
use crate::resources::{load_binary, resolve};

/// Load and upload an image file. `linear` keeps data textures (normals,
/// roughness, height) out of the sRGB conversion.
pub fn load_texture(
    file_name: impl AsRef<Path>,
    linear: bool,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> Result<Texture> {
    let file_name = file_name.as_ref();
    let data = load_binary(file_name)?;
    let format = file_name.extension().and_then(|e| e.to_str());
    Texture::from_bytes(
        device,
        queue,
        &data,
        &file_name.to_string_lossy(),
        format,
        linear,
    )
}

/// Like [`load_texture`] for optional assets: a missing file is not an
/// error, a broken one is logged and skipped.
pub fn load_optional_texture(
    file_name: &str,
    linear: bool,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> Option<Texture> {
    resolve(file_name)?;
    match load_texture(file_name, linear, device, queue) {
        Ok(texture) => {
            log::info!("loaded texture {file_name}");
            Some(texture)
        }
        Err(e) => {
            log::warn!("could not load {file_name}: {e:#}");
            None
        }
    }
}

/// Upload a decoded glTF image.
pub fn upload_image(
    image: &image::RgbaImage,
    linear: bool,
    label: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> Result<Texture> {
    Texture::from_rgba_image(device, queue, image, label, linear)
}
