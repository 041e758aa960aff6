#[cfg(feature = "integration-tests")]
mod common;

#[cfg(feature = "integration-tests")]
fn srgb_byte(linear: f32) -> u8 {
    let c = linear.clamp(0.0, 1.0);
    let encoded = if c <= 0.003_130_8 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (encoded * 255.0).round() as u8
}

#[test]
#[cfg(feature = "integration-tests")]
fn renders_the_dense_scene_offscreen() {
    use frost_ngin::context;
    use frost_ngin::render::RenderNode;
    use frost_ngin::renderer::{Renderer, render_offscreen};
    use frost_ngin::resources::glb::GltfAsset;
    use frost_ngin::scene::Scene;

    use crate::common::test_utils::{dense_config, skinned_triangle_glb};

    let _ = env_logger::builder().is_test(true).try_init();
    let (device, queue) = futures::executor::block_on(context::headless()).unwrap();

    let config = dense_config();
    let mut scene = Scene::new(config.clone(), 320, 240);
    let mut renderer = Renderer::new(
        &device,
        &queue,
        wgpu::TextureFormat::Rgba8UnormSrgb,
        [320, 240],
        config.material.to_uniform(),
    )
    .unwrap();
    let asset = GltfAsset::from_glb_bytes(&skinned_triangle_glb(), "tri", None).unwrap();
    assert_eq!(renderer.add_model(&device, &queue, &asset), scene.add_model(asset));

    scene.update(0.016);
    let (graph, image) = render_offscreen(&device, &queue, &mut renderer, &scene.render_inputs()).unwrap();
    assert_eq!(graph.instanced_draws(), 3);
    assert!(graph.nodes().contains(&RenderNode::Ground));
    assert!(graph.nodes().contains(&RenderNode::Model { slot: 0 }));
    assert_eq!(image.dimensions(), (320, 240));

    // Nothing is drawn above the horizon at the top of the frame.
    let sky = image.get_pixel(0, 0);
    for (channel, linear) in sky.0.iter().zip(config.fog.background_color) {
        assert!(channel.abs_diff(srgb_byte(linear)) <= 2, "sky pixel {sky:?}");
    }
    assert_eq!(sky.0[3], 255);

    // The ground and object field fill the bottom of the frame.
    let ground = image.get_pixel(160, 235);
    assert_ne!(ground, sky);
}

#[test]
#[cfg(feature = "integration-tests")]
fn empty_scene_renders_the_fog_background() {
    use frost_ngin::config::{Preset, SceneConfig};
    use frost_ngin::context;
    use frost_ngin::renderer::{Renderer, render_offscreen};
    use frost_ngin::scene::Scene;

    let (device, queue) = futures::executor::block_on(context::headless()).unwrap();

    let mut config = SceneConfig::default();
    config.performance.apply_preset(Preset::Custom);
    config.performance.object_count = 0;
    config.snow.simulation.count = 0;
    config.debug_visual.show_ground = false;

    let mut scene = Scene::new(config.clone(), 64, 64);
    let mut renderer = Renderer::new(
        &device,
        &queue,
        wgpu::TextureFormat::Rgba8UnormSrgb,
        [64, 64],
        config.material.to_uniform(),
    )
    .unwrap();
    scene.update(0.016);
    let (graph, image) = render_offscreen(&device, &queue, &mut renderer, &scene.render_inputs()).unwrap();
    assert!(graph.nodes().is_empty());

    let expected = config.fog.background_color.map(srgb_byte);
    for pixel in image.pixels() {
        for (channel, want) in pixel.0.iter().zip(expected) {
            assert!(channel.abs_diff(want) <= 2, "pixel {pixel:?}");
        }
    }
}

#[test]
#[cfg(feature = "integration-tests")]
fn unusable_target_format_fails_renderer_initialization() {
    use frost_ngin::config::SceneConfig;
    use frost_ngin::context;
    use frost_ngin::renderer::Renderer;

    let _ = env_logger::builder().is_test(true).try_init();
    let (device, queue) = futures::executor::block_on(context::headless()).unwrap();

    // A depth format cannot be a color attachment, so the surface program
    // fails validation.
    let result = Renderer::new(
        &device,
        &queue,
        wgpu::TextureFormat::Depth32Float,
        [64, 64],
        SceneConfig::default().material.to_uniform(),
    );
    assert!(result.is_err());
}
