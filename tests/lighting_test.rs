use approx::assert_relative_eq;
use cgmath::{Point3, Vector3};
use frost_ngin::lighting::LightingBlock;
use frost_ngin::lighting::flashlight::{Flashlight, attenuation, cone_falloff};
use frost_ngin::lighting::fog::FogParams;
use frost_ngin::lighting::sun::Sun;

fn torch(inner_deg: f32, outer_deg: f32) -> Flashlight {
    Flashlight {
        enabled: true,
        position: [0.0, 0.0, 0.0],
        direction: [0.0, 0.0, -1.0],
        brightness: 2.0,
        inner_cutoff_cos: inner_deg.to_radians().cos(),
        outer_cutoff_cos: outer_deg.to_radians().cos(),
        ..Default::default()
    }
}

/// A point `distance` away from the origin, `angle_deg` off the -Z axis.
fn off_axis(angle_deg: f32, distance: f32) -> Point3<f32> {
    let (sin, cos) = angle_deg.to_radians().sin_cos();
    Point3::new(sin * distance, 0.0, -cos * distance)
}

#[test]
fn equal_cutoffs_give_a_hard_cone() {
    let light = torch(20.0, 20.0);
    assert_eq!(light.intensity(off_axis(0.0, 5.0)), 2.0);
    assert_eq!(light.intensity(off_axis(19.0, 5.0)), 2.0);
    assert_eq!(light.intensity(off_axis(21.0, 5.0)), 0.0);

    let cos = 20f32.to_radians().cos();
    assert_eq!(cone_falloff(cos, cos, cos), 1.0);
    assert_eq!(cone_falloff(cos - 1e-3, cos, cos), 0.0);
}

#[test]
fn soft_cone_fades_between_the_cutoffs() {
    let light = torch(10.0, 30.0);
    assert_relative_eq!(light.intensity(off_axis(5.0, 5.0)), 2.0);
    assert_eq!(light.intensity(off_axis(35.0, 5.0)), 0.0);
    let middle = light.intensity(off_axis(20.0, 5.0));
    assert!(middle > 0.0 && middle < 2.0);
    assert!(light.intensity(off_axis(15.0, 5.0)) > light.intensity(off_axis(25.0, 5.0)));
}

#[test]
fn attenuation_follows_the_quadratic_falloff() {
    assert_eq!(attenuation(0.0), 1.0);
    assert_relative_eq!(attenuation(10.0), 1.0 / 1.4, epsilon = 1e-6);
    assert_relative_eq!(attenuation(50.0), 1.0 / (1.0 + 1.0 + 5.0), epsilon = 1e-6);
    assert_eq!(attenuation(-3.0), 1.0);

    let light = torch(20.0, 25.0);
    let frag = off_axis(0.0, 10.0);
    assert_relative_eq!(light.contribution(frag), 2.0 / 1.4, epsilon = 1e-5);
}

#[test]
fn disabled_flashlight_contributes_nothing() {
    let mut light = torch(20.0, 25.0);
    light.toggle();
    assert_eq!(light.intensity(off_axis(0.0, 1.0)), 0.0);
    assert_eq!(light.to_uniform().params[0], 0.0);
}

#[test]
fn following_the_camera_aims_along_its_front() {
    let mut light = Flashlight::default();
    light.follow_camera(
        Point3::new(1.0, 2.0, 3.0),
        Vector3::new(0.0, 0.0, -2.0),
        Vector3::unit_x(),
        Vector3::unit_y(),
    );
    assert_eq!(light.direction, [0.0, 0.0, -1.0]);
    assert_relative_eq!(light.position[0], 1.15, epsilon = 1e-6);
    assert_relative_eq!(light.position[1], 1.9, epsilon = 1e-6);
    assert_relative_eq!(light.position[2], 3.0);
}

#[test]
fn fog_grows_with_depth() {
    let fog = FogParams::default();
    assert_eq!(fog.fog_factor(0.0), 0.0);
    assert_relative_eq!(fog.fog_factor(100.0), 1.0 - (-1.2f32).exp(), epsilon = 1e-6);
    assert!(fog.fog_factor(50.0) < fog.fog_factor(200.0));
    assert!(fog.fog_factor(1e6) <= 1.0);
}

#[test]
fn fog_blends_toward_the_background_at_distance() {
    let fog = FogParams {
        desaturation_strength: 1.0,
        ..Default::default()
    };
    let surface = [0.1, 0.9, 0.2];
    assert_eq!(fog.apply(surface, 0.0), surface);

    let far = fog.apply(surface, 1e5);
    for (got, want) in far.iter().zip(fog.background_color) {
        assert_relative_eq!(*got, want, epsilon = 1e-4);
    }

    // Partway, the first stage pulls toward the fog color before the
    // background dominates.
    let near = fog.apply(surface, 30.0);
    assert!(near[1] < surface[1]);
    assert!(near[1] > fog.background_color[1]);
}

#[test]
fn absorption_dims_direct_light() {
    let fog = FogParams {
        absorption_density: 0.05,
        absorption_strength: 0.5,
        ..Default::default()
    };
    assert_eq!(fog.direct_light_scale(0.0), 1.0);
    let expected = 1.0 - (1.0 - (-1.0f32).exp()) * 0.5;
    assert_relative_eq!(fog.direct_light_scale(20.0), expected, epsilon = 1e-6);
    assert_relative_eq!(fog.direct_light_scale(1e5), 0.5, epsilon = 1e-4);
}

#[test]
fn clear_color_matches_the_fog_background() {
    let fog = FogParams::default();
    let block = LightingBlock::new(&fog, &Sun::default(), &Flashlight::default());
    let clear = block.clear_color();
    assert_relative_eq!(clear.r, fog.background_color[0] as f64);
    assert_relative_eq!(clear.g, fog.background_color[1] as f64);
    assert_relative_eq!(clear.b, fog.background_color[2] as f64);
    assert_eq!(clear.a, 1.0);
}

#[test]
fn sun_lights_surfaces_facing_it() {
    let sun = Sun::default();
    assert!(sun.diffuse(Vector3::unit_y()) > 0.0);
    assert_eq!(sun.diffuse(-Vector3::unit_y()), 0.0);
}
