use cgmath::Point3;
use frost_ngin::objects::{LodDistances, LodLevel, ObjectField};
use frost_ngin::scene::Scene;

mod common;

use common::test_utils::dense_config;

const EYE: Point3<f32> = Point3::new(0.0, 1.6, 3.0);

fn dense_field() -> ObjectField {
    let mut field = ObjectField::new();
    field.set_object_count(500_000);
    field
}

#[test]
fn dense_scene_buckets_grow_with_distance() {
    let mut field = dense_field();
    field.update_with(EYE, LodDistances::default(), 0.016);
    let counts = field.counts();

    assert!(counts.high > 0);
    assert!(counts.high < counts.medium);
    assert!(counts.medium < counts.low);
    assert_eq!(counts.high + counts.medium + counts.low, counts.visible);
    assert!(counts.visible <= 500_000);
    assert_eq!(counts.total, 500_000);
    assert_eq!(field.batches().non_empty_count(), 3);
}

#[test]
fn culling_disabled_shows_everything() {
    let mut field = dense_field();
    field.set_culling_enabled(false);
    field.update_with(EYE, LodDistances::default(), 0.016);
    let counts = field.counts();

    assert_eq!(counts.visible, counts.total);
    assert_eq!(counts.high + counts.medium + counts.low, counts.total);
}

#[test]
fn lod_disabled_puts_every_visible_object_in_high() {
    let mut field = dense_field();
    field.set_lod_enabled(false);
    field.update_with(EYE, LodDistances::default(), 0.016);
    let counts = field.counts();

    assert_eq!(counts.medium, 0);
    assert_eq!(counts.low, 0);
    assert_eq!(counts.high, counts.visible);
    // Culling still applies.
    assert!(counts.visible < counts.total);
}

#[test]
fn visible_objects_are_within_the_cull_distance() {
    let mut field = ObjectField::new();
    field.set_object_count(40_000);
    let distances = LodDistances {
        cull: 120.0,
        high: 20.0,
        medium: 60.0,
    };
    field.update_with(EYE, distances, 0.016);
    for &handle in field.handles() {
        if field.is_visible(handle) == Some(true) {
            assert!(field.distance(handle).unwrap() <= distances.cull);
        }
    }
}

#[test]
fn zero_objects_draw_nothing() {
    let mut field = ObjectField::new();
    field.set_object_count(0);
    field.update_with(EYE, LodDistances::default(), 0.016);
    assert_eq!(field.batches().non_empty_count(), 0);
    assert_eq!(field.counts().total, 0);

    field.set_object_count(-5);
    assert!(field.is_empty());
}

#[test]
fn rebuilding_with_the_same_count_keeps_the_layout() {
    let mut field = ObjectField::new();
    field.set_object_count(1000);
    let before = field.positions().to_vec();
    field.set_object_count(1000);
    assert_eq!(field.positions(), before.as_slice());
}

#[test]
fn rebuilding_invalidates_old_handles() {
    let mut field = ObjectField::new();
    field.set_object_count(16);
    let old = field.handles()[3];
    assert!(field.position(old).is_some());

    field.set_object_count(16);
    assert_eq!(field.position(old), None);
    assert_eq!(field.lod(old), None);
    let new = field.handles()[3];
    assert_eq!(new.index(), old.index());
    assert_ne!(new.generation(), old.generation());
    assert!(field.position(new).is_some());
}

#[test]
fn boundary_distance_takes_the_finer_level() {
    let mut field = ObjectField::new();
    field.set_object_count(1);
    // The single object sits at (0, 0.5, 0).
    let eye = Point3::new(0.0, 0.5, 10.0);
    field.update(eye, 400.0, 10.0, 30.0, 0.016);
    let handle = field.handles()[0];
    assert_eq!(field.lod(handle), Some(LodLevel::High));

    field.invalidate_lod();
    field.update(eye, 10.0, 5.0, 10.0, 0.016);
    assert_eq!(field.is_visible(handle), Some(true));
    assert_eq!(field.lod(handle), Some(LodLevel::Medium));
}

#[test]
fn lod_levels_persist_between_recomputations() {
    let mut field = ObjectField::new();
    field.set_object_count(1);
    let handle = field.handles()[0];
    let distances = LodDistances::default();

    field.update_with(Point3::new(0.0, 0.5, 10.0), distances, 0.016);
    assert_eq!(field.lod(handle), Some(LodLevel::High));

    // Far away but still visible: the level only changes on the next
    // scheduled recomputation.
    let far = Point3::new(0.0, 0.5, 300.0);
    for _ in 1..frost_ngin::objects::field::LOD_INTERVAL {
        field.update_with(far, distances, 0.016);
        assert_eq!(field.lod(handle), Some(LodLevel::High));
    }
    field.update_with(far, distances, 0.016);
    assert_eq!(field.lod(handle), Some(LodLevel::Low));
}

#[test]
fn toggles_force_a_recomputation() {
    let mut field = ObjectField::new();
    field.set_object_count(1);
    let handle = field.handles()[0];
    field.update_with(Point3::new(0.0, 0.5, 300.0), LodDistances::default(), 0.016);
    assert_eq!(field.lod(handle), Some(LodLevel::Low));

    field.set_lod_enabled(false);
    field.update_with(Point3::new(0.0, 0.5, 300.0), LodDistances::default(), 0.016);
    assert_eq!(field.lod(handle), Some(LodLevel::High));
}

#[test]
fn scene_applies_the_dense_preset() {
    let mut scene = Scene::new(dense_config(), 1280, 720);
    scene.update(0.016);
    let counts = scene.field().counts();
    assert_eq!(counts.total, 500_000);
    assert!(counts.high > 0 && counts.high < counts.medium && counts.medium < counts.low);
}

#[test]
fn model_matrix_is_a_pure_translation() {
    let mut field = ObjectField::new();
    field.set_object_count(64);
    for &handle in field.handles() {
        let position = field.position(handle).unwrap();
        let model = field.model_matrix(handle).unwrap().model;
        assert_eq!(model[0], [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(model[1], [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(model[2], [0.0, 0.0, 1.0, 0.0]);
        assert_eq!(model[3], [position.x, position.y, position.z, 1.0]);
    }
}
