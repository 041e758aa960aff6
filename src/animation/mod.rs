//! Skinned animation runtime.
//!
//! A [`Clip`](clip::Clip) is sampled by a [`PoseEvaluator`](pose::PoseEvaluator)
//! at the time kept by an [`AnimationPlayer`](player::AnimationPlayer); the
//! resulting global node transforms are turned into joint palettes per
//! [`Skin`](skin::Skin).

pub mod clip;
pub mod player;
pub mod pose;
pub mod skin;
