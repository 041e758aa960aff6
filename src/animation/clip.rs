//! Animation clips: keyframe samplers and the channels binding them to nodes.

use anyhow::*;
use cgmath::{InnerSpace, Quaternion, Vector3, VectorSpace};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    Step,
    /// glTF cubic Hermite spline: every key stores `[in tangent, value, out tangent]`.
    CubicSpline,
}

impl From<gltf::animation::Interpolation> for Interpolation {
    fn from(value: gltf::animation::Interpolation) -> Self {
        match value {
            gltf::animation::Interpolation::Linear => Interpolation::Linear,
            gltf::animation::Interpolation::Step => Interpolation::Step,
            gltf::animation::Interpolation::CubicSpline => Interpolation::CubicSpline,
        }
    }
}

/// Node property animated by a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Path {
    Translation,
    Rotation,
    Scale,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Keyframes {
    Translation(Vec<Vector3<f32>>),
    Rotation(Vec<Quaternion<f32>>),
    Scale(Vec<Vector3<f32>>),
}

impl Keyframes {
    pub fn path(&self) -> Path {
        match self {
            Keyframes::Translation(_) => Path::Translation,
            Keyframes::Rotation(_) => Path::Rotation,
            Keyframes::Scale(_) => Path::Scale,
        }
    }

    /// Components per output element (3 for vectors, 4 for quaternions).
    pub fn components(&self) -> usize {
        match self {
            Keyframes::Rotation(_) => 4,
            _ => 3,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Keyframes::Translation(v) | Keyframes::Scale(v) => v.len(),
            Keyframes::Rotation(q) => q.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A value produced by sampling a channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Sampled {
    Vector(Vector3<f32>),
    Rotation(Quaternion<f32>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sampler {
    input: Vec<f32>,
    output: Keyframes,
    interpolation: Interpolation,
}

impl Sampler {
    /// Validates that times are finite and non-decreasing and that the output
    /// holds one element per key (three for cubic splines).
    pub fn new(input: Vec<f32>, output: Keyframes, interpolation: Interpolation) -> Result<Self> {
        if input.is_empty() {
            bail!("sampler has no keyframes");
        }
        if input.iter().any(|t| !t.is_finite()) {
            bail!("sampler input contains non-finite times");
        }
        if input.windows(2).any(|w| w[1] < w[0]) {
            bail!("sampler input times are decreasing");
        }
        let per_key = match interpolation {
            Interpolation::CubicSpline => 3,
            _ => 1,
        };
        if output.len() != input.len() * per_key {
            bail!(
                "sampler has {} keys but {} output values ({:?})",
                input.len(),
                output.len(),
                interpolation
            );
        }
        Ok(Self {
            input,
            output,
            interpolation,
        })
    }

    pub fn input(&self) -> &[f32] {
        &self.input
    }

    pub fn output(&self) -> &Keyframes {
        &self.output
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    pub fn path(&self) -> Path {
        self.output.path()
    }

    /// Time of the last key.
    pub fn end_time(&self) -> f32 {
        self.input.last().copied().unwrap_or(0.0)
    }

    /// The key interval `[k1, k2]` containing `t` and the parameter `a` in
    /// `[0, 1]` between them. Times outside the keys clamp to the endpoints.
    pub fn locate(&self, t: f32) -> (usize, usize, f32) {
        let last = self.input.len() - 1;
        if t <= self.input[0] {
            return (0, 0, 0.0);
        }
        if t >= self.input[last] {
            return (last, last, 0.0);
        }
        let k2 = self.input.partition_point(|&key| key <= t).min(last);
        let k1 = k2.saturating_sub(1);
        let span = self.input[k2] - self.input[k1];
        let a = if k1 == k2 || span <= 0.0 {
            0.0
        } else {
            ((t - self.input[k1]) / span).clamp(0.0, 1.0)
        };
        (k1, k2, a)
    }

    pub fn sample(&self, t: f32) -> Sampled {
        let (k1, k2, a) = self.locate(t);
        let a = match self.interpolation {
            Interpolation::Step => 0.0,
            _ => a,
        };
        if self.interpolation == Interpolation::CubicSpline {
            let dt = self.input[k2] - self.input[k1];
            return match &self.output {
                Keyframes::Translation(v) | Keyframes::Scale(v) => {
                    Sampled::Vector(hermite_vector(v, k1, k2, a, dt))
                }
                Keyframes::Rotation(q) => Sampled::Rotation(hermite_rotation(q, k1, k2, a, dt)),
            };
        }
        match &self.output {
            Keyframes::Translation(v) | Keyframes::Scale(v) => Sampled::Vector(v[k1].lerp(v[k2], a)),
            Keyframes::Rotation(q) => Sampled::Rotation(slerp(q[k1], q[k2], a)),
        }
    }
}

/// Binds a sampler to one property of one node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Channel {
    pub sampler: usize,
    pub target_node: usize,
    pub path: Path,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Clip {
    pub name: String,
    duration: f32,
    samplers: Vec<Sampler>,
    channels: Vec<Channel>,
}

impl Clip {
    /// Channels whose sampler is missing or animates a different property
    /// than the channel claims are dropped with a warning. The duration is the
    /// latest key time across all samplers.
    pub fn new(name: impl Into<String>, samplers: Vec<Sampler>, channels: Vec<Channel>) -> Self {
        let name = name.into();
        let channels = channels
            .into_iter()
            .filter(|channel| match samplers.get(channel.sampler) {
                Some(sampler) if sampler.path() == channel.path => true,
                Some(sampler) => {
                    log::warn!(
                        "clip `{name}`: channel targets {:?} but its sampler holds {:?}, skipping",
                        channel.path,
                        sampler.path()
                    );
                    false
                }
                None => {
                    log::warn!(
                        "clip `{name}`: channel references missing sampler {}, skipping",
                        channel.sampler
                    );
                    false
                }
            })
            .collect();
        let duration = samplers.iter().map(Sampler::end_time).fold(0.0, f32::max);
        Self {
            name,
            duration,
            samplers,
            channels,
        }
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn samplers(&self) -> &[Sampler] {
        &self.samplers
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// `1 + max target node`, or 0 for a clip without channels.
    pub fn required_nodes(&self) -> usize {
        self.channels
            .iter()
            .map(|c| c.target_node + 1)
            .max()
            .unwrap_or(0)
    }

    /// Sample every channel at `t`, yielding `(channel, value)`.
    pub fn sample(&self, t: f32) -> impl Iterator<Item = (&Channel, Sampled)> + '_ {
        self.channels
            .iter()
            .map(move |channel| (channel, self.samplers[channel.sampler].sample(t)))
    }
}

/// Shortest-arc spherical interpolation. Falls back to a normalised lerp for
/// nearly parallel inputs.
pub fn slerp(q0: Quaternion<f32>, q1: Quaternion<f32>, a: f32) -> Quaternion<f32> {
    let mut q1 = q1;
    let mut dot = q0.dot(q1);
    if dot < 0.0 {
        q1 = -q1;
        dot = -dot;
    }
    if dot > 0.9995 {
        return normalize_or_identity(q0 * (1.0 - a) + q1 * a);
    }
    let theta = dot.clamp(-1.0, 1.0).acos();
    let sin_theta = theta.sin();
    let w0 = ((1.0 - a) * theta).sin() / sin_theta;
    let w1 = (a * theta).sin() / sin_theta;
    normalize_or_identity(q0 * w0 + q1 * w1)
}

fn normalize_or_identity(q: Quaternion<f32>) -> Quaternion<f32> {
    let m = q.magnitude();
    if m > f32::EPSILON && m.is_finite() {
        q / m
    } else {
        Quaternion::new(1.0, 0.0, 0.0, 0.0)
    }
}

fn hermite_weights(a: f32) -> [f32; 4] {
    let a2 = a * a;
    let a3 = a2 * a;
    [
        2.0 * a3 - 3.0 * a2 + 1.0,
        a3 - 2.0 * a2 + a,
        -2.0 * a3 + 3.0 * a2,
        a3 - a2,
    ]
}

fn hermite_vector(v: &[Vector3<f32>], k1: usize, k2: usize, a: f32, dt: f32) -> Vector3<f32> {
    let p0 = v[3 * k1 + 1];
    if k1 == k2 {
        return p0;
    }
    let m0 = v[3 * k1 + 2] * dt;
    let p1 = v[3 * k2 + 1];
    let m1 = v[3 * k2] * dt;
    let [h00, h10, h01, h11] = hermite_weights(a);
    p0 * h00 + m0 * h10 + p1 * h01 + m1 * h11
}

fn hermite_rotation(q: &[Quaternion<f32>], k1: usize, k2: usize, a: f32, dt: f32) -> Quaternion<f32> {
    let p0 = q[3 * k1 + 1];
    if k1 == k2 {
        return normalize_or_identity(p0);
    }
    let m0 = q[3 * k1 + 2] * dt;
    let p1 = q[3 * k2 + 1];
    let m1 = q[3 * k2] * dt;
    let [h00, h10, h01, h11] = hermite_weights(a);
    normalize_or_identity(p0 * h00 + m0 * h10 + p1 * h01 + m1 * h11)
}
