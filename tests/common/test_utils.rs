use frost_ngin::config::{Preset, SceneConfig};
use serde_json::{Value, json};

const GLB_MAGIC: u32 = 0x4654_6C67;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

const FLOAT: u32 = 5126;
const UNSIGNED_SHORT: u32 = 5123;

fn components(ty: &str) -> usize {
    match ty {
        "SCALAR" => 1,
        "VEC2" => 2,
        "VEC3" => 3,
        "VEC4" => 4,
        "MAT4" => 16,
        other => panic!("unknown accessor type {other}"),
    }
}

/// Builds binary glTF files in memory: every accessor gets its own buffer
/// view over a single BIN chunk.
#[derive(Default)]
pub struct GlbBuilder {
    bin: Vec<u8>,
    views: Vec<Value>,
    accessors: Vec<Value>,
}

impl GlbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn view(&mut self, bytes: &[u8]) -> usize {
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }
        let offset = self.bin.len();
        self.bin.extend_from_slice(bytes);
        self.views.push(json!({
            "buffer": 0,
            "byteOffset": offset,
            "byteLength": bytes.len(),
        }));
        self.views.len() - 1
    }

    /// An accessor with an explicit element count, which may overrun its view.
    pub fn accessor(&mut self, bytes: &[u8], component_type: u32, count: usize, ty: &str) -> usize {
        let view = self.view(bytes);
        self.accessors.push(json!({
            "bufferView": view,
            "componentType": component_type,
            "count": count,
            "type": ty,
        }));
        self.accessors.len() - 1
    }

    pub fn f32s(&mut self, data: &[f32], ty: &str) -> usize {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.accessor(&bytes, FLOAT, data.len() / components(ty), ty)
    }

    pub fn u16s(&mut self, data: &[u16], ty: &str) -> usize {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.accessor(&bytes, UNSIGNED_SHORT, data.len() / components(ty), ty)
    }

    /// POSITION accessors must carry their bounds.
    pub fn positions(&mut self, data: &[[f32; 3]]) -> usize {
        let flat: Vec<f32> = data.iter().flatten().copied().collect();
        let index = self.f32s(&flat, "VEC3");
        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        for p in data {
            for c in 0..3 {
                min[c] = min[c].min(p[c]);
                max[c] = max[c].max(p[c]);
            }
        }
        self.accessors[index]["min"] = json!(min);
        self.accessors[index]["max"] = json!(max);
        index
    }

    /// Assemble the container. `document` supplies everything except the
    /// buffer, views and accessors.
    pub fn finish(mut self, mut document: Value) -> Vec<u8> {
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }
        document["asset"] = json!({ "version": "2.0" });
        document["buffers"] = json!([{ "byteLength": self.bin.len() }]);
        document["bufferViews"] = Value::Array(self.views);
        document["accessors"] = Value::Array(self.accessors);

        let mut json_chunk = serde_json::to_vec(&document).unwrap();
        while json_chunk.len() % 4 != 0 {
            json_chunk.push(b' ');
        }
        let total = 12 + 8 + json_chunk.len() + 8 + self.bin.len();

        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json_chunk.len() as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
        out.extend_from_slice(&json_chunk);
        out.extend_from_slice(&(self.bin.len() as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        out.extend_from_slice(&self.bin);
        out
    }
}

const TRIANGLE: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 2.0, 0.0]];

fn identity() -> [f32; 16] {
    [
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]
}

/// A two-joint skinned triangle with one 1 second clip rotating the second
/// joint a quarter turn around Z. The last vertex has unnormalised weights.
pub fn skinned_triangle_glb() -> Vec<u8> {
    let mut builder = GlbBuilder::new();
    let positions = builder.positions(&TRIANGLE);
    let joints = builder.u16s(&[0, 0, 0, 0, 0, 1, 0, 0, 1, 0, 0, 0], "VEC4");
    let weights = builder.f32s(
        &[
            1.0, 0.0, 0.0, 0.0, //
            0.5, 0.5, 0.0, 0.0, //
            2.0, 2.0, 0.0, 0.0,
        ],
        "VEC4",
    );
    let indices = builder.u16s(&[0, 1, 2], "SCALAR");

    let mut inverse_bind = identity().to_vec();
    let mut second = identity();
    // translate(0, -1, 0), column-major
    second[13] = -1.0;
    inverse_bind.extend_from_slice(&second);
    let inverse_bind = builder.f32s(&inverse_bind, "MAT4");

    let times = builder.f32s(&[0.0, 1.0], "SCALAR");
    let half = std::f32::consts::FRAC_PI_4;
    let rotations = builder.f32s(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, half.sin(), half.cos()], "VEC4");

    builder.finish(json!({
        "scene": 0,
        "scenes": [{ "nodes": [0, 2] }],
        "nodes": [
            { "name": "root", "children": [1] },
            { "name": "bone", "translation": [0.0, 1.0, 0.0] },
            { "name": "body", "mesh": 0, "skin": 0 },
        ],
        "meshes": [{
            "name": "triangle",
            "primitives": [{
                "attributes": { "POSITION": positions, "JOINTS_0": joints, "WEIGHTS_0": weights },
                "indices": indices,
                "material": 0,
            }],
        }],
        "materials": [{
            "name": "snowman",
            "pbrMetallicRoughness": {
                "baseColorFactor": [0.9, 0.9, 1.0, 1.0],
                "metallicFactor": 0.0,
                "roughnessFactor": 0.7,
            },
        }],
        "skins": [{ "joints": [0, 1], "inverseBindMatrices": inverse_bind }],
        "animations": [{
            "name": "wave",
            "samplers": [{ "input": times, "output": rotations, "interpolation": "LINEAR" }],
            "channels": [{ "sampler": 0, "target": { "node": 1, "path": "rotation" } }],
        }],
    }))
}

/// One good rigid triangle next to one whose POSITION accessor claims more
/// elements than its view holds.
pub fn glb_with_broken_primitive() -> Vec<u8> {
    let mut builder = GlbBuilder::new();
    let good = builder.positions(&TRIANGLE);
    let flat: Vec<f32> = TRIANGLE.iter().flatten().copied().collect();
    let bytes: Vec<u8> = flat.iter().flat_map(|v| v.to_le_bytes()).collect();
    let broken = builder.accessor(&bytes, FLOAT, 300, "VEC3");
    builder.accessors[broken]["min"] = json!([0.0, 0.0, 0.0]);
    builder.accessors[broken]["max"] = json!([1.0, 2.0, 0.0]);
    builder.finish(json!({
        "scenes": [{ "nodes": [0, 1] }],
        "nodes": [
            { "name": "good", "mesh": 0, "translation": [5.0, 0.0, 0.0] },
            { "name": "broken", "mesh": 1 },
        ],
        "meshes": [
            { "primitives": [{ "attributes": { "POSITION": good } }] },
            { "primitives": [{ "attributes": { "POSITION": broken } }] },
        ],
    }))
}

/// The dense benchmark scene: 500 000 objects, camera at (0, 1.6, 3)
/// looking down -Z, distances 400 / 50 / 150.
pub fn dense_config() -> SceneConfig {
    let mut config = SceneConfig::default();
    config.performance.apply_preset(Preset::Extreme);
    config.camera.position = [0.0, 1.6, 3.0];
    config.camera.yaw_deg = -90.0;
    config.camera.pitch_deg = 0.0;
    config.snow.simulation.count = 0;
    config
}
