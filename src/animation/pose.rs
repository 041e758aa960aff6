//! Evaluates a clip over a node hierarchy into global transforms and joint
//! palettes.

use cgmath::{Matrix4, SquareMatrix};

use crate::animation::clip::{Clip, Path, Sampled};
use crate::animation::skin::Skin;
use crate::data_structures::instance::Trs;

/// One node of a model hierarchy with its static (bind) transform.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub name: String,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub base: Trs,
}

impl Node {
    pub fn new(name: impl Into<String>, base: Trs) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            base,
        }
    }
}

/// Working state for pose evaluation. Buffers are reused across frames.
#[derive(Clone, Debug)]
pub struct PoseEvaluator {
    nodes: Vec<Node>,
    roots: Vec<usize>,
    pose: Vec<Trs>,
    local: Vec<Matrix4<f32>>,
    global: Vec<Matrix4<f32>>,
    visited: Vec<bool>,
    stack: Vec<usize>,
}

impl PoseEvaluator {
    pub fn new(nodes: Vec<Node>, roots: Vec<usize>) -> Self {
        let n = nodes.len();
        Self {
            nodes,
            roots,
            pose: vec![Trs::identity(); n],
            local: vec![Matrix4::identity(); n],
            global: vec![Matrix4::identity(); n],
            visited: vec![false; n],
            stack: Vec::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Global transforms from the last evaluation.
    pub fn globals(&self) -> &[Matrix4<f32>] {
        &self.global
    }

    /// Animated local TRS of every node from the last evaluation.
    pub fn pose(&self) -> &[Trs] {
        &self.pose
    }

    /// Pose the hierarchy at time `t` of `clip`, or at rest without a clip.
    pub fn evaluate(&mut self, clip: Option<&Clip>, t: f32) {
        if let Some(clip) = clip {
            self.grow_to(clip.required_nodes());
        }

        for (pose, node) in self.pose.iter_mut().zip(&self.nodes) {
            *pose = node.base;
        }

        if let Some(clip) = clip {
            for (channel, value) in clip.sample(t) {
                let trs = &mut self.pose[channel.target_node];
                match (channel.path, value) {
                    (Path::Translation, Sampled::Vector(v)) => trs.translation = v,
                    (Path::Scale, Sampled::Vector(v)) => trs.scale = v,
                    (Path::Rotation, Sampled::Rotation(q)) => trs.rotation = q,
                    _ => {}
                }
            }
        }

        for (local, trs) in self.local.iter_mut().zip(&self.pose) {
            *local = trs.to_matrix();
        }

        self.visited.iter_mut().for_each(|v| *v = false);
        for i in 0..self.roots.len() {
            let root = self.roots[i];
            self.traverse_from(root);
        }
        // Nodes unreachable from the scene roots, grown ones included,
        // keep their local transform.
        for i in 0..self.nodes.len() {
            if !self.visited[i] {
                self.global[i] = self.local[i];
            }
        }
    }

    /// Joint palette of `skin` for the current pose.
    pub fn palette(&self, skin: &Skin, out: &mut Vec<Matrix4<f32>>) {
        skin.write_palette(&self.global, out);
    }

    /// Grow the per-node arrays so a clip may target nodes the hierarchy
    /// never declared. New nodes are parentless with identity TRS.
    fn grow_to(&mut self, n: usize) {
        if n <= self.nodes.len() {
            return;
        }
        log::warn!(
            "animation targets node {} but the hierarchy has {} nodes, growing",
            n - 1,
            self.nodes.len()
        );
        let start = self.nodes.len();
        self.nodes
            .extend((start..n).map(|i| Node::new(format!("synthetic_{i}"), Trs::identity())));
        self.pose.resize(n, Trs::identity());
        self.local.resize(n, Matrix4::identity());
        self.global.resize(n, Matrix4::identity());
        self.visited.resize(n, false);
    }

    fn traverse_from(&mut self, root: usize) {
        if root >= self.nodes.len() || self.visited[root] {
            return;
        }
        self.visited[root] = true;
        self.global[root] = match self.nodes[root].parent {
            Some(parent) if parent < self.nodes.len() && self.visited[parent] => {
                self.global[parent] * self.local[root]
            }
            _ => self.local[root],
        };
        self.stack.clear();
        self.stack.push(root);
        while let Some(node) = self.stack.pop() {
            for c in 0..self.nodes[node].children.len() {
                let child = self.nodes[node].children[c];
                if child >= self.nodes.len() || self.visited[child] {
                    continue;
                }
                self.visited[child] = true;
                self.global[child] = self.global[node] * self.local[child];
                self.stack.push(child);
            }
        }
    }
}
