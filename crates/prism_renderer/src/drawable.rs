use std::collections::BTreeMap;

use glam::DMat4;
use prism_assets::{GeometryData, Handle, MaterialData};
use prism_core::to_gpu_cols;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DrawableId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Mat4([f32; 16]),
    /// Column-major 4x4 matrices, one after the other.
    Mat4Array(Vec<[f32; 16]>),
}

/// Custom shader uniforms, by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Uniforms {
    values: BTreeMap<String, UniformValue>,
}

impl Uniforms {
    pub fn set(&mut self, name: &str, value: UniformValue) {
        self.values.insert(name.to_owned(), value);
    }

    /// Packs `matrices` column-major as a `mat4[]` uniform.
    pub fn set_matrix4x4v(&mut self, name: &str, matrices: &[DMat4]) {
        self.set(
            name,
            UniformValue::Mat4Array(matrices.iter().map(to_gpu_cols).collect()),
        );
    }

    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.values.get(name)
    }

    pub fn mat4_array(&self, name: &str) -> Option<&[[f32; 16]]> {
        match self.values.get(name) {
            Some(UniformValue::Mat4Array(v)) => Some(v),
            _ => None,
        }
    }

    pub fn remove_all(&mut self) {
        self.values.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Render-time instance of a geometry with a material and a transform.
#[derive(Debug, Clone)]
pub struct Drawable {
    pub geometry: Handle<GeometryData>,
    pub material: Option<Handle<MaterialData>>,
    /// Model -> world.
    pub user_matrix: DMat4,
    pub vertex_uniforms: Uniforms,
}

impl Drawable {
    pub fn new(
        geometry: Handle<GeometryData>,
        material: Option<Handle<MaterialData>>,
        user_matrix: DMat4,
    ) -> Self {
        Self {
            geometry,
            material,
            user_matrix,
            vertex_uniforms: Uniforms::default(),
        }
    }
}
