use std::collections::BTreeMap;

use log::{trace, warn};

use crate::{
    assets::Handle,
    imported::{ImportedMaterial, ShadingModel, TextureRole},
    texture::{TextureData, TextureResolver},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ShadingMode {
    Flat,
    #[default]
    Smooth,
    PhysicallyBased,
    Unlit,
}

impl ShadingMode {
    pub fn from_model(model: ShadingModel) -> Self {
        match model {
            ShadingModel::Flat => ShadingMode::Flat,
            ShadingModel::Gouraud
            | ShadingModel::Phong
            | ShadingModel::Blinn
            | ShadingModel::Minnaert => ShadingMode::Smooth,
            ShadingModel::OrenNayar
            | ShadingModel::CookTorrance
            | ShadingModel::Fresnel
            | ShadingModel::PbrBrdf => ShadingMode::PhysicallyBased,
            ShadingModel::Toon | ShadingModel::NoShading => ShadingMode::Unlit,
            ShadingModel::Unknown(id) => {
                warn!("Unknown shading model {id}, falling back to smooth shading");
                ShadingMode::Smooth
            }
        }
    }
}

/// Named texture slots understood by the shaders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextureSlot {
    Diffuse,
    Normal,
    Albedo,
    Emissive,
}

impl TextureSlot {
    pub fn uniform_name(self) -> &'static str {
        match self {
            TextureSlot::Diffuse => "diffuseTex",
            TextureSlot::Normal => "normalTex",
            TextureSlot::Albedo => "albedoTex",
            TextureSlot::Emissive => "emissiveTex",
        }
    }

    fn from_role(role: TextureRole) -> Self {
        match role {
            TextureRole::Diffuse => TextureSlot::Diffuse,
            TextureRole::Normal => TextureSlot::Normal,
            TextureRole::BaseColor => TextureSlot::Albedo,
            TextureRole::Emissive => TextureSlot::Emissive,
        }
    }

    /// Color slots sample in sRGB, data slots linearly.
    pub fn is_srgb(self) -> bool {
        matches!(self, TextureSlot::Albedo | TextureSlot::Emissive)
    }
}

#[derive(Clone, Debug)]
pub struct MaterialData {
    pub name: String,
    pub shading: ShadingMode,
    pub opacity: f32,
    pub base_color: [f32; 3],
    pub specular_color: [f32; 3],
    pub ambient_color: [f32; 3],
    pub textures: BTreeMap<TextureSlot, Handle<TextureData>>,
}

impl Default for MaterialData {
    fn default() -> Self {
        Self {
            name: String::new(),
            shading: ShadingMode::Smooth,
            opacity: 1.0,
            base_color: [1.0, 1.0, 1.0],
            specular_color: [1.0, 1.0, 1.0],
            ambient_color: [1.0, 1.0, 1.0],
            textures: BTreeMap::new(),
        }
    }
}

impl MaterialData {
    pub fn texture(&self, slot: TextureSlot) -> Option<Handle<TextureData>> {
        self.textures.get(&slot).copied()
    }
}

fn rgb(c: [f32; 4]) -> [f32; 3] {
    [c[0], c[1], c[2]]
}

/// Builds a material, pushing every resolved texture into `textures`.
///
/// Texture references that cannot be resolved are logged and leave their
/// slot unbound.
pub fn build_material(
    material: &ImportedMaterial,
    resolver: &TextureResolver,
    textures: &mut Vec<TextureData>,
) -> MaterialData {
    let mut data = MaterialData {
        name: material.name.clone(),
        shading: material
            .shading_model
            .map(ShadingMode::from_model)
            .unwrap_or_default(),
        ..Default::default()
    };

    if let Some(opacity) = material.opacity {
        data.opacity = opacity;
    }
    if let Some(c) = material.diffuse {
        data.base_color = rgb(c);
    }
    if let Some(c) = material.specular {
        data.specular_color = rgb(c);
    }
    if let Some(c) = material.ambient {
        data.ambient_color = rgb(c);
    }

    for (role, reference) in &material.textures {
        let slot = TextureSlot::from_role(*role);
        if data.textures.contains_key(&slot) {
            // First texture of a role wins
            continue;
        }
        if let Some(tex) = resolver.resolve(reference, slot.is_srgb()) {
            trace!("Material '{}': {} <- {reference}", data.name, slot.uniform_name());
            data.textures.insert(slot, Handle::new(textures.len()));
            textures.push(tex);
        }
    }

    data
}
