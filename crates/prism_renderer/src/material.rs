use prism_assets::{MaterialData, ShadingMode, TextureSlot};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuMaterialUniform {
    pub base_color: [f32; 4],     // 16 bytes, alpha carries opacity
    pub specular_color: [f32; 4], // 16 bytes
    pub shading: u32,             // 4 bytes
    pub texture_mask: u32,        // 4 bytes, one bit per bound slot
    pub _padding: [u32; 2],       // 8 bytes (Total: 48 bytes, aligned to 16)
}

fn shading_id(mode: ShadingMode) -> u32 {
    match mode {
        ShadingMode::Flat => 0,
        ShadingMode::Smooth => 1,
        ShadingMode::PhysicallyBased => 2,
        ShadingMode::Unlit => 3,
    }
}

fn slot_bit(slot: TextureSlot) -> u32 {
    match slot {
        TextureSlot::Diffuse => 1,
        TextureSlot::Normal => 1 << 1,
        TextureSlot::Albedo => 1 << 2,
        TextureSlot::Emissive => 1 << 3,
    }
}

impl From<&MaterialData> for GpuMaterialUniform {
    fn from(m: &MaterialData) -> Self {
        let [r, g, b] = m.base_color;
        let [sr, sg, sb] = m.specular_color;
        Self {
            base_color: [r, g, b, m.opacity],
            specular_color: [sr, sg, sb, 1.0],
            shading: shading_id(m.shading),
            texture_mask: m.textures.keys().fold(0, |mask, slot| mask | slot_bit(*slot)),
            _padding: [0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use prism_assets::Handle;

    use super::*;

    #[test]
    fn uniform_packs_opacity_and_bound_slots() {
        let mut mat = MaterialData {
            opacity: 0.25,
            shading: ShadingMode::Unlit,
            ..Default::default()
        };
        mat.textures.insert(TextureSlot::Albedo, Handle::new(0));
        mat.textures.insert(TextureSlot::Normal, Handle::new(1));

        let u = GpuMaterialUniform::from(&mat);
        assert_eq!(u.base_color, [1.0, 1.0, 1.0, 0.25]);
        assert_eq!(u.shading, 3);
        assert_eq!(u.texture_mask, 0b110);
        assert_eq!(std::mem::size_of::<GpuMaterialUniform>() % 16, 0);
    }
}
