//! Named textures in creation order

use std::collections::HashMap;
use log::info;
use crate::rasterizer::{Texture, TextureError, TextureId};
use super::procedural;

/// Owns every texture; a texture's index is its insertion position and
/// never changes for the life of the registry.
#[derive(Debug, Default)]
pub struct TextureRegistry {
    textures: Vec<Texture>,
    by_name: HashMap<String, usize>,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every procedural material
    pub fn with_procedural(seed: u64) -> Result<Self, TextureError> {
        let mut registry = Self::new();
        for texture in procedural::generate_all(seed)? {
            registry.insert(texture)?;
        }
        info!("Generated {} procedural textures", registry.len());
        Ok(registry)
    }

    /// Add a texture under its own name. Fails if the name is taken.
    pub fn insert(&mut self, texture: Texture) -> Result<TextureId, TextureError> {
        if self.by_name.contains_key(&texture.name) {
            return Err(TextureError::Duplicate(texture.name));
        }
        let index = self.textures.len();
        self.by_name.insert(texture.name.clone(), index);
        self.textures.push(texture);
        Ok(TextureId(index))
    }

    pub fn get_by_id(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id.index())
    }

    pub fn id_of(&self, name: &str) -> Option<TextureId> {
        self.by_name.get(name).copied().map(TextureId)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// Textures in index order
    pub fn iter(&self) -> impl Iterator<Item = (TextureId, &Texture)> {
        self.textures.iter().enumerate().map(|(i, t)| (TextureId(i), t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::Color;

    fn tex(name: &str) -> Texture {
        Texture::from_pixels(name, 2, 2, vec![Color::WHITE; 4]).unwrap()
    }

    #[test]
    fn test_indices_follow_insertion_order() {
        let mut reg = TextureRegistry::new();
        let a = reg.insert(tex("a")).unwrap();
        let b = reg.insert(tex("b")).unwrap();
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(reg.id_of("b"), Some(b));
        assert_eq!(reg.get_by_id(a).map(|t| t.name.as_str()), Some("a"));
        assert!(reg.id_of("c").is_none());
    }

    #[test]
    fn test_duplicate_name_rejected_without_side_effects() {
        let mut reg = TextureRegistry::new();
        reg.insert(tex("a")).unwrap();
        reg.insert(tex("b")).unwrap();
        assert_eq!(reg.insert(tex("a")), Err(TextureError::Duplicate("a".into())));
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.id_of("b").map(TextureId::index), Some(1));
    }

    #[test]
    fn test_procedural_registry_matches_material_order() {
        let reg = TextureRegistry::with_procedural(1).unwrap();
        assert_eq!(reg.len(), procedural::MATERIALS.len());
        for (i, material) in procedural::MATERIALS.iter().enumerate() {
            assert_eq!(reg.id_of(material.name).map(TextureId::index), Some(i));
        }
        let names: Vec<_> = reg.iter().map(|(_, t)| t.name.clone()).collect();
        assert_eq!(names[3], procedural::SAND);
    }
}
