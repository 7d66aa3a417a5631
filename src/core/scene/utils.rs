use crate::compression::CompressionOptions;
use crate::core::scene::Scene;

/// Stamps the geometry compression settings onto every mesh of the scene,
/// replacing whatever settings the meshes carried before. Passing `None`
/// disables compression on all meshes.
pub fn set_compression_options(options: Option<&CompressionOptions>, scene: &mut Scene) {
    for mesh in scene.meshes_mut() {
        match options {
            Some(options) => {
                mesh.set_compression_enabled(true);
                mesh.set_compression_options(Some(options.clone()));
            }
            None => {
                mesh.set_compression_enabled(false);
                mesh.set_compression_options(None);
            }
        }
    }
}

/// Total number of faces over all meshes of the scene.
pub fn num_faces(scene: &Scene) -> usize {
    scene.meshes().iter().map(|mesh| mesh.num_faces()).sum()
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::core::attribute::{Attribute, AttributeType};
    use crate::core::material::Material;
    use crate::core::mesh::Mesh;
    use crate::core::scene::{MeshGroup, MeshInstance, NodeTransform, Scene, SceneNode};
    use crate::core::texture::{Image, Sampler, Texture, TextureRef};

    /// A textured quad made of two triangles, placed under a translated root node.
    pub(crate) fn triangle_scene() -> Scene {
        let positions = [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]];
        let normals = [[0.0f32, 0.0, 1.0]; 4];
        let tex_coords = [[0.0f32, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let mut mesh = Mesh::from_parts(
            vec![[0, 1, 2], [0, 2, 3]],
            vec![
                Attribute::from_vectors(AttributeType::Position, 0, &positions).unwrap(),
                Attribute::from_vectors(AttributeType::Normal, 0, &normals).unwrap(),
                Attribute::from_vectors(AttributeType::TextureCoordinate, 0, &tex_coords).unwrap(),
            ],
        )
        .unwrap();
        mesh.set_name(Some("quad".to_string()));

        let mut scene = Scene::new();
        let mesh_index = scene.add_mesh(mesh);

        let mut image = Image::new(
            "image/png".to_string(),
            vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13],
        );
        image.set_name(Some("checker".to_string()));
        let image_index = scene.add_image(image);
        let sampler = Sampler {
            mag_filter: Some(9728),
            ..Sampler::default()
        };
        let texture_index = scene.add_texture(Texture::new(image_index).with_sampler(sampler));
        let mut material = Material::new();
        material.name = Some("checker".to_string());
        material.color_texture = Some(TextureRef::new(texture_index));
        material.roughness_factor = 0.5;
        let material_index = scene.add_material(material);

        let mut group = MeshGroup::new();
        group.set_name(Some("quad".to_string()));
        group.add_mesh_instance(MeshInstance::new(mesh_index, Some(material_index)));
        let group_index = scene.add_mesh_group(group);

        let mut node = SceneNode::new();
        node.set_name(Some("root".to_string()));
        node.set_mesh_group_index(Some(group_index));
        node.set_transform(NodeTransform::Decomposed {
            translation: [0.0, 2.0, 0.0],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0, 1.0, 1.0],
        });
        let node_index = scene.add_node(node);
        scene.add_root_node_index(node_index);
        scene.set_copyright(Some("Re:Earth".to_string()));
        scene
    }
}
