pub mod utils;

use crate::core::material::Material;
use crate::core::mesh::Mesh;
use crate::core::texture::{Image, Texture};

type MeshIdx = usize;
type MeshGroupIdx = usize;
type SceneNodeIdx = usize;
type MaterialIdx = usize;

#[remain::sorted]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Err {
    #[error("Image index {0} is out of range ({1} images).")]
    InvalidImageIndex(usize, usize),
    #[error("Material index {0} is out of range ({1} materials).")]
    InvalidMaterialIndex(MaterialIdx, usize),
    #[error("Mesh group index {0} is out of range ({1} mesh groups).")]
    InvalidMeshGroupIndex(MeshGroupIdx, usize),
    #[error("Mesh index {0} is out of range ({1} meshes).")]
    InvalidMeshIndex(MeshIdx, usize),
    #[error("Node index {0} is out of range ({1} nodes).")]
    InvalidNodeIndex(SceneNodeIdx, usize),
    #[error("Texture index {0} is out of range ({1} textures).")]
    InvalidTextureIndex(usize, usize),
}

/// Local transformation of a scene node. Matrices are column-major, as in glTF.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeTransform {
    Matrix([[f32; 4]; 4]),
    Decomposed {
        translation: [f32; 3],
        rotation: [f32; 4],
        scale: [f32; 3],
    },
}

impl Default for NodeTransform {
    fn default() -> Self {
        NodeTransform::Decomposed {
            translation: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0, 1.0, 1.0],
        }
    }
}

impl NodeTransform {
    pub fn is_identity(&self) -> bool {
        match self {
            NodeTransform::Matrix(m) => {
                (0..4).all(|c| (0..4).all(|r| m[c][r] == if c == r { 1.0 } else { 0.0 }))
            }
            transform => *transform == NodeTransform::default(),
        }
    }
}

// Describes a mesh instance stored in a mesh group: a base mesh and the
// material it is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshInstance {
    pub mesh_index: MeshIdx,
    pub material_index: Option<MaterialIdx>,
}

impl MeshInstance {
    pub fn new(mesh_index: MeshIdx, material_index: Option<MaterialIdx>) -> Self {
        Self { mesh_index, material_index }
    }
}

// Ordered mesh instances that are referenced together by scene nodes.
// Corresponds to a glTF mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshGroup {
    name: Option<String>,
    mesh_instances: Vec<MeshInstance>,
}

impl MeshGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub fn add_mesh_instance(&mut self, instance: MeshInstance) {
        self.mesh_instances.push(instance);
    }

    pub fn mesh_instances(&self) -> &[MeshInstance] {
        &self.mesh_instances
    }

    pub fn num_mesh_instances(&self) -> usize {
        self.mesh_instances.len()
    }
}

// A node of the scene hierarchy. Nodes transform mesh groups from their local
// space into scene space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneNode {
    name: Option<String>,
    transform: NodeTransform,
    mesh_group_index: Option<MeshGroupIdx>,
    children: Vec<SceneNodeIdx>,
}

impl SceneNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub fn get_transform(&self) -> &NodeTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: NodeTransform) {
        self.transform = transform;
    }

    pub fn get_mesh_group_index(&self) -> Option<MeshGroupIdx> {
        self.mesh_group_index
    }

    pub fn set_mesh_group_index(&mut self, index: Option<MeshGroupIdx>) {
        self.mesh_group_index = index;
    }

    pub fn children(&self) -> &[SceneNodeIdx] {
        &self.children
    }

    pub fn add_child_index(&mut self, index: SceneNodeIdx) {
        self.children.push(index);
    }
}

// Holds all of the geometry of a scene. A scene is comprised of meshes, mesh
// groups referencing the meshes, scene nodes arranging the mesh groups in a
// hierarchy, and the materials, textures and images used by the meshes.
// Meshes are defined in their local space.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
    meshes: Vec<Mesh>,
    mesh_groups: Vec<MeshGroup>,
    nodes: Vec<SceneNode>,
    root_node_indices: Vec<SceneNodeIdx>,
    materials: Vec<Material>,
    textures: Vec<Texture>,
    images: Vec<Image>,
    copyright: Option<String>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshIdx {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    pub fn get_mesh(&self, index: MeshIdx) -> Option<&Mesh> {
        self.meshes.get(index)
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn meshes_mut(&mut self) -> impl Iterator<Item = &mut Mesh> {
        self.meshes.iter_mut()
    }

    pub fn num_meshes(&self) -> usize {
        self.meshes.len()
    }

    pub fn add_mesh_group(&mut self, group: MeshGroup) -> MeshGroupIdx {
        self.mesh_groups.push(group);
        self.mesh_groups.len() - 1
    }

    pub fn mesh_groups(&self) -> &[MeshGroup] {
        &self.mesh_groups
    }

    pub fn add_node(&mut self, node: SceneNode) -> SceneNodeIdx {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn get_node(&self, index: SceneNodeIdx) -> Option<&SceneNode> {
        self.nodes.get(index)
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn add_root_node_index(&mut self, index: SceneNodeIdx) {
        self.root_node_indices.push(index);
    }

    pub fn root_node_indices(&self) -> &[SceneNodeIdx] {
        &self.root_node_indices
    }

    pub fn add_material(&mut self, material: Material) -> MaterialIdx {
        self.materials.push(material);
        self.materials.len() - 1
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn add_texture(&mut self, texture: Texture) -> usize {
        self.textures.push(texture);
        self.textures.len() - 1
    }

    pub fn textures(&self) -> &[Texture] {
        &self.textures
    }

    pub fn add_image(&mut self, image: Image) -> usize {
        self.images.push(image);
        self.images.len() - 1
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn get_copyright(&self) -> Option<&str> {
        self.copyright.as_deref()
    }

    pub fn set_copyright(&mut self, copyright: Option<String>) {
        self.copyright = copyright;
    }

    /// Checks that every index stored in the scene refers to an existing element.
    pub fn validate(&self) -> Result<(), Err> {
        for group in &self.mesh_groups {
            for instance in group.mesh_instances() {
                if instance.mesh_index >= self.meshes.len() {
                    return Err(Err::InvalidMeshIndex(instance.mesh_index, self.meshes.len()));
                }
                if let Some(material) = instance.material_index {
                    if material >= self.materials.len() {
                        return Err(Err::InvalidMaterialIndex(material, self.materials.len()));
                    }
                }
            }
        }
        for node in &self.nodes {
            if let Some(group) = node.mesh_group_index {
                if group >= self.mesh_groups.len() {
                    return Err(Err::InvalidMeshGroupIndex(group, self.mesh_groups.len()));
                }
            }
            if let Some(&child) = node.children.iter().find(|&&c| c >= self.nodes.len()) {
                return Err(Err::InvalidNodeIndex(child, self.nodes.len()));
            }
        }
        if let Some(&root) = self.root_node_indices.iter().find(|&&r| r >= self.nodes.len()) {
            return Err(Err::InvalidNodeIndex(root, self.nodes.len()));
        }
        for material in &self.materials {
            if let Some(texture) = material.texture_indices().find(|&t| t >= self.textures.len()) {
                return Err(Err::InvalidTextureIndex(texture, self.textures.len()));
            }
        }
        for texture in &self.textures {
            if texture.get_image_index() >= self.images.len() {
                return Err(Err::InvalidImageIndex(texture.get_image_index(), self.images.len()));
            }
        }
        Ok(())
    }
}
