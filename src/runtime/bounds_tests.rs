use crate::{
    AttachmentData, BlendMode, BoneData, MeshAttachmentData, RegionAttachmentData, Skeleton,
    SkeletonData, SkinData, SlotData, TransformMode, VertexData,
};
use std::collections::HashMap;
use std::sync::Arc;

fn assert_approx(actual: f32, expected: f32) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= 1.0e-4,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

fn bone(name: &str, x: f32, y: f32) -> BoneData {
    BoneData {
        name: name.to_string(),
        parent: None,
        length: 0.0,
        x,
        y,
        rotation: 0.0,
        scale_x: 1.0,
        scale_y: 1.0,
        shear_x: 0.0,
        shear_y: 0.0,
        transform_mode: TransformMode::Normal,
        skin_required: false,
    }
}

fn slot(name: &str, bone: usize, attachment: &str) -> SlotData {
    SlotData {
        name: name.to_string(),
        bone,
        attachment: Some(attachment.to_string()),
        color: [1.0, 1.0, 1.0, 1.0],
        has_dark: false,
        dark_color: [0.0, 0.0, 0.0],
        blend: BlendMode::Normal,
    }
}

fn data_with_attachment(bone_x: f32, bone_y: f32, attachment: AttachmentData) -> Arc<SkeletonData> {
    let mut slot_map = HashMap::new();
    slot_map.insert(attachment.name().to_string(), attachment.clone());
    let mut skins = HashMap::new();
    skins.insert(
        "default".to_string(),
        SkinData {
            name: "default".to_string(),
            attachments: vec![slot_map],
            bones: Vec::new(),
            ik_constraints: Vec::new(),
            transform_constraints: Vec::new(),
            path_constraints: Vec::new(),
        },
    );
    Arc::new(SkeletonData {
        bones: vec![bone("root", bone_x, bone_y)],
        slots: vec![slot("body", 0, attachment.name())],
        skins,
        ik_constraints: Vec::new(),
        transform_constraints: Vec::new(),
        path_constraints: Vec::new(),
    })
}

#[test]
fn region_attachment_bounds_match_its_local_box() {
    let data = data_with_attachment(
        0.0,
        0.0,
        AttachmentData::Region(RegionAttachmentData {
            name: "body".to_string(),
            path: "body".to_string(),
            color: [1.0, 1.0, 1.0, 1.0],
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            width: 100.0,
            height: 50.0,
        }),
    );

    let mut skeleton = Skeleton::new(data);
    skeleton.update_world_transform();

    let mut scratch = Vec::new();
    let bounds = skeleton.bounds(&mut scratch);
    assert_approx(bounds.x, -50.0);
    assert_approx(bounds.y, -25.0);
    assert_approx(bounds.width, 100.0);
    assert_approx(bounds.height, 50.0);
}

#[test]
fn bounds_follow_the_bone_translation() {
    let data = data_with_attachment(
        10.0,
        20.0,
        AttachmentData::Region(RegionAttachmentData {
            name: "body".to_string(),
            path: "body".to_string(),
            color: [1.0, 1.0, 1.0, 1.0],
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            width: 100.0,
            height: 50.0,
        }),
    );

    let mut skeleton = Skeleton::new(data);
    skeleton.update_world_transform();

    let mut scratch = Vec::new();
    let bounds = skeleton.bounds(&mut scratch);
    assert_approx(bounds.x, -40.0);
    assert_approx(bounds.y, -5.0);
    assert_approx(bounds.width, 100.0);
    assert_approx(bounds.height, 50.0);
}

#[test]
fn mesh_attachment_bounds_cover_its_vertices() {
    let data = data_with_attachment(
        0.0,
        0.0,
        AttachmentData::Mesh(MeshAttachmentData {
            name: "cloth".to_string(),
            path: "cloth".to_string(),
            color: [1.0, 1.0, 1.0, 1.0],
            vertices: VertexData::Unweighted(vec![
                [0.0, 0.0],
                [10.0, 0.0],
                [10.0, 5.0],
                [0.0, 5.0],
            ]),
            uvs: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
            triangles: vec![0, 1, 2, 2, 3, 0],
        }),
    );

    let mut skeleton = Skeleton::new(data);
    skeleton.update_world_transform();

    let mut scratch = Vec::new();
    let bounds = skeleton.bounds(&mut scratch);
    assert_approx(bounds.x, 0.0);
    assert_approx(bounds.y, 0.0);
    assert_approx(bounds.width, 10.0);
    assert_approx(bounds.height, 5.0);
}

#[test]
fn bounds_reuse_the_scratch_buffer() {
    let data = data_with_attachment(
        0.0,
        0.0,
        AttachmentData::Region(RegionAttachmentData {
            name: "body".to_string(),
            path: "body".to_string(),
            color: [1.0, 1.0, 1.0, 1.0],
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            width: 100.0,
            height: 50.0,
        }),
    );

    let mut skeleton = Skeleton::new(data);
    skeleton.update_world_transform();

    let mut scratch = Vec::new();
    let first = skeleton.bounds(&mut scratch);
    let capacity = scratch.capacity();
    let second = skeleton.bounds(&mut scratch);
    assert_eq!(first, second);
    assert_eq!(scratch.capacity(), capacity);
}

#[test]
fn empty_skeleton_bounds_are_zero() {
    let data = Arc::new(SkeletonData {
        bones: vec![bone("root", 0.0, 0.0)],
        slots: Vec::new(),
        skins: HashMap::new(),
        ik_constraints: Vec::new(),
        transform_constraints: Vec::new(),
        path_constraints: Vec::new(),
    });
    let mut skeleton = Skeleton::new(data);
    skeleton.update_world_transform();

    let mut scratch = Vec::new();
    let bounds = skeleton.bounds(&mut scratch);
    assert_eq!(bounds.width, 0.0);
    assert_eq!(bounds.height, 0.0);
}

#[test]
fn slot_world_vertices_exposes_region_corners() {
    let data = data_with_attachment(
        10.0,
        0.0,
        AttachmentData::Region(RegionAttachmentData {
            name: "body".to_string(),
            path: "body".to_string(),
            color: [1.0, 1.0, 1.0, 1.0],
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            width: 4.0,
            height: 2.0,
        }),
    );

    let mut skeleton = Skeleton::new(data);
    skeleton.update_world_transform();

    let vertices = skeleton.slot_world_vertices(0).unwrap();
    assert_eq!(vertices.len(), 8);
    let xs: Vec<f32> = vertices.iter().step_by(2).copied().collect();
    let min_x = xs.iter().copied().fold(f32::MAX, f32::min);
    let max_x = xs.iter().copied().fold(f32::MIN, f32::max);
    assert_approx(min_x, 8.0);
    assert_approx(max_x, 12.0);
}
