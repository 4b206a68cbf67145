use crate::{
    AttachmentData, BlendMode, BoneData, PathAttachmentData, PathConstraintData, PositionMode,
    RotateMode, Skeleton, SkeletonData, SkinData, SlotData, SpacingMode, TransformMode, VertexData,
};
use std::collections::HashMap;
use std::sync::Arc;

fn assert_approx(actual: f32, expected: f32, tolerance: f32) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= tolerance,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

fn bone(name: &str, parent: Option<usize>, length: f32) -> BoneData {
    BoneData {
        name: name.to_string(),
        parent,
        length,
        x: 0.0,
        y: 0.0,
        rotation: 0.0,
        scale_x: 1.0,
        scale_y: 1.0,
        shear_x: 0.0,
        shear_y: 0.0,
        transform_mode: TransformMode::Normal,
        skin_required: false,
    }
}

/// Straight open path from `from` to `to` with control points at exact
/// thirds, so the Bezier parameterization is uniform.
fn line_path(from: [f32; 2], to: [f32; 2], constant_speed: bool) -> AttachmentData {
    let third = [
        from[0] + (to[0] - from[0]) / 3.0,
        from[1] + (to[1] - from[1]) / 3.0,
    ];
    let two_thirds = [
        from[0] + (to[0] - from[0]) * 2.0 / 3.0,
        from[1] + (to[1] - from[1]) * 2.0 / 3.0,
    ];
    let length = ((to[0] - from[0]).powi(2) + (to[1] - from[1]).powi(2)).sqrt();
    AttachmentData::Path(PathAttachmentData {
        name: "track".to_string(),
        vertices: VertexData::Unweighted(vec![
            [from[0] - 10.0, from[1]],
            from,
            third,
            two_thirds,
            to,
            [to[0] + 10.0, to[1]],
        ]),
        lengths: vec![length],
        closed: false,
        constant_speed,
    })
}

fn constraint(bones: Vec<usize>) -> PathConstraintData {
    PathConstraintData {
        name: "follow".to_string(),
        order: 0,
        skin_required: false,
        bones,
        target: 0,
        position_mode: PositionMode::Fixed,
        spacing_mode: SpacingMode::Length,
        rotate_mode: RotateMode::Tangent,
        offset_rotation: 0.0,
        position: 0.0,
        spacing: 0.0,
        rotate_mix: 1.0,
        translate_mix: 1.0,
    }
}

fn skeleton_with(
    bones: Vec<BoneData>,
    path: AttachmentData,
    c: PathConstraintData,
) -> Skeleton {
    let mut slot_map = HashMap::new();
    slot_map.insert("track".to_string(), path);
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
    let data = Arc::new(SkeletonData {
        bones,
        slots: vec![SlotData {
            name: "track".to_string(),
            bone: 0,
            attachment: Some("track".to_string()),
            color: [1.0, 1.0, 1.0, 1.0],
            has_dark: false,
            dark_color: [0.0, 0.0, 0.0],
            blend: BlendMode::Normal,
        }],
        skins,
        ik_constraints: Vec::new(),
        transform_constraints: Vec::new(),
        path_constraints: vec![c],
    });
    Skeleton::new(data)
}

#[test]
fn bone_follows_a_straight_path_at_a_fixed_position() {
    let mut c = constraint(vec![1]);
    c.position = 50.0;
    let mut skeleton = skeleton_with(
        vec![bone("root", None, 0.0), bone("rider", Some(0), 0.0)],
        line_path([0.0, 0.0], [100.0, 0.0], true),
        c,
    );
    skeleton.update_world_transform();

    let rider = &skeleton.bones[1];
    assert_approx(rider.world_x, 50.0, 0.5);
    assert_approx(rider.world_y, 0.0, 1.0e-3);
    assert_approx(rider.world_rotation_x(), 0.0, 0.5);
    assert!(!rider.applied_valid());
}

#[test]
fn percent_position_maps_onto_the_path_length() {
    let mut c = constraint(vec![1]);
    c.position_mode = PositionMode::Percent;
    c.position = 0.5;
    let mut skeleton = skeleton_with(
        vec![bone("root", None, 0.0), bone("rider", Some(0), 0.0)],
        line_path([0.0, 0.0], [100.0, 0.0], true),
        c,
    );
    skeleton.update_world_transform();

    assert_approx(skeleton.bones[1].world_x, 50.0, 0.5);
}

#[test]
fn tangent_mode_orients_the_bone_along_the_path() {
    let mut c = constraint(vec![1]);
    c.position = 30.0;
    let mut skeleton = skeleton_with(
        vec![bone("root", None, 0.0), bone("rider", Some(0), 0.0)],
        line_path([0.0, 0.0], [0.0, 100.0], true),
        c,
    );
    skeleton.update_world_transform();

    let rider = &skeleton.bones[1];
    assert_approx(rider.world_x, 0.0, 1.0e-3);
    assert_approx(rider.world_y, 30.0, 0.5);
    assert_approx(rider.world_rotation_x(), 90.0, 0.5);
}

#[test]
fn chain_mode_spaces_bones_along_the_path() {
    let mut c = constraint(vec![1, 2]);
    c.rotate_mode = RotateMode::Chain;
    c.spacing_mode = SpacingMode::Fixed;
    c.spacing = 50.0;
    let mut skeleton = skeleton_with(
        vec![
            bone("root", None, 0.0),
            bone("link1", Some(0), 50.0),
            bone("link2", Some(0), 50.0),
        ],
        line_path([0.0, 0.0], [100.0, 0.0], true),
        c,
    );
    skeleton.update_world_transform();

    let link1 = &skeleton.bones[1];
    let link2 = &skeleton.bones[2];
    assert_approx(link1.world_x, 0.0, 0.5);
    assert_approx(link2.world_x, 50.0, 0.5);
    assert_approx(link1.world_rotation_x(), 0.0, 0.5);
    assert_approx(link2.world_rotation_x(), 0.0, 0.5);
}

#[test]
fn precomputed_lengths_drive_the_non_constant_speed_walk() {
    let mut c = constraint(vec![1]);
    c.position = 50.0;
    let mut skeleton = skeleton_with(
        vec![bone("root", None, 0.0), bone("rider", Some(0), 0.0)],
        line_path([0.0, 0.0], [100.0, 0.0], false),
        c,
    );
    skeleton.update_world_transform();

    assert_approx(skeleton.bones[1].world_x, 50.0, 0.5);
}

#[test]
fn translate_mix_blends_toward_the_path_position() {
    let mut c = constraint(vec![1]);
    c.position = 100.0;
    c.translate_mix = 0.5;
    c.rotate_mix = 0.0;
    let mut skeleton = skeleton_with(
        vec![bone("root", None, 0.0), bone("rider", Some(0), 0.0)],
        line_path([0.0, 0.0], [100.0, 0.0], true),
        c,
    );
    skeleton.update_world_transform();

    // Halfway between the bone's own position and the path point.
    assert_approx(skeleton.bones[1].world_x, 50.0, 0.5);
}

#[test]
fn zero_mixes_skip_the_constraint() {
    let mut c = constraint(vec![1]);
    c.position = 100.0;
    c.translate_mix = 0.0;
    c.rotate_mix = 0.0;
    let mut skeleton = skeleton_with(
        vec![bone("root", None, 0.0), bone("rider", Some(0), 0.0)],
        line_path([0.0, 0.0], [100.0, 0.0], true),
        c,
    );
    skeleton.update_world_transform();

    assert_approx(skeleton.bones[1].world_x, 0.0, 1.0e-4);
    assert!(skeleton.bones[1].applied_valid());
}
