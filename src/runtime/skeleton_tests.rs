use crate::{BoneData, Skeleton, SkeletonData, TransformMode};
use std::collections::HashMap;
use std::sync::Arc;

fn assert_approx(actual: f32, expected: f32) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= 1.0e-5,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

fn bone(name: &str, parent: Option<usize>, x: f32, y: f32, rotation: f32) -> BoneData {
    BoneData {
        name: name.to_string(),
        parent,
        length: 0.0,
        x,
        y,
        rotation,
        scale_x: 1.0,
        scale_y: 1.0,
        shear_x: 0.0,
        shear_y: 0.0,
        transform_mode: TransformMode::Normal,
        skin_required: false,
    }
}

fn skeleton_data(bones: Vec<BoneData>) -> Arc<SkeletonData> {
    Arc::new(SkeletonData {
        bones,
        slots: Vec::new(),
        skins: HashMap::new(),
        ik_constraints: Vec::new(),
        transform_constraints: Vec::new(),
        path_constraints: Vec::new(),
    })
}

#[test]
fn update_world_transform_root_and_child() {
    let data = skeleton_data(vec![
        bone("root", None, 10.0, 20.0, 0.0),
        bone("child", Some(0), 5.0, 0.0, 90.0),
    ]);

    let mut skeleton = Skeleton::new(data);
    skeleton.update_world_transform();

    let root = &skeleton.bones[0];
    assert_approx(root.world_x, 10.0);
    assert_approx(root.world_y, 20.0);
    assert_approx(root.a, 1.0);
    assert_approx(root.b, 0.0);
    assert_approx(root.c, 0.0);
    assert_approx(root.d, 1.0);

    let child = &skeleton.bones[1];
    assert_approx(child.world_x, 15.0);
    assert_approx(child.world_y, 20.0);
    assert_approx(child.a, 0.0);
    assert_approx(child.b, -1.0);
    assert_approx(child.c, 1.0);
    assert_approx(child.d, 0.0);
}

#[test]
fn update_world_transform_parent_rotation_affects_child_translation() {
    let data = skeleton_data(vec![
        bone("root", None, 0.0, 0.0, 90.0),
        bone("child", Some(0), 1.0, 0.0, 0.0),
    ]);

    let mut skeleton = Skeleton::new(data);
    skeleton.update_world_transform();

    let child = &skeleton.bones[1];
    assert_approx(child.world_x, 0.0);
    assert_approx(child.world_y, 1.0);
}

#[test]
fn root_bone_composes_with_skeleton_position_and_scale() {
    let data = skeleton_data(vec![
        bone("root", None, 1.0, 1.0, 0.0),
        bone("child", Some(0), 1.0, 0.0, 0.0),
    ]);

    let mut skeleton = Skeleton::new(data);
    skeleton.x = 5.0;
    skeleton.y = 7.0;
    skeleton.scale_x = 2.0;
    skeleton.update_world_transform();

    let root = &skeleton.bones[0];
    assert_approx(root.world_x, 7.0);
    assert_approx(root.world_y, 8.0);
    assert_approx(root.a, 2.0);
    assert_approx(root.d, 1.0);

    let child = &skeleton.bones[1];
    assert_approx(child.world_x, 9.0);
    assert_approx(child.world_y, 8.0);
}

#[test]
fn root_bone_rotation_with_scale() {
    let mut data_bone = bone("root", None, 0.0, 0.0, 90.0);
    data_bone.scale_x = 2.0;
    let data = skeleton_data(vec![data_bone]);

    let mut skeleton = Skeleton::new(data);
    skeleton.update_world_transform();

    // X axis points up with magnitude 2, Y axis points left.
    let root = &skeleton.bones[0];
    assert_approx(root.a, 0.0);
    assert_approx(root.b, -1.0);
    assert_approx(root.c, 2.0);
    assert_approx(root.d, 0.0);
    assert_approx(root.world_scale_x(), 2.0);
    assert_approx(root.world_rotation_x(), 90.0);
}

#[test]
fn y_down_flips_effective_y_axis_per_instance() {
    let data = skeleton_data(vec![bone("root", None, 0.0, 3.0, 90.0)]);

    let mut flipped = Skeleton::new(Arc::clone(&data));
    flipped.set_y_down(true);
    flipped.update_world_transform();

    let root = &flipped.bones[0];
    assert_approx(root.world_y, -3.0);
    assert_approx(root.c, -1.0);

    // A second instance over the same data is unaffected.
    let mut normal = Skeleton::new(data);
    normal.update_world_transform();
    let root = &normal.bones[0];
    assert_approx(root.world_y, 3.0);
    assert_approx(root.c, 1.0);
}

#[test]
fn only_translation_ignores_parent_rotation() {
    let mut child = bone("child", Some(0), 1.0, 0.0, 0.0);
    child.transform_mode = TransformMode::OnlyTranslation;
    let data = skeleton_data(vec![bone("root", None, 0.0, 0.0, 90.0), child]);

    let mut skeleton = Skeleton::new(data);
    skeleton.update_world_transform();

    // Translation still goes through the parent, the axes do not.
    let child = &skeleton.bones[1];
    assert_approx(child.world_x, 0.0);
    assert_approx(child.world_y, 1.0);
    assert_approx(child.a, 1.0);
    assert_approx(child.b, 0.0);
    assert_approx(child.c, 0.0);
    assert_approx(child.d, 1.0);
}

#[test]
fn no_rotation_or_reflection_cancels_parent_rotation() {
    let mut child = bone("child", Some(0), 1.0, 0.0, 0.0);
    child.transform_mode = TransformMode::NoRotationOrReflection;
    let data = skeleton_data(vec![bone("root", None, 0.0, 0.0, 90.0), child]);

    let mut skeleton = Skeleton::new(data);
    skeleton.update_world_transform();

    let child = &skeleton.bones[1];
    assert_approx(child.world_x, 0.0);
    assert_approx(child.world_y, 1.0);
    assert_approx(child.a, 1.0);
    assert_approx(child.b, 0.0);
    assert_approx(child.c, 0.0);
    assert_approx(child.d, 1.0);
}

#[test]
fn no_scale_keeps_unit_axes_under_scaled_parent() {
    let mut root = bone("root", None, 0.0, 0.0, 0.0);
    root.scale_x = 3.0;
    root.scale_y = 3.0;
    let mut child = bone("child", Some(0), 1.0, 0.0, 0.0);
    child.transform_mode = TransformMode::NoScale;
    let data = skeleton_data(vec![root, child]);

    let mut skeleton = Skeleton::new(data);
    skeleton.update_world_transform();

    // Translation scales with the parent, the axes stay unit length.
    let child = &skeleton.bones[1];
    assert_approx(child.world_x, 3.0);
    assert_approx(child.world_scale_x(), 1.0);
    assert_approx(child.world_scale_y(), 1.0);
}

#[test]
fn update_world_transform_with_parent_composes_root_externally() {
    let carrier_data = skeleton_data(vec![bone("carrier", None, 40.0, 0.0, 90.0)]);
    let mut carrier = Skeleton::new(carrier_data);
    carrier.update_world_transform();

    let rider_data = skeleton_data(vec![
        bone("root", None, 0.0, 0.0, 0.0),
        bone("child", Some(0), 1.0, 0.0, 0.0),
    ]);
    let mut rider = Skeleton::new(rider_data);
    rider.x = 2.0;
    rider.update_world_transform_with_parent(&carrier.bones[0]);

    // The rider root lands at the carrier bone, offset by the skeleton
    // position rotated through the carrier matrix.
    let root = &rider.bones[0];
    assert_approx(root.world_x, 40.0);
    assert_approx(root.world_y, 2.0);
    assert!(!root.applied_valid());

    let child = &rider.bones[1];
    assert_approx(child.world_x, 40.0);
    assert_approx(child.world_y, 3.0);
}

#[test]
fn rotate_world_post_rotates_and_invalidates_applied() {
    let data = skeleton_data(vec![bone("root", None, 0.0, 0.0, 0.0)]);
    let mut skeleton = Skeleton::new(data);
    skeleton.update_world_transform();
    assert!(skeleton.bones[0].applied_valid());

    skeleton.bones[0].rotate_world(90.0);
    let root = &skeleton.bones[0];
    assert!(!root.applied_valid());
    assert_approx(root.a, 0.0);
    assert_approx(root.c, 1.0);
}

#[test]
fn set_to_setup_pose_restores_local_fields() {
    let data = skeleton_data(vec![bone("root", None, 10.0, 20.0, 30.0)]);
    let mut skeleton = Skeleton::new(data);

    skeleton.bones[0].x = 99.0;
    skeleton.bones[0].rotation = 180.0;
    skeleton.set_to_setup_pose();

    assert_approx(skeleton.bones[0].x, 10.0);
    assert_approx(skeleton.bones[0].y, 20.0);
    assert_approx(skeleton.bones[0].rotation, 30.0);
}

#[test]
fn world_to_local_inverts_local_to_world() {
    let data = skeleton_data(vec![
        bone("root", None, 5.0, 5.0, 45.0),
        bone("child", Some(0), 2.0, 1.0, 15.0),
    ]);
    let mut skeleton = Skeleton::new(data);
    skeleton.update_world_transform();

    let child = &skeleton.bones[1];
    let world = child.local_to_world(3.0, -4.0);
    let local = child.world_to_local(world[0], world[1]);
    assert_approx(local[0], 3.0);
    assert_approx(local[1], -4.0);
}
