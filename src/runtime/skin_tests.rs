use crate::{
    AttachmentData, BlendMode, BoneData, Error, RegionAttachmentData, Skeleton, SkeletonData,
    SkinData, SlotData, TransformMode,
};
use std::collections::HashMap;
use std::sync::Arc;

fn bone(name: &str) -> BoneData {
    BoneData {
        name: name.to_string(),
        parent: None,
        length: 0.0,
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

fn region(name: &str, width: f32) -> AttachmentData {
    AttachmentData::Region(RegionAttachmentData {
        name: name.to_string(),
        path: name.to_string(),
        color: [1.0, 1.0, 1.0, 1.0],
        x: 0.0,
        y: 0.0,
        rotation: 0.0,
        scale_x: 1.0,
        scale_y: 1.0,
        width,
        height: 10.0,
    })
}

fn skin(name: &str, attachments: Vec<(&str, f32)>) -> SkinData {
    let mut slot_map = HashMap::new();
    for (attachment_name, width) in attachments {
        slot_map.insert(attachment_name.to_string(), region(attachment_name, width));
    }
    SkinData {
        name: name.to_string(),
        attachments: vec![slot_map],
        bones: Vec::new(),
        ik_constraints: Vec::new(),
        transform_constraints: Vec::new(),
        path_constraints: Vec::new(),
    }
}

fn skeleton_data(skins: Vec<SkinData>, setup_attachment: Option<&str>) -> Arc<SkeletonData> {
    let skins = skins.into_iter().map(|s| (s.name.clone(), s)).collect();
    Arc::new(SkeletonData {
        bones: vec![bone("root")],
        slots: vec![SlotData {
            name: "hand".to_string(),
            bone: 0,
            attachment: setup_attachment.map(|s| s.to_string()),
            color: [1.0, 1.0, 1.0, 1.0],
            has_dark: false,
            dark_color: [0.0, 0.0, 0.0],
            blend: BlendMode::Normal,
        }],
        skins,
        ik_constraints: Vec::new(),
        transform_constraints: Vec::new(),
        path_constraints: Vec::new(),
    })
}

#[test]
fn setting_a_skin_with_no_previous_skin_applies_setup_attachments() {
    let data = skeleton_data(vec![skin("leather", vec![("glove", 11.0)])], Some("glove"));
    let mut skeleton = Skeleton::new(data);
    // Not resolvable without a skin and with no default skin.
    assert_eq!(skeleton.slots[0].attachment(), None);

    skeleton.set_skin(Some("leather")).unwrap();
    assert_eq!(skeleton.slots[0].attachment(), Some("glove"));
    assert_eq!(skeleton.slots[0].attachment_skin(), Some("leather"));
}

#[test]
fn swapping_skins_reattaches_same_named_attachments() {
    let data = skeleton_data(
        vec![
            skin("leather", vec![("glove", 11.0)]),
            skin("iron", vec![("glove", 22.0)]),
        ],
        Some("glove"),
    );
    let mut skeleton = Skeleton::new(data);
    skeleton.set_skin(Some("leather")).unwrap();
    skeleton.slots[0].deform = vec![1.0, 2.0];

    skeleton.set_skin(Some("iron")).unwrap();
    assert_eq!(skeleton.slots[0].attachment(), Some("glove"));
    assert_eq!(skeleton.slots[0].attachment_skin(), Some("iron"));
    // Now resolves to the iron skin's version.
    assert!(matches!(
        skeleton.slot_attachment_data(0),
        Some(AttachmentData::Region(r)) if r.width == 22.0
    ));
    // A different attachment reference resets deform state.
    assert!(skeleton.slots[0].deform.is_empty());
}

#[test]
fn swapping_to_a_skin_without_the_name_detaches_the_slot() {
    let data = skeleton_data(
        vec![
            skin("leather", vec![("glove", 11.0)]),
            skin("bare", vec![("ring", 1.0)]),
        ],
        Some("glove"),
    );
    let mut skeleton = Skeleton::new(data);
    skeleton.set_skin(Some("leather")).unwrap();
    assert_eq!(skeleton.slots[0].attachment(), Some("glove"));

    skeleton.set_skin(Some("bare")).unwrap();
    assert_eq!(skeleton.slots[0].attachment(), None);
}

#[test]
fn clearing_the_skin_detaches_skin_sourced_attachments() {
    let data = skeleton_data(vec![skin("leather", vec![("glove", 11.0)])], Some("glove"));
    let mut skeleton = Skeleton::new(data);
    skeleton.set_skin(Some("leather")).unwrap();

    skeleton.set_skin(None).unwrap();
    assert_eq!(skeleton.skin(), None);
    assert_eq!(skeleton.slots[0].attachment(), None);
}

#[test]
fn setting_the_same_skin_is_a_no_op() {
    let data = skeleton_data(vec![skin("leather", vec![("glove", 11.0)])], Some("glove"));
    let mut skeleton = Skeleton::new(data);
    skeleton.set_skin(Some("leather")).unwrap();
    skeleton.slots[0].deform = vec![9.0];

    skeleton.set_skin(Some("leather")).unwrap();
    assert_eq!(skeleton.slots[0].deform, vec![9.0]);
}

#[test]
fn unknown_skin_names_fail_fast_and_keep_the_current_skin() {
    let data = skeleton_data(vec![skin("leather", vec![("glove", 11.0)])], Some("glove"));
    let mut skeleton = Skeleton::new(data);
    skeleton.set_skin(Some("leather")).unwrap();

    assert!(matches!(
        skeleton.set_skin(Some("gold")),
        Err(Error::UnknownSkin { .. })
    ));
    assert_eq!(skeleton.skin(), Some("leather"));
}

#[test]
fn active_skin_wins_over_default_skin_in_lookups() {
    let data = skeleton_data(
        vec![
            skin("default", vec![("glove", 1.0)]),
            skin("iron", vec![("glove", 22.0)]),
        ],
        None,
    );
    let mut skeleton = Skeleton::new(data);

    assert!(matches!(
        skeleton.attachment(0, "glove"),
        Some(AttachmentData::Region(r)) if r.width == 1.0
    ));

    skeleton.set_skin(Some("iron")).unwrap();
    assert!(matches!(
        skeleton.attachment(0, "glove"),
        Some(AttachmentData::Region(r)) if r.width == 22.0
    ));
}
