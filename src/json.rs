//! Serde-based loader for the crate's own skeleton setup document.
//!
//! The document is a plain JSON description of setup-pose data: bones,
//! slots, skins, and constraints, referencing each other by name. This is
//! not a reader for any third-party editor export format; converting such
//! exports into this document (or into [`SkeletonData`] directly) is the
//! job of an external tool.

use crate::{
    AttachmentData, BlendMode, BoneData, BoundingBoxAttachmentData, ClippingAttachmentData, Error,
    IkConstraintData, MeshAttachmentData, PathAttachmentData, PathConstraintData,
    PointAttachmentData, PositionMode, RegionAttachmentData, RotateMode, SkeletonData, SkinData,
    SlotData, SpacingMode, TransformConstraintData, TransformMode, VertexData, VertexWeight,
};
use serde::Deserialize;
use std::collections::HashMap;

fn one() -> f32 {
    1.0
}

fn opaque_white() -> [f32; 4] {
    [1.0, 1.0, 1.0, 1.0]
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SkeletonDoc {
    #[serde(default)]
    bones: Vec<BoneDoc>,
    #[serde(default)]
    slots: Vec<SlotDoc>,
    #[serde(default)]
    skins: Vec<SkinDoc>,
    #[serde(default)]
    ik: Vec<IkDoc>,
    #[serde(default)]
    transform: Vec<TransformDoc>,
    #[serde(default)]
    path: Vec<PathDoc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct BoneDoc {
    name: String,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    length: f32,
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    rotation: f32,
    #[serde(default = "one")]
    scale_x: f32,
    #[serde(default = "one")]
    scale_y: f32,
    #[serde(default)]
    shear_x: f32,
    #[serde(default)]
    shear_y: f32,
    #[serde(default)]
    transform_mode: TransformModeDoc,
    #[serde(default)]
    skin_required: bool,
}

#[derive(Deserialize, Default, Copy, Clone)]
#[serde(rename_all = "camelCase")]
enum TransformModeDoc {
    #[default]
    Normal,
    OnlyTranslation,
    NoRotationOrReflection,
    NoScale,
    NoScaleOrReflection,
}

impl From<TransformModeDoc> for TransformMode {
    fn from(mode: TransformModeDoc) -> Self {
        match mode {
            TransformModeDoc::Normal => TransformMode::Normal,
            TransformModeDoc::OnlyTranslation => TransformMode::OnlyTranslation,
            TransformModeDoc::NoRotationOrReflection => TransformMode::NoRotationOrReflection,
            TransformModeDoc::NoScale => TransformMode::NoScale,
            TransformModeDoc::NoScaleOrReflection => TransformMode::NoScaleOrReflection,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SlotDoc {
    name: String,
    bone: String,
    #[serde(default)]
    attachment: Option<String>,
    #[serde(default = "opaque_white")]
    color: [f32; 4],
    #[serde(default)]
    dark_color: Option<[f32; 3]>,
    #[serde(default)]
    blend: BlendDoc,
}

#[derive(Deserialize, Default, Copy, Clone)]
#[serde(rename_all = "camelCase")]
enum BlendDoc {
    #[default]
    Normal,
    Additive,
    Multiply,
    Screen,
}

impl From<BlendDoc> for BlendMode {
    fn from(blend: BlendDoc) -> Self {
        match blend {
            BlendDoc::Normal => BlendMode::Normal,
            BlendDoc::Additive => BlendMode::Additive,
            BlendDoc::Multiply => BlendMode::Multiply,
            BlendDoc::Screen => BlendMode::Screen,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct IkDoc {
    name: String,
    #[serde(default)]
    order: Option<i32>,
    #[serde(default)]
    skin_required: bool,
    bones: Vec<String>,
    target: String,
    #[serde(default = "one")]
    mix: f32,
    #[serde(default)]
    softness: f32,
    #[serde(default)]
    compress: bool,
    #[serde(default)]
    stretch: bool,
    #[serde(default)]
    uniform: bool,
    #[serde(default = "default_bend")]
    bend_direction: i32,
}

fn default_bend() -> i32 {
    1
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct TransformDoc {
    name: String,
    #[serde(default)]
    order: Option<i32>,
    #[serde(default)]
    skin_required: bool,
    bones: Vec<String>,
    target: String,
    #[serde(default)]
    rotate_mix: f32,
    #[serde(default)]
    translate_mix: f32,
    #[serde(default)]
    scale_mix: f32,
    #[serde(default)]
    shear_mix: f32,
    #[serde(default)]
    offset_rotation: f32,
    #[serde(default)]
    offset_x: f32,
    #[serde(default)]
    offset_y: f32,
    #[serde(default)]
    offset_scale_x: f32,
    #[serde(default)]
    offset_scale_y: f32,
    #[serde(default)]
    offset_shear_y: f32,
    #[serde(default)]
    local: bool,
    #[serde(default)]
    relative: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct PathDoc {
    name: String,
    #[serde(default)]
    order: Option<i32>,
    #[serde(default)]
    skin_required: bool,
    bones: Vec<String>,
    target: String,
    #[serde(default)]
    position_mode: PositionModeDoc,
    #[serde(default)]
    spacing_mode: SpacingModeDoc,
    #[serde(default)]
    rotate_mode: RotateModeDoc,
    #[serde(default)]
    offset_rotation: f32,
    #[serde(default)]
    position: f32,
    #[serde(default)]
    spacing: f32,
    #[serde(default)]
    rotate_mix: f32,
    #[serde(default)]
    translate_mix: f32,
}

#[derive(Deserialize, Default, Copy, Clone)]
#[serde(rename_all = "camelCase")]
enum PositionModeDoc {
    Fixed,
    #[default]
    Percent,
}

#[derive(Deserialize, Default, Copy, Clone)]
#[serde(rename_all = "camelCase")]
enum SpacingModeDoc {
    #[default]
    Length,
    Fixed,
    Percent,
}

#[derive(Deserialize, Default, Copy, Clone)]
#[serde(rename_all = "camelCase")]
enum RotateModeDoc {
    #[default]
    Tangent,
    Chain,
    ChainScale,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SkinDoc {
    name: String,
    /// Slot name -> attachment name -> attachment.
    #[serde(default)]
    attachments: HashMap<String, HashMap<String, AttachmentDoc>>,
    #[serde(default)]
    bones: Vec<String>,
    #[serde(default)]
    ik: Vec<String>,
    #[serde(default)]
    transform: Vec<String>,
    #[serde(default)]
    path: Vec<String>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum AttachmentDoc {
    #[serde(rename_all = "camelCase")]
    Region {
        #[serde(default)]
        path: Option<String>,
        #[serde(default = "opaque_white")]
        color: [f32; 4],
        #[serde(default)]
        x: f32,
        #[serde(default)]
        y: f32,
        #[serde(default)]
        rotation: f32,
        #[serde(default = "one")]
        scale_x: f32,
        #[serde(default = "one")]
        scale_y: f32,
        width: f32,
        height: f32,
    },
    #[serde(rename_all = "camelCase")]
    Mesh {
        #[serde(default)]
        path: Option<String>,
        #[serde(default = "opaque_white")]
        color: [f32; 4],
        vertices: VerticesDoc,
        uvs: Vec<[f32; 2]>,
        triangles: Vec<u32>,
    },
    #[serde(rename_all = "camelCase")]
    Point {
        #[serde(default)]
        x: f32,
        #[serde(default)]
        y: f32,
        #[serde(default)]
        rotation: f32,
    },
    #[serde(rename_all = "camelCase")]
    Path {
        vertices: VerticesDoc,
        #[serde(default)]
        lengths: Vec<f32>,
        #[serde(default)]
        closed: bool,
        #[serde(default)]
        constant_speed: bool,
    },
    #[serde(rename_all = "camelCase")]
    BoundingBox { vertices: VerticesDoc },
    #[serde(rename_all = "camelCase")]
    Clipping {
        vertices: VerticesDoc,
        #[serde(default)]
        end_slot: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VerticesDoc {
    Unweighted(Vec<[f32; 2]>),
    Weighted(Vec<Vec<WeightDoc>>),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct WeightDoc {
    bone: String,
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    weight: f32,
}

struct NameMaps {
    bones: HashMap<String, usize>,
    slots: HashMap<String, usize>,
}

fn bone_index(
    maps: &NameMaps,
    kind: &str,
    constraint: &str,
    name: &str,
) -> Result<usize, Error> {
    maps.bones
        .get(name)
        .copied()
        .ok_or_else(|| Error::JsonUnknownConstraintBone {
            kind: kind.to_string(),
            constraint: constraint.to_string(),
            bone: name.to_string(),
        })
}

fn convert_vertices(
    maps: &NameMaps,
    skin: &str,
    doc: VerticesDoc,
) -> Result<VertexData, Error> {
    match doc {
        VerticesDoc::Unweighted(v) => Ok(VertexData::Unweighted(v)),
        VerticesDoc::Weighted(v) => {
            let mut out = Vec::with_capacity(v.len());
            for weights in v {
                let mut converted = Vec::with_capacity(weights.len());
                for w in weights {
                    let bone = maps.bones.get(&w.bone).copied().ok_or_else(|| {
                        Error::JsonUnknownSkinBone {
                            skin: skin.to_string(),
                            bone: w.bone.clone(),
                        }
                    })?;
                    converted.push(VertexWeight {
                        bone,
                        x: w.x,
                        y: w.y,
                        weight: w.weight,
                    });
                }
                out.push(converted);
            }
            Ok(VertexData::Weighted(out))
        }
    }
}

fn convert_attachment(
    maps: &NameMaps,
    skin: &str,
    name: &str,
    doc: AttachmentDoc,
) -> Result<AttachmentData, Error> {
    Ok(match doc {
        AttachmentDoc::Region {
            path,
            color,
            x,
            y,
            rotation,
            scale_x,
            scale_y,
            width,
            height,
        } => AttachmentData::Region(RegionAttachmentData {
            name: name.to_string(),
            path: path.unwrap_or_else(|| name.to_string()),
            color,
            x,
            y,
            rotation,
            scale_x,
            scale_y,
            width,
            height,
        }),
        AttachmentDoc::Mesh {
            path,
            color,
            vertices,
            uvs,
            triangles,
        } => AttachmentData::Mesh(MeshAttachmentData {
            name: name.to_string(),
            path: path.unwrap_or_else(|| name.to_string()),
            color,
            vertices: convert_vertices(maps, skin, vertices)?,
            uvs,
            triangles,
        }),
        AttachmentDoc::Point { x, y, rotation } => AttachmentData::Point(PointAttachmentData {
            name: name.to_string(),
            x,
            y,
            rotation,
        }),
        AttachmentDoc::Path {
            vertices,
            lengths,
            closed,
            constant_speed,
        } => AttachmentData::Path(PathAttachmentData {
            name: name.to_string(),
            vertices: convert_vertices(maps, skin, vertices)?,
            lengths,
            closed,
            constant_speed,
        }),
        AttachmentDoc::BoundingBox { vertices } => {
            AttachmentData::BoundingBox(BoundingBoxAttachmentData {
                name: name.to_string(),
                vertices: convert_vertices(maps, skin, vertices)?,
            })
        }
        AttachmentDoc::Clipping { vertices, end_slot } => {
            let end_slot = match end_slot {
                None => None,
                Some(slot_name) => Some(maps.slots.get(&slot_name).copied().ok_or_else(|| {
                    Error::JsonUnknownSkinSlot {
                        skin: skin.to_string(),
                        slot: slot_name.clone(),
                    }
                })?),
            };
            AttachmentData::Clipping(ClippingAttachmentData {
                name: name.to_string(),
                vertices: convert_vertices(maps, skin, vertices)?,
                end_slot,
            })
        }
    })
}

impl SkeletonData {
    /// Loads setup-pose data from the crate's JSON document format.
    pub fn from_json_str(json: &str) -> Result<SkeletonData, Error> {
        let doc: SkeletonDoc = serde_json::from_str(json).map_err(|e| Error::JsonParse {
            message: e.to_string(),
        })?;

        let mut maps = NameMaps {
            bones: HashMap::new(),
            slots: HashMap::new(),
        };
        for (i, bone) in doc.bones.iter().enumerate() {
            maps.bones.insert(bone.name.clone(), i);
        }
        for (i, slot) in doc.slots.iter().enumerate() {
            maps.slots.insert(slot.name.clone(), i);
        }

        let mut bones = Vec::with_capacity(doc.bones.len());
        for bone in &doc.bones {
            let parent = match &bone.parent {
                None => None,
                Some(parent_name) => Some(maps.bones.get(parent_name).copied().ok_or_else(
                    || Error::JsonUnknownBoneParent {
                        bone: bone.name.clone(),
                        parent: parent_name.clone(),
                    },
                )?),
            };
            bones.push(BoneData {
                name: bone.name.clone(),
                parent,
                length: bone.length,
                x: bone.x,
                y: bone.y,
                rotation: bone.rotation,
                scale_x: bone.scale_x,
                scale_y: bone.scale_y,
                shear_x: bone.shear_x,
                shear_y: bone.shear_y,
                transform_mode: bone.transform_mode.into(),
                skin_required: bone.skin_required,
            });
        }

        let mut slots = Vec::with_capacity(doc.slots.len());
        for slot in &doc.slots {
            let bone = maps.bones.get(&slot.bone).copied().ok_or_else(|| {
                Error::JsonUnknownSlotBone {
                    slot: slot.name.clone(),
                    bone: slot.bone.clone(),
                }
            })?;
            slots.push(SlotData {
                name: slot.name.clone(),
                bone,
                attachment: slot.attachment.clone(),
                color: slot.color,
                has_dark: slot.dark_color.is_some(),
                dark_color: slot.dark_color.unwrap_or([0.0, 0.0, 0.0]),
                blend: slot.blend.into(),
            });
        }

        // Constraints without an explicit order keep their document order,
        // numbered across all three kinds.
        let mut next_order = 0i32;
        let mut take_order = |explicit: Option<i32>| {
            let order = explicit.unwrap_or(next_order);
            next_order = order + 1;
            order
        };

        let mut ik_constraints = Vec::with_capacity(doc.ik.len());
        for c in &doc.ik {
            let mut constrained = Vec::with_capacity(c.bones.len());
            for bone_name in &c.bones {
                constrained.push(bone_index(&maps, "ik", &c.name, bone_name)?);
            }
            ik_constraints.push(IkConstraintData {
                name: c.name.clone(),
                order: take_order(c.order),
                skin_required: c.skin_required,
                bones: constrained,
                target: bone_index(&maps, "ik", &c.name, &c.target)?,
                mix: c.mix,
                softness: c.softness,
                compress: c.compress,
                stretch: c.stretch,
                uniform: c.uniform,
                bend_direction: c.bend_direction,
            });
        }

        let mut transform_constraints = Vec::with_capacity(doc.transform.len());
        for c in &doc.transform {
            let mut constrained = Vec::with_capacity(c.bones.len());
            for bone_name in &c.bones {
                constrained.push(bone_index(&maps, "transform", &c.name, bone_name)?);
            }
            transform_constraints.push(TransformConstraintData {
                name: c.name.clone(),
                order: take_order(c.order),
                skin_required: c.skin_required,
                bones: constrained,
                target: bone_index(&maps, "transform", &c.name, &c.target)?,
                rotate_mix: c.rotate_mix,
                translate_mix: c.translate_mix,
                scale_mix: c.scale_mix,
                shear_mix: c.shear_mix,
                offset_rotation: c.offset_rotation,
                offset_x: c.offset_x,
                offset_y: c.offset_y,
                offset_scale_x: c.offset_scale_x,
                offset_scale_y: c.offset_scale_y,
                offset_shear_y: c.offset_shear_y,
                local: c.local,
                relative: c.relative,
            });
        }

        let mut path_constraints = Vec::with_capacity(doc.path.len());
        for c in &doc.path {
            let mut constrained = Vec::with_capacity(c.bones.len());
            for bone_name in &c.bones {
                constrained.push(bone_index(&maps, "path", &c.name, bone_name)?);
            }
            let target = maps.slots.get(&c.target).copied().ok_or_else(|| {
                Error::JsonUnknownPathConstraintSlot {
                    constraint: c.name.clone(),
                    slot: c.target.clone(),
                }
            })?;
            path_constraints.push(PathConstraintData {
                name: c.name.clone(),
                order: take_order(c.order),
                skin_required: c.skin_required,
                bones: constrained,
                target,
                position_mode: match c.position_mode {
                    PositionModeDoc::Fixed => PositionMode::Fixed,
                    PositionModeDoc::Percent => PositionMode::Percent,
                },
                spacing_mode: match c.spacing_mode {
                    SpacingModeDoc::Length => SpacingMode::Length,
                    SpacingModeDoc::Fixed => SpacingMode::Fixed,
                    SpacingModeDoc::Percent => SpacingMode::Percent,
                },
                rotate_mode: match c.rotate_mode {
                    RotateModeDoc::Tangent => RotateMode::Tangent,
                    RotateModeDoc::Chain => RotateMode::Chain,
                    RotateModeDoc::ChainScale => RotateMode::ChainScale,
                },
                offset_rotation: c.offset_rotation,
                position: c.position,
                spacing: c.spacing,
                rotate_mix: c.rotate_mix,
                translate_mix: c.translate_mix,
            });
        }

        let ik_names: HashMap<&str, usize> = doc
            .ik
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.as_str(), i))
            .collect();
        let transform_names: HashMap<&str, usize> = doc
            .transform
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.as_str(), i))
            .collect();
        let path_names: HashMap<&str, usize> = doc
            .path
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.as_str(), i))
            .collect();

        let mut skins = HashMap::with_capacity(doc.skins.len());
        for skin in doc.skins {
            let mut attachments = vec![HashMap::new(); slots.len()];
            for (slot_name, slot_attachments) in skin.attachments {
                let slot_index = maps.slots.get(&slot_name).copied().ok_or_else(|| {
                    Error::JsonUnknownSkinSlot {
                        skin: skin.name.clone(),
                        slot: slot_name.clone(),
                    }
                })?;
                for (attachment_name, attachment) in slot_attachments {
                    let converted =
                        convert_attachment(&maps, &skin.name, &attachment_name, attachment)?;
                    attachments[slot_index].insert(attachment_name, converted);
                }
            }

            let mut skin_bones = Vec::with_capacity(skin.bones.len());
            for bone_name in &skin.bones {
                skin_bones.push(maps.bones.get(bone_name).copied().ok_or_else(|| {
                    Error::JsonUnknownSkinBone {
                        skin: skin.name.clone(),
                        bone: bone_name.clone(),
                    }
                })?);
            }

            let resolve = |names: &[String], table: &HashMap<&str, usize>| {
                names
                    .iter()
                    .filter_map(|n| table.get(n.as_str()).copied())
                    .collect::<Vec<_>>()
            };

            skins.insert(
                skin.name.clone(),
                SkinData {
                    ik_constraints: resolve(&skin.ik, &ik_names),
                    transform_constraints: resolve(&skin.transform, &transform_names),
                    path_constraints: resolve(&skin.path, &path_names),
                    bones: skin_bones,
                    attachments,
                    name: skin.name,
                },
            );
        }

        Ok(SkeletonData {
            bones,
            slots,
            skins,
            ik_constraints,
            transform_constraints,
            path_constraints,
        })
    }
}
