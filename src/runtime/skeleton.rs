use crate::math::{EPSILON, PATH_EPSILON, cos_deg, shortest_rotation, sin_deg, wrap_deg, wrap_pi};
use crate::{
    AttachmentData, BlendMode, PathAttachmentData, PositionMode, RotateMode, SkeletonData,
    SpacingMode, TransformMode, VertexData,
};
use std::sync::Arc;

fn estimate_path_scratch_capacities(data: &SkeletonData, target_slot_index: usize) -> (usize, usize) {
    let mut max_world_floats = 8usize;
    let mut max_curves = 0usize;

    for skin in data.skins.values() {
        let Some(slot_map) = skin.attachments.get(target_slot_index) else {
            continue;
        };
        for attachment in slot_map.values() {
            let AttachmentData::Path(path) = attachment else {
                continue;
            };

            let vertices_length = path.vertices.vertex_count() * 2;
            if vertices_length < 6 {
                continue;
            }

            if path.constant_speed {
                let world_floats = if path.closed {
                    vertices_length + 2
                } else {
                    vertices_length.saturating_sub(4)
                };
                max_world_floats = max_world_floats.max(world_floats);

                let curves = if path.closed {
                    vertices_length / 6
                } else {
                    (vertices_length / 6).saturating_sub(1)
                };
                max_curves = max_curves.max(curves);
            } else {
                max_world_floats = max_world_floats.max(8);
            }
        }
    }

    (max_world_floats, max_curves)
}

/// Live bone instance.
///
/// Local pose fields (`x`..`shear_y`) are the animation-facing state. The
/// applied pose (`ax`..`ashear_y`) is the pose actually used to build the
/// world matrix; it diverges from the local pose when a constraint writes
/// the world matrix directly. `applied_valid` must be true before applied
/// fields are read; `Skeleton::update_applied_transform` back-derives them
/// from the world matrix otherwise.
#[derive(Clone, Debug)]
pub struct Bone {
    data_index: usize,
    parent: Option<usize>,

    pub transform_mode: TransformMode,
    pub active: bool,

    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub shear_x: f32,
    pub shear_y: f32,

    pub ax: f32,
    pub ay: f32,
    pub arotation: f32,
    pub ascale_x: f32,
    pub ascale_y: f32,
    pub ashear_x: f32,
    pub ashear_y: f32,

    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub world_x: f32,
    pub world_y: f32,

    applied_valid: bool,
}

impl Bone {
    pub fn data_index(&self) -> usize {
        self.data_index
    }

    pub fn parent_index(&self) -> Option<usize> {
        self.parent
    }

    pub fn applied_valid(&self) -> bool {
        self.applied_valid
    }

    pub fn world_rotation_x(&self) -> f32 {
        self.c.atan2(self.a).to_degrees()
    }

    pub fn world_rotation_y(&self) -> f32 {
        self.d.atan2(self.b).to_degrees()
    }

    pub fn world_scale_x(&self) -> f32 {
        (self.a * self.a + self.c * self.c).sqrt()
    }

    pub fn world_scale_y(&self) -> f32 {
        (self.b * self.b + self.d * self.d).sqrt()
    }

    pub fn local_to_world(&self, local_x: f32, local_y: f32) -> [f32; 2] {
        [
            self.a * local_x + self.b * local_y + self.world_x,
            self.c * local_x + self.d * local_y + self.world_y,
        ]
    }

    /// Inverse of [`Bone::local_to_world`]. A degenerate world matrix maps
    /// everything to the bone origin.
    pub fn world_to_local(&self, world_x: f32, world_y: f32) -> [f32; 2] {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() <= EPSILON {
            return [0.0, 0.0];
        }
        let x = world_x - self.world_x;
        let y = world_y - self.world_y;
        [
            (x * self.d - y * self.b) / det,
            (y * self.a - x * self.c) / det,
        ]
    }

    /// Post-rotates the world matrix. The applied pose no longer matches
    /// the world matrix afterwards.
    pub fn rotate_world(&mut self, degrees: f32) {
        let (a, b, c, d) = (self.a, self.b, self.c, self.d);
        let cos = cos_deg(degrees);
        let sin = sin_deg(degrees);
        self.a = cos * a - sin * c;
        self.b = cos * b - sin * d;
        self.c = sin * a + cos * c;
        self.d = sin * b + cos * d;
        self.applied_valid = false;
    }
}

#[derive(Clone, Debug)]
pub struct IkConstraint {
    data_index: usize,
    pub bones: Vec<usize>,
    pub target: usize,
    pub mix: f32,
    pub softness: f32,
    pub compress: bool,
    pub stretch: bool,
    pub uniform: bool,
    pub bend_direction: i32,
    pub active: bool,
}

impl IkConstraint {
    pub fn data_index(&self) -> usize {
        self.data_index
    }
}

#[derive(Clone, Debug)]
pub struct TransformConstraint {
    data_index: usize,
    pub bones: Vec<usize>,
    pub target: usize,
    pub rotate_mix: f32,
    pub translate_mix: f32,
    pub scale_mix: f32,
    pub shear_mix: f32,
    pub active: bool,
}

impl TransformConstraint {
    pub fn data_index(&self) -> usize {
        self.data_index
    }
}

#[derive(Clone, Debug)]
pub struct PathConstraint {
    data_index: usize,
    pub bones: Vec<usize>,
    /// Slot index whose attachment supplies the path.
    pub target: usize,
    pub position: f32,
    pub spacing: f32,
    pub rotate_mix: f32,
    pub translate_mix: f32,
    pub active: bool,
}

impl PathConstraint {
    pub fn data_index(&self) -> usize {
        self.data_index
    }
}

/// Live slot instance.
///
/// The attachment key is private: changing it goes through the skeleton's
/// attachment setters, which reset the attachment time and clear the
/// deform buffer whenever the attachment actually changes.
#[derive(Clone, Debug)]
pub struct Slot {
    data_index: usize,
    pub bone: usize,
    attachment: Option<String>,
    attachment_skin: Option<String>,
    /// Skeleton time at which the current attachment was set.
    attachment_time: f32,
    pub deform: Vec<f32>,
    pub color: [f32; 4],
    pub has_dark: bool,
    pub dark_color: [f32; 3],
    pub blend: BlendMode,
}

impl Slot {
    pub fn data_index(&self) -> usize {
        self.data_index
    }

    pub fn attachment(&self) -> Option<&str> {
        self.attachment.as_deref()
    }

    /// Skin the current attachment was resolved from, when it came from a
    /// skin lookup.
    pub fn attachment_skin(&self) -> Option<&str> {
        self.attachment_skin.as_deref()
    }

    fn set_attachment_key(
        &mut self,
        key: Option<String>,
        source_skin: Option<String>,
        skeleton_time: f32,
    ) {
        if self.attachment == key && self.attachment_skin == source_skin {
            return;
        }
        self.attachment = key;
        self.attachment_skin = source_skin;
        self.attachment_time = skeleton_time;
        self.deform.clear();
    }
}

impl crate::PointAttachmentData {
    pub fn compute_world_position(&self, bone: &Bone) -> [f32; 2] {
        [
            bone.a * self.x + bone.b * self.y + bone.world_x,
            bone.c * self.x + bone.d * self.y + bone.world_y,
        ]
    }

    pub fn compute_world_rotation(&self, bone: &Bone) -> f32 {
        bone.c.atan2(bone.a).to_degrees() + self.rotation
    }
}

impl crate::RegionAttachmentData {
    /// Writes the four world-space corners (bottom-right, bottom-left,
    /// upper-left, upper-right) into `out` at `offset` with `stride`,
    /// growing the buffer if needed.
    pub fn compute_world_vertices(
        &self,
        bone: &Bone,
        out: &mut Vec<f32>,
        offset: usize,
        stride: usize,
    ) {
        let end = offset + 3 * stride + 2;
        if out.len() < end {
            out.resize(end, 0.0);
        }

        let local_x = -self.width * 0.5 * self.scale_x;
        let local_y = -self.height * 0.5 * self.scale_y;
        let local_x2 = -local_x;
        let local_y2 = -local_y;

        let r = self.rotation.to_radians();
        let cos = r.cos();
        let sin = r.sin();

        let local_x_cos = local_x * cos + self.x;
        let local_x_sin = local_x * sin;
        let local_y_cos = local_y * cos + self.y;
        let local_y_sin = local_y * sin;
        let local_x2_cos = local_x2 * cos + self.x;
        let local_x2_sin = local_x2 * sin;
        let local_y2_cos = local_y2 * cos + self.y;
        let local_y2_sin = local_y2 * sin;

        let corners = [
            (local_x2_cos - local_y_sin, local_y_cos + local_x2_sin),
            (local_x_cos - local_y_sin, local_y_cos + local_x_sin),
            (local_x_cos - local_y2_sin, local_y2_cos + local_x_sin),
            (local_x2_cos - local_y2_sin, local_y2_cos + local_x2_sin),
        ];

        for (i, (x, y)) in corners.into_iter().enumerate() {
            let w = offset + i * stride;
            out[w] = bone.a * x + bone.b * y + bone.world_x;
            out[w + 1] = bone.c * x + bone.d * y + bone.world_y;
        }
    }
}

/// Axis-aligned bounding box over the visible attachments.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Clone, Debug, Default)]
struct PathConstraintScratch {
    spaces: Vec<f32>,
    lengths: Vec<f32>,
    positions: Vec<f32>,
    world: Vec<f32>,
    curves: Vec<f32>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum UpdateCacheItem {
    Bone(usize),
    Ik(usize),
    Transform(usize),
    Path(usize),
}

#[derive(Clone, Debug)]
pub struct Skeleton {
    pub data: Arc<SkeletonData>,
    pub bones: Vec<Bone>,
    bone_children: Vec<Vec<usize>>,
    pub slots: Vec<Slot>,
    pub draw_order: Vec<usize>,
    skin: Option<String>,
    pub color: [f32; 4],
    pub ik_constraints: Vec<IkConstraint>,
    pub transform_constraints: Vec<TransformConstraint>,
    pub path_constraints: Vec<PathConstraint>,
    pub x: f32,
    pub y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    y_down: bool,
    time: f32,
    update_cache: Vec<UpdateCacheItem>,
    update_cache_reset: Vec<usize>,
    path_constraint_scratch: Vec<PathConstraintScratch>,
}

impl Skeleton {
    pub fn new(data: Arc<SkeletonData>) -> Self {
        let bones = data
            .bones
            .iter()
            .enumerate()
            .map(|(data_index, bone)| Bone {
                data_index,
                parent: bone.parent,
                transform_mode: bone.transform_mode,
                active: !bone.skin_required,
                x: bone.x,
                y: bone.y,
                rotation: bone.rotation,
                scale_x: bone.scale_x,
                scale_y: bone.scale_y,
                shear_x: bone.shear_x,
                shear_y: bone.shear_y,
                ax: bone.x,
                ay: bone.y,
                arotation: bone.rotation,
                ascale_x: bone.scale_x,
                ascale_y: bone.scale_y,
                ashear_x: bone.shear_x,
                ashear_y: bone.shear_y,
                a: 1.0,
                b: 0.0,
                c: 0.0,
                d: 1.0,
                world_x: 0.0,
                world_y: 0.0,
                applied_valid: true,
            })
            .collect::<Vec<_>>();

        let bone_children = build_bone_children_indices(&bones);

        let slots = data
            .slots
            .iter()
            .enumerate()
            .map(|(data_index, slot)| Slot {
                data_index,
                bone: slot.bone,
                attachment: None,
                attachment_skin: None,
                attachment_time: 0.0,
                deform: Vec::new(),
                color: slot.color,
                has_dark: slot.has_dark,
                dark_color: slot.dark_color,
                blend: slot.blend,
            })
            .collect::<Vec<_>>();

        let draw_order = (0..slots.len()).collect::<Vec<_>>();

        let ik_constraints = data
            .ik_constraints
            .iter()
            .enumerate()
            .map(|(data_index, ik)| IkConstraint {
                data_index,
                bones: ik.bones.clone(),
                target: ik.target,
                mix: ik.mix,
                softness: ik.softness,
                compress: ik.compress,
                stretch: ik.stretch,
                uniform: ik.uniform,
                bend_direction: ik.bend_direction,
                active: true,
            })
            .collect::<Vec<_>>();

        let transform_constraints = data
            .transform_constraints
            .iter()
            .enumerate()
            .map(|(data_index, c)| TransformConstraint {
                data_index,
                bones: c.bones.clone(),
                target: c.target,
                rotate_mix: c.rotate_mix,
                translate_mix: c.translate_mix,
                scale_mix: c.scale_mix,
                shear_mix: c.shear_mix,
                active: true,
            })
            .collect::<Vec<_>>();

        let path_constraints = data
            .path_constraints
            .iter()
            .enumerate()
            .map(|(data_index, c)| PathConstraint {
                data_index,
                bones: c.bones.clone(),
                target: c.target,
                position: c.position,
                spacing: c.spacing,
                rotate_mix: c.rotate_mix,
                translate_mix: c.translate_mix,
                active: true,
            })
            .collect::<Vec<_>>();

        // Pre-size path scratch buffers from the constraint topology so the
        // per-frame solve does not allocate.
        let path_constraint_scratch = data
            .path_constraints
            .iter()
            .map(|c| {
                let bone_count = c.bones.len();
                let spaces_count = bone_count + 1;
                let (max_world_floats, max_curves) =
                    estimate_path_scratch_capacities(&data, c.target);
                let mut scratch = PathConstraintScratch::default();
                scratch.spaces.reserve(spaces_count);
                scratch.lengths.reserve(bone_count);
                scratch.positions.reserve(spaces_count * 3 + 2);
                scratch.world.reserve(max_world_floats);
                scratch.curves.reserve(max_curves);
                scratch
            })
            .collect::<Vec<_>>();

        let mut out = Self {
            data,
            bones,
            bone_children,
            slots,
            draw_order,
            skin: None,
            color: [1.0, 1.0, 1.0, 1.0],
            ik_constraints,
            transform_constraints,
            path_constraints,
            x: 0.0,
            y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            y_down: false,
            time: 0.0,
            update_cache: Vec::new(),
            update_cache_reset: Vec::new(),
            path_constraint_scratch,
        };
        // Slots start in setup pose (setup attachments resolved through the
        // default skin); the cache is built once setup values are in place.
        out.set_to_setup_pose();
        out.update_cache();
        out
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn set_time(&mut self, time: f32) {
        if time.is_finite() {
            self.time = time;
        }
    }

    /// Advances the skeleton clock. Attachment times are measured against
    /// this clock, not wall time.
    pub fn update(&mut self, delta: f32) {
        if delta.is_finite() && delta >= 0.0 {
            self.time += delta;
        }
    }

    pub fn y_down(&self) -> bool {
        self.y_down
    }

    /// Flips the effective Y axis for renderers with Y increasing
    /// downwards. Per-instance; there is no process-wide toggle.
    pub fn set_y_down(&mut self, y_down: bool) {
        self.y_down = y_down;
    }

    fn effective_scale_y(&self) -> f32 {
        if self.y_down { -self.scale_y } else { self.scale_y }
    }

    pub fn skin(&self) -> Option<&str> {
        self.skin.as_deref()
    }

    pub fn root_bone(&self) -> Option<usize> {
        self.bones.iter().position(|b| b.parent.is_none())
    }

    pub fn find_bone(&self, name: &str) -> Option<usize> {
        self.data.bone_index(name)
    }

    pub fn find_slot(&self, name: &str) -> Option<usize> {
        self.data.slot_index(name)
    }

    pub fn find_ik_constraint(&self, name: &str) -> Option<usize> {
        self.data.ik_constraints.iter().position(|c| c.name == name)
    }

    pub fn find_transform_constraint(&self, name: &str) -> Option<usize> {
        self.data
            .transform_constraints
            .iter()
            .position(|c| c.name == name)
    }

    pub fn find_path_constraint(&self, name: &str) -> Option<usize> {
        self.data
            .path_constraints
            .iter()
            .position(|c| c.name == name)
    }

    /// Rebuilds the update order.
    ///
    /// Bones are active unless skin-required, in which case only the
    /// current skin's bones (and their ancestors) are active. A constraint
    /// is active when its target is active and, if skin-required, the
    /// current skin includes it.
    pub fn update_cache(&mut self) {
        for (i, bone) in self.bones.iter_mut().enumerate() {
            let required = self
                .data
                .bones
                .get(i)
                .map(|b| b.skin_required)
                .unwrap_or(false);
            bone.active = !required;
        }

        let skin = self.skin.as_deref().and_then(|n| self.data.skin(n));
        if let Some(skin) = skin {
            for &bone_index in &skin.bones {
                let mut cur = Some(bone_index);
                while let Some(i) = cur {
                    if i >= self.bones.len() {
                        break;
                    }
                    self.bones[i].active = true;
                    cur = self.bones[i].parent;
                }
            }
        }

        for c in &mut self.ik_constraints {
            let data = self.data.ik_constraints.get(c.data_index);
            let skin_required = data.map(|d| d.skin_required).unwrap_or(false);
            let in_skin = skin
                .map(|s| s.ik_constraints.contains(&c.data_index))
                .unwrap_or(false);
            let target_active = self.bones.get(c.target).map(|b| b.active).unwrap_or(false);
            c.active = target_active && (!skin_required || in_skin);
        }

        for c in &mut self.transform_constraints {
            let data = self.data.transform_constraints.get(c.data_index);
            let skin_required = data.map(|d| d.skin_required).unwrap_or(false);
            let in_skin = skin
                .map(|s| s.transform_constraints.contains(&c.data_index))
                .unwrap_or(false);
            let target_active = self.bones.get(c.target).map(|b| b.active).unwrap_or(false);
            c.active = target_active && (!skin_required || in_skin);
        }

        for c in &mut self.path_constraints {
            let data = self.data.path_constraints.get(c.data_index);
            let skin_required = data.map(|d| d.skin_required).unwrap_or(false);
            let in_skin = skin
                .map(|s| s.path_constraints.contains(&c.data_index))
                .unwrap_or(false);
            let target_bone_active = self
                .slots
                .get(c.target)
                .and_then(|s| self.bones.get(s.bone))
                .map(|b| b.active)
                .unwrap_or(false);
            c.active = target_bone_active && (!skin_required || in_skin);
        }

        self.rebuild_update_cache();
    }

    fn rebuild_update_cache(&mut self) {
        fn sort_reset(skeleton: &Skeleton, bone_index: usize, sorted: &mut [bool]) {
            if bone_index >= sorted.len() {
                return;
            }
            if !skeleton
                .bones
                .get(bone_index)
                .map(|b| b.active)
                .unwrap_or(false)
            {
                return;
            }
            if !sorted[bone_index] {
                return;
            }

            if let Some(children) = skeleton.bone_children.get(bone_index) {
                for &child in children {
                    sort_reset(skeleton, child, sorted);
                }
            }
            sorted[bone_index] = false;
        }

        fn sort_reset_children(skeleton: &Skeleton, bone_index: usize, sorted: &mut [bool]) {
            let Some(children) = skeleton.bone_children.get(bone_index) else {
                return;
            };
            for &child in children {
                sort_reset(skeleton, child, sorted);
            }
        }

        fn sort_bone(
            skeleton: &Skeleton,
            bone_index: usize,
            sorted: &mut [bool],
            out: &mut Vec<UpdateCacheItem>,
        ) {
            if bone_index >= sorted.len() {
                return;
            }
            if sorted[bone_index] {
                return;
            }
            let Some(bone) = skeleton.bones.get(bone_index) else {
                return;
            };
            if !bone.active {
                sorted[bone_index] = true;
                return;
            }
            if let Some(parent) = bone.parent {
                sort_bone(skeleton, parent, sorted, out);
            }
            sorted[bone_index] = true;
            out.push(UpdateCacheItem::Bone(bone_index));
        }

        fn cache_contains_bone(out: &[UpdateCacheItem], bone_index: usize) -> bool {
            out.iter()
                .any(|item| matches!(item, UpdateCacheItem::Bone(i) if *i == bone_index))
        }

        fn sort_path_attachment(
            skeleton: &Skeleton,
            attachment: &AttachmentData,
            slot_bone_index: usize,
            sorted: &mut [bool],
            out: &mut Vec<UpdateCacheItem>,
        ) {
            let AttachmentData::Path(path) = attachment else {
                return;
            };
            match &path.vertices {
                VertexData::Unweighted(_) => {
                    sort_bone(skeleton, slot_bone_index, sorted, out);
                }
                VertexData::Weighted(vertices) => {
                    for weights in vertices {
                        for w in weights {
                            sort_bone(skeleton, w.bone, sorted, out);
                        }
                    }
                }
            }
        }

        fn sort_path_slot(
            skeleton: &Skeleton,
            skin: &crate::SkinData,
            slot_index: usize,
            slot_bone_index: usize,
            sorted: &mut [bool],
            out: &mut Vec<UpdateCacheItem>,
        ) {
            let Some(slot_map) = skin.attachments.get(slot_index) else {
                return;
            };
            for attachment in slot_map.values() {
                sort_path_attachment(skeleton, attachment, slot_bone_index, sorted, out);
            }
        }

        let (out, reset) = {
            let skeleton: &Skeleton = &*self;
            let bone_count = skeleton.bones.len();
            let mut out = Vec::<UpdateCacheItem>::new();
            let mut reset = Vec::<usize>::new();
            let mut sorted = (0..bone_count)
                .map(|i| !skeleton.bones[i].active)
                .collect::<Vec<_>>();

            let current_skin_name = skeleton.skin.as_deref();
            let current_skin = current_skin_name.and_then(|n| skeleton.data.skin(n));
            let default_skin = if current_skin_name != Some("default") {
                skeleton.data.skin("default")
            } else {
                None
            };

            let total = skeleton.ik_constraints.len()
                + skeleton.transform_constraints.len()
                + skeleton.path_constraints.len();

            // Constraints are placed strictly by their data order; the
            // deserializer assigns orders 0..count-1.
            'orders: for order in 0..total {
                let order = order as i32;

                for (index, ik) in skeleton.ik_constraints.iter().enumerate() {
                    if !ik.active {
                        continue;
                    }
                    let Some(data) = skeleton.data.ik_constraints.get(ik.data_index) else {
                        continue;
                    };
                    if data.order != order {
                        continue;
                    }

                    sort_bone(skeleton, ik.target, &mut sorted, &mut out);
                    let Some(&parent_bone) = ik.bones.first() else {
                        continue 'orders;
                    };
                    sort_bone(skeleton, parent_bone, &mut sorted, &mut out);
                    if ik.bones.len() > 1 {
                        if let Some(&child) = ik.bones.last() {
                            if !cache_contains_bone(&out, child) {
                                reset.push(child);
                            }
                        }
                    }
                    out.push(UpdateCacheItem::Ik(index));
                    sort_reset_children(skeleton, parent_bone, &mut sorted);
                    // The chain tip is recomposed by the solver itself, so
                    // it stays sorted and is not re-added after the
                    // constraint.
                    if let Some(&last) = ik.bones.last() {
                        if last < sorted.len() {
                            sorted[last] = true;
                        }
                    }
                    continue 'orders;
                }

                for (index, c) in skeleton.transform_constraints.iter().enumerate() {
                    if !c.active {
                        continue;
                    }
                    let Some(data) = skeleton.data.transform_constraints.get(c.data_index) else {
                        continue;
                    };
                    if data.order != order {
                        continue;
                    }

                    sort_bone(skeleton, c.target, &mut sorted, &mut out);
                    if data.local {
                        // Local variants recompose each bone from its
                        // parent, so the parent must be current; the bone
                        // itself only needs its applied pose primed.
                        for &bone_index in &c.bones {
                            if let Some(parent) =
                                skeleton.bones.get(bone_index).and_then(|b| b.parent)
                            {
                                sort_bone(skeleton, parent, &mut sorted, &mut out);
                            }
                            if !cache_contains_bone(&out, bone_index) {
                                reset.push(bone_index);
                            }
                        }
                    } else {
                        for &bone_index in &c.bones {
                            sort_bone(skeleton, bone_index, &mut sorted, &mut out);
                        }
                    }
                    out.push(UpdateCacheItem::Transform(index));
                    for &bone_index in &c.bones {
                        sort_reset_children(skeleton, bone_index, &mut sorted);
                    }
                    for &bone_index in &c.bones {
                        if bone_index < sorted.len() {
                            sorted[bone_index] = true;
                        }
                    }
                    continue 'orders;
                }

                for (index, c) in skeleton.path_constraints.iter().enumerate() {
                    if !c.active {
                        continue;
                    }
                    let Some(data) = skeleton.data.path_constraints.get(c.data_index) else {
                        continue;
                    };
                    if data.order != order {
                        continue;
                    }

                    let Some(slot) = skeleton.slots.get(c.target) else {
                        continue 'orders;
                    };
                    let slot_bone_index = slot.bone;

                    if let Some(skin) = current_skin {
                        sort_path_slot(
                            skeleton,
                            skin,
                            c.target,
                            slot_bone_index,
                            &mut sorted,
                            &mut out,
                        );
                    }
                    if let Some(default_skin) = default_skin {
                        sort_path_slot(
                            skeleton,
                            default_skin,
                            c.target,
                            slot_bone_index,
                            &mut sorted,
                            &mut out,
                        );
                    }
                    if let Some(att) = skeleton.slot_attachment_data(c.target) {
                        sort_path_attachment(skeleton, att, slot_bone_index, &mut sorted, &mut out);
                    }

                    for &bone_index in &c.bones {
                        sort_bone(skeleton, bone_index, &mut sorted, &mut out);
                    }
                    out.push(UpdateCacheItem::Path(index));
                    for &bone_index in &c.bones {
                        sort_reset_children(skeleton, bone_index, &mut sorted);
                    }
                    for &bone_index in &c.bones {
                        if bone_index < sorted.len() {
                            sorted[bone_index] = true;
                        }
                    }
                    continue 'orders;
                }
            }

            for bone_index in 0..bone_count {
                sort_bone(skeleton, bone_index, &mut sorted, &mut out);
            }

            (out, reset)
        };

        self.update_cache = out;
        self.update_cache_reset = reset;
    }

    /// Switches the active skin.
    ///
    /// Attachments currently sourced from the old skin are re-pointed at
    /// the new skin's attachment with the same name, or detached when the
    /// new skin has no such name. When no skin was set, the new skin
    /// attaches each slot's setup attachment name. Rebuilds the cache.
    pub fn set_skin(&mut self, skin_name: Option<&str>) -> Result<(), crate::Error> {
        if self.skin.as_deref() == skin_name {
            return Ok(());
        }

        let old_skin = self.skin.take();
        match skin_name {
            None => {}
            Some(name) => {
                if self.data.skins.contains_key(name) {
                    self.skin = Some(name.to_string());
                } else {
                    self.skin = old_skin;
                    return Err(crate::Error::UnknownSkin {
                        name: name.to_string(),
                    });
                }
            }
        }

        let time = self.time;
        let new_skin_name = self.skin.clone();
        let new_skin = new_skin_name.as_deref().and_then(|n| self.data.skin(n));

        match old_skin.as_deref() {
            None => {
                if let Some(new_skin) = new_skin {
                    for (slot_index, slot) in self.slots.iter_mut().enumerate() {
                        let setup_name = self
                            .data
                            .slots
                            .get(slot_index)
                            .and_then(|s| s.attachment.as_deref());
                        let Some(setup_name) = setup_name else {
                            continue;
                        };
                        if new_skin.attachment(slot_index, setup_name).is_some() {
                            slot.set_attachment_key(
                                Some(setup_name.to_string()),
                                new_skin_name.clone(),
                                time,
                            );
                        }
                    }
                }
            }
            Some(old_skin_name) => {
                for (slot_index, slot) in self.slots.iter_mut().enumerate() {
                    if slot.attachment_skin.as_deref() != Some(old_skin_name) {
                        continue;
                    }
                    let Some(current_key) = slot.attachment.clone() else {
                        continue;
                    };
                    let kept = new_skin
                        .map(|s| s.attachment(slot_index, &current_key).is_some())
                        .unwrap_or(false);
                    if kept {
                        slot.set_attachment_key(Some(current_key), new_skin_name.clone(), time);
                    } else {
                        slot.set_attachment_key(None, None, time);
                    }
                }
            }
        }

        self.update_cache();
        Ok(())
    }

    pub fn set_to_setup_pose(&mut self) {
        self.set_bones_to_setup_pose();
        self.set_slots_to_setup_pose();
    }

    pub fn set_bones_to_setup_pose(&mut self) {
        for (i, bone) in self.bones.iter_mut().enumerate() {
            let Some(data) = self.data.bones.get(i) else {
                continue;
            };
            bone.transform_mode = data.transform_mode;
            bone.x = data.x;
            bone.y = data.y;
            bone.rotation = data.rotation;
            bone.scale_x = data.scale_x;
            bone.scale_y = data.scale_y;
            bone.shear_x = data.shear_x;
            bone.shear_y = data.shear_y;

            bone.ax = data.x;
            bone.ay = data.y;
            bone.arotation = data.rotation;
            bone.ascale_x = data.scale_x;
            bone.ascale_y = data.scale_y;
            bone.ashear_x = data.shear_x;
            bone.ashear_y = data.shear_y;
            bone.applied_valid = true;
        }

        for ik in &mut self.ik_constraints {
            if let Some(data) = self.data.ik_constraints.get(ik.data_index) {
                ik.mix = data.mix;
                ik.softness = data.softness;
                ik.compress = data.compress;
                ik.stretch = data.stretch;
                ik.uniform = data.uniform;
                ik.bend_direction = data.bend_direction;
            }
        }

        for c in &mut self.transform_constraints {
            if let Some(data) = self.data.transform_constraints.get(c.data_index) {
                c.rotate_mix = data.rotate_mix;
                c.translate_mix = data.translate_mix;
                c.scale_mix = data.scale_mix;
                c.shear_mix = data.shear_mix;
            }
        }

        for c in &mut self.path_constraints {
            if let Some(data) = self.data.path_constraints.get(c.data_index) {
                c.position = data.position;
                c.spacing = data.spacing;
                c.rotate_mix = data.rotate_mix;
                c.translate_mix = data.translate_mix;
            }
        }
    }

    pub fn set_slots_to_setup_pose(&mut self) {
        self.draw_order = (0..self.slots.len()).collect::<Vec<_>>();

        let time = self.time;
        let skin_name = self.skin.clone();
        let skin = skin_name.as_deref().and_then(|n| self.data.skin(n));
        let default_skin = if skin_name.as_deref() != Some("default") {
            self.data.skin("default")
        } else {
            None
        };

        for (i, slot) in self.slots.iter_mut().enumerate() {
            let Some(data) = self.data.slots.get(i) else {
                continue;
            };

            let resolved = data.attachment.as_deref().and_then(|name| {
                if skin.and_then(|s| s.attachment(i, name)).is_some() {
                    Some((name.to_string(), skin_name.clone()))
                } else if default_skin.and_then(|s| s.attachment(i, name)).is_some() {
                    Some((name.to_string(), Some("default".to_string())))
                } else {
                    None
                }
            });

            match resolved {
                Some((key, source_skin)) => {
                    slot.set_attachment_key(Some(key), source_skin, time);
                }
                None => slot.set_attachment_key(None, None, time),
            }

            slot.color = data.color;
            slot.has_dark = data.has_dark;
            slot.dark_color = data.dark_color;
            slot.blend = data.blend;
        }
    }

    /// Looks up an attachment by name in the active skin, falling back to
    /// the default skin.
    pub fn attachment(&self, slot_index: usize, attachment_name: &str) -> Option<&AttachmentData> {
        let skin_name = self.skin.as_deref();
        if let Some(skin_name) = skin_name {
            if let Some(skin) = self.data.skin(skin_name) {
                if let Some(att) = skin.attachment(slot_index, attachment_name) {
                    return Some(att);
                }
            }
            if skin_name != "default" {
                if let Some(default_skin) = self.data.skin("default") {
                    if let Some(att) = default_skin.attachment(slot_index, attachment_name) {
                        return Some(att);
                    }
                }
            }
        } else if let Some(default_skin) = self.data.skin("default") {
            if let Some(att) = default_skin.attachment(slot_index, attachment_name) {
                return Some(att);
            }
        }

        None
    }

    /// The attachment currently visible on a slot, if any.
    pub fn slot_attachment_data(&self, slot_index: usize) -> Option<&AttachmentData> {
        let slot = self.slots.get(slot_index)?;
        let key = slot.attachment.as_deref()?;

        if let Some(source_skin) = slot.attachment_skin.as_deref() {
            if let Some(skin) = self.data.skin(source_skin) {
                if let Some(att) = skin.attachment(slot_index, key) {
                    return Some(att);
                }
            }
        }

        self.attachment(slot_index, key)
    }

    /// Sets a slot's attachment by name. Unknown slot names and unknown
    /// attachment names are programmer errors and fail fast.
    pub fn set_attachment(
        &mut self,
        slot_name: &str,
        attachment_name: Option<&str>,
    ) -> Result<(), crate::Error> {
        let slot_index =
            self.find_slot(slot_name)
                .ok_or_else(|| crate::Error::UnknownSlot {
                    name: slot_name.to_string(),
                })?;

        let time = self.time;
        match attachment_name {
            None => {
                if let Some(slot) = self.slots.get_mut(slot_index) {
                    slot.set_attachment_key(None, None, time);
                }
                Ok(())
            }
            Some(name) => {
                let source_skin = self.attachment_source_skin(slot_index, name).ok_or_else(
                    || crate::Error::UnknownAttachment {
                        slot: slot_name.to_string(),
                        name: name.to_string(),
                    },
                )?;
                if let Some(slot) = self.slots.get_mut(slot_index) {
                    slot.set_attachment_key(Some(name.to_string()), source_skin, time);
                }
                Ok(())
            }
        }
    }

    /// Skin that resolves `attachment_name` for the slot: the active skin
    /// first, then the default skin. `None` when neither has it.
    fn attachment_source_skin(
        &self,
        slot_index: usize,
        attachment_name: &str,
    ) -> Option<Option<String>> {
        if let Some(skin_name) = self.skin.as_deref() {
            if let Some(skin) = self.data.skin(skin_name) {
                if skin.attachment(slot_index, attachment_name).is_some() {
                    return Some(Some(skin_name.to_string()));
                }
            }
        }
        if let Some(default_skin) = self.data.skin("default") {
            if default_skin
                .attachment(slot_index, attachment_name)
                .is_some()
            {
                return Some(Some("default".to_string()));
            }
        }
        None
    }

    /// Elapsed skeleton time since the slot's attachment was last set.
    pub fn slot_attachment_time(&self, slot_index: usize) -> f32 {
        self.slots
            .get(slot_index)
            .map(|s| self.time - s.attachment_time)
            .unwrap_or(0.0)
    }

    pub fn set_slot_attachment_time(&mut self, slot_index: usize, time: f32) {
        let now = self.time;
        if let Some(slot) = self.slots.get_mut(slot_index) {
            slot.attachment_time = now - time;
        }
    }

    /// Computes world transforms for the whole skeleton.
    ///
    /// Bones that constraints read before any cache entry computes them
    /// get their applied pose primed from the local pose first; then the
    /// cache is walked in dependency order.
    pub fn update_world_transform(&mut self) {
        self.prime_applied_from_local();

        let cache = std::mem::take(&mut self.update_cache);
        for item in cache.iter().copied() {
            match item {
                UpdateCacheItem::Bone(bone_index) => self.update_bone_world_transform(bone_index),
                UpdateCacheItem::Ik(index) => self.apply_ik_constraint(index),
                UpdateCacheItem::Transform(index) => self.apply_transform_constraint(index),
                UpdateCacheItem::Path(index) => {
                    self.apply_path_constraint(index);
                }
            }
        }
        self.update_cache = cache;
    }

    /// Variant for parenting this skeleton's root to a bone of another
    /// skeleton. Only the root bone composes with the external parent;
    /// everything else updates normally.
    pub fn update_world_transform_with_parent(&mut self, parent: &Bone) {
        self.prime_applied_from_local();

        let Some(root_index) = self.root_bone() else {
            return;
        };

        let (pa, pb, pc, pd) = (parent.a, parent.b, parent.c, parent.d);
        let (skel_x, skel_y) = (self.x, self.y);
        let sx = self.scale_x;
        let sy = self.effective_scale_y();
        {
            let root = &mut self.bones[root_index];
            root.world_x = pa * skel_x + pb * skel_y + parent.world_x;
            root.world_y = pc * skel_x + pd * skel_y + parent.world_y;

            let rotation_y = root.rotation + 90.0 + root.shear_y;
            let la = cos_deg(root.rotation + root.shear_x) * root.scale_x;
            let lb = cos_deg(rotation_y) * root.scale_y;
            let lc = sin_deg(root.rotation + root.shear_x) * root.scale_x;
            let ld = sin_deg(rotation_y) * root.scale_y;
            root.a = (pa * la + pb * lc) * sx;
            root.b = (pa * lb + pb * ld) * sx;
            root.c = (pc * la + pd * lc) * sy;
            root.d = (pc * lb + pd * ld) * sy;
            // The matrix did not come from the local pose alone.
            root.applied_valid = false;
        }

        let cache = std::mem::take(&mut self.update_cache);
        for item in cache.iter().copied() {
            match item {
                UpdateCacheItem::Bone(bone_index) if bone_index == root_index => {}
                UpdateCacheItem::Bone(bone_index) => self.update_bone_world_transform(bone_index),
                UpdateCacheItem::Ik(index) => self.apply_ik_constraint(index),
                UpdateCacheItem::Transform(index) => self.apply_transform_constraint(index),
                UpdateCacheItem::Path(index) => {
                    self.apply_path_constraint(index);
                }
            }
        }
        self.update_cache = cache;
    }

    fn prime_applied_from_local(&mut self) {
        let reset = std::mem::take(&mut self.update_cache_reset);
        for &bone_index in &reset {
            if let Some(bone) = self.bones.get_mut(bone_index) {
                bone.ax = bone.x;
                bone.ay = bone.y;
                bone.arotation = bone.rotation;
                bone.ascale_x = bone.scale_x;
                bone.ascale_y = bone.scale_y;
                bone.ashear_x = bone.shear_x;
                bone.ashear_y = bone.shear_y;
                bone.applied_valid = true;
            }
        }
        self.update_cache_reset = reset;
    }

    fn update_bone_world_transform(&mut self, bone_index: usize) {
        if bone_index >= self.bones.len() {
            return;
        }
        if !self.bones[bone_index].active {
            return;
        }
        let (x, y, rotation, scale_x, scale_y, shear_x, shear_y) = {
            let b = &self.bones[bone_index];
            (b.x, b.y, b.rotation, b.scale_x, b.scale_y, b.shear_x, b.shear_y)
        };
        self.compose_bone_world_transform(
            bone_index, x, y, rotation, scale_x, scale_y, shear_x, shear_y,
        );
    }

    /// Recomposes a bone's world matrix from an explicit pose against the
    /// parent's current world matrix, recording the pose as applied.
    #[allow(clippy::too_many_arguments)]
    fn compose_bone_world_transform(
        &mut self,
        bone_index: usize,
        x: f32,
        y: f32,
        rotation: f32,
        scale_x: f32,
        scale_y: f32,
        shear_x: f32,
        shear_y: f32,
    ) {
        if bone_index >= self.bones.len() {
            return;
        }
        let parent = match self.bones[bone_index].parent {
            Some(parent_index) => {
                let Some(p) = self.bones.get(parent_index) else {
                    return;
                };
                if !p.active {
                    return;
                }
                Some(ParentTransform {
                    a: p.a,
                    b: p.b,
                    c: p.c,
                    d: p.d,
                    world_x: p.world_x,
                    world_y: p.world_y,
                })
            }
            None => None,
        };
        let (skel_x, skel_y) = (self.x, self.y);
        let sx = self.scale_x;
        let sy = self.effective_scale_y();
        compose_world_transform(
            &mut self.bones[bone_index],
            x,
            y,
            rotation,
            scale_x,
            scale_y,
            shear_x,
            shear_y,
            parent.as_ref(),
            skel_x,
            skel_y,
            sx,
            sy,
        );
    }

    fn apply_ik_constraint(&mut self, constraint_index: usize) {
        let Some(ik) = self.ik_constraints.get(constraint_index).cloned() else {
            return;
        };
        let Some(target) = self.bones.get(ik.target) else {
            return;
        };
        let target_x = target.world_x;
        let target_y = target.world_y;

        match ik.bones.as_slice() {
            [bone] => {
                self.apply_ik_one(
                    *bone,
                    target_x,
                    target_y,
                    ik.compress,
                    ik.stretch,
                    ik.uniform,
                    ik.mix,
                );
            }
            [parent, child] => {
                self.apply_ik_two(
                    *parent,
                    *child,
                    target_x,
                    target_y,
                    ik.bend_direction,
                    ik.softness,
                    ik.stretch,
                    ik.uniform,
                    ik.mix,
                );
            }
            _ => {}
        }
    }

    /// Rotates a bone so its X axis points at the target, with optional
    /// compress/stretch along the bone length.
    #[allow(clippy::too_many_arguments)]
    fn apply_ik_one(
        &mut self,
        bone_index: usize,
        target_x: f32,
        target_y: f32,
        compress: bool,
        stretch: bool,
        uniform: bool,
        alpha: f32,
    ) {
        if bone_index >= self.bones.len() {
            return;
        }
        if !self.bones[bone_index].applied_valid {
            self.update_applied_transform(bone_index);
        }
        let Some(parent_index) = self.bones[bone_index].parent else {
            return;
        };
        if parent_index >= self.bones.len() {
            return;
        }

        let (pa, mut pb, pc, mut pd, pwx, pwy) = {
            let p = &self.bones[parent_index];
            (p.a, p.b, p.c, p.d, p.world_x, p.world_y)
        };

        let (mode, world_x, world_y, ax, ay, arotation, mut sx, mut sy, ashear_x, ashear_y) = {
            let b = &self.bones[bone_index];
            (
                b.transform_mode,
                b.world_x,
                b.world_y,
                b.ax,
                b.ay,
                b.arotation,
                b.ascale_x,
                b.ascale_y,
                b.ashear_x,
                b.ashear_y,
            )
        };

        let mut rotation_ik = -ashear_x - arotation;
        let (mut tx, mut ty) = match mode {
            TransformMode::OnlyTranslation => (target_x - world_x, target_y - world_y),
            TransformMode::NoRotationOrReflection => {
                let denom = (pa * pa + pc * pc).max(EPSILON);
                let s = (pa * pd - pb * pc).abs() / denom;
                let skel_sx = self.scale_x;
                let skel_sy = self.effective_scale_y();
                let sa = pa / skel_sx;
                let sc = pc / skel_sy;
                pb = -sc * s * skel_sx;
                pd = sa * s * skel_sy;
                rotation_ik += sc.atan2(sa).to_degrees();

                let x = target_x - pwx;
                let y = target_y - pwy;
                let det = pa * pd - pb * pc;
                if det.abs() <= EPSILON {
                    (0.0, 0.0)
                } else {
                    ((x * pd - y * pb) / det - ax, (y * pa - x * pc) / det - ay)
                }
            }
            _ => {
                let x = target_x - pwx;
                let y = target_y - pwy;
                let det = pa * pd - pb * pc;
                if det.abs() <= EPSILON {
                    (0.0, 0.0)
                } else {
                    ((x * pd - y * pb) / det - ax, (y * pa - x * pc) / det - ay)
                }
            }
        };

        rotation_ik += ty.atan2(tx).to_degrees();
        if sx < 0.0 {
            rotation_ik += 180.0;
        }
        rotation_ik = shortest_rotation(rotation_ik);

        if compress || stretch {
            if matches!(
                mode,
                TransformMode::NoScale | TransformMode::NoScaleOrReflection
            ) {
                tx = target_x - world_x;
                ty = target_y - world_y;
            }
            let length = self
                .data
                .bones
                .get(bone_index)
                .map(|d| d.length)
                .unwrap_or(0.0);
            let b = length * sx;
            if b > EPSILON {
                let dd = tx * tx + ty * ty;
                if (compress && dd < b * b) || (stretch && dd > b * b) {
                    let s = (dd.sqrt() / b - 1.0) * alpha + 1.0;
                    sx *= s;
                    if uniform {
                        sy *= s;
                    }
                }
            }
        }

        self.compose_bone_world_transform(
            bone_index,
            ax,
            ay,
            arotation + rotation_ik * alpha,
            sx,
            sy,
            ashear_x,
            ashear_y,
        );
    }

    /// Two-bone IK: solves the parent and child rotations so the child's
    /// tip reaches the target, honoring bend direction, softness, and
    /// stretch.
    #[allow(clippy::too_many_arguments)]
    fn apply_ik_two(
        &mut self,
        parent_index: usize,
        child_index: usize,
        target_x: f32,
        target_y: f32,
        bend_direction: i32,
        softness: f32,
        stretch: bool,
        uniform: bool,
        alpha: f32,
    ) {
        const PI: f32 = std::f32::consts::PI;
        const RAD_DEG: f32 = 180.0 / PI;

        if parent_index >= self.bones.len() || child_index >= self.bones.len() {
            return;
        }
        if alpha == 0.0 {
            // The chain tip is not otherwise in the cache; keep its world
            // matrix current.
            self.update_bone_world_transform(child_index);
            return;
        }
        if self.bones[parent_index].transform_mode != TransformMode::Normal
            || self.bones[child_index].transform_mode != TransformMode::Normal
        {
            return;
        }
        if !self.bones[parent_index].applied_valid {
            self.update_applied_transform(parent_index);
        }
        if !self.bones[child_index].applied_valid {
            self.update_applied_transform(child_index);
        }

        let Some(pp_index) = self.bones[parent_index].parent else {
            return;
        };
        if pp_index >= self.bones.len() {
            return;
        }

        let (px, py, parent_rotation, psx0, psy0) = {
            let p = &self.bones[parent_index];
            (p.ax, p.ay, p.arotation, p.ascale_x, p.ascale_y)
        };
        let mut sx = psx0;
        let mut sy = psy0;

        let mut psx = psx0;
        let mut psy = psy0;
        let mut os1 = 0.0f32;
        let mut s2 = 1.0f32;
        if psx < 0.0 {
            psx = -psx;
            os1 = 180.0;
            s2 = -1.0;
        }
        if psy < 0.0 {
            psy = -psy;
            s2 = -s2;
        }

        let (cx, child_ay, child_rotation, csx0, csy0, child_shear_x, child_shear_y) = {
            let c = &self.bones[child_index];
            (
                c.ax,
                c.ay,
                c.arotation,
                c.ascale_x,
                c.ascale_y,
                c.ashear_x,
                c.ashear_y,
            )
        };
        let mut csx = csx0;
        let mut os2 = 0.0f32;
        if csx < 0.0 {
            csx = -csx;
            os2 = 180.0;
        }

        let (pa, pb, pc, pd, pwx, pwy) = {
            let p = &self.bones[parent_index];
            (p.a, p.b, p.c, p.d, p.world_x, p.world_y)
        };

        let u = (psx - psy).abs() <= EPSILON;
        let (cy, cwx, cwy) = if !u {
            (0.0f32, pa * cx + pwx, pc * cx + pwy)
        } else {
            (
                child_ay,
                pa * cx + pb * child_ay + pwx,
                pc * cx + pd * child_ay + pwy,
            )
        };

        let (pp_a, pp_b, pp_c, pp_d, pp_wx, pp_wy) = {
            let pp = &self.bones[pp_index];
            (pp.a, pp.b, pp.c, pp.d, pp.world_x, pp.world_y)
        };

        let mut id = pp_a * pp_d - pp_b * pp_c;
        let x = cwx - pp_wx;
        let y = cwy - pp_wy;
        id = if id.abs() <= EPSILON { 0.0 } else { 1.0 / id };
        let dx = (x * pp_d - y * pp_b) * id - px;
        let dy = (y * pp_a - x * pp_c) * id - py;

        let l1 = (dx * dx + dy * dy).sqrt();
        if l1 < EPSILON {
            self.apply_ik_one(parent_index, target_x, target_y, false, stretch, false, alpha);
            self.compose_bone_world_transform(
                child_index,
                cx,
                cy,
                0.0,
                csx0,
                csy0,
                child_shear_x,
                child_shear_y,
            );
            return;
        }

        let l2 = self
            .data
            .bones
            .get(child_index)
            .map(|d| d.length)
            .unwrap_or(0.0)
            * csx;

        let x = target_x - pp_wx;
        let y = target_y - pp_wy;
        let mut tx = (x * pp_d - y * pp_b) * id - px;
        let mut ty = (y * pp_a - x * pp_c) * id - py;
        let mut dd = tx * tx + ty * ty;

        if softness != 0.0 {
            let softness = softness.max(0.0) * psx * (csx + 1.0) * 0.5;
            let td = dd.sqrt();
            let sd = td - l1 - l2 * psx + softness;
            if sd > 0.0 {
                let mut p = (sd / (softness * 2.0)).min(1.0) - 1.0;
                p = (sd - softness * (1.0 - p * p)) / td.max(EPSILON);
                tx -= p * tx;
                ty -= p * ty;
                dd = tx * tx + ty * ty;
            }
        }

        let bend_dir = if bend_direction >= 0 { 1.0 } else { -1.0 };
        let (mut a1, mut a2);

        if u {
            let l2u = l2 * psx;
            let mut cos = (dd - l1 * l1 - l2u * l2u) / (2.0 * l1 * l2u);
            if cos < -1.0 {
                cos = -1.0;
                a2 = PI * bend_dir;
            } else if cos > 1.0 {
                cos = 1.0;
                a2 = 0.0;
                if stretch {
                    let s = (dd.sqrt() / (l1 + l2u) - 1.0) * alpha + 1.0;
                    sx *= s;
                    if uniform {
                        sy *= s;
                    }
                }
            } else {
                a2 = cos.acos() * bend_dir;
            }
            let aa = l1 + l2u * cos;
            let bb = l2u * a2.sin();
            a1 = (ty * aa - tx * bb).atan2(tx * aa + ty * bb);
        } else {
            let a = psx * l2;
            let b = psy * l2;
            let aa = a * a;
            let bb = b * b;
            let ta = ty.atan2(tx);
            let mut c = bb * l1 * l1 + aa * dd - aa * bb;
            let c1 = -2.0 * bb * l1;
            let c2 = bb - aa;
            let disc = c1 * c1 - 4.0 * c2 * c;

            if disc >= 0.0 {
                let mut q = disc.sqrt();
                if c1 < 0.0 {
                    q = -q;
                }
                q = -(c1 + q) * 0.5;
                let r0 = q / c2;
                let r1 = c / q;
                let r = if r0.abs() < r1.abs() { r0 } else { r1 };
                let r0 = dd - r * r;
                if r0 >= 0.0 {
                    let y = r0.sqrt() * bend_dir;
                    a1 = ta - y.atan2(r);
                    a2 = (y / psy).atan2((r - l1) / psx);
                } else {
                    a1 = 0.0;
                    a2 = 0.0;
                }
            } else {
                a1 = 0.0;
                a2 = 0.0;
            }

            if disc < 0.0 {
                let mut min_angle = PI;
                let mut min_x = l1 - a;
                let mut min_dist = min_x * min_x;
                let mut min_y = 0.0f32;
                let mut max_angle = 0.0f32;
                let mut max_x = l1 + a;
                let mut max_dist = max_x * max_x;
                let mut max_y = 0.0f32;
                c = -a * l1 / (aa - bb);
                if (-1.0..=1.0).contains(&c) {
                    let c = c.acos();
                    let x = a * c.cos() + l1;
                    let y = b * c.sin();
                    let d = x * x + y * y;
                    if d < min_dist {
                        min_angle = c;
                        min_dist = d;
                        min_x = x;
                        min_y = y;
                    }
                    if d > max_dist {
                        max_angle = c;
                        max_dist = d;
                        max_x = x;
                        max_y = y;
                    }
                }
                if dd <= (min_dist + max_dist) * 0.5 {
                    a1 = ta - (min_y * bend_dir).atan2(min_x);
                    a2 = min_angle * bend_dir;
                } else {
                    a1 = ta - (max_y * bend_dir).atan2(max_x);
                    a2 = max_angle * bend_dir;
                }
            }
        }

        let os = cy.atan2(cx) * s2;

        a1 = (a1 - os) * RAD_DEG + os1 - parent_rotation;
        if a1 > 180.0 {
            a1 -= 360.0;
        } else if a1 < -180.0 {
            a1 += 360.0;
        }

        a2 = ((a2 + os) * RAD_DEG - child_shear_x) * s2 + os2 - child_rotation;
        if a2 > 180.0 {
            a2 -= 360.0;
        } else if a2 < -180.0 {
            a2 += 360.0;
        }

        self.compose_bone_world_transform(
            parent_index,
            px,
            py,
            parent_rotation + a1 * alpha,
            sx,
            sy,
            0.0,
            0.0,
        );
        self.compose_bone_world_transform(
            child_index,
            cx,
            cy,
            child_rotation + a2 * alpha,
            csx0,
            csy0,
            child_shear_x,
            child_shear_y,
        );
    }

    fn apply_transform_constraint(&mut self, constraint_index: usize) {
        let Some(c) = self.transform_constraints.get(constraint_index).cloned() else {
            return;
        };
        if c.rotate_mix == 0.0
            && c.translate_mix == 0.0
            && c.scale_mix == 0.0
            && c.shear_mix == 0.0
        {
            return;
        }

        let (local, relative, offsets) = {
            let Some(data) = self.data.transform_constraints.get(c.data_index) else {
                return;
            };
            (
                data.local,
                data.relative,
                TransformOffsets {
                    rotation: data.offset_rotation,
                    x: data.offset_x,
                    y: data.offset_y,
                    scale_x: data.offset_scale_x,
                    scale_y: data.offset_scale_y,
                    shear_y: data.offset_shear_y,
                },
            )
        };

        match (local, relative) {
            (false, false) => self.apply_transform_absolute_world(&c, &offsets),
            (false, true) => self.apply_transform_relative_world(&c, &offsets),
            (true, false) => self.apply_transform_absolute_local(&c, &offsets),
            (true, true) => self.apply_transform_relative_local(&c, &offsets),
        }
    }

    fn apply_transform_absolute_world(&mut self, c: &TransformConstraint, offsets: &TransformOffsets) {
        let Some(target) = self.bones.get(c.target) else {
            return;
        };
        let (ta, tb, tc, td) = (target.a, target.b, target.c, target.d);
        let reflect = if ta * td - tb * tc > 0.0 { 1.0 } else { -1.0 };
        let offset_rotation = offsets.rotation.to_radians() * reflect;
        let offset_shear_y = offsets.shear_y.to_radians() * reflect;
        let [ox, oy] = target.local_to_world(offsets.x, offsets.y);

        for &bone_index in &c.bones {
            if bone_index >= self.bones.len() {
                continue;
            }
            if !self.bones[bone_index].active {
                continue;
            }
            let bone = &mut self.bones[bone_index];
            let mut modified = false;

            if c.rotate_mix != 0.0 {
                let (a, b, c0, d) = (bone.a, bone.b, bone.c, bone.d);
                let mut r = tc.atan2(ta) - c0.atan2(a) + offset_rotation;
                r = wrap_pi(r) * c.rotate_mix;
                let cos = r.cos();
                let sin = r.sin();
                bone.a = cos * a - sin * c0;
                bone.b = cos * b - sin * d;
                bone.c = sin * a + cos * c0;
                bone.d = sin * b + cos * d;
                modified = true;
            }

            if c.translate_mix != 0.0 {
                bone.world_x += (ox - bone.world_x) * c.translate_mix;
                bone.world_y += (oy - bone.world_y) * c.translate_mix;
                modified = true;
            }

            if c.scale_mix > 0.0 {
                let mut s = (bone.a * bone.a + bone.c * bone.c).sqrt();
                if s != 0.0 {
                    let ts = (ta * ta + tc * tc).sqrt();
                    s = (s + (ts - s + offsets.scale_x) * c.scale_mix) / s;
                }
                bone.a *= s;
                bone.c *= s;
                let mut s = (bone.b * bone.b + bone.d * bone.d).sqrt();
                if s != 0.0 {
                    let ts = (tb * tb + td * td).sqrt();
                    s = (s + (ts - s + offsets.scale_y) * c.scale_mix) / s;
                }
                bone.b *= s;
                bone.d *= s;
                modified = true;
            }

            if c.shear_mix > 0.0 {
                let (b, d) = (bone.b, bone.d);
                let by = d.atan2(b);
                let mut r = td.atan2(tb) - tc.atan2(ta) - (by - bone.c.atan2(bone.a));
                r = wrap_pi(r);
                let r = by + (r + offset_shear_y) * c.shear_mix;
                let s = (b * b + d * d).sqrt();
                bone.b = r.cos() * s;
                bone.d = r.sin() * s;
                modified = true;
            }

            if modified {
                bone.applied_valid = false;
            }
        }
    }

    fn apply_transform_relative_world(&mut self, c: &TransformConstraint, offsets: &TransformOffsets) {
        let Some(target) = self.bones.get(c.target) else {
            return;
        };
        let (ta, tb, tc, td) = (target.a, target.b, target.c, target.d);
        let reflect = if ta * td - tb * tc > 0.0 { 1.0 } else { -1.0 };
        let offset_rotation = offsets.rotation.to_radians() * reflect;
        let offset_shear_y = offsets.shear_y.to_radians() * reflect;
        let [ox, oy] = target.local_to_world(offsets.x, offsets.y);

        for &bone_index in &c.bones {
            if bone_index >= self.bones.len() {
                continue;
            }
            if !self.bones[bone_index].active {
                continue;
            }
            let bone = &mut self.bones[bone_index];
            let mut modified = false;

            if c.rotate_mix != 0.0 {
                let (a, b, c0, d) = (bone.a, bone.b, bone.c, bone.d);
                let mut r = tc.atan2(ta) + offset_rotation;
                r = wrap_pi(r) * c.rotate_mix;
                let cos = r.cos();
                let sin = r.sin();
                bone.a = cos * a - sin * c0;
                bone.b = cos * b - sin * d;
                bone.c = sin * a + cos * c0;
                bone.d = sin * b + cos * d;
                modified = true;
            }

            if c.translate_mix != 0.0 {
                bone.world_x += ox * c.translate_mix;
                bone.world_y += oy * c.translate_mix;
                modified = true;
            }

            if c.scale_mix > 0.0 {
                let s = ((ta * ta + tc * tc).sqrt() - 1.0 + offsets.scale_x) * c.scale_mix + 1.0;
                bone.a *= s;
                bone.c *= s;
                let s = ((tb * tb + td * td).sqrt() - 1.0 + offsets.scale_y) * c.scale_mix + 1.0;
                bone.b *= s;
                bone.d *= s;
                modified = true;
            }

            if c.shear_mix > 0.0 {
                let mut r = td.atan2(tb) - tc.atan2(ta);
                r = wrap_pi(r);
                let (b, d) = (bone.b, bone.d);
                let r = d.atan2(b) + (r - std::f32::consts::FRAC_PI_2 + offset_shear_y) * c.shear_mix;
                let s = (b * b + d * d).sqrt();
                bone.b = r.cos() * s;
                bone.d = r.sin() * s;
                modified = true;
            }

            if modified {
                bone.applied_valid = false;
            }
        }
    }

    fn apply_transform_absolute_local(&mut self, c: &TransformConstraint, offsets: &TransformOffsets) {
        if c.target >= self.bones.len() {
            return;
        }
        if !self.bones[c.target].applied_valid {
            self.update_applied_transform(c.target);
        }
        let (tax, tay, tarotation, tascale_x, tascale_y, tashear_y) = {
            let t = &self.bones[c.target];
            (t.ax, t.ay, t.arotation, t.ascale_x, t.ascale_y, t.ashear_y)
        };

        for &bone_index in &c.bones {
            if bone_index >= self.bones.len() {
                continue;
            }
            if !self.bones[bone_index].active {
                continue;
            }
            if !self.bones[bone_index].applied_valid {
                self.update_applied_transform(bone_index);
            }

            let (ax, ay, arotation, ascale_x, ascale_y, ashear_x, ashear_y) = {
                let b = &self.bones[bone_index];
                (b.ax, b.ay, b.arotation, b.ascale_x, b.ascale_y, b.ashear_x, b.ashear_y)
            };

            let mut rotation = arotation;
            if c.rotate_mix != 0.0 {
                let r = wrap_deg(tarotation - rotation + offsets.rotation);
                rotation += r * c.rotate_mix;
            }

            let mut x = ax;
            let mut y = ay;
            if c.translate_mix != 0.0 {
                x += (tax - x + offsets.x) * c.translate_mix;
                y += (tay - y + offsets.y) * c.translate_mix;
            }

            let mut scale_x = ascale_x;
            let mut scale_y = ascale_y;
            if c.scale_mix != 0.0 {
                if scale_x.abs() > EPSILON {
                    scale_x =
                        (scale_x + (tascale_x - scale_x + offsets.scale_x) * c.scale_mix) / scale_x;
                }
                if scale_y.abs() > EPSILON {
                    scale_y =
                        (scale_y + (tascale_y - scale_y + offsets.scale_y) * c.scale_mix) / scale_y;
                }
            }

            let mut shear_y = ashear_y;
            if c.shear_mix != 0.0 {
                let r = wrap_deg(tashear_y - shear_y + offsets.shear_y);
                shear_y += r * c.shear_mix;
            }

            self.compose_bone_world_transform(
                bone_index, x, y, rotation, scale_x, scale_y, ashear_x, shear_y,
            );
        }
    }

    fn apply_transform_relative_local(&mut self, c: &TransformConstraint, offsets: &TransformOffsets) {
        if c.target >= self.bones.len() {
            return;
        }
        if !self.bones[c.target].applied_valid {
            self.update_applied_transform(c.target);
        }
        let (tax, tay, tarotation, tascale_x, tascale_y, tashear_y) = {
            let t = &self.bones[c.target];
            (t.ax, t.ay, t.arotation, t.ascale_x, t.ascale_y, t.ashear_y)
        };

        for &bone_index in &c.bones {
            if bone_index >= self.bones.len() {
                continue;
            }
            if !self.bones[bone_index].active {
                continue;
            }
            if !self.bones[bone_index].applied_valid {
                self.update_applied_transform(bone_index);
            }

            let (ax, ay, arotation, ascale_x, ascale_y, ashear_x, ashear_y) = {
                let b = &self.bones[bone_index];
                (b.ax, b.ay, b.arotation, b.ascale_x, b.ascale_y, b.ashear_x, b.ashear_y)
            };

            let rotation = arotation + (tarotation + offsets.rotation) * c.rotate_mix;
            let x = ax + (tax + offsets.x) * c.translate_mix;
            let y = ay + (tay + offsets.y) * c.translate_mix;
            let scale_x = ascale_x * (((tascale_x - 1.0 + offsets.scale_x) * c.scale_mix) + 1.0);
            let scale_y = ascale_y * (((tascale_y - 1.0 + offsets.scale_y) * c.scale_mix) + 1.0);
            let shear_y = ashear_y + (tashear_y + offsets.shear_y) * c.shear_mix;

            self.compose_bone_world_transform(
                bone_index, x, y, rotation, scale_x, scale_y, ashear_x, shear_y,
            );
        }
    }

    fn apply_path_constraint(&mut self, constraint_index: usize) -> bool {
        if constraint_index >= self.path_constraints.len()
            || constraint_index >= self.path_constraint_scratch.len()
        {
            return false;
        }

        let (data_index, target, position, spacing, rotate_mix, translate_mix, bone_count) = {
            let c = &self.path_constraints[constraint_index];
            (
                c.data_index,
                c.target,
                c.position,
                c.spacing,
                c.rotate_mix,
                c.translate_mix,
                c.bones.len(),
            )
        };
        if rotate_mix == 0.0 && translate_mix == 0.0 {
            return false;
        }
        if bone_count == 0 {
            return false;
        }

        let (position_mode, spacing_mode, rotate_mode, data_offset_rotation) = {
            let Some(data) = self.data.path_constraints.get(data_index) else {
                return false;
            };
            (
                data.position_mode,
                data.spacing_mode,
                data.rotate_mode,
                data.offset_rotation,
            )
        };

        let tangents = rotate_mode == RotateMode::Tangent;
        let scale = rotate_mode == RotateMode::ChainScale;
        let length_spacing = spacing_mode == SpacingMode::Length;
        let spaces_count = if tangents { bone_count } else { bone_count + 1 };

        let bones = std::mem::take(&mut self.path_constraints[constraint_index].bones);
        let mut scratch = std::mem::take(&mut self.path_constraint_scratch[constraint_index]);

        let applied = 'applied: {
            let Some((target_slot_index, path)) = path_attachment_for_slot(self, target) else {
                break 'applied false;
            };

            scratch.spaces.resize(spaces_count, 0.0);
            scratch.spaces.fill(0.0);
            scratch.lengths.clear();
            if scale {
                scratch.lengths.resize(bone_count, 0.0);
            }
            let spaces = scratch.spaces.as_mut_slice();
            let lengths = scratch.lengths.as_mut_slice();

            if scale || length_spacing {
                let mut i = 0usize;
                let n = spaces_count.saturating_sub(1);
                while i < n {
                    let Some(bone_index) = bones.get(i).copied() else {
                        i += 1;
                        continue;
                    };
                    let setup_length = self
                        .data
                        .bones
                        .get(bone_index)
                        .map(|b| b.length)
                        .unwrap_or(0.0);
                    if setup_length < EPSILON {
                        if scale {
                            if let Some(out) = lengths.get_mut(i) {
                                *out = 0.0;
                            }
                        }
                        i += 1;
                        spaces[i] = 0.0;
                        continue;
                    }
                    let Some(bone) = self.bones.get(bone_index) else {
                        i += 1;
                        continue;
                    };
                    let x = setup_length * bone.a;
                    let y = setup_length * bone.c;
                    let length = (x * x + y * y).sqrt();
                    if scale {
                        if let Some(out) = lengths.get_mut(i) {
                            *out = length;
                        }
                    }
                    i += 1;
                    spaces[i] = (if length_spacing {
                        setup_length + spacing
                    } else {
                        spacing
                    }) * length
                        / setup_length;
                }
            } else {
                for space in spaces.iter_mut().take(spaces_count).skip(1) {
                    *space = spacing;
                }
            }

            let positions = compute_path_world_positions(
                self,
                &mut scratch.positions,
                &mut scratch.world,
                &mut scratch.curves,
                target_slot_index,
                path,
                position_mode == PositionMode::Percent,
                spacing_mode == SpacingMode::Percent,
                spaces_count,
                tangents,
                spaces,
                position,
            );
            if positions.len() < 2 {
                break 'applied false;
            }

            let mut bone_x = positions[0];
            let mut bone_y = positions[1];
            let mut offset_rotation = data_offset_rotation;
            let tip = if offset_rotation == 0.0 {
                rotate_mode == RotateMode::Chain
            } else {
                let deg_rad_reflect = {
                    let Some(target_slot) = self.slots.get(target_slot_index) else {
                        break 'applied false;
                    };
                    let Some(parent) = self.bones.get(target_slot.bone) else {
                        break 'applied false;
                    };
                    if parent.a * parent.d - parent.b * parent.c > 0.0 {
                        std::f32::consts::PI / 180.0
                    } else {
                        -std::f32::consts::PI / 180.0
                    }
                };
                offset_rotation *= deg_rad_reflect;
                false
            };

            let mut applied = false;
            let mut p = 3usize;
            for i in 0..bone_count {
                let Some(&bone_index) = bones.get(i) else {
                    p = p.saturating_add(3);
                    continue;
                };
                if bone_index >= self.bones.len() {
                    p = p.saturating_add(3);
                    continue;
                }

                {
                    let bone = &mut self.bones[bone_index];
                    bone.world_x += (bone_x - bone.world_x) * translate_mix;
                    bone.world_y += (bone_y - bone.world_y) * translate_mix;
                }

                let x = *positions.get(p).unwrap_or(&bone_x);
                let y = *positions.get(p + 1).unwrap_or(&bone_y);
                let dx = x - bone_x;
                let dy = y - bone_y;

                if scale {
                    let length = *lengths.get(i).unwrap_or(&0.0);
                    if length >= EPSILON {
                        let s = (((dx * dx + dy * dy).sqrt() / length) - 1.0) * rotate_mix + 1.0;
                        let bone = &mut self.bones[bone_index];
                        bone.a *= s;
                        bone.c *= s;
                    }
                }

                bone_x = x;
                bone_y = y;

                if rotate_mix > 0.0 {
                    let (a, b, c0, d) = {
                        let bone = &self.bones[bone_index];
                        (bone.a, bone.b, bone.c, bone.d)
                    };
                    let mut r = if tangents {
                        *positions.get(p - 1).unwrap_or(&0.0)
                    } else if *spaces.get(i + 1).unwrap_or(&0.0) < PATH_EPSILON {
                        *positions.get(p + 2).unwrap_or(&0.0)
                    } else {
                        dy.atan2(dx)
                    };
                    r -= c0.atan2(a);
                    if tip {
                        let cos = r.cos();
                        let sin = r.sin();
                        let length = self
                            .data
                            .bones
                            .get(bone_index)
                            .map(|b| b.length)
                            .unwrap_or(0.0);
                        bone_x += (length * (cos * a - sin * c0) - dx) * rotate_mix;
                        bone_y += (length * (sin * a + cos * c0) - dy) * rotate_mix;
                    } else {
                        r += offset_rotation;
                    }

                    r = wrap_pi(r) * rotate_mix;
                    let cos = r.cos();
                    let sin = r.sin();
                    let bone = &mut self.bones[bone_index];
                    bone.a = cos * a - sin * c0;
                    bone.b = cos * b - sin * d;
                    bone.c = sin * a + cos * c0;
                    bone.d = sin * b + cos * d;
                }

                self.bones[bone_index].applied_valid = false;
                applied = true;
                p += 3;
            }

            applied
        };

        self.path_constraint_scratch[constraint_index] = scratch;
        self.path_constraints[constraint_index].bones = bones;
        applied
    }

    /// Back-derives the applied local pose from the world matrix, inverting
    /// the parent's matrix. A near-singular parent yields a degenerate
    /// (zeroed) translation rather than dividing by zero.
    pub fn update_applied_transform(&mut self, bone_index: usize) {
        if bone_index >= self.bones.len() {
            return;
        }

        let parent_index = self.bones[bone_index].parent;
        let Some(parent_index) = parent_index else {
            let (skel_x, skel_y) = (self.x, self.y);
            let bone = &mut self.bones[bone_index];
            let (a, b, c0, d) = (bone.a, bone.b, bone.c, bone.d);
            bone.ax = bone.world_x - skel_x;
            bone.ay = bone.world_y - skel_y;
            bone.arotation = c0.atan2(a).to_degrees();
            bone.ascale_x = (a * a + c0 * c0).sqrt();
            bone.ascale_y = (b * b + d * d).sqrt();
            bone.ashear_x = 0.0;
            bone.ashear_y = -(a * b + c0 * d).atan2(a * d - b * c0).to_degrees();
            bone.applied_valid = true;
            return;
        };

        let (pa, pb, pc, pd, pwx, pwy) = {
            let Some(p) = self.bones.get(parent_index) else {
                return;
            };
            (p.a, p.b, p.c, p.d, p.world_x, p.world_y)
        };
        let det = pa * pd - pb * pc;
        let pid = if det.abs() > EPSILON { 1.0 / det } else { 0.0 };
        let ia = pd * pid;
        let ib = pb * pid;
        let ic = pc * pid;
        let id = pa * pid;

        let bone = &mut self.bones[bone_index];
        let (a, b, c0, d) = (bone.a, bone.b, bone.c, bone.d);
        let dx = bone.world_x - pwx;
        let dy = bone.world_y - pwy;
        bone.ax = dx * ia - dy * ib;
        bone.ay = dy * id - dx * ic;

        let ra = ia * a - ib * c0;
        let rb = ia * b - ib * d;
        let rc = id * c0 - ic * a;
        let rd = id * d - ic * b;

        bone.ashear_x = 0.0;
        bone.ascale_x = (ra * ra + rc * rc).sqrt();
        if bone.ascale_x > EPSILON {
            let det2 = ra * rd - rb * rc;
            bone.ascale_y = det2 / bone.ascale_x;
            bone.ashear_y = -(ra * rb + rc * rd).atan2(det2).to_degrees();
            bone.arotation = rc.atan2(ra).to_degrees();
        } else {
            bone.ascale_x = 0.0;
            bone.ascale_y = (rb * rb + rd * rd).sqrt();
            bone.ashear_y = 0.0;
            bone.arotation = 90.0 - rd.atan2(rb).to_degrees();
        }
        bone.applied_valid = true;
    }

    /// World vertices for the slot's current attachment, for the rendering
    /// collaborator. Region attachments yield their four corners; vertex
    /// attachments yield one point per vertex. Point attachments have no
    /// vertex list.
    pub fn slot_world_vertices(&self, slot_index: usize) -> Option<Vec<f32>> {
        let attachment = self.slot_attachment_data(slot_index)?;

        if let AttachmentData::Region(region) = attachment {
            let slot = self.slots.get(slot_index)?;
            let bone = self.bones.get(slot.bone)?;
            let mut out = vec![0.0f32; 8];
            region.compute_world_vertices(bone, &mut out, 0, 2);
            return Some(out);
        }

        let vertices = attachment.vertices()?;
        let world_vertices_length = vertices.vertex_count() * 2;
        if world_vertices_length == 0 {
            return Some(Vec::new());
        }

        let mut out = vec![0.0f32; world_vertices_length];
        compute_attachment_world_vertices(
            self,
            slot_index,
            vertices,
            0,
            world_vertices_length,
            &mut out,
            0,
            2,
        );
        Some(out)
    }

    /// Axis-aligned bounds over the visible region and mesh attachments in
    /// draw order. `scratch` is reused across calls and grown as needed.
    pub fn bounds(&self, scratch: &mut Vec<f32>) -> Bounds {
        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;
        let mut any = false;

        for &slot_index in &self.draw_order {
            let Some(slot) = self.slots.get(slot_index) else {
                continue;
            };
            let Some(bone) = self.bones.get(slot.bone) else {
                continue;
            };
            if !bone.active {
                continue;
            }
            let Some(attachment) = self.slot_attachment_data(slot_index) else {
                continue;
            };

            let count = match attachment {
                AttachmentData::Region(region) => {
                    region.compute_world_vertices(bone, scratch, 0, 2);
                    8
                }
                AttachmentData::Mesh(mesh) => {
                    let len = mesh.vertices.vertex_count() * 2;
                    if scratch.len() < len {
                        scratch.resize(len, 0.0);
                    }
                    compute_attachment_world_vertices(
                        self,
                        slot_index,
                        &mesh.vertices,
                        0,
                        len,
                        scratch,
                        0,
                        2,
                    );
                    len
                }
                _ => continue,
            };

            for pair in scratch[..count].chunks_exact(2) {
                any = true;
                min_x = min_x.min(pair[0]);
                min_y = min_y.min(pair[1]);
                max_x = max_x.max(pair[0]);
                max_y = max_y.max(pair[1]);
            }
        }

        if !any {
            return Bounds {
                x: 0.0,
                y: 0.0,
                width: 0.0,
                height: 0.0,
            };
        }
        Bounds {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        }
    }

    #[doc(hidden)]
    pub fn debug_update_cache(&self) -> Vec<String> {
        fn bone_name(skeleton: &Skeleton, index: usize) -> &str {
            skeleton
                .data
                .bones
                .get(index)
                .map(|b| b.name.as_str())
                .unwrap_or("<unknown>")
        }

        self.update_cache
            .iter()
            .map(|item| match *item {
                UpdateCacheItem::Bone(index) => format!("bone {}", bone_name(self, index)),
                UpdateCacheItem::Ik(index) => {
                    let name = self
                        .ik_constraints
                        .get(index)
                        .and_then(|c| self.data.ik_constraints.get(c.data_index))
                        .map(|d| d.name.as_str())
                        .unwrap_or("<unknown>");
                    format!("ik {}", name)
                }
                UpdateCacheItem::Transform(index) => {
                    let name = self
                        .transform_constraints
                        .get(index)
                        .and_then(|c| self.data.transform_constraints.get(c.data_index))
                        .map(|d| d.name.as_str())
                        .unwrap_or("<unknown>");
                    format!("transform {}", name)
                }
                UpdateCacheItem::Path(index) => {
                    let name = self
                        .path_constraints
                        .get(index)
                        .and_then(|c| self.data.path_constraints.get(c.data_index))
                        .map(|d| d.name.as_str())
                        .unwrap_or("<unknown>");
                    format!("path {}", name)
                }
            })
            .collect()
    }

    #[doc(hidden)]
    pub fn debug_update_cache_reset(&self) -> Vec<String> {
        self.update_cache_reset
            .iter()
            .map(|&i| {
                self.data
                    .bones
                    .get(i)
                    .map(|b| b.name.clone())
                    .unwrap_or_else(|| "<unknown>".to_string())
            })
            .collect()
    }
}

#[derive(Copy, Clone, Debug)]
struct TransformOffsets {
    rotation: f32,
    x: f32,
    y: f32,
    scale_x: f32,
    scale_y: f32,
    shear_y: f32,
}

#[derive(Copy, Clone, Debug)]
struct ParentTransform {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    world_x: f32,
    world_y: f32,
}

/// Builds a bone's world matrix from an explicit local pose.
///
/// The pose is recorded as the applied pose. Root bones compose with the
/// skeleton transform; child bones compose with the parent matrix under
/// the bone's transform mode.
#[allow(clippy::too_many_arguments)]
fn compose_world_transform(
    bone: &mut Bone,
    x: f32,
    y: f32,
    rotation: f32,
    scale_x: f32,
    scale_y: f32,
    shear_x: f32,
    shear_y: f32,
    parent: Option<&ParentTransform>,
    skeleton_x: f32,
    skeleton_y: f32,
    skeleton_scale_x: f32,
    skeleton_scale_y: f32,
) {
    bone.ax = x;
    bone.ay = y;
    bone.arotation = rotation;
    bone.ascale_x = scale_x;
    bone.ascale_y = scale_y;
    bone.ashear_x = shear_x;
    bone.ashear_y = shear_y;
    bone.applied_valid = true;

    let Some(parent) = parent else {
        let rotation_x = rotation + shear_x;
        let rotation_y = rotation + 90.0 + shear_y;
        bone.a = cos_deg(rotation_x) * scale_x * skeleton_scale_x;
        bone.b = cos_deg(rotation_y) * scale_y * skeleton_scale_x;
        bone.c = sin_deg(rotation_x) * scale_x * skeleton_scale_y;
        bone.d = sin_deg(rotation_y) * scale_y * skeleton_scale_y;
        bone.world_x = x * skeleton_scale_x + skeleton_x;
        bone.world_y = y * skeleton_scale_y + skeleton_y;
        return;
    };

    let mut pa = parent.a;
    let mut pb = parent.b;
    let mut pc = parent.c;
    let mut pd = parent.d;

    bone.world_x = pa * x + pb * y + parent.world_x;
    bone.world_y = pc * x + pd * y + parent.world_y;

    match bone.transform_mode {
        TransformMode::Normal => {
            let rotation_x = (rotation + shear_x).to_radians();
            let rotation_y = (rotation + 90.0 + shear_y).to_radians();
            let la = rotation_x.cos() * scale_x;
            let lb = rotation_y.cos() * scale_y;
            let lc = rotation_x.sin() * scale_x;
            let ld = rotation_y.sin() * scale_y;

            bone.a = pa * la + pb * lc;
            bone.b = pa * lb + pb * ld;
            bone.c = pc * la + pd * lc;
            bone.d = pc * lb + pd * ld;
        }
        TransformMode::OnlyTranslation => {
            let rotation_x = (rotation + shear_x).to_radians();
            let rotation_y = (rotation + 90.0 + shear_y).to_radians();
            bone.a = rotation_x.cos() * scale_x * skeleton_scale_x;
            bone.b = rotation_y.cos() * scale_y * skeleton_scale_x;
            bone.c = rotation_x.sin() * scale_x * skeleton_scale_y;
            bone.d = rotation_y.sin() * scale_y * skeleton_scale_y;
        }
        TransformMode::NoRotationOrReflection => {
            let sx = if skeleton_scale_x.abs() > EPSILON {
                1.0 / skeleton_scale_x
            } else {
                0.0
            };
            let sy = if skeleton_scale_y.abs() > EPSILON {
                1.0 / skeleton_scale_y
            } else {
                0.0
            };
            pa *= sx;
            pc *= sy;

            let mut s = pa * pa + pc * pc;
            let prx;
            if s > EPSILON {
                s = (pa * pd * sy - pb * sx * pc).abs() / s;
                pb = pc * s;
                pd = pa * s;
                prx = pc.atan2(pa).to_degrees();
            } else {
                pa = 0.0;
                pc = 0.0;
                prx = 90.0 - pd.atan2(pb).to_degrees();
            }

            let rotation_x = (rotation + shear_x - prx).to_radians();
            let rotation_y = (rotation + shear_y - prx + 90.0).to_radians();
            let la = rotation_x.cos() * scale_x;
            let lb = rotation_y.cos() * scale_y;
            let lc = rotation_x.sin() * scale_x;
            let ld = rotation_y.sin() * scale_y;

            bone.a = (pa * la - pb * lc) * skeleton_scale_x;
            bone.b = (pa * lb - pb * ld) * skeleton_scale_x;
            bone.c = (pc * la + pd * lc) * skeleton_scale_y;
            bone.d = (pc * lb + pd * ld) * skeleton_scale_y;
        }
        TransformMode::NoScale | TransformMode::NoScaleOrReflection => {
            let r = rotation.to_radians();
            let cos = r.cos();
            let sin = r.sin();

            let za = (pa * cos + pb * sin) / skeleton_scale_x;
            let zc = (pc * cos + pd * sin) / skeleton_scale_y;
            let mut s = (za * za + zc * zc).sqrt();
            if s > EPSILON {
                s = 1.0 / s;
            }
            let za = za * s;
            let zc = zc * s;

            let mut s2 = (za * za + zc * zc).sqrt();
            if bone.transform_mode == TransformMode::NoScale {
                let det = pa * pd - pb * pc;
                let flip = (det < 0.0) != ((skeleton_scale_x < 0.0) != (skeleton_scale_y < 0.0));
                if flip {
                    s2 = -s2;
                }
            }

            let r = std::f32::consts::FRAC_PI_2 + zc.atan2(za);
            let zb = r.cos() * s2;
            let zd = r.sin() * s2;

            let shear_x_r = shear_x.to_radians();
            let shear_y_r = (90.0 + shear_y).to_radians();
            let la = shear_x_r.cos() * scale_x;
            let lb = shear_y_r.cos() * scale_y;
            let lc = shear_x_r.sin() * scale_x;
            let ld = shear_y_r.sin() * scale_y;

            bone.a = (za * la + zb * lc) * skeleton_scale_x;
            bone.b = (za * lb + zb * ld) * skeleton_scale_x;
            bone.c = (zc * la + zd * lc) * skeleton_scale_y;
            bone.d = (zc * lb + zd * ld) * skeleton_scale_y;
        }
    }
}

fn path_attachment_for_slot(
    skeleton: &Skeleton,
    slot_index: usize,
) -> Option<(usize, &PathAttachmentData)> {
    let attachment = skeleton.slot_attachment_data(slot_index)?;
    match attachment {
        AttachmentData::Path(p) => Some((slot_index, p)),
        _ => None,
    }
}

#[allow(clippy::too_many_arguments)]
fn compute_path_world_positions<'a>(
    skeleton: &Skeleton,
    positions: &'a mut Vec<f32>,
    world: &mut Vec<f32>,
    curves: &mut Vec<f32>,
    target_slot_index: usize,
    path: &PathAttachmentData,
    percent_position: bool,
    percent_spacing: bool,
    spaces_count: usize,
    tangents: bool,
    spaces: &mut [f32],
    mut position: f32,
) -> &'a [f32] {
    const NONE: i32 = -1;
    const BEFORE: i32 = -2;
    const AFTER: i32 = -3;

    let closed = path.closed;
    let mut vertices_length = path.vertices.vertex_count() * 2;
    if vertices_length < 6 || spaces_count == 0 {
        positions.clear();
        return positions.as_slice();
    }

    let output_len = spaces_count * 3 + 2;
    positions.resize(output_len, 0.0);
    positions.fill(0.0);
    let output = positions.as_mut_slice();

    if !path.constant_speed {
        let lengths = path.lengths.as_slice();
        if lengths.is_empty() {
            return positions.as_slice();
        }

        let mut curve_count = (vertices_length / 6) as i32;
        curve_count -= if closed { 1 } else { 2 };
        if curve_count < 0 {
            return positions.as_slice();
        }
        let curve_count_usize = curve_count as usize;
        if curve_count_usize >= lengths.len() {
            return positions.as_slice();
        }

        let path_length = lengths[curve_count_usize];
        if percent_position {
            position *= path_length;
        }
        if percent_spacing {
            for space in spaces.iter_mut().take(spaces_count).skip(1) {
                *space *= path_length;
            }
        }

        world.resize(8, 0.0);
        world.fill(0.0);
        let mut prev_curve = NONE;
        let mut curve = 0usize;
        for i in 0..spaces_count {
            let space = spaces.get(i).copied().unwrap_or(0.0);
            position += space;
            let mut p = position;

            if closed {
                p = p.rem_euclid(path_length);
                curve = 0;
            } else if p < 0.0 {
                if prev_curve != BEFORE {
                    prev_curve = BEFORE;
                    compute_attachment_world_vertices(
                        skeleton,
                        target_slot_index,
                        &path.vertices,
                        2,
                        4,
                        world,
                        0,
                        2,
                    );
                }
                add_before_position(p, world.as_slice(), 0, output, i * 3);
                continue;
            } else if p > path_length {
                if prev_curve != AFTER {
                    prev_curve = AFTER;
                    compute_attachment_world_vertices(
                        skeleton,
                        target_slot_index,
                        &path.vertices,
                        vertices_length.saturating_sub(6),
                        4,
                        world,
                        0,
                        2,
                    );
                }
                add_after_position(p - path_length, world.as_slice(), 0, output, i * 3);
                continue;
            }

            loop {
                if curve >= lengths.len() {
                    break;
                }
                let length = lengths[curve];
                if p > length {
                    curve += 1;
                    continue;
                }
                if curve == 0 {
                    p /= length.max(PATH_EPSILON);
                } else {
                    let prev = lengths[curve - 1];
                    p = (p - prev) / (length - prev).max(PATH_EPSILON);
                }
                break;
            }

            if curve as i32 != prev_curve {
                prev_curve = curve as i32;
                if closed && curve == curve_count_usize {
                    compute_attachment_world_vertices(
                        skeleton,
                        target_slot_index,
                        &path.vertices,
                        vertices_length.saturating_sub(4),
                        4,
                        world,
                        0,
                        2,
                    );
                    compute_attachment_world_vertices(
                        skeleton,
                        target_slot_index,
                        &path.vertices,
                        0,
                        4,
                        world,
                        4,
                        2,
                    );
                } else {
                    compute_attachment_world_vertices(
                        skeleton,
                        target_slot_index,
                        &path.vertices,
                        curve * 6 + 2,
                        8,
                        world,
                        0,
                        2,
                    );
                }
            }

            let world_slice = world.as_slice();
            add_curve_position(
                p,
                world_slice[0],
                world_slice[1],
                world_slice[2],
                world_slice[3],
                world_slice[4],
                world_slice[5],
                world_slice[6],
                world_slice[7],
                output,
                i * 3,
                tangents || (i > 0 && space.abs() < PATH_EPSILON),
            );
        }

        return positions.as_slice();
    }

    // Constant speed: integrate curve lengths so spacing is uniform along
    // the arc.
    let mut curve_count = vertices_length / 6;
    world.clear();
    if closed {
        vertices_length += 2;
        world.resize(vertices_length, 0.0);
        world.fill(0.0);
        compute_attachment_world_vertices(
            skeleton,
            target_slot_index,
            &path.vertices,
            2,
            vertices_length.saturating_sub(4),
            world,
            0,
            2,
        );
        compute_attachment_world_vertices(
            skeleton,
            target_slot_index,
            &path.vertices,
            0,
            2,
            world,
            vertices_length.saturating_sub(4),
            2,
        );
        if vertices_length >= 2 {
            world[vertices_length - 2] = world[0];
            world[vertices_length - 1] = world[1];
        }
    } else {
        curve_count = curve_count.saturating_sub(1);
        vertices_length = vertices_length.saturating_sub(4);
        world.resize(vertices_length, 0.0);
        world.fill(0.0);
        compute_attachment_world_vertices(
            skeleton,
            target_slot_index,
            &path.vertices,
            2,
            vertices_length,
            world,
            0,
            2,
        );
    }

    let world = world.as_slice();
    curves.resize(curve_count, 0.0);
    let curves = curves.as_mut_slice();
    let mut path_length = 0.0f32;
    let mut x1 = world.first().copied().unwrap_or(0.0);
    let mut y1 = world.get(1).copied().unwrap_or(0.0);
    let mut cx1 = 0.0f32;
    let mut cy1 = 0.0f32;
    let mut cx2 = 0.0f32;
    let mut cy2 = 0.0f32;
    let mut x2 = 0.0f32;
    let mut y2 = 0.0f32;
    let mut w = 2usize;
    for curve in curves.iter_mut().take(curve_count) {
        cx1 = *world.get(w).unwrap_or(&0.0);
        cy1 = *world.get(w + 1).unwrap_or(&0.0);
        cx2 = *world.get(w + 2).unwrap_or(&0.0);
        cy2 = *world.get(w + 3).unwrap_or(&0.0);
        x2 = *world.get(w + 4).unwrap_or(&0.0);
        y2 = *world.get(w + 5).unwrap_or(&0.0);

        let tmpx = (x1 - cx1 * 2.0 + cx2) * 0.1875;
        let tmpy = (y1 - cy1 * 2.0 + cy2) * 0.1875;
        let dddfx = ((cx1 - cx2) * 3.0 - x1 + x2) * 0.09375;
        let dddfy = ((cy1 - cy2) * 3.0 - y1 + y2) * 0.09375;
        let mut ddfx = tmpx * 2.0 + dddfx;
        let mut ddfy = tmpy * 2.0 + dddfy;
        let mut dfx = (cx1 - x1) * 0.75 + tmpx + dddfx * 0.16666667;
        let mut dfy = (cy1 - y1) * 0.75 + tmpy + dddfy * 0.16666667;

        path_length += (dfx * dfx + dfy * dfy).sqrt();
        dfx += ddfx;
        dfy += ddfy;
        ddfx += dddfx;
        ddfy += dddfy;
        path_length += (dfx * dfx + dfy * dfy).sqrt();
        dfx += ddfx;
        dfy += ddfy;
        path_length += (dfx * dfx + dfy * dfy).sqrt();
        dfx += ddfx + dddfx;
        dfy += ddfy + dddfy;
        path_length += (dfx * dfx + dfy * dfy).sqrt();

        *curve = path_length;
        x1 = x2;
        y1 = y2;
        w += 6;
    }

    if percent_position {
        position *= path_length;
    }
    if percent_spacing {
        for space in spaces.iter_mut().take(spaces_count).skip(1) {
            *space *= path_length;
        }
    }

    let mut segments = [0.0f32; 10];
    let mut curve_length = 0.0f32;
    let mut prev_curve = NONE;
    let mut curve = 0usize;
    let mut segment = 0usize;

    let mut i = 0usize;
    while i < spaces_count {
        let space = spaces.get(i).copied().unwrap_or(0.0);
        position += space;
        let mut p = position;

        if closed {
            p = p.rem_euclid(path_length);
            curve = 0;
        } else if p < 0.0 {
            add_before_position(p, world, 0, output, i * 3);
            i += 1;
            continue;
        } else if p > path_length {
            add_after_position(
                p - path_length,
                world,
                vertices_length.saturating_sub(4),
                output,
                i * 3,
            );
            i += 1;
            continue;
        }

        loop {
            if curve >= curves.len() {
                break;
            }
            let length = curves[curve];
            if p > length {
                curve += 1;
                continue;
            }
            if curve == 0 {
                p /= length.max(PATH_EPSILON);
            } else {
                let prev = curves[curve - 1];
                p = (p - prev) / (length - prev).max(PATH_EPSILON);
            }
            break;
        }

        if curve as i32 != prev_curve {
            prev_curve = curve as i32;
            let ii = curve * 6;
            x1 = *world.get(ii).unwrap_or(&0.0);
            y1 = *world.get(ii + 1).unwrap_or(&0.0);
            cx1 = *world.get(ii + 2).unwrap_or(&0.0);
            cy1 = *world.get(ii + 3).unwrap_or(&0.0);
            cx2 = *world.get(ii + 4).unwrap_or(&0.0);
            cy2 = *world.get(ii + 5).unwrap_or(&0.0);
            x2 = *world.get(ii + 6).unwrap_or(&0.0);
            y2 = *world.get(ii + 7).unwrap_or(&0.0);

            let tmpx = (x1 - cx1 * 2.0 + cx2) * 0.03;
            let tmpy = (y1 - cy1 * 2.0 + cy2) * 0.03;
            let dddfx = ((cx1 - cx2) * 3.0 - x1 + x2) * 0.006;
            let dddfy = ((cy1 - cy2) * 3.0 - y1 + y2) * 0.006;
            let mut ddfx = tmpx * 2.0 + dddfx;
            let mut ddfy = tmpy * 2.0 + dddfy;
            let mut dfx = (cx1 - x1) * 0.3 + tmpx + dddfx * 0.16666667;
            let mut dfy = (cy1 - y1) * 0.3 + tmpy + dddfy * 0.16666667;

            curve_length = (dfx * dfx + dfy * dfy).sqrt();
            segments[0] = curve_length;
            for seg in segments.iter_mut().take(8).skip(1) {
                dfx += ddfx;
                dfy += ddfy;
                ddfx += dddfx;
                ddfy += dddfy;
                curve_length += (dfx * dfx + dfy * dfy).sqrt();
                *seg = curve_length;
            }
            dfx += ddfx;
            dfy += ddfy;
            curve_length += (dfx * dfx + dfy * dfy).sqrt();
            segments[8] = curve_length;
            dfx += ddfx + dddfx;
            dfy += ddfy + dddfy;
            curve_length += (dfx * dfx + dfy * dfy).sqrt();
            segments[9] = curve_length;
            segment = 0;
        }

        p *= curve_length;
        loop {
            let length = segments.get(segment).copied().unwrap_or(curve_length);
            if p > length {
                segment += 1;
                if segment >= 10 {
                    segment = 9;
                    break;
                }
                continue;
            }
            if segment == 0 {
                p /= length.max(PATH_EPSILON);
            } else {
                let prev = segments[segment - 1];
                p = segment as f32 + (p - prev) / (length - prev).max(PATH_EPSILON);
            }
            break;
        }

        add_curve_position(
            p * 0.1,
            x1,
            y1,
            cx1,
            cy1,
            cx2,
            cy2,
            x2,
            y2,
            output,
            i * 3,
            tangents || (i > 0 && space.abs() < PATH_EPSILON),
        );
        i += 1;
    }

    positions.as_slice()
}

/// Transforms attachment vertices into world space, honoring the slot's
/// deform buffer.
#[allow(clippy::too_many_arguments)]
pub(crate) fn compute_attachment_world_vertices(
    skeleton: &Skeleton,
    slot_index: usize,
    vertices: &VertexData,
    start: usize,
    count: usize,
    world_vertices: &mut Vec<f32>,
    offset: usize,
    stride: usize,
) {
    let Some(slot) = skeleton.slots.get(slot_index) else {
        return;
    };
    let Some(bone) = skeleton.bones.get(slot.bone) else {
        return;
    };

    let start_vertex = start / 2;
    let vertex_count = count / 2;
    let out_end = offset + vertex_count * stride;
    if world_vertices.len() < out_end {
        world_vertices.resize(out_end, 0.0);
    }

    match vertices {
        VertexData::Unweighted(v) => {
            if start_vertex >= v.len() {
                return;
            }
            let available = v.len().saturating_sub(start_vertex);
            let n = vertex_count.min(available);
            let deform = slot.deform.as_slice();
            let use_deform = !deform.is_empty() && deform.len() >= v.len() * 2;
            for i in 0..n {
                let vi = start_vertex + i;
                let (vx, vy) = if use_deform {
                    (
                        deform.get(vi * 2).copied().unwrap_or(0.0),
                        deform.get(vi * 2 + 1).copied().unwrap_or(0.0),
                    )
                } else {
                    let p = &v[vi];
                    (p[0], p[1])
                };
                let w = offset + i * stride;
                world_vertices[w] = vx * bone.a + vy * bone.b + bone.world_x;
                world_vertices[w + 1] = vx * bone.c + vy * bone.d + bone.world_y;
            }
        }
        VertexData::Weighted(v) => {
            if start_vertex >= v.len() {
                return;
            }
            let available = v.len().saturating_sub(start_vertex);
            let n = vertex_count.min(available);

            let mut skip_weights = 0usize;
            for i in 0..start_vertex {
                skip_weights = skip_weights.saturating_add(v.get(i).map(|w| w.len()).unwrap_or(0));
            }
            let mut f = skip_weights * 2;
            let deform = slot.deform.as_slice();

            for i in 0..n {
                let vi = start_vertex + i;
                let mut wx = 0.0f32;
                let mut wy = 0.0f32;
                for wgt in v.get(vi).into_iter().flatten() {
                    let Some(b) = skeleton.bones.get(wgt.bone) else {
                        f = f.saturating_add(2);
                        continue;
                    };
                    let dx = deform.get(f).copied().unwrap_or(0.0);
                    let dy = deform.get(f + 1).copied().unwrap_or(0.0);
                    f += 2;
                    let vx = wgt.x + dx;
                    let vy = wgt.y + dy;
                    let x = b.a * vx + b.b * vy + b.world_x;
                    let y = b.c * vx + b.d * vy + b.world_y;
                    wx += x * wgt.weight;
                    wy += y * wgt.weight;
                }
                let w = offset + i * stride;
                world_vertices[w] = wx;
                world_vertices[w + 1] = wy;
            }
        }
    }
}

fn build_bone_children_indices(bones: &[Bone]) -> Vec<Vec<usize>> {
    let mut children = vec![Vec::<usize>::new(); bones.len()];
    for (index, bone) in bones.iter().enumerate() {
        if let Some(parent) = bone.parent {
            if parent < children.len() {
                children[parent].push(index);
            }
        }
    }
    children
}

fn add_before_position(p: f32, temp: &[f32], i: usize, output: &mut [f32], o: usize) {
    let x1 = *temp.get(i).unwrap_or(&0.0);
    let y1 = *temp.get(i + 1).unwrap_or(&0.0);
    let dx = *temp.get(i + 2).unwrap_or(&x1) - x1;
    let dy = *temp.get(i + 3).unwrap_or(&y1) - y1;
    let r = dy.atan2(dx);
    output[o] = x1 + p * r.cos();
    output[o + 1] = y1 + p * r.sin();
    output[o + 2] = r;
}

fn add_after_position(p: f32, temp: &[f32], i: usize, output: &mut [f32], o: usize) {
    let x1 = *temp.get(i + 2).unwrap_or(&0.0);
    let y1 = *temp.get(i + 3).unwrap_or(&0.0);
    let dx = x1 - *temp.get(i).unwrap_or(&x1);
    let dy = y1 - *temp.get(i + 1).unwrap_or(&y1);
    let r = dy.atan2(dx);
    output[o] = x1 + p * r.cos();
    output[o + 1] = y1 + p * r.sin();
    output[o + 2] = r;
}

#[allow(clippy::too_many_arguments)]
fn add_curve_position(
    p: f32,
    x1: f32,
    y1: f32,
    cx1: f32,
    cy1: f32,
    cx2: f32,
    cy2: f32,
    x2: f32,
    y2: f32,
    output: &mut [f32],
    o: usize,
    tangents: bool,
) {
    if p < PATH_EPSILON || p.is_nan() {
        output[o] = x1;
        output[o + 1] = y1;
        output[o + 2] = (cy1 - y1).atan2(cx1 - x1);
        return;
    }
    let tt = p * p;
    let ttt = tt * p;
    let u = 1.0 - p;
    let uu = u * u;
    let uuu = uu * u;
    let ut = u * p;
    let ut3 = ut * 3.0;
    let uut3 = u * ut3;
    let utt3 = ut3 * p;
    let x = x1 * uuu + cx1 * uut3 + cx2 * utt3 + x2 * ttt;
    let y = y1 * uuu + cy1 * uut3 + cy2 * utt3 + y2 * ttt;
    output[o] = x;
    output[o + 1] = y;
    if tangents {
        if p < 0.001 {
            output[o + 2] = (cy1 - y1).atan2(cx1 - x1);
        } else {
            output[o + 2] = (y - (y1 * uu + cy1 * ut * 2.0 + cy2 * tt))
                .atan2(x - (x1 * uu + cx1 * ut * 2.0 + cx2 * tt));
        }
    }
}
