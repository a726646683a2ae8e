//! Semantic hub layout.
//!
//! # Responsibility
//! - Turn externally suggested groups into non-overlapping positions along
//!   a group axis.
//!
//! # Invariants
//! - Groups with fewer than two resolvable members are skipped.
//! - Along the layout axis, each member starts at least `min_gap` after the
//!   previous member's trailing edge (before the movement cap is applied).
//! - Displacement from the original position never exceeds `max_movement`.
//! - An entry belongs to at most one group per pass; the first group wins.

use crate::config::{CanvasConfig, FootprintMetrics};
use crate::layout::footprint::estimate_footprint;
use crate::model::entry::EntryId;
use crate::model::geometry::{union_bounds, Point, Size, Vector};
use crate::store::entry_store::EntryStore;
use log::debug;
use rand::Rng;
use std::cmp::Ordering;
use std::collections::HashSet;

/// One suggested group: members plus a preferred direction.
#[derive(Debug, Clone, PartialEq)]
pub struct HubGroup {
    pub entry_ids: Vec<EntryId>,
    /// Preferred direction; normalized before use.
    pub direction: Vector,
}

/// Planned move for one entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutMove {
    pub id: EntryId,
    pub new_position: Point,
    pub original_position: Point,
}

/// Tunables for one layout pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HubLayoutParams {
    pub min_gap: f64,
    pub max_movement: f64,
    pub jitter_min: f64,
    pub jitter_max: f64,
    pub metrics: FootprintMetrics,
}

impl From<&CanvasConfig> for HubLayoutParams {
    fn from(config: &CanvasConfig) -> Self {
        Self {
            min_gap: config.min_gap,
            max_movement: config.max_movement,
            jitter_min: config.jitter_min,
            jitter_max: config.jitter_max,
            metrics: config.footprint,
        }
    }
}

/// Result of one layout pass, grouped as laid out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HubLayoutPlan {
    pub groups: Vec<Vec<LayoutMove>>,
    pub skipped_groups: usize,
}

impl HubLayoutPlan {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Every planned move, group by group.
    pub fn moves(&self) -> impl Iterator<Item = &LayoutMove> {
        self.groups.iter().flatten()
    }
}

struct Member {
    id: EntryId,
    position: Point,
    size: Size,
}

/// Plans new positions for every laid-out group member.
pub fn plan_hub_layout<R: Rng + ?Sized>(
    store: &EntryStore,
    groups: &[HubGroup],
    params: &HubLayoutParams,
    rng: &mut R,
) -> HubLayoutPlan {
    let mut plan = HubLayoutPlan::default();
    let mut claimed: HashSet<EntryId> = HashSet::new();

    for group in groups {
        let members: Vec<Member> = group
            .entry_ids
            .iter()
            .filter(|id| !claimed.contains(*id))
            .filter_map(|id| store.get(*id))
            .map(|entry| Member {
                id: entry.id,
                position: entry.position,
                size: estimate_footprint(entry, &params.metrics),
            })
            .fold(Vec::new(), |mut acc: Vec<Member>, member| {
                if !acc.iter().any(|seen| seen.id == member.id) {
                    acc.push(member);
                }
                acc
            });

        let Some(direction) = unit(group.direction) else {
            plan.skipped_groups += 1;
            continue;
        };
        if members.len() < 2 {
            plan.skipped_groups += 1;
            continue;
        }

        let moves = layout_group(&members, direction, params, rng);
        claimed.extend(moves.iter().map(|planned| planned.id));
        plan.groups.push(moves);
    }

    debug!(
        "event=hub_layout_plan module=layout status=ok groups={} skipped={} moves={}",
        plan.groups.len(),
        plan.skipped_groups,
        plan.moves().count()
    );
    plan
}

fn layout_group<R: Rng + ?Sized>(
    members: &[Member],
    direction: Vector,
    params: &HubLayoutParams,
    rng: &mut R,
) -> Vec<LayoutMove> {
    let axis = choose_axis(members, direction);
    let cross = Vector::new(-axis.y, axis.x);

    let mut projected: Vec<Projection> = members
        .iter()
        .enumerate()
        .map(|(index, member)| Projection::of(index, member, axis, cross))
        .collect();
    // Vec::sort_by is stable, so ties keep the original member order.
    projected.sort_by(|a, b| a.center().partial_cmp(&b.center()).unwrap_or(Ordering::Equal));

    let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
    let mut trailing_edge: Option<f64> = None;
    let mut moves = vec![None; members.len()];

    for projection in projected {
        let leading = match trailing_edge {
            Some(edge) => projection.leading().max(edge + params.min_gap),
            None => projection.leading(),
        };
        trailing_edge = Some(leading + projection.extent());
        let placed_along = leading - projection.low;
        let (index, across) = (projection.index, projection.across);

        let jitter = sign * jitter_magnitude(params, rng);
        let target = (axis * placed_along + cross * (across + jitter)).to_point();
        let original = members[index].position;
        moves[index] = Some(LayoutMove {
            id: members[index].id,
            new_position: cap_movement(original, target, params.max_movement),
            original_position: original,
        });
    }

    moves.into_iter().flatten().collect()
}

/// A member's footprint seen along the layout axis.
///
/// `low`/`high` are offsets of the footprint's extreme corners from the
/// projected anchor, so negative axis components flip which corner leads.
struct Projection {
    index: usize,
    along: f64,
    across: f64,
    low: f64,
    high: f64,
}

impl Projection {
    fn of(index: usize, member: &Member, axis: Vector, cross: Vector) -> Self {
        let width_offset = member.size.width * axis.x;
        let height_offset = member.size.height * axis.y;
        Self {
            index,
            along: member.position.to_vector().dot(axis),
            across: member.position.to_vector().dot(cross),
            low: width_offset.min(0.0) + height_offset.min(0.0),
            high: width_offset.max(0.0) + height_offset.max(0.0),
        }
    }

    fn leading(&self) -> f64 {
        self.along + self.low
    }

    fn extent(&self) -> f64 {
        self.high - self.low
    }

    fn center(&self) -> f64 {
        self.along + (self.low + self.high) / 2.0
    }
}

/// Picks `direction` or its perpendicular, whichever better follows the
/// dominant dimension of the group's bounding box.
fn choose_axis(members: &[Member], direction: Vector) -> Vector {
    let perpendicular = Vector::new(-direction.y, direction.x);
    let wide = union_bounds(members.iter().map(|member| (member.position, member.size)))
        .map(|bounds| bounds.width() >= bounds.height())
        .unwrap_or(true);

    let (primary, secondary) = if wide {
        (direction.x.abs(), perpendicular.x.abs())
    } else {
        (direction.y.abs(), perpendicular.y.abs())
    };
    if primary >= secondary {
        direction
    } else {
        perpendicular
    }
}

fn jitter_magnitude<R: Rng + ?Sized>(params: &HubLayoutParams, rng: &mut R) -> f64 {
    if params.jitter_max > params.jitter_min {
        rng.gen_range(params.jitter_min..params.jitter_max)
    } else {
        params.jitter_min
    }
}

/// Scales the displacement down to `max_movement` when it is longer.
fn cap_movement(original: Point, target: Point, max_movement: f64) -> Point {
    let displacement = target - original;
    let distance = displacement.length();
    if distance > max_movement && distance > 0.0 {
        original + displacement * (max_movement / distance)
    } else {
        target
    }
}

fn unit(direction: Vector) -> Option<Vector> {
    let length = direction.length();
    if length.is_finite() && length > f64::EPSILON {
        Some(direction / length)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{cap_movement, choose_axis, unit, Member, Projection};
    use crate::model::geometry::{Point, Size, Vector};
    use uuid::Uuid;

    fn member(x: f64, y: f64, w: f64, h: f64) -> Member {
        Member {
            id: Uuid::new_v4(),
            position: Point::new(x, y),
            size: Size::new(w, h),
        }
    }

    #[test]
    fn cap_scales_long_moves_to_exact_limit() {
        let capped = cap_movement(Point::new(0.0, 0.0), Point::new(300.0, 400.0), 120.0);
        let moved = (capped - Point::new(0.0, 0.0)).length();
        assert!((moved - 120.0).abs() < 1e-9);
        assert!((capped.x / capped.y - 0.75).abs() < 1e-9);
    }

    #[test]
    fn cap_keeps_short_moves() {
        let target = Point::new(3.0, 4.0);
        assert_eq!(cap_movement(Point::new(0.0, 0.0), target, 120.0), target);
    }

    #[test]
    fn wide_group_prefers_horizontal_axis() {
        let members = [member(0.0, 0.0, 60.0, 20.0), member(100.0, 10.0, 60.0, 20.0)];
        let axis = choose_axis(&members, Vector::new(0.0, 1.0));
        assert!(axis.x.abs() > 0.99);
    }

    #[test]
    fn tall_group_prefers_vertical_axis() {
        let members = [member(0.0, 0.0, 20.0, 20.0), member(0.0, 200.0, 20.0, 20.0)];
        let axis = choose_axis(&members, Vector::new(1.0, 0.0));
        assert!(axis.y.abs() > 0.99);
    }

    #[test]
    fn negative_axis_leads_with_the_far_corner() {
        let wide = member(0.0, 0.0, 186.0, 20.0);
        let axis = Vector::new(-1.0, 0.0);
        let projection = Projection::of(0, &wide, axis, Vector::new(0.0, -1.0));
        assert_eq!(projection.leading(), -186.0);
        assert_eq!(projection.extent(), 186.0);
        assert_eq!(projection.center(), -93.0);

        let forward = Projection::of(0, &wide, Vector::new(1.0, 0.0), Vector::new(0.0, 1.0));
        assert_eq!(forward.leading(), 0.0);
        assert_eq!(forward.extent(), 186.0);
    }

    #[test]
    fn zero_direction_has_no_unit() {
        assert!(unit(Vector::new(0.0, 0.0)).is_none());
        let normalized = unit(Vector::new(3.0, 4.0)).unwrap();
        assert!((normalized.length() - 1.0).abs() < 1e-12);
    }
}
