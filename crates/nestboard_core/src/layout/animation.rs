//! Tick-driven interpolation of planned layout moves.
//!
//! The animation is independent of any frame-callback primitive: callers feed
//! elapsed time through `on_tick` and paint the returned frames however they
//! like.

use crate::layout::hub::HubLayoutPlan;
use crate::model::entry::EntryId;
use crate::model::geometry::Point;
use rand::Rng;

/// Interpolated position of one entry for the current tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationFrame {
    pub id: EntryId,
    pub position: Point,
}

#[derive(Debug, Clone)]
struct Track {
    id: EntryId,
    from: Point,
    to: Point,
    duration_ms: f64,
}

/// Ease-out interpolation over every planned move.
#[derive(Debug, Clone)]
pub struct LayoutAnimation {
    tracks: Vec<Track>,
    elapsed_ms: f64,
}

impl LayoutAnimation {
    /// Builds tracks from a plan. Each group gets one random duration in
    /// `[min_ms, max_ms)`.
    pub fn new<R: Rng + ?Sized>(
        plan: &HubLayoutPlan,
        min_ms: u64,
        max_ms: u64,
        rng: &mut R,
    ) -> Self {
        let mut tracks = Vec::new();
        for group in &plan.groups {
            let duration_ms = if max_ms > min_ms {
                rng.gen_range(min_ms..max_ms) as f64
            } else {
                min_ms as f64
            };
            tracks.extend(group.iter().map(|planned| Track {
                id: planned.id,
                from: planned.original_position,
                to: planned.new_position,
                duration_ms,
            }));
        }
        Self {
            tracks,
            elapsed_ms: 0.0,
        }
    }

    /// Advances time by `delta_ms` and returns the frame for every track.
    pub fn on_tick(&mut self, delta_ms: f64) -> Vec<AnimationFrame> {
        if delta_ms.is_finite() && delta_ms > 0.0 {
            self.elapsed_ms += delta_ms;
        }
        self.tracks
            .iter()
            .map(|track| {
                let progress = if track.duration_ms <= 0.0 {
                    1.0
                } else {
                    (self.elapsed_ms / track.duration_ms).clamp(0.0, 1.0)
                };
                AnimationFrame {
                    id: track.id,
                    position: track.from.lerp(track.to, ease_out_cubic(progress)),
                }
            })
            .collect()
    }

    pub fn is_finished(&self) -> bool {
        self.tracks
            .iter()
            .all(|track| self.elapsed_ms >= track.duration_ms)
    }

    /// Stops animating `id`; its final frame is no longer produced.
    pub fn remove_track(&mut self, id: EntryId) -> bool {
        let before = self.tracks.len();
        self.tracks.retain(|track| track.id != id);
        self.tracks.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    /// End positions of every track.
    pub fn final_frames(&self) -> Vec<AnimationFrame> {
        self.tracks
            .iter()
            .map(|track| AnimationFrame {
                id: track.id,
                position: track.to,
            })
            .collect()
    }
}

/// Cubic ease-out: fast start, gentle landing.
pub fn ease_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

#[cfg(test)]
mod tests {
    use super::{ease_out_cubic, LayoutAnimation};
    use crate::layout::hub::{HubLayoutPlan, LayoutMove};
    use crate::model::geometry::Point;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use uuid::Uuid;

    fn plan() -> HubLayoutPlan {
        HubLayoutPlan {
            groups: vec![vec![LayoutMove {
                id: Uuid::new_v4(),
                new_position: Point::new(100.0, 0.0),
                original_position: Point::new(0.0, 0.0),
            }]],
            skipped_groups: 0,
        }
    }

    #[test]
    fn ease_out_hits_endpoints_and_front_loads_motion() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert!(ease_out_cubic(0.5) > 0.5);
    }

    #[test]
    fn frames_progress_monotonically_and_finish_at_target() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut animation = LayoutAnimation::new(&plan(), 700, 900, &mut rng);

        let mut last_x = 0.0;
        for _ in 0..9 {
            let frame = animation.on_tick(100.0)[0];
            assert!(frame.position.x >= last_x);
            last_x = frame.position.x;
        }
        assert!(animation.is_finished());
        assert_eq!(last_x, 100.0);
    }

    #[test]
    fn removed_track_leaves_final_frames() {
        let plan = plan();
        let id = plan.groups[0][0].id;
        let mut animation = LayoutAnimation::new(&plan, 700, 900, &mut StdRng::seed_from_u64(2));

        assert!(animation.remove_track(id));
        assert!(!animation.remove_track(id));
        assert!(animation.is_empty());
        assert!(animation.final_frames().is_empty());
        assert!(animation.on_tick(100.0).is_empty());
    }

    #[test]
    fn not_finished_before_minimum_duration() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut animation = LayoutAnimation::new(&plan(), 700, 900, &mut rng);
        animation.on_tick(650.0);
        assert!(!animation.is_finished());
    }
}
