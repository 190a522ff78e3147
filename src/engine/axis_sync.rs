use std::cell::RefMut;
use std::ops::{Deref, DerefMut};

use crate::render::surface::{Axis, PlotSurface, SurfaceHandle, SurfaceId};

/// Mutable access to a surface with its range-change notifications muted.
/// The previous mute state is restored when the guard drops.
pub struct MutedNotifications<'a> {
    surface: RefMut<'a, dyn PlotSurface + 'static>,
    previous: bool,
}

impl<'a> MutedNotifications<'a> {
    pub fn new(mut surface: RefMut<'a, dyn PlotSurface + 'static>) -> Self {
        let previous = surface.set_notifications_muted(true);
        Self { surface, previous }
    }
}

impl Deref for MutedNotifications<'_> {
    type Target = dyn PlotSurface + 'static;

    fn deref(&self) -> &Self::Target {
        &*self.surface
    }
}

impl DerefMut for MutedNotifications<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.surface
    }
}

impl Drop for MutedNotifications<'_> {
    fn drop(&mut self) {
        self.surface.set_notifications_muted(self.previous);
    }
}

/// Groups of surfaces whose x or y ranges move together.
///
/// Groups on one axis are disjoint: linking a surface that already belongs
/// to a group merges the groups.
#[derive(Debug, Clone, Default)]
pub struct AxisSynchronizer {
    x_groups: Vec<Vec<SurfaceId>>,
    y_groups: Vec<Vec<SurfaceId>>,
}

impl AxisSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link the x axes of all `ids`. Fewer than two distinct surfaces is a no-op.
    pub fn link_x_axes(&mut self, ids: &[SurfaceId]) -> bool {
        merge_group(&mut self.x_groups, ids)
    }

    /// Link the y axis of `reference` with each of `others`.
    pub fn link_y_axes(&mut self, reference: SurfaceId, others: &[SurfaceId]) -> bool {
        let mut ids = Vec::with_capacity(others.len() + 1);
        ids.push(reference);
        ids.extend_from_slice(others);
        merge_group(&mut self.y_groups, &ids)
    }

    /// Remove a surface from every group.
    pub fn unlink(&mut self, id: SurfaceId) {
        for groups in [&mut self.x_groups, &mut self.y_groups] {
            for group in groups.iter_mut() {
                group.retain(|g| *g != id);
            }
            groups.retain(|g| g.len() >= 2);
        }
    }

    /// Surfaces that follow `id` on `axis`, excluding `id` itself.
    pub fn followers(&self, axis: Axis, id: SurfaceId) -> Vec<SurfaceId> {
        let groups = match axis {
            Axis::X => &self.x_groups,
            Axis::Y => &self.y_groups,
        };
        groups
            .iter()
            .find(|g| g.contains(&id))
            .map(|g| g.iter().copied().filter(|m| *m != id).collect())
            .unwrap_or_default()
    }

    pub fn is_linked(&self, axis: Axis, a: SurfaceId, b: SurfaceId) -> bool {
        self.followers(axis, a).contains(&b)
    }

    /// Drain every surface's pending range changes and force each one onto the
    /// leader's followers with their notifications muted, so no change echoes
    /// back. Returns the number of forced updates.
    pub fn propagate(&self, surfaces: &[(SurfaceId, SurfaceHandle)]) -> usize {
        let mut forced = 0;
        for (leader, handle) in surfaces {
            let changes = handle.borrow_mut().drain_range_changes();
            for change in changes {
                for follower in self.followers(change.axis, *leader) {
                    let Some((_, target)) = surfaces.iter().find(|(id, _)| *id == follower) else {
                        continue;
                    };
                    let mut muted = MutedNotifications::new(target.borrow_mut());
                    match change.axis {
                        Axis::X => muted.set_x_range(change.range),
                        Axis::Y => muted.set_y_range(change.range),
                    }
                    muted.replot();
                    forced += 1;
                }
            }
        }
        if forced > 0 {
            tracing::trace!("Forced {forced} linked range update(s)");
        }
        forced
    }
}

fn merge_group(groups: &mut Vec<Vec<SurfaceId>>, ids: &[SurfaceId]) -> bool {
    let mut merged: Vec<SurfaceId> = Vec::new();
    for id in ids {
        if !merged.contains(id) {
            merged.push(*id);
        }
    }
    if merged.len() < 2 {
        return false;
    }

    let mut i = 0;
    while i < groups.len() {
        if groups[i].iter().any(|g| merged.contains(g)) {
            let group = groups.remove(i);
            for id in group {
                if !merged.contains(&id) {
                    merged.push(id);
                }
            }
        } else {
            i += 1;
        }
    }
    groups.push(merged);
    true
}
