use glam::DVec3;
use voxblast_common::{Aabb, EntityId};
use voxblast_kernel::DamageCause;

use crate::error::ExplosionError;
use crate::los::line_of_sight;
use crate::world::{DamageOutcome, EntityAccess, EntityView, Hit, VoxelQuery};

/// Fraction of sample points on `bounds` with a clear line to `source`.
///
/// Exactly 1.0 when the source is strictly inside the box.
pub fn seen_percent<W: VoxelQuery + ?Sized>(world: &W, source: DVec3, bounds: &Aabb) -> f64 {
    if bounds.contains_point(source) {
        return 1.0;
    }

    let extent = bounds.extent();
    let spacing = DVec3::new(
        1.0 / (extent.x * 2.0 + 1.0),
        1.0 / (extent.y * 2.0 + 1.0),
        1.0 / (extent.z * 2.0 + 1.0),
    );
    if !spacing.is_finite() || spacing.min_element() <= 0.0 {
        return 0.0;
    }
    let centering = |s: f64| (1.0 - (1.0 / s).floor() * s) / 2.0;
    let offset = DVec3::new(centering(spacing.x), centering(spacing.y), centering(spacing.z));

    let mut visible = 0u32;
    let mut total = 0u32;
    let mut i = 0.0;
    while i <= 1.0 {
        let mut j = 0.0;
        while j <= 1.0 {
            let mut k = 0.0;
            while k <= 1.0 {
                let target = bounds.min + DVec3::new(i, j, k) * extent + offset;
                if line_of_sight(world, source, target).is_clear() {
                    visible += 1;
                }
                total += 1;
                k += spacing.z;
            }
            j += spacing.y;
        }
        i += spacing.x;
    }

    if total == 0 {
        return 0.0;
    }
    f64::from(visible) / f64::from(total)
}

/// Exposure before mitigation. `occlusion` is the hidden fraction of the target.
pub fn exposure(normalized_distance: f64, occlusion: f64) -> f64 {
    ((1.0 - normalized_distance) * (1.0 - occlusion)).max(0.0)
}

/// Each top-tier armor piece takes off 12.5%, never below half.
pub fn armor_multiplier(top_tier_pieces: u32) -> f64 {
    (1.0 - 0.125 * f64::from(top_tier_pieces)).max(0.5)
}

/// A blocking entity facing the source takes nothing.
pub fn shield_blocks(view: &EntityView, source: DVec3) -> bool {
    if !(view.blocking && view.holds_blocking_item) {
        return false;
    }
    let facing = view.facing.normalize_or_zero();
    let to_source = (source - view.eye_position).normalize_or_zero();
    facing.dot(to_source) > 0.5
}

/// Damage dealt at a given exposure.
pub fn damage_amount(exposure: f64, diameter: f64, does_damage: bool) -> f32 {
    if !does_damage {
        return 0.0;
    }
    let raw = ((exposure * exposure + exposure) / 2.0 * 5.0 * diameter).floor() + 1.0;
    raw.max(0.0) as f32
}

/// Integer-aligned box searched for entities: `diameter + 1` around the source.
pub fn search_box(source: DVec3, radius: f64) -> Aabb {
    let reach = DVec3::splat(radius * 2.0 + 1.0);
    Aabb::new((source - reach).floor(), (source + reach).ceil())
}

/// What happened to one entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageReport {
    pub id: EntityId,
    pub seen: f64,
    /// Mitigated exposure.
    pub exposure: f64,
    pub damage: f32,
    /// Blocked by a raised shield; no damage at all.
    pub shielded: bool,
    pub cancelled: bool,
    pub knockback: Option<DVec3>,
}

/// Converts distance, visibility and equipment into damage and knockback for
/// everything in range.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDamageModel {
    pub source: DVec3,
    pub radius: f64,
    pub does_damage: bool,
    pub cause: DamageCause,
    /// Usually the causing entity.
    pub exclude: Option<EntityId>,
}

impl EntityDamageModel {
    pub fn diameter(&self) -> f64 {
        self.radius * 2.0
    }

    /// Exposure for one entity after armor and shield mitigation.
    pub fn exposure_for<W: VoxelQuery + ?Sized>(&self, world: &W, view: &EntityView) -> (f64, f64) {
        let distance = (view.position.distance(self.source) / self.diameter()).min(1.0);
        let seen = seen_percent(world, self.source, &view.bounds);
        let mut exposure = exposure(distance, 1.0 - seen);
        exposure *= armor_multiplier(view.top_tier_armor);
        if shield_blocks(view, self.source) {
            exposure = 0.0;
        }
        (seen, exposure)
    }

    pub fn apply<W: VoxelQuery + EntityAccess + ?Sized>(
        &self,
        world: &mut W,
    ) -> Result<Vec<DamageReport>, ExplosionError> {
        let area = search_box(self.source, self.radius);
        let mut reports = Vec::new();

        for id in world.nearby_entities(&area, self.exclude) {
            let Some(view) = world.entity(id) else {
                continue;
            };
            let (seen, exposure) = self.exposure_for(&*world, &view);
            let shielded = shield_blocks(&view, self.source);
            let damage = if shielded {
                0.0
            } else {
                damage_amount(exposure, self.diameter(), self.does_damage)
            };

            let outcome = world.attack(
                id,
                Hit {
                    amount: damage,
                    cause: self.cause,
                },
            )?;
            let cancelled = outcome == DamageOutcome::Cancelled;

            let knockback = if view.holds_blocking_item && !cancelled {
                let push = (view.position - self.source).normalize_or_zero() * exposure;
                world.add_velocity(id, push)?;
                Some(push)
            } else {
                None
            };

            tracing::trace!(?id, seen, exposure, damage, shielded, cancelled, "entity hit");
            reports.push(DamageReport {
                id,
                seen,
                exposure,
                damage,
                shielded,
                cancelled,
                knockback,
            });
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxblast_common::BlockPos;
    use voxblast_kernel::{ArmorTier, BlockTypeId, EntityData, ItemKind, ItemStack, World};

    fn world() -> World {
        let mut w = World::new();
        w.load_area(BlockPos::new(-32, -16, -32), BlockPos::new(31, 15, 31));
        w
    }

    fn model(source: DVec3, radius: f64) -> EntityDamageModel {
        EntityDamageModel {
            source,
            radius,
            does_damage: true,
            cause: DamageCause::BlockExplosion { by: None },
            exclude: None,
        }
    }

    fn view(bounds: Aabb) -> EntityView {
        EntityView {
            bounds,
            position: (bounds.min + bounds.max) / 2.0,
            eye_position: bounds.max,
            facing: DVec3::Z,
            top_tier_armor: 0,
            blocking: false,
            holds_blocking_item: false,
            explosive: false,
            underwater: false,
        }
    }

    #[test]
    fn seen_percent_is_one_inside_box() {
        let w = world();
        let bb = Aabb::new(DVec3::splat(-1.0), DVec3::splat(1.0));
        assert_eq!(seen_percent(&w, DVec3::ZERO, &bb), 1.0);
    }

    #[test]
    fn seen_percent_open_air_is_one() {
        let w = world();
        let bb = Aabb::from_feet(DVec3::new(5.0, 0.0, 0.0), 0.6, 1.8);
        assert_eq!(seen_percent(&w, DVec3::new(0.5, 0.5, 0.5), &bb), 1.0);
    }

    #[test]
    fn seen_percent_behind_wall_is_zero() {
        let mut w = world();
        w.fill(BlockPos::new(3, -8, -8), BlockPos::new(3, 8, 8), BlockTypeId::STONE)
            .unwrap();
        let bb = Aabb::from_feet(DVec3::new(6.0, 0.0, 0.5), 0.6, 1.8);
        assert_eq!(seen_percent(&w, DVec3::new(0.5, 0.5, 0.5), &bb), 0.0);
    }

    #[test]
    fn partial_cover_is_fractional() {
        let mut w = world();
        // waist-high wall: lower samples are hidden, upper ones are not
        w.fill(BlockPos::new(3, 0, -8), BlockPos::new(3, 0, 8), BlockTypeId::STONE)
            .unwrap();
        let bb = Aabb::from_feet(DVec3::new(6.0, 0.0, 0.5), 0.6, 1.8);
        let seen = seen_percent(&w, DVec3::new(0.5, 0.5, 0.5), &bb);
        assert!(seen > 0.0 && seen < 1.0, "seen = {seen}");
    }

    #[test]
    fn exposure_formula() {
        assert_eq!(exposure(0.0, 0.0), 1.0);
        assert_eq!(exposure(1.0, 0.0), 0.0);
        assert_eq!(exposure(0.5, 0.5), 0.25);
        assert_eq!(exposure(0.2, 1.0), 0.0);
    }

    #[test]
    fn armor_multiplier_floors_at_half() {
        assert_eq!(armor_multiplier(0), 1.0);
        assert_eq!(armor_multiplier(2), 0.75);
        assert_eq!(armor_multiplier(4), 0.5);
        assert_eq!(armor_multiplier(6), 0.5);
    }

    #[test]
    fn damage_amount_formula() {
        // full exposure, diameter 8: floor(1 * 5 * 8) + 1
        assert_eq!(damage_amount(1.0, 8.0, true), 41.0);
        assert_eq!(damage_amount(0.0, 8.0, true), 1.0);
        assert_eq!(damage_amount(1.0, 8.0, false), 0.0);
    }

    #[test]
    fn search_box_is_integer_aligned() {
        let bb = search_box(DVec3::new(0.5, 0.5, 0.5), 4.0);
        assert_eq!(bb.min, DVec3::splat(-9.0));
        assert_eq!(bb.max, DVec3::splat(10.0));
    }

    #[test]
    fn enclosing_box_gets_full_exposure() {
        let w = world();
        let m = model(DVec3::new(0.5, 0.5, 0.5), 4.0);
        // box encloses the source, position coincides with it
        let mut v = view(Aabb::new(DVec3::splat(-1.0), DVec3::splat(2.0)));
        v.position = m.source;
        let (seen, exposure) = m.exposure_for(&w, &v);
        assert_eq!(seen, 1.0);
        assert_eq!(exposure, 1.0);
    }

    #[test]
    fn shield_facing_source_blocks_everything() {
        let w = world();
        let m = model(DVec3::new(0.5, 1.5, 4.5), 4.0);
        let mut v = view(Aabb::from_feet(DVec3::new(0.5, 0.0, 0.5), 0.6, 1.8));
        v.eye_position = DVec3::new(0.5, 1.62, 0.5);
        v.blocking = true;
        v.holds_blocking_item = true;
        v.facing = DVec3::Z;
        let (_, exposure) = m.exposure_for(&w, &v);
        assert_eq!(exposure, 0.0);
        assert!(shield_blocks(&v, m.source));

        // turned away
        v.facing = -DVec3::Z;
        assert!(m.exposure_for(&w, &v).1 > 0.0);
    }

    #[test]
    fn shield_requires_stance() {
        let mut v = view(Aabb::from_feet(DVec3::ZERO, 0.6, 1.8));
        v.holds_blocking_item = true;
        assert!(!shield_blocks(&v, DVec3::new(0.0, 1.6, 5.0)));
    }

    #[test]
    fn apply_damages_and_reports() {
        let mut w = world();
        let near = w.spawn(EntityData::player(DVec3::new(2.5, 0.0, 0.5)));
        let far = w.spawn(EntityData::player(DVec3::new(30.0, 0.0, 0.5)));
        let m = model(DVec3::new(0.5, 0.5, 0.5), 4.0);

        let reports = m.apply(&mut w).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].id, near);
        assert!(reports[0].damage > 1.0);
        assert!(w.get(near).unwrap().health < 20.0);
        assert_eq!(w.get(far).unwrap().health, 20.0);
        assert!(reports[0].knockback.is_none());
    }

    #[test]
    fn apply_skips_excluded_causer() {
        let mut w = world();
        let causer = w.spawn(EntityData::primed_explosive(DVec3::new(0.5, 0.0, 0.5), 0));
        let mut m = model(DVec3::new(0.5, 0.0, 0.5), 4.0);
        m.exclude = Some(causer);
        assert!(m.apply(&mut w).unwrap().is_empty());
    }

    #[test]
    fn netherite_reduces_damage() {
        let mut w = world();
        let bare = w.spawn(EntityData::player(DVec3::new(2.5, 0.0, 0.5)));
        let armored = w.spawn(
            EntityData::player(DVec3::new(2.5, 0.0, 0.5)).with_armor(vec![
                ItemStack::new(ItemKind::Armor(ArmorTier::Netherite), 1);
                4
            ]),
        );
        let reports = model(DVec3::new(0.5, 0.5, 0.5), 4.0).apply(&mut w).unwrap();
        let of = |id| reports.iter().find(|r| r.id == id).unwrap();
        assert!((of(armored).exposure - of(bare).exposure * 0.5).abs() < 1e-9);
        assert!(of(armored).damage < of(bare).damage);
    }

    #[test]
    fn raised_shield_takes_no_damage() {
        let mut w = world();
        let guard = w.spawn(
            EntityData::player(DVec3::new(0.5, 0.0, 3.5))
                .holding(ItemStack::new(ItemKind::Shield, 1))
                .sneaking(true)
                .facing(-DVec3::Z),
        );
        let reports = model(DVec3::new(0.5, 0.5, 0.5), 4.0).apply(&mut w).unwrap();

        assert_eq!(reports.len(), 1);
        assert!(reports[0].shielded);
        assert_eq!(reports[0].damage, 0.0);
        assert_eq!(w.get(guard).unwrap().health, 20.0);
    }

    #[test]
    fn shield_holder_is_knocked_back_unless_cancelled() {
        let mut w = world();
        let shield = ItemStack::new(ItemKind::Shield, 1);
        let pushed = w.spawn(EntityData::player(DVec3::new(2.5, 0.0, 0.5)).holding(shield.clone()));
        let immune = w.spawn(EntityData::player(DVec3::new(-1.5, 0.0, 0.5)).holding(shield));
        w.get_mut(immune).unwrap().invulnerable = true;

        let reports = model(DVec3::new(0.5, 0.5, 0.5), 4.0).apply(&mut w).unwrap();
        let of = |id| reports.iter().find(|r| r.id == id).unwrap();

        assert!(of(pushed).knockback.unwrap().x > 0.0);
        assert!(w.get(pushed).unwrap().velocity.x > 0.0);
        assert!(of(immune).cancelled);
        assert!(of(immune).knockback.is_none());
        assert_eq!(w.get(immune).unwrap().velocity, DVec3::ZERO);
    }
}
