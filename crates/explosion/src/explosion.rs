use glam::DVec3;
use voxblast_common::{BlockPos, EntityId};
use voxblast_kernel::DamageCause;

use crate::damage::{DamageReport, EntityDamageModel};
use crate::error::ExplosionError;
use crate::mutator::{CommitStats, WorldMutator};
use crate::negotiation::{
    Dispatcher, PostExplosionContext, PreExplosionContext, Verdict, check_fire_chance,
    check_radius, check_yield,
};
use crate::options::ExplosionOptions;
use crate::random::RandomSource;
use crate::tracer::{BlockSet, TraceParams, TraceStats, VoxelRayTracer};
use crate::world::{BlastWorld, EntityAccess, ResistanceLookup, VoxelMutate, VoxelQuery};

/// Explosions below this radius do nothing.
pub const FIZZLE_RADIUS: f64 = 0.1;

/// Who or what set the explosion off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Causer {
    Entity(EntityId),
    Block(BlockPos),
    None,
}

impl Causer {
    pub fn entity(self) -> Option<EntityId> {
        match self {
            Self::Entity(id) => Some(id),
            _ => None,
        }
    }

    /// Attribution handed to the damage interface.
    pub fn damage_cause(self) -> DamageCause {
        match self {
            Self::Entity(by) => DamageCause::EntityExplosion { by },
            Self::Block(pos) => DamageCause::BlockExplosion { by: Some(pos) },
            Self::None => DamageCause::BlockExplosion { by: None },
        }
    }
}

/// The negotiation gate that stopped an explosion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pre,
    Post,
}

/// Everything a completed explosion did.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplosionSummary {
    pub radius: f64,
    pub yield_percent: f64,
    pub affected: BlockSet,
    pub ignitions: BlockSet,
    pub trace: TraceStats,
    pub damage: Vec<DamageReport>,
    pub commit: CommitStats,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExplosionOutcome {
    Exploded(ExplosionSummary),
    Cancelled(Phase),
    /// Radius fell below [`FIZZLE_RADIUS`]; the world is untouched.
    Fizzled,
}

impl ExplosionOutcome {
    pub fn summary(&self) -> Option<&ExplosionSummary> {
        match self {
            Self::Exploded(summary) => Some(summary),
            _ => None,
        }
    }
}

fn default_yield(radius: f64) -> f64 {
    (100.0 / radius).min(100.0)
}

/// One explosion: constructed, run once, discarded.
#[derive(Debug, Clone)]
pub struct Explosion {
    source: DVec3,
    radius: f64,
    causer: Causer,
    options: ExplosionOptions,
    yield_percent: f64,
    does_damage: bool,
    affected: BlockSet,
    ignitions: BlockSet,
    trace_stats: TraceStats,
}

impl Explosion {
    pub fn new(
        source: DVec3,
        radius: f64,
        causer: Causer,
        options: ExplosionOptions,
    ) -> Result<Self, ExplosionError> {
        if !source.is_finite() {
            return Err(ExplosionError::InvalidSource(source));
        }
        check_radius(radius)?;
        options.validate()?;
        Ok(Self {
            source,
            radius,
            causer,
            yield_percent: default_yield(radius),
            does_damage: options.does_damage,
            options,
            affected: BlockSet::new(),
            ignitions: BlockSet::new(),
            trace_stats: TraceStats::default(),
        })
    }

    pub fn source(&self) -> DVec3 {
        self.source
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn causer(&self) -> Causer {
        self.causer
    }

    pub fn options(&self) -> &ExplosionOptions {
        &self.options
    }

    pub fn yield_percent(&self) -> f64 {
        self.yield_percent
    }

    pub fn set_yield(&mut self, yield_percent: f64) -> Result<(), ExplosionError> {
        check_yield(yield_percent)?;
        self.yield_percent = yield_percent;
        Ok(())
    }

    pub fn fire_chance(&self) -> f64 {
        self.options.fire_chance
    }

    pub fn set_fire_chance(&mut self, chance: f64) -> Result<(), ExplosionError> {
        check_fire_chance(chance)?;
        self.options.fire_chance = chance;
        Ok(())
    }

    pub fn is_incendiary(&self) -> bool {
        self.options.fire_chance > 0.0
    }

    pub fn set_min_height(&mut self, min_height: i32) {
        self.options.min_height = min_height;
    }

    pub fn affected_blocks(&self) -> &BlockSet {
        &self.affected
    }

    pub fn ignitions(&self) -> &BlockSet {
        &self.ignitions
    }

    /// Cast rays and replace the candidate sets with the result.
    pub fn trace<W: VoxelQuery + ?Sized, R: ResistanceLookup + ?Sized>(
        &mut self,
        world: &W,
        resistance: &R,
        rng: &mut dyn RandomSource,
    ) -> Result<TraceStats, ExplosionError> {
        let params = TraceParams {
            source: self.source,
            radius: self.radius,
            ray_resolution: self.options.ray_resolution,
            step_length: self.options.step_length,
            fire_chance: self.options.fire_chance,
            block_breaking: self.options.block_breaking,
            min_height: self.options.min_height,
        };
        let result = VoxelRayTracer::new(resistance).trace(world, &params, rng)?;
        self.affected = result.affected;
        self.ignitions = result.ignitions;
        self.trace_stats = result.stats;
        Ok(result.stats)
    }

    /// Damage entities in range, then commit the candidate sets.
    pub fn apply<W: VoxelQuery + VoxelMutate + EntityAccess + ?Sized>(
        &self,
        world: &mut W,
        rng: &mut dyn RandomSource,
    ) -> Result<(Vec<DamageReport>, CommitStats), ExplosionError> {
        let model = EntityDamageModel {
            source: self.source,
            radius: self.radius,
            does_damage: self.does_damage,
            cause: self.causer.damage_cause(),
            exclude: self.causer.entity(),
        };
        let damage = model.apply(world)?;
        let commit = WorldMutator::new(self.source, self.yield_percent).commit(
            world,
            &self.affected,
            &self.ignitions,
            rng,
        )?;
        Ok((damage, commit))
    }

    fn causer_is_submerged_explosive<W: EntityAccess + ?Sized>(&self, world: &W) -> bool {
        self.causer
            .entity()
            .and_then(|id| world.entity(id))
            .is_some_and(|view| view.explosive && view.underwater)
    }

    fn negotiate_pre<D: Dispatcher + ?Sized>(
        &mut self,
        dispatcher: &mut D,
    ) -> Result<Verdict, ExplosionError> {
        let mut ctx = PreExplosionContext::new(self.source, self.causer.entity());
        ctx.set_force(self.radius)?;
        ctx.set_fire_chance(self.options.fire_chance)?;
        ctx.set_block_breaking(self.options.block_breaking);

        if dispatcher.dispatch_pre(&mut ctx) == Verdict::Cancel {
            return Ok(Verdict::Cancel);
        }

        check_radius(ctx.force())?;
        if ctx.force() != self.radius {
            self.radius = ctx.force();
            self.yield_percent = default_yield(self.radius);
        }
        self.set_fire_chance(ctx.fire_chance())?;
        self.options.block_breaking = ctx.block_breaking();
        Ok(Verdict::Continue)
    }

    fn negotiate_post<D: Dispatcher + ?Sized>(
        &mut self,
        dispatcher: &mut D,
    ) -> Result<Verdict, ExplosionError> {
        let affected = std::mem::take(&mut self.affected);
        let mut ctx = match self.causer {
            Causer::Entity(id) => {
                PostExplosionContext::entity(id, self.source, self.yield_percent, affected)?
            }
            Causer::Block(pos) => PostExplosionContext::block(
                pos,
                self.source,
                self.yield_percent,
                affected,
                std::mem::take(&mut self.ignitions),
                self.options.fire_chance,
            )?,
            Causer::None => {
                self.affected = affected;
                return Ok(Verdict::Continue);
            }
        };

        let verdict = dispatcher.dispatch_post(&mut ctx);
        if let Some(chance) = ctx.fire_chance() {
            self.options.fire_chance = chance;
        }
        let (yield_percent, affected, ignitions) = ctx.into_parts();
        self.yield_percent = yield_percent;
        self.affected = affected;
        if let Some(ignitions) = ignitions {
            self.ignitions = ignitions;
        }
        Ok(verdict)
    }

    /// Run every phase against `world`. Consumes the explosion.
    pub fn run<W: BlastWorld + ?Sized, D: Dispatcher + ?Sized>(
        mut self,
        world: &mut W,
        dispatcher: &mut D,
        rng: &mut dyn RandomSource,
    ) -> Result<ExplosionOutcome, ExplosionError> {
        let _span = tracing::info_span!("explosion", radius = self.radius, causer = ?self.causer).entered();

        if self.negotiate_pre(dispatcher)? == Verdict::Cancel {
            tracing::debug!("cancelled before tracing");
            return Ok(ExplosionOutcome::Cancelled(Phase::Pre));
        }

        if self.causer_is_submerged_explosive(&*world) {
            tracing::debug!("causer is underwater, blast is harmless");
            self.does_damage = false;
        } else if self.radius < FIZZLE_RADIUS {
            tracing::debug!(radius = self.radius, "fizzled");
            return Ok(ExplosionOutcome::Fizzled);
        } else {
            let world_ref: &W = world;
            self.trace(world_ref, world_ref, rng)?;
        }

        if self.negotiate_post(dispatcher)? == Verdict::Cancel {
            tracing::debug!("cancelled after tracing");
            return Ok(ExplosionOutcome::Cancelled(Phase::Post));
        }

        let (damage, commit) = self.apply(world, rng)?;
        tracing::debug!(
            affected = self.affected.len(),
            ignitions = self.ignitions.len(),
            hit = damage.len(),
            "explosion committed"
        );

        Ok(ExplosionOutcome::Exploded(ExplosionSummary {
            radius: self.radius,
            yield_percent: self.yield_percent,
            affected: self.affected,
            ignitions: self.ignitions,
            trace: self.trace_stats,
            damage,
            commit,
        }))
    }
}
