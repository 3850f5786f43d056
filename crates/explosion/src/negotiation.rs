//! Cancellable checkpoints that let observers veto or rewrite an explosion
//! before it touches the world.

use glam::DVec3;
use voxblast_common::{BlockPos, EntityId};

use crate::error::ExplosionError;
use crate::tracer::BlockSet;

/// Shared cancellation flag of every negotiation context.
pub trait Cancellable {
    fn cancelled(&self) -> bool;

    fn set_cancelled(&mut self, cancelled: bool);

    fn cancel(&mut self) {
        self.set_cancelled(true);
    }
}

/// Result of dispatching a context to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Cancel,
}

impl Verdict {
    pub fn of(ctx: &impl Cancellable) -> Self {
        if ctx.cancelled() {
            Self::Cancel
        } else {
            Self::Continue
        }
    }
}

pub(crate) fn check_fire_chance(chance: f64) -> Result<(), ExplosionError> {
    if (0.0..=1.0).contains(&chance) {
        Ok(())
    } else {
        Err(ExplosionError::FireChanceOutOfRange(chance))
    }
}

pub(crate) fn check_yield(yield_percent: f64) -> Result<(), ExplosionError> {
    if (0.0..=100.0).contains(&yield_percent) {
        Ok(())
    } else {
        Err(ExplosionError::YieldOutOfRange(yield_percent))
    }
}

pub(crate) fn check_radius(radius: f64) -> Result<(), ExplosionError> {
    if radius.is_finite() && radius > 0.0 {
        Ok(())
    } else {
        Err(ExplosionError::InvalidRadius(radius))
    }
}

/// Parameters observers may rewrite before any ray is cast.
#[derive(Debug, Clone, PartialEq)]
pub struct PreExplosionContext {
    source: DVec3,
    causer: Option<EntityId>,
    force: f64,
    fire_chance: f64,
    block_breaking: bool,
    cancelled: bool,
}

impl PreExplosionContext {
    /// Force 4.0, fire chance 1.0, block breaking on.
    pub fn new(source: DVec3, causer: Option<EntityId>) -> Self {
        Self {
            source,
            causer,
            force: 4.0,
            fire_chance: 1.0,
            block_breaking: true,
            cancelled: false,
        }
    }

    pub fn source(&self) -> DVec3 {
        self.source
    }

    pub fn causer(&self) -> Option<EntityId> {
        self.causer
    }

    pub fn force(&self) -> f64 {
        self.force
    }

    pub fn set_force(&mut self, force: f64) -> Result<(), ExplosionError> {
        check_radius(force)?;
        self.force = force;
        Ok(())
    }

    pub fn fire_chance(&self) -> f64 {
        self.fire_chance
    }

    pub fn set_fire_chance(&mut self, chance: f64) -> Result<(), ExplosionError> {
        check_fire_chance(chance)?;
        self.fire_chance = chance;
        Ok(())
    }

    pub fn is_incendiary(&self) -> bool {
        self.fire_chance > 0.0
    }

    /// Turning fire off zeroes the chance; turning it on keeps a positive
    /// chance and otherwise falls back to 1/3.
    pub fn set_incendiary(&mut self, incendiary: bool) {
        if !incendiary {
            self.fire_chance = 0.0;
        } else if self.fire_chance <= 0.0 {
            self.fire_chance = 1.0 / 3.0;
        }
    }

    pub fn block_breaking(&self) -> bool {
        self.block_breaking
    }

    pub fn set_block_breaking(&mut self, block_breaking: bool) {
        self.block_breaking = block_breaking;
    }
}

impl Cancellable for PreExplosionContext {
    fn cancelled(&self) -> bool {
        self.cancelled
    }

    fn set_cancelled(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
    }
}

/// Post-trace view for explosions caused by an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityExplosionContext {
    causer: EntityId,
    source: DVec3,
    yield_percent: f64,
    blocks: BlockSet,
    cancelled: bool,
}

/// Post-trace view for explosions caused by a block. Carries the ignition set
/// in addition to the affected blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockExplosionContext {
    causer: BlockPos,
    source: DVec3,
    yield_percent: f64,
    blocks: BlockSet,
    ignitions: BlockSet,
    fire_chance: f64,
    cancelled: bool,
}

/// The candidate sets of a traced explosion, open to rewriting.
#[derive(Debug, Clone, PartialEq)]
pub enum PostExplosionContext {
    Entity(EntityExplosionContext),
    Block(BlockExplosionContext),
}

impl PostExplosionContext {
    pub fn entity(
        causer: EntityId,
        source: DVec3,
        yield_percent: f64,
        blocks: BlockSet,
    ) -> Result<Self, ExplosionError> {
        check_yield(yield_percent)?;
        Ok(Self::Entity(EntityExplosionContext {
            causer,
            source,
            yield_percent,
            blocks,
            cancelled: false,
        }))
    }

    pub fn block(
        causer: BlockPos,
        source: DVec3,
        yield_percent: f64,
        blocks: BlockSet,
        ignitions: BlockSet,
        fire_chance: f64,
    ) -> Result<Self, ExplosionError> {
        check_yield(yield_percent)?;
        Ok(Self::Block(BlockExplosionContext {
            causer,
            source,
            yield_percent,
            blocks,
            ignitions,
            fire_chance,
            cancelled: false,
        }))
    }

    pub fn source(&self) -> DVec3 {
        match self {
            Self::Entity(ctx) => ctx.source,
            Self::Block(ctx) => ctx.source,
        }
    }

    pub fn causer_entity(&self) -> Option<EntityId> {
        match self {
            Self::Entity(ctx) => Some(ctx.causer),
            Self::Block(_) => None,
        }
    }

    pub fn causer_block(&self) -> Option<BlockPos> {
        match self {
            Self::Entity(_) => None,
            Self::Block(ctx) => Some(ctx.causer),
        }
    }

    pub fn yield_percent(&self) -> f64 {
        match self {
            Self::Entity(ctx) => ctx.yield_percent,
            Self::Block(ctx) => ctx.yield_percent,
        }
    }

    pub fn set_yield(&mut self, yield_percent: f64) -> Result<(), ExplosionError> {
        check_yield(yield_percent)?;
        match self {
            Self::Entity(ctx) => ctx.yield_percent = yield_percent,
            Self::Block(ctx) => ctx.yield_percent = yield_percent,
        }
        Ok(())
    }

    pub fn blocks(&self) -> &BlockSet {
        match self {
            Self::Entity(ctx) => &ctx.blocks,
            Self::Block(ctx) => &ctx.blocks,
        }
    }

    pub fn blocks_mut(&mut self) -> &mut BlockSet {
        match self {
            Self::Entity(ctx) => &mut ctx.blocks,
            Self::Block(ctx) => &mut ctx.blocks,
        }
    }

    pub fn set_blocks(&mut self, blocks: BlockSet) {
        *self.blocks_mut() = blocks;
    }

    /// `None` for entity-caused explosions, whose ignitions are not negotiable.
    pub fn ignitions(&self) -> Option<&BlockSet> {
        match self {
            Self::Entity(_) => None,
            Self::Block(ctx) => Some(&ctx.ignitions),
        }
    }

    pub fn ignitions_mut(&mut self) -> Option<&mut BlockSet> {
        match self {
            Self::Entity(_) => None,
            Self::Block(ctx) => Some(&mut ctx.ignitions),
        }
    }

    /// Returns false (and drops `ignitions`) for entity-caused explosions.
    pub fn set_ignitions(&mut self, ignitions: BlockSet) -> bool {
        match self.ignitions_mut() {
            Some(slot) => {
                *slot = ignitions;
                true
            }
            None => false,
        }
    }

    pub fn fire_chance(&self) -> Option<f64> {
        match self {
            Self::Entity(_) => None,
            Self::Block(ctx) => Some(ctx.fire_chance),
        }
    }

    pub fn set_fire_chance(&mut self, chance: f64) -> Result<bool, ExplosionError> {
        check_fire_chance(chance)?;
        match self {
            Self::Entity(_) => Ok(false),
            Self::Block(ctx) => {
                ctx.fire_chance = chance;
                Ok(true)
            }
        }
    }

    /// Split back into `(yield, blocks, ignitions)`.
    pub fn into_parts(self) -> (f64, BlockSet, Option<BlockSet>) {
        match self {
            Self::Entity(ctx) => (ctx.yield_percent, ctx.blocks, None),
            Self::Block(ctx) => (ctx.yield_percent, ctx.blocks, Some(ctx.ignitions)),
        }
    }
}

impl Cancellable for PostExplosionContext {
    fn cancelled(&self) -> bool {
        match self {
            Self::Entity(ctx) => ctx.cancelled,
            Self::Block(ctx) => ctx.cancelled,
        }
    }

    fn set_cancelled(&mut self, cancelled: bool) {
        match self {
            Self::Entity(ctx) => ctx.cancelled = cancelled,
            Self::Block(ctx) => ctx.cancelled = cancelled,
        }
    }
}

/// Game logic hooked into explosions. Both hooks default to doing nothing.
pub trait ExplosionObserver {
    fn on_pre_explosion(&mut self, _ctx: &mut PreExplosionContext) {}

    fn on_post_explosion(&mut self, _ctx: &mut PostExplosionContext) {}
}

/// Runs observers against a context and reports whether it ended cancelled.
pub trait Dispatcher {
    fn dispatch_pre(&mut self, ctx: &mut PreExplosionContext) -> Verdict;

    fn dispatch_post(&mut self, ctx: &mut PostExplosionContext) -> Verdict;
}

/// Dispatcher with nobody listening.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoObservers;

impl Dispatcher for NoObservers {
    fn dispatch_pre(&mut self, ctx: &mut PreExplosionContext) -> Verdict {
        Verdict::of(&*ctx)
    }

    fn dispatch_post(&mut self, ctx: &mut PostExplosionContext) -> Verdict {
        Verdict::of(&*ctx)
    }
}

/// Observer ordering. `Highest` runs first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventPriority {
    Highest,
    High,
    #[default]
    Normal,
    Low,
    Lowest,
}

struct Registration {
    priority: EventPriority,
    ignore_cancelled: bool,
    observer: Box<dyn ExplosionObserver>,
}

/// Priority-ordered observer list.
///
/// Within one priority, observers run in registration order. Observers that
/// ignore cancelled events are skipped once an earlier one cancelled; anyone
/// else may still un-cancel.
#[derive(Default)]
pub struct ObserverRegistry {
    entries: Vec<Registration>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, priority: EventPriority, observer: impl ExplosionObserver + 'static) {
        self.register_with(priority, false, observer);
    }

    pub fn register_with(
        &mut self,
        priority: EventPriority,
        ignore_cancelled: bool,
        observer: impl ExplosionObserver + 'static,
    ) {
        let at = self.entries.partition_point(|e| e.priority <= priority);
        self.entries.insert(
            at,
            Registration {
                priority,
                ignore_cancelled,
                observer: Box::new(observer),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn run<C: Cancellable>(
        &mut self,
        ctx: &mut C,
        hook: impl Fn(&mut dyn ExplosionObserver, &mut C),
    ) -> Verdict {
        for entry in &mut self.entries {
            if entry.ignore_cancelled && ctx.cancelled() {
                continue;
            }
            hook(entry.observer.as_mut(), &mut *ctx);
        }
        Verdict::of(&*ctx)
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.entries.len())
            .finish()
    }
}

impl Dispatcher for ObserverRegistry {
    fn dispatch_pre(&mut self, ctx: &mut PreExplosionContext) -> Verdict {
        self.run(ctx, |observer, ctx| observer.on_pre_explosion(ctx))
    }

    fn dispatch_post(&mut self, ctx: &mut PostExplosionContext) -> Verdict {
        self.run(ctx, |observer, ctx| observer.on_post_explosion(ctx))
    }
}

/// Adapts a closure into a pre-explosion observer.
pub struct PreHook<F>(pub F);

impl<F: FnMut(&mut PreExplosionContext)> ExplosionObserver for PreHook<F> {
    fn on_pre_explosion(&mut self, ctx: &mut PreExplosionContext) {
        (self.0)(ctx);
    }
}

/// Adapts a closure into a post-explosion observer.
pub struct PostHook<F>(pub F);

impl<F: FnMut(&mut PostExplosionContext)> ExplosionObserver for PostHook<F> {
    fn on_post_explosion(&mut self, ctx: &mut PostExplosionContext) {
        (self.0)(ctx);
    }
}
