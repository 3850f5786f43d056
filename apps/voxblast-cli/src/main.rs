use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use glam::DVec3;
use tracing_subscriber::EnvFilter;
use voxblast_common::BlockPos;
use voxblast_explosion::{
    Causer, EventPriority, Explosion, ExplosionOptions, ExplosionOutcome, ObserverRegistry,
    PostExplosionContext, PostHook, SeededRandom, ray_count,
};
use voxblast_kernel::{BlockTypeId, EntityData, ItemKind, ItemStack, World};

#[derive(Parser)]
#[command(name = "voxblast-cli", about = "CLI tool for voxblast explosions")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum CauserArg {
    /// No causer; the post-trace gate is skipped
    None,
    /// The block at the blast source
    Block,
    /// A primed explosive spawned at the blast source
    Entity,
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate versions and default options
    Info,
    /// Detonate one explosion in the demo world and report what happened
    Detonate {
        /// Explosion radius
        #[arg(short, long, default_value = "4.0")]
        radius: f64,
        /// RNG seed
        #[arg(short, long, default_value = "42")]
        seed: u64,
        /// Chance for each eligible voxel to catch fire, in [0, 1]
        #[arg(short, long)]
        fire_chance: Option<f64>,
        /// Options file (.yaml, .yml or .json)
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long, value_enum, default_value = "block")]
        causer: CauserArg,
        /// Keep every block below this height out of the post-trace set
        #[arg(long)]
        protect_below: Option<i32>,
    },
    /// Detonate twice with the same seed and compare world hashes
    Replay {
        #[arg(short, long, default_value = "42")]
        seed: u64,
        #[arg(short, long, default_value = "4.0")]
        radius: f64,
    },
    /// Print effective options as YAML
    Config {
        /// Options file to load instead of the defaults
        path: Option<PathBuf>,
    },
}

/// Layered terrain with a plank hut, a charge, a chest and a few bystanders.
fn demo_world() -> anyhow::Result<World> {
    let mut world = World::new();
    world.load_area(BlockPos::new(-32, -16, -32), BlockPos::new(31, 15, 31));
    world.fill(BlockPos::new(-24, -14, -24), BlockPos::new(23, -14, 23), BlockTypeId::BEDROCK)?;
    world.fill(BlockPos::new(-24, -13, -24), BlockPos::new(23, -5, 23), BlockTypeId::STONE)?;
    world.fill(BlockPos::new(-24, -4, -24), BlockPos::new(23, -1, 23), BlockTypeId::DIRT)?;

    world.fill(BlockPos::new(3, 0, -3), BlockPos::new(7, 3, 3), BlockTypeId::PLANKS)?;
    world.fill(BlockPos::new(4, 0, -2), BlockPos::new(6, 2, 2), BlockTypeId::AIR)?;
    world.fill(BlockPos::new(-6, 0, 6), BlockPos::new(-4, 2, 6), BlockTypeId::OBSIDIAN)?;
    world.set_block(BlockPos::new(-2, 0, 1), BlockTypeId::TNT)?;
    world.set_block(BlockPos::new(1, 0, -2), BlockTypeId::CHEST)?;
    if let Some(tile) = world.tile_mut(BlockPos::new(1, 0, -2)) {
        tile.contents.push(ItemStack::new(ItemKind::Block(BlockTypeId::DIRT), 16));
    }

    world.spawn(EntityData::player(DVec3::new(-2.5, 0.0, -2.5)));
    world.spawn(EntityData::player(DVec3::new(5.5, 0.0, 0.5)));
    world.spawn(
        EntityData::player(DVec3::new(0.5, 0.0, 4.5))
            .holding(ItemStack::new(ItemKind::Shield, 1))
            .sneaking(true)
            .facing(-DVec3::Z),
    );
    world.spawn(EntityData::mob(DVec3::new(-5.5, 0.0, 8.5), 0.6, 1.9));
    Ok(world)
}

fn source() -> DVec3 {
    DVec3::new(0.5, 0.5, 0.5)
}

fn detonate(
    world: &mut World,
    radius: f64,
    seed: u64,
    options: ExplosionOptions,
    causer: CauserArg,
    protect_below: Option<i32>,
) -> anyhow::Result<ExplosionOutcome> {
    let causer = match causer {
        CauserArg::None => Causer::None,
        CauserArg::Block => Causer::Block(BlockPos::floored(source())),
        CauserArg::Entity => {
            let id = world.spawn(EntityData::primed_explosive(source() - DVec3::new(0.0, 0.5, 0.0), 0));
            Causer::Entity(id)
        }
    };

    let mut observers = ObserverRegistry::new();
    if let Some(floor) = protect_below {
        observers.register(
            EventPriority::Normal,
            PostHook(move |ctx: &mut PostExplosionContext| {
                ctx.blocks_mut().retain(|block| block.pos.y >= floor);
            }),
        );
    }

    tracing::info!(radius, seed, ?causer, fire_chance = options.fire_chance, "detonating");
    let explosion = Explosion::new(source(), radius, causer, options)?;
    let outcome = explosion.run(world, &mut observers, &mut SeededRandom::seeded(seed))?;
    match &outcome {
        ExplosionOutcome::Exploded(summary) => tracing::info!(
            affected = summary.affected.len(),
            hit = summary.damage.len(),
            "detonation committed"
        ),
        other => tracing::info!(?other, "detonation had no effect"),
    }
    Ok(outcome)
}

fn load_options(path: Option<&PathBuf>) -> anyhow::Result<ExplosionOptions> {
    Ok(match path {
        Some(path) => ExplosionOptions::load(path)?,
        None => ExplosionOptions::default(),
    })
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            let options = ExplosionOptions::default();
            println!("voxblast-cli v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "explosion: resolution={}, rays={}, step={}",
                options.ray_resolution,
                ray_count(options.ray_resolution),
                options.step_length
            );
            println!("kernel: {} block types registered", World::new().registry().len());
        }
        Commands::Detonate {
            radius,
            seed,
            fire_chance,
            config,
            causer,
            protect_below,
        } => {
            let mut options = load_options(config.as_ref())?;
            if let Some(chance) = fire_chance {
                options = options.incendiary(chance);
            }

            let mut world = demo_world()?;
            world.drain_events();
            let before = world.state_hash();
            println!("Detonating: r={radius}, seed={seed}, hash={before:#x}");

            match detonate(&mut world, radius, seed, options, causer, protect_below)? {
                ExplosionOutcome::Exploded(summary) => {
                    println!(
                        "Trace: rays={}, steps={}, unloaded={}",
                        summary.trace.rays, summary.trace.steps, summary.trace.skipped_unloaded
                    );
                    println!(
                        "Negotiated: radius={}, yield={:.1}%, affected={}, ignitions={}",
                        summary.radius,
                        summary.yield_percent,
                        summary.affected.len(),
                        summary.ignitions.len()
                    );
                    for report in &summary.damage {
                        println!(
                            "  entity {}: seen={:.2}, exposure={:.2}, damage={:.1}{}{}",
                            report.id.0,
                            report.seen,
                            report.exposure,
                            report.damage,
                            if report.shielded { " (shielded)" } else { "" },
                            if report.cancelled { " (cancelled)" } else { "" }
                        );
                    }
                    println!(
                        "Commit: destroyed={}, primed={}, drops={}, fires={}",
                        summary.commit.destroyed,
                        summary.commit.primed,
                        summary.commit.drops,
                        summary.commit.fires
                    );
                }
                ExplosionOutcome::Cancelled(phase) => println!("Cancelled during {phase:?} phase"),
                ExplosionOutcome::Fizzled => println!("Fizzled"),
            }
            println!(
                "World: events={}, entities={}, hash={:#x}",
                world.events().len(),
                world.entity_count(),
                world.state_hash()
            );
        }
        Commands::Replay { seed, radius } => {
            println!("Deterministic replay: seed={seed}, r={radius}");

            let mut hashes = Vec::with_capacity(2);
            for run in 1..=2 {
                let mut world = demo_world()?;
                detonate(
                    &mut world,
                    radius,
                    seed,
                    ExplosionOptions::default().incendiary(0.5),
                    CauserArg::Block,
                    None,
                )?;
                let hash = world.state_hash();
                println!(
                    "Run {run}: events={}, entities={}, hash={hash:#x}",
                    world.events().len(),
                    world.entity_count()
                );
                hashes.push(hash);
            }
            println!(
                "Match: {}",
                if hashes[0] == hashes[1] { "OK" } else { "MISMATCH" }
            );
        }
        Commands::Config { path } => {
            let options = load_options(path.as_ref())?;
            options.validate()?;
            print!("{}", serde_yaml::to_string(&options)?);
        }
    }

    Ok(())
}
