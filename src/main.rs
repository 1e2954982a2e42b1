//! Headless demo: two autopilots play a seeded duel on the reference world
//!
//! Usage: `maggots [seed] [settings.json]`. Set `RUST_LOG=info` to follow the
//! match; the final frame is printed as JSON.

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::path::Path;

    use maggots::consts::{MAX_SUBSTEPS, SIM_DT_MS};
    use maggots::physics::{SimpleWorld, WorldParams};
    use maggots::sim::{Autopilot, AutopilotParams, Duel, MatchPhase};
    use maggots::{DuelError, DuelSettings};

    /// Rendered frame length
    const FRAME_MS: f32 = 1000.0 / 60.0;
    /// Ten minutes of play before the demo gives up
    const MAX_FRAMES: u32 = 60 * 60 * 10;

    struct Demo {
        duel: Duel,
        world: SimpleWorld,
        pilot: Autopilot,
        accumulator: f32,
    }

    impl Demo {
        fn new(settings: DuelSettings, seed: u64) -> Result<Self, DuelError> {
            let params = WorldParams::for_viewport(settings.viewport_width, settings.viewport_height);
            let mut world = SimpleWorld::new(params);
            let duel = Duel::new(settings, &mut world, seed)?;
            let pilot = Autopilot::new(
                seed.wrapping_add(1),
                AutopilotParams {
                    gravity: params.gravity.y,
                    dt_ms: SIM_DT_MS,
                    ..Default::default()
                },
            );
            Ok(Self {
                duel,
                world,
                pilot,
                accumulator: 0.0,
            })
        }

        /// Run simulation ticks for one rendered frame
        fn update(&mut self, dt_ms: f32) {
            self.accumulator += dt_ms;

            let mut substeps = 0;
            while self.accumulator >= SIM_DT_MS && substeps < MAX_SUBSTEPS {
                self.play_input();
                self.duel.step(&mut self.world, SIM_DT_MS);
                self.accumulator -= SIM_DT_MS;
                substeps += 1;
            }

            self.duel.animate_explosions();
        }

        fn play_input(&mut self) {
            let Some(events) = self.pilot.plan(&self.duel, &self.world) else {
                return;
            };
            for event in events {
                if let Err(e) = self.duel.handle_drag(&mut self.world, event) {
                    log::warn!("Autopilot gesture rejected: {}", e);
                    break;
                }
            }
        }
    }

    pub fn run() -> Result<(), Box<dyn std::error::Error>> {
        let mut args = std::env::args().skip(1);
        let seed = match args.next() {
            Some(arg) => arg.parse::<u64>()?,
            None => 0x5EED,
        };
        let settings = match args.next() {
            Some(path) => DuelSettings::load_or_default(Path::new(&path)),
            None => DuelSettings::default(),
        };
        settings.validate()?;

        log::info!("Maggots demo starting with seed: {}", seed);
        let mut demo = Demo::new(settings, seed)?;

        let mut frames = 0;
        while demo.duel.phase() != MatchPhase::Ended && frames < MAX_FRAMES {
            demo.update(FRAME_MS);
            frames += 1;
        }
        if demo.duel.phase() != MatchPhase::Ended {
            log::warn!("No winner after {} frames", frames);
        }

        let view = demo.duel.frame_view(&demo.world);
        println!("{}", serde_json::to_string_pretty(&view)?);
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(e) = demo::run() {
        log::error!("Demo failed: {}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is the product on wasm; there is no headless demo
}
