use clap::{Parser, Subcommand, ValueEnum};
use midroll::break_log::BreakPlayLogger;
use midroll::companion::TimerHandle;
use midroll::config::EngineConfig;
use midroll::error::AdError;
use midroll::events::{AdEvent, EngineAction, PlayerEvent};
use midroll::session::{LogLevel, PlaybackSession};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "midroll", about = "Ad-break synchronization engine CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a cue-point list
    Check {
        /// Break offsets in seconds, comma-separated (e.g. 0,15,40)
        #[arg(value_delimiter = ',', required = true)]
        cues: Vec<f64>,
    },
    /// Run a simulated playback session against a cue-point list
    Simulate {
        /// Break offsets in seconds, comma-separated
        #[arg(long, value_delimiter = ',', required = true)]
        cues: Vec<f64>,
        /// Content duration in seconds
        #[arg(long, default_value_t = 60.0)]
        duration: f64,
        /// Nominal clock tick interval in seconds
        #[arg(long, default_value_t = 0.5)]
        tick: f64,
        /// How long each simulated ad break runs
        #[arg(long, default_value_t = 6.0)]
        ad_secs: f64,
        /// How readiness signals arrive
        #[arg(long, value_enum, default_value_t = ReadinessMode::Staggered)]
        readiness: ReadinessMode,
        /// Seconds before a cue that its readiness arrives (staggered mode)
        #[arg(long, default_value_t = 5.0)]
        lead: f64,
        /// Seed for tick jitter
        #[arg(long, default_value_t = 7)]
        seed: u64,
        /// Make the first start attempt fail, to exercise the retry path
        #[arg(long)]
        fail_first: bool,
        /// Print the session log after the run
        #[arg(long)]
        verbose: bool,
    },
    /// Show break play statistics
    Stats {
        /// Show play hours for a specific date (MM-DD-YY)
        #[arg(long)]
        date: Option<String>,
        /// List recorded start failures
        #[arg(long)]
        failures: bool,
        /// Clear all recorded plays and failures
        #[arg(long)]
        reset: bool,
    },
    /// Engine configuration
    Config {
        #[command(subcommand)]
        action: ConfigCmd,
    },
}

#[derive(Subcommand)]
enum ConfigCmd {
    /// Show current configuration
    Show,
    /// Update configuration values
    Set {
        /// Cue tolerance in seconds
        #[arg(long)]
        eps: Option<f64>,
        /// Companion hold duration in seconds
        #[arg(long)]
        hold: Option<f64>,
        /// Directory for the break play log
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReadinessMode {
    /// All readiness signals arrive before playback starts
    Burst,
    /// Each break becomes ready shortly before its cue
    Staggered,
}

fn main() {
    let cli = Cli::parse();
    let config = EngineConfig::load(&EngineConfig::default_path());

    match cli.command {
        Commands::Check { cues } => match midroll::schedule::Schedule::load(&cues) {
            Ok(schedule) => {
                println!("Schedule OK: {} cue point(s)", schedule.len());
                for cue in schedule.cues() {
                    println!("  #{} at {}s", cue.index, cue.offset_secs);
                }
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },

        Commands::Simulate {
            cues,
            duration,
            tick,
            ad_secs,
            readiness,
            lead,
            seed,
            fail_first,
            verbose,
        } => {
            let mut sim = Sim::new(&config, ad_secs, fail_first, seed);
            sim.run(&cues, duration, tick, readiness, lead);
            if verbose {
                println!("--- session log ---");
                for entry in sim.session.log.entries() {
                    let level = match entry.level {
                        LogLevel::Info => "info",
                        LogLevel::Warn => "warn",
                        LogLevel::Error => "error",
                    };
                    println!("{} [{}] {}", entry.timestamp, level, entry.message);
                }
            }
        }

        Commands::Stats {
            date,
            failures,
            reset,
        } => {
            let logger = BreakPlayLogger::new(&config.resolved_log_dir());
            if reset {
                logger.reset_all();
                println!("Break play log cleared.");
                return;
            }
            if let Some(date_key) = date {
                let hours = logger.play_hours_for_date(&date_key);
                if hours.is_empty() {
                    println!("No plays recorded on {}", date_key);
                } else {
                    let formatted: Vec<String> =
                        hours.iter().map(|h| format!("{:02}:00", h)).collect();
                    println!(
                        "{}: {} play(s) at {}",
                        date_key,
                        hours.len(),
                        formatted.join(", ")
                    );
                }
                return;
            }
            if failures {
                let list = logger.failures();
                if list.is_empty() {
                    println!("No start failures recorded.");
                }
                for f in list {
                    println!("{}  break #{}  {}", f.t, f.index, f.err);
                }
                return;
            }
            let stats = logger.statistics();
            println!(
                "Total break plays: {} | Failures: {}",
                stats.total_plays, stats.failure_count
            );
            for (date_key, count) in stats.per_date {
                println!("  {}: {}", date_key, count);
            }
        }

        Commands::Config { action } => {
            let path = EngineConfig::default_path();
            match action {
                ConfigCmd::Show => {
                    println!(
                        "eps: {}s | companion hold: {}s | log dir: {}",
                        config.eps_secs,
                        config.companion_hold_secs,
                        config.resolved_log_dir().display()
                    );
                }
                ConfigCmd::Set { eps, hold, log_dir } => {
                    let mut updated = config;
                    if let Some(eps) = eps {
                        if eps < 0.0 {
                            eprintln!("Error: eps must be non-negative");
                            std::process::exit(1);
                        }
                        updated.eps_secs = eps;
                    }
                    if let Some(hold) = hold {
                        if hold <= 0.0 {
                            eprintln!("Error: hold must be positive");
                            std::process::exit(1);
                        }
                        updated.companion_hold_secs = hold;
                    }
                    if let Some(dir) = log_dir {
                        updated.log_dir = Some(dir);
                    }
                    if let Err(e) = updated.save(&path) {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                    println!("Config saved to {}", path.display());
                }
            }
        }
    }
}

// ── Simulation host ─────────────────────────────────────────────────────────

/// Plays the role of the real page: executes engine actions against a
/// pretend player/ad-subsystem pair and feeds the consequent events back in.
struct Sim {
    session: PlaybackSession,
    logger: BreakPlayLogger,
    ad_secs: f64,
    fail_first: bool,
    failed_once: bool,
    rng: fastrand::Rng,
    /// Wall-clock seconds since playback start (content time plus ad time).
    wall: f64,
    pending_hide: Option<(TimerHandle, f64)>,
    starts: Vec<usize>,
}

impl Sim {
    fn new(config: &EngineConfig, ad_secs: f64, fail_first: bool, seed: u64) -> Self {
        Sim {
            session: PlaybackSession::new(config),
            logger: BreakPlayLogger::new(&config.resolved_log_dir()),
            ad_secs,
            fail_first,
            failed_once: false,
            rng: fastrand::Rng::with_seed(seed),
            wall: 0.0,
            pending_hide: None,
            starts: Vec::new(),
        }
    }

    fn run(
        &mut self,
        cues: &[f64],
        duration: f64,
        tick: f64,
        readiness: ReadinessMode,
        lead: f64,
    ) {
        self.session
            .handle_player_event(PlayerEvent::LoadedMetadata { duration });

        let count = match self.session.load_schedule(cues) {
            Ok(count) => count,
            Err(e) => {
                eprintln!("Error: {}", e);
                let actions = self
                    .session
                    .abandon_ads(&AdError::SubsystemInitFailure(e.to_string()));
                self.execute(actions);
                return;
            }
        };
        let offsets = self.session.schedule().offsets();
        println!(
            "Simulating {}s of content with {} cue point(s)",
            duration, count
        );

        let ready_at: Vec<f64> = match readiness {
            ReadinessMode::Burst => vec![0.0; count],
            ReadinessMode::Staggered => {
                offsets.iter().map(|o| (o - lead).max(0.0)).collect()
            }
        };

        let actions = self.session.handle_player_event(PlayerEvent::Play);
        self.execute(actions);

        let mut delivered = 0;
        let mut content_t = 0.0;
        while content_t <= duration {
            while delivered < count && ready_at[delivered] <= content_t {
                delivered += 1;
                let actions = self.session.handle_ad_event(AdEvent::Ready);
                self.execute(actions);
            }

            let actions = self.session.handle_player_event(PlayerEvent::TimeUpdate {
                current_time: content_t,
                duration,
            });
            self.execute(actions);

            let jitter = (self.rng.f64() - 0.5) * 0.2 * tick;
            let step = (tick + jitter).max(0.05);
            content_t += step;
            self.advance_wall(step);
        }

        let actions = self.session.handle_player_event(PlayerEvent::Ended);
        self.execute(actions);
        let actions = self.session.teardown();
        self.execute(actions);

        println!(
            "Done: {} of {} break(s) started {:?}",
            self.starts.len(),
            count,
            self.starts
        );
    }

    /// Move wall time forward, firing the companion hide timer if it comes due.
    fn advance_wall(&mut self, secs: f64) {
        self.wall += secs;
        if let Some((handle, fire_at)) = self.pending_hide {
            if self.wall >= fire_at {
                self.pending_hide = None;
                let actions = self.session.handle_timer_fired(handle);
                self.execute(actions);
            }
        }
    }

    /// Execute engine actions, feeding consequent events back to the session.
    fn execute(&mut self, actions: Vec<EngineAction>) {
        for action in actions {
            match action {
                EngineAction::StartBreak(index) => self.start_break(index),
                EngineAction::PauseContent => {
                    println!("[{:6.1}s] content paused", self.wall);
                    let next = self.session.handle_player_event(PlayerEvent::Pause);
                    self.execute(next);
                }
                EngineAction::ResumeContent => {
                    println!("[{:6.1}s] content resumed", self.wall);
                    let next = self.session.handle_player_event(PlayerEvent::Play);
                    self.execute(next);
                }
                EngineAction::ShowCompanion => {
                    println!("[{:6.1}s] companion shown", self.wall);
                }
                EngineAction::ScheduleHide { handle, delay } => {
                    self.pending_hide = Some((handle, self.wall + delay.as_secs_f64()));
                }
                EngineAction::CancelHide(handle) => {
                    if self.pending_hide.map(|(h, _)| h) == Some(handle) {
                        self.pending_hide = None;
                    }
                }
                EngineAction::HideCompanion => {
                    println!("[{:6.1}s] companion hidden", self.wall);
                }
                EngineAction::ContentComplete => {
                    println!("[{:6.1}s] content complete", self.wall);
                }
            }
        }
    }

    fn start_break(&mut self, index: usize) {
        let offset = self
            .session
            .schedule()
            .get(index)
            .map(|c| c.offset_secs)
            .unwrap_or_default();

        if self.fail_first && !self.failed_once {
            self.failed_once = true;
            println!(
                "[{:6.1}s] break #{} start FAILED (simulated), will retry",
                self.wall, index
            );
            self.logger.log_failure(index, "simulated start failure");
            self.session
                .break_start_failed(index, "simulated start failure");
            return;
        }

        println!(
            "[{:6.1}s] start break #{} (cue {}s)",
            self.wall, index, offset
        );
        self.starts.push(index);
        self.logger.log_play(index, offset);

        // The ad subsystem takes over: break starts, content pauses, the
        // ads run, then the break ends and content resumes.
        let actions = self.session.handle_ad_event(AdEvent::BreakStarted);
        self.execute(actions);
        let actions = self.session.handle_ad_event(AdEvent::ContentPauseRequested);
        self.execute(actions);

        self.advance_wall(self.ad_secs);

        let actions = self.session.handle_ad_event(AdEvent::BreakEnded);
        self.execute(actions);
        let actions = self
            .session
            .handle_ad_event(AdEvent::ContentResumeRequested);
        self.execute(actions);
    }
}
