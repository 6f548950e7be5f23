mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use cli::{Cli, Command, LogArgs};
use satiety::audio::{AudioPlayer, DiscardPlayer, FilePlayer, WavFileCapture};
use satiety::http::{self, AppState};
use satiety::meal::{
    progress_bars, BmiCategory, BodyStats, HungerWindow, MacroTargets, MacroTotals, MealLog,
};
use satiety::patterns::{MealHistory, PatternsReport};
use satiety::providers::{ElevenLabsClient, GeminiClient, ModelDialogue};
use satiety::session::{Collaborators, VoiceController};
use satiety::Config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Satiety v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    match cli.command {
        Command::Serve => serve(&cfg).await,
        Command::Log(args) => log_meal(&cfg, args).await,
        Command::Patterns => print_patterns(),
        Command::Targets {
            height_in,
            weight_lb,
        } => print_targets(height_in, weight_lb),
    }
}

async fn serve(cfg: &Config) -> Result<()> {
    if cfg.elevenlabs.api_key.is_empty() || cfg.gemini.api_key.is_empty() {
        error!("Vendor API keys are not set; speech and chat routes will fail");
    }
    let state = AppState::from_config(cfg)?;
    http::serve(state, &cfg.listen_addr()).await
}

async fn log_meal(cfg: &Config, args: LogArgs) -> Result<()> {
    let elevenlabs = Arc::new(ElevenLabsClient::new(&cfg.elevenlabs));
    let gemini = Arc::new(GeminiClient::new(&cfg.gemini));
    let meals = Arc::new(MealLog::new());

    let player: Arc<dyn AudioPlayer> = match &args.speech_dir {
        Some(dir) => Arc::new(FilePlayer::new(dir)),
        None => Arc::new(DiscardPlayer),
    };

    let capture = WavFileCapture::new([args.meal.clone(), args.answer.clone()])
        .realtime(args.realtime);

    let controller = Arc::new(VoiceController::new(Collaborators {
        capture: Arc::new(capture),
        transcriber: elevenlabs.clone(),
        dialogue: Arc::new(ModelDialogue::new(gemini)),
        synthesizer: elevenlabs,
        player,
        sink: meals.clone(),
    }));
    controller.set_voice(args.voice);

    let stopper = controller.clone();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !stopper.stop_active_capture() {
                info!("Interrupted while {}, exiting", stopper.state());
                std::process::exit(130);
            }
        }
    });

    let mut transitions = controller.transitions();
    tokio::spawn(async move {
        while let Ok(change) = transitions.recv().await {
            println!("[{}]", change.to);
        }
    });

    match controller.start_session().await {
        Ok(meal) => {
            let hunger = HungerWindow::for_score(meal.satiety_score);
            println!("{}", meal.voice_summary);
            println!("Hungry again in about {}", hunger);
            println!(
                "{}",
                serde_json::to_string_pretty(&meal).context("Failed to render meal")?
            );
            println!(
                "{}",
                serde_json::to_string_pretty(&meals.stats()).context("Failed to render stats")?
            );
            Ok(())
        }
        Err(e) => {
            error!("Session failed: {}", e);
            println!("{}", e.user_message());
            Err(e).context("Meal was not logged")
        }
    }
}

fn print_patterns() -> Result<()> {
    let history = MealHistory::bundled()?;
    let report = PatternsReport::build(&history);
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to render patterns")?
    );
    Ok(())
}

fn print_targets(height_in: f64, weight_lb: f64) -> Result<()> {
    let stats = BodyStats::new(height_in, weight_lb)?;
    let targets = MacroTargets::for_body(&stats);

    println!("{}", stats.display_line());
    println!("{}", BmiCategory::from_bmi(stats.bmi()).label());
    println!(
        "{}",
        serde_json::to_string_pretty(&targets).context("Failed to render targets")?
    );
    for bar in progress_bars(&MacroTotals::default(), &targets) {
        println!("{:<8} {}", bar.name, bar.label);
    }
    Ok(())
}
