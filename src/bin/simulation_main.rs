// simulation_main.rs
//
// Plays the saved policy without learning. `--baseline` swaps in the
// rule-based controller, `--feed <csv>` replays recorded arrival counts.
use adaptive_traffic_signal::global_variables::DEFAULT_CONFIG_PATH;
use adaptive_traffic_signal::flow_analyzer::traffic_analyzer::RuleBasedAnalyzer;
use adaptive_traffic_signal::monitoring::traffic_monitoring_system::{
    generate_report, print_report,
};
use adaptive_traffic_signal::simulation_engine::arrivals::read_feed_csv;
use adaptive_traffic_signal::training::evaluation::{evaluate_policy, GreedyPolicy};
use adaptive_traffic_signal::{
    CancellationToken, IntersectionEnvironment, QLearningAgent, SimulationConfig,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::env;
use std::path::PathBuf;
use std::process;

struct Options {
    config: Option<PathBuf>,
    feed: Option<PathBuf>,
    baseline: bool,
}

fn parse_args() -> Result<Options, String> {
    let mut options = Options {
        config: None,
        feed: None,
        baseline: false,
    };
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--baseline" => options.baseline = true,
            "--feed" => {
                let path = args.next().ok_or("--feed needs a CSV path")?;
                options.feed = Some(PathBuf::from(path));
            }
            other if other.starts_with("--") => return Err(format!("unknown flag {}", other)),
            other => options.config = Some(PathBuf::from(other)),
        }
    }
    Ok(options)
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let options = match parse_args() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("usage: simulation_main [config.json] [--baseline] [--feed counts.csv]");
            process::exit(2);
        }
    };
    let config_path = options
        .config
        .clone()
        .or_else(|| Some(PathBuf::from(DEFAULT_CONFIG_PATH)).filter(|p| p.exists()));
    let config = match SimulationConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };
    let feed = match &options.feed {
        Some(path) => match read_feed_csv(path) {
            Ok(records) => {
                log::info!("Replaying {} feed records from {}", records.len(), path.display());
                Some(records)
            }
            Err(e) => {
                eprintln!("Failed to read feed {}: {}", path.display(), e);
                process::exit(1);
            }
        },
        None => None,
    };

    let token = CancellationToken::new();
    let interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let run = tokio::task::spawn_blocking(move || {
        let mut env = IntersectionEnvironment::new(&config);
        let mut rng = StdRng::seed_from_u64(config.seed);
        let episodes = config.training.episodes;
        let max_steps = config.training.max_steps;
        let feed = feed.as_deref();

        if options.baseline {
            log::info!("Running rule-based baseline controller");
            let mut policy = RuleBasedAnalyzer::default();
            evaluate_policy(&mut env, &mut policy, episodes, max_steps, feed, &mut rng, &token)
        } else {
            let agent =
                QLearningAgent::with_table(&config.agent, &config.training.table_path, true);
            let mut policy = GreedyPolicy { agent: &agent };
            evaluate_policy(&mut env, &mut policy, episodes, max_steps, feed, &mut rng, &token)
        }
    });

    match run.await {
        Ok(report) => {
            if let Some(summary) = generate_report(&report.episodes) {
                print_report(&summary);
            }
        }
        Err(e) => {
            eprintln!("Simulation task failed: {}", e);
            process::exit(1);
        }
    }
}
