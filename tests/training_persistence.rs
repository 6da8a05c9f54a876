// Control loop and table persistence behaviour against real files.

use adaptive_traffic_signal::config::AgentConfig;
use adaptive_traffic_signal::learning::agent::LoadOutcome;
use adaptive_traffic_signal::learning::q_table::TableMismatch;
use adaptive_traffic_signal::{
    Action, CancellationToken, ControlLoop, EncodedState, QLearningAgent, SimulationConfig,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("traffic_rl_{}", name));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn short_run(dir: &PathBuf, episodes: usize) -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.training.episodes = episodes;
    config.training.max_steps = 20;
    config.training.horizon = 20;
    config.training.load_existing = false;
    config.training.table_path = dir.join("q_table.json");
    config
}

#[test]
fn mismatched_table_is_replaced_with_zeroes() {
    let dir = scratch_dir("mismatch");
    let path = dir.join("q_table.json");
    fs::write(&path, r#"{"shape":[5,5,5,5,2,2],"entries":[[3,[1.0,2.0]]]}"#).unwrap();

    let mut agent = QLearningAgent::new(&AgentConfig::default());
    let outcome = agent.load(&path);
    assert!(matches!(
        outcome,
        LoadOutcome::Mismatch(TableMismatch::Shape { .. })
    ));
    assert_eq!(agent.table().visited_states(), 0);

    let mut rng = StdRng::seed_from_u64(9);
    for _ in 0..50 {
        let action = agent.choose_action(&EncodedState::default(), &mut rng);
        assert!(Action::ALL.contains(&action));
    }
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn corrupt_and_missing_tables_fall_back() {
    let dir = scratch_dir("corrupt");
    let path = dir.join("q_table.json");
    let mut agent = QLearningAgent::new(&AgentConfig::default());
    assert_eq!(agent.load(&path), LoadOutcome::Missing);

    fs::write(&path, "not json").unwrap();
    assert!(matches!(agent.load(&path), LoadOutcome::Unreadable(_)));
    assert_eq!(agent.table().visited_states(), 0);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn saved_table_reloads_identically() {
    let dir = scratch_dir("roundtrip");
    let path = dir.join("q_table.json");
    let mut agent = QLearningAgent::new(&AgentConfig::default());
    let state = EncodedState {
        north: 4,
        east: 2,
        light_ns: 1,
        west_wait: 3,
        ..EncodedState::default()
    };
    agent.update(&state, Action::EwGreen, 10.0, &EncodedState::default(), false);
    agent.save(&path).unwrap();
    assert!(!dir.join("q_table.json.tmp").exists());

    let mut restored = QLearningAgent::new(&AgentConfig::default());
    assert_eq!(
        restored.load(&path),
        LoadOutcome::Loaded { visited_states: 1 }
    );
    assert_eq!(restored.table(), agent.table());
    assert_eq!(restored.greedy_action(&state), Action::EwGreen);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn completed_run_saves_and_decays() {
    let dir = scratch_dir("completed");
    let config = short_run(&dir, 3);
    let mut control_loop = ControlLoop::new(&config, CancellationToken::new());
    let report = control_loop.run();

    assert!(!report.cancelled);
    assert_eq!(report.episodes.len(), 3);
    assert!(report.episodes.iter().all(|e| e.completed && e.steps == 20));
    assert!(config.training.table_path.exists());

    let agent = control_loop.into_agent();
    assert_eq!(agent.rewards_history, report.rewards());
    assert!((agent.epsilon() - 0.5 * 0.99f64.powi(3)).abs() < 1e-12);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn cancelled_run_still_persists_table() {
    let dir = scratch_dir("cancelled");
    let config = short_run(&dir, 5);
    let token = CancellationToken::new();
    token.cancel();

    let mut control_loop = ControlLoop::new(&config, token);
    let report = control_loop.run();
    assert!(report.cancelled);
    assert!(report.episodes.is_empty());
    assert!(config.training.table_path.exists());
    // No finished episode, so exploration is untouched.
    assert_eq!(control_loop.agent().epsilon(), 0.5);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn training_resumes_from_saved_table() {
    let dir = scratch_dir("resume");
    let config = short_run(&dir, 2);
    let mut first = ControlLoop::new(&config, CancellationToken::new());
    first.run();
    let learned = first.into_agent();

    let mut resumed_config = config.clone();
    resumed_config.training.load_existing = true;
    resumed_config.training.episodes = 0;
    let resumed = ControlLoop::new(&resumed_config, CancellationToken::new());
    // Rows that stayed at zero are not written, so compare the persisted form.
    assert_eq!(resumed.agent().table().to_file(), learned.table().to_file());
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn cancel_mid_episode_reports_partial_episode() {
    let dir = scratch_dir("mid_episode");
    let mut config = short_run(&dir, 3);
    config.training.max_steps = 50_000;
    config.training.horizon = 50_000;
    config.training.tick_delay_ms = 1;
    let token = CancellationToken::new();
    let canceller = token.clone();

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        canceller.cancel();
    });
    let mut control_loop = ControlLoop::new(&config, token);
    let report = control_loop.run();
    stopper.join().unwrap();

    assert!(report.cancelled);
    assert_eq!(report.episodes.len(), 1);
    let partial = &report.episodes[0];
    assert!(!partial.completed);
    assert!(partial.steps > 0 && partial.steps < 50_000);
    // The interrupted episode neither decays exploration nor enters the history.
    assert_eq!(control_loop.agent().epsilon(), 0.5);
    assert!(control_loop.agent().rewards_history.is_empty());
    assert!(config.training.table_path.exists());
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn table_is_saved_at_interval_before_run_ends() {
    let dir = scratch_dir("interval");
    let mut config = short_run(&dir, 4);
    config.training.max_steps = 100;
    config.training.horizon = 100;
    config.training.save_interval = 2;
    config.training.tick_delay_ms = 1;
    let table_path = config.training.table_path.clone();

    let runner = thread::spawn(move || {
        let mut control_loop = ControlLoop::new(&config, CancellationToken::new());
        control_loop.run()
    });

    // Episodes 3 and 4 still need at least 200 paced ticks after the first save.
    let deadline = Instant::now() + Duration::from_secs(30);
    while !table_path.exists() {
        assert!(Instant::now() < deadline, "table was never saved");
        thread::sleep(Duration::from_millis(2));
    }
    assert!(!runner.is_finished());

    let report = runner.join().unwrap();
    assert_eq!(report.episodes.len(), 4);
    assert!(!report.cancelled);
    let _ = fs::remove_dir_all(&dir);
}
