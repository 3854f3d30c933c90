use phytostress_core::{Document, Store};
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

struct CliTestEnv {
    _temp_dir: TempDir,
    base: PathBuf,
    home: PathBuf,
    xdg_data: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_data = base.join("xdg-data");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_data).expect("failed to create XDG_DATA_HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        Self {
            _temp_dir: temp_dir,
            base,
            home,
            xdg_data,
            xdg_config,
            xdg_state,
        }
    }

    fn db_path(&self) -> PathBuf {
        self.xdg_data.join("phytostress/plant_stress.db")
    }
}

fn run_cli(env: &CliTestEnv, args: &[&str]) -> Output {
    Command::new(assert_cmd::cargo::cargo_bin!("phytostress"))
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_DATA_HOME", &env.xdg_data)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute phytostress: {e}"))
}

fn assert_success(args: &[&str], output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if output.status.success() {
        return stdout;
    }

    let rendered_args = args
        .iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "phytostress {rendered_args} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        output.status, stdout, stderr
    );
}

fn run_ok(env: &CliTestEnv, args: &[&str]) -> String {
    let output = run_cli(env, args);
    assert_success(args, &output)
}

/// EXP001 with a control and a drought treatment; the drought treatment
/// has heights 10 and 15 two weeks apart.
fn seed_exp001(env: &CliTestEnv) {
    run_ok(
        env,
        &[
            "experiment", "add", "--code", "EXP001", "--name", "Drought response",
            "--species", "Zea mays", "--stress-type", "drought",
        ],
    );
    run_ok(
        env,
        &["treatment", "add", "EXP001", "--name", "Control", "--type", "control", "--stress-level", "control"],
    );
    run_ok(
        env,
        &["treatment", "add", "EXP001", "--name", "Drought-High", "--type", "drought", "--stress-level", "high"],
    );
    // Treatment ids follow insertion order in a fresh database
    run_ok(
        env,
        &["measurement", "add", "2", "--date", "2024-01-01", "--plant-height", "10"],
    );
    run_ok(
        env,
        &["measurement", "add", "2", "--date", "2024-01-15", "--plant-height", "15"],
    );
}

#[test]
fn records_land_in_the_default_database() {
    let env = CliTestEnv::new();
    seed_exp001(&env);

    let db_path = env.db_path();
    assert!(
        db_path.exists(),
        "database file should exist at {}",
        db_path.display()
    );

    let store = Store::open(&db_path).expect("failed to open db");
    store.initialize().expect("failed to migrate db");
    let experiment = store
        .get_experiment_by_code("EXP001")
        .expect("failed to query experiment")
        .expect("EXP001 should exist");
    assert_eq!(experiment.status.as_deref(), Some("active"));
    let treatments = store.list_treatments(experiment.id).expect("failed to list");
    assert_eq!(treatments.len(), 2);

    let listing = run_ok(&env, &["experiment", "list"]);
    assert!(listing.contains("EXP001"), "got:\n{listing}");
}

#[test]
fn duplicate_experiment_code_is_rejected() {
    let env = CliTestEnv::new();
    seed_exp001(&env);

    let args = [
        "experiment", "add", "--code", "EXP001", "--name", "Again", "--species", "Zea mays",
        "--stress-type", "salt",
    ];
    let output = run_cli(&env, &args);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("already exists"), "got:\n{stderr}");
}

#[test]
fn measurement_without_readings_is_rejected() {
    let env = CliTestEnv::new();
    seed_exp001(&env);

    let output = run_cli(&env, &["measurement", "add", "1", "--date", "2024-01-02"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("at least one measurement value"), "got:\n{stderr}");
}

#[test]
fn analyze_prints_statistics_and_growth_rate() {
    let env = CliTestEnv::new();
    seed_exp001(&env);

    let stats = run_ok(&env, &["analyze", "stats", "EXP001"]);
    assert!(stats.contains("Statistics"), "got:\n{stats}");
    assert!(stats.contains("Drought-High"));
    assert!(stats.contains("12.5"));
    assert!(stats.contains("3.536"));
    assert!(stats.contains("2024-01-15"));

    let rate = run_ok(&env, &["analyze", "rate", "2"]);
    assert!(rate.contains("Growth Rate: 0.36 cm/day"), "got:\n{rate}");
    assert!(rate.contains("Period: 14 days"));

    let none = run_ok(&env, &["analyze", "rate", "1"]);
    assert!(none.contains("Not enough height data"));

    let json = run_ok(&env, &["analyze", "--format", "json", "growth", "EXP001"]);
    let value: serde_json::Value = serde_json::from_str(&json).expect("growth output is JSON");
    assert_eq!(value["title"], "Growth Rates");
}

#[test]
fn export_then_import_into_a_fresh_database() {
    let env = CliTestEnv::new();
    seed_exp001(&env);

    let json_path = env.base.join("out/all.json");
    let json_arg = json_path.to_string_lossy().into_owned();
    run_ok(&env, &["export", "all", "--format", "json", "--out", &json_arg]);
    let document = Document::read(&json_path).expect("export should be readable");
    assert_eq!(document.measurements.len(), 2);

    let xlsx_path = env.base.join("out/exp001.xlsx");
    let xlsx_arg = xlsx_path.to_string_lossy().into_owned();
    let stdout = run_ok(
        &env,
        &["export", "analysis", "EXP001", "--format", "xlsx", "--out", &xlsx_arg],
    );
    assert!(stdout.contains("exp001.xlsx"));
    assert!(xlsx_path.exists());

    let copy_db = env.base.join("copy.db");
    let copy_arg = copy_db.to_string_lossy().into_owned();
    let imported = run_ok(&env, &["--db", &copy_arg, "import", &json_arg]);
    assert!(
        imported.contains("Imported 1 experiment(s), 2 treatment(s), 2 measurement(s)"),
        "got:\n{imported}"
    );

    let listing = run_ok(&env, &["--db", &copy_arg, "experiment", "list"]);
    assert!(listing.contains("EXP001"));

    // A second import of the same experiment is refused
    let again = run_cli(&env, &["--db", &copy_arg, "import", &json_arg]);
    assert!(!again.status.success());
}

#[test]
fn deleting_an_experiment_removes_its_children() {
    let env = CliTestEnv::new();
    seed_exp001(&env);

    let stdout = run_ok(&env, &["experiment", "delete", "EXP001"]);
    assert!(
        stdout.contains("with 2 treatment(s) and 2 measurement(s)"),
        "got:\n{stdout}"
    );

    let listing = run_ok(&env, &["experiment", "list"]);
    assert!(listing.contains("No experiments found."));
}

#[test]
fn derive_water_update_keeps_value_without_biomass() {
    let env = CliTestEnv::new();
    seed_exp001(&env);

    // Measurement 3: water content only, no biomass to derive from
    run_ok(
        &env,
        &["measurement", "add", "1", "--date", "2024-01-02", "--water-content", "70"],
    );
    run_ok(&env, &["measurement", "update", "3", "--derive-water"]);

    let store = Store::open(&env.db_path()).expect("failed to open db");
    let kept = store
        .get_measurement(3)
        .expect("failed to query measurement")
        .expect("measurement 3 should exist");
    assert_eq!(kept.readings.water_content, Some(70.0));

    // With both biomass readings the value is recomputed
    run_ok(
        &env,
        &["measurement", "update", "3", "--biomass-fresh", "5", "--biomass-dry", "1", "--derive-water"],
    );
    let recomputed = store
        .get_measurement(3)
        .expect("failed to query measurement")
        .expect("measurement 3 should exist");
    assert_eq!(recomputed.readings.water_content, Some(80.0));
}
