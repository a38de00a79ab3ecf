// tests/ingest_config.rs
use rollcall_ingest::ingest::config::{
    load_config_default, load_config_from, ENV_BASE_URL, ENV_CONFIG_PATH,
};
use std::{env, fs};

#[serial_test::serial]
#[test]
fn parse_toml_and_json_paths() {
    env::remove_var(ENV_BASE_URL);
    let dir = tempfile::tempdir().unwrap();

    let p_toml = dir.path().join("ingest.toml");
    fs::write(
        &p_toml,
        r#"
base_url = " http://localhost:8080/evs/ "
probe_window = 8
max_retries = 5
"#,
    )
    .unwrap();
    let c = load_config_from(&p_toml).unwrap();
    assert_eq!(c.base_url, "http://localhost:8080/evs");
    assert_eq!(c.probe_window, 8);
    assert_eq!(c.max_retries, 5);
    assert_eq!(c.fetch_concurrency, 4);

    let p_json = dir.path().join("ingest.json");
    fs::write(&p_json, r#"{"scan_ceiling": 1500, "fetch_concurrency": 0}"#).unwrap();
    let cj = load_config_from(&p_json).unwrap();
    assert_eq!(cj.scan_ceiling, 1500);
    assert_eq!(cj.fetch_concurrency, 1, "zero concurrency is clamped");
}

#[test]
fn broken_file_reports_its_path() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("ingest.toml");
    fs::write(&p, "scan_ceiling = \"lots\"").unwrap();
    let err = load_config_from(&p).unwrap_err();
    assert!(format!("{err:#}").contains("ingest.toml"), "{err:#}");
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // Isolate CWD so the repo's own config/ is not picked up.
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    env::remove_var(ENV_CONFIG_PATH);
    env::remove_var(ENV_BASE_URL);

    // 1) Nothing on disk -> built-in defaults
    let c = load_config_default().unwrap();
    assert_eq!(c.base_url, "https://clerk.house.gov/evs");
    assert_eq!(c.scan_ceiling, 2000);

    // 2) ./config/ingest.json, then ./config/ingest.toml takes precedence
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(cfg_dir.join("ingest.json"), r#"{"probe_window": 2}"#).unwrap();
    assert_eq!(load_config_default().unwrap().probe_window, 2);
    fs::write(cfg_dir.join("ingest.toml"), "probe_window = 3\n").unwrap();
    assert_eq!(load_config_default().unwrap().probe_window, 3);

    // 3) Env path wins over the fallbacks
    let p_env = tmp.path().join("elsewhere.json");
    fs::write(&p_env, r#"{"probe_window": 6}"#).unwrap();
    env::set_var(ENV_CONFIG_PATH, p_env.display().to_string());
    assert_eq!(load_config_default().unwrap().probe_window, 6);

    // ... and a dangling env path is an error, not a silent default
    env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
    assert!(load_config_default().is_err());
    env::remove_var(ENV_CONFIG_PATH);

    // 4) Base URL override from the environment
    env::set_var(ENV_BASE_URL, "http://127.0.0.1:9999/evs/");
    assert_eq!(
        load_config_default().unwrap().base_url,
        "http://127.0.0.1:9999/evs"
    );
    env::remove_var(ENV_BASE_URL);

    env::set_current_dir(&old).unwrap();
}
