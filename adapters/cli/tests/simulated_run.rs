use std::{fs, process::Command};

#[test]
fn short_run_saves_memory_as_json() {
    let path = std::env::temp_dir().join(format!("colony-memory-{}.json", std::process::id()));

    let output = Command::new(env!("CARGO_BIN_EXE_colony"))
        .args(["--ticks", "30", "--seed", "5", "--log", "off", "--save"])
        .arg(&path)
        .output()
        .expect("failed to run the colony binary");

    assert!(output.status.success(), "colony exited with {:?}", output.status);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("W1N1:"), "summary names the territory: {stdout}");

    let saved = fs::read_to_string(&path).expect("memory file written");
    let memory: serde_json::Value = serde_json::from_str(&saved).expect("memory is JSON");
    assert!(memory["territories"]["W1N1"]["miner_tasks"].is_array());
    assert!(memory["workers"]["W1N1 - miner0"].is_object());
    let _ = fs::remove_file(&path);
}

#[test]
fn unreadable_config_is_reported() {
    let output = Command::new(env!("CARGO_BIN_EXE_colony"))
        .args(["--ticks", "1", "--config", "/nonexistent/colony.toml"])
        .output()
        .expect("failed to run the colony binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read config"), "{stderr}");
}
