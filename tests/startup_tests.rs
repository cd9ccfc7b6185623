//! Startup failures must log and exit non-zero.

use std::io::Write;
use std::process::{Command, Output};

use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

fn run(binary: &str, config: &NamedTempFile) -> Output {
    Command::new(binary)
        .arg("--config")
        .arg(config.path())
        .env("RUST_LOG", "info")
        .output()
        .expect("binary runs")
}

fn combined_output(output: &Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

#[test]
fn test_sqlite_server_exits_when_database_cannot_open() {
    let dir = tempfile::tempdir().unwrap();
    let location = dir.path().join("missing").join("demo.db");
    let config = write_config(&format!(
        "[http]\nhost = \"127.0.0.1\"\nport = 0\n\n[database]\nlocation = {:?}\n",
        location.to_string_lossy()
    ));

    let output = run(env!("CARGO_BIN_EXE_sqlite-server"), &config);

    assert!(!output.status.success());
    assert!(
        combined_output(&output).contains("Failed to open database"),
        "{}",
        combined_output(&output)
    );
}

#[test]
fn test_prod_server_exits_when_port_is_taken() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();
    let config = write_config(&format!("[http]\nhost = \"127.0.0.1\"\nport = {}\n", port));

    let output = run(env!("CARGO_BIN_EXE_prod-server"), &config);

    assert!(!output.status.success());
    assert!(
        combined_output(&output).contains("Failed to bind"),
        "{}",
        combined_output(&output)
    );
}

#[test]
fn test_invalid_config_exits_non_zero() {
    let config = write_config("[logging]\nformat = \"xml\"\n");

    for binary in [
        env!("CARGO_BIN_EXE_sqlite-server"),
        env!("CARGO_BIN_EXE_prod-server"),
    ] {
        let output = run(binary, &config);
        assert!(!output.status.success(), "{binary}");
        assert!(
            combined_output(&output).contains("Failed to load configuration"),
            "{}",
            combined_output(&output)
        );
    }
}
