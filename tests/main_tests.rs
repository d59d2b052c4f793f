use anyhow::Result;
use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;
use fscram::ShuffleConfig;

fn fscram(args: &[&str]) -> Result<Output> {
    let output = Command::new(env!("CARGO_BIN_EXE_fscram"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()?;
    Ok(output)
}

fn sorted_lines(content: &str) -> Vec<String> {
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
    lines.sort();
    lines
}

#[test]
fn test_help_exits_successfully() -> Result<()> {
    for flag in ["-h", "--help"] {
        let output = fscram(&[flag])?;
        assert!(output.status.success());

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Usage"));
        assert!(stdout.contains("<INPUT>"));
        assert!(stdout.contains("<OUTPUT>"));
    }
    Ok(())
}

#[test]
fn test_missing_arguments_fail() -> Result<()> {
    let cases: [&[&str]; 2] = [&[], &["only-input.txt"]];
    for args in cases {
        let output = fscram(args)?;
        assert_eq!(output.status.code(), Some(2));
        assert!(String::from_utf8_lossy(&output.stdout).contains("Usage"));
    }
    Ok(())
}

#[test]
fn test_in_place_shuffle_keeps_lines() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("lines.txt");
    fs::write(&path, "a\nb\nc\nd\ne\n")?;

    let result = fscram(&[path.to_str().unwrap(), path.to_str().unwrap(), "--jitter-micros", "0"])?;
    assert!(result.status.success(), "stderr: {}", String::from_utf8_lossy(&result.stderr));
    assert_eq!(sorted_lines(&fs::read_to_string(&path)?), vec!["a", "b", "c", "d", "e"]);
    Ok(())
}

#[test]
fn test_shuffles_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("input.txt");
    let output = temp_dir.path().join("output.txt");
    fs::write(&input, "a\nb\nc\nd\ne\n")?;

    let result = fscram(&[
        input.to_str().unwrap(),
        output.to_str().unwrap(),
        "--jitter-micros", "0",
    ])?;
    assert!(result.status.success(), "stderr: {}", String::from_utf8_lossy(&result.stderr));

    let shuffled = fs::read_to_string(&output)?;
    assert_eq!(sorted_lines(&shuffled), vec!["a", "b", "c", "d", "e"]);
    Ok(())
}

#[test]
fn test_seed_flag_reproduces_output() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("input.txt");
    let content: String = (0..200).map(|i| format!("{}\n", i)).collect();
    fs::write(&input, &content)?;

    let mut outputs = Vec::new();
    for name in ["one.txt", "two.txt"] {
        let output = temp_dir.path().join(name);
        let result = fscram(&[
            input.to_str().unwrap(),
            output.to_str().unwrap(),
            "--seed", "77",
            "--jitter-micros", "0",
        ])?;
        assert!(result.status.success());
        assert!(String::from_utf8_lossy(&result.stdout).contains("Seed: 77"));
        outputs.push(fs::read_to_string(&output)?);
    }

    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(sorted_lines(&outputs[0]), sorted_lines(&content));
    Ok(())
}

#[test]
fn test_missing_input_fails() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output = temp_dir.path().join("output.txt");

    let result = fscram(&[
        temp_dir.path().join("absent.txt").to_str().unwrap(),
        output.to_str().unwrap(),
    ])?;
    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("Failed to open input file"));
    Ok(())
}

#[test]
fn test_invalid_mode_rejected() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("input.txt");
    fs::write(&input, "a\n")?;

    let result = fscram(&[
        input.to_str().unwrap(),
        temp_dir.path().join("out.txt").to_str().unwrap(),
        "--mode", "sorted",
    ])?;
    assert!(!result.status.success());
    Ok(())
}

#[test]
fn test_config_file_is_used() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("input.txt");
    let output = temp_dir.path().join("output.txt");
    let config_path = temp_dir.path().join("fscram.json");
    fs::write(&input, "x\ny\nz\n")?;

    let config = ShuffleConfig {
        seed: Some(5),
        jitter_micros: 0,
        max_workers: 2,
        ..ShuffleConfig::default()
    };
    config.to_file(&config_path)?;

    let result = fscram(&[
        input.to_str().unwrap(),
        output.to_str().unwrap(),
        "--config", config_path.to_str().unwrap(),
    ])?;
    assert!(result.status.success());

    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("Seed: 5"));
    assert!(stdout.contains("Workers: 2"));
    assert_eq!(sorted_lines(&fs::read_to_string(&output)?), vec!["x", "y", "z"]);
    Ok(())
}

#[test]
fn test_invalid_config_file_fails() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("input.txt");
    let config_path = temp_dir.path().join("bad.json");
    fs::write(&input, "a\n")?;
    fs::write(&config_path, r#"{ "max_workers": 5000 }"#)?;

    let result = fscram(&[
        input.to_str().unwrap(),
        temp_dir.path().join("out.txt").to_str().unwrap(),
        "--config", config_path.to_str().unwrap(),
    ])?;
    assert!(!result.status.success());
    Ok(())
}
