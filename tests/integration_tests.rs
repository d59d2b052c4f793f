use anyhow::Result;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;
use fscram::shuffle::count_lines;
use fscram::{shuffle_file, ShuffleConfig, ShuffleCoordinator, ShuffleError, ShuffleMode};

/// Helper function to write an input file of numbered lines
fn create_input(temp_dir: &TempDir, name: &str, lines: usize) -> Result<(std::path::PathBuf, String)> {
    let content: String = (0..lines).map(|i| format!("record {:05}\n", i)).collect();
    let path = temp_dir.path().join(name);
    fs::write(&path, &content)?;
    Ok((path, content))
}

fn line_multiset(content: &str) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for line in content.lines() {
        *counts.entry(line).or_insert(0) += 1;
    }
    counts
}

fn assert_permutation_of(input: &str, output_path: &Path) -> Result<String> {
    let output = fs::read_to_string(output_path)?;
    assert_eq!(line_multiset(input), line_multiset(&output));
    assert_eq!(output.matches('\n').count(), input.lines().count());
    Ok(output)
}

fn fast_config() -> ShuffleConfig {
    ShuffleConfig {
        jitter_micros: 0,
        ..ShuffleConfig::default()
    }
}

#[tokio::test]
async fn test_end_to_end_shuffle() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (input, content) = create_input(&temp_dir, "input.txt", 2500)?;
    let output = temp_dir.path().join("output.txt");

    assert_eq!(count_lines(&input)?, 2500);

    let stats = shuffle_file(&input, &output, fast_config()).await?;

    assert_eq!(stats.line_count, 2500);
    assert_eq!(stats.workers_spawned, 1024);
    assert_eq!(stats.quota, 3);
    assert_eq!(stats.lines_read, 2500);
    assert_eq!(stats.lines_written, 2500);

    let shuffled = assert_permutation_of(&content, &output)?;
    assert_ne!(shuffled, content, "2500 lines should not come back in input order");

    Ok(())
}

#[tokio::test]
async fn test_single_line_per_worker() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (input, content) = create_input(&temp_dir, "input.txt", 1000)?;
    let output = temp_dir.path().join("output.txt");

    let stats = shuffle_file(&input, &output, fast_config()).await?;

    assert_eq!(stats.workers_spawned, 1000);
    assert_eq!(stats.quota, 1);
    assert_permutation_of(&content, &output)?;

    Ok(())
}

#[tokio::test]
async fn test_output_is_overwritten() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (input, content) = create_input(&temp_dir, "input.txt", 10)?;
    let output = temp_dir.path().join("output.txt");
    fs::write(&output, "old line that must disappear\n".repeat(50))?;

    shuffle_file(&input, &output, fast_config()).await?;
    assert_permutation_of(&content, &output)?;

    Ok(())
}

#[tokio::test]
async fn test_same_seed_same_output_across_modes_of_scheduling() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (input, content) = create_input(&temp_dir, "input.txt", 777)?;

    let mut outputs = Vec::new();
    for (run, jitter) in [0u64, 5, 50].into_iter().enumerate() {
        let output = temp_dir.path().join(format!("output-{}.txt", run));
        let config = ShuffleConfig {
            seed: Some(2024),
            jitter_micros: jitter,
            max_workers: 64,
            ..ShuffleConfig::default()
        };
        shuffle_file(&input, &output, config).await?;
        outputs.push(assert_permutation_of(&content, &output)?);
    }

    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(outputs[1], outputs[2]);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_interleaved_mode_preserves_lines() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (input, content) = create_input(&temp_dir, "input.txt", 4096)?;

    for run in 0..3 {
        let output = temp_dir.path().join(format!("output-{}.txt", run));
        let config = ShuffleConfig {
            mode: ShuffleMode::Interleaved,
            jitter_micros: 3,
            ..ShuffleConfig::default()
        };
        let stats = shuffle_file(&input, &output, config).await?;
        assert_eq!(stats.mode, ShuffleMode::Interleaved);
        assert_eq!(stats.lines_written, 4096);
        assert_permutation_of(&content, &output)?;
    }

    Ok(())
}

#[tokio::test]
async fn test_binary_safe_lines() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("input.bin");
    let output = temp_dir.path().join("output.bin");

    let lines: Vec<Vec<u8>> = vec![b"\xff\xfe raw".to_vec(), b"windows\r".to_vec(), Vec::new(), b"tab\tline".to_vec()];
    let mut content = Vec::new();
    for line in &lines {
        content.extend_from_slice(line);
        content.push(b'\n');
    }
    fs::write(&input, &content)?;

    shuffle_file(&input, &output, fast_config()).await?;

    let written = fs::read(&output)?;
    let mut got: Vec<Vec<u8>> = written.split(|&b| b == b'\n').map(|l| l.to_vec()).collect();
    assert_eq!(got.pop(), Some(Vec::new()));
    got.sort();
    let mut expected = lines.clone();
    expected.sort();
    assert_eq!(got, expected);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_signal_handling() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (input, _) = create_input(&temp_dir, "input.txt", 3000)?;
    let output = temp_dir.path().join("output.txt");

    let config = ShuffleConfig {
        max_workers: 2,
        jitter_micros: 5_000,
        ..ShuffleConfig::default()
    };

    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown_flag.clone();
    let coordinator = ShuffleCoordinator::new(config)?.with_shutdown_signal(shutdown_flag.clone());

    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        shutdown_clone.store(true, Ordering::Relaxed);
    });

    let result = coordinator.shuffle(&input, &output).await;
    assert!(matches!(result, Err(ShuffleError::Cancelled)));
    assert!(shutdown_flag.load(Ordering::Relaxed));

    Ok(())
}
