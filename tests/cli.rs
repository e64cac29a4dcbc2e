use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const HEADER: &str = "approach;thread_count;data_type;element_count;mask_distribution_kind;selectivity;runtime_ms\n";

fn create_fake_input(thread_counts: &[u64]) -> String {
    let mut input = String::from(HEADER);
    for (approach, mask) in [("avx2", "uniform"), ("scalar", "uniform"), ("scalar", "cluster")] {
        for tc in thread_counts {
            for sel in [0.1, 0.5, 0.9] {
                for trial in 0..2 {
                    let ms = 100.0 / *tc as f64 * (1.0 + sel) + trial as f64;
                    input.push_str(&format!("{};{};float;1048576;{};{};{}\n", approach, tc, mask, sel, ms));
                }
            }
        }
    }
    input
}

fn setup(input: &str) -> Result<TempDir, Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("data.csv"), input)?;
    Ok(dir)
}

fn svg_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|rd| rd.filter_map(|e| e.ok()).map(|e| e.file_name().to_string_lossy().to_string()).collect())
        .unwrap_or_default();
    names.retain(|n| n.ends_with(".svg"));
    names.sort();
    names
}

#[test]
fn renders_the_chart_family() -> TestResult {
    let dir = setup(&create_fake_input(&[1, 2, 4]))?;
    let out = dir.path().join("charts");
    Command::cargo_bin("cgraphs")?
        .arg(dir.path().join("data.csv"))
        .arg("-o")
        .arg(&out)
        .args(["-t", "2"])
        .assert()
        .success();

    let names = svg_files(&out);
    for expected in [
        "throughput_over_thread_count.svg",
        "throughput_over_thread_count_log.svg",
        "throughput_over_selectivity.svg",
        "single_threaded_throughput_over_thread_count.svg",
        "mt_speedup_over_thread_count.svg",
        "runtime_over_selectivity.svg",
        "throughput_over_selectivity_avx_nz.svg",
        "mt_speedup_over_thread_count_uniform.svg",
        "throughput_over_thread_count_cluster_nz.svg",
        "throughput_over_selectivity_cluster_log.svg",
    ] {
        assert!(names.iter().any(|n| n == expected), "missing {} in {:?}", expected, names);
    }
    assert_eq!(names.len(), 8 + 3 + 2 * 8);
    let svg = fs::read_to_string(out.join("throughput_over_thread_count.svg"))?;
    assert!(svg.contains("<svg"));
    Ok(())
}

#[test]
fn single_thread_count_skips_thread_charts_and_removes_stale_ones() -> TestResult {
    let dir = setup(&create_fake_input(&[1]))?;
    let stale = dir.path().join("throughput_over_thread_count.svg");
    fs::write(&stale, "from an earlier run")?;

    Command::cargo_bin("cgraphs")?
        .arg("data.csv")
        .current_dir(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("aborting plot!: throughput_over_thread_count.svg"));

    assert!(!stale.exists());
    let names = svg_files(dir.path());
    assert!(names.iter().all(|n| !n.contains("thread_count")), "unexpected {:?}", names);
    assert!(names.iter().any(|n| n == "throughput_over_selectivity.svg"));
    Ok(())
}

#[test]
fn sequential_matches_parallel() -> TestResult {
    let input = create_fake_input(&[1, 2]);
    let (a, b) = (setup(&input)?, setup(&input)?);
    Command::cargo_bin("cgraphs")?.arg("data.csv").current_dir(a.path()).args(["-t", "4"]).assert().success();
    Command::cargo_bin("cgraphs")?.arg("data.csv").current_dir(b.path()).arg("--sequential").assert().success();
    let (pa, sb) = (svg_files(a.path()), svg_files(b.path()));
    assert!(!pa.is_empty());
    assert_eq!(pa, sb);
    for name in &pa {
        assert_eq!(fs::read(a.path().join(name))?, fs::read(b.path().join(name))?, "{} differs", name);
    }
    Ok(())
}

#[test]
fn unknown_data_type_fails() -> TestResult {
    let input = format!("{}avx2;1;int128;1024;uniform;0.5;10\n", HEADER);
    let dir = setup(&input)?;
    Command::cargo_bin("cgraphs")?
        .arg("data.csv")
        .current_dir(dir.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error: line 2: unknown data type \"int128\""));
    assert!(svg_files(dir.path()).is_empty());
    Ok(())
}

#[test]
fn missing_input_fails() -> TestResult {
    let dir = tempfile::tempdir()?;
    Command::cargo_bin("cgraphs")?
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot open cpu_data.csv"));
    Ok(())
}

#[test]
fn summary_as_csv_without_charts() -> TestResult {
    let dir = setup(&create_fake_input(&[1, 4]))?;
    Command::cargo_bin("cgraphs")?
        .arg("data.csv")
        .current_dir(dir.path())
        .args(["--summary", "-c", "--no_charts"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("case,rows,max GiB/s,max tc,max sel,min GiB/s,min tc,min sel\n"))
        .stdout(predicate::str::contains("avx2-uniform-float,6,"))
        .stdout(predicate::str::contains("scalar-cluster-float,6,"));
    assert!(svg_files(dir.path()).is_empty());
    Ok(())
}

#[test]
fn jitter_reports_filtered_share() -> TestResult {
    let mut input = String::from(HEADER);
    for ms in [10.0, 10.0, 10.0, 5.0] {
        input.push_str(&format!("avx2;1;double;1024;uniform;0.5;{}\n", ms));
    }
    let dir = setup(&input)?;
    Command::cargo_bin("cgraphs")?
        .arg("data.csv")
        .current_dir(dir.path())
        .args(["--jitter", "0.1", "--no_charts"])
        .assert()
        .success()
        .stderr(predicate::str::contains("filtered 25.00 % jittered values"));
    Ok(())
}

#[test]
fn version_carries_revision() -> TestResult {
    Command::cargo_bin("cgraphs")?
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("rev:"));
    Ok(())
}
