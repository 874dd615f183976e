use assert_cmd::Command;
use predicates::prelude::*;

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/poplar_sample.csv");

fn biomass() -> Command {
    let mut cmd = Command::cargo_bin("biomass").unwrap();
    cmd.env_remove("BIOMASS_DATA").env_remove("RUST_LOG");
    cmd
}

#[test]
fn fit_prints_report_in_fixed_order() {
    biomass()
        .args(["fit", "--data", FIXTURE])
        .assert()
        .success()
        .stdout(predicate::str::contains("BIOMASS ALLOMETRY REPORT"))
        .stdout(predicate::str::contains("Data Points:      13"))
        .stdout(predicate::str::contains("Slope (log_ddh):  0.7562"))
        .stdout(predicate::str::contains(
            ">> CONCLUSION: Residuals are NOT normal. Model INVALID.",
        ));
}

#[test]
fn leading_flag_runs_fit_with_correction() {
    biomass()
        .args(["--data", FIXTURE, "--correct", "15:diameter=2.9", "--details"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Intercept:        -3.0559"))
        .stdout(predicate::str::contains("Slope (log_ddh):  0.9406"))
        .stdout(predicate::str::contains("Model is VALID."))
        .stdout(predicate::str::contains("F(1, 11)"));
}

#[test]
fn data_path_from_environment() {
    biomass()
        .env("BIOMASS_DATA", FIXTURE)
        .args(["fit", "--residuals"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Residuals (cohort order):"));
}

#[test]
fn missing_dataset_exits_with_2() {
    biomass()
        .args(["fit", "--data", "no/such/file.csv"])
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Dataset not found"));
}

#[test]
fn empty_cohort_exits_with_3() {
    biomass()
        .args(["fit", "--data", FIXTURE, "--age", "9"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No rows match cohort"));
}

#[test]
fn reproduction_mismatch_exits_with_5_after_report() {
    biomass()
        .args([
            "fit",
            "--data",
            FIXTURE,
            "--correct",
            "15:diameter=2.9",
            "--expect-shapiro-p",
            "0.8606",
        ])
        .assert()
        .code(5)
        .stdout(predicate::str::contains(">> REPRODUCTION: MISMATCH"))
        .stderr(predicate::str::contains("Reproduction mismatch"));
}

#[test]
fn invalid_alpha_exits_with_2() {
    biomass()
        .args(["fit", "--data", FIXTURE, "--alpha", "1.5"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("alpha"));
}

#[test]
fn sample_then_fit_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("synthetic.csv");
    let path_str = path.to_str().unwrap();

    biomass()
        .args(["sample", "--out", path_str, "--trees", "40", "--seed", "7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 320 trees"));

    let report = dir.path().join("report.json");
    biomass()
        .args([
            "fit",
            "--data",
            path_str,
            "--export-json",
            report.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Data Points:      40"));

    assert!(report.exists());
}

#[test]
fn constant_weight_cohort_exits_with_4() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flat.csv");
    std::fs::write(
        &path,
        "TreeID,Age,Year,Treatment,Diameter,Height,Weight\n\
         1,3,1,1,1.7,2.5,0.3\n\
         2,3,1,1,2.3,2.5,0.3\n\
         3,3,1,1,2.9,2.5,0.3\n\
         4,3,1,1,3.4,2.5,0.3\n",
    )
    .unwrap();

    biomass()
        .args(["fit", "--data", path.to_str().unwrap()])
        .assert()
        .code(4)
        .stdout(predicate::str::contains("Model is VALID").not());
}
