// End-to-end pipeline tests over temporary directories

use reappointment_trends::{
    artifacts, AnnualProportion, OrgYearRate, Pipeline, PipelineConfig, PipelineError, Stage,
    YearlyMax,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_year(dir: &Path, year: i32, body: &str) {
    fs::write(dir.join(format!("appointments_{}.csv", year)), body).unwrap();
}

fn setup(start_year: i32, end_year: i32) -> (TempDir, PipelineConfig) {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("raw")).unwrap();
    let config = PipelineConfig {
        input_dir: dir.path().join("raw"),
        output_dir: dir.path().join("out"),
        start_year,
        end_year,
        ..PipelineConfig::default()
    };
    (dir, config)
}

fn three_years(config: &PipelineConfig) {
    write_year(
        &config.input_dir,
        2013,
        "Name,Position,Organization,Reappointed\n\
         Alice,Clerk,DeptA,No\n\
         Bob,Clerk,DeptA,No\n",
    );
    write_year(
        &config.input_dir,
        2014,
        "Name,Position,Organization,Reappointed,Remuneration\n\
         Carol,Analyst,DeptB,No,100\n",
    );
    write_year(
        &config.input_dir,
        2015,
        "Name,Position,Organization,Reappointed\n\
         alice ,Clerk,DeptA,No\n\
         Dan,Director,DeptB,Yes\n",
    );
}

fn read<T: serde::de::DeserializeOwned>(path: &Path) -> Vec<T> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader.deserialize().map(|r| r.unwrap()).collect()
}

#[test]
fn test_full_run_writes_every_artifact() {
    let (_dir, config) = setup(2013, 2015);
    three_years(&config);

    let pipeline = Pipeline::new(config.clone()).unwrap();
    let summary = pipeline.run().unwrap();

    assert_eq!(summary.combined_rows, 5);
    assert_eq!(summary.marking.newly_flagged, 1);
    assert_eq!(summary.marking.flagged_after, 2);

    for artifact in [
        artifacts::COMBINED,
        artifacts::KEY_COLUMNS,
        artifacts::DATA_QUALITY,
        artifacts::REPEATS_MARKED,
        artifacts::EMPLOYEE_COUNTS,
        artifacts::REAPPOINTMENT_COUNTS,
        artifacts::REAPPOINTMENT_RATES,
        artifacts::YEARLY_MAX,
        artifacts::ANNUAL_PROPORTIONS,
        artifacts::REGRESSION_TEXT,
        artifacts::REGRESSION_JSON,
    ] {
        assert!(config.output_path(artifact).exists(), "missing {}", artifact);
    }

    let combined = fs::read_to_string(config.output_path(artifacts::COMBINED)).unwrap();
    assert!(combined.starts_with("name,position,organization,reappointed,Remuneration,year\n"));
}

#[test]
fn test_marking_and_rates_scenario() {
    let (_dir, config) = setup(2013, 2015);
    three_years(&config);

    let summary = Pipeline::new(config.clone()).unwrap().run().unwrap();

    let dept_a: Vec<&OrgYearRate> = summary
        .rates
        .iter()
        .filter(|r| r.organization == "DeptA")
        .collect();
    assert_eq!(dept_a.len(), 2);
    assert_eq!((dept_a[0].year, dept_a[0].total_appointments, dept_a[0].reappointments), (2013, 2, 0));
    assert_eq!(dept_a[0].rate, 0.0);
    assert_eq!((dept_a[1].year, dept_a[1].total_appointments, dept_a[1].reappointments), (2015, 1, 1));
    assert_eq!(dept_a[1].rate, 1.0);

    let marked: Vec<reappointment_trends::AppointmentRecord> =
        read(&config.output_path(artifacts::REPEATS_MARKED));
    let alice: Vec<(i32, bool)> = marked
        .iter()
        .filter(|r| r.name.eq_ignore_ascii_case("alice"))
        .map(|r| (r.year, r.reappointed))
        .collect();
    assert_eq!(alice, vec![(2013, false), (2015, true)]);
    assert!(marked.iter().any(|r| r.name == "Bob" && !r.reappointed));
}

#[test]
fn test_yearly_max_and_annual_outputs() {
    let (_dir, config) = setup(2013, 2015);
    three_years(&config);

    Pipeline::new(config.clone()).unwrap().run().unwrap();

    let winners: Vec<YearlyMax> = read(&config.output_path(artifacts::YEARLY_MAX));
    let years: Vec<(i32, &str)> = winners.iter().map(|w| (w.year, w.organization.as_str())).collect();
    // 2015 is a tie at 1.0 with one appointment each: alphabetical order decides
    assert_eq!(years, vec![(2013, "DeptA"), (2014, "DeptB"), (2015, "DeptA")]);

    let annual: Vec<AnnualProportion> = read(&config.output_path(artifacts::ANNUAL_PROPORTIONS));
    let proportions: Vec<(i32, f64)> = annual.iter().map(|a| (a.year, a.proportion)).collect();
    assert_eq!(proportions, vec![(2013, 0.0), (2014, 0.0), (2015, 1.0)]);

    let text = fs::read_to_string(config.output_path(artifacts::REGRESSION_TEXT)).unwrap();
    assert!(text.contains("Slope:                 0.500000"));
    assert!(text.contains("Trend direction:       increasing"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(config.output_path(artifacts::REGRESSION_JSON)).unwrap())
            .unwrap();
    assert_eq!(json["regression"]["n"], 3);
    assert!((json["regression"]["slope"].as_f64().unwrap() - 0.5).abs() < 1e-12);
}

#[test]
fn test_missing_organization_column_is_fatal() {
    let (_dir, config) = setup(2013, 2013);
    write_year(&config.input_dir, 2013, "Name,Position,Reappointed\nAlice,Clerk,No\n");

    let pipeline = Pipeline::new(config.clone()).unwrap();
    let err = pipeline.run().unwrap_err();

    match err {
        PipelineError::MissingColumn { missing, available } => {
            assert_eq!(missing, vec!["organization".to_string()]);
            assert!(available.contains(&"position".to_string()));
        }
        other => panic!("expected MissingColumn, got {}", other),
    }
    assert!(config.output_path(artifacts::COMBINED).exists());
    assert!(!config.output_path(artifacts::KEY_COLUMNS).exists());
    assert!(!config.output_path(artifacts::DATA_QUALITY).exists());
}

#[test]
fn test_header_spellings_differ_between_years() {
    let (_dir, config) = setup(2013, 2015);
    write_year(
        &config.input_dir,
        2013,
        "name,position,organization,reappointed\nAlice,Clerk,DeptA,No\n",
    );
    write_year(
        &config.input_dir,
        2014,
        "Name,Position,Org,Reappointed\nAlice,Clerk,DeptA,No\n",
    );
    write_year(
        &config.input_dir,
        2015,
        "Full Name,Title,Agency,Reappointed\nBob,Clerk,DeptA,No\n",
    );

    let summary = Pipeline::new(config).unwrap().run().unwrap();

    assert_eq!(summary.marking.unidentifiable_rows, 0);
    assert_eq!(summary.marking.groups, 2);
    assert_eq!(summary.marking.repeat_groups, 1);
    assert_eq!(summary.marking.flagged_after, 1);

    let cells: Vec<(&str, i32, u64)> = summary
        .rates
        .iter()
        .map(|r| (r.organization.as_str(), r.year, r.reappointments))
        .collect();
    assert_eq!(cells, vec![("DeptA", 2013, 0), ("DeptA", 2014, 1), ("DeptA", 2015, 0)]);
}

#[test]
fn test_too_few_years_for_regression() {
    let (_dir, config) = setup(2013, 2015);
    write_year(&config.input_dir, 2013, "Name,Position,Organization,Reappointed\nA,Clerk,DeptA,No\n");
    write_year(&config.input_dir, 2015, "Name,Position,Organization,Reappointed\nA,Clerk,DeptA,No\n");

    let pipeline = Pipeline::new(config.clone()).unwrap();
    let err = pipeline.run().unwrap_err();

    assert!(matches!(err, PipelineError::InsufficientData { found: 2, required: 3 }));
    assert!(config.output_path(artifacts::ANNUAL_PROPORTIONS).exists());
    assert!(!config.output_path(artifacts::REGRESSION_TEXT).exists());
}

#[test]
fn test_no_input_files_at_all() {
    let (_dir, config) = setup(2013, 2015);

    let err = Pipeline::new(config).unwrap().run().unwrap_err();

    assert!(matches!(err, PipelineError::MissingFile { .. }));
}

#[test]
fn test_stages_replay_from_disk() {
    let (_dir, config) = setup(2013, 2015);
    three_years(&config);
    let pipeline = Pipeline::new(config.clone()).unwrap();

    for stage in Stage::ALL {
        pipeline.run_stage(stage).unwrap();
    }

    let rates: Vec<OrgYearRate> = read(&config.output_path(artifacts::REAPPOINTMENT_RATES));
    assert_eq!(rates.len(), 4);
    assert!(config.output_path(artifacts::REGRESSION_JSON).exists());

    // Rerunning a stage replaces its artifact rather than appending to it
    pipeline.run_stage(Stage::Rates).unwrap();
    let again: Vec<OrgYearRate> = read(&config.output_path(artifacts::REAPPOINTMENT_RATES));
    assert_eq!(again, rates);
}

#[test]
fn test_rates_stage_rejects_malformed_counts() {
    let (_dir, config) = setup(2013, 2015);
    fs::create_dir_all(&config.output_dir).unwrap();
    fs::write(
        config.output_path(artifacts::EMPLOYEE_COUNTS),
        "organization,total_appointments\nDeptA,2\n",
    )
    .unwrap();
    fs::write(
        config.output_path(artifacts::REAPPOINTMENT_COUNTS),
        "organization,year,reappointments\nDeptA,2013,1\n",
    )
    .unwrap();

    let err = Pipeline::new(config.clone()).unwrap().run_stage(Stage::Rates).unwrap_err();

    assert!(matches!(err, PipelineError::MissingColumn { .. }));
    assert!(!config.output_path(artifacts::REAPPOINTMENT_RATES).exists());
}
