//! End-to-end pipeline scenarios: checklist in, recorded remote requests out.

use async_trait::async_trait;
use fairesheets_core::config::{BackoffPolicy, EngineConfig};
use fairesheets_core::error::FaireError;
use fairesheets_core::types::{AssayType, RequirementLevel, SampleTypeFilter, Selection};
use fairesheets_service::annotate::{AnnotationCollector, CollectorOptions};
use fairesheets_service::assembler::{AssemblerOptions, GridAssembler};
use fairesheets_service::engine::{BatchEngine, MutationRequest, RemoteError, SheetsBackend};
use fairesheets_service::pipeline::{ProfilePipeline, TemplateOptions, TemplatePipeline};
use fairesheets_service::profile::ProfileConfig;
use fairesheets_service::schema::{index_fields, load_schema, load_vocabulary, ChecklistTable};
use pretty_assertions::assert_eq;
use std::sync::Mutex;
use std::time::Duration;

/// Backend that applies everything and keeps the serialized requests
#[derive(Default)]
struct RecordingBackend {
    chunks: Mutex<Vec<Vec<MutationRequest>>>,
}

impl RecordingBackend {
    fn request_json(&self) -> String {
        let chunks = self.chunks.lock().expect("lock");
        let all: Vec<&MutationRequest> = chunks.iter().flatten().collect();
        serde_json::to_string(&all).expect("serialize requests")
    }

    fn chunk_count(&self) -> usize {
        self.chunks.lock().expect("lock").len()
    }
}

#[async_trait]
impl SheetsBackend for RecordingBackend {
    async fn apply_chunk(&self, requests: &[MutationRequest]) -> Result<(), RemoteError> {
        self.chunks.lock().expect("lock").push(requests.to_vec());
        Ok(())
    }
}

/// Backend that reports a quota signal for the first `failures` calls
struct QuotaBackend {
    failures: Mutex<u32>,
    calls: Mutex<Vec<usize>>,
}

impl QuotaBackend {
    fn new(failures: u32) -> Self {
        Self {
            failures: Mutex::new(failures),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SheetsBackend for QuotaBackend {
    async fn apply_chunk(&self, requests: &[MutationRequest]) -> Result<(), RemoteError> {
        self.calls.lock().expect("lock").push(requests.len());
        let mut failures = self.failures.lock().expect("lock");
        if *failures > 0 {
            *failures -= 1;
            return Err(RemoteError::QuotaExceeded("write quota exceeded".into()));
        }
        Ok(())
    }
}

fn checklist(rows: &[[&str; 5]]) -> ChecklistTable {
    ChecklistTable::new(
        vec![
            "term_name".into(),
            "section".into(),
            "requirement_level_code".into(),
            "sample_type_specificity".into(),
            "term_type".into(),
        ],
        rows.iter()
            .map(|row| row.iter().map(|c| (*c).to_string()).collect())
            .collect(),
    )
}

fn empty_vocab_table() -> ChecklistTable {
    ChecklistTable::new(
        vec!["term_name".into(), "n_options".into(), "vocab1".into()],
        vec![],
    )
}

fn engine(max_ops_per_chunk: usize, max_attempts: u32) -> BatchEngine {
    BatchEngine::new(EngineConfig {
        max_ops_per_chunk,
        backoff: BackoffPolicy {
            max_attempts,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(80),
            growth_factor: 2.0,
        },
    })
    .expect("valid engine config")
}

#[tokio::test]
async fn level_and_sample_type_selection_compiles_only_matching_fields() {
    let checklist = checklist(&[
        ["A", "Core", "M", "ALL", "free text"],
        ["B", "Core", "O", "Water", "free text"],
        ["C", "Core", "HR", "Soil", "free text"],
    ]);
    let selection = Selection {
        requirement_levels: [RequirementLevel::Mandatory, RequirementLevel::HighlyRecommended]
            .into_iter()
            .collect(),
        sample_types: SampleTypeFilter::Selected(vec!["Water".into()]),
        ..Selection::default()
    };
    let backend = RecordingBackend::default();
    let pipeline = TemplatePipeline::new(engine(50, 3));

    let report = pipeline
        .compile(
            &checklist,
            &empty_vocab_table(),
            &TemplateOptions::new("v1.0", "gomecc4").with_selection(selection),
            &backend,
        )
        .await
        .expect("compile");

    // A passes both filters; B fails the level filter, C the sample-type filter
    let project = report
        .grids
        .iter()
        .find(|g| g.name == "projectMetadata")
        .expect("project grid");
    let sample = report
        .grids
        .iter()
        .find(|g| g.name == "sampleMetadata")
        .expect("sample grid");
    assert_eq!(project.fields, 1);
    assert_eq!(sample.fields, 1);

    let json = backend.request_json();
    assert!(json.contains("\"A\""));
    assert!(!json.contains("\"B\""));
    assert!(!json.contains("\"C\""));
    assert_eq!(report.chunks_applied, backend.chunk_count());
}

#[tokio::test]
async fn two_assays_fan_out_detected_and_drop_the_base_field() {
    let checklist = checklist(&[
        ["assay_name", "Project", "M", "ALL", "free text"],
        ["detected_notDetected", "Detection", "M", "ALL", "controlled vocabulary"],
    ]);
    let vocab_table = ChecklistTable::new(
        vec!["term_name".into(), "n_options".into(), "vocab1".into(), "vocab2".into()],
        vec![vec![
            "detected_notDetected".into(),
            "2".into(),
            "detected".into(),
            "not detected".into(),
        ]],
    );
    let selection = Selection {
        assay_names: vec!["x".into(), "y".into()],
        ..Selection::default()
    };
    let backend = RecordingBackend::default();
    let pipeline = TemplatePipeline::new(engine(50, 3));

    let options = TemplateOptions::new("v1.0", "proj").with_selection(selection);
    let report = pipeline
        .compile(&checklist, &vocab_table, &options, &backend)
        .await
        .expect("compile");

    let json = backend.request_json();
    assert!(json.contains("detected_notDetected_x"));
    assert!(json.contains("detected_notDetected_y"));
    // Only the fan-out columns carry the field; the base column is replaced
    let sample = report
        .grids
        .iter()
        .find(|g| g.name == "sampleMetadata")
        .expect("sample grid");
    assert_eq!(sample.fields, 3);
    assert!(report.operations > 0);
}

fn routed_checklist() -> ChecklistTable {
    ChecklistTable::new(
        vec![
            "term_name".into(),
            "section".into(),
            "requirement_level_code".into(),
            "term_type".into(),
            "sheet".into(),
        ],
        vec![
            vec![
                "samp_name".into(),
                "Core".into(),
                "M".into(),
                "free text".into(),
                "sampleMetadata".into(),
            ],
            vec![
                "pcr_plate_id".into(),
                "PCR".into(),
                "HR".into(),
                "free text".into(),
                "experimentRunMetadata".into(),
            ],
        ],
    )
}

#[tokio::test]
async fn metabarcoding_runs_add_the_experiment_run_grid() {
    let backend = RecordingBackend::default();
    let pipeline = TemplatePipeline::new(engine(50, 3));
    let options = TemplateOptions::new("v1.0", "gomecc4")
        .with_assay_type(AssayType::Metabarcoding)
        .with_experiment_user_fields(vec!["lane".into()]);

    let report = pipeline
        .compile(&routed_checklist(), &empty_vocab_table(), &options, &backend)
        .await
        .expect("compile");

    let names: Vec<&str> = report.grids.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "README",
            "projectMetadata",
            "sampleMetadata",
            "experimentRunMetadata",
            "Drop-down values",
        ]
    );

    // Only the routed field plus the run's own user field land on the grid
    let experiment = report
        .grids
        .iter()
        .find(|g| g.name == "experimentRunMetadata")
        .expect("experiment grid");
    assert_eq!(experiment.fields, 2);

    let json = backend.request_json();
    assert!(json.contains("pcr_plate_id"));
    assert!(json.contains("\"lane\""));
}

#[tokio::test]
async fn targeted_and_default_runs_skip_the_experiment_grid() {
    for options in [
        TemplateOptions::new("v1.0", "gomecc4"),
        TemplateOptions::new("v1.0", "gomecc4").with_assay_type(AssayType::Targeted),
    ] {
        let backend = RecordingBackend::default();
        let report = TemplatePipeline::new(engine(50, 3))
            .compile(&routed_checklist(), &empty_vocab_table(), &options, &backend)
            .await
            .expect("compile");
        assert_eq!(report.grids.len(), 4);
        assert!(report.grids.iter().all(|g| g.name != "experimentRunMetadata"));
    }
}

#[tokio::test]
async fn profile_removes_bioinformatics_and_keeps_the_rest() {
    let checklist = checklist(&[
        ["otu_db", "Bioinformatics", "R", "ALL", "free text"],
        ["otu_seq_comp_appr", "Bioinformatics", "R", "ALL", "free text"],
        ["Q", "Core", "M", "ALL", "free text"],
    ]);
    let schema = load_schema(&checklist).expect("schema");
    let vocab = load_vocabulary(&empty_vocab_table()).expect("vocab");
    let grid = GridAssembler::new(AssemblerOptions::sample("sampleMetadata", 2))
        .assemble(&schema, &vocab, &Selection::default())
        .expect("assemble");

    let backend = RecordingBackend::default();
    let pipeline = ProfilePipeline::new(engine(50, 3));
    let profile = ProfileConfig::new("sampleMetadata").with_removed_section("Bioinformatics");

    let report = pipeline
        .apply(vec![grid], &[], &profile, &vocab, &backend)
        .await
        .expect("apply profile");

    let transformed = &report.grids[0];
    assert_eq!(transformed.field_count(), 1);
    assert!(transformed.field_position("Q").is_some());
    assert_eq!(transformed.field_position("otu_db"), None);

    // The two Bioinformatics columns leave as one coalesced deletion
    let json = backend.request_json();
    assert!(json.contains("\"deleteDimension\""));
    assert!(json.contains("\"COLUMNS\""));
}

#[tokio::test(start_paused = true)]
async fn quota_exhaustion_is_resumable_from_the_reported_chunk() {
    let checklist = checklist(&[
        ["samp_name", "Core", "M", "ALL", "free text"],
        ["env_medium", "Core", "HR", "ALL", "free text"],
        ["decimalLatitude", "Core", "M", "ALL", "free text"],
    ]);
    let schema = load_schema(&checklist).expect("schema");
    let vocab = load_vocabulary(&empty_vocab_table()).expect("vocab");
    let grid = GridAssembler::new(AssemblerOptions::sample("sampleMetadata", 2))
        .assemble(&schema, &vocab, &Selection::default())
        .expect("assemble");
    let ops = AnnotationCollector::new(CollectorOptions::default())
        .collect(&grid, &index_fields(&schema));

    let engine = engine(2, 2);
    assert!(engine.chunk_count(ops.len()) > 1);

    // Every call hits the quota: the first chunk exhausts its two attempts
    let backend = QuotaBackend::new(u32::MAX);
    let err = engine.apply(&ops, &backend).await.expect_err("exhausted");
    let FaireError::QuotaExhausted { chunk_index, attempts } = err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(chunk_index, 0);
    assert_eq!(attempts, 2);

    // Resume from the reported chunk against a recovered backend
    let recovered = QuotaBackend::new(1);
    let applied = engine
        .apply_from(&ops, chunk_index, &recovered)
        .await
        .expect("resume");
    assert_eq!(applied, engine.chunk_count(ops.len()));
}
