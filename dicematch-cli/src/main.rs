use clap::Parser;
use dicematch::io::{load_gray_image, load_rgb_image};
use dicematch::lowlevel::AngleGrid;
use dicematch::{
    CascadeConfig, CascadeSearch, CoarseFineSearch, Corner, Decision, DecisionPolicy,
    DiceMatchError, Label, OrientationConfig, Region, SearchConfig, Template, TemplateBank,
    TemplateClassifier, ZnccOrientationScorer,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "dicematch CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for the searches.
    #[arg(long)]
    trace: bool,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Backend {
    /// Template correlation over (label, angle) with coarse-to-fine search.
    #[default]
    Orientation,
    /// Transform cascade scored by upright template correlation.
    Cascade,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum CornerConfig {
    Tl,
    Tr,
    Bl,
    Br,
}

impl From<CornerConfig> for Corner {
    fn from(value: CornerConfig) -> Self {
        match value {
            CornerConfig::Tl => Corner::TopLeft,
            CornerConfig::Tr => Corner::TopRight,
            CornerConfig::Bl => Corner::BottomLeft,
            CornerConfig::Br => Corner::BottomRight,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct OrientationConfigJson {
    angle_step_deg: u16,
    coarse_step_deg: u16,
    fine_half_range_deg: u16,
    early_exit_threshold: f32,
    fill_value: u8,
    min_var_i: f32,
}

impl Default for OrientationConfigJson {
    fn default() -> Self {
        let cfg = OrientationConfig::default();
        Self {
            angle_step_deg: cfg.angle_step_deg,
            coarse_step_deg: cfg.coarse_step_deg,
            fine_half_range_deg: cfg.fine_half_range_deg,
            early_exit_threshold: cfg.early_exit_threshold,
            fill_value: cfg.fill_value,
            min_var_i: cfg.min_var_i,
        }
    }
}

impl From<OrientationConfigJson> for OrientationConfig {
    fn from(value: OrientationConfigJson) -> Self {
        Self {
            angle_step_deg: value.angle_step_deg,
            coarse_step_deg: value.coarse_step_deg,
            fine_half_range_deg: value.fine_half_range_deg,
            early_exit_threshold: value.early_exit_threshold,
            fill_value: value.fill_value,
            min_var_i: value.min_var_i,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct CascadeConfigJson {
    confidence_threshold: f32,
    margin: f32,
    contrast_gains: Vec<f32>,
    brightness_offsets: Vec<f32>,
    skew_magnitudes: Vec<i32>,
    corners: Vec<CornerConfig>,
    inversion_luminance_cutoff: f32,
    fill_value: u8,
}

impl Default for CascadeConfigJson {
    fn default() -> Self {
        let cfg = CascadeConfig::default();
        Self {
            confidence_threshold: cfg.confidence_threshold,
            margin: cfg.margin,
            contrast_gains: cfg.contrast_gains,
            brightness_offsets: cfg.brightness_offsets,
            skew_magnitudes: cfg.skew_magnitudes,
            corners: vec![
                CornerConfig::Tl,
                CornerConfig::Tr,
                CornerConfig::Bl,
                CornerConfig::Br,
            ],
            inversion_luminance_cutoff: cfg.inversion_luminance_cutoff,
            fill_value: cfg.fill_value,
        }
    }
}

impl From<CascadeConfigJson> for CascadeConfig {
    fn from(value: CascadeConfigJson) -> Self {
        Self {
            confidence_threshold: value.confidence_threshold,
            margin: value.margin,
            contrast_gains: value.contrast_gains,
            brightness_offsets: value.brightness_offsets,
            skew_magnitudes: value.skew_magnitudes,
            corners: value.corners.into_iter().map(Corner::from).collect(),
            inversion_luminance_cutoff: value.inversion_luminance_cutoff,
            fill_value: value.fill_value,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    backend: Backend,
    /// Probe images, one record each.
    probes: Vec<String>,
    /// Upright template per die side id.
    templates: BTreeMap<u16, String>,
    /// Every probe is resized to this `[width, height]` before searching.
    probe_size: Option<[u32; 2]>,
    /// Load probes as RGB for the cascade backend.
    color: bool,
    output_path: Option<String>,
    orientation: OrientationConfigJson,
    cascade: CascadeConfigJson,
    acceptance_threshold: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            probes: Vec::new(),
            templates: BTreeMap::new(),
            probe_size: None,
            color: false,
            output_path: None,
            orientation: OrientationConfigJson::default(),
            cascade: CascadeConfigJson::default(),
            acceptance_threshold: DecisionPolicy::default().acceptance_threshold,
        }
    }
}

#[derive(Debug, Serialize)]
struct RegionRecord {
    x: usize,
    y: usize,
    width: usize,
    height: usize,
}

impl From<Region> for RegionRecord {
    fn from(value: Region) -> Self {
        Self {
            x: value.x,
            y: value.y,
            width: value.width,
            height: value.height,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum DecisionRecord {
    Recognized {
        label: u16,
        confidence: f32,
        region: Option<RegionRecord>,
    },
    Unrecognized {
        best_confidence: f32,
    },
}

impl From<Decision> for DecisionRecord {
    fn from(value: Decision) -> Self {
        match value {
            Decision::Recognized {
                label,
                confidence,
                region,
            } => Self::Recognized {
                label: label.get(),
                confidence,
                region: region.map(RegionRecord::from),
            },
            Decision::Unrecognized { best_confidence } => Self::Unrecognized { best_confidence },
        }
    }
}

#[derive(Debug, Serialize)]
struct ProbeRecord {
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    decision: Option<DecisionRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    angle_deg: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    candidate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    termination: Option<&'static str>,
    evaluations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ProbeRecord {
    fn failed(path: &str, err: &DiceMatchError) -> Self {
        let evaluations = match err {
            DiceMatchError::NoValidCandidates { evaluated } => *evaluated,
            _ => 0,
        };
        Self {
            path: path.to_owned(),
            decision: None,
            angle_deg: None,
            candidate: None,
            termination: None,
            evaluations,
            error: Some(err.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct Summary {
    probes: usize,
    recognized: usize,
    unrecognized: usize,
    failed: usize,
}

#[derive(Debug, Serialize)]
struct Output {
    records: Vec<ProbeRecord>,
    summary: Summary,
}

fn build_bank(
    templates: &BTreeMap<u16, String>,
    cfg: &OrientationConfig,
) -> Result<TemplateBank, Box<dyn std::error::Error>> {
    let mut bank = TemplateBank::new(AngleGrid::new(cfg.angle_step_deg)?, cfg.fill_value);
    for (&id, path) in templates {
        let label = Label::new(id).ok_or("template labels start at 1")?;
        let img = load_gray_image(path, None)?;
        bank.insert_template(label, &Template::from_image(img))?;
    }
    Ok(bank)
}

struct Runner<'a> {
    backend: Backend,
    color: bool,
    probe_size: Option<(u32, u32)>,
    orientation: CoarseFineSearch,
    cascade: CascadeSearch,
    decision: DecisionPolicy,
    bank: &'a TemplateBank,
}

impl Runner<'_> {
    fn run(&self, path: &str) -> Result<ProbeRecord, DiceMatchError> {
        let mut record = ProbeRecord {
            path: path.to_owned(),
            decision: None,
            angle_deg: None,
            candidate: None,
            termination: None,
            evaluations: 0,
            error: None,
        };
        match self.backend {
            Backend::Orientation => {
                let probe = load_gray_image(path, self.probe_size)?;
                let scorer = ZnccOrientationScorer::new(self.bank, probe.view())?
                    .with_min_var_i(self.orientation.config().min_var_i);
                let found = self.orientation.run(&scorer)?;
                record.decision = Some(self.decision.decide(&found.result()).into());
                record.angle_deg = Some(found.angle.degrees());
                record.termination = Some(found.termination.as_str());
                record.evaluations = found.stats.evaluations;
            }
            Backend::Cascade => {
                let probe = if self.color {
                    load_rgb_image(path, self.probe_size)?
                } else {
                    load_gray_image(path, self.probe_size)?
                };
                let classifier = TemplateClassifier::new(self.bank);
                let out = self.cascade.run(probe.view(), &classifier)?;
                record.decision = Some(self.decision.decide(&out.result()).into());
                record.candidate = Some(out.candidate.to_string());
                record.termination = Some(out.termination.as_str());
                record.evaluations = out.stats.evaluations;
            }
        }
        Ok(record)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("dicematch=debug".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.probes.is_empty() || config.templates.is_empty() {
        return Err("probes and templates must be set in the config".into());
    }

    let Config {
        backend,
        probes,
        templates,
        probe_size,
        color,
        output_path,
        orientation,
        cascade,
        acceptance_threshold,
    } = config;
    let labels = templates
        .keys()
        .map(|&id| Label::new(id).ok_or("template labels start at 1"))
        .collect::<Result<Vec<_>, _>>()?;
    let search = SearchConfig {
        labels,
        orientation: orientation.into(),
        cascade: cascade.into(),
        decision: DecisionPolicy {
            acceptance_threshold,
        },
    };
    search.validate()?;
    let bank = build_bank(&templates, &search.orientation)?;
    let runner = Runner {
        backend,
        color,
        probe_size: probe_size.map(|[w, h]| (w, h)),
        orientation: search.orientation_search()?,
        cascade: search.cascade_search()?,
        decision: search.decision,
        bank: &bank,
    };

    let mut summary = Summary {
        probes: probes.len(),
        recognized: 0,
        unrecognized: 0,
        failed: 0,
    };
    let mut records = Vec::with_capacity(probes.len());
    for path in &probes {
        let record = match runner.run(path) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(path = %path, error = %err, "probe failed");
                eprintln!("skipping {path}: {err}");
                ProbeRecord::failed(path, &err)
            }
        };
        match record.decision {
            Some(DecisionRecord::Recognized { .. }) => summary.recognized += 1,
            Some(DecisionRecord::Unrecognized { .. }) => summary.unrecognized += 1,
            None => summary.failed += 1,
        }
        records.push(record);
    }

    eprintln!(
        "{} probes: {} recognized, {} unrecognized, {} failed",
        summary.probes, summary.recognized, summary.unrecognized, summary.failed
    );
    let output = Output { records, summary };
    let json = serde_json::to_string_pretty(&output)?;

    match output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
