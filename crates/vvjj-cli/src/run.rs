//! `vvjj run` orchestration.
//!
//! Every generator label in the input list is an independent group: its
//! files are selected (in parallel when threads allow) and merged in list
//! order. A group's outputs are staged in `<out_dir>/.<label>.partial/` and
//! moved to `<out_dir>/<label>/` (`histograms.<json|parquet>`,
//! `summary.json`) only once both are written. A failing group leaves no
//! output and does not stop the others, but makes the run exit non-zero.

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use vvjj_hist::{FlowPolicy, JsonSink, ParquetSink};
use vvjj_select::{EventColumns, FlavorSelector, InputGroup, SelectionSummary, read_input_list};

/// Histogram file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty JSON document.
    #[default]
    Json,
    /// One Parquet row per histogram.
    Parquet,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Parquet => "parquet",
        }
    }
}

/// Command-line spelling of [`FlowPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FlowMode {
    /// Out-of-range fills only reach the flow accumulators.
    #[default]
    Drop,
    /// Out-of-range fills are also added to the first/last bin.
    Fold,
}

impl From<FlowMode> for FlowPolicy {
    fn from(mode: FlowMode) -> Self {
        match mode {
            FlowMode::Drop => FlowPolicy::Drop,
            FlowMode::Fold => FlowPolicy::Fold,
        }
    }
}

/// Optional run config file. Every key can also be given as a flag.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Input list path.
    #[serde(default)]
    pub input_list: Option<PathBuf>,
    /// Output directory.
    #[serde(default)]
    pub out_dir: Option<PathBuf>,
    /// Histogram file format.
    #[serde(default)]
    pub format: Option<OutputFormat>,
    /// Under/overflow handling.
    #[serde(default)]
    pub flow_policy: Option<FlowMode>,
    /// Threads (0 = auto).
    #[serde(default)]
    pub threads: Option<usize>,
}

pub fn read_run_config(path: &Path) -> Result<RunConfig> {
    let bytes = std::fs::read(path)?;
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
    let cfg: RunConfig = if ext == "json" {
        serde_json::from_slice(&bytes)?
    } else {
        serde_yaml_ng::from_slice(&bytes)?
    };
    Ok(cfg)
}

/// `vvjj run` flags, before merging with the config file.
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub input_list: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub flow_policy: Option<FlowMode>,
    pub threads: Option<usize>,
}

/// Fully resolved run settings.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub input_list: PathBuf,
    pub out_dir: PathBuf,
    pub format: OutputFormat,
    pub flow_policy: FlowPolicy,
    pub threads: usize,
}

impl RunSettings {
    /// Flags win over file values; the file wins over defaults.
    pub fn resolve(args: RunArgs, file: RunConfig) -> Result<Self> {
        let input_list = args
            .input_list
            .or(file.input_list)
            .context("no input list given (use --input-list or `input_list` in --config)")?;
        let out_dir = args
            .out_dir
            .or(file.out_dir)
            .context("no output directory given (use --out-dir or `out_dir` in --config)")?;
        Ok(Self {
            input_list,
            out_dir,
            format: args.format.or(file.format).unwrap_or_default(),
            flow_policy: args.flow_policy.or(file.flow_policy).unwrap_or_default().into(),
            threads: args.threads.or(file.threads).unwrap_or(1),
        })
    }
}

pub fn cmd_run(args: RunArgs, config: Option<&Path>) -> Result<()> {
    let file = match config {
        Some(path) => read_run_config(path)
            .with_context(|| format!("failed to read run config {}", path.display()))?,
        None => RunConfig::default(),
    };
    let settings = RunSettings::resolve(args, file)?;

    if settings.threads > 0 {
        // Best-effort; if a global pool already exists, keep going.
        let _ = rayon::ThreadPoolBuilder::new().num_threads(settings.threads).build_global();
    }

    let groups = read_input_list(&settings.input_list)?;
    std::fs::create_dir_all(&settings.out_dir).with_context(|| {
        format!("failed to create output directory {}", settings.out_dir.display())
    })?;
    tracing::info!(
        groups = groups.len(),
        format = settings.format.extension(),
        threads = settings.threads,
        "starting run"
    );

    let results: Vec<(&InputGroup, Result<SelectionSummary>)> =
        groups.par_iter().map(|g| (g, run_group(g, &settings))).collect();

    let mut failed = 0usize;
    for (group, result) in results {
        match result {
            Ok(summary) => {
                println!("== {} ==\n{summary}", group.label);
            }
            Err(e) => {
                failed += 1;
                tracing::error!(group = %group.label, "{e:#}");
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} of {} groups failed", groups.len());
    }
    Ok(())
}

/// Name of the per-group summary file.
pub const SUMMARY_FILE: &str = "summary.json";

/// Output locations of one group.
#[derive(Debug, Clone)]
pub struct GroupOutput {
    /// Published directory, `<out_dir>/<label>`.
    pub dir: PathBuf,
    staging: PathBuf,
    previous: PathBuf,
    format: OutputFormat,
}

impl GroupOutput {
    pub fn new(out_dir: &Path, label: &str, format: OutputFormat) -> Self {
        Self {
            dir: out_dir.join(label),
            staging: out_dir.join(format!(".{label}.partial")),
            previous: out_dir.join(format!(".{label}.previous")),
            format,
        }
    }

    /// `histograms.<ext>`
    pub fn histogram_file(&self) -> String {
        format!("histograms.{}", self.format.extension())
    }

    /// Fresh, empty staging directory.
    fn prepare(&self) -> Result<&Path> {
        if self.staging.exists() {
            std::fs::remove_dir_all(&self.staging)
                .with_context(|| format!("failed to clear {}", self.staging.display()))?;
        }
        std::fs::create_dir_all(&self.staging)
            .with_context(|| format!("failed to create {}", self.staging.display()))?;
        Ok(&self.staging)
    }

    /// Move the staged directory into place, replacing an earlier run's
    /// output. The earlier output is restored if the move fails.
    fn publish(&self) -> Result<()> {
        let replacing = self.dir.is_dir();
        if replacing {
            if self.previous.exists() {
                std::fs::remove_dir_all(&self.previous)?;
            }
            std::fs::rename(&self.dir, &self.previous)
                .with_context(|| format!("failed to move aside {}", self.dir.display()))?;
        }
        if let Err(e) = std::fs::rename(&self.staging, &self.dir) {
            if replacing {
                let _ = std::fs::rename(&self.previous, &self.dir);
            }
            return Err(e).with_context(|| format!("failed to publish {}", self.dir.display()));
        }
        if replacing {
            let _ = std::fs::remove_dir_all(&self.previous);
        }
        Ok(())
    }

    fn discard(&self) {
        let _ = std::fs::remove_dir_all(&self.staging);
    }
}

/// Select, merge and write one group. Nothing is published unless every
/// file of the group was processed and both outputs were written.
fn run_group(group: &InputGroup, settings: &RunSettings) -> Result<SelectionSummary> {
    group.check_files()?;
    let selector = select_group(group, settings)?;

    let output = GroupOutput::new(&settings.out_dir, &group.label, settings.format);
    let written =
        output.prepare().and_then(|staging| write_group(&selector, group, &output, staging));
    let summary = match written.and_then(|summary| output.publish().map(|()| summary)) {
        Ok(summary) => summary,
        Err(e) => {
            output.discard();
            return Err(e);
        }
    };

    for line in summary.to_string().lines() {
        tracing::info!(group = %group.label, "{line}");
    }
    Ok(summary)
}

fn select_group(group: &InputGroup, settings: &RunSettings) -> Result<FlavorSelector> {
    let partials = group
        .files
        .par_iter()
        .map(|path| -> Result<FlavorSelector> {
            let events = EventColumns::open(path).with_context(|| {
                format!("group '{}': failed to load {}", group.label, path.display())
            })?;
            let mut selector = FlavorSelector::with_flow_policy(settings.flow_policy)?;
            selector
                .process_columns(&events, &path.display().to_string())
                .with_context(|| format!("group '{}': {}", group.label, path.display()))?;
            Ok(selector)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut selector = FlavorSelector::with_flow_policy(settings.flow_policy)?;
    for partial in &partials {
        selector.merge(partial)?;
    }
    Ok(selector)
}

/// Write histograms and summary into `staging`.
fn write_group(
    selector: &FlavorSelector,
    group: &InputGroup,
    output: &GroupOutput,
    staging: &Path,
) -> Result<SelectionSummary> {
    let hist_path = staging.join(output.histogram_file());
    let (summary, n_histograms) = match output.format {
        OutputFormat::Json => {
            let mut sink = JsonSink::create(&hist_path);
            let summary = selector.finish(&mut sink)?;
            (summary, sink.finish()?)
        }
        OutputFormat::Parquet => {
            let mut sink = ParquetSink::create(&hist_path);
            let summary = selector.finish(&mut sink)?;
            (summary, sink.finish()?)
        }
    };

    let summary_path = staging.join(SUMMARY_FILE);
    let report = serde_json::json!({
        "group": group.label,
        "files": group.files,
        "events": selector.n_events(),
        "histograms": n_histograms,
        "histogram_file": output.dir.join(output.histogram_file()),
        "counters": selector.counters(),
        "summary": summary,
    });
    std::fs::write(&summary_path, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("failed to write {}", summary_path.display()))?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let yaml = "input_list: list.txt\nout_dir: from_file\nformat: parquet\n\
                    flow_policy: fold\nthreads: 4\n";
        let file: RunConfig = serde_yaml_ng::from_str(yaml).unwrap();
        let args = RunArgs {
            out_dir: Some("from_flag".into()),
            threads: Some(2),
            ..Default::default()
        };
        let s = RunSettings::resolve(args, file).unwrap();
        assert_eq!(s.input_list, PathBuf::from("list.txt"));
        assert_eq!(s.out_dir, PathBuf::from("from_flag"));
        assert_eq!(s.format, OutputFormat::Parquet);
        assert_eq!(s.flow_policy, FlowPolicy::Fold);
        assert_eq!(s.threads, 2);
    }

    #[test]
    fn defaults() {
        let args = RunArgs {
            input_list: Some("l.txt".into()),
            out_dir: Some("o".into()),
            ..Default::default()
        };
        let s = RunSettings::resolve(args, RunConfig::default()).unwrap();
        assert_eq!(s.format, OutputFormat::Json);
        assert_eq!(s.flow_policy, FlowPolicy::Drop);
        assert_eq!(s.threads, 1);
    }

    #[test]
    fn missing_input_list_is_error() {
        let args = RunArgs { out_dir: Some("o".into()), ..Default::default() };
        let err = RunSettings::resolve(args, RunConfig::default()).unwrap_err();
        assert!(err.to_string().contains("input list"));
    }

    fn tmp_dir(name: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir()
            .join(format!("vvjj_run_{}_{nanos}_{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn publish_replaces_earlier_output() {
        let out = tmp_dir("publish");
        let output = GroupOutput::new(&out, "pythia", OutputFormat::Json);
        std::fs::create_dir_all(&output.dir).unwrap();
        std::fs::write(output.dir.join("stale.txt"), "old").unwrap();

        let staging = output.prepare().unwrap().to_path_buf();
        std::fs::write(staging.join(SUMMARY_FILE), "{}").unwrap();
        output.publish().unwrap();

        assert!(output.dir.join(SUMMARY_FILE).is_file());
        assert!(!output.dir.join("stale.txt").exists());
        assert!(!staging.exists());
        assert!(!out.join(".pythia.previous").exists());
        let _ = std::fs::remove_dir_all(&out);
    }

    #[test]
    fn failed_publish_keeps_nothing_staged() {
        let out = tmp_dir("blocked");
        let output = GroupOutput::new(&out, "herwig", OutputFormat::Parquet);
        std::fs::write(&output.dir, "not a directory").unwrap();

        let staging = output.prepare().unwrap().to_path_buf();
        std::fs::write(staging.join(output.histogram_file()), "partial").unwrap();
        assert!(output.publish().is_err());
        output.discard();

        assert!(!staging.exists());
        assert!(output.dir.is_file());
        let _ = std::fs::remove_dir_all(&out);
    }

    #[test]
    fn unknown_config_keys_rejected() {
        let res: std::result::Result<RunConfig, _> = serde_yaml_ng::from_str("input: x\n");
        assert!(res.is_err());
    }
}
