//! YAML specification loading and validation.
//!
//! Parses a project's `config.yaml` into the immutable specification model
//! the planner walks. Unit sections preserve YAML declaration order (plan
//! order follows it), relative paths resolve against the config file's
//! directory, and validation collects every problem before failing so a bad
//! config is reported in one pass.

use crate::error::PipelineError;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Default config file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Root specification structure parsed from YAML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineSpec {
    #[serde(default)]
    pub project: ProjectSettings,

    /// Standalone looping animations (16 frames each).
    #[serde(default, deserialize_with = "ordered_entries")]
    pub singles: Vec<(String, SingleSpec)>,

    /// Emote animations layered on a parent single (16 frames each).
    #[serde(default, deserialize_with = "ordered_entries")]
    pub emotes: Vec<(String, EmoteSpec)>,

    /// Two-step morph sequences (32 frames total).
    #[serde(default, deserialize_with = "ordered_entries")]
    pub chains: Vec<(String, SequenceSpec)>,

    /// Longer 3-5 step morph sequences (48-80 frames total).
    #[serde(default, deserialize_with = "ordered_entries")]
    pub journeys: Vec<(String, SequenceSpec)>,

    /// Forward-and-return loops; the return leg mirrors the forward frames.
    #[serde(default, deserialize_with = "ordered_entries")]
    pub cycles: Vec<(String, CycleSpec)>,
}

/// Project-wide settings from the `project:` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSettings {
    #[serde(default = "default_project_name")]
    pub name: String,

    /// Base reference image every generation chain starts from.
    #[serde(default = "default_reference")]
    pub reference: PathBuf,

    /// Root directory for generated frames and artifacts.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Generated frame edge length in pixels (square frames).
    #[serde(default = "default_frame_size")]
    pub frame_size: u32,

    /// Edge length of upscaled GIF/static artifacts.
    #[serde(default = "default_upscale_size")]
    pub upscale_size: u32,

    /// GIF frame duration in milliseconds.
    #[serde(default = "default_frame_duration_ms")]
    pub frame_duration_ms: u32,
}

fn default_project_name() -> String {
    "untitled".to_string()
}

fn default_reference() -> PathBuf {
    PathBuf::from("reference.png")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

fn default_frame_size() -> u32 {
    64
}

fn default_upscale_size() -> u32 {
    512
}

fn default_frame_duration_ms() -> u32 {
    200
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            name: default_project_name(),
            reference: default_reference(),
            output_dir: default_output_dir(),
            frame_size: default_frame_size(),
            upscale_size: default_upscale_size(),
            frame_duration_ms: default_frame_duration_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SingleSpec {
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmoteSpec {
    #[serde(default)]
    pub prompt: String,

    /// Parent single supplying the source frame, or the literal `reference`.
    /// Defaults to the emote's own name.
    #[serde(default)]
    pub from: Option<String>,
}

impl EmoteSpec {
    /// Source label for this emote: explicit `from:` or the unit's own name.
    pub fn source<'a>(&'a self, own_name: &'a str) -> &'a str {
        self.from.as_deref().unwrap_or(own_name)
    }
}

/// Step list shared by chains and journeys.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SequenceSpec {
    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StepSpec {
    /// `reference` for the first step, the prior step's `to` label otherwise.
    #[serde(default)]
    pub from: String,

    /// Label of the shape this step morphs into.
    #[serde(default)]
    pub to: String,

    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CycleSpec {
    /// Name of the shape the loop animates.
    #[serde(default)]
    pub shape: String,

    #[serde(default)]
    pub forward_prompt: String,

    /// Carried for config compatibility; the return leg is mirrored locally
    /// and never sent to the API.
    #[serde(default)]
    pub reverse_prompt: String,
}

/// Label that resolves to the project reference image in `from:` fields.
pub const REFERENCE_LABEL: &str = "reference";

/// Specification validation errors.
#[derive(Debug, Clone)]
pub enum ValidationError {
    Project(String),
    Unit {
        section: &'static str,
        name: String,
        message: String,
    },
    Step {
        section: &'static str,
        name: String,
        index: usize,
        message: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Project(msg) => write!(f, "project: {}", msg),
            ValidationError::Unit {
                section,
                name,
                message,
            } => write!(f, "{}.{}: {}", section, name, message),
            ValidationError::Step {
                section,
                name,
                index,
                message,
            } => write!(f, "{}.{}.steps[{}]: {}", section, name, index, message),
        }
    }
}

impl std::error::Error for ValidationError {}

impl PipelineSpec {
    /// Load a spec from a YAML file, resolving relative paths against the
    /// file's directory. Does not validate; see [`PipelineSpec::ensure_valid`].
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PipelineError::Config(format!("Config file not found: {}", path.display()))
            } else {
                PipelineError::Io(e)
            }
        })?;

        let mut spec: PipelineSpec = serde_yaml::from_str(&raw).map_err(|e| {
            PipelineError::Config(format!("Invalid config file {}: {}", path.display(), e))
        })?;

        let config_dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        spec.resolve_paths(&config_dir);
        Ok(spec)
    }

    /// Load and validate in one step; the command entry point.
    pub fn load_validated(path: &Path) -> Result<Self, PipelineError> {
        let spec = Self::load(path)?;
        spec.ensure_valid()?;
        Ok(spec)
    }

    fn resolve_paths(&mut self, config_dir: &Path) {
        if self.project.reference.is_relative() {
            self.project.reference = config_dir.join(&self.project.reference);
        }
        if self.project.output_dir.is_relative() {
            self.project.output_dir = config_dir.join(&self.project.output_dir);
        }
    }

    /// Validate the entire specification, collecting every error.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if !self.project.reference.exists() {
            errors.push(ValidationError::Project(format!(
                "reference image not found: {}",
                self.project.reference.display()
            )));
        }
        if self.project.frame_size < 16 || self.project.frame_size > 256 {
            errors.push(ValidationError::Project(format!(
                "frame_size must be 16-256, got {}",
                self.project.frame_size
            )));
        }
        if self.project.upscale_size < self.project.frame_size {
            errors.push(ValidationError::Project(format!(
                "upscale_size ({}) must be >= frame_size ({})",
                self.project.upscale_size, self.project.frame_size
            )));
        }
        if self.project.frame_duration_ms < 10 {
            errors.push(ValidationError::Project(format!(
                "frame_duration_ms must be >= 10, got {}",
                self.project.frame_duration_ms
            )));
        }

        check_duplicates("singles", self.singles.iter().map(|(n, _)| n), &mut errors);
        check_duplicates("emotes", self.emotes.iter().map(|(n, _)| n), &mut errors);
        check_duplicates("chains", self.chains.iter().map(|(n, _)| n), &mut errors);
        check_duplicates("journeys", self.journeys.iter().map(|(n, _)| n), &mut errors);
        check_duplicates("cycles", self.cycles.iter().map(|(n, _)| n), &mut errors);

        for (name, single) in &self.singles {
            if single.prompt.is_empty() {
                errors.push(missing("singles", name, "prompt"));
            }
        }

        let single_names: HashSet<&str> = self.singles.iter().map(|(n, _)| n.as_str()).collect();
        for (name, emote) in &self.emotes {
            if emote.prompt.is_empty() {
                errors.push(missing("emotes", name, "prompt"));
            }
            let source = emote.source(name);
            if source != REFERENCE_LABEL && !single_names.contains(source) {
                errors.push(ValidationError::Unit {
                    section: "emotes",
                    name: name.clone(),
                    message: format!("'from: {}' does not name a single", source),
                });
            }
        }

        for (name, chain) in &self.chains {
            if chain.steps.len() != 2 {
                errors.push(ValidationError::Unit {
                    section: "chains",
                    name: name.clone(),
                    message: format!("needs exactly 2 steps, got {}", chain.steps.len()),
                });
            }
            validate_steps("chains", name, &chain.steps, &mut errors);
        }

        for (name, journey) in &self.journeys {
            if journey.steps.len() < 3 || journey.steps.len() > 5 {
                errors.push(ValidationError::Unit {
                    section: "journeys",
                    name: name.clone(),
                    message: format!("needs 3-5 steps, got {}", journey.steps.len()),
                });
            }
            validate_steps("journeys", name, &journey.steps, &mut errors);
        }

        for (name, cycle) in &self.cycles {
            if cycle.shape.is_empty() {
                errors.push(missing("cycles", name, "shape"));
            }
            if cycle.forward_prompt.is_empty() {
                errors.push(missing("cycles", name, "forward_prompt"));
            }
            if cycle.reverse_prompt.is_empty() {
                errors.push(missing("cycles", name, "reverse_prompt"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold all problems into a single fatal `Config` error.
    pub fn ensure_valid(&self) -> Result<(), PipelineError> {
        self.validate().map_err(|errors| {
            let msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            PipelineError::Config(format!(
                "Specification validation failed:\n  {}",
                msgs.join("\n  ")
            ))
        })
    }
}

fn missing(section: &'static str, name: &str, field: &str) -> ValidationError {
    ValidationError::Unit {
        section,
        name: name.to_string(),
        message: format!("missing '{}'", field),
    }
}

fn check_duplicates<'a>(
    section: &'static str,
    names: impl Iterator<Item = &'a String>,
    errors: &mut Vec<ValidationError>,
) {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            errors.push(ValidationError::Unit {
                section,
                name: name.clone(),
                message: "duplicate unit name".to_string(),
            });
        }
    }
}

/// Step linkage: step 0 starts from the reference, step i continues from
/// step i-1's `to` label. Anything else cannot be resolved.
fn validate_steps(
    section: &'static str,
    name: &str,
    steps: &[StepSpec],
    errors: &mut Vec<ValidationError>,
) {
    for (i, step) in steps.iter().enumerate() {
        if step.prompt.is_empty() {
            errors.push(ValidationError::Step {
                section,
                name: name.to_string(),
                index: i,
                message: "missing 'prompt'".to_string(),
            });
        }
        if i == 0 {
            if !step.from.is_empty() && step.from != REFERENCE_LABEL {
                errors.push(ValidationError::Step {
                    section,
                    name: name.to_string(),
                    index: i,
                    message: format!(
                        "first step must start 'from: reference', got '{}'",
                        step.from
                    ),
                });
            }
        } else {
            let prior_to = &steps[i - 1].to;
            if step.from != *prior_to {
                errors.push(ValidationError::Step {
                    section,
                    name: name.to_string(),
                    index: i,
                    message: format!(
                        "'from: {}' does not match prior step's 'to: {}'",
                        step.from, prior_to
                    ),
                });
            }
        }
    }
}

/// Deserialize a YAML mapping into `Vec<(name, value)>`, preserving
/// declaration order. Plan order depends on it; a plain map would lose it.
/// A section header with every entry commented out parses as null and
/// counts as empty.
fn ordered_entries<'de, D, T>(deserializer: D) -> Result<Vec<(String, T)>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    struct EntriesVisitor<T>(PhantomData<T>);

    impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
        type Value = Vec<(String, T)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a mapping of unit names to definitions")
        }

        fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_some<D2: Deserializer<'de>>(
            self,
            deserializer: D2,
        ) -> Result<Self::Value, D2::Error> {
            deserializer.deserialize_map(self)
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, T>()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_option(EntriesVisitor(PhantomData))
}
