//! The project configuration the wizard produces, and writing it to disk.
//!
//! Layout under `<output>/<project>/`:
//!
//! ```text
//! config/waymark-project.{toml,json}
//! config/<dataset>-filelist.psv
//! logs_and_checkpoints/
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use waymark_core::{State, WizardError};

use crate::filelist::{write_filelist, Utterance};
use crate::wizard::StepName;

pub const CONFIG_DIR: &str = "config";
pub const LOGS_DIR: &str = "logs_and_checkpoints";
pub const CONFIG_STEM: &str = "waymark-project";

/// Serialization format for the project config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    pub const ALL: [ConfigFormat; 2] = [ConfigFormat::Toml, ConfigFormat::Json];

    pub fn label(self) -> &'static str {
        match self {
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.label() == label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
    /// The filelist as the user supplied it.
    pub source_filelist: PathBuf,
    /// The normalized filelist written next to the config, relative to it.
    pub filelist: PathBuf,
    pub wavs_dir: PathBuf,
    pub sample_rate: u64,
    pub speakers: Vec<String>,
    pub languages: Vec<String>,
    #[serde(skip)]
    pub utterances: Vec<Utterance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    pub output_dir: PathBuf,
    pub contact: Contact,
    pub datasets: Vec<DatasetConfig>,
}

fn missing(key: &str) -> WizardError {
    WizardError::collaborator("project config", format!("no answer recorded for '{}'", key))
}

fn required_str<'s>(scope: &'s State, step: StepName) -> Result<&'s str, WizardError> {
    scope.get_str(step.as_str()).ok_or_else(|| missing(step.as_str()))
}

/// Datasets in `state` whose sub-flow finished, in creation order.
pub fn finished_datasets(state: &State) -> impl Iterator<Item = (&str, &State)> {
    state
        .subscopes()
        .filter(|(_, scope)| scope.contains_key(crate::wizard::FILELIST_DATA_KEY))
}

impl DatasetConfig {
    fn from_scope(scope: &State) -> Result<Self, WizardError> {
        let name = required_str(scope, StepName::DatasetName)?.to_string();
        let sample_rate = scope
            .answer(StepName::SampleRate.as_str())
            .and_then(|a| a.as_u64())
            .ok_or_else(|| missing(StepName::SampleRate.as_str()))?;
        let utterances: Vec<Utterance> = scope
            .answer(crate::wizard::FILELIST_DATA_KEY)
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| WizardError::collaborator("project config", e.to_string()))?
            .unwrap_or_default();

        let mut speakers: Vec<String> = Vec::new();
        let mut languages: Vec<String> = Vec::new();
        for u in &utterances {
            if !speakers.contains(&u.speaker) {
                speakers.push(u.speaker.clone());
            }
            if !languages.contains(&u.language) {
                languages.push(u.language.clone());
            }
        }

        Ok(Self {
            filelist: PathBuf::from(format!("{}-filelist.psv", name)),
            source_filelist: PathBuf::from(required_str(scope, StepName::Filelist)?),
            wavs_dir: PathBuf::from(required_str(scope, StepName::WavsDir)?),
            sample_rate,
            speakers,
            languages,
            utterances,
            name,
        })
    }
}

impl ProjectConfig {
    /// Assemble the config from the answers of a finished wizard.
    pub fn from_state(state: &State) -> Result<Self, WizardError> {
        let datasets = finished_datasets(state)
            .map(|(_, scope)| DatasetConfig::from_scope(scope))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: required_str(state, StepName::Name)?.to_string(),
            output_dir: PathBuf::from(required_str(state, StepName::OutputPath)?),
            contact: Contact {
                name: required_str(state, StepName::ContactName)?.to_string(),
                email: required_str(state, StepName::ContactEmail)?.to_string(),
            },
            datasets,
        })
    }

    /// `<output>/<name>`
    pub fn project_dir(&self) -> PathBuf {
        self.output_dir.join(&self.name)
    }

    pub fn render(&self, format: ConfigFormat) -> Result<String, WizardError> {
        match format {
            ConfigFormat::Toml => toml::to_string_pretty(self)
                .map_err(|e| WizardError::collaborator("serialize config", e.to_string())),
            ConfigFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| WizardError::collaborator("serialize config", e.to_string())),
        }
    }

    /// Create the project directory tree and write the config and every
    /// dataset's filelist. Returns the path of the config file.
    pub fn write(&self, format: ConfigFormat) -> Result<PathBuf, WizardError> {
        let project_dir = self.project_dir();
        let config_dir = project_dir.join(CONFIG_DIR);
        create_dir(&config_dir)?;
        create_dir(&project_dir.join(LOGS_DIR))?;

        for dataset in &self.datasets {
            let path = config_dir.join(&dataset.filelist);
            write_filelist(&path, &dataset.utterances)
                .map_err(|e| WizardError::collaborator("write filelist", e.to_string()))?;
            tracing::debug!(path = %path.display(), rows = dataset.utterances.len(), "filelist written");
        }

        let config_path = config_dir.join(format!("{}.{}", CONFIG_STEM, format.label()));
        fs::write(&config_path, self.render(format)?).map_err(|e| {
            WizardError::collaborator(format!("write '{}'", config_path.display()), e.to_string())
        })?;
        tracing::info!(path = %config_path.display(), "project config written");
        Ok(config_path)
    }
}

fn create_dir(path: &Path) -> Result<(), WizardError> {
    fs::create_dir_all(path).map_err(|e| {
        WizardError::collaborator(format!("create '{}'", path.display()), e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn finished_state(output: &Path) -> State {
        let mut dataset = State::new();
        dataset.insert(StepName::Filelist.as_str(), "/data/metadata.psv");
        dataset.insert(StepName::WavsDir.as_str(), "/data/wavs");
        dataset.insert(StepName::SampleRate.as_str(), 22050);
        dataset.insert(StepName::DatasetName.as_str(), "lj");
        dataset.insert(
            crate::wizard::FILELIST_DATA_KEY,
            json!([
                {"basename": "LJ001", "language": "und", "speaker": "default", "text": "hello"},
                {"basename": "LJ002", "language": "und", "speaker": "default", "text": "world"}
            ]),
        );

        let mut state = State::new();
        state.insert(StepName::Name.as_str(), "demo");
        state.insert(StepName::ContactName.as_str(), "Ada Lovelace");
        state.insert(StepName::ContactEmail.as_str(), "ada@example.org");
        state.insert(StepName::OutputPath.as_str(), output.to_string_lossy().into_owned());
        state.insert_scope("dataset_0", dataset);
        // abandoned dataset: no filelist data
        state.insert_scope("dataset_1", State::new());
        state
    }

    #[test]
    fn config_is_built_from_finished_datasets_only() {
        let config = ProjectConfig::from_state(&finished_state(Path::new("/tmp/out"))).unwrap();
        assert_eq!(config.name, "demo");
        assert_eq!(config.datasets.len(), 1);
        let dataset = &config.datasets[0];
        assert_eq!(dataset.speakers, ["default"]);
        assert_eq!(dataset.languages, ["und"]);
        assert_eq!(dataset.sample_rate, 22050);
        assert_eq!(dataset.filelist, PathBuf::from("lj-filelist.psv"));
        assert_eq!(config.project_dir(), PathBuf::from("/tmp/out/demo"));
    }

    #[test]
    fn missing_answers_are_reported_by_step() {
        let mut state = finished_state(Path::new("/tmp/out"));
        state.remove(StepName::ContactEmail.as_str());
        let err = ProjectConfig::from_state(&state).unwrap_err();
        assert!(err.to_string().contains("Contact Email Step"), "{}", err);
    }

    #[test]
    fn write_lays_out_the_project_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::from_state(&finished_state(dir.path())).unwrap();
        let path = config.write(ConfigFormat::Toml).unwrap();

        let project = dir.path().join("demo");
        assert_eq!(path, project.join("config/waymark-project.toml"));
        assert!(project.join(LOGS_DIR).is_dir());
        let filelist = fs::read_to_string(project.join("config/lj-filelist.psv")).unwrap();
        assert!(filelist.starts_with("basename|language|speaker|text\nLJ001|und|default|hello"));

        let parsed: ProjectConfig = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.contact.email, "ada@example.org");
        assert!(parsed.datasets[0].utterances.is_empty());
    }

    #[test]
    fn json_output_is_pretty_printed() {
        let config = ProjectConfig::from_state(&finished_state(Path::new("/tmp/out"))).unwrap();
        let text = config.render(ConfigFormat::Json).unwrap();
        assert!(text.contains("\n  \"name\": \"demo\""));
        assert!(!text.contains("utterances"));
    }
}
