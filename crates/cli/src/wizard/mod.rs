//! The project wizard: step kinds and the tour that strings them together.
//!
//! Top-level questions live in the root scope. Every dataset gets its own
//! `dataset_N` scope, opened by a Dataset Permission step whose children are
//! the dataset questions.

mod basic;
mod dataset;

use std::sync::OnceLock;

use regex::Regex;
use waymark_core::{Answer, StepContext, StepSpec, Tour, TourConfig, WizardError};

pub use basic::{
    ConfigFormatStep, ContactEmailStep, ContactNameStep, MoreDatasetsStep, NameStep, OutputPathStep,
};
pub use dataset::{
    AddSpeakerStep, ColumnStep, DataHasLanguageStep, DataHasSpeakerStep, DatasetNameStep,
    DatasetPermissionStep, FilelistFormatStep, FilelistStep, HasHeaderLineStep, KnowSpeakerStep,
    SampleRateStep, SelectLanguageStep, TextProcessingStep, ValidateWavsStep, WavsDirStep,
};

pub const TOUR_NAME: &str = "Waymark project wizard";

/// Parsed filelist rows, stored by the Filelist Format step.
pub const FILELIST_ROWS_KEY: &str = "filelist_rows";
/// Normalized utterances, stored by the Dataset Name step.
pub const FILELIST_DATA_KEY: &str = "filelist_data";

const YES_NO: [&str; 2] = ["no", "yes"];

/// Names of every step kind; also the State keys their answers go under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepName {
    Name,
    ContactName,
    ContactEmail,
    OutputPath,
    DatasetPermission,
    Filelist,
    FilelistFormat,
    HasHeaderLine,
    BasenameHeader,
    TextHeader,
    DataHasSpeaker,
    SpeakerHeader,
    KnowSpeaker,
    AddSpeaker,
    DataHasLanguage,
    LanguageHeader,
    SelectLanguage,
    WavsDir,
    ValidateWavs,
    TextProcessing,
    SampleRate,
    DatasetName,
    MoreDatasets,
    ConfigFormat,
}

impl StepName {
    pub fn as_str(self) -> &'static str {
        match self {
            StepName::Name => "Name Step",
            StepName::ContactName => "Contact Name Step",
            StepName::ContactEmail => "Contact Email Step",
            StepName::OutputPath => "Output Path Step",
            StepName::DatasetPermission => "Dataset Permission Step",
            StepName::Filelist => "Filelist Step",
            StepName::FilelistFormat => "Filelist Format Step",
            StepName::HasHeaderLine => "Filelist Has Header Line Step",
            StepName::BasenameHeader => "Basename Header Step",
            StepName::TextHeader => "Text Header Step",
            StepName::DataHasSpeaker => "Data Has Speaker Step",
            StepName::SpeakerHeader => "Speaker Header Step",
            StepName::KnowSpeaker => "Know Speaker Step",
            StepName::AddSpeaker => "Add Speaker Step",
            StepName::DataHasLanguage => "Data Has Language Step",
            StepName::LanguageHeader => "Language Header Step",
            StepName::SelectLanguage => "Select Language Step",
            StepName::WavsDir => "Wavs Dir Step",
            StepName::ValidateWavs => "Validate Wavs Step",
            StepName::TextProcessing => "Text Processing Step",
            StepName::SampleRate => "Sample Rate Config Step",
            StepName::DatasetName => "Dataset Name Step",
            StepName::MoreDatasets => "More Datasets Step",
            StepName::ConfigFormat => "Config Format Step",
        }
    }
}

impl std::fmt::Display for StepName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State key of the `index`-th dataset.
pub fn dataset_scope(index: usize) -> String {
    format!("dataset_{}", index)
}

/// The questions asked for one dataset, in order.
pub fn dataset_steps(scope: &str) -> Vec<StepSpec> {
    vec![
        FilelistStep::new(scope).into(),
        FilelistFormatStep::new(scope).into(),
        DataHasSpeakerStep::new(scope).into(),
        DataHasLanguageStep::new(scope).into(),
        WavsDirStep::new(scope).into(),
        ValidateWavsStep::new(scope).into(),
        TextProcessingStep::new(scope).into(),
        SampleRateStep::new(scope).into(),
        DatasetNameStep::new(scope).into(),
    ]
}

/// A Dataset Permission step with the dataset questions below it.
pub fn dataset_flow(index: usize) -> StepSpec {
    let scope = dataset_scope(index);
    StepSpec::chain(DatasetPermissionStep::new(&scope), dataset_steps(&scope))
}

/// Top-level steps of the project wizard.
pub fn project_steps() -> Vec<StepSpec> {
    vec![
        NameStep.into(),
        ContactNameStep.into(),
        ContactEmailStep.into(),
        OutputPathStep.into(),
        dataset_flow(0),
        MoreDatasetsStep::top_level(1).into(),
    ]
}

pub fn project_tour(config: TourConfig) -> Result<Tour, WizardError> {
    Tour::with_config(TOUR_NAME, project_steps(), config)
}

// ── Prompt and validation helpers ────────────────────────────────────

fn ask_text(ctx: &mut StepContext<'_>, question: &str) -> Result<Answer, WizardError> {
    Ok(Answer::String(ctx.console().ask_text(question)?))
}

fn ask_path(ctx: &mut StepContext<'_>, question: &str) -> Result<Answer, WizardError> {
    Ok(Answer::String(ctx.console().ask_path(question)?))
}

/// A menu entry the console could not match becomes the answer itself, so
/// the step's validator rejects it and the failure is counted.
fn unmatched(err: WizardError) -> Result<Answer, WizardError> {
    match err {
        WizardError::UnrecognizedChoice { entry } => Ok(Answer::String(entry)),
        other => Err(other),
    }
}

/// Single-choice question whose answer is the chosen label.
fn ask_choice(ctx: &mut StepContext<'_>, question: &str, choices: &[&str]) -> Result<Answer, WizardError> {
    let index = match ctx.console().select(question, choices) {
        Ok(index) => index,
        Err(e) => return unmatched(e),
    };
    choices
        .get(index)
        .map(|c| Answer::String(c.to_string()))
        .ok_or_else(|| WizardError::Console(format!("no choice number {} for '{}'", index, question)))
}

/// Multi-choice question whose answer is the list of chosen labels.
fn ask_choices(ctx: &mut StepContext<'_>, question: &str, choices: &[&str]) -> Result<Answer, WizardError> {
    let indices = match ctx.console().multi_select(question, choices) {
        Ok(indices) => indices,
        Err(e) => return unmatched(e),
    };
    let picked: Option<Vec<Answer>> = indices
        .iter()
        .map(|i| choices.get(*i).map(|c| Answer::String(c.to_string())))
        .collect();
    picked
        .map(Answer::Array)
        .ok_or_else(|| WizardError::Console(format!("choice out of range for '{}'", question)))
}

fn is_choice(candidate: &Answer, choices: &[&str]) -> bool {
    candidate.as_str().is_some_and(|c| choices.contains(&c))
}

fn trimmed(raw: Answer) -> Answer {
    match raw {
        Answer::String(s) => Answer::String(s.trim().to_string()),
        other => other,
    }
}

fn identifier() -> &'static Regex {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER.get_or_init(|| Regex::new(r"^[\w.-]+$").expect("static regex"))
}

/// Letters, digits, `_`, `-` and `.` only; at least one character.
pub fn is_identifier(text: &str) -> bool {
    identifier().is_match(text)
}
