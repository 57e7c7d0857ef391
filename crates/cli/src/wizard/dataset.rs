//! Questions about one dataset. Every step here writes into the dataset's
//! own `dataset_N` scope.

use std::fs;
use std::path::Path;

use waymark_core::{
    sanitize_path_answer, AbortReason, Answer, EffectContext, State, Step, StepContext, StepSpec,
    WizardError,
};

use super::{
    ask_choice, ask_choices, ask_path, ask_text, is_choice, is_identifier, trimmed, unmatched,
    StepName, FILELIST_DATA_KEY, FILELIST_ROWS_KEY, YES_NO,
};
use crate::filelist::{
    collapse_whitespace, read_rows, strip_wav_suffix, FilelistFormat, TextProcess, Utterance,
    UNDETERMINED_LANGUAGE,
};
use crate::project::finished_datasets;

/// Speaker id used when the filelist has no speaker column and none was given.
const DEFAULT_SPEAKER: &str = "default";

/// Languages offered when the filelist has no language column, as
/// (ISO 639-3 code, name).
pub const LANGUAGES: [(&str, &str); 12] = [
    (UNDETERMINED_LANGUAGE, "Undetermined"),
    ("eng", "English"),
    ("fra", "French"),
    ("spa", "Spanish"),
    ("deu", "German"),
    ("crk", "Plains Cree"),
    ("git", "Gitksan"),
    ("iku", "Inuktitut"),
    ("mic", "Mi'kmaq"),
    ("moh", "Mohawk"),
    ("oji", "Ojibwa"),
    ("str", "Straits Salish"),
];

// ── Scope helpers ────────────────────────────────────────────────────

fn column_answer(scope: &State, step: StepName) -> Option<usize> {
    scope
        .answer(step.as_str())
        .and_then(Answer::as_u64)
        .and_then(|i| usize::try_from(i).ok())
}

fn stored_rows(scope: &State) -> Vec<Vec<String>> {
    scope
        .answer(FILELIST_ROWS_KEY)
        .cloned()
        .and_then(|rows| serde_json::from_value(rows).ok())
        .unwrap_or_default()
}

fn has_header(scope: &State) -> bool {
    scope.get_str(StepName::HasHeaderLine.as_str()) == Some("yes")
}

/// Rows that hold utterances, i.e. without the header line.
fn data_rows(scope: &State) -> Vec<Vec<String>> {
    let skip = usize::from(has_header(scope));
    stored_rows(scope).into_iter().skip(skip).collect()
}

fn column_count(rows: &[Vec<String>]) -> usize {
    rows.iter().map(Vec::len).min().unwrap_or(0)
}

/// Display labels for each column: the header cell when the first row is a
/// header, otherwise the column number and its first value.
fn column_labels(scope: &State) -> Vec<String> {
    let rows = stored_rows(scope);
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    let header = has_header(scope);
    first
        .iter()
        .take(column_count(&rows))
        .enumerate()
        .map(|(i, cell)| {
            if header {
                cell.trim().to_string()
            } else {
                format!("column {} (e.g. '{}')", i + 1, cell.trim())
            }
        })
        .collect()
}

// ── Dataset Permission ───────────────────────────────────────────────

/// Opens a dataset. Declining drops the dataset's questions and its scope.
pub struct DatasetPermissionStep {
    scope: String,
}

impl DatasetPermissionStep {
    pub fn new(scope: &str) -> Self {
        Self {
            scope: scope.to_string(),
        }
    }
}

impl Step for DatasetPermissionStep {
    fn name(&self) -> &str {
        StepName::DatasetPermission.as_str()
    }

    fn state_subset(&self) -> Option<&str> {
        Some(&self.scope)
    }

    fn prompt(&self, ctx: &mut StepContext<'_>) -> Result<Answer, WizardError> {
        ask_choice(
            ctx,
            "Do you have permission to use this data to build a TTS model? It is unethical to \
             build a TTS model of a speaker without their knowledge or permission and there can \
             be serious consequences for doing so.",
            &YES_NO,
        )
    }

    fn validate(&self, candidate: &Answer, _ctx: &mut StepContext<'_>) -> bool {
        is_choice(candidate, &YES_NO)
    }

    fn effect(&mut self, ctx: &mut EffectContext<'_>) -> Result<(), WizardError> {
        if ctx.response().as_str() != Some("yes") {
            ctx.clear_children();
            ctx.state_mut().remove(&self.scope);
            ctx.say("OK, we'll ask you to choose another dataset then!");
        }
        Ok(())
    }

    fn is_reversible(&self) -> bool {
        true
    }
}

// ── Filelist ─────────────────────────────────────────────────────────

pub struct FilelistStep {
    scope: String,
}

impl FilelistStep {
    pub fn new(scope: &str) -> Self {
        Self {
            scope: scope.to_string(),
        }
    }
}

impl Step for FilelistStep {
    fn name(&self) -> &str {
        StepName::Filelist.as_str()
    }

    fn state_subset(&self) -> Option<&str> {
        Some(&self.scope)
    }

    fn prompt(&self, ctx: &mut StepContext<'_>) -> Result<Answer, WizardError> {
        ask_path(ctx, "Where is your data filelist?")
    }

    fn sanitize_input(&self, raw: Answer) -> Answer {
        sanitize_path_answer(raw)
    }

    fn validate(&self, candidate: &Answer, ctx: &mut StepContext<'_>) -> bool {
        let path = candidate.as_str().unwrap_or_default();
        if !Path::new(path).is_file() {
            ctx.say(&format!("Sorry, '{}' is not a file.", path));
            return false;
        }
        true
    }

    fn is_reversible(&self) -> bool {
        true
    }
}

/// Parses the filelist and queues the header/column questions.
pub struct FilelistFormatStep {
    scope: String,
}

impl FilelistFormatStep {
    pub fn new(scope: &str) -> Self {
        Self {
            scope: scope.to_string(),
        }
    }

    fn filelist_path<'s>(scope: Option<&'s State>) -> Option<&'s Path> {
        scope
            .and_then(|s| s.get_str(StepName::Filelist.as_str()))
            .map(Path::new)
    }
}

impl Step for FilelistFormatStep {
    fn name(&self) -> &str {
        StepName::FilelistFormat.as_str()
    }

    fn state_subset(&self) -> Option<&str> {
        Some(&self.scope)
    }

    fn prompt(&self, ctx: &mut StepContext<'_>) -> Result<Answer, WizardError> {
        let labels: Vec<&str> = FilelistFormat::ALL.iter().map(|f| f.label()).collect();
        ask_choice(ctx, "Select which format your filelist is in:", &labels)
    }

    fn validate(&self, candidate: &Answer, ctx: &mut StepContext<'_>) -> bool {
        let Some(format) = candidate.as_str().and_then(FilelistFormat::from_label) else {
            return false;
        };
        let Some(path) = Self::filelist_path(Some(ctx.scope())) else {
            ctx.say("Sorry, there is no filelist to read yet.");
            return false;
        };
        let message = match read_rows(path, format) {
            Err(e) => format!("Sorry, {}", e),
            Ok(rows) if rows.is_empty() => format!("Sorry, '{}' has no data in it.", path.display()),
            Ok(rows) if column_count(&rows) < 2 => format!(
                "Sorry, '{}' doesn't look like a {} file: every line needs at least two columns.",
                path.display(),
                format
            ),
            Ok(_) => return true,
        };
        ctx.say(&message);
        false
    }

    fn effect(&mut self, ctx: &mut EffectContext<'_>) -> Result<(), WizardError> {
        let format = ctx
            .response()
            .as_str()
            .and_then(FilelistFormat::from_label)
            .ok_or_else(|| WizardError::collaborator("filelist format", "unknown format"))?;
        let path = Self::filelist_path(ctx.scope())
            .ok_or_else(|| WizardError::collaborator("filelist format", "no filelist recorded"))?
            .to_path_buf();
        let rows = read_rows(&path, format)
            .map_err(|e| WizardError::collaborator("read filelist", e.to_string()))?;
        tracing::debug!(path = %path.display(), rows = rows.len(), "filelist parsed");

        ctx.scope_mut()?.insert(FILELIST_ROWS_KEY, serde_json::json!(rows));
        ctx.add_steps([
            StepSpec::from(HasHeaderLineStep::new(&self.scope)),
            ColumnStep::basename(&self.scope).into(),
            ColumnStep::text(&self.scope).into(),
        ]);
        Ok(())
    }

    fn is_reversible(&self) -> bool {
        true
    }

    fn undo(&mut self, scope: &mut State) {
        scope.remove(FILELIST_ROWS_KEY);
    }
}

pub struct HasHeaderLineStep {
    scope: String,
}

impl HasHeaderLineStep {
    pub fn new(scope: &str) -> Self {
        Self {
            scope: scope.to_string(),
        }
    }
}

impl Step for HasHeaderLineStep {
    fn name(&self) -> &str {
        StepName::HasHeaderLine.as_str()
    }

    fn state_subset(&self) -> Option<&str> {
        Some(&self.scope)
    }

    fn prompt(&self, ctx: &mut StepContext<'_>) -> Result<Answer, WizardError> {
        if let Some(first) = stored_rows(ctx.scope()).first() {
            let preview = format!("Your filelist starts with:\n  {}", first.join(" | "));
            ctx.say(&preview);
        }
        ask_choice(ctx, "Is the first line of your filelist a header line?", &YES_NO)
    }

    fn validate(&self, candidate: &Answer, _ctx: &mut StepContext<'_>) -> bool {
        is_choice(candidate, &YES_NO)
    }

    fn is_reversible(&self) -> bool {
        true
    }
}

// ── Column selection ─────────────────────────────────────────────────

/// Pick which column holds a field. The answer is the column index;
/// columns already claimed by the `taken` steps are not offered.
pub struct ColumnStep {
    scope: String,
    step: StepName,
    question: &'static str,
    taken: &'static [StepName],
}

impl ColumnStep {
    pub fn basename(scope: &str) -> Self {
        Self {
            scope: scope.to_string(),
            step: StepName::BasenameHeader,
            question: "Which column contains the basenames of your audio files?",
            taken: &[],
        }
    }

    pub fn text(scope: &str) -> Self {
        Self {
            scope: scope.to_string(),
            step: StepName::TextHeader,
            question: "Which column contains the text of each utterance?",
            taken: &[StepName::BasenameHeader],
        }
    }

    pub fn speaker(scope: &str) -> Self {
        Self {
            scope: scope.to_string(),
            step: StepName::SpeakerHeader,
            question: "Which column contains the speaker IDs?",
            taken: &[StepName::BasenameHeader, StepName::TextHeader],
        }
    }

    pub fn language(scope: &str) -> Self {
        Self {
            scope: scope.to_string(),
            step: StepName::LanguageHeader,
            question: "Which column contains the language of each utterance?",
            taken: &[StepName::BasenameHeader, StepName::TextHeader, StepName::SpeakerHeader],
        }
    }

    /// Column indices still free for this step.
    fn candidates(&self, scope: &State) -> Vec<usize> {
        let claimed: Vec<usize> = self
            .taken
            .iter()
            .filter_map(|step| column_answer(scope, *step))
            .collect();
        (0..column_count(&stored_rows(scope)))
            .filter(|i| !claimed.contains(i))
            .collect()
    }
}

impl Step for ColumnStep {
    fn name(&self) -> &str {
        self.step.as_str()
    }

    fn state_subset(&self) -> Option<&str> {
        Some(&self.scope)
    }

    fn prompt(&self, ctx: &mut StepContext<'_>) -> Result<Answer, WizardError> {
        let candidates = self.candidates(ctx.scope());
        if candidates.is_empty() {
            return Err(WizardError::Console(format!(
                "no columns left to choose from for {}",
                self.step
            )));
        }
        let labels = column_labels(ctx.scope());
        let offered: Vec<&str> = candidates
            .iter()
            .map(|i| labels.get(*i).map(String::as_str).unwrap_or_default())
            .collect();
        let picked = match ctx.console().select(self.question, &offered) {
            Ok(picked) => picked,
            Err(e) => return unmatched(e),
        };
        candidates
            .get(picked)
            .map(|i| Answer::from(*i))
            .ok_or_else(|| WizardError::Console(format!("no column number {}", picked)))
    }

    fn validate(&self, candidate: &Answer, ctx: &mut StepContext<'_>) -> bool {
        let Some(index) = candidate.as_u64().and_then(|i| usize::try_from(i).ok()) else {
            return false;
        };
        if !self.candidates(ctx.scope()).contains(&index) {
            ctx.say(&format!("Sorry, column {} cannot be used here.", index + 1));
            return false;
        }
        true
    }

    fn is_reversible(&self) -> bool {
        true
    }
}

// ── Speakers ─────────────────────────────────────────────────────────

pub struct DataHasSpeakerStep {
    scope: String,
}

impl DataHasSpeakerStep {
    pub fn new(scope: &str) -> Self {
        Self {
            scope: scope.to_string(),
        }
    }
}

impl Step for DataHasSpeakerStep {
    fn name(&self) -> &str {
        StepName::DataHasSpeaker.as_str()
    }

    fn state_subset(&self) -> Option<&str> {
        Some(&self.scope)
    }

    fn prompt(&self, ctx: &mut StepContext<'_>) -> Result<Answer, WizardError> {
        ask_choice(ctx, "Does your data have a column/value for the speaker?", &YES_NO)
    }

    fn validate(&self, candidate: &Answer, ctx: &mut StepContext<'_>) -> bool {
        if !is_choice(candidate, &YES_NO) {
            return false;
        }
        if candidate.as_str() == Some("yes")
            && ColumnStep::speaker(&self.scope).candidates(ctx.scope()).is_empty()
        {
            ctx.say(
                "Sorry, every column of your filelist is already in use, so none is left for \
                 speakers. Please answer 'no' and enter a speaker ID instead.",
            );
            return false;
        }
        true
    }

    fn effect(&mut self, ctx: &mut EffectContext<'_>) -> Result<(), WizardError> {
        if ctx.response().as_str() == Some("yes") {
            ctx.add_steps([StepSpec::from(ColumnStep::speaker(&self.scope))]);
        } else {
            ctx.add_steps([StepSpec::from(KnowSpeakerStep::new(&self.scope))]);
        }
        Ok(())
    }

    fn is_reversible(&self) -> bool {
        true
    }
}

/// Asked when there is no speaker column: is there one speaker ID for the
/// whole dataset?
pub struct KnowSpeakerStep {
    scope: String,
}

impl KnowSpeakerStep {
    pub fn new(scope: &str) -> Self {
        Self {
            scope: scope.to_string(),
        }
    }
}

impl Step for KnowSpeakerStep {
    fn name(&self) -> &str {
        StepName::KnowSpeaker.as_str()
    }

    fn state_subset(&self) -> Option<&str> {
        Some(&self.scope)
    }

    fn prompt(&self, ctx: &mut StepContext<'_>) -> Result<Answer, WizardError> {
        ask_choice(
            ctx,
            "Do you know the speaker ID for all of the data in this dataset?",
            &YES_NO,
        )
    }

    fn validate(&self, candidate: &Answer, _ctx: &mut StepContext<'_>) -> bool {
        is_choice(candidate, &YES_NO)
    }

    fn effect(&mut self, ctx: &mut EffectContext<'_>) -> Result<(), WizardError> {
        if ctx.response().as_str() == Some("yes") {
            ctx.add_steps([StepSpec::from(AddSpeakerStep::new(&self.scope))]);
        } else {
            ctx.say(&format!(
                "OK, the speaker ID '{}' will be used for this dataset.",
                DEFAULT_SPEAKER
            ));
        }
        Ok(())
    }

    fn is_reversible(&self) -> bool {
        true
    }
}

pub struct AddSpeakerStep {
    scope: String,
}

impl AddSpeakerStep {
    pub fn new(scope: &str) -> Self {
        Self {
            scope: scope.to_string(),
        }
    }
}

impl Step for AddSpeakerStep {
    fn name(&self) -> &str {
        StepName::AddSpeaker.as_str()
    }

    fn state_subset(&self) -> Option<&str> {
        Some(&self.scope)
    }

    fn prompt(&self, ctx: &mut StepContext<'_>) -> Result<Answer, WizardError> {
        ask_text(ctx, "Please enter a speaker ID for this dataset:")
    }

    fn sanitize_input(&self, raw: Answer) -> Answer {
        trimmed(raw)
    }

    fn validate(&self, candidate: &Answer, ctx: &mut StepContext<'_>) -> bool {
        let id = candidate.as_str().unwrap_or_default();
        if !is_identifier(id) {
            ctx.say(&format!(
                "Sorry, '{}' is not a valid speaker ID. Please use only letters, numbers, '_', '-' and '.'.",
                id
            ));
            return false;
        }
        true
    }

    fn effect(&mut self, ctx: &mut EffectContext<'_>) -> Result<(), WizardError> {
        let message = format!(
            "Great! '{}' will be used as the speaker ID for this dataset.",
            ctx.response().as_str().unwrap_or_default()
        );
        ctx.say(&message);
        Ok(())
    }

    fn is_reversible(&self) -> bool {
        true
    }
}

// ── Languages ────────────────────────────────────────────────────────

pub struct DataHasLanguageStep {
    scope: String,
}

impl DataHasLanguageStep {
    pub fn new(scope: &str) -> Self {
        Self {
            scope: scope.to_string(),
        }
    }
}

impl Step for DataHasLanguageStep {
    fn name(&self) -> &str {
        StepName::DataHasLanguage.as_str()
    }

    fn state_subset(&self) -> Option<&str> {
        Some(&self.scope)
    }

    fn prompt(&self, ctx: &mut StepContext<'_>) -> Result<Answer, WizardError> {
        ask_choice(ctx, "Does your data have a column/value for the language?", &YES_NO)
    }

    fn validate(&self, candidate: &Answer, ctx: &mut StepContext<'_>) -> bool {
        if !is_choice(candidate, &YES_NO) {
            return false;
        }
        if candidate.as_str() == Some("yes")
            && ColumnStep::language(&self.scope).candidates(ctx.scope()).is_empty()
        {
            ctx.say(
                "Sorry, every column of your filelist is already in use, so none is left for \
                 languages. Please answer 'no' and pick the language from the list instead.",
            );
            return false;
        }
        true
    }

    fn effect(&mut self, ctx: &mut EffectContext<'_>) -> Result<(), WizardError> {
        if ctx.response().as_str() == Some("yes") {
            ctx.add_steps([StepSpec::from(ColumnStep::language(&self.scope))]);
        } else {
            ctx.add_steps([StepSpec::from(SelectLanguageStep::new(&self.scope))]);
        }
        Ok(())
    }

    fn is_reversible(&self) -> bool {
        true
    }
}

/// One language for the whole dataset. The answer is its ISO 639-3 code.
pub struct SelectLanguageStep {
    scope: String,
}

impl SelectLanguageStep {
    pub fn new(scope: &str) -> Self {
        Self {
            scope: scope.to_string(),
        }
    }
}

impl Step for SelectLanguageStep {
    fn name(&self) -> &str {
        StepName::SelectLanguage.as_str()
    }

    fn state_subset(&self) -> Option<&str> {
        Some(&self.scope)
    }

    fn prompt(&self, ctx: &mut StepContext<'_>) -> Result<Answer, WizardError> {
        let labels: Vec<String> = LANGUAGES
            .iter()
            .map(|(code, name)| format!("{} ({})", name, code))
            .collect();
        let offered: Vec<&str> = labels.iter().map(String::as_str).collect();
        let picked = match ctx.console().select("Which language is this dataset in?", &offered) {
            Ok(picked) => picked,
            Err(e) => return unmatched(e),
        };
        LANGUAGES
            .get(picked)
            .map(|(code, _)| Answer::from(*code))
            .ok_or_else(|| WizardError::Console(format!("no language number {}", picked)))
    }

    fn validate(&self, candidate: &Answer, _ctx: &mut StepContext<'_>) -> bool {
        candidate
            .as_str()
            .is_some_and(|code| LANGUAGES.iter().any(|(known, _)| *known == code))
    }

    fn is_reversible(&self) -> bool {
        true
    }
}

// ── Audio ────────────────────────────────────────────────────────────

pub struct WavsDirStep {
    scope: String,
}

impl WavsDirStep {
    pub fn new(scope: &str) -> Self {
        Self {
            scope: scope.to_string(),
        }
    }
}

fn contains_wav(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|entries| {
            entries.filter_map(Result::ok).any(|entry| {
                entry
                    .path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
            })
        })
        .unwrap_or(false)
}

impl Step for WavsDirStep {
    fn name(&self) -> &str {
        StepName::WavsDir.as_str()
    }

    fn state_subset(&self) -> Option<&str> {
        Some(&self.scope)
    }

    fn prompt(&self, ctx: &mut StepContext<'_>) -> Result<Answer, WizardError> {
        ask_path(ctx, "Where are your audio files?")
    }

    fn sanitize_input(&self, raw: Answer) -> Answer {
        sanitize_path_answer(raw)
    }

    fn validate(&self, candidate: &Answer, ctx: &mut StepContext<'_>) -> bool {
        let raw = candidate.as_str().unwrap_or_default();
        let dir = Path::new(raw);
        if !dir.is_dir() {
            ctx.say(&format!("Sorry, '{}' is not a directory.", raw));
            return false;
        }
        if !contains_wav(dir) {
            ctx.say(&format!("Sorry, no .wav files were found in '{}'.", raw));
            return false;
        }
        true
    }

    fn is_reversible(&self) -> bool {
        true
    }
}

/// Filelist basenames with no `<basename>.wav` in `dir`.
fn missing_wavs(scope: &State, dir: &Path) -> Vec<String> {
    let Some(col) = column_answer(scope, StepName::BasenameHeader) else {
        return Vec::new();
    };
    data_rows(scope)
        .iter()
        .filter_map(|row| row.get(col))
        .map(|cell| strip_wav_suffix(cell).to_string())
        .filter(|basename| !basename.is_empty() && !has_wav(dir, basename))
        .collect()
}

fn has_wav(dir: &Path, basename: &str) -> bool {
    dir.join(format!("{}.wav", basename)).is_file()
}

/// Checks that every filelist entry has its audio file. When nothing is
/// missing the step answers itself.
pub struct ValidateWavsStep {
    scope: String,
}

impl ValidateWavsStep {
    pub fn new(scope: &str) -> Self {
        Self {
            scope: scope.to_string(),
        }
    }
}

impl Step for ValidateWavsStep {
    fn name(&self) -> &str {
        StepName::ValidateWavs.as_str()
    }

    fn state_subset(&self) -> Option<&str> {
        Some(&self.scope)
    }

    fn prompt(&self, ctx: &mut StepContext<'_>) -> Result<Answer, WizardError> {
        let Some(dir) = ctx.scope().get_str(StepName::WavsDir.as_str()).map(str::to_string) else {
            return Err(WizardError::Console("no audio directory recorded".to_string()));
        };
        let missing = missing_wavs(ctx.scope(), Path::new(&dir));
        let Some(first) = missing.first() else {
            ctx.say("Great! Every file in your filelist has its audio.");
            return Ok(Answer::from("yes"));
        };
        let warning = format!(
            "Warning: {} wav files were not found in '{}', for example '{}.wav'. \
             They will be left out of this dataset.",
            missing.len(),
            dir,
            first
        );
        ctx.say(&warning);
        ask_choice(ctx, "Do you want to continue anyway?", &YES_NO)
    }

    fn validate(&self, candidate: &Answer, _ctx: &mut StepContext<'_>) -> bool {
        is_choice(candidate, &YES_NO)
    }

    fn effect(&mut self, ctx: &mut EffectContext<'_>) -> Result<(), WizardError> {
        if ctx.response().as_str() == Some("no") {
            ctx.say("OK, please fix your filelist or your audio files and run the wizard again.");
            return Err(WizardError::Aborted(AbortReason::UserExit));
        }
        Ok(())
    }

    fn is_reversible(&self) -> bool {
        true
    }
}

// ── Text ─────────────────────────────────────────────────────────────

/// Optional lowercasing and NFC normalization of the utterance text. The
/// answer is the list of chosen labels; the processing itself runs when the
/// dataset is named.
pub struct TextProcessingStep {
    scope: String,
}

impl TextProcessingStep {
    pub fn new(scope: &str) -> Self {
        Self {
            scope: scope.to_string(),
        }
    }
}

fn chosen_processes(answer: &Answer) -> Option<Vec<TextProcess>> {
    answer
        .as_array()?
        .iter()
        .map(|label| label.as_str().and_then(TextProcess::from_label))
        .collect()
}

impl Step for TextProcessingStep {
    fn name(&self) -> &str {
        StepName::TextProcessing.as_str()
    }

    fn state_subset(&self) -> Option<&str> {
        Some(&self.scope)
    }

    fn prompt(&self, ctx: &mut StepContext<'_>) -> Result<Answer, WizardError> {
        let labels: Vec<&str> = TextProcess::ALL.iter().map(|p| p.label()).collect();
        ask_choices(
            ctx,
            "Which of the following text transformations would like to apply to your dataset's \
             text? (none is fine)",
            &labels,
        )
    }

    fn validate(&self, candidate: &Answer, ctx: &mut StepContext<'_>) -> bool {
        if chosen_processes(candidate).is_none() {
            ctx.say(&format!(
                "Sorry, '{}' is not a list of text transformations.",
                waymark_core::answer_text(candidate)
            ));
            return false;
        }
        true
    }

    fn is_reversible(&self) -> bool {
        true
    }
}

// ── Sample rate ──────────────────────────────────────────────────────

pub struct SampleRateStep {
    scope: String,
}

impl SampleRateStep {
    pub fn new(scope: &str) -> Self {
        Self {
            scope: scope.to_string(),
        }
    }
}

const MIN_SAMPLE_RATE: u64 = 100;

impl Step for SampleRateStep {
    fn name(&self) -> &str {
        StepName::SampleRate.as_str()
    }

    fn state_subset(&self) -> Option<&str> {
        Some(&self.scope)
    }

    fn prompt(&self, ctx: &mut StepContext<'_>) -> Result<Answer, WizardError> {
        ask_text(ctx, "What is the sample rate (in Hertz) of your data?")
    }

    /// Integers are stored as numbers, anything else is kept for the
    /// validator to reject.
    fn sanitize_input(&self, raw: Answer) -> Answer {
        match trimmed(raw) {
            Answer::String(s) => s.parse::<u64>().map(Answer::from).unwrap_or(Answer::String(s)),
            other => other,
        }
    }

    fn validate(&self, candidate: &Answer, ctx: &mut StepContext<'_>) -> bool {
        match candidate.as_u64() {
            Some(rate) if rate >= MIN_SAMPLE_RATE => true,
            _ => {
                ctx.say(&format!(
                    "Sorry, '{}' is not a valid sample rate. Please enter an integer of at least {}.",
                    waymark_core::answer_text(candidate),
                    MIN_SAMPLE_RATE
                ));
                false
            }
        }
    }

    fn is_reversible(&self) -> bool {
        true
    }
}

// ── Dataset Name ─────────────────────────────────────────────────────

/// Last question of a dataset: names it and normalizes its filelist.
pub struct DatasetNameStep {
    scope: String,
}

impl DatasetNameStep {
    pub fn new(scope: &str) -> Self {
        Self {
            scope: scope.to_string(),
        }
    }
}

/// Turn the stored filelist rows into utterances using the column,
/// speaker, language and text processing answers. Entries whose audio is
/// missing from the chosen audio directory are left out.
pub fn build_utterances(scope: &State) -> Vec<Utterance> {
    let (Some(basename_col), Some(text_col)) = (
        column_answer(scope, StepName::BasenameHeader),
        column_answer(scope, StepName::TextHeader),
    ) else {
        return Vec::new();
    };
    let speaker_col = column_answer(scope, StepName::SpeakerHeader);
    let fixed_speaker = scope
        .get_str(StepName::AddSpeaker.as_str())
        .unwrap_or(DEFAULT_SPEAKER);
    let language_col = column_answer(scope, StepName::LanguageHeader);
    let fixed_language = scope
        .get_str(StepName::SelectLanguage.as_str())
        .unwrap_or(UNDETERMINED_LANGUAGE);
    let processes = scope
        .answer(StepName::TextProcessing.as_str())
        .and_then(chosen_processes)
        .unwrap_or_default();
    let wavs_dir = scope.get_str(StepName::WavsDir.as_str()).map(Path::new);

    let cell = |row: &[String], col: Option<usize>, fallback: &str| -> String {
        col.and_then(|c| row.get(c))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .unwrap_or(fallback)
            .to_string()
    };

    data_rows(scope)
        .iter()
        .filter_map(|row| {
            let basename = strip_wav_suffix(row.get(basename_col)?);
            if basename.is_empty() || wavs_dir.is_some_and(|dir| !has_wav(dir, basename)) {
                return None;
            }
            let text = processes
                .iter()
                .fold(collapse_whitespace(row.get(text_col)?), |text, p| p.apply(&text));
            Some(Utterance {
                basename: basename.to_string(),
                language: cell(row, language_col, fixed_language),
                speaker: cell(row, speaker_col, fixed_speaker),
                text,
            })
        })
        .collect()
}

impl Step for DatasetNameStep {
    fn name(&self) -> &str {
        StepName::DatasetName.as_str()
    }

    fn state_subset(&self) -> Option<&str> {
        Some(&self.scope)
    }

    fn prompt(&self, ctx: &mut StepContext<'_>) -> Result<Answer, WizardError> {
        ask_text(ctx, "What would you like to call this dataset?")
    }

    fn sanitize_input(&self, raw: Answer) -> Answer {
        trimmed(raw)
    }

    fn validate(&self, candidate: &Answer, ctx: &mut StepContext<'_>) -> bool {
        let name = candidate.as_str().unwrap_or_default();
        if !is_identifier(name) {
            ctx.say(&format!(
                "Sorry, '{}' is not a valid dataset name. Please use only letters, numbers, '_', '-' and '.'.",
                name
            ));
            return false;
        }
        let taken = finished_datasets(ctx.state()).any(|(key, scope)| {
            key != self.scope && scope.get_str(StepName::DatasetName.as_str()) == Some(name)
        });
        if taken {
            ctx.say(&format!("Sorry, another dataset is already called '{}'.", name));
            return false;
        }
        true
    }

    fn effect(&mut self, ctx: &mut EffectContext<'_>) -> Result<(), WizardError> {
        let utterances = ctx.scope().map(build_utterances).unwrap_or_default();
        let data = serde_json::to_value(&utterances)
            .map_err(|e| WizardError::collaborator("filelist data", e.to_string()))?;
        ctx.scope_mut()?.insert(FILELIST_DATA_KEY, data);

        let message = format!(
            "Great! The '{}' dataset has {} utterances. Congratulations, you've finished \
             configuring this dataset!",
            ctx.response().as_str().unwrap_or_default(),
            utterances.len()
        );
        ctx.say(&message);
        Ok(())
    }

    fn is_reversible(&self) -> bool {
        true
    }

    fn undo(&mut self, scope: &mut State) {
        scope.remove(FILELIST_DATA_KEY);
    }
}
