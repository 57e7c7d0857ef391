//! Project-level questions, asked in the root scope.

use std::fs;
use std::io;
use std::path::Path;

use waymark_core::{
    sanitize_path_answer, Answer, EffectContext, Step, StepContext, StepSpec, WizardError,
};

use super::{
    ask_choice, ask_path, ask_text, dataset_flow, dataset_scope, is_choice, is_identifier, trimmed,
    StepName, YES_NO,
};
use crate::project::{finished_datasets, ConfigFormat, ProjectConfig};

pub struct NameStep;

impl Step for NameStep {
    fn name(&self) -> &str {
        StepName::Name.as_str()
    }

    fn prompt(&self, ctx: &mut StepContext<'_>) -> Result<Answer, WizardError> {
        ask_text(
            ctx,
            "What would you like to call this project? This name should reflect the model you \
             intend to train, e.g. 'my-sinhala-project' or 'english-speaker-x'.",
        )
    }

    fn sanitize_input(&self, raw: Answer) -> Answer {
        trimmed(raw)
    }

    fn validate(&self, candidate: &Answer, ctx: &mut StepContext<'_>) -> bool {
        let name = candidate.as_str().unwrap_or_default();
        if name.is_empty() {
            ctx.say("Sorry, your project needs a name.");
            return false;
        }
        if !is_identifier(name) {
            ctx.say(&format!(
                "Sorry, '{}' is not a valid name. Please use only letters, numbers, '_', '-' and '.'.",
                name
            ));
            return false;
        }
        true
    }

    fn is_reversible(&self) -> bool {
        true
    }
}

pub struct ContactNameStep;

impl Step for ContactNameStep {
    fn name(&self) -> &str {
        StepName::ContactName.as_str()
    }

    fn prompt(&self, ctx: &mut StepContext<'_>) -> Result<Answer, WizardError> {
        ask_text(
            ctx,
            "What is your full name? It is recorded in the project so others know whom to contact about it.",
        )
    }

    fn sanitize_input(&self, raw: Answer) -> Answer {
        trimmed(raw)
    }

    fn validate(&self, candidate: &Answer, ctx: &mut StepContext<'_>) -> bool {
        let name = candidate.as_str().unwrap_or_default();
        if name.chars().count() < 3 {
            ctx.say("Sorry, please enter at least 3 characters for your name.");
            return false;
        }
        true
    }

    fn is_reversible(&self) -> bool {
        true
    }
}

pub struct ContactEmailStep;

/// One `@`, something before it, a dotted domain after it, no trailing period.
fn email_problem(email: &str) -> Option<&'static str> {
    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Some("an email address needs exactly one '@'"),
    };
    if local.is_empty() {
        return Some("there is nothing before the '@'");
    }
    if email.chars().any(char::is_whitespace) {
        return Some("an email address cannot contain spaces");
    }
    if !domain.contains('.') || domain.starts_with('.') {
        return Some("the part after the '@' must be a domain like 'example.org'");
    }
    if domain.ends_with('.') {
        return Some("it cannot end with a period");
    }
    None
}

impl Step for ContactEmailStep {
    fn name(&self) -> &str {
        StepName::ContactEmail.as_str()
    }

    fn prompt(&self, ctx: &mut StepContext<'_>) -> Result<Answer, WizardError> {
        ask_text(ctx, "Please provide a contact email address for your project.")
    }

    fn sanitize_input(&self, raw: Answer) -> Answer {
        trimmed(raw)
    }

    fn validate(&self, candidate: &Answer, ctx: &mut StepContext<'_>) -> bool {
        let email = candidate.as_str().unwrap_or_default();
        match email_problem(email) {
            None => true,
            Some(problem) => {
                ctx.say(&format!("Sorry, '{}' is not a valid email address: {}.", email, problem));
                false
            }
        }
    }

    fn is_reversible(&self) -> bool {
        true
    }
}

pub struct OutputPathStep;

/// Check that `path` can be created as a directory, leaving the filesystem
/// as it was.
fn check_creatable(path: &Path) -> io::Result<()> {
    let mut first_missing = None;
    let mut cursor = Some(path);
    while let Some(p) = cursor {
        if p.as_os_str().is_empty() || p.exists() {
            break;
        }
        first_missing = Some(p);
        cursor = p.parent();
    }
    fs::create_dir_all(path)?;
    if let Some(created) = first_missing {
        fs::remove_dir_all(created)?;
    }
    Ok(())
}

impl Step for OutputPathStep {
    fn name(&self) -> &str {
        StepName::OutputPath.as_str()
    }

    fn prompt(&self, ctx: &mut StepContext<'_>) -> Result<Answer, WizardError> {
        ask_path(
            ctx,
            "Where should the project directory be created? A directory named after the project will be made inside it.",
        )
    }

    fn sanitize_input(&self, raw: Answer) -> Answer {
        sanitize_path_answer(raw)
    }

    fn validate(&self, candidate: &Answer, ctx: &mut StepContext<'_>) -> bool {
        let raw = candidate.as_str().unwrap_or_default();
        if raw.is_empty() {
            ctx.say("Sorry, please enter a directory.");
            return false;
        }
        let path = Path::new(raw);
        if path.is_file() {
            ctx.say(&format!("Sorry, '{}' is a file. Please choose a directory.", raw));
            return false;
        }
        let project = ctx.state().get_str(StepName::Name.as_str()).unwrap_or_default();
        let target = path.join(project);
        if target.exists() {
            ctx.say(&format!(
                "Sorry, '{}' already exists. Please choose another output directory or start \
                 again and choose a different project name.",
                target.display()
            ));
            return false;
        }
        if let Err(e) = check_creatable(path) {
            ctx.say(&format!("Sorry, could not create a directory at '{}': {}", raw, e));
            return false;
        }
        true
    }

    fn effect(&mut self, ctx: &mut EffectContext<'_>) -> Result<(), WizardError> {
        let project = ctx.state().get_str(StepName::Name.as_str()).unwrap_or_default();
        let target = Path::new(ctx.response().as_str().unwrap_or_default()).join(project);
        let message = format!(
            "The project will be created at '{}' once the wizard is finished.",
            target.display()
        );
        ctx.say(&message);
        Ok(())
    }

    fn is_reversible(&self) -> bool {
        true
    }
}

/// "Any more datasets?" Yes opens another dataset flow followed by another
/// More Datasets step, no moves on to writing the config.
pub struct MoreDatasetsStep {
    next_index: usize,
    subset: Option<String>,
}

impl MoreDatasetsStep {
    /// The first instance, asked in the root scope.
    pub fn top_level(next_index: usize) -> Self {
        Self {
            next_index,
            subset: None,
        }
    }

    /// Later instances live in the scope of the dataset added just before
    /// them, so each keeps its own answer.
    pub fn after_dataset(index: usize) -> Self {
        Self {
            next_index: index + 1,
            subset: Some(dataset_scope(index)),
        }
    }
}

impl Step for MoreDatasetsStep {
    fn name(&self) -> &str {
        StepName::MoreDatasets.as_str()
    }

    fn state_subset(&self) -> Option<&str> {
        self.subset.as_deref()
    }

    fn prompt(&self, ctx: &mut StepContext<'_>) -> Result<Answer, WizardError> {
        ask_choice(ctx, "Do you have more data you want to add?", &YES_NO)
    }

    fn validate(&self, candidate: &Answer, _ctx: &mut StepContext<'_>) -> bool {
        is_choice(candidate, &YES_NO)
    }

    fn effect(&mut self, ctx: &mut EffectContext<'_>) -> Result<(), WizardError> {
        if ctx.response().as_str() == Some("yes") {
            ctx.add_steps([
                dataset_flow(self.next_index),
                MoreDatasetsStep::after_dataset(self.next_index).into(),
            ]);
        } else if finished_datasets(ctx.state()).next().is_none() {
            ctx.say("No dataset to save, exiting without saving.");
        } else {
            ctx.add_steps([StepSpec::from(ConfigFormatStep)]);
        }
        Ok(())
    }

    fn is_reversible(&self) -> bool {
        true
    }
}

/// Writes the project to disk. Not reversible.
pub struct ConfigFormatStep;

const FORMAT_CHOICES: [&str; 2] = ["toml", "json"];

impl Step for ConfigFormatStep {
    fn name(&self) -> &str {
        StepName::ConfigFormat.as_str()
    }

    fn prompt(&self, ctx: &mut StepContext<'_>) -> Result<Answer, WizardError> {
        ask_choice(
            ctx,
            "Which format would you like to output the configuration to?",
            &FORMAT_CHOICES,
        )
    }

    fn validate(&self, candidate: &Answer, _ctx: &mut StepContext<'_>) -> bool {
        candidate
            .as_str()
            .and_then(ConfigFormat::from_label)
            .is_some()
    }

    fn effect(&mut self, ctx: &mut EffectContext<'_>) -> Result<(), WizardError> {
        let format = ctx
            .response()
            .as_str()
            .and_then(ConfigFormat::from_label)
            .ok_or_else(|| WizardError::collaborator("config format", "unknown format"))?;
        let config = ProjectConfig::from_state(ctx.state())?;
        let path = config.write(format)?;
        let message = format!(
            "Congratulations, your project configuration was written to '{}'.",
            path.display()
        );
        ctx.say(&message);
        Ok(())
    }
}
