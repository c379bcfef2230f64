//! Terminal rendition of the cancel / withdrawal form.
//!
//! [`FormRunner`] walks the visible fields of a [`FormController`], asking a
//! [`FormInteraction`] for each value. Two interactions ship with the CLI:
//! [`DialoguerInteraction`] for people at a terminal and
//! [`ScriptedInteraction`] which answers prompts from a line-based reader.

use std::io::BufRead;

use dialoguer::{theme::ColorfulTheme, Input, Select};
use tokio::runtime::Runtime;

use crate::cli::output;
use crate::core::{BoundField, FormController, InputKind, SubmitOutcome};
use crate::domain::{Displayable, FieldName, FieldValue, PersonSelection, SubmissionRecord};
use crate::sharepoint::ListApi;

const PEOPLE_SUGGESTIONS: usize = 10;

/// Describes how prompts can be answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptResponse {
    /// User supplied a concrete value.
    Value(String),
    /// User chose to keep the current value.
    Keep,
    /// Abort the form.
    Cancel,
    /// Go back to the previous field.
    Back,
    /// Request additional information for the current field.
    Help,
}

/// Responses accepted when reviewing the collected data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationResponse {
    Submit,
    Back,
    Cancel,
}

/// Choices offered after a submission did not go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    Retry,
    Edit,
    Quit,
}

/// How a form session ended.
#[derive(Debug)]
pub enum RunResult {
    Submitted(SubmissionRecord),
    Cancelled,
    /// Lookup data never arrived; the form cannot be filled in.
    LookupUnavailable,
}

pub struct PromptContext<'a> {
    pub field: &'a BoundField,
    pub index: usize,
    pub total: usize,
}

pub trait FormInteraction {
    fn prompt_field(&mut self, context: &PromptContext<'_>) -> PromptResponse;

    /// Index of the chosen suggestion, `None` to search again.
    fn pick_person(&mut self, candidates: &[PersonSelection]) -> Option<usize>;

    fn confirm(&mut self, lines: &[String]) -> ConfirmationResponse;

    fn after_failure(&mut self) -> FailureAction;
}

/// Drives a [`FormController`] with a [`FormInteraction`].
pub struct FormRunner<'a, A: ListApi> {
    controller: &'a mut FormController<A>,
    runtime: &'a Runtime,
}

impl<'a, A: ListApi> FormRunner<'a, A> {
    pub fn new(controller: &'a mut FormController<A>, runtime: &'a Runtime) -> Self {
        Self {
            controller,
            runtime,
        }
    }

    pub fn run<I: FormInteraction>(&mut self, interaction: &mut I) -> RunResult {
        if !self.runtime.block_on(self.controller.load_lookup()).is_loaded() {
            output::warning("loading...");
            return RunResult::LookupUnavailable;
        }

        output::section(self.controller.heading());
        let mut index = 0;

        loop {
            let fields = self.controller.bound_fields();
            if index >= fields.len() {
                match self.review(interaction) {
                    Review::Done(result) => return result,
                    Review::EditFrom(target) => {
                        index = target;
                        continue;
                    }
                }
            }

            let field = &fields[index];
            if field.disabled {
                output::detail(format!("{}: {}", field.label, field.display));
                index += 1;
                continue;
            }

            let context = PromptContext {
                field,
                index,
                total: fields.len(),
            };
            match interaction.prompt_field(&context) {
                PromptResponse::Cancel => return RunResult::Cancelled,
                PromptResponse::Back => index = previous_editable(&fields, index),
                PromptResponse::Help => print_help(field),
                PromptResponse::Keep => {
                    if let Some(error) = &field.error {
                        output::warning(error);
                    } else if field.required && field.value.is_empty() {
                        output::warning("This field is required.");
                    } else {
                        index += 1;
                    }
                }
                PromptResponse::Value(raw) => {
                    if self.apply_value(interaction, field, &raw) {
                        index += 1;
                    }
                }
            }
        }
    }

    /// Returns true when the field accepted the value.
    fn apply_value<I: FormInteraction>(
        &mut self,
        interaction: &mut I,
        field: &BoundField,
        raw: &str,
    ) -> bool {
        if matches!(field.kind, InputKind::PeoplePicker { .. }) && !raw.contains('@') {
            return self.pick_advisor(interaction, raw);
        }
        match self.controller.change_input(field.field, raw) {
            Ok(None) => true,
            Ok(Some(err)) => {
                output::warning(&err.message);
                false
            }
            Err(err) => {
                output::warning(err);
                false
            }
        }
    }

    fn pick_advisor<I: FormInteraction>(&mut self, interaction: &mut I, query: &str) -> bool {
        let found = self
            .runtime
            .block_on(self.controller.search_people(query, PEOPLE_SUGGESTIONS));
        let candidates = match found {
            Ok(candidates) => candidates,
            Err(err) => {
                output::warning(format!("People search failed: {err}"));
                return false;
            }
        };
        if candidates.is_empty() {
            output::warning("No matching people. Type at least five characters of a name or an email.");
            return false;
        }
        let Some(choice) = interaction.pick_person(&candidates) else {
            return false;
        };
        let Some(person) = candidates.get(choice) else {
            output::warning("Select one of the listed people.");
            return false;
        };
        match self
            .controller
            .set_field(FieldName::AaFaAdvisor, FieldValue::People(vec![person.clone()]))
        {
            Ok(None) => true,
            Ok(Some(err)) => {
                output::warning(&err.message);
                false
            }
            Err(err) => {
                output::warning(err);
                false
            }
        }
    }

    fn review<I: FormInteraction>(&mut self, interaction: &mut I) -> Review {
        let fields = self.controller.bound_fields();
        let mut lines = vec!["Review your entries:".to_string()];
        for field in &fields {
            let display = if field.display.is_empty() {
                "[unfilled]"
            } else {
                field.display.as_str()
            };
            lines.push(format!("  {}: {}", field.label, display));
        }

        match interaction.confirm(&lines) {
            ConfirmationResponse::Cancel => Review::Done(RunResult::Cancelled),
            ConfirmationResponse::Back => {
                Review::EditFrom(previous_editable(&fields, fields.len()))
            }
            ConfirmationResponse::Submit => self.submit(interaction),
        }
    }

    fn submit<I: FormInteraction>(&mut self, interaction: &mut I) -> Review {
        loop {
            match self.runtime.block_on(self.controller.submit()) {
                SubmitOutcome::Submitted(record) => {
                    output::section(self.controller.heading());
                    output::success("Your request was recorded.");
                    return Review::Done(RunResult::Submitted(record));
                }
                SubmitOutcome::AlreadySubmitted => {
                    output::section(self.controller.heading());
                    return Review::Done(RunResult::Cancelled);
                }
                SubmitOutcome::Invalid(errors) => {
                    let fields = self.controller.bound_fields();
                    for field in &fields {
                        if let Some(error) = &field.error {
                            output::warning(format!("{}: {}", field.label, error));
                        }
                    }
                    let first = fields
                        .iter()
                        .position(|field| errors.contains_key(&field.field))
                        .unwrap_or(0);
                    return Review::EditFrom(first);
                }
                SubmitOutcome::Failed(_) => {
                    output::error("The request could not be submitted. Your entries are unchanged.");
                    match interaction.after_failure() {
                        FailureAction::Retry => continue,
                        FailureAction::Edit => return Review::EditFrom(0),
                        FailureAction::Quit => return Review::Done(RunResult::Cancelled),
                    }
                }
            }
        }
    }
}

enum Review {
    Done(RunResult),
    EditFrom(usize),
}

fn previous_editable(fields: &[BoundField], index: usize) -> usize {
    (0..index.min(fields.len()))
        .rev()
        .find(|candidate| !fields[*candidate].disabled)
        .unwrap_or(0)
}

fn print_help(field: &BoundField) {
    let requirement = if field.required { "Required." } else { "Optional." };
    output::detail(format!("{} {}", field.label, requirement));
    match &field.kind {
        InputKind::Dropdown(_) | InputKind::Toggle => {
            let options: Vec<String> = field
                .kind
                .options()
                .iter()
                .enumerate()
                .map(|(idx, option)| format!("[{}] {}", idx + 1, option.text))
                .collect();
            output::detail(format!("Options: {}", options.join(", ")));
        }
        InputKind::Date => output::detail("Use YYYY-MM-DD."),
        InputKind::Number => output::detail("Digits only."),
        InputKind::PeoplePicker {
            search_text_limit, ..
        } => output::detail(format!(
            "Type at least {search_text_limit} characters to search, or enter an email."
        )),
        InputKind::Text => {}
    }
    output::detail("Type :back to revisit the previous field or :cancel to abort.");
}

/// Shared interpretation of typed answers.
fn interpret_line(line: &str) -> PromptResponse {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return PromptResponse::Keep;
    }
    match trimmed.to_ascii_lowercase().as_str() {
        ":cancel" => PromptResponse::Cancel,
        ":back" => PromptResponse::Back,
        ":help" => PromptResponse::Help,
        _ => PromptResponse::Value(trimmed.to_string()),
    }
}

/// Answers prompts line by line from a reader; end of input cancels.
pub struct ScriptedInteraction<R: BufRead> {
    reader: R,
}

impl<R: BufRead> ScriptedInteraction<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    fn next_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

impl<R: BufRead> FormInteraction for ScriptedInteraction<R> {
    fn prompt_field(&mut self, context: &PromptContext<'_>) -> PromptResponse {
        println!("{}:", context.field.label);
        match self.next_line() {
            Some(line) => interpret_line(&line),
            None => PromptResponse::Cancel,
        }
    }

    fn pick_person(&mut self, candidates: &[PersonSelection]) -> Option<usize> {
        for (idx, person) in candidates.iter().enumerate() {
            println!("  [{}] {}", idx + 1, person.display_label());
        }
        let line = self.next_line()?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Some(0);
        }
        trimmed.parse::<usize>().ok()?.checked_sub(1)
    }

    fn confirm(&mut self, lines: &[String]) -> ConfirmationResponse {
        for line in lines {
            println!("{line}");
        }
        match self.next_line().as_deref().map(str::trim) {
            Some("") | Some("submit") | Some("y") | Some("yes") => ConfirmationResponse::Submit,
            Some(":back") | Some("back") => ConfirmationResponse::Back,
            _ => ConfirmationResponse::Cancel,
        }
    }

    fn after_failure(&mut self) -> FailureAction {
        match self.next_line().as_deref().map(str::trim) {
            Some("retry") => FailureAction::Retry,
            Some("edit") => FailureAction::Edit,
            _ => FailureAction::Quit,
        }
    }
}

/// Interactive prompts for a terminal session.
pub struct DialoguerInteraction {
    theme: ColorfulTheme,
}

impl DialoguerInteraction {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }

    fn step_title(&self, context: &PromptContext<'_>) -> String {
        let marker = if context.field.required { " *" } else { "" };
        format!(
            "[{}/{}] {}{}",
            context.index + 1,
            context.total,
            context.field.label,
            marker
        )
    }

    fn prompt_text(&mut self, context: &PromptContext<'_>) -> PromptResponse {
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(self.step_title(context))
            .allow_empty(true);
        if !context.field.display.is_empty() {
            input = input.default(context.field.display.clone()).show_default(true);
        }
        match input.interact_text() {
            Ok(line) if line == context.field.display && !line.is_empty() => PromptResponse::Keep,
            Ok(line) => interpret_line(&line),
            Err(_) => PromptResponse::Cancel,
        }
    }

    fn prompt_choice(&mut self, context: &PromptContext<'_>) -> PromptResponse {
        let options = context.field.kind.options();
        let mut items: Vec<String> = options.iter().map(|option| option.text.clone()).collect();
        let back_index = items.len();
        if context.index > 0 {
            items.push("<- Back".to_string());
        }
        let current = context
            .field
            .value
            .as_text()
            .and_then(|key| options.iter().position(|option| option.key == key))
            .unwrap_or(0);

        let selection = Select::with_theme(&self.theme)
            .with_prompt(self.step_title(context))
            .items(&items)
            .default(current)
            .interact_opt();
        match selection {
            Ok(Some(idx)) if idx == back_index => PromptResponse::Back,
            Ok(Some(idx)) => PromptResponse::Value(options[idx].key.clone()),
            Ok(None) | Err(_) => PromptResponse::Cancel,
        }
    }
}

impl Default for DialoguerInteraction {
    fn default() -> Self {
        Self::new()
    }
}

impl FormInteraction for DialoguerInteraction {
    fn prompt_field(&mut self, context: &PromptContext<'_>) -> PromptResponse {
        if let Some(error) = &context.field.error {
            output::warning(error);
        }
        match &context.field.kind {
            InputKind::Dropdown(options) if options.is_empty() => PromptResponse::Cancel,
            InputKind::Dropdown(_) | InputKind::Toggle => self.prompt_choice(context),
            _ => self.prompt_text(context),
        }
    }

    fn pick_person(&mut self, candidates: &[PersonSelection]) -> Option<usize> {
        let mut items: Vec<String> = candidates.iter().map(|p| p.display_label()).collect();
        items.push("Search again".to_string());
        match Select::with_theme(&self.theme)
            .with_prompt("Select the advisor")
            .items(&items)
            .default(0)
            .interact_opt()
        {
            Ok(Some(idx)) if idx < candidates.len() => Some(idx),
            _ => None,
        }
    }

    fn confirm(&mut self, lines: &[String]) -> ConfirmationResponse {
        for line in lines {
            output::detail(line);
        }
        let items = ["Submit", "Edit previous field", "Cancel"];
        match Select::with_theme(&self.theme)
            .with_prompt("Ready to submit?")
            .items(&items)
            .default(0)
            .interact_opt()
        {
            Ok(Some(0)) => ConfirmationResponse::Submit,
            Ok(Some(1)) => ConfirmationResponse::Back,
            _ => ConfirmationResponse::Cancel,
        }
    }

    fn after_failure(&mut self) -> FailureAction {
        let items = ["Retry submission", "Edit entries", "Quit"];
        match Select::with_theme(&self.theme)
            .with_prompt("What next?")
            .items(&items)
            .default(0)
            .interact_opt()
        {
            Ok(Some(0)) => FailureAction::Retry,
            Ok(Some(1)) => FailureAction::Edit,
            _ => FailureAction::Quit,
        }
    }
}
