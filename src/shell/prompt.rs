use crate::auth::{Prompt, Prompter};
use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Password};

/// Answers dialogue prompts on the terminal (drawn on stderr).
pub struct TerminalPrompter {
    theme: ColorfulTheme,
    last_title: Option<&'static str>,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
            last_title: None,
        }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for TerminalPrompter {
    fn ask(&mut self, prompt: Prompt) -> anyhow::Result<Option<String>> {
        let title = prompt.title();
        if self.last_title != Some(title) {
            eprintln!("{}", style(title).bold().cyan());
            self.last_title = Some(title);
        }

        let answer = if prompt.is_secret() {
            Password::with_theme(&self.theme)
                .with_prompt(prompt.text())
                .allow_empty_password(true)
                .interact()?
        } else {
            Input::<String>::with_theme(&self.theme)
                .with_prompt(prompt.text())
                .allow_empty(true)
                .interact_text()?
        };
        Ok(Some(answer))
    }
}
