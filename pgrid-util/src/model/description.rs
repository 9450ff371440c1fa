use getset::Getters;
use serde::{Deserialize, Serialize};

/// Statement of a problem.
///
/// `description`, `about_input`, `about_output` and `hint` are HTML fragments
/// that no longer reference remote images. Samples are plain text.
#[derive(Serialize, Deserialize, Getters, Debug, Default, Clone, PartialEq, Eq, Hash)]
#[get = "pub"]
pub struct ProblemDescription {
    title: String,
    description: String,
    about_input: String,
    about_output: String,
    hint: String,
    sample_input: String,
    sample_output: String,
}

impl ProblemDescription {
    pub fn builder(title: impl Into<String>) -> ProblemDescriptionBuilder {
        ProblemDescriptionBuilder(Self {
            title: title.into(),
            ..Self::default()
        })
    }

    pub fn html_sections(&self) -> [(&'static str, &str); 4] {
        [
            ("Description", self.description.as_str()),
            ("Input", self.about_input.as_str()),
            ("Output", self.about_output.as_str()),
            ("Hint", self.hint.as_str()),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct ProblemDescriptionBuilder(ProblemDescription);

impl ProblemDescriptionBuilder {
    pub fn description(mut self, html: impl Into<String>) -> Self {
        self.0.description = html.into();
        self
    }

    pub fn about_input(mut self, html: impl Into<String>) -> Self {
        self.0.about_input = html.into();
        self
    }

    pub fn about_output(mut self, html: impl Into<String>) -> Self {
        self.0.about_output = html.into();
        self
    }

    pub fn hint(mut self, html: impl Into<String>) -> Self {
        self.0.hint = html.into();
        self
    }

    pub fn samples(mut self, input: impl Into<String>, output: impl Into<String>) -> Self {
        self.0.sample_input = input.into();
        self.0.sample_output = output.into();
        self
    }

    pub fn build(self) -> ProblemDescription {
        self.0
    }
}
