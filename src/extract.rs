use crate::{error::ParseError, types::Sample};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Heading prefixes that mark the sample sections of a task statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSet {
    pub input: String,
    pub output: String,
}

/// Label sets for the statement languages AtCoder publishes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, EnumString, Display)]
pub enum LabelPreset {
    #[default]
    #[strum(serialize = "ja")]
    Japanese,
    #[strum(serialize = "en")]
    English,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    Input,
    Output,
}

impl LabelSet {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }

    fn classify(&self, heading: &str) -> Option<SectionKind> {
        let heading = heading.trim_start();
        if heading.starts_with(&self.input) {
            Some(SectionKind::Input)
        } else if heading.starts_with(&self.output) {
            Some(SectionKind::Output)
        } else {
            None
        }
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        LabelPreset::default().into()
    }
}

impl From<LabelPreset> for LabelSet {
    fn from(preset: LabelPreset) -> Self {
        match preset {
            LabelPreset::Japanese => LabelSet::new("入力例", "出力例"),
            LabelPreset::English => LabelSet::new("Sample Input", "Sample Output"),
        }
    }
}

/// Collect the sample pairs of a task page in order of appearance.
///
/// Inputs get a newline appended after every `pre` block, outputs are the
/// bare concatenation, which is what the solution is expected to print.
pub fn extract_samples(doc: &Html, labels: &LabelSet) -> Result<Vec<Sample>, ParseError> {
    let sections = Selector::parse("section").expect("static selector");
    let heading = Selector::parse("h3").expect("static selector");
    let pre = Selector::parse("pre").expect("static selector");

    let mut inputs = vec![];
    let mut outputs = vec![];
    for section in doc.select(&sections) {
        let Some(title) = section.select(&heading).next().map(element_text) else {
            continue;
        };

        match labels.classify(&title) {
            Some(SectionKind::Input) => {
                let text = section
                    .select(&pre)
                    .map(|node| element_text(node) + "\n")
                    .collect::<String>();
                inputs.push(text);
            }
            Some(SectionKind::Output) => {
                let text = section.select(&pre).map(element_text).collect::<String>();
                outputs.push(text);
            }
            None => {}
        }
    }

    if inputs.len() != outputs.len() {
        return Err(ParseError::UnpairedSamples {
            inputs: inputs.len(),
            outputs: outputs.len(),
        });
    }

    Ok(inputs
        .into_iter()
        .zip(outputs)
        .map(|(input, output)| Sample { input, output })
        .collect())
}

fn element_text(node: ElementRef<'_>) -> String {
    node.text().collect()
}
