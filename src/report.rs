use crate::{error::RenderError, harvest::HarvestReport, verify::CheckReport};
use askama::Template;
use serde::Serialize;
use strum::{Display, EnumString};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Template)]
#[template(path = "harvest.txt")]
struct HarvestView<'a> {
    report: &'a HarvestReport,
}

#[derive(Template)]
#[template(path = "check.txt")]
struct CheckView<'a> {
    report: &'a CheckReport,
}

pub trait Render: Serialize {
    fn render_text(&self) -> Result<String, askama::Error>;

    fn render(&self, format: OutputFormat) -> Result<String, RenderError> {
        match format {
            OutputFormat::Text => Ok(self.render_text()?),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

impl Render for HarvestReport {
    fn render_text(&self) -> Result<String, askama::Error> {
        HarvestView { report: self }.render()
    }
}

impl Render for CheckReport {
    fn render_text(&self) -> Result<String, askama::Error> {
        CheckView { report: self }.render()
    }
}
