use clap::ValueEnum;

use crate::repository::View;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Purge the base path, then import FILE there
    Import,
    /// Export the base path to FILE as system view
    Export,
    /// Export the base path to FILE as document view
    #[value(name = "exportdocument")]
    ExportDocument,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Import => "import",
            Command::Export => "export",
            Command::ExportDocument => "exportdocument",
        }
    }

    pub fn view(&self) -> Option<View> {
        match self {
            Command::Import => None,
            Command::Export => Some(View::System),
            Command::ExportDocument => Some(View::Document),
        }
    }
}
