use std::{collections::BTreeSet, str::FromStr};

use common::{InputKind, Rom};
use pest::Parser;
use tracing::trace;

use crate::error::SourceError;

#[derive(Parser)]
#[grammar = "project.pest"]
struct ProjectParser;

/// The files that make up a project directory.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(EnumIter)]
pub enum ProjectFile {
    #[strum(serialize = "project.txt")]
    Project,
    #[strum(serialize = "input_pins.txt")]
    InputPins,
    #[strum(serialize = "output_pins.txt")]
    OutputPins,
    #[strum(serialize = "code.txt")]
    Code,
}

/// Sections of `project.txt`.
#[derive(Clone, Copy, Display, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Section {
    Overview,
    Hardware,
    Description,
}

/// Sections of `code.txt` that aren't named instructions.
#[derive(Clone, Copy, Display, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(EnumIter, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum InstructionGroup {
    #[strum(serialize = "fetch")]
    Fetch,
    #[strum(serialize = "final")]
    Final,
    #[strum(serialize = "*")]
    Unused,
}

/// `[A-Z][A-Za-z0-9_/ ()#,\-\[\]]*`
pub fn is_instruction_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || "_/ ()#,-[]".contains(c))
}

impl ProjectFile {
    pub fn is_valid_group(&self, name: &str) -> bool {
        match self {
            ProjectFile::Project => Section::from_str(name).is_ok(),
            ProjectFile::InputPins => InputKind::from_str(name).is_ok(),
            ProjectFile::OutputPins => Rom::from_str(name).is_ok(),
            ProjectFile::Code => name == "fetch" || name == "final" || name == "*" || is_instruction_name(name),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceLine {
    pub number: usize,
    pub indented: bool,
    pub columns: Vec<String>,
}

impl SourceLine {
    /// The columns joined by single spaces.
    pub fn text(&self) -> String {
        self.columns.join(" ")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceGroup {
    pub name: String,
    pub number: usize,
    pub lines: Vec<SourceLine>,
}

/// A parsed project file: named groups of non-blank lines, comments removed.
#[derive(Clone, Debug)]
pub struct SourceFile {
    file: ProjectFile,
    groups: Vec<SourceGroup>,
}

impl SourceFile {
    pub fn parse(file: ProjectFile, text: &str) -> Result<SourceFile, SourceError> {
        let mut parsed = ProjectParser::parse(Rule::file, text)
            .map_err(|e| SourceError::Syntax { file, message: e.to_string() })?;
        let lines = match parsed.next() {
            Some(pair) => pair.into_inner(),
            None => return Ok(SourceFile { file, groups: Vec::new() }),
        };

        let mut groups: Vec<SourceGroup> = Vec::new();
        let mut seen = BTreeSet::new();
        for line in lines.filter(|p| p.as_rule() == Rule::line) {
            let (number, _) = line.as_span().start_pos().line_col();
            let mut header = None;
            let mut indented = false;
            let mut columns = Vec::new();
            for part in line.into_inner() {
                match part.as_rule() {
                    Rule::header => header = part.into_inner().next().map(|n| n.as_str().to_owned()),
                    Rule::indent => indented = true,
                    Rule::columns => columns = part.into_inner().map(|c| c.as_str().to_owned()).collect(),
                    _ => {}
                }
            }

            if let Some(name) = header {
                let key = match file {
                    ProjectFile::Code => InstructionGroup::from_str(&name)
                        .map_or_else(|_| name.clone(), |g| g.to_string()),
                    _ => name.to_ascii_uppercase(),
                };
                if !file.is_valid_group(&name) || !seen.insert(key) {
                    return Err(SourceError::line(file, number, format!("Invalid section name '{}'", name)));
                }
                trace!(%file, number, name = name.as_str(), "section");
                groups.push(SourceGroup { name, number, lines: Vec::new() });
                continue;
            }

            let first = match columns.first() {
                Some(first) => first,
                None => continue,
            };
            if !indented && first.starts_with('[') {
                let text = columns.join(" ");
                return Err(SourceError::line(file, number, format!("Invalid section name '{}'", text)));
            }
            match groups.last_mut() {
                Some(group) => group.lines.push(SourceLine { number, indented, columns }),
                None => return Err(SourceError::line(file, number, "Missing section name")),
            }
        }

        Ok(SourceFile { file, groups })
    }

    pub fn file(&self) -> ProjectFile {
        self.file
    }

    pub fn groups(&self) -> &[SourceGroup] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&SourceGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// The group whose name parses as `T`, ignoring case where `T` does.
    pub fn find<T: FromStr + PartialEq>(&self, value: T) -> Option<&SourceGroup> {
        self.groups.iter().find(|g| T::from_str(&g.name).map_or(false, |v| v == value))
    }
}
