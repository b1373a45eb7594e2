use std::collections::BTreeMap;

use common::GlobalData;
use tracing::info;

use crate::{
    error::SourceError,
    source::{ProjectFile, Section, SourceFile, SourceGroup},
};

#[derive(Clone, Copy, Display, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(EnumIter)]
pub enum Setting {
    Name,
    Version,
    MaxAddressBit,
}

impl Setting {
    pub fn section(&self) -> Section {
        match self {
            Setting::Name | Setting::Version => Section::Overview,
            Setting::MaxAddressBit => Section::Hardware,
        }
    }
}

/// `key = value` lines of a section, keyed by upper case name.
fn values(group: &SourceGroup) -> Result<BTreeMap<String, String>, SourceError> {
    let mut values = BTreeMap::new();
    for line in &group.lines {
        let text = line.text();
        let (key, value) = text.split_once('=')
            .ok_or_else(|| SourceError::line(ProjectFile::Project, line.number, format!("Expected 'key = value', not '{}'", text)))?;
        values.insert(key.trim().to_ascii_uppercase(), value.trim().to_owned());
    }
    Ok(values)
}

fn setting<'s>(
    source: &'s SourceFile,
    values: &'s BTreeMap<Section, (usize, BTreeMap<String, String>)>,
    setting: Setting,
) -> Result<(usize, &'s str), SourceError> {
    let section = setting.section();
    let (line, values) = values.get(&section).ok_or_else(|| SourceError::MissingSection {
        file: source.file(),
        section: section.to_string(),
    })?;

    values.get(&setting.to_string().to_ascii_uppercase())
        .map(|v| (*line, v.as_str()))
        .ok_or_else(|| SourceError::line(
            source.file(),
            *line,
            format!("Setting '{}' in {} was not defined", setting, section)))
}

/// Reads `project.txt`.
pub fn parse_settings(source: &SourceFile) -> Result<GlobalData, SourceError> {
    let mut sections = BTreeMap::new();
    for section in [Section::Overview, Section::Hardware] {
        if let Some(group) = source.find(section) {
            sections.insert(section, (group.number, values(group)?));
        }
    }

    let (_, name) = setting(source, &sections, Setting::Name)?;
    let (_, version) = setting(source, &sections, Setting::Version)?;
    let (line, max_address_bit) = setting(source, &sections, Setting::MaxAddressBit)?;
    let max_address_bit = max_address_bit.parse::<u32>()
        .map_err(|_| SourceError::line(
            source.file(),
            line,
            format!("Setting '{}' has invalid value '{}'", Setting::MaxAddressBit, max_address_bit)))?;

    let mut global = GlobalData::new(name, version, max_address_bit)
        .map_err(|e| SourceError::Config { file: source.file(), line, source: e })?;
    if let Some(description) = source.find(Section::Description) {
        for line in &description.lines {
            global.add_description(&line.text());
        }
    }

    info!(name = global.name(), version = global.version(), "building application");
    Ok(global)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<GlobalData, SourceError> {
        parse_settings(&SourceFile::parse(ProjectFile::Project, text)?)
    }

    #[test]
    fn settings() {
        let global = parse(
            "[Overview]\n\
             name=SAP-1 Plus\n\
             VERSION =  2.1\n\
             \n\
             [Hardware]\n\
             MaxAddressBit = 12   // AT28C64\n\
             \n\
             [Description]\n\
             Ben Eater's   8 bit computer\n\
             with a wider control word\n").unwrap();

        assert_eq!("SAP-1 Plus", global.name());
        assert_eq!("2.1", global.version());
        assert_eq!(12, global.max_address_bit());
        assert_eq!(4096 * 2, global.rom_size());
        assert_eq!(
            &["Ben Eater's 8 bit computer".to_owned(), "with a wider control word".to_owned()][..],
            global.descriptions());
    }

    #[test]
    fn no_description() {
        let global = parse("[Overview]\nName = A\nVersion = 1\n[Hardware]\nMaxAddressBit = 4\n").unwrap();
        assert!(global.descriptions().is_empty());
    }

    #[test]
    fn bad_settings() {
        let message = |text| parse(text).unwrap_err().to_string();

        assert_eq!(
            "project.txt line 1: Setting 'Version' in Overview was not defined",
            message("[Overview]\nName = A\n[Hardware]\nMaxAddressBit = 4\n"));
        assert_eq!(
            "project.txt: section [Hardware] is missing",
            message("[Overview]\nName = A\nVersion = 1\n"));
        assert_eq!(
            "project.txt line 4: Setting 'MaxAddressBit' has invalid value 'lots'",
            message("[Overview]\nName = A\nVersion = 1\n[Hardware]\nMaxAddressBit = lots\n"));
        assert_eq!(
            "project.txt line 4: MaxAddressBit must be in the range 1..=18, not 19",
            message("[Overview]\nName = A\nVersion = 1\n[Hardware]\nMaxAddressBit = 19\n"));
        assert_eq!(
            "project.txt line 2: Expected 'key = value', not 'Name A'",
            message("[Overview]\nName A\n"));
    }
}
