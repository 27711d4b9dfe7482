//! A small INI parser for `~/.aws/config` and `~/.aws/credentials`.
//! AWS's profile files are "INI-ish": `[section]` headers,
//! `key = value` pairs, `#`/`;` comments, no nesting.

use std::collections::HashMap;

use super::ConfigFileError;

/// Section name -> (key -> value), both lower-cased on the key side only
/// (section names keep their case since `profile foo` vs `foo` matters).
pub type IniDocument = HashMap<String, HashMap<String, String>>;

pub fn parse(text: &str) -> Result<IniDocument, ConfigFileError> {
    let mut document = IniDocument::new();
    let mut current_section: Option<String> = None;

    for (lineno, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(stripped) = line.strip_prefix('[') {
            let name = stripped
                .strip_suffix(']')
                .ok_or_else(|| ConfigFileError::Parse(format!("line {}: unterminated section header", lineno + 1)))?
                .trim()
                .to_string();
            document.entry(name.clone()).or_default();
            current_section = Some(name);
            continue;
        }

        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| ConfigFileError::Parse(format!("line {}: expected key = value", lineno + 1)))?;
        let section = current_section
            .as_ref()
            .ok_or_else(|| ConfigFileError::Parse(format!("line {}: key outside any section", lineno + 1)))?;
        document
            .entry(section.clone())
            .or_default()
            .insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
    }

    Ok(document)
}

/// The config file (`~/.aws/config`) names profile sections `profile foo`
/// except the default, which is bare `default`. The credentials file names
/// every profile bare, including `default`.
pub fn config_section_name(profile: &str) -> String {
    if profile == "default" {
        "default".to_string()
    } else {
        format!("profile {profile}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sections_and_keys() {
        let text = "[default]\naws_access_key_id = AKID\naws_secret_access_key=secret\n\n[profile dev]\nregion = us-west-2\n";
        let doc = parse(text).unwrap();
        assert_eq!(doc["default"]["aws_access_key_id"], "AKID");
        assert_eq!(doc["default"]["aws_secret_access_key"], "secret");
        assert_eq!(doc["profile dev"]["region"], "us-west-2");
    }

    #[test]
    fn ignores_comments_and_blank_lines() {
        let text = "; a comment\n[default]\n# another comment\naws_access_key_id = AKID\n";
        let doc = parse(text).unwrap();
        assert_eq!(doc["default"]["aws_access_key_id"], "AKID");
    }

    #[test]
    fn key_outside_section_is_an_error() {
        let text = "aws_access_key_id = AKID\n";
        assert!(parse(text).is_err());
    }

    #[test]
    fn config_section_name_prefixes_non_default_profiles() {
        assert_eq!(config_section_name("default"), "default");
        assert_eq!(config_section_name("dev"), "profile dev");
    }
}
