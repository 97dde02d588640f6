//! INI inventory loading.
//!
//! Each section is a device except the reserved `all` section, whose
//! `commands` key is sent to every device, and `DEFAULT`, whose keys act as
//! fallbacks for every section.

use ncollect_model::{DeviceEntry, Inventory, SHARED_SECTION};
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_SECTION: &str = "DEFAULT";
const ADDRESS_KEY: &str = "ip";
const COMMANDS_KEY: &str = "commands";

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("section '{section}' has no 'ip' option")]
    MissingAddress { section: String },
}

pub fn load_inventory(path: &Path) -> Result<Inventory, InventoryError> {
    let text = std::fs::read_to_string(path).map_err(|source| InventoryError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_inventory(&text)
}

pub fn parse_inventory(text: &str) -> Result<Inventory, InventoryError> {
    let document = IniDocument::parse(text)?;

    let shared_commands = document
        .get(SHARED_SECTION, COMMANDS_KEY)
        .map(split_commands)
        .unwrap_or_default();

    let mut devices = Vec::new();
    for section in &document.sections {
        if section.name == SHARED_SECTION {
            continue;
        }
        // An empty value is kept; the connect attempt reports it.
        let address = document
            .get(&section.name, ADDRESS_KEY)
            .map(str::trim)
            .ok_or_else(|| InventoryError::MissingAddress {
                section: section.name.clone(),
            })?;
        let commands = document
            .get(&section.name, COMMANDS_KEY)
            .map(split_commands)
            .unwrap_or_default();
        devices.push(DeviceEntry {
            name: section.name.clone(),
            address: address.to_string(),
            commands,
        });
    }

    Ok(Inventory {
        shared_commands,
        devices,
    })
}

/// Splits a `commands` value on commas and continuation newlines.
fn split_commands(value: &str) -> Vec<String> {
    value
        .split([',', '\n'])
        .map(str::trim)
        .filter(|command| !command.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug)]
struct Section {
    name: String,
    options: Vec<(String, String)>,
}

impl Section {
    fn get(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug)]
struct IniDocument {
    defaults: Section,
    sections: Vec<Section>,
}

impl IniDocument {
    fn get(&self, section: &str, key: &str) -> Option<&str> {
        let section = self.sections.iter().find(|s| s.name == section)?;
        section.get(key).or_else(|| self.defaults.get(key))
    }

    fn parse(text: &str) -> Result<Self, InventoryError> {
        let mut doc = IniDocument {
            defaults: Section {
                name: DEFAULT_SECTION.to_string(),
                options: Vec::new(),
            },
            sections: Vec::new(),
        };
        let mut current: Option<usize> = None;
        let mut in_defaults = false;
        let mut last_key: Option<String> = None;
        let mut key_indent = 0;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            // Only lines indented deeper than their key continue its value.
            let indent = raw.len() - raw.trim_start().len();
            if indent > key_indent {
                if let Some(key) = last_key.as_deref() {
                    let section = doc.section_mut(current, in_defaults);
                    if let Some((_, value)) = section.options.iter_mut().find(|(k, _)| k == key) {
                        if !value.is_empty() {
                            value.push('\n');
                        }
                        value.push_str(trimmed);
                        continue;
                    }
                }
            }

            if let Some(rest) = trimmed.strip_prefix('[') {
                let name = rest
                    .rfind(']')
                    .map(|end| &rest[..end])
                    .ok_or_else(|| syntax(line_no, "unterminated section header"))?;
                if name.is_empty() {
                    return Err(syntax(line_no, "section name is empty"));
                }
                last_key = None;
                if name == DEFAULT_SECTION {
                    in_defaults = true;
                    current = None;
                    continue;
                }
                if doc.sections.iter().any(|s| s.name == name) {
                    return Err(syntax(line_no, format!("section '{name}' already exists")));
                }
                doc.sections.push(Section {
                    name: name.to_string(),
                    options: Vec::new(),
                });
                in_defaults = false;
                current = Some(doc.sections.len() - 1);
                continue;
            }

            if current.is_none() && !in_defaults {
                return Err(syntax(line_no, "option found before any section header"));
            }

            let delimiter = trimmed.find(['=', ':']).ok_or_else(|| {
                syntax(line_no, format!("expected 'key = value', found '{trimmed}'"))
            })?;
            let key = trimmed[..delimiter].trim().to_lowercase();
            let value = trimmed[delimiter + 1..].trim().to_string();
            if key.is_empty() {
                return Err(syntax(line_no, "option name is empty"));
            }

            let section = doc.section_mut(current, in_defaults);
            if section.get(&key).is_some() {
                return Err(syntax(
                    line_no,
                    format!("option '{key}' repeated in section '{}'", section.name),
                ));
            }
            section.options.push((key.clone(), value));
            last_key = Some(key);
            key_indent = indent;
        }

        Ok(doc)
    }

    fn section_mut(&mut self, current: Option<usize>, in_defaults: bool) -> &mut Section {
        match current {
            Some(idx) if !in_defaults => &mut self.sections[idx],
            _ => &mut self.defaults,
        }
    }
}

fn syntax(line: usize, message: impl Into<String>) -> InventoryError {
    InventoryError::Syntax {
        line,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
[all]
commands = show version,show inventory

[core-sw1]
ip = 10.0.0.1
commands = show vlan brief,show interface status

[edge-sw2]
ip = 10.0.0.2
";

    #[test]
    fn devices_follow_file_order_and_skip_shared_section() {
        let inventory = parse_inventory(SAMPLE).unwrap();
        assert_eq!(
            inventory.shared_commands,
            vec!["show version", "show inventory"]
        );
        let names: Vec<_> = inventory.devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["core-sw1", "edge-sw2"]);
        assert_eq!(inventory.devices[0].address, "10.0.0.1");
        assert_eq!(
            inventory.devices[0].commands,
            vec!["show vlan brief", "show interface status"]
        );
        assert!(inventory.devices[1].commands.is_empty());
    }

    #[test]
    fn empty_address_is_passed_through() {
        let inventory = parse_inventory("[sw1]\nip =\ncommands = show ver\n[sw2]\nip = 1.1.1.2\n")
            .unwrap();
        assert_eq!(inventory.devices[0].address, "");
        assert_eq!(inventory.devices[0].commands, vec!["show ver"]);
        assert_eq!(inventory.devices[1].address, "1.1.1.2");
    }

    #[test]
    fn missing_address_is_rejected() {
        let err = parse_inventory("[all]\ncommands = show clock\n\n[sw1]\ncommands = show ver\n")
            .unwrap_err();
        assert!(matches!(err, InventoryError::MissingAddress { ref section } if section == "sw1"));
    }

    #[test]
    fn shared_section_is_optional() {
        let inventory = parse_inventory("[sw1]\nip: 1.1.1.1\n").unwrap();
        assert!(inventory.shared_commands.is_empty());
        assert_eq!(inventory.devices.len(), 1);
    }

    #[test]
    fn keys_are_case_insensitive_and_comments_ignored() {
        let text = "# lab switches\n[Lab-SW]\n; primary address\nIP = 192.0.2.10\nCommands = show ip route ,, show arp\n";
        let inventory = parse_inventory(text).unwrap();
        let sw = &inventory.devices[0];
        assert_eq!(sw.name, "Lab-SW");
        assert_eq!(sw.address, "192.0.2.10");
        assert_eq!(sw.commands, vec!["show ip route", "show arp"]);
    }

    #[test]
    fn continuation_lines_extend_command_list() {
        let text = "[all]\ncommands = show version,\n    show clock\n  show users\n[sw1]\nip = 1.1.1.1\n";
        let inventory = parse_inventory(text).unwrap();
        assert_eq!(
            inventory.shared_commands,
            vec!["show version", "show clock", "show users"]
        );
    }

    #[test]
    fn indented_keys_stay_separate() {
        let text = "[all]\n  commands = show version\n\n[sw1]\n  ip = 10.0.0.1\n  commands = show vlan,\n      show arp\n";
        let inventory = parse_inventory(text).unwrap();
        assert_eq!(inventory.shared_commands, vec!["show version"]);
        let sw1 = &inventory.devices[0];
        assert_eq!(sw1.address, "10.0.0.1");
        assert_eq!(sw1.commands, vec!["show vlan", "show arp"]);
    }

    #[test]
    fn header_ignores_trailing_text() {
        let inventory = parse_inventory("[sw1] ; core switch\nip = 10.0.0.1\n").unwrap();
        assert_eq!(inventory.devices[0].name, "sw1");
    }

    #[test]
    fn default_section_supplies_fallbacks() {
        let text = "[DEFAULT]\ncommands = show lldp neighbors\n\n[sw1]\nip = 1.1.1.1\n\n[sw2]\nip = 1.1.1.2\ncommands = show arp\n";
        let inventory = parse_inventory(text).unwrap();
        assert_eq!(inventory.devices.len(), 2);
        assert_eq!(inventory.devices[0].commands, vec!["show lldp neighbors"]);
        assert_eq!(inventory.devices[1].commands, vec!["show arp"]);
        assert_eq!(inventory.shared_commands, Vec::<String>::new());
    }

    #[test]
    fn syntax_errors_report_line_numbers() {
        let cases = [
            ("ip = 1.1.1.1\n", 1),
            ("[sw1]\nip = 1.1.1.1\n[sw1]\nip = 1.1.1.2\n", 3),
            ("[sw1]\nip = 1.1.1.1\nIP = 1.1.1.2\n", 3),
            ("[sw1\nip = 1.1.1.1\n", 1),
            ("[sw1]\njust words\n", 2),
            ("[]\nip = 1.1.1.1\n", 1),
        ];
        for (text, expected) in cases {
            match parse_inventory(text) {
                Err(InventoryError::Syntax { line, .. }) => assert_eq!(line, expected, "{text:?}"),
                other => panic!("expected syntax error for {text:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn load_reports_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.ini");
        let err = load_inventory(&missing).unwrap_err();
        assert!(matches!(err, InventoryError::Read { .. }));
        assert!(err.to_string().contains("absent.ini"));

        let path = dir.path().join("switches.ini");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let inventory = load_inventory(&path).unwrap();
        assert_eq!(inventory.devices.len(), 2);
    }
}
