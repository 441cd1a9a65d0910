//! Migration file format
//!
//! A migration file holds two sections delimited by whole-line markers:
//!
//! ```text
//! -- +migrataur up
//! <up command>
//! -- -migrataur up
//!
//!
//! -- +migrataur down
//! <down command>
//! -- -migrataur down
//! ```
//!
//! Lines outside of a section are ignored. Inside a section every line is
//! payload until the section's end marker, so the payload itself must not
//! contain a line equal to that marker.

use serde::{Deserialize, Serialize};

use crate::error::{FormatError, Section};

pub const DEFAULT_UP_START: &str = "-- +migrataur up";
pub const DEFAULT_UP_END: &str = "-- -migrataur up";
pub const DEFAULT_DOWN_START: &str = "-- +migrataur down";
pub const DEFAULT_DOWN_END: &str = "-- -migrataur down";

/// Markers used to write and read migration files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationFormat {
    pub up_start: String,
    pub up_end: String,
    pub down_start: String,
    pub down_end: String,
}

impl Default for MigrationFormat {
    fn default() -> Self {
        Self {
            up_start: DEFAULT_UP_START.to_string(),
            up_end: DEFAULT_UP_END.to_string(),
            down_start: DEFAULT_DOWN_START.to_string(),
            down_end: DEFAULT_DOWN_END.to_string(),
        }
    }
}

impl MigrationFormat {
    /// Build a format with custom markers
    pub fn new(
        up_start: impl Into<String>,
        up_end: impl Into<String>,
        down_start: impl Into<String>,
        down_end: impl Into<String>,
    ) -> Self {
        Self {
            up_start: up_start.into(),
            up_end: up_end.into(),
            down_start: down_start.into(),
            down_end: down_end.into(),
        }
    }

    /// All four markers, in file order
    pub fn markers(&self) -> [&str; 4] {
        [&self.up_start, &self.up_end, &self.down_start, &self.down_end]
    }

    /// Render the up and down commands as file content
    pub fn render(&self, up: &str, down: &str) -> String {
        format!(
            "{}\n{}\n{}\n\n\n{}\n{}\n{}\n",
            self.up_start, up, self.up_end, self.down_start, down, self.down_end
        )
    }

    /// Extract the up and down commands from file content
    pub fn parse(&self, data: &[u8]) -> Result<(String, String), FormatError> {
        let text = std::str::from_utf8(data).map_err(|_| FormatError::InvalidUtf8)?;

        let mut up: Option<String> = None;
        let mut down: Option<String> = None;
        let mut current: Option<(Section, Vec<&str>)> = None;

        for (index, line) in text.split('\n').enumerate() {
            match current.as_mut() {
                Some((section, lines)) => {
                    let end = match section {
                        Section::Up => &self.up_end,
                        Section::Down => &self.down_end,
                    };
                    if line == end {
                        let payload = lines.join("\n");
                        match section {
                            Section::Up => up = Some(payload),
                            Section::Down => down = Some(payload),
                        }
                        current = None;
                    } else {
                        lines.push(line);
                    }
                }
                None => {
                    if line == self.up_start {
                        current = Some((Section::Up, Vec::new()));
                    } else if line == self.down_start {
                        current = Some((Section::Down, Vec::new()));
                    } else if line == self.up_end || line == self.down_end {
                        return Err(FormatError::UnexpectedMarker {
                            line: index + 1,
                            marker: line.to_string(),
                        });
                    }
                }
            }
        }

        if let Some((section, _)) = current {
            return Err(FormatError::UnterminatedSection(section));
        }

        let up = up.ok_or(FormatError::MissingSection(Section::Up))?;
        let down = down.ok_or(FormatError::MissingSection(Section::Down))?;
        Ok((up, down))
    }
}
