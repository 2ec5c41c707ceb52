//! Paraver configuration (`.pcf`) naming event types and values.
//!
//! The legend is static: it depends only on [`EventClass`] / [`EventValue`]
//! and on whether energy telemetry is part of the trace.

use std::collections::HashSet;
use std::fmt;

use anyhow::{bail, Result};

use crate::classify::{EventClass, EventValue};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Legend {
    pub energy_channels: bool,
}

/// Which value table is being written. The two tables differ only in the
/// label of the read-ahead value.
#[derive(Clone, Copy, PartialEq, Eq)]
enum ValueTable {
    States,
    Values,
}

impl Legend {
    pub fn new(energy_channels: bool) -> Self {
        Legend { energy_channels }
    }

    /// Event types named by this legend.
    pub fn event_types(&self) -> Vec<EventClass> {
        let mut types = EventClass::IO.to_vec();
        if self.energy_channels {
            types.extend(EventClass::ENERGY);
        }
        types
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Legend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "STATES")?;
        write_values(f, ValueTable::States)?;

        writeln!(f, "DEFAULT_SEMANTIC")?;
        writeln!(f, "THREAD_FUNC          Last Evt Val")?;

        writeln!(f, "EVENT_TYPE")?;
        write_types(f, &EventClass::IO)?;
        writeln!(f, "VALUES")?;
        write_values(f, ValueTable::Values)?;

        if self.energy_channels {
            writeln!(f)?;
            writeln!(f, "EVENT_TYPE")?;
            write_types(f, &EventClass::ENERGY)?;
        }
        Ok(())
    }
}

fn write_types(f: &mut fmt::Formatter<'_>, classes: &[EventClass]) -> fmt::Result {
    for class in classes {
        writeln!(f, "0  {}  {}", class.type_code(), class.name())?;
    }
    Ok(())
}

// Byte-compatible with existing .pcf files: value 0 takes a single space
// and the read-ahead state is labelled "RA".
fn write_values(f: &mut fmt::Formatter<'_>, table: ValueTable) -> fmt::Result {
    for value in EventValue::ALL {
        let name = match value {
            EventValue::ReadAhead if table == ValueTable::States => "RA",
            _ => value.name(),
        };
        match value {
            EventValue::Completed => writeln!(f, "{} {}", value.code(), name)?,
            _ => writeln!(f, "{}    {}", value.code(), name)?,
        }
    }
    Ok(())
}

/// Check that the codes the converter emits are exactly the ones the
/// legend describes.
///
/// Run once before a conversion starts.
pub fn validate() -> Result<()> {
    for (idx, value) in EventValue::ALL.iter().enumerate() {
        if value.code() as usize != idx {
            bail!(
                "Event value {} has code {}, expected {}",
                value.name(),
                value.code(),
                idx
            );
        }
    }

    let mut seen = HashSet::new();
    for class in Legend::new(true).event_types() {
        if !seen.insert(class.type_code()) {
            bail!("Event type code {} is used twice", class.type_code());
        }
        if let Some(value) = class.value() {
            if !EventValue::ALL.contains(&value) {
                bail!(
                    "Event type {} emits value {} missing from the legend",
                    class.name(),
                    value.code()
                );
            }
        }
    }

    let energy: HashSet<_> = EventClass::ENERGY.iter().collect();
    if EventClass::IO.iter().any(|c| energy.contains(c)) {
        bail!("Energy channel types overlap the I/O event types");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        validate().unwrap();
    }

    #[test]
    fn test_render_sections() {
        let pcf = Legend::new(false).render();
        let lines: Vec<&str> = pcf.lines().collect();
        assert_eq!(lines[0], "STATES");
        assert_eq!(lines[1], "0 Completed");
        assert_eq!(lines[2], "1    ISSUE");
        assert_eq!(lines[20], "19    RA");
        assert_eq!(lines[23], "22    LAST_ELEMENT");
        assert_eq!(lines[24], "DEFAULT_SEMANTIC");
        assert_eq!(lines[26], "EVENT_TYPE");
        assert_eq!(lines[27], "0  100000  READ");
        assert_eq!(lines[34], "0  100007  READAHEAD");
        assert_eq!(lines[35], "VALUES");
        assert_eq!(lines[36], "0 Completed");
        assert_eq!(lines[55], "19    READAHEAD");
        assert_eq!(lines.len(), 36 + EventValue::ALL.len());
        assert!(!pcf.contains("ENERGY"));
    }

    #[test]
    fn test_render_energy_channels() {
        let pcf = Legend::new(true).render();
        assert!(pcf.ends_with(
            "\nEVENT_TYPE\n0  100008  ENERGY_CHANNEL_1\n0  100009  ENERGY_CHANNEL_2\n"
        ));
    }

    #[test]
    fn test_render_is_deterministic() {
        assert_eq!(Legend::new(true).render(), Legend::new(true).render());
        assert_eq!(Legend::new(false).render(), Legend::new(false).render());
    }
}
