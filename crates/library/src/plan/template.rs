//! User-defined folder names.
//!
//! A custom sub-folder name is compiled as an [upon] template, so it can be a
//! plain literal (`"Holiday"`) or refer to the capture date:
//!
//! | Variable     | Example   |
//! |--------------|-----------|
//! | `year`       | `2024`    |
//! | `yy`         | `24`      |
//! | `month`      | `03`      |
//! | `month_name` | `March`   |
//! | `day`        | `02`      |
//!
//! ```
//! use photo_import_library::plan::FolderTemplate;
//! use std::path::Path;
//! use time::{Date, Month};
//!
//! let template: FolderTemplate = "{{ year }}/{{ month }}-{{ month_name }}".parse().unwrap();
//! let date = Date::from_calendar_date(2024, Month::March, 2).unwrap();
//! assert_eq!(template.render(Some(date)).unwrap(), Path::new("2024/03-March"));
//! // Without a capture date, any reference to a date variable fails to render.
//! assert_eq!(template.render(None), None);
//! ```

use crate::batch::error::{Error, ErrorKind};
use crate::plan::path::normalize;
use exn::ResultExt;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use time::{Date, Month};
use upon::{Engine, Template};

/// A compiled custom folder name.
pub struct FolderTemplate {
    source: String,
    engine: Engine<'static>,
    template: Template<'static>,
}

impl FromStr for FolderTemplate {
    type Err = Error;

    /// Compiles `s` and checks that it renders to a usable relative folder.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let source = s.trim().to_string();
        if source.is_empty() {
            exn::bail!(ErrorKind::InvalidOptions("custom sub-folder name is empty".into()));
        }
        let engine = Engine::new();
        let template = engine.compile(source.clone()).or_raise(|| {
            ErrorKind::InvalidOptions(format!("custom sub-folder name is not a valid template: {source}"))
        })?;
        let folder = Self { source, engine, template };
        // Infallible: 2000-01-01 is a valid date.
        let sample = Date::from_calendar_date(2000, Month::January, 1).unwrap_or(Date::MIN);
        if folder.render(Some(sample)).is_none() {
            exn::bail!(ErrorKind::InvalidOptions(format!(
                "custom sub-folder name does not name a folder inside the destination: {}",
                folder.source
            )));
        }
        Ok(folder)
    }
}

impl FolderTemplate {
    /// Renders the folder for a photo taken on `date`.
    ///
    /// Returns `None` when the template needs a date that is missing, or when
    /// the rendered path would not stay inside the destination root.
    pub fn render(&self, date: Option<Date>) -> Option<PathBuf> {
        let variables = match date {
            Some(date) => upon::value! {
                year: format!("{:04}", date.year()),
                yy: format!("{:02}", date.year().rem_euclid(100)),
                month: format!("{:02}", u8::from(date.month())),
                month_name: date.month().to_string(),
                day: format!("{:02}", date.day()),
            },
            None => upon::Value::Map(Default::default()),
        };
        match self.template.render(&self.engine, variables).to_string() {
            Ok(rendered) => normalize(rendered.split('/').map(str::trim).collect::<Vec<_>>().join("/")),
            Err(e) => {
                tracing::trace!(template = %self.source, error = %e, "Custom folder name did not render");
                None
            },
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for FolderTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FolderTemplate").field(&self.source).finish()
    }
}

impl PartialEq for FolderTemplate {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}
impl Eq for FolderTemplate {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::path::Path;

    fn march_second() -> Date {
        Date::from_calendar_date(2024, Month::March, 2).unwrap()
    }

    #[rstest]
    #[case("Holiday", "Holiday")]
    #[case("{{ year }}", "2024")]
    #[case("{{ year }}/{{ month }}", "2024/03")]
    #[case("{{ day }}-{{ month_name }}-{{ yy }}", "02-March-24")]
    #[case(" trips / {{ year }} ", "trips/2024")]
    #[case("/{{ year }}//{{ month }}/", "2024/03")]
    fn test_render(#[case] template: &str, #[case] expected: &str) {
        let template: FolderTemplate = template.parse().unwrap();
        assert_eq!(template.render(Some(march_second())).unwrap(), Path::new(expected));
    }

    #[test]
    fn test_literal_without_date() {
        let template: FolderTemplate = "Holiday".parse().unwrap();
        assert_eq!(template.render(None).unwrap(), Path::new("Holiday"));
    }

    #[test]
    fn test_date_variable_without_date() {
        let template: FolderTemplate = "Holiday {{ year }}".parse().unwrap();
        assert_eq!(template.render(None), None);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("..")]
    #[case("../{{ year }}")]
    #[case("{{ year ")]
    #[case("{{ camera }}")]
    fn test_rejected(#[case] template: &str) {
        let err = template.parse::<FolderTemplate>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidOptions(_)));
    }
}
