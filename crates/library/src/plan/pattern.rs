use crate::batch::error::{Error, ErrorKind, Result};
use crate::plan::UNKNOWN_DATE_FOLDER;
use crate::plan::template::FolderTemplate;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use time::Date;

/// How the sub-folder below the destination root is named.
///
/// Date patterns use the photo's capture date; photos without one go into
/// [`UNKNOWN_DATE_FOLDER`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SubFolderPattern {
    /// No sub-folder; files go straight into the destination root.
    Flat,
    /// `20240302`
    #[default]
    Yyyymmdd,
    /// `240302`
    Yymmdd,
    /// `020324`
    Ddmmyy,
    /// `0203`
    Ddmm,
    /// `202402March`
    Yyyyddmmm,
    /// `02March2024`
    Ddmmmyyyy,
    /// A user-supplied folder name, see [`FolderTemplate`].
    Custom(Arc<FolderTemplate>),
}

impl SubFolderPattern {
    /// Every recognized pattern id.
    pub const IDS: [&'static str; 8] =
        ["none", "yyyymmdd", "yymmdd", "ddmmyy", "ddmm", "yyyyddmmm", "ddmmmyyyy", "custom"];

    /// Parses a pattern id. The `custom` id takes its folder name from
    /// `custom_name`; the name is ignored for every other id.
    pub fn from_id(id: &str, custom_name: Option<&str>) -> Result<Self> {
        let pattern = match id.trim().to_ascii_lowercase().as_str() {
            "none" => Self::Flat,
            "yyyymmdd" => Self::Yyyymmdd,
            "yymmdd" => Self::Yymmdd,
            "ddmmyy" => Self::Ddmmyy,
            "ddmm" => Self::Ddmm,
            "yyyyddmmm" => Self::Yyyyddmmm,
            "ddmmmyyyy" => Self::Ddmmmyyyy,
            "custom" => match custom_name {
                Some(name) => Self::custom(name)?,
                None => {
                    exn::bail!(ErrorKind::InvalidOptions("the custom sub-folder pattern needs a folder name".into()))
                },
            },
            _ => exn::bail!(ErrorKind::InvalidPattern(id.to_string())),
        };
        Ok(pattern)
    }

    pub fn custom(name: &str) -> Result<Self> {
        Ok(Self::Custom(Arc::new(name.parse()?)))
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::Flat => "none",
            Self::Yyyymmdd => "yyyymmdd",
            Self::Yymmdd => "yymmdd",
            Self::Ddmmyy => "ddmmyy",
            Self::Ddmm => "ddmm",
            Self::Yyyyddmmm => "yyyyddmmm",
            Self::Ddmmmyyyy => "ddmmmyyyy",
            Self::Custom(_) => "custom",
        }
    }

    /// Folder, relative to the destination root, for a photo taken on `date`.
    /// `None` means the destination root itself.
    pub fn folder(&self, date: Option<Date>) -> Option<PathBuf> {
        let folder = match (self, date) {
            (Self::Flat, _) => return None,
            (Self::Custom(template), date) => template.render(date),
            (pattern, Some(date)) => pattern.format_date(date).map(PathBuf::from),
            (_, None) => None,
        };
        Some(folder.unwrap_or_else(|| PathBuf::from(UNKNOWN_DATE_FOLDER)))
    }

    fn format_date(&self, date: Date) -> Option<String> {
        let (year, month, day) = (date.year(), u8::from(date.month()), date.day());
        let yy = year.rem_euclid(100);
        let folder = match self {
            Self::Yyyymmdd => format!("{year:04}{month:02}{day:02}"),
            Self::Yymmdd => format!("{yy:02}{month:02}{day:02}"),
            Self::Ddmmyy => format!("{day:02}{month:02}{yy:02}"),
            Self::Ddmm => format!("{day:02}{month:02}"),
            Self::Yyyyddmmm => format!("{year:04}{day:02}{}", date.month()),
            Self::Ddmmmyyyy => format!("{day:02}{}{year:04}", date.month()),
            Self::Flat | Self::Custom(_) => return None,
        };
        Some(folder)
    }
}

impl FromStr for SubFolderPattern {
    type Err = Error;

    /// Parses a pattern id; `custom` needs [`from_id`](Self::from_id) instead.
    fn from_str(s: &str) -> Result<Self> {
        Self::from_id(s, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::path::Path;
    use time::Month;

    fn march_second() -> Date {
        Date::from_calendar_date(2024, Month::March, 2).unwrap()
    }

    #[rstest]
    #[case(SubFolderPattern::Yyyymmdd, "20240302")]
    #[case(SubFolderPattern::Yymmdd, "240302")]
    #[case(SubFolderPattern::Ddmmyy, "020324")]
    #[case(SubFolderPattern::Ddmm, "0203")]
    #[case(SubFolderPattern::Yyyyddmmm, "202402March")]
    #[case(SubFolderPattern::Ddmmmyyyy, "02March2024")]
    fn test_date_patterns(#[case] pattern: SubFolderPattern, #[case] expected: &str) {
        assert_eq!(pattern.folder(Some(march_second())).unwrap(), Path::new(expected));
        assert_eq!(pattern.folder(None).unwrap(), Path::new(UNKNOWN_DATE_FOLDER));
    }

    #[test]
    fn test_two_digit_year_pads() {
        let date = Date::from_calendar_date(2005, Month::December, 25).unwrap();
        assert_eq!(SubFolderPattern::Yymmdd.folder(Some(date)).unwrap(), Path::new("051225"));
    }

    #[test]
    fn test_flat_has_no_folder() {
        assert_eq!(SubFolderPattern::Flat.folder(Some(march_second())), None);
        assert_eq!(SubFolderPattern::Flat.folder(None), None);
    }

    #[test]
    fn test_custom_folder() {
        let pattern = SubFolderPattern::from_id("custom", Some("Shoot {{ year }}")).unwrap();
        assert_eq!(pattern.folder(Some(march_second())).unwrap(), Path::new("Shoot 2024"));
        assert_eq!(pattern.folder(None).unwrap(), Path::new(UNKNOWN_DATE_FOLDER));
        let literal = SubFolderPattern::custom("Studio").unwrap();
        assert_eq!(literal.folder(None).unwrap(), Path::new("Studio"));
    }

    #[rstest]
    #[case("yyyymmdd", SubFolderPattern::Yyyymmdd)]
    #[case("YYYYMMDD", SubFolderPattern::Yyyymmdd)]
    #[case(" ddmmmyyyy ", SubFolderPattern::Ddmmmyyyy)]
    #[case("none", SubFolderPattern::Flat)]
    fn test_parse(#[case] input: &str, #[case] expected: SubFolderPattern) {
        assert_eq!(input.parse::<SubFolderPattern>().unwrap(), expected);
    }

    #[test]
    fn test_ids_round_trip() {
        for id in SubFolderPattern::IDS {
            let pattern = SubFolderPattern::from_id(id, Some("Folder")).unwrap();
            assert_eq!(pattern.id(), id);
        }
    }

    #[rstest]
    #[case("mmddyyyy")]
    #[case("")]
    #[case("date")]
    fn test_unknown_pattern(#[case] input: &str) {
        let err = input.parse::<SubFolderPattern>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPattern(id) if id == input));
    }

    #[test]
    fn test_custom_requires_name() {
        let err = "custom".parse::<SubFolderPattern>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidOptions(_)));
        let err = SubFolderPattern::from_id("custom", Some("  ")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidOptions(_)));
    }
}
