use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;

lazy_static! {
    // title segment, optional year token, trailing segment
    static ref MOVIE_PATTERN: Regex =
        Regex::new(r"(.*?[.| ])(\(\d{4}\)|\d{4}|\[\d{4}\])?([.| ].*)").unwrap();
    static ref TRAILING_TAG: Regex = Regex::new(r"^(.*?)\s*\[[^\]]*\]\s*$").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TitleYear {
    pub title: String,
    pub year: String,
}

/// Split a loosely formatted movie file name into title and year.
///
/// Works on names such as:
///   "The Killing of a Sacred Deer.2017.1080p.WEB-DL.H264.AC3-EVO[EtHD]"
///   "12 Angry Men 1957 1080p BluRay x264 AAC - Ozlem"
///   "Life.Is.Beautiful.1997.1080p.BluRay.x264.anoXmous"
///
/// Never fails: when nothing matches, the title is the name without its extension
/// and the year is empty.
pub fn extract(raw_file_name: &str) -> TitleYear {
    let stem = Path::new(raw_file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| raw_file_name.to_string());

    let Some(caps) = MOVIE_PATTERN.captures(&stem) else {
        return TitleYear {
            title: stem,
            year: String::new(),
        };
    };

    let year = caps
        .get(2)
        .map(|m| m.as_str().trim_matches(|c: char| matches!(c, '(' | ')' | '[' | ']')).to_string())
        .unwrap_or_default();

    let segment = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    let title = normalize(strip_trailing_tag(segment.trim()));

    TitleYear {
        title: if title.is_empty() { stem } else { title },
        year,
    }
}

fn strip_trailing_tag(title: &str) -> &str {
    match TRAILING_TAG.captures(title).and_then(|c| c.get(1)) {
        Some(m) if !m.as_str().is_empty() => m.as_str(),
        _ => title,
    }
}

fn normalize(title: &str) -> String {
    let spaced = title.replace(['.', '_'], " ");
    WHITESPACE.replace_all(spaced.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(title: &str, year: &str) -> TitleYear {
        TitleYear {
            title: title.to_string(),
            year: year.to_string(),
        }
    }

    #[test]
    fn test_space_separated_name() {
        assert_eq!(
            extract("12 Angry Men 1957 1080p BluRay x264 AAC - Ozlem"),
            ty("12 Angry Men", "1957")
        );
    }

    #[test]
    fn test_dot_separated_name_with_extension() {
        assert_eq!(
            extract("Life.Is.Beautiful.1997.1080p.BluRay.x264.anoXmous.mkv"),
            ty("Life Is Beautiful", "1997")
        );
    }

    #[test]
    fn test_trailing_group_tag_does_not_leak_into_title() {
        assert_eq!(
            extract("The Killing of a Sacred Deer.2017.1080p.WEB-DL.H264.AC3-EVO[EtHD].mp4"),
            ty("The Killing of a Sacred Deer", "2017")
        );
    }

    #[test]
    fn test_bracketed_and_parenthesized_years() {
        assert_eq!(extract("Heat (1995) 1080p.mkv"), ty("Heat", "1995"));
        assert_eq!(extract("Alien [1979] Remastered.avi"), ty("Alien", "1979"));
    }

    #[test]
    fn test_title_tag_before_year_is_stripped() {
        assert_eq!(extract("Ran [Criterion] 1985 1080p.mkv"), ty("Ran", "1985"));
    }

    #[test]
    fn test_no_year_never_fails() {
        let parsed = extract("Life.Is.Beautiful.BluRay.anoXmous");
        assert!(!parsed.title.is_empty());
        assert_eq!(parsed.year, "");
    }

    #[test]
    fn test_unmatched_name_keeps_stem() {
        assert_eq!(extract("Metropolis.mkv"), ty("Metropolis", ""));
    }

    #[test]
    fn test_deterministic() {
        let name = "Stalker.1979.720p.BluRay.mkv";
        assert_eq!(extract(name), extract(name));
    }
}
