//! Release-name parsing for incoming files.
//!
//! Classifies a file name as a movie or an episode from its season/episode
//! markers, then cleans the remainder into a searchable title.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

/// What a release name claims the file to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedMedia {
    Movie(ParsedMovie),
    Episode(ParsedEpisode),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMovie {
    pub title: String,
    pub year: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEpisode {
    pub show_name: String,
    pub season: u32,
    pub episode: u32,
    pub year: Option<u16>,
}

impl ParsedMedia {
    /// The search query this file should be looked up by.
    pub fn title(&self) -> &str {
        match self {
            ParsedMedia::Movie(movie) => &movie.title,
            ParsedMedia::Episode(episode) => &episode.show_name,
        }
    }

    pub fn year(&self) -> Option<u16> {
        match self {
            ParsedMedia::Movie(movie) => movie.year,
            ParsedMedia::Episode(episode) => episode.year,
        }
    }
}

// S01E02, s1e2, and the compact 1x02 form.
static EPISODE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bS(\d{1,2})[\s._-]*E(\d{1,3})\b").unwrap());
static EPISODE_MARKER_COMPACT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})x(\d{2,3})\b").unwrap());

// A standalone 4-digit year between 1900 and 2099.
static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").unwrap());

// Everything from the first quality/source tag onward is release noise.
static NOISE_CUTOFF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(2160p|1080p|720p|480p|4k|uhd|bluray|blu-ray|bdrip|brrip|web-?dl|webrip|hdtv|dvdrip|hdrip|x264|x265|h\.?264|h\.?265|hevc|avc|aac|ac3|dts|remux|proper|repack|extended|unrated|imax)\b.*$",
    )
    .unwrap()
});

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[._]+").unwrap());
static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Parse a file path into the media it claims to contain.
///
/// Always returns something usable: a name with no recognizable markers
/// falls back to a movie titled by the cleaned file stem.
pub fn parse_release_name(path: &Path) -> ParsedMedia {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let year = extract_year(&stem);

    if let Some((marker_start, season, episode)) = find_episode_marker(&stem) {
        let show_name = clean_title(&stem[..marker_start]);
        if !show_name.is_empty() {
            return ParsedMedia::Episode(ParsedEpisode {
                show_name,
                season,
                episode,
                year,
            });
        }
    }

    let title = match year.and_then(|y| stem.find(&y.to_string())) {
        Some(year_start) => clean_title(&stem[..year_start]),
        None => clean_title(&stem),
    };

    ParsedMedia::Movie(ParsedMovie {
        title: if title.is_empty() {
            clean_title(&stem)
        } else {
            title
        },
        year,
    })
}

fn find_episode_marker(stem: &str) -> Option<(usize, u32, u32)> {
    let captures = EPISODE_MARKER
        .captures(stem)
        .or_else(|| EPISODE_MARKER_COMPACT.captures(stem))?;
    let whole = captures.get(0)?;
    let season = captures.get(1)?.as_str().parse().ok()?;
    let episode = captures.get(2)?.as_str().parse().ok()?;
    Some((whole.start(), season, episode))
}

fn extract_year(stem: &str) -> Option<u16> {
    // The last match wins, so a title that itself contains a year (for
    // instance "2001 A Space Odyssey 1968") keeps the release year.
    YEAR.find_iter(stem)
        .last()
        .and_then(|found| found.as_str().parse().ok())
}

fn clean_title(raw: &str) -> String {
    let no_noise = NOISE_CUTOFF.replace(raw, "");
    let spaced = SEPARATORS.replace_all(&no_noise, " ");
    let trimmed = spaced.trim_matches(|c: char| c.is_whitespace() || c == '-' || c == '(');
    MULTI_SPACE.replace_all(trimmed, " ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(name: &str) -> ParsedMedia {
        parse_release_name(&PathBuf::from(name))
    }

    #[test]
    fn parses_episode_marker() {
        let parsed = parse("Breaking.Bad.S01E01.720p.BluRay.x264.mkv");
        match parsed {
            ParsedMedia::Episode(ep) => {
                assert_eq!(ep.show_name, "Breaking Bad");
                assert_eq!(ep.season, 1);
                assert_eq!(ep.episode, 1);
            }
            other => panic!("expected episode, got {other:?}"),
        }
    }

    #[test]
    fn parses_compact_episode_marker() {
        let parsed = parse("The Office 3x12 HDTV.mp4");
        match parsed {
            ParsedMedia::Episode(ep) => {
                assert_eq!(ep.show_name, "The Office");
                assert_eq!(ep.season, 3);
                assert_eq!(ep.episode, 12);
            }
            other => panic!("expected episode, got {other:?}"),
        }
    }

    #[test]
    fn parses_movie_with_year() {
        let parsed = parse("The.Dark.Knight.2008.1080p.BluRay.x264.mkv");
        match parsed {
            ParsedMedia::Movie(movie) => {
                assert_eq!(movie.title, "The Dark Knight");
                assert_eq!(movie.year, Some(2008));
            }
            other => panic!("expected movie, got {other:?}"),
        }
    }

    #[test]
    fn title_containing_year_keeps_release_year() {
        let parsed = parse("2001.A.Space.Odyssey.1968.720p.mkv");
        match parsed {
            ParsedMedia::Movie(movie) => {
                assert_eq!(movie.title, "2001 A Space Odyssey");
                assert_eq!(movie.year, Some(1968));
            }
            other => panic!("expected movie, got {other:?}"),
        }
    }

    #[test]
    fn bare_name_falls_back_to_movie() {
        let parsed = parse("home_recording.mov");
        match parsed {
            ParsedMedia::Movie(movie) => {
                assert_eq!(movie.title, "home recording");
                assert_eq!(movie.year, None);
            }
            other => panic!("expected movie, got {other:?}"),
        }
    }

    #[test]
    fn noise_is_stripped_without_year() {
        let parsed = parse("Some.Film.1080p.WEB-DL.AAC.mkv");
        match parsed {
            ParsedMedia::Movie(movie) => {
                assert_eq!(movie.title, "Some Film");
                assert_eq!(movie.year, None);
            }
            other => panic!("expected movie, got {other:?}"),
        }
    }
}
