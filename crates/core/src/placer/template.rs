//! Destination path templates.
//!
//! A template is a path with `{show_name}`, `{season}`, `{episode}` and
//! `{title}` placeholders. Numeric placeholders accept a zero-pad width, e.g.
//! `{season:02}`. The source file's extension is appended on render.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Serialize, Serializer};

use super::error::TemplateError;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_]+)(?::(\d+))?\}").expect("valid placeholder regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    ShowName,
    Season,
    Episode,
    Title,
}

impl Field {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "show_name" => Some(Field::ShowName),
            "season" => Some(Field::Season),
            "episode" => Some(Field::Episode),
            "title" => Some(Field::Title),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder { field: Field, width: usize },
}

/// Values substituted into a [`DestinationTemplate`].
#[derive(Debug, Clone, Copy)]
pub struct EpisodeFields<'a> {
    pub show_name: &'a str,
    pub season: u32,
    pub episode: u32,
    pub title: &'a str,
}

/// A parsed, validated destination template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl DestinationTemplate {
    /// Parse a template, rejecting unknown placeholders.
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        if raw.trim().is_empty() {
            return Err(TemplateError::Empty);
        }

        let mut segments = Vec::new();
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(raw) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            push_literal(&mut segments, &raw[last..whole.start()])?;

            let name = &caps[1];
            let field =
                Field::parse(name).ok_or_else(|| TemplateError::UnknownPlaceholder(name.to_string()))?;
            let width = caps
                .get(2)
                .and_then(|w| w.as_str().parse().ok())
                .unwrap_or(0);
            segments.push(Segment::Placeholder { field, width });
            last = whole.end();
        }
        push_literal(&mut segments, &raw[last..])?;

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The template as written in the configuration.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Render the destination for one episode, appending `extension`
    /// (with or without its leading dot) when non-empty.
    ///
    /// Path separators inside substituted values are replaced so a title
    /// cannot introduce extra directories. Components that render as `.` or
    /// `..` have their dots replaced so the path never climbs out of the
    /// template's directories.
    pub fn render(&self, fields: &EpisodeFields<'_>, extension: &str) -> PathBuf {
        let mut out = String::with_capacity(self.raw.len() + 32);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder { field, width } => {
                    let value = match field {
                        Field::ShowName => sanitize(fields.show_name),
                        Field::Title => sanitize(fields.title),
                        Field::Season => format!("{:0width$}", fields.season, width = *width),
                        Field::Episode => format!("{:0width$}", fields.episode, width = *width),
                    };
                    out.push_str(&value);
                }
            }
        }

        let mut out = out
            .split('/')
            .map(|component| match component {
                "." => "_",
                ".." => "__",
                other => other,
            })
            .collect::<Vec<_>>()
            .join("/");

        let extension = extension.trim_start_matches('.');
        if !extension.is_empty() {
            out.push('.');
            out.push_str(extension);
        }
        PathBuf::from(out)
    }
}

impl Serialize for DestinationTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

fn push_literal(segments: &mut Vec<Segment>, text: &str) -> Result<(), TemplateError> {
    if text.contains('{') || text.contains('}') {
        return Err(TemplateError::UnbalancedBraces);
    }
    if !text.is_empty() {
        segments.push(Segment::Literal(text.to_string()));
    }
    Ok(())
}

fn sanitize(value: &str) -> String {
    value.replace(['/', '\\'], "-")
}

/// Extension of `path` without the dot, or an empty string.
pub(crate) fn extension_of(path: &str) -> &str {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
}
