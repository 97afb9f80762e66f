//! The `name-width-height-version[suffix]` naming convention.
//!
//! Every artifact and its labels file carry the same four fields in their
//! filename, e.g. `note-640-640-yolov5s.rknn` and
//! `note-640-640-yolov5s-labels.txt`. Only the suffix differs per kind.

use crate::config::NamingConfig;
use crate::error::NamingError;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;
use tracing::debug;

/// Splits a suffix-free stem into base name, width, height and tag.
///
/// The tag group is looser than the version grammar: an unrecognized tag is
/// an unknown version, not a malformed name.
static STEM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9._-]+)-(\d+)-(\d+)-([A-Za-z0-9]+)$").unwrap());

/// Recognized version tags: `yolov5`, `yolov8`, `yolov11` plus size letters.
static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^yolov(5|8|11)[nsmlx]*$").unwrap());

/// Model architecture family encoded in the version tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ModelVersion {
    YoloV5,
    YoloV8,
    YoloV11,
}

impl ModelVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelVersion::YoloV5 => "yolov5",
            ModelVersion::YoloV8 => "yolov8",
            ModelVersion::YoloV11 => "yolov11",
        }
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed naming-convention tuple.
///
/// Two names are companion-matched iff all four fields are equal, which is
/// exactly `PartialEq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ArtifactName {
    base_name: String,
    width: u32,
    height: u32,
    version_tag: String,
}

impl ArtifactName {
    /// Build a name from its parts, enforcing the same invariants as [`parse`].
    pub fn new(
        base_name: impl Into<String>,
        width: u32,
        height: u32,
        version_tag: impl Into<String>,
    ) -> Result<Self, NamingError> {
        let name = Self {
            base_name: base_name.into(),
            width,
            height,
            version_tag: version_tag.into(),
        };
        // Round-tripping through the grammar keeps one source of truth.
        parse(&name.stem(), "")
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn version_tag(&self) -> &str {
        &self.version_tag
    }

    pub fn model_version(&self) -> ModelVersion {
        // The tag was validated on construction.
        version_of(&self.version_tag).unwrap_or(ModelVersion::YoloV5)
    }

    /// `base-width-height-tag` without any suffix.
    pub fn stem(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.base_name, self.width, self.height, self.version_tag
        )
    }

    /// Canonical filename for this name with the given suffix.
    pub fn file_name(&self, suffix: &str) -> String {
        format!("{}{}", self.stem(), suffix)
    }

    /// Name of the companion labels file.
    pub fn labels_file_name(&self) -> String {
        self.file_name(NamingConfig::LABELS_SUFFIX)
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stem())
    }
}

/// Parse `filename` against the naming grammar with `expected_suffix`.
///
/// # Examples
///
/// ```
/// use lumen_core::naming::parse;
///
/// let name = parse("note-640-480-yolov8n.rknn", ".rknn").unwrap();
/// assert_eq!(name.base_name(), "note");
/// assert_eq!((name.width(), name.height()), (640, 480));
/// assert_eq!(name.version_tag(), "yolov8n");
/// ```
pub fn parse(filename: &str, expected_suffix: &str) -> Result<ArtifactName, NamingError> {
    let malformed = || NamingError::Malformed {
        filename: filename.to_string(),
        expected_suffix: expected_suffix.to_string(),
    };

    let stem = filename.strip_suffix(expected_suffix).ok_or_else(malformed)?;
    let caps = STEM_PATTERN.captures(stem).ok_or_else(malformed)?;

    let width = parse_dimension(filename, "width", &caps[2])?;
    let height = parse_dimension(filename, "height", &caps[3])?;

    let tag = &caps[4];
    if version_of(tag).is_none() {
        return Err(NamingError::UnknownVersion {
            filename: filename.to_string(),
            tag: tag.to_string(),
        });
    }

    Ok(ArtifactName {
        base_name: caps[1].to_string(),
        width,
        height,
        version_tag: tag.to_string(),
    })
}

/// Check that a model filename and a labels filename both follow the
/// convention and name the same artifact.
///
/// A parse failure of either name is returned as-is; a pair that parses but
/// disagrees yields [`NamingError::CompanionMismatch`].
pub fn verify_match(
    model_filename: &str,
    model_suffix: &str,
    labels_filename: &str,
) -> Result<ArtifactName, NamingError> {
    debug!(
        "Verifying names - model: {}, labels: {}",
        model_filename, labels_filename
    );

    let model = parse(model_filename, model_suffix)?;
    let labels = parse(labels_filename, NamingConfig::LABELS_SUFFIX)?;

    if model != labels {
        return Err(NamingError::CompanionMismatch {
            model: model_filename.to_string(),
            labels: labels_filename.to_string(),
        });
    }

    Ok(model)
}

/// Map a version tag to its model family.
fn version_of(tag: &str) -> Option<ModelVersion> {
    let caps = VERSION_PATTERN.captures(tag)?;
    match &caps[1] {
        "5" => Some(ModelVersion::YoloV5),
        "8" => Some(ModelVersion::YoloV8),
        "11" => Some(ModelVersion::YoloV11),
        _ => None,
    }
}

/// Parse a width/height group. Zero and non-canonical forms such as `0640`
/// are rejected so a parsed name always formats back to the same filename.
fn parse_dimension(filename: &str, dimension: &'static str, raw: &str) -> Result<u32, NamingError> {
    let invalid = || NamingError::InvalidDimension {
        filename: filename.to_string(),
        dimension,
        value: raw.to_string(),
    };

    if raw.starts_with('0') {
        return Err(invalid());
    }

    match raw.parse::<u32>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(invalid()),
    }
}
