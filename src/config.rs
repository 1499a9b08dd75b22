use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::{Context, bail};
use chrono::{FixedOffset, Offset, Utc};
use clap::ValueEnum;
use regex::Regex;

/// Default flash data partition size, in bytes.
pub const DEFAULT_FLASH_CAPACITY: u64 = 0x16_0000;

/// Which storage medium a backend stands in for.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum Medium {
    /// On-chip flash filesystem
    #[default]
    Flash,
    /// SD card filesystem
    Sd,
}

impl fmt::Display for Medium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Medium::Flash => f.write_str("flash"),
            Medium::Sd => f.write_str("sd card"),
        }
    }
}

/// Everything needed to mount one backend.
#[derive(Clone, Debug)]
pub struct MountConfig {
    pub medium: Medium,
    /// Host directory holding the medium's contents
    pub root: PathBuf,
    /// Flash only: create an empty root when none exists
    pub format_if_failed: bool,
    /// Flash only: reported total size
    pub capacity_bytes: u64,
    /// Offset used to turn raw modification times into calendar time
    pub utc_offset: FixedOffset,
}

impl MountConfig {
    pub fn new(medium: Medium, root: impl Into<PathBuf>) -> Self {
        Self {
            medium,
            root: root.into(),
            format_if_failed: true,
            capacity_bytes: DEFAULT_FLASH_CAPACITY,
            utc_offset: utc(),
        }
    }
}

pub fn utc() -> FixedOffset {
    Utc.fix()
}

static OFFSET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?i:utc|z)|([+-])(\d{2}):?(\d{2}))$").expect("valid offset pattern")
});

/// Parses `Z`, `UTC`, `+HH:MM`, `-HHMM` style offsets.
pub fn parse_utc_offset(raw: &str) -> anyhow::Result<FixedOffset> {
    let raw = raw.trim();
    let captures = OFFSET_PATTERN
        .captures(raw)
        .with_context(|| format!("Invalid UTC offset: {raw}"))?;

    let (Some(sign), Some(hours), Some(minutes)) =
        (captures.get(1), captures.get(2), captures.get(3))
    else {
        return Ok(utc());
    };

    let hours: i32 = hours.as_str().parse()?;
    let minutes: i32 = minutes.as_str().parse()?;
    if minutes >= 60 {
        bail!("Invalid UTC offset: {raw}");
    }

    let seconds = (hours * 3600 + minutes * 60) * if sign.as_str() == "-" { -1 } else { 1 };
    FixedOffset::east_opt(seconds).with_context(|| format!("UTC offset out of range: {raw}"))
}
