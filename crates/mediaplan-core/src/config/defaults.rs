use crate::error::{MediaError, Result};

pub(super) fn default_true() -> bool {
    true
}

pub(super) fn default_catalog_name() -> String {
    "MyCatalog".to_string()
}

pub(super) fn default_volume_retention() -> String {
    "365d".to_string()
}

/// Parse a duration string like "2d", "48h", "1w", "6m", "1y" into seconds.
/// Pure numeric values are days; "0" means unset.
pub fn parse_human_duration(raw: &str) -> Result<u64> {
    let input = raw.trim();
    if input.is_empty() {
        return Err(MediaError::Config("duration must not be empty".into()));
    }

    if let Ok(days) = input.parse::<u64>() {
        return Ok(days.saturating_mul(86_400));
    }

    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| MediaError::Config(format!("invalid duration: '{raw}'")))?;
    let (num_part, suffix) = input.split_at(split);
    let value: u64 = num_part
        .parse()
        .map_err(|_| MediaError::Config(format!("invalid duration value: '{raw}'")))?;

    let unit: u64 = match suffix {
        "s" | "S" => 1,
        "h" | "H" => 60 * 60,
        "d" | "D" => 86_400,
        "w" | "W" => 7 * 86_400,
        "m" | "M" => 30 * 86_400,
        "y" | "Y" => 365 * 86_400,
        _ => {
            return Err(MediaError::Config(format!(
                "unknown duration suffix '{suffix}' in '{raw}' (use s/h/d/w/m/y)"
            )));
        }
    };
    Ok(value.saturating_mul(unit))
}

/// Parse a byte size like "512M", "50G", "2T" or a plain byte count.
/// Suffixes are binary multiples.
pub fn parse_size(raw: &str) -> Result<u64> {
    let input = raw.trim();
    let (num_part, mult) = match input.chars().last() {
        Some(c) if c.is_ascii_alphabetic() => {
            let mult: u64 = match c.to_ascii_uppercase() {
                'K' => 1 << 10,
                'M' => 1 << 20,
                'G' => 1 << 30,
                'T' => 1 << 40,
                other => {
                    return Err(MediaError::Config(format!(
                        "unknown size suffix '{other}' in '{raw}' (use K/M/G/T)"
                    )));
                }
            };
            (&input[..input.len() - 1], mult)
        }
        Some(_) => (input, 1),
        None => return Err(MediaError::Config("size must not be empty".into())),
    };
    let value: u64 = num_part
        .trim()
        .parse()
        .map_err(|_| MediaError::Config(format!("invalid size value: '{raw}'")))?;
    value
        .checked_mul(mult)
        .ok_or_else(|| MediaError::Config(format!("size '{raw}' is too large")))
}
