use super::{Family, Labels, Point};

/// How the key of a progress field is recognized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPattern {
    /// Key equal to the given name
    Exact(&'static str),
    /// `stream_<output>_<stream>_q`
    Quantizer,
}

impl KeyPattern {
    pub fn matches(self, key: &str) -> bool {
        match self {
            KeyPattern::Exact(name) => key == name,
            KeyPattern::Quantizer => key.starts_with("stream") && key.ends_with('q'),
        }
    }
}

/// Conversion of a progress field into a point of a metric family
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub pattern: KeyPattern,
    pub family: Family,
    /// Labels derived from the key, appended after the job identifier
    pub labels: fn(&str) -> Option<Labels>,
    /// Numeric value of the field
    pub value: fn(&str) -> Option<f64>,
}

pub static FIELD_RULES: [FieldRule; 7] = [
    FieldRule {
        pattern: KeyPattern::Exact("frame"),
        family: Family::Frame,
        labels: no_labels,
        value: parse_float,
    },
    FieldRule {
        pattern: KeyPattern::Exact("total_size"),
        family: Family::Bytes,
        labels: no_labels,
        value: parse_float,
    },
    FieldRule {
        pattern: KeyPattern::Exact("out_time_us"),
        family: Family::OutTime,
        labels: no_labels,
        value: parse_float,
    },
    FieldRule {
        pattern: KeyPattern::Exact("drop_frames"),
        family: Family::Dropped,
        labels: no_labels,
        value: parse_float,
    },
    FieldRule {
        pattern: KeyPattern::Exact("dup_frames"),
        family: Family::Duplicate,
        labels: no_labels,
        value: parse_float,
    },
    FieldRule {
        pattern: KeyPattern::Quantizer,
        family: Family::Quantizer,
        labels: quantizer_labels,
        value: parse_float,
    },
    FieldRule {
        pattern: KeyPattern::Exact("speed"),
        family: Family::Speed,
        labels: no_labels,
        value: parse_speed,
    },
];

impl FieldRule {
    /// Find the rule handling `key`, if any
    pub fn find(key: &str) -> Option<&'static FieldRule> {
        FIELD_RULES.iter().find(|rule| rule.pattern.matches(key))
    }

    /// Convert a field into a point labelled with the job identifier
    ///
    /// Returns `None` if either the key or the value is malformed
    pub fn apply(&self, job: &str, key: &str, value: &str) -> Option<Point> {
        let value = (self.value)(value)?;
        let mut labels = vec![("id", job.to_owned())];
        labels.extend((self.labels)(key)?);

        Some(Point { labels, value })
    }
}

/// Convert a single progress field into a point
///
/// Fields that are unknown or malformed produce no point.
pub fn extract_point(job: &str, key: &str, value: &str) -> Option<(Family, Point)> {
    let Some(rule) = FieldRule::find(key) else {
        log::trace!("Ignore unknown field '{key}'");
        return None;
    };

    match rule.apply(job, key, value) {
        Some(point) => Some((rule.family, point)),
        None => {
            log::debug!("Field '{key}' of {job} contained '{value}' which could not be converted, ignoring");
            None
        }
    }
}

fn no_labels(_key: &str) -> Option<Labels> {
    Some(Vec::new())
}

fn quantizer_labels(key: &str) -> Option<Labels> {
    // example: stream_0_0_q
    let inner = key.strip_suffix('q')?;
    let inner = inner.strip_prefix("stream").unwrap_or(inner);

    let mut tokens = inner.split('_').filter(|token| !token.is_empty());
    let (Some(output), Some(stream), None) = (tokens.next(), tokens.next(), tokens.next()) else {
        return None;
    };

    Some(vec![
        ("output", output.to_owned()),
        ("stream", stream.to_owned()),
    ])
}

fn parse_float(value: &str) -> Option<f64> {
    value.trim().parse().ok()
}

fn parse_speed(value: &str) -> Option<f64> {
    let value = value.trim();
    parse_float(value.strip_suffix('x').unwrap_or(value))
}
