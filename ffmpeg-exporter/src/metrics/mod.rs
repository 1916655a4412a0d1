use prometheus_client::metrics::MetricType;

pub mod collector;
pub mod fields;
pub mod record;

pub use collector::ProgressCollector;

/// Metric families exported for ffmpeg progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Family {
    Frame,
    Bytes,
    OutTime,
    Dropped,
    Duplicate,
    Quantizer,
    Speed,
}

impl Family {
    /// Every family, in exposition order
    pub const ALL: [Family; 7] = [
        Family::Frame,
        Family::Bytes,
        Family::OutTime,
        Family::Dropped,
        Family::Duplicate,
        Family::Quantizer,
        Family::Speed,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Family::Frame => "ffmpeg_progress_frame",
            Family::Bytes => "ffmpeg_progress_bytes",
            Family::OutTime => "ffmpeg_progress_us",
            Family::Dropped => "ffmpeg_progress_dropped",
            Family::Duplicate => "ffmpeg_progress_duplicate",
            Family::Quantizer => "ffmpeg_progress_quantizer",
            Family::Speed => "ffmpeg_progress_speed",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            Family::Frame => "processed frames",
            Family::Bytes => "output bytes",
            Family::OutTime => "timestamp of current frame",
            Family::Dropped => "dropped frames",
            Family::Duplicate => "duplicate frames",
            Family::Quantizer => "quantizer",
            Family::Speed => "speed",
        }
    }

    pub fn kind(self) -> MetricType {
        match self {
            Family::Quantizer | Family::Speed => MetricType::Gauge,
            _ => MetricType::Counter,
        }
    }
}

/// Labels of a single point, in exposition order
pub type Labels = Vec<(&'static str, String)>;

/// Single value extracted from a progress record
#[derive(Debug, Default, Clone, PartialEq, PartialOrd)]
pub struct Point {
    pub labels: Labels,
    pub value: f64,
}

/// Points of one family gathered during a scrape
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    pub family: Family,
    pub points: Vec<Point>,
}

/// Every point produced by one scrape
///
/// All the families are always present, even when they hold no point.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub families: Vec<MetricFamily>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            families: Family::ALL
                .into_iter()
                .map(|family| MetricFamily {
                    family,
                    points: Vec::new(),
                })
                .collect(),
        }
    }
}

impl Snapshot {
    /// Points of the given family
    pub fn points(&self, family: Family) -> &[Point] {
        self.families
            .iter()
            .find(|f| f.family == family)
            .map(|f| f.points.as_slice())
            .unwrap_or_default()
    }

    pub fn push(&mut self, family: Family, point: Point) {
        if let Some(f) = self.families.iter_mut().find(|f| f.family == family) {
            f.points.push(point);
        }
    }

    pub fn len(&self) -> usize {
        self.families.iter().map(|f| f.points.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
