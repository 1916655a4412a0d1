use prometheus_client::{
    collector::Collector,
    encoding::{DescriptorEncoder, EncodeMetric},
    metrics::{counter::ConstCounter, gauge::ConstGauge, MetricType},
};

use crate::progress::{DirectoryStore, JobFile, ProgressError, ProgressStore};

use super::{fields::extract_point, record::latest_record, Family, Point, Snapshot};

/// [`Collector`] reading the latest progress of every ffmpeg job on each scrape
///
/// No state is kept between scrapes: the snapshot is rebuilt from the
/// progress files every time.
#[derive(Debug, Clone)]
pub struct ProgressCollector<S = DirectoryStore> {
    store: S,
}

impl<S: ProgressStore> ProgressCollector<S> {
    /// Create a new [`ProgressCollector`]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Gather the points of every running job
    ///
    /// Jobs that cannot be read are skipped, so the snapshot is always complete
    /// even if some of the families are empty.
    pub fn snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot::default();

        let jobs = match self.store.list_jobs() {
            Ok(jobs) => jobs,
            Err(err) => {
                log::error!("{err}");
                return snapshot;
            }
        };

        for job in jobs {
            match self.job_points(&job) {
                Ok(points) => {
                    for (family, point) in points {
                        snapshot.push(family, point);
                    }
                }
                Err(err) => log::warn!("Skip job {}: {err}", job.id),
            }
        }

        snapshot
    }

    /// Points of the latest progress record of a job
    fn job_points(&self, job: &JobFile) -> Result<Vec<(Family, Point)>, ProgressError> {
        log::debug!("Reading progress on {}", job.path.display());

        let lines = self.store.open_reverse(job)?;
        let record = latest_record(lines).map_err(|source| ProgressError::FileUnreadable {
            path: job.path.clone(),
            source,
        })?;

        let Some(fields) = record else {
            log::debug!("Job {} has finished, skipping", job.id);
            return Ok(Vec::new());
        };

        Ok(fields
            .iter()
            .filter_map(|field| extract_point(&job.id, &field.key, &field.value))
            .collect())
    }
}

impl<S: ProgressStore> Collector for ProgressCollector<S> {
    fn encode(&self, mut encoder: DescriptorEncoder) -> Result<(), std::fmt::Error> {
        let snapshot = self.snapshot();

        for family in &snapshot.families {
            let mut metric_encoder = encoder.encode_descriptor(
                family.family.name(),
                family.family.help(),
                None,
                family.family.kind(),
            )?;

            for Point { labels, value } in &family.points {
                let point_encoder = metric_encoder.encode_family(labels)?;
                match family.family.kind() {
                    MetricType::Counter => ConstCounter::new(*value).encode(point_encoder)?,
                    _ => ConstGauge::new(*value).encode(point_encoder)?,
                }
            }
        }

        Ok(())
    }
}
