//! Generation metric reporting
//!
//! Flattens a population's logging data into named scalars and emits them as
//! tracing events. Scalars are reported verbatim; series are reduced to
//! `_max`, `_min`, `_mean` and `_std`. Empty series (for example fitness
//! before anything has been evaluated) are skipped rather than failing.
//!
//! The reproducer's per-generation scalars are also published as Prometheus
//! gauges on a registry owned by the reporter.

use prometheus::{Encoder, Gauge, IntGauge, Opts, Registry, TextEncoder};
use tracing::info;

use evorepro_common::{
    EvoreproError, LogValue, Result, ARCHIVE_SIZE_METRIC, CHILDREN_ADMITTED_METRIC,
    PARENTS_DROPPED_METRIC,
};

use crate::genome::Genome;
use crate::population::Population;

/// Metric name under which population fitness is summarised
pub const FITNESS_METRIC: &str = "generation/fitness";

/// One flattened metric
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub name: String,
    pub value: f64,
}

/// Prometheus gauges for the latest reported generation
#[derive(Clone)]
pub struct GenerationGauges {
    pub generation: IntGauge,
    pub archive_size: IntGauge,
    pub children_admitted: IntGauge,
    pub parents_dropped: IntGauge,
    pub best_fitness: Gauge,
}

impl GenerationGauges {
    /// Build the gauges, labelled with `run` when given
    pub fn new(run: Option<&str>) -> Result<Self> {
        let opts = |name: &str, help: &str| {
            let opts = Opts::new(name, help);
            match run {
                Some(run) => opts.const_label("run", run),
                None => opts,
            }
        };

        Ok(Self {
            generation: IntGauge::with_opts(opts(
                "evorepro_generation",
                "Index of the last reported generation",
            ))
            .map_err(telemetry_error)?,
            archive_size: IntGauge::with_opts(opts(
                "evorepro_archive_size",
                "Unique genome signatures admitted so far",
            ))
            .map_err(telemetry_error)?,
            children_admitted: IntGauge::with_opts(opts(
                "evorepro_children_admitted",
                "Children admitted in the last reproduction",
            ))
            .map_err(telemetry_error)?,
            parents_dropped: IntGauge::with_opts(opts(
                "evorepro_parents_dropped",
                "Parents whose retry budgets ran out in the last reproduction",
            ))
            .map_err(telemetry_error)?,
            best_fitness: Gauge::with_opts(opts(
                "evorepro_best_fitness",
                "Highest recorded fitness in the population",
            ))
            .map_err(telemetry_error)?,
        })
    }

    pub fn register(&self, registry: &Registry) -> Result<()> {
        registry
            .register(Box::new(self.generation.clone()))
            .map_err(telemetry_error)?;
        registry
            .register(Box::new(self.archive_size.clone()))
            .map_err(telemetry_error)?;
        registry
            .register(Box::new(self.children_admitted.clone()))
            .map_err(telemetry_error)?;
        registry
            .register(Box::new(self.parents_dropped.clone()))
            .map_err(telemetry_error)?;
        registry
            .register(Box::new(self.best_fitness.clone()))
            .map_err(telemetry_error)?;
        Ok(())
    }

    fn observe<G: Genome>(&self, population: &Population<G>) {
        self.generation.set(population.generation as i64);

        let logging = &population.logging_data;
        for (gauge, name) in [
            (&self.archive_size, ARCHIVE_SIZE_METRIC),
            (&self.children_admitted, CHILDREN_ADMITTED_METRIC),
            (&self.parents_dropped, PARENTS_DROPPED_METRIC),
        ] {
            if let Some(value) = logging.scalar(name) {
                gauge.set(value as i64);
            }
        }

        if let Some(best) = population.fitness.values().copied().reduce(f64::max) {
            self.best_fitness.set(best);
        }
    }
}

/// Reports per-generation metrics through `tracing` and a Prometheus registry
#[derive(Clone)]
pub struct MetricReporter {
    prefix: Option<String>,
    registry: Registry,
    gauges: GenerationGauges,
}

impl MetricReporter {
    pub fn new() -> Result<Self> {
        Self::build(None)
    }

    /// Prepend `prefix/` to every metric name and label the gauges with it
    pub fn with_prefix(prefix: impl Into<String>) -> Result<Self> {
        Self::build(Some(prefix.into()))
    }

    fn build(prefix: Option<String>) -> Result<Self> {
        let registry = Registry::new();
        let gauges = GenerationGauges::new(prefix.as_deref())?;
        gauges.register(&registry)?;
        Ok(Self {
            prefix,
            registry,
            gauges,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn gauges(&self) -> &GenerationGauges {
        &self.gauges
    }

    /// Flatten fitness and logging data into metrics, in name order
    pub fn collect<G: Genome>(&self, population: &Population<G>) -> Vec<Metric> {
        let mut metrics = Vec::new();

        let fitness: Vec<f64> = population.fitness.values().copied().collect();
        self.push_series(&mut metrics, FITNESS_METRIC, &fitness);

        for (name, value) in population.logging_data.iter() {
            match value {
                LogValue::Scalar(v) => metrics.push(Metric {
                    name: self.name(name),
                    value: *v,
                }),
                LogValue::Vector(values) => self.push_series(&mut metrics, name, values),
            }
        }
        metrics
    }

    /// Collect and emit the current generation's metrics, updating the gauges
    pub fn report<G: Genome>(&self, population: &Population<G>) -> Vec<Metric> {
        let metrics = self.collect(population);
        for metric in &metrics {
            info!(
                target: "evorepro::metrics",
                generation = population.generation,
                metric = %metric.name,
                value = metric.value
            );
        }
        self.gauges.observe(population);
        metrics
    }

    /// Registry contents in the Prometheus text exposition format
    pub fn encode_text(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(telemetry_error)?;
        String::from_utf8(buffer).map_err(|e| EvoreproError::Telemetry(e.to_string()))
    }

    fn push_series(&self, metrics: &mut Vec<Metric>, name: &str, values: &[f64]) {
        let Some(summary) = Summary::of(values) else {
            return;
        };
        for (suffix, value) in [
            ("max", summary.max),
            ("min", summary.min),
            ("mean", summary.mean),
            ("std", summary.std),
        ] {
            metrics.push(Metric {
                name: self.name(&format!("{}_{}", name, suffix)),
                value,
            });
        }
    }

    fn name(&self, name: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix, name),
            None => name.to_string(),
        }
    }
}

fn telemetry_error(err: prometheus::Error) -> EvoreproError {
    EvoreproError::Telemetry(err.to_string())
}

/// Summary statistics of a non-empty series (population standard deviation)
#[derive(Debug, Clone, Copy, PartialEq)]
struct Summary {
    max: f64,
    min: f64,
    mean: f64,
    std: f64,
}

impl Summary {
    fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Some(Self {
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            mean,
            std: variance.sqrt(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::bitstring::BitGenome;
    use crate::population::PopulationConfig;
    use evorepro_common::GenomeId;

    fn find(metrics: &[Metric], name: &str) -> Option<f64> {
        metrics.iter().find(|m| m.name == name).map(|m| m.value)
    }

    #[test]
    fn test_empty_population_reports_nothing() {
        let pop: Population<BitGenome> = Population::new(PopulationConfig::new(4).unwrap());
        assert!(MetricReporter::new().unwrap().report(&pop).is_empty());
    }

    #[test]
    fn test_fitness_summary() {
        let mut pop = Population::new(PopulationConfig::new(4).unwrap());
        for (id, fitness) in [(0u64, 1.0), (1, 3.0)] {
            pop.admit(BitGenome::from_bits(GenomeId::new(id), vec![true]))
                .unwrap();
            pop.record_fitness(GenomeId::new(id), fitness).unwrap();
        }

        let metrics = MetricReporter::new().unwrap().collect(&pop);

        assert_eq!(find(&metrics, "generation/fitness_max"), Some(3.0));
        assert_eq!(find(&metrics, "generation/fitness_min"), Some(1.0));
        assert_eq!(find(&metrics, "generation/fitness_mean"), Some(2.0));
        assert_eq!(find(&metrics, "generation/fitness_std"), Some(1.0));
    }

    #[test]
    fn test_scalars_and_empty_vectors() {
        let mut pop: Population<BitGenome> = Population::new(PopulationConfig::new(4).unwrap());
        pop.logging_data.record(ARCHIVE_SIZE_METRIC, 12usize);
        pop.logging_data.record("evaluation/steps", Vec::<f64>::new());

        let metrics = MetricReporter::with_prefix("run").unwrap().collect(&pop);

        assert_eq!(metrics.len(), 1);
        assert_eq!(
            find(&metrics, &format!("run/{}", ARCHIVE_SIZE_METRIC)),
            Some(12.0)
        );
    }

    #[test]
    fn test_reproduction_scalars_published_as_gauges() {
        let mut pop: Population<BitGenome> = Population::new(PopulationConfig::new(4).unwrap());
        pop.admit(BitGenome::from_bits(GenomeId::new(0), vec![true]))
            .unwrap();
        pop.record_fitness(GenomeId::new(0), 7.5).unwrap();
        pop.logging_data.record(ARCHIVE_SIZE_METRIC, 12usize);
        pop.logging_data.record(CHILDREN_ADMITTED_METRIC, 3usize);
        pop.logging_data.record(PARENTS_DROPPED_METRIC, 1usize);
        pop.advance_generation();
        pop.logging_data.record(ARCHIVE_SIZE_METRIC, 12usize);

        let reporter = MetricReporter::with_prefix("onemax").unwrap();
        reporter.report(&pop);

        let gauges = reporter.gauges();
        assert_eq!(gauges.generation.get(), 1);
        assert_eq!(gauges.archive_size.get(), 12);
        assert_eq!(gauges.best_fitness.get(), 7.5);

        let text = reporter.encode_text().unwrap();
        assert!(text.contains("evorepro_archive_size{run=\"onemax\"} 12"));
        assert_eq!(reporter.registry().gather().len(), 5);
    }

    #[test]
    fn test_gauges_untouched_before_reproduction() {
        let pop: Population<BitGenome> = Population::new(PopulationConfig::new(4).unwrap());
        let reporter = MetricReporter::new().unwrap();

        reporter.report(&pop);

        assert_eq!(reporter.gauges().archive_size.get(), 0);
        assert_eq!(reporter.gauges().best_fitness.get(), 0.0);
    }
}
