//! Fetch jobs for each downstream model.
//!
//! The WRFDA jobs fan out over three assimilation cycles through the batch
//! fetcher, one session per cycle. Continuum and Risico jobs run on a single
//! session and stop at the first error.

use std::fmt;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::{info, instrument, warn};
use webdrops::time::format_hour;
use webdrops::{
    BatchFetcher, BatchOutcome, Domain, MapArea, RadarVariable, SensorClass, SensorGroup,
    TimelineResolver, WebdropsClient,
};

use crate::staging::Staging;

/// Shared state for running jobs.
#[derive(Clone)]
pub struct JobContext {
    pub fetcher: BatchFetcher,
    pub staging: Staging,
    pub resolver: TimelineResolver,
}

/// One unit of work in a download plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Job {
    RisicoMaps {
        date: DateTime<Utc>,
    },
    ContinuumSensors {
        date: DateTime<Utc>,
        domain: Domain,
    },
    WrfdaSensors {
        date: DateTime<Utc>,
        domain: Domain,
        group: SensorGroup,
    },
    WrfdaRadars {
        date: DateTime<Utc>,
    },
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Job::RisicoMaps { date } => write!(f, "risico maps for {}", format_hour(date)),
            Job::ContinuumSensors { date, domain } => {
                write!(f, "continuum sensors for {} in {}", format_hour(date), domain)
            }
            Job::WrfdaSensors {
                date,
                domain,
                group,
            } => write!(
                f,
                "WRFDA {} sensors for {} in {}",
                group.upstream_name(),
                format_hour(date),
                domain
            ),
            Job::WrfdaRadars { date } => write!(f, "WRFDA radars for {}", format_hour(date)),
        }
    }
}

impl Job {
    pub async fn run(&self, ctx: &JobContext) -> Result<()> {
        info!(job = %self, "Starting job");
        let result = match *self {
            Job::RisicoMaps { date } => risico_maps(ctx, date).await,
            Job::ContinuumSensors { date, domain } => continuum_sensors(ctx, date, domain).await,
            Job::WrfdaSensors {
                date,
                domain,
                group,
            } => wrfda_sensors(ctx, date, domain, group).await,
            Job::WrfdaRadars { date } => wrfda_radars(ctx, date).await,
        };
        result.with_context(|| format!("{} failed", self))
    }
}

/// Assimilation cycles for a WRF run starting at `date`.
pub fn wrfda_cycles(date: DateTime<Utc>) -> [DateTime<Utc>; 3] {
    [date, date - Duration::hours(3), date - Duration::hours(6)]
}

fn first_failure(outcome: BatchOutcome<anyhow::Error>) -> Result<()> {
    if outcome.failures.len() > 1 {
        warn!(
            failed = outcome.failures.len(),
            attempted = outcome.attempted,
            "Several cycles failed, reporting the first"
        );
    }
    match outcome.into_result() {
        Ok(()) => Ok(()),
        Err(failure) => {
            Err(failure
                .error
                .context(format!("cycle {}", format_hour(&failure.instant))))
        }
    }
}

// ============================================================================
// WRFDA
// ============================================================================

/// Radar layers at the common instant nearest each assimilation cycle.
pub async fn wrfda_radars(ctx: &JobContext, date: DateTime<Utc>) -> Result<()> {
    let staging = ctx.staging.clone();
    let resolver = ctx.resolver;

    let outcome = ctx
        .fetcher
        .fetch_all(&wrfda_cycles(date), move |client, cycle| {
            radars_for_cycle(client, cycle, staging.clone(), resolver)
        })
        .await;
    first_failure(outcome)
}

#[instrument(skip(client, cycle, staging, resolver), fields(cycle = %format_hour(&cycle)))]
async fn radars_for_cycle(
    mut client: WebdropsClient,
    cycle: DateTime<Utc>,
    staging: Staging,
    resolver: TimelineResolver,
) -> Result<()> {
    let best = resolver
        .resolve(&mut client, cycle, &RadarVariable::ASSIMILATED)
        .await
        .context("resolving radar timeline")?;

    let hour = format_hour(&cycle);
    for variable in RadarVariable::ASSIMILATED {
        let data = client.radar_data(variable, best).await?;
        staging
            .write(format!("WRFDA/RADARS/{}/{}-{}.nc", hour, hour, variable), &data)
            .await?;
    }
    Ok(())
}

/// Thermometer observations around each assimilation cycle.
pub async fn wrfda_sensors(
    ctx: &JobContext,
    date: DateTime<Utc>,
    domain: Domain,
    group: SensorGroup,
) -> Result<()> {
    let staging = ctx.staging.clone();

    let outcome = ctx
        .fetcher
        .fetch_all(&wrfda_cycles(date), move |client, cycle| {
            sensors_for_cycle(client, cycle, staging.clone(), domain, group)
        })
        .await;
    first_failure(outcome)
}

#[instrument(skip(client, cycle, staging, domain), fields(cycle = %format_hour(&cycle)))]
async fn sensors_for_cycle(
    mut client: WebdropsClient,
    cycle: DateTime<Utc>,
    staging: Staging,
    domain: Domain,
    group: SensorGroup,
) -> Result<()> {
    let class = SensorClass::Termometro;
    let hour = format_hour(&cycle);

    let (registry, ids) = client.sensor_ids(class, group, &domain).await?;
    info!(class = %class, sensors = ids.len(), "Sensors inside domain");
    staging
        .write(format!("WRFDA/SENSORS/{}/{}-registry.json", hour, class), &registry)
        .await?;

    let from = cycle - Duration::minutes(5);
    let to = cycle + Duration::minutes(5);
    let observations = client.sensors_data(class, group, from, to, 60).await?;
    staging
        .write(format!("WRFDA/SENSORS/{}/{}.json", hour, class), &observations)
        .await?;
    Ok(())
}

// ============================================================================
// Continuum
// ============================================================================

pub const CONTINUUM_CLASSES: [SensorClass; 5] = [
    SensorClass::Radiometro,
    SensorClass::Igrometro,
    SensorClass::Termometro,
    SensorClass::Anemometro,
    SensorClass::Pluviometro,
];

/// Hourly DPC observations over the 60 hours before `date`.
pub async fn continuum_sensors(ctx: &JobContext, date: DateTime<Utc>, domain: Domain) -> Result<()> {
    let mut client = ctx.fetcher.connect().await?;
    let from = date - Duration::hours(60);

    for class in CONTINUUM_CLASSES {
        let (registry, ids) = client.sensor_ids(class, SensorGroup::Dpc, &domain).await?;
        info!(class = %class, sensors = ids.len(), "Sensors inside domain");
        ctx.staging
            .write(format!("CONTINUUM/SENSORS/anag-{}.json", class), &registry)
            .await?;

        if ids.is_empty() {
            warn!(class = %class, "No sensors inside domain, skipping observations");
            continue;
        }

        let observations = client
            .sensors_data_by_ids(class, &ids, from, date, 3600)
            .await?;
        ctx.staging
            .write(format!("CONTINUUM/SENSORS/{}.json", class), &observations)
            .await?;
    }
    Ok(())
}

// ============================================================================
// Risico
// ============================================================================

pub const RISICO_CLASSES: [SensorClass; 3] = [
    SensorClass::Pluviometro,
    SensorClass::Igrometro,
    SensorClass::Termometro,
];

/// Start of each 12 h map window, oldest first, covering the 72 hours before `date`.
pub fn risico_steps(date: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    (1..=6i64)
        .rev()
        .map(|step| date - Duration::hours(12 * step))
        .collect()
}

/// DPC observation maps in six 12 h windows before `date`.
pub async fn risico_maps(ctx: &JobContext, date: DateTime<Utc>) -> Result<()> {
    let mut client = ctx.fetcher.connect().await?;

    for from in risico_steps(date) {
        let to = from + Duration::hours(12);
        for class in RISICO_CLASSES {
            let map = client
                .sensors_map(class, from, to, MapArea::Group(SensorGroup::Dpc))
                .await?;
            ctx.staging
                .write(
                    format!("RISICO/SENSORS/{}/{}.nc", format_hour(&from), class),
                    &map,
                )
                .await?;
        }
    }
    Ok(())
}
