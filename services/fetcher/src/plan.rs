//! Mapping from download types to the jobs they need.

use chrono::{DateTime, Duration, Utc};
use clap::ValueEnum;
use webdrops::{Domain, SensorGroup};

use crate::jobs::Job;

/// Downstream model whose inputs should be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DownloadType {
    Risico,
    Continuum,
    Wrfit,
    Wrfitdpc,
    Adms,
    Limagrain,
    Wrffr,
}

/// Jobs for one download type, in execution order.
pub fn plan(kind: DownloadType, date: DateTime<Utc>) -> Vec<Job> {
    let italy_wu = |date| Job::WrfdaSensors {
        date,
        domain: Domain::ITALY,
        group: SensorGroup::Wunderground,
    };

    match kind {
        DownloadType::Risico => {
            let mut jobs = vec![Job::RisicoMaps { date }];
            for days_back in 0..3 {
                let date = date - Duration::hours(24 * days_back);
                jobs.push(italy_wu(date));
                jobs.push(Job::WrfdaRadars { date });
            }
            jobs
        }
        DownloadType::Continuum => vec![
            Job::ContinuumSensors {
                date,
                domain: Domain::ITALY,
            },
            italy_wu(date),
            Job::WrfdaRadars { date },
        ],
        DownloadType::Wrfit => vec![italy_wu(date), Job::WrfdaRadars { date }],
        DownloadType::Wrfitdpc => vec![
            Job::WrfdaSensors {
                date,
                domain: Domain::ITALY,
                group: SensorGroup::Dpc,
            },
            Job::WrfdaRadars { date },
        ],
        // radars for these come from another provider
        DownloadType::Adms | DownloadType::Limagrain | DownloadType::Wrffr => {
            vec![Job::WrfdaSensors {
                date,
                domain: Domain::FRANCE,
                group: SensorGroup::Wunderground,
            }]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webdrops::time::parse_hour;

    #[test]
    fn test_risico_plan_covers_three_days() {
        let date = parse_hour("2023060112").unwrap();
        let jobs = plan(DownloadType::Risico, date);

        assert_eq!(jobs.len(), 7);
        assert_eq!(jobs[0], Job::RisicoMaps { date });
        let radar_dates: Vec<_> = jobs
            .iter()
            .filter_map(|job| match job {
                Job::WrfdaRadars { date } => Some(*date),
                _ => None,
            })
            .collect();
        assert_eq!(
            radar_dates,
            vec![
                date,
                date - Duration::hours(24),
                date - Duration::hours(48)
            ]
        );
    }

    #[test]
    fn test_france_types_skip_radars() {
        let date = parse_hour("2023060100").unwrap();
        for kind in [DownloadType::Adms, DownloadType::Limagrain, DownloadType::Wrffr] {
            assert_eq!(
                plan(kind, date),
                vec![Job::WrfdaSensors {
                    date,
                    domain: Domain::FRANCE,
                    group: SensorGroup::Wunderground,
                }]
            );
        }
    }

    #[test]
    fn test_wrfitdpc_uses_dpc_group() {
        let date = parse_hour("2023060100").unwrap();
        let jobs = plan(DownloadType::Wrfitdpc, date);
        assert!(matches!(
            jobs[0],
            Job::WrfdaSensors {
                group: SensorGroup::Dpc,
                ..
            }
        ));
        assert_eq!(jobs[1], Job::WrfdaRadars { date });
    }

    #[test]
    fn test_download_type_names() {
        assert_eq!(
            DownloadType::from_str("WRFITDPC", true).unwrap(),
            DownloadType::Wrfitdpc
        );
        assert!(DownloadType::from_str("gfs", true).is_err());
    }
}
