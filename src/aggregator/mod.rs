//! Downloads one (variable, month) pair grid point by grid point and writes
//! the deduplicated result to disk.

pub mod error;
pub mod writer;

use crate::aggregator::error::AggregateError;
use crate::aggregator::writer::{integral_floats_as_int, write_gzip_csv};
use crate::fetcher::transport::Transport;
use crate::fetcher::{Fetcher, Sleeper, ThreadSleeper};
use crate::types::grid::TimestampGrid;
use crate::types::month::Month;
use crate::types::reading_set::ResultSet;
use crate::types::variable::Variable;
use crate::utils::{ensure_output_dir_exists, output_file_name};
use bon::bon;
use chrono::{Local, NaiveDate};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info};
use polars::prelude::DataFrame;
use std::path::PathBuf;

/// What one month's download produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSummary {
    pub variable: Variable,
    pub month: Month,
    pub grid_points: usize,
    /// Rows collected before duplicates were removed.
    pub fetched_rows: usize,
    pub unique_rows: usize,
    pub path: PathBuf,
}

/// In-memory result of walking a month's grid.
#[derive(Debug, Clone)]
pub struct Collected {
    pub frame: DataFrame,
    pub grid_points: usize,
    pub fetched_rows: usize,
}

pub struct MonthAggregator<T, S = ThreadSleeper> {
    fetcher: Fetcher<T, S>,
    output_dir: PathBuf,
    fetch_date: Option<NaiveDate>,
    show_progress: bool,
}

#[bon]
impl<T: Transport, S: Sleeper> MonthAggregator<T, S> {
    /// `fetch_date` stamps the output file name and defaults to today's local
    /// date when the month is aggregated.
    #[builder]
    pub fn new(
        fetcher: Fetcher<T, S>,
        #[builder(into)] output_dir: PathBuf,
        fetch_date: Option<NaiveDate>,
        #[builder(default)] show_progress: bool,
    ) -> Self {
        Self {
            fetcher,
            output_dir,
            fetch_date,
            show_progress,
        }
    }

    /// Downloads `variable` for `month` and writes a single gzip CSV file.
    ///
    /// Grid points that yield no data, or whose retries run out, only make
    /// the result smaller; errors come from writing the output.
    pub fn aggregate(
        &self,
        variable: Variable,
        month: Month,
    ) -> Result<AggregateSummary, AggregateError> {
        let Collected {
            frame,
            grid_points,
            fetched_rows,
        } = self.collect(variable, month)?;
        let mut frame = integral_floats_as_int(frame)?;

        ensure_output_dir_exists(&self.output_dir)
            .map_err(|e| AggregateError::OutputDirCreation(self.output_dir.clone(), e))?;
        let fetch_date = self
            .fetch_date
            .unwrap_or_else(|| Local::now().date_naive());
        let path = self
            .output_dir
            .join(output_file_name(variable, month, fetch_date));
        write_gzip_csv(&mut frame, &path)?;
        debug!("Written {}", path.display());

        Ok(AggregateSummary {
            variable,
            month,
            grid_points,
            fetched_rows,
            unique_rows: frame.height(),
            path,
        })
    }

    /// Walks the month's timestamp grid in order and returns the
    /// deduplicated readings observed within `month`.
    pub fn collect(&self, variable: Variable, month: Month) -> Result<Collected, AggregateError> {
        let grid =
            TimestampGrid::for_month(variable, month).ok_or(AggregateError::InvalidMonth(month))?;
        info!(
            "variable = {}, month = {}, {} grid points every {} min",
            variable,
            month,
            grid.len(),
            grid.interval().num_minutes()
        );

        let progress = self.progress_bar(grid.len(), variable, month);
        let mut result = ResultSet::empty(variable)?;
        for timestamp in grid.iter() {
            if let Some(readings) = self.fetcher.fetch(variable, timestamp) {
                // Querying 00:00 on the 1st can return the previous day's last reading.
                if month.contains(readings.observed_at()) {
                    result.append(readings)?;
                } else {
                    debug!(
                        "Discarding readings observed at {} (queried {}), outside {}",
                        readings.observed_at(),
                        timestamp,
                        month
                    );
                }
            }
            progress.inc(1);
        }
        progress.finish();

        let fetched_rows = result.len();
        debug!("{} records", fetched_rows);
        let frame = result.into_deduplicated()?;
        debug!("{} records after removing duplicates", frame.height());

        Ok(Collected {
            frame,
            grid_points: grid.len(),
            fetched_rows,
        })
    }

    fn progress_bar(&self, len: usize, variable: Variable, month: Month) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::with_draw_target(Some(len as u64), progress_target());
        pb.set_style(
            ProgressStyle::with_template(
                "    {msg} {percent:>3}% [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        pb.set_message(format!("{variable} {month}"));
        pb
    }
}

/// Progress shares standard output with the per-variable status lines.
fn progress_target() -> ProgressDrawTarget {
    ProgressDrawTarget::stdout()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::writer::read_gzip_csv;
    use crate::fetcher::error::FetchError;
    use crate::fetcher::test_support::{reply, CountingSleeper, ScriptedTransport};
    use crate::fetcher::transport::HttpReply;
    use crate::fetcher::RetryPolicy;
    use chrono::{Duration, NaiveDateTime};
    use polars::prelude::ChunkAgg;
    use std::cell::Cell;
    use std::time::Duration as StdDuration;

    /// Answers every request with a body computed from the queried instant.
    struct FnTransport<F> {
        respond: F,
        calls: Cell<usize>,
    }

    impl<F: Fn(Variable, NaiveDateTime) -> HttpReply> FnTransport<F> {
        fn new(respond: F) -> Self {
            Self {
                respond,
                calls: Cell::new(0),
            }
        }
    }

    impl<F: Fn(Variable, NaiveDateTime) -> HttpReply> Transport for FnTransport<F> {
        fn get(&self, variable: Variable, timestamp: NaiveDateTime) -> Result<HttpReply, FetchError> {
            self.calls.set(self.calls.get() + 1);
            Ok((self.respond)(variable, timestamp))
        }
    }

    fn station_body(observed: NaiveDateTime, station: &str, value: f64) -> String {
        format!(
            r#"{{"items": [{{"timestamp": "{}+08:00", "readings": [{{"station_id": "{}", "value": {}}}]}}]}}"#,
            observed.format("%Y-%m-%dT%H:%M:%S"),
            station,
            value
        )
    }

    fn pm25_body(observed: NaiveDateTime) -> String {
        format!(
            r#"{{"items": [{{"timestamp": "{}+08:00", "readings": {{"pm25_one_hourly": {{"east": 10, "west": 12}}}}}}]}}"#,
            observed.format("%Y-%m-%dT%H:%M:%S")
        )
    }

    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::builder()
            .attempts(attempts)
            .backoff(StdDuration::ZERO)
            .build()
    }

    fn fetch_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 5, 26).unwrap()
    }

    #[test]
    fn test_rainfall_february_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
        let transport = FnTransport::new(|_, ts| reply(200, &station_body(ts, "S77", 0.2)));
        let sleeper = CountingSleeper::default();
        let dir = tempfile::tempdir()?;
        let aggregator = MonthAggregator::builder()
            .fetcher(Fetcher::with_sleeper(&transport, &sleeper, fast_policy(10)))
            .output_dir(dir.path().join("out"))
            .fetch_date(fetch_date())
            .build();

        let summary = aggregator.aggregate(Variable::Rainfall, Month(2017, 2))?;

        assert_eq!(summary.grid_points, 28 * 24 * 12 + 1);
        assert_eq!(transport.calls.get(), 28 * 24 * 12 + 1);
        // The trailing 2017-03-01 00:00 point is out of month.
        assert_eq!(summary.fetched_rows, 28 * 24 * 12);
        assert_eq!(summary.unique_rows, 28 * 24 * 12);
        assert_eq!(sleeper.count(), 0);
        assert_eq!(
            summary.path,
            dir.path().join("out").join("rainfall_2017_02_c20170526.csv.gz")
        );

        let written = read_gzip_csv(&summary.path)?;
        assert_eq!(written.height(), 28 * 24 * 12);
        let names: Vec<&str> = written
            .get_column_names()
            .into_iter()
            .map(|n| n.as_str())
            .collect();
        assert_eq!(names, vec!["station_id", "value", "timestamp_sgt"]);
        let stamps = written.column("timestamp_sgt")?.str()?;
        assert_eq!(stamps.get(0), Some("2017-02-01 00:00:00"));
        assert_eq!(stamps.get(28 * 24 * 12 - 1), Some("2017-02-28 23:55:00"));
        Ok(())
    }

    #[test]
    fn test_previous_month_reading_at_boundary_is_dropped() -> Result<(), Box<dyn std::error::Error>>
    {
        let month = Month(2017, 3);
        let first = month.first_instant().unwrap();
        // The first grid point reports the previous day's last hourly reading.
        let transport = FnTransport::new(move |_, ts| {
            let observed = if ts == first {
                ts - Duration::hours(1)
            } else {
                ts
            };
            reply(200, &pm25_body(observed))
        });
        let aggregator = MonthAggregator::builder()
            .fetcher(Fetcher::with_sleeper(
                &transport,
                CountingSleeper::default(),
                fast_policy(3),
            ))
            .output_dir(tempfile::tempdir()?.path())
            .build();

        let collected = aggregator.collect(Variable::Pm25, month)?;
        assert_eq!(collected.grid_points, 31 * 24 + 1);
        // Two regions for every in-month hour; the first and last points fall outside.
        assert_eq!(collected.fetched_rows, (31 * 24 - 1) * 2);
        let stamps = collected.frame.column("timestamp_sgt")?.datetime()?;
        let earliest = stamps.physical().min().unwrap();
        let expected = NaiveDate::from_ymd_opt(2017, 3, 1)
            .unwrap()
            .and_hms_opt(1, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp_millis();
        assert_eq!(earliest, expected);

        let names: Vec<&str> = collected
            .frame
            .get_column_names()
            .into_iter()
            .map(|n| n.as_str())
            .collect();
        assert_eq!(names, vec!["region", "pm25_one_hourly", "timestamp_sgt"]);
        Ok(())
    }

    #[test]
    fn test_repeated_observations_are_deduplicated() -> Result<(), Box<dyn std::error::Error>> {
        // Relative humidity is polled every minute but the upstream only
        // refreshes every five, so consecutive grid points repeat readings.
        let transport = FnTransport::new(|_, ts: NaiveDateTime| {
            let minute = ts.and_utc().timestamp() / 60;
            let observed = ts - Duration::minutes(minute % 5);
            reply(200, &station_body(observed, "S24", 81.5))
        });
        let aggregator = MonthAggregator::builder()
            .fetcher(Fetcher::with_sleeper(
                &transport,
                CountingSleeper::default(),
                fast_policy(1),
            ))
            .output_dir(tempfile::tempdir()?.path())
            .build();

        let collected = aggregator.collect(Variable::RelativeHumidity, Month(2017, 2))?;
        assert_eq!(collected.grid_points, 28 * 24 * 60 + 1);
        assert_eq!(collected.fetched_rows, 28 * 24 * 60);
        assert_eq!(collected.frame.height(), 28 * 24 * 12);
        Ok(())
    }

    #[test]
    fn test_always_failing_upstream_still_writes_output() -> Result<(), Box<dyn std::error::Error>>
    {
        let transport = ScriptedTransport::new(vec![], reply(503, "unavailable"));
        let sleeper = CountingSleeper::default();
        let dir = tempfile::tempdir()?;
        let aggregator = MonthAggregator::builder()
            .fetcher(Fetcher::with_sleeper(&transport, &sleeper, fast_policy(2)))
            .output_dir(dir.path())
            .fetch_date(fetch_date())
            .build();

        let summary = aggregator.aggregate(Variable::Pm25, Month(2017, 2))?;
        let points = 28 * 24 + 1;
        assert_eq!(summary.grid_points, points);
        assert_eq!(transport.calls.get(), points * 2);
        assert_eq!(sleeper.count(), points);
        assert_eq!(summary.fetched_rows, 0);
        assert_eq!(summary.unique_rows, 0);
        assert!(summary.path.exists());
        assert_eq!(
            summary.path.file_name().and_then(|n| n.to_str()),
            Some("pm25_2017_02_c20170526.csv.gz")
        );
        Ok(())
    }

    #[test]
    fn test_sparse_cadence_does_not_retry() -> Result<(), Box<dyn std::error::Error>> {
        // Data only on the hour, an empty reading list otherwise.
        let transport = FnTransport::new(|_, ts: NaiveDateTime| {
            let body = if ts.and_utc().timestamp() % 3600 == 0 {
                station_body(ts, "S50", 27.4)
            } else {
                format!(
                    r#"{{"items": [{{"timestamp": "{}+08:00", "readings": []}}]}}"#,
                    ts.format("%Y-%m-%dT%H:%M:%S")
                )
            };
            reply(200, &body)
        });
        let sleeper = CountingSleeper::default();
        let aggregator = MonthAggregator::builder()
            .fetcher(Fetcher::with_sleeper(&transport, &sleeper, fast_policy(10)))
            .output_dir(tempfile::tempdir()?.path())
            .build();

        let collected = aggregator.collect(Variable::AirTemperature, Month(2016, 2))?;
        assert_eq!(collected.grid_points, 29 * 24 * 60 + 1);
        assert_eq!(transport.calls.get(), collected.grid_points);
        assert_eq!(sleeper.count(), 0);
        assert_eq!(collected.frame.height(), 29 * 24);
        Ok(())
    }

    #[test]
    fn test_progress_is_drawn_on_stdout() {
        assert!(format!("{:?}", progress_target()).contains("Stdout"));

        let transport = ScriptedTransport::new(vec![], reply(200, r#"{"items": []}"#));
        let quiet = MonthAggregator::builder()
            .fetcher(Fetcher::new(&transport, RetryPolicy::default()))
            .output_dir("unused")
            .build();
        assert!(quiet
            .progress_bar(10, Variable::Rainfall, Month(2017, 2))
            .is_hidden());
    }

    #[test]
    fn test_invalid_month_is_rejected() {
        let transport = ScriptedTransport::new(vec![], reply(200, "{}"));
        let aggregator = MonthAggregator::builder()
            .fetcher(Fetcher::with_sleeper(
                &transport,
                CountingSleeper::default(),
                fast_policy(1),
            ))
            .output_dir("unused")
            .build();
        assert!(matches!(
            aggregator.collect(Variable::Rainfall, Month(2017, 13)),
            Err(AggregateError::InvalidMonth(Month(2017, 13)))
        ));
        assert_eq!(transport.calls.get(), 0);
    }
}
