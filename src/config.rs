use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

use crate::remote::DateRange;
use crate::types::FolderStyle;

/// Sync configuration assembled from CLI arguments.
///
/// Fields are ordered for optimal memory layout:
/// - Heap types first (String, PathBuf)
/// - Larger composites (`Option<DateRange>`, Duration)
/// - 8-byte primitives
/// - 4-byte primitives
/// - 1-byte enums
/// - All booleans grouped at the end
pub struct SyncConfig {
    // Heap types first
    pub access_token: String,
    pub storage_token: String,
    pub bucket: String,
    pub path_prefix: String,
    pub catalog_path: PathBuf,
    pub scratch_dir: PathBuf,

    // Date filter
    pub date_range: Option<DateRange>,

    // Durations and 8-byte primitives
    pub run_duration: Duration,
    pub list_pause: Duration,
    pub transfer_pause: Duration,
    pub progress_interval: Duration,
    pub min_artifact_bytes: u64,

    // 4-byte primitives
    pub page_size: u32,

    // 1-byte enums
    pub folder_style: FolderStyle,

    // All booleans grouped together
    pub dry_run: bool,
    pub halt_on_error: bool,
}

impl std::fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncConfig")
            .field("access_token", &"<redacted>")
            .field("storage_token", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("path_prefix", &self.path_prefix)
            .field("catalog_path", &self.catalog_path)
            .field("scratch_dir", &self.scratch_dir)
            .field("date_range", &self.date_range)
            .field("folder_style", &self.folder_style)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

/// Expand ~ to the user's home directory.
pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl SyncConfig {
    pub fn from_args(args: crate::cli::SyncArgs) -> anyhow::Result<Self> {
        if args.page_size == 0 {
            anyhow::bail!("--page-size must be at least 1");
        }

        let catalog_path = expand_tilde(&args.catalog.catalog);
        let scratch_dir = expand_tilde(&args.scratch_dir);

        let created_after = args
            .created_after
            .as_deref()
            .map(parse_date_or_interval)
            .transpose()?;
        let created_before = args
            .created_before
            .as_deref()
            .map(parse_date_or_interval)
            .transpose()?;

        Ok(Self {
            access_token: args.remote.access_token,
            storage_token: args.storage.storage_token,
            bucket: args.storage.bucket,
            path_prefix: args.prefix,
            catalog_path,
            scratch_dir,
            date_range: build_date_range(created_after, created_before),
            run_duration: Duration::from_secs(args.run_minutes * 60),
            list_pause: Duration::from_secs(args.list_pause),
            transfer_pause: Duration::from_secs(args.transfer_pause),
            progress_interval: Duration::from_secs(args.progress_interval),
            min_artifact_bytes: args.min_artifact_bytes,
            page_size: args.page_size,
            folder_style: args.folder_style,
            dry_run: args.dry_run,
            halt_on_error: args.halt_on_error,
        })
    }
}

/// Turn one- or two-sided `--created-*` filters into the closed range the
/// listing API expects. An open lower bound becomes the Unix epoch, an open
/// upper bound becomes tomorrow.
fn build_date_range(
    after: Option<DateTime<Local>>,
    before: Option<DateTime<Local>>,
) -> Option<DateRange> {
    if after.is_none() && before.is_none() {
        return None;
    }
    Some(DateRange {
        after: after.map(|d| d.date_naive()).unwrap_or_default(),
        before: before
            .map(|d| d.date_naive())
            .unwrap_or_else(|| Local::now().date_naive() + chrono::Duration::days(1)),
    })
}

/// Parse a human-friendly date spec into a concrete timestamp.
///
/// Supports three formats:
/// - Relative interval: `"20d"` (20 days ago from now)
/// - ISO date: `"2025-01-02"` (midnight local time)
/// - ISO datetime: `"2025-01-02T14:30:00"` (local time)
pub(crate) fn parse_date_or_interval(s: &str) -> anyhow::Result<DateTime<Local>> {
    if let Some(days_str) = s.strip_suffix('d') {
        if let Ok(days) = days_str.parse::<i64>() {
            return Ok(Local::now() - chrono::Duration::days(days));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(naive_dt) = date.and_hms_opt(0, 0, 0) {
            if let Some(dt) = naive_dt.and_local_timezone(Local).single() {
                return Ok(dt);
            }
        }
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        if let Some(local) = dt.and_local_timezone(Local).single() {
            return Ok(local);
        }
    }
    anyhow::bail!(
        "Cannot parse '{}' as a date. Expected ISO date (2025-01-02), \
         datetime (2025-01-02T14:30:00), or interval (20d)",
        s
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tilde_with_home() {
        let result = expand_tilde("~/Documents");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(result, home.join("Documents"));
        }
    }

    #[test]
    fn test_expand_tilde_no_prefix() {
        assert_eq!(
            expand_tilde("/absolute/path"),
            PathBuf::from("/absolute/path")
        );
        assert_eq!(
            expand_tilde("relative/path"),
            PathBuf::from("relative/path")
        );
    }

    #[test]
    fn test_parse_date_iso() {
        let dt = parse_date_or_interval("2025-01-15").unwrap();
        assert_eq!(
            dt.date_naive(),
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
        );
    }

    #[test]
    fn test_parse_datetime_iso() {
        let dt = parse_date_or_interval("2025-06-15T14:30:00").unwrap();
        let naive = dt.naive_local();
        assert_eq!(naive.date(), NaiveDate::from_ymd_opt(2025, 6, 15).unwrap());
        assert_eq!(
            naive.time(),
            chrono::NaiveTime::from_hms_opt(14, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_interval_days() {
        let before = chrono::Local::now();
        let dt = parse_date_or_interval("10d").unwrap();
        let after = chrono::Local::now();
        let expected = before - chrono::Duration::days(10);
        // Allow 1 second tolerance
        assert!(dt >= expected - chrono::Duration::seconds(1));
        assert!(dt <= after - chrono::Duration::days(10) + chrono::Duration::seconds(1));
    }

    #[test]
    fn test_parse_invalid_date() {
        assert!(parse_date_or_interval("not-a-date").is_err());
        assert!(parse_date_or_interval("").is_err());
    }

    fn sync_args(extra: &[&str]) -> crate::cli::SyncArgs {
        use clap::Parser;
        let mut argv = vec![
            "photark",
            "sync",
            "--access-token",
            "lib-token",
            "--bucket",
            "pics",
            "--storage-token",
            "store-token",
        ];
        argv.extend_from_slice(extra);
        let cli = crate::cli::Cli::try_parse_from(argv).unwrap();
        match cli.command {
            crate::cli::Command::Sync(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_run_minutes_become_duration() {
        let cfg = SyncConfig::from_args(sync_args(&[])).unwrap();
        assert_eq!(cfg.run_duration, Duration::from_secs(60));

        let cfg = SyncConfig::from_args(sync_args(&["--run-minutes", "5"])).unwrap();
        assert_eq!(cfg.run_duration, Duration::from_secs(300));
    }

    #[test]
    fn test_prefix_kept_verbatim() {
        let cfg = SyncConfig::from_args(sync_args(&["--prefix", "photos/"])).unwrap();
        assert_eq!(cfg.path_prefix, "photos/");

        // No separator is appended on the caller's behalf
        let cfg = SyncConfig::from_args(sync_args(&["--prefix", "mirror-"])).unwrap();
        assert_eq!(cfg.path_prefix, "mirror-");
    }

    #[test]
    fn test_no_date_flags_means_no_range() {
        let cfg = SyncConfig::from_args(sync_args(&[])).unwrap();
        assert!(cfg.date_range.is_none());
    }

    #[test]
    fn test_one_sided_filters_get_open_ends() {
        let cfg =
            SyncConfig::from_args(sync_args(&["--created-after", "2024-01-02"])).unwrap();
        let range = cfg.date_range.unwrap();
        assert_eq!(range.after, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert!(range.before > Local::now().date_naive());

        let cfg =
            SyncConfig::from_args(sync_args(&["--created-before", "2024-06-01"])).unwrap();
        let range = cfg.date_range.unwrap();
        assert_eq!(range.after, NaiveDate::default());
        assert_eq!(range.before, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert!(SyncConfig::from_args(sync_args(&["--page-size", "0"])).is_err());
    }

    #[test]
    fn test_dry_run_passthrough() {
        let cfg = SyncConfig::from_args(sync_args(&["--dry-run"])).unwrap();
        assert!(cfg.dry_run);
    }

    #[test]
    fn test_tokens_are_redacted_in_debug() {
        let cfg = SyncConfig::from_args(sync_args(&[])).unwrap();
        let rendered = format!("{:?}", cfg);
        assert!(!rendered.contains("lib-token"));
        assert!(!rendered.contains("store-token"));
        assert!(rendered.contains("<redacted>"));
    }
}
