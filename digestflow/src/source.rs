//! Resolves which transcript a run processes.
//!
//! A run on date D processes the broadcast of D-1, published under
//! `{base}/{Y}/{m}/{d}/{Y}年{m}月{d}日新闻联播文字版/`.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::{DigestflowError, Result};

/// The transcript a run targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptSource {
    /// Broadcast date.
    pub broadcast_date: NaiveDate,
    /// Page URL with the path percent-encoded.
    pub url: String,
    /// Display title.
    pub title: String,
}

impl TranscriptSource {
    /// Resolves the transcript for a run executing on `run_date`.
    pub fn for_run_date(base_url: &str, run_date: NaiveDate) -> Result<Self> {
        let broadcast_date = run_date
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| DigestflowError::Source(format!("no day before {run_date}")))?;
        Self::for_broadcast(base_url, broadcast_date)
    }

    /// Resolves the transcript of a given broadcast date.
    pub fn for_broadcast(base_url: &str, broadcast_date: NaiveDate) -> Result<Self> {
        let (year, month, day) = (
            format!("{:04}", broadcast_date.year()),
            format!("{:02}", broadcast_date.month()),
            format!("{:02}", broadcast_date.day()),
        );

        let segment = format!("{year}年{month}月{day}日新闻联播文字版");

        let mut url = Url::parse(base_url)
            .map_err(|e| DigestflowError::Source(format!("invalid base URL {base_url:?}: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| DigestflowError::Source(format!("base URL {base_url:?} cannot have a path")))?
            .pop_if_empty()
            .extend([
                year.as_str(),
                month.as_str(),
                day.as_str(),
                segment.as_str(),
                "",
            ]);

        Ok(Self {
            broadcast_date,
            url: url.into(),
            title: format!("{year}年{month}月{day}日新闻联播"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_previous_day_url_and_title() {
        let source = TranscriptSource::for_run_date(
            "http://mrxwlb.com",
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        )
        .unwrap();

        assert_eq!(source.broadcast_date, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
        assert_eq!(source.title, "2025年02月28日新闻联播");
        assert_eq!(
            source.url,
            "http://mrxwlb.com/2025/02/28/2025%E5%B9%B402%E6%9C%8828%E6%97%A5\
             %E6%96%B0%E9%97%BB%E8%81%94%E6%92%AD%E6%96%87%E5%AD%97%E7%89%88/"
        );
    }

    #[test]
    fn test_base_url_with_trailing_slash() {
        let a = TranscriptSource::for_broadcast("http://mrxwlb.com/", NaiveDate::from_ymd_opt(2024, 1, 9).unwrap()).unwrap();
        let b = TranscriptSource::for_broadcast("http://mrxwlb.com", NaiveDate::from_ymd_opt(2024, 1, 9).unwrap()).unwrap();
        assert_eq!(a.url, b.url);
        assert!(a.url.starts_with("http://mrxwlb.com/2024/01/09/"));
        assert!(a.url.ends_with('/'));
    }

    #[test]
    fn test_invalid_base_url() {
        let err = TranscriptSource::for_broadcast("not a url", NaiveDate::from_ymd_opt(2024, 1, 9).unwrap());
        assert!(matches!(err, Err(DigestflowError::Source(_))));
    }
}
