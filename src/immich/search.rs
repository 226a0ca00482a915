//! Search criteria construction and the paginated asset stream.

use chrono::{NaiveDate, NaiveTime, TimeDelta};
use futures_util::stream::{self, Stream, TryStreamExt};
use uuid::Uuid;

use super::{AssetResponse, ImmichApi, ImmichError, MetadataSearch};
use crate::timestamp::{Timestamp, Zone};

/// User-facing filters, before tag names are resolved to ids.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub before: Option<NaiveDate>,
    pub after: Option<NaiveDate>,
    pub model: Option<String>,
    /// Zone the date bounds are expressed in; naive when unset.
    pub zone: Option<Zone>,
}

/// Assemble the search body. Every filter is independent; unset ones are
/// left out of the request entirely.
///
/// `before` becomes midnight at the start of that date. `after` becomes the
/// last millisecond of that date, so the named day itself is excluded.
pub fn build_criteria(filters: &SearchFilters, tag_ids: Vec<Uuid>) -> MetadataSearch {
    let at = |date: NaiveDate| {
        let midnight = date.and_time(NaiveTime::MIN);
        match filters.zone {
            Some(zone) => Timestamp::zoned(midnight, zone),
            None => Timestamp::Naive(midnight),
        }
    };

    MetadataSearch {
        taken_before: filters.before.map(at),
        taken_after: filters.after.map(|date| {
            at(date).map_wall_clock(|w| w + TimeDelta::days(1) - TimeDelta::milliseconds(1))
        }),
        model: filters.model.clone(),
        tag_ids: (!tag_ids.is_empty()).then_some(tag_ids),
        page: None,
    }
}

/// Lazily walk every page of a metadata search.
///
/// Each page's items are yielded in order before the next page is requested.
/// The stream ends when the server stops handing out a next-page token. Any
/// page request failure ends the stream with that error; nothing is retried.
pub fn asset_stream<A>(
    api: &A,
    criteria: MetadataSearch,
) -> impl Stream<Item = Result<AssetResponse, ImmichError>> + '_
where
    A: ImmichApi + ?Sized,
{
    stream::try_unfold(Some(criteria), move |cursor| async move {
        let Some(mut criteria) = cursor else {
            return Ok(None);
        };
        let page = api.search_assets(&criteria).await?;
        tracing::debug!(
            "Found {} assets matching search criteria. (next page: {:?})",
            page.count,
            page.next_page
        );
        let next = match page.next_page {
            Some(token) => {
                let number = token
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| ImmichError::InvalidPageToken(token.clone()))?;
                criteria.page = Some(number);
                Some(criteria)
            }
            None => None,
        };
        let items = stream::iter(page.items.into_iter().map(Ok::<_, ImmichError>));
        Ok::<_, ImmichError>(Some((items, next)))
    })
    .try_flatten()
}
