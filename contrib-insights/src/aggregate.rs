// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Contributor rankings folded from dashboard responses.
///
/// Reviewer queries come back as time series (one column per user, one row
/// per day) and are summed per user. Merger queries come back as an already
/// ranked table and are mapped row by row.
use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    dashboard::{Cell, ResponseEnvelope},
    error::Error,
};

/// Column holding the username in merger tables; column 0 is the rank.
const TABLE_NAME_COLUMN: usize = 1;
/// Column holding the count in merger tables.
const TABLE_VALUE_COLUMN: usize = 2;

/// Accumulated activity of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct Contributor
{
    pub username: String,
    pub total:    u64,
}

impl Contributor
{
    pub fn new(username: impl Into<String,>, total: u64,) -> Self
    {
        Self {
            username: username.into(),
            total,
        }
    }
}

impl std::fmt::Display for Contributor
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_,>,) -> std::fmt::Result
    {
        write!(f, "{} ({})", self.username, self.total)
    }
}

/// Sums time-series columns per username and ranks the result.
///
/// Column 0 of every frame is the time axis and is skipped. Null, zero and
/// negative samples do not contribute, so every listed user has a positive
/// accumulated total; the fractional part is truncated afterwards. The result
/// is sorted by total descending, then username ascending.
///
/// # Errors
///
/// Returns [`Error::ResponseFormat`] when a field has no value column or a
/// value column contains a string.
pub fn aggregate_time_series(envelope: &ResponseEnvelope,) -> Result<Vec<Contributor,>, Error,>
{
    let mut totals: BTreeMap<&str, f64,> = BTreeMap::new();

    for (ref_id, result,) in &envelope.results {
        for (frame_index, frame,) in result.frames.iter().enumerate() {
            for (field_index, field,) in frame.schema.fields.iter().enumerate().skip(1,) {
                let column = frame.data.values.get(field_index,).ok_or_else(|| {
                    Error::response_format(format!(
                        "query {ref_id} frame {frame_index}: field '{}' has no values",
                        field.name
                    ),)
                },)?;

                for cell in column {
                    match cell {
                        Some(Cell::Number(value,),) if *value > 0.0 => {
                            *totals.entry(field.name.as_str(),).or_insert(0.0,) += value;
                        }
                        Some(Cell::Number(_,),) | None => {}
                        Some(Cell::Text(text,),) => {
                            return Err(Error::response_format(format!(
                                "query {ref_id} frame {frame_index}: non-numeric value '{text}' for '{}'",
                                field.name
                            ),),);
                        }
                    }
                }
            }
        }
    }

    let mut contributors: Vec<Contributor,> = totals
        .into_iter()
        .filter(|(_, total,)| *total > 0.0,)
        .map(|(username, total,)| Contributor::new(username, total as u64,),)
        .collect();

    contributors.sort_by(|a, b| {
        b.total.cmp(&a.total,).then_with(|| a.username.cmp(&b.username,),)
    },);

    Ok(contributors,)
}

/// Maps ranked table rows to contributors, preserving row order.
///
/// # Errors
///
/// Returns [`Error::ResponseFormat`] naming the frame when it has fewer than
/// three columns, the name and value columns differ in length, a name is not a
/// string, or a value is missing, negative or not a number.
pub fn aggregate_table(envelope: &ResponseEnvelope,) -> Result<Vec<Contributor,>, Error,>
{
    let mut contributors = Vec::new();

    for (ref_id, result,) in &envelope.results {
        for (frame_index, frame,) in result.frames.iter().enumerate() {
            let values = &frame.data.values;
            if values.len() <= TABLE_VALUE_COLUMN {
                return Err(Error::response_format(format!(
                    "query {ref_id} frame {frame_index}: expected at least 3 columns, found {}",
                    values.len()
                ),),);
            }

            let names = &values[TABLE_NAME_COLUMN];
            let totals = &values[TABLE_VALUE_COLUMN];
            if names.len() != totals.len() {
                return Err(Error::response_format(format!(
                    "query {ref_id} frame {frame_index}: {} names but {} values",
                    names.len(),
                    totals.len()
                ),),);
            }

            contributors.reserve(names.len(),);
            for (row, (name, total,),) in names.iter().zip(totals,).enumerate() {
                let username = match name {
                    Some(Cell::Text(text,),) => text.clone(),
                    _ => {
                        return Err(Error::response_format(format!(
                            "query {ref_id} frame {frame_index} row {row}: name is not a string"
                        ),),);
                    }
                };
                let total = match total {
                    Some(Cell::Number(value,),) if *value >= 0.0 => *value as u64,
                    _ => {
                        return Err(Error::response_format(format!(
                            "query {ref_id} frame {frame_index} row {row}: value for '{username}' is not a non-negative number"
                        ),),);
                    }
                };
                contributors.push(Contributor::new(username, total,),);
            }
        }
    }

    Ok(contributors,)
}

/// Keeps at most `limit` leading entries.
pub fn top(mut contributors: Vec<Contributor,>, limit: usize,) -> Vec<Contributor,>
{
    contributors.truncate(limit,);
    contributors
}

/// Renders `name (total), name (total), ...`.
pub fn format_contributors(contributors: &[Contributor],) -> String
{
    contributors.iter().map(ToString::to_string,).collect::<Vec<_,>>().join(", ",)
}

#[cfg(test)]
mod tests
{
    use crate::dashboard::decode_envelope;

    use super::*;

    fn envelope(json: &str,) -> ResponseEnvelope
    {
        decode_envelope(json.as_bytes(),).expect("valid envelope",)
    }

    #[test]
    fn contributor_display_format()
    {
        assert_eq!(Contributor::new("alice", 3,).to_string(), "alice (3)");
    }

    #[test]
    fn time_series_sums_positive_values_and_ranks()
    {
        let data = envelope(
            r#"{"results":{"A":{"frames":[{
                "schema":{"fields":[{"name":"time"},{"name":"alice"},{"name":"bob"}]},
                "data":{"values":[[1710000000000,1710086400000],[3,0],[-1,5]]}
            }]}}}"#,
        );

        let contributors = aggregate_time_series(&data,).expect("aggregation failed",);
        assert_eq!(contributors, vec![Contributor::new("bob", 5), Contributor::new("alice", 3)]);
    }

    #[test]
    fn time_series_merges_users_across_frames_and_skips_nulls()
    {
        let data = envelope(
            r#"{"results":{"A":{"frames":[
                {"schema":{"fields":[{"name":"time"},{"name":"carol"}]},
                 "data":{"values":[[1,2],[2,null]]}},
                {"schema":{"fields":[{"name":"time"},{"name":"carol"},{"name":"dave"}]},
                 "data":{"values":[[3],[4],[1.5]]}}
            ]}}}"#,
        );

        let contributors = aggregate_time_series(&data,).expect("aggregation failed",);
        assert_eq!(contributors, vec![Contributor::new("carol", 6), Contributor::new("dave", 1)]);
    }

    #[test]
    fn time_series_drops_users_without_positive_totals()
    {
        let data = envelope(
            r#"{"results":{"A":{"frames":[{
                "schema":{"fields":[{"name":"time"},{"name":"idle"},{"name":"tiny"}]},
                "data":{"values":[[1],[0],[0.4]]}
            }]}}}"#,
        );

        let contributors = aggregate_time_series(&data,).expect("aggregation failed",);
        assert_eq!(contributors, vec![Contributor::new("tiny", 0)]);
    }

    #[test]
    fn time_series_keeps_fractional_totals_below_one()
    {
        let data = envelope(
            r#"{"results":{"A":{"frames":[{
                "schema":{"fields":[{"name":"time"},{"name":"busy"},{"name":"tiny"}]},
                "data":{"values":[[1,2],[2,1],[0.25,0.5]]}
            }]}}}"#,
        );

        let contributors = aggregate_time_series(&data,).expect("aggregation failed",);
        assert_eq!(contributors, vec![Contributor::new("busy", 3), Contributor::new("tiny", 0)]);
    }

    #[test]
    fn time_series_breaks_ties_by_username()
    {
        let data = envelope(
            r#"{"results":{"A":{"frames":[{
                "schema":{"fields":[{"name":"time"},{"name":"zed"},{"name":"amy"},{"name":"max"}]},
                "data":{"values":[[1],[2],[2],[7]]}
            }]}}}"#,
        );

        let contributors = aggregate_time_series(&data,).expect("aggregation failed",);
        let names: Vec<&str,> = contributors.iter().map(|c| c.username.as_str(),).collect();
        assert_eq!(names, vec!["max", "amy", "zed"]);
    }

    #[test]
    fn time_series_rejects_missing_value_column()
    {
        let data = envelope(
            r#"{"results":{"A":{"frames":[{
                "schema":{"fields":[{"name":"time"},{"name":"alice"}]},
                "data":{"values":[[1]]}
            }]}}}"#,
        );

        let error = aggregate_time_series(&data,).expect_err("expected format error",);
        assert!(error.to_string().contains("field 'alice' has no values"));
    }

    #[test]
    fn time_series_rejects_text_values()
    {
        let data = envelope(
            r#"{"results":{"A":{"frames":[{
                "schema":{"fields":[{"name":"time"},{"name":"alice"}]},
                "data":{"values":[[1],["three"]]}
            }]}}}"#,
        );

        let error = aggregate_time_series(&data,).expect_err("expected format error",);
        assert!(matches!(error, Error::ResponseFormat { .. }));
    }

    #[test]
    fn table_preserves_row_order()
    {
        let data = envelope(
            r#"{"results":{"A":{"frames":[{
                "schema":{"fields":[{"name":"Rank"},{"name":"name"},{"name":"value"}]},
                "data":{"values":[[1,2],["x","y"],[10,5]]}
            }]}}}"#,
        );

        let contributors = aggregate_table(&data,).expect("aggregation failed",);
        assert_eq!(contributors, vec![Contributor::new("x", 10), Contributor::new("y", 5)]);
    }

    #[test]
    fn table_trusts_upstream_order_without_resorting()
    {
        let data = envelope(
            r#"{"results":{"A":{"frames":[{
                "data":{"values":[[1,2,3],["low","high","low"],[1,9,1]]}
            }]}}}"#,
        );

        let contributors = aggregate_table(&data,).expect("aggregation failed",);
        assert_eq!(
            contributors,
            vec![
                Contributor::new("low", 1),
                Contributor::new("high", 9),
                Contributor::new("low", 1)
            ]
        );
    }

    #[test]
    fn table_with_two_columns_is_a_format_error()
    {
        let data = envelope(
            r#"{"results":{"A":{"frames":[{"data":{"values":[[1,2],["x","y"]]}}]}}}"#,
        );

        let error = aggregate_table(&data,).expect_err("expected format error",);
        match error {
            Error::ResponseFormat {
                message,
            } => assert_eq!(message, "query A frame 0: expected at least 3 columns, found 2"),
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn table_rejects_misaligned_columns()
    {
        let data =
            envelope(r#"{"results":{"A":{"frames":[{"data":{"values":[[1,2],["x","y"],[10]]}}]}}}"#,);

        let error = aggregate_table(&data,).expect_err("expected format error",);
        assert!(error.to_string().contains("2 names but 1 values"));
    }

    #[test]
    fn table_rejects_null_values_and_numeric_names()
    {
        let null_value =
            envelope(r#"{"results":{"A":{"frames":[{"data":{"values":[[1],["x"],[null]]}}]}}}"#,);
        assert!(matches!(aggregate_table(&null_value,), Err(Error::ResponseFormat { .. })));

        let numeric_name =
            envelope(r#"{"results":{"A":{"frames":[{"data":{"values":[[1],[42],[3]]}}]}}}"#,);
        assert!(matches!(aggregate_table(&numeric_name,), Err(Error::ResponseFormat { .. })));
    }

    #[test]
    fn empty_results_aggregate_to_empty_lists()
    {
        let data = envelope(r#"{"results":{}}"#,);
        assert!(aggregate_time_series(&data,).expect("time series",).is_empty());
        assert!(aggregate_table(&data,).expect("table",).is_empty());
    }

    #[test]
    fn top_truncates_and_keeps_short_lists()
    {
        let list =
            vec![Contributor::new("a", 3,), Contributor::new("b", 2,), Contributor::new("c", 1,)];
        assert_eq!(top(list.clone(), 2,).len(), 2);
        assert_eq!(top(list, 10,).len(), 3);
    }

    #[test]
    fn format_contributors_joins_with_commas()
    {
        let list = vec![Contributor::new("bob", 5,), Contributor::new("alice", 3,)];
        assert_eq!(format_contributors(&list,), "bob (5), alice (3)");
        assert_eq!(format_contributors(&[],), "");
    }
}
