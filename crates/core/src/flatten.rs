//! Denormalize product aggregates into report rows.

use crate::models::{OutputRow, ProductAggregate};

/// One row per (product, finding), in aggregate order then finding order.
///
/// A product with no findings contributes no rows.
pub fn flatten(aggregates: &[ProductAggregate]) -> Vec<OutputRow> {
    aggregates
        .iter()
        .flat_map(|agg| {
            agg.findings.iter().map(move |finding| OutputRow {
                group: agg.group.clone(),
                abbreviation: agg.abbreviation.clone(),
                fi: agg.fi.clone(),
                fi_type: agg.fi_type.clone(),
                product: agg.product.clone(),
                product_type: agg.product_type.clone(),
                url: agg.url.clone(),
                pdf: agg.pdf.clone(),
                timestamp: agg.timestamp.clone(),
                keyword_set: finding.keyword_set.clone(),
                keyword: finding.keyword.clone(),
                sentences_found: finding.found_label().to_string(),
                sentences: finding.sentences.clone(),
                fetch_error: agg.fetch_error.clone(),
                summary_relevant: agg.summary_relevant.clone(),
                summary: agg.summary.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::KeywordFinding;

    fn aggregate(name: &str, findings: Vec<KeywordFinding>) -> ProductAggregate {
        ProductAggregate {
            product: name.into(),
            group: "Bank".into(),
            abbreviation: "AB".into(),
            fi: "Alpha Bank".into(),
            fi_type: "commercial".into(),
            product_type: "card".into(),
            url: format!("https://a.test/{name}"),
            pdf: "none found".into(),
            timestamp: "2024-01-01 09:00:00".into(),
            text: String::new(),
            relevant_text: String::new(),
            fetch_error: None,
            summary_relevant: None,
            summary: None,
            findings,
        }
    }

    #[test]
    fn test_row_count_is_sum_of_findings() {
        let aggs = vec![
            aggregate(
                "a",
                vec![
                    KeywordFinding::from_matches("rates", "apr", &["5%".to_string()]),
                    KeywordFinding::from_matches("rates", "fee", &[]),
                ],
            ),
            aggregate("b", vec![]),
            aggregate("c", vec![KeywordFinding::from_matches("fees", "annual", &[])]),
        ];

        let rows = flatten(&aggs);
        assert_eq!(rows.len(), aggs.iter().map(|a| a.findings.len()).sum::<usize>());
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.product != "b"));
    }

    #[test]
    fn test_rows_copy_metadata_and_finding() {
        let mut agg = aggregate("a", vec![KeywordFinding::from_matches("rates", "apr", &["5%".to_string()])]);
        agg.fetch_error = Some("boom".into());
        agg.summary = Some("short summary".into());
        agg.summary_relevant = Some("No relevant text found.".into());

        let rows = flatten(&[agg]);
        let row = &rows[0];
        assert_eq!(row.product, "a");
        assert_eq!(row.fi, "Alpha Bank");
        assert_eq!(row.keyword_set, "rates");
        assert_eq!(row.keyword, "apr");
        assert_eq!(row.sentences_found, "found");
        assert_eq!(row.sentences, "5%");
        assert_eq!(row.fetch_error.as_deref(), Some("boom"));
        assert_eq!(row.summary.as_deref(), Some("short summary"));
        assert_eq!(row.summary_relevant.as_deref(), Some("No relevant text found."));
    }

    #[test]
    fn test_order_follows_aggregates_then_findings() {
        let aggs = vec![
            aggregate(
                "first",
                vec![KeywordFinding::from_matches("s", "t1", &[]), KeywordFinding::from_matches("s", "t2", &[])],
            ),
            aggregate("second", vec![KeywordFinding::from_matches("s", "t1", &[])]),
        ];

        let order: Vec<(String, String)> = flatten(&aggs).into_iter().map(|r| (r.product, r.keyword)).collect();
        assert_eq!(
            order,
            vec![
                ("first".to_string(), "t1".to_string()),
                ("first".to_string(), "t2".to_string()),
                ("second".to_string(), "t1".to_string()),
            ]
        );
    }

    #[test]
    fn test_flatten_is_repeatable() {
        let aggs = vec![
            aggregate("a", vec![KeywordFinding::from_matches("rates", "apr", &["5%".to_string()])]),
            aggregate("b", vec![KeywordFinding::from_matches("fees", "annual", &[])]),
        ];
        assert_eq!(flatten(&aggs), flatten(&aggs));
    }
}
