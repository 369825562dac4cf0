use super::*;

#[test]
fn consistent_report() {
    let report = ConsistencyReport::check(3, 3, &[0, 1, 2], &[0, 1, 2]);

    assert!(report.is_consistent);
    assert_eq!(report.total_issues(), 0);
    assert!(report.issues().is_empty());
    assert!(report.summary().contains("Index is consistent"));
}

#[test]
fn empty_store_is_consistent() {
    let report = ConsistencyReport::check(0, 0, &[], &[]);
    assert!(report.is_consistent);
}

#[test]
fn missing_chunk_row_is_reported() {
    let report = ConsistencyReport::check(3, 3, &[0, 1, 2], &[0, 2]);

    assert!(!report.is_consistent);
    assert_eq!(report.missing_chunks, vec![1]);
    assert_eq!(report.chunk_rows, 2);
    assert_eq!(report.total_issues(), 1);
    assert!(report.summary().contains("1 chunk rows missing"));
}

#[test]
fn rows_beyond_header_are_reported() {
    let report = ConsistencyReport::check(2, 2, &[0, 1, 2], &[0, 1]);

    assert!(!report.is_consistent);
    assert_eq!(report.unexpected_vectors, vec![2]);
    assert!(report.missing_vectors.is_empty());
}

#[test]
fn header_count_disagreement_is_reported() {
    let report = ConsistencyReport::check(2, 1, &[0, 1], &[0]);

    assert!(!report.is_consistent);
    assert_eq!(report.total_issues(), 1);
    assert!(report.issues()[0].contains("2 vectors but 1 chunks"));
}

#[test]
fn negative_ordinals_are_unexpected() {
    let report = ConsistencyReport::check(1, 1, &[-1, 0], &[0]);
    assert_eq!(report.unexpected_vectors, vec![-1]);
    assert!(!report.is_consistent);
}

#[test]
fn inflated_header_lists_a_bounded_sample() {
    let report = ConsistencyReport::check(4_000_000_000, 4_000_000_000, &[0, 1], &[0, 1]);

    assert!(!report.is_consistent);
    assert_eq!(report.missing_vector_count, 3_999_999_998);
    assert_eq!(report.missing_chunk_count, 3_999_999_998);
    assert_eq!(report.missing_vectors.len(), MAX_LISTED_ORDINALS);
    assert_eq!(report.missing_vectors[0], 2);
    assert!(report.summary().contains("3999999998 vector rows missing"));
}

#[test]
fn gaps_between_rows_are_listed_in_order() {
    let report = ConsistencyReport::check(6, 6, &[0, 2, 5], &[0, 1, 2, 3, 4, 5]);

    assert_eq!(report.missing_vectors, vec![1, 3, 4]);
    assert_eq!(report.missing_vector_count, 3);
    assert_eq!(report.total_issues(), 3);
}
