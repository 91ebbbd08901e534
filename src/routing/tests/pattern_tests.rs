//! Tests for the bind pattern grammar

use crate::routing::api::*;

#[test]
fn test_parse_and_display() {
    let pattern = BindPattern::parse("*.client-hash-2.*.securityaggregation").unwrap();

    assert_eq!(pattern.segments().len(), 4);
    assert_eq!(pattern.segments()[0], PatternSegment::AnyOne);
    assert_eq!(
        pattern.segments()[1],
        PatternSegment::Literal("client-hash-2".to_string())
    );
    assert_eq!(pattern.to_string(), "*.client-hash-2.*.securityaggregation");
}

#[test]
fn test_star_matches_exactly_one_segment() {
    let pattern = BindPattern::parse("*.*.validation").unwrap();

    assert!(pattern.matches("firma.client7.validation"));
    assert!(!pattern.matches("firma.client7.validation.u1"));
    assert!(!pattern.matches("client7.validation"));
    assert!(!pattern.matches("firma.client7.securitymapping"));
    assert!(!pattern.matches("firma..validation"));
}

#[test]
fn test_trailing_star_requires_a_segment() {
    let pattern = BindPattern::parse("*.*.validation.*").unwrap();

    assert!(pattern.matches("firma.client7.validation.u1"));
    assert!(!pattern.matches("firma.client7.validation"));
    assert!(!pattern.matches("firma.client7.validation."));
}

#[test]
fn test_invalid_patterns_are_rejected() {
    for bad in ["", "a..b", "a.#", "a.b*", "#"] {
        assert!(
            matches!(
                BindPattern::parse(bad),
                Err(RoutingError::InvalidTopologyConfig { .. })
            ),
            "'{}' should be rejected",
            bad
        );
    }
}

#[test]
fn test_canonical_patterns_cover_context_keys() {
    for pt in ProcessType::all() {
        let [plain, scoped] = BindPattern::canonical_for(pt);
        let context = RoutingContext::new("f", "c", pt).unwrap();
        let with_subscope = context.clone().with_subscope("u").unwrap();

        assert!(plain.matches(&context.routing_key()));
        assert!(!plain.matches(&with_subscope.routing_key()));
        assert!(scoped.matches(&with_subscope.routing_key()));
        assert!(!scoped.matches(&context.routing_key()));
    }
}
