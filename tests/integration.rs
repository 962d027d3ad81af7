use txn_totals::{
    sum_totals, AggregationError, Aggregator, CsvDialect, Observation, Total, Value,
};

fn key(values: &[&str]) -> Vec<Value> {
    values.iter().map(|v| Value::from(*v)).collect()
}

/// Build the three-dimension aggregator used across scenarios
fn sample_totals() -> Aggregator {
    let mut agg = Aggregator::new(["ccy", "land", "method"]).unwrap();
    agg.update(vec![
        (key(&["EUR", "de", "pos"]), 10.0),
        (key(&["EUR", "de", "pos"]), 5.0),
        (key(&["EUR", "es", "pos"]), 5.0),
        (key(&["USD", "us", "atm"]), 20.0),
        (key(&["GBP", "uk", "pos"]), 2.5),
    ])
    .unwrap();
    agg
}

fn total_amount(agg: &Aggregator) -> f64 {
    agg.iter().map(|(_, t)| t.amount).sum()
}

fn total_count(agg: &Aggregator) -> u64 {
    agg.iter().map(|(_, t)| t.count).sum()
}

#[test]
fn test_sum_totals_commutative_and_associative() {
    let a = Observation::from(3.0);
    let b = Observation::from(Total::new(4, 10.0));
    let c = Observation::from(2.5);

    assert_eq!(sum_totals([a, b]), sum_totals([b, a]));
    assert_eq!(
        sum_totals([Observation::from(sum_totals([a, b])), c]),
        sum_totals([a, Observation::from(sum_totals([b, c]))]),
    );

    // Mixed raw/total folding: raw counts once, totals carry their counts
    let folded = sum_totals([a, b, c]);
    assert_eq!(folded, Total::new(6, 15.5));
}

#[test]
fn test_update_accumulates_per_key() {
    let agg = sample_totals();
    assert_eq!(
        agg.get(&key(&["EUR", "de", "pos"])),
        Some(Total::new(2, 15.0))
    );
    assert_eq!(agg.len(), 4);
}

#[test]
fn test_schema_invariant_survives_derivations() {
    let agg = sample_totals();

    let derived: Vec<Aggregator> = vec![
        agg.filter(&[Value::from("EUR")]),
        agg.collapse("land").unwrap(),
        agg.merge(&agg.collapse("method").unwrap()),
        agg.add(&agg).unwrap(),
    ];

    for d in derived {
        for (k, _) in d.iter() {
            assert_eq!(k.len(), d.fields().len());
        }
    }
}

#[test]
fn test_collapse_conserves_mass() {
    let agg = sample_totals();
    for field in ["ccy", "land", "method"] {
        let collapsed = agg.collapse(field).unwrap();
        assert_eq!(total_count(&collapsed), total_count(&agg));
        assert!((total_amount(&collapsed) - total_amount(&agg)).abs() < 1e-9);
    }
}

#[test]
fn test_collapse_scenario() {
    let mut agg = Aggregator::new(["ccy", "land", "method"]).unwrap();
    agg.update_one(key(&["EUR", "de", "pos"]), 10.0).unwrap();
    agg.update_one(key(&["EUR", "es", "pos"]), 5.0).unwrap();

    let collapsed = agg.collapse("land").unwrap();
    assert_eq!(collapsed.len(), 1);
    assert_eq!(
        collapsed.get(&key(&["EUR", "pos"])),
        Some(Total::new(2, 15.0))
    );
}

#[test]
fn test_filter_keeps_matching_keys_untouched() {
    let agg = sample_totals();
    let eur = agg.filter(&[Value::from("EUR")]);

    for (k, total) in eur.iter() {
        assert!(k.contains(&Value::from("EUR")));
        assert_eq!(agg.get(k), Some(total));
    }
    // every EUR key from the original is present
    let originals: usize = agg
        .iter()
        .filter(|(k, _)| k.contains(&Value::from("EUR")))
        .count();
    assert_eq!(eur.len(), originals);
    assert!(!eur.iter().any(|(k, _)| k.contains(&Value::from("USD"))));
}

#[test]
fn test_add_doubles_and_rejects_mismatched_schemas() {
    let agg = sample_totals();
    let doubled = agg.add(&agg).unwrap();

    assert_eq!(doubled.len(), agg.len());
    for (k, total) in agg.iter() {
        assert_eq!(
            doubled.get(k),
            Some(Total::new(total.count * 2, total.amount * 2.0))
        );
    }

    let a = Aggregator::new(["ccy", "land"]).unwrap();
    let b = Aggregator::new(["ccy", "method"]).unwrap();
    assert!(matches!(
        a.add(&b),
        Err(AggregationError::SchemaMismatch { .. })
    ));
}

#[test]
fn test_merge_produces_union_schema() {
    let mut a = Aggregator::new(["ccy", "land"]).unwrap();
    a.update_one(key(&["EUR", "de"]), 10.0).unwrap();
    let mut b = Aggregator::new(["ccy", "method"]).unwrap();
    b.update_one(key(&["USD", "atm"]), 20.0).unwrap();

    let merged = a.merge(&b);
    let mut fields: Vec<&str> = merged.fields().iter().map(String::as_str).collect();
    fields.sort_unstable();
    assert_eq!(fields, vec!["ccy", "land", "method"]);

    // every original amount survives, possibly accumulated
    assert!((total_amount(&merged) - 30.0).abs() < 1e-9);
    assert_eq!(total_count(&merged), 2);

    // absent fields are explicit nulls, not empty strings
    assert!(merged
        .iter()
        .all(|(k, _)| k.iter().filter(|v| v.is_null()).count() == 1));
}

#[test]
fn test_merge_accumulates_colliding_union_keys() {
    // Same schema on both sides: union keys collide and totals accumulate
    let mut a = Aggregator::new(["ccy"]).unwrap();
    a.update_one(key(&["EUR"]), 10.0).unwrap();
    let mut b = Aggregator::new(["ccy"]).unwrap();
    b.update_one(key(&["EUR"]), 5.0).unwrap();

    let merged = a.merge(&b);
    assert_eq!(merged.get(&key(&["EUR"])), Some(Total::new(2, 15.0)));
}

#[test]
fn test_field_sorted_orders_by_named_fields() {
    let agg = sample_totals();
    let rows = agg.field_sorted(&["ccy", "land"], false).unwrap();
    let currencies: Vec<String> = rows.iter().map(|(k, _)| k[0].to_string()).collect();
    let mut expected = currencies.clone();
    expected.sort();
    assert_eq!(currencies, expected);

    let reversed = agg.field_sorted(&["ccy", "land"], true).unwrap();
    let back: Vec<String> = reversed.iter().map(|(k, _)| k[0].to_string()).collect();
    let mut forward = back.clone();
    forward.sort();
    forward.reverse();
    assert_eq!(back, forward);
}

#[test]
fn test_csv_contract() {
    let agg = sample_totals();
    let dialect = CsvDialect {
        terminator: csv::Terminator::Any(b'\n'),
        ..CsvDialect::default()
    };
    let text = agg.to_csv(&["ccy"], false, &dialect).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "ccy,land,method,count,amount");
    assert_eq!(lines.len(), 1 + agg.len());
    // each data row: key values then count then amount
    assert_eq!(lines[1], "EUR,de,pos,2,15");
}

#[test]
fn test_zero_initialized_keys() {
    let agg = Aggregator::with_keys(
        ["ccy", "land"],
        vec![key(&["EUR", "de"]), key(&["USD", "us"])],
    )
    .unwrap();
    assert_eq!(agg.len(), 2);
    assert_eq!(agg.get(&key(&["EUR", "de"])), Some(Total::ZERO));

    let bad = Aggregator::with_keys(["ccy", "land"], vec![key(&["EUR"])]);
    assert!(matches!(bad, Err(AggregationError::KeyArity { .. })));
}
