//! Partition determinism and distribution

use psprouter::routing::api::ProcessType;
use psprouter::topology::api::*;

// 99.99th percentile of chi-square with 5 degrees of freedom is about 25.7
const CHI_SQUARE_LIMIT: f64 = 30.0;

fn chi_square(counts: &[usize]) -> f64 {
    let total: usize = counts.iter().sum();
    let expected = total as f64 / counts.len() as f64;
    counts
        .iter()
        .map(|&observed| {
            let diff = observed as f64 - expected;
            diff * diff / expected
        })
        .sum()
}

#[test]
fn test_ten_thousand_clients_spread_evenly() {
    let assigner = PartitionAssigner::new(ProcessType::SecurityAggregation, 6, 3).unwrap();
    let clients: Vec<String> = (0..10_000).map(|i| format!("client{}", i)).collect();

    let counts = assigner.distribution(clients.iter().map(|c| c.as_str()));

    assert_eq!(counts.iter().sum::<usize>(), 10_000);
    let statistic = chi_square(&counts);
    assert!(
        statistic < CHI_SQUARE_LIMIT,
        "chi-square {} over {:?}",
        statistic,
        counts
    );
}

#[test]
fn test_assignment_is_case_insensitive_and_repeatable() {
    let assigner = PartitionAssigner::new(ProcessType::SecurityMapping, 6, 3).unwrap();
    let again = PartitionAssigner::new(ProcessType::SecurityMapping, 6, 3).unwrap();

    for i in 0..500 {
        let client = format!("Client{}", i);
        let first = assigner.worker_index(&client);
        assert_eq!(first, assigner.worker_index(&client));
        assert_eq!(first, again.worker_index(&client.to_lowercase()));
        assert!(first < 6);
    }
}

#[test]
fn test_known_bucket_values_are_stable() {
    // Same input, same bucket, on any host and any run
    let hash = client_hash("client21");
    assert_eq!(hash, client_hash("CLIENT21"));
    assert_eq!(
        PartitionAssigner::new(ProcessType::Validation, 4, 2)
            .unwrap()
            .worker_index("client21"),
        (hash % 4) as usize
    );
}
