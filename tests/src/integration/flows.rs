//! # Lookup Flows
//!
//! End-to-end lookups over [`SimulatedNetwork`](super::SimulatedNetwork):
//!
//! 1. **Complete knowledge**: every table holds the whole network
//! 2. **Single contact**: the origin learns everything through responses
//! 3. **Churn**: offline peers fail and never reach a result
//! 4. **Concurrency**: many lookups in flight across worker threads

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use kad_routing::test_utils::node_id;
    use kad_routing::{distance, KademliaConfig, NodeId};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tokio::time::timeout;

    use crate::integration::{init_tracing, SimulatedNetwork};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const LOOKUP_DEADLINE: Duration = Duration::from_secs(10);

    /// k = 16 so a 16-node network fits every bucket, 4 results.
    fn small_config() -> KademliaConfig {
        KademliaConfig {
            lookup_num_results: 4,
            ..KademliaConfig::default()
        }
    }

    /// Nodes 1..=16 by integer value.
    fn numbered_network() -> SimulatedNetwork {
        let ids: Vec<NodeId> = (1..=16).map(node_id).collect();
        SimulatedNetwork::new(&ids, &small_config()).unwrap()
    }

    async fn lookup(network: &SimulatedNetwork, origin: NodeId, target: NodeId) -> Vec<NodeId> {
        timeout(LOOKUP_DEADLINE, network.run_lookup(origin, target))
            .await
            .expect("lookup did not finish")
            .expect("origin is part of the network")
    }

    /// Sorted by distance, no duplicates, no origin, only network members.
    fn assert_well_formed(
        network: &SimulatedNetwork,
        origin: &NodeId,
        target: &NodeId,
        closest: &[NodeId],
        limit: usize,
    ) {
        assert!(closest.len() <= limit);
        assert!(!closest.contains(origin));

        let unique: HashSet<NodeId> = closest.iter().copied().collect();
        assert_eq!(unique.len(), closest.len());
        assert!(closest.iter().all(|id| network.ids().contains(id)));

        let distances: Vec<_> = closest.iter().map(|id| distance(target, id)).collect();
        assert!(distances.windows(2).all(|pair| pair[0] < pair[1]));
    }

    // =============================================================================
    // INTEGRATION TESTS: CONVERGENCE
    // =============================================================================

    #[tokio::test]
    async fn test_lookup_with_complete_tables_returns_true_closest() {
        init_tracing();
        let network = numbered_network();
        network.connect_all();
        let origin = node_id(16);
        let target = NodeId::zero();

        let closest = lookup(&network, origin, target).await;

        assert_eq!(closest, vec![node_id(1), node_id(2), node_id(3), node_id(4)]);
        assert_eq!(closest, network.true_closest(&target, &origin)[..4]);
    }

    #[tokio::test]
    async fn test_lookup_walks_inward_from_a_single_contact() {
        init_tracing();
        let network = numbered_network();
        let origin = node_id(16);
        for from in network.ids() {
            if *from == origin {
                continue;
            }
            for to in network.ids() {
                if from != to {
                    network.connect(from, to);
                }
            }
        }
        network.connect(&origin, &node_id(15));

        let closest = lookup(&network, origin, NodeId::zero()).await;

        assert_eq!(closest, vec![node_id(1), node_id(2), node_id(3), node_id(4)]);

        // Peers met during the walk are not promoted into the origin's table.
        let service = network.node(&origin).unwrap();
        assert_eq!(service.lock().table().size(), 1);
        assert_eq!(service.lock().active_lookups(), 0);
    }

    #[tokio::test]
    async fn test_random_network_lookup_is_well_formed() {
        init_tracing();
        let config = KademliaConfig::default().with_k(8);
        let network = SimulatedNetwork::with_random_ids(64, 7, &config).unwrap();
        network.connect_all();
        let mut rng = StdRng::seed_from_u64(99);

        for origin in network.ids().iter().take(4) {
            let target = NodeId::random(&mut rng);
            let closest = lookup(&network, *origin, target).await;
            assert_well_formed(&network, origin, &target, &closest, config.lookup_num_results);
        }
    }

    // =============================================================================
    // INTEGRATION TESTS: CHURN
    // =============================================================================

    #[tokio::test]
    async fn test_offline_peers_never_appear_in_results() {
        init_tracing();
        let config = KademliaConfig::default().with_k(8);
        let network = SimulatedNetwork::with_random_ids(32, 11, &config).unwrap();
        network.connect_all();
        let origin = network.ids()[0];
        for id in network.ids().iter().skip(1).step_by(2) {
            network.set_offline(*id);
        }

        let target = network.ids()[5];
        let closest = lookup(&network, origin, target).await;

        assert!(closest.iter().all(|id| !network.is_offline(id)));
        assert_well_formed(&network, &origin, &target, &closest, config.lookup_num_results);
    }

    #[tokio::test]
    async fn test_unreachable_contacts_give_empty_result() {
        init_tracing();
        let network = numbered_network();
        let origin = node_id(16);
        network.connect(&origin, &node_id(1));
        network.connect(&origin, &node_id(2));
        network.set_offline(node_id(1));
        network.set_offline(node_id(2));

        let closest = lookup(&network, origin, NodeId::zero()).await;

        assert!(closest.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_from_empty_table_finishes_at_once() {
        let network = numbered_network();

        let closest = lookup(&network, node_id(3), node_id(9)).await;

        assert!(closest.is_empty());
    }

    // =============================================================================
    // INTEGRATION TESTS: CONCURRENCY
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_lookups_all_finish() {
        init_tracing();
        let config = KademliaConfig::default().with_k(8);
        let network = SimulatedNetwork::with_random_ids(48, 23, &config)
            .unwrap()
            .with_max_latency_ms(5);
        network.connect_all();
        let mut rng = StdRng::seed_from_u64(5);

        let mut handles = Vec::new();
        for origin in network.ids().iter().take(12).copied() {
            let network = network.clone();
            let target = NodeId::random(&mut rng);
            handles.push(tokio::spawn(async move {
                let closest = timeout(LOOKUP_DEADLINE, network.run_lookup(origin, target)).await;
                (origin, target, closest)
            }));
        }

        for handle in handles {
            let (origin, target, closest) = handle.await.unwrap();
            let closest = closest.expect("lookup did not finish").unwrap();
            assert_well_formed(&network, &origin, &target, &closest, config.lookup_num_results);
        }
    }
}
